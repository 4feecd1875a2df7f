use glam::{Mat4, Quat, Vec3};

/// Local placement of a node relative to its parent.
///
/// `translation` is expressed in the parent's *scaled* space: the parent's
/// uniform `scale` multiplies it when the edge is composed. A node's own
/// `scale` never affects its orientation, only its children's offsets and
/// the size of what it draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    translation: Vec3,
    orientation: Quat,
    scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        scale: 1.0,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn new(translation: Vec3, orientation: Quat, scale: f32) -> Self {
        let mut transform = Self::from_translation(translation);
        transform.set_orientation(orientation);
        transform.set_scale(scale);
        transform
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
    }

    pub fn set_scale(&mut self, scale: f32) {
        debug_assert!(scale > 0.0, "node scale must be positive, got {scale}");
        self.scale = scale;
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.translation += delta;
    }

    pub fn rotate(&mut self, rotation: Quat) {
        self.orientation = (self.orientation * rotation).normalize();
    }

    /// Maps this node's local frame into its parent's frame.
    pub fn descend_matrix(&self, parent_scale: f32) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.translation * parent_scale)
    }

    /// Maps the parent's frame into this node's local frame: inverse
    /// rotation after the negated, parent-scaled translation.
    pub fn ascend_matrix(&self, parent_scale: f32) -> Mat4 {
        Mat4::from_quat(self.orientation.conjugate())
            * Mat4::from_translation(-self.translation * parent_scale)
    }
}
