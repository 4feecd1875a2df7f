use glam::Vec3;

/// A plane `normal . p + distance = 0`; the positive half-space is "inside".
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Plane {
        let length = normal.length();
        Plane {
            normal: normal / length,
            distance: distance / length,
        }
    }

    pub fn signed_distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}
