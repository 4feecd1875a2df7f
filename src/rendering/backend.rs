use glam::{Mat4, Vec4};

use crate::error::BackendError;
use crate::rendering::{context::Viewport, mesh::MeshId};
use crate::scene_graph::Attenuation;

/// Hardware light parameters; `position` is in eye space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightState {
    pub position: Vec4,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub attenuation: Attenuation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub diffuse: Vec4,
    /// RGB specular colour; `w` is the shininess exponent.
    pub specular: Vec4,
    pub emissive: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Vec4::ONE,
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emissive: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl Material {
    pub fn diffuse(color: Vec4) -> Self {
        Self {
            diffuse: color,
            ..Self::default()
        }
    }

    pub fn emissive(color: Vec4) -> Self {
        Self {
            diffuse: Vec4::new(0.0, 0.0, 0.0, color.w),
            emissive: color,
            ..Self::default()
        }
    }

    pub fn with_specular(mut self, color: Vec4, shininess: f32) -> Self {
        self.specular = color.truncate().extend(shininess);
        self
    }
}

/// The fixed-function style state machine the scene renderer drives.
///
/// Every call may fail; failures abort the frame.
pub trait GraphicsBackend {
    /// Number of light slots available.
    fn max_lights(&self) -> usize;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<(), BackendError>;

    fn set_projection(&mut self, projection: Mat4) -> Result<(), BackendError>;

    fn set_ambient(&mut self, color: Vec4) -> Result<(), BackendError>;

    fn set_lighting(&mut self, enabled: bool) -> Result<(), BackendError>;

    fn bind_light(&mut self, slot: usize, light: &LightState) -> Result<(), BackendError>;

    fn disable_light(&mut self, slot: usize) -> Result<(), BackendError>;

    fn clear_depth(&mut self) -> Result<(), BackendError>;

    fn set_depth_test(&mut self, enabled: bool) -> Result<(), BackendError>;

    fn set_blending(&mut self, enabled: bool) -> Result<(), BackendError>;

    fn set_wireframe(&mut self, enabled: bool) -> Result<(), BackendError>;

    fn draw_mesh(
        &mut self,
        mesh: MeshId,
        model_view: Mat4,
        material: &Material,
    ) -> Result<(), BackendError>;
}
