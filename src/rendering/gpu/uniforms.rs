use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::rendering::backend::{LightState, Material};

/// Light slots compiled into the shader.
pub const MAX_GPU_LIGHTS: usize = 8;

/// Dynamic uniform offsets must be aligned to this on every backend wgpu targets.
pub const UNIFORM_ALIGNMENT: u64 = 256;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub position: Vec4,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    /// Constant, linear and quadratic factors; `w` is unused.
    pub attenuation: Vec4,
}

impl From<&LightState> for GpuLight {
    fn from(light: &LightState) -> Self {
        Self {
            position: light.position,
            ambient: light.ambient,
            diffuse: light.diffuse,
            specular: light.specular,
            attenuation: Vec4::new(
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
                0.0,
            ),
        }
    }
}

/// Everything one draw call reads, snapshotted from the backend state at the
/// time of the call. Must match `DrawUniform` in `scene.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DrawUniform {
    pub model_view: Mat4,
    pub projection: Mat4,
    pub normal_matrix: Mat4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emissive: Vec4,
    pub ambient: Vec4,
    /// x: lighting enabled, y: enabled light mask.
    pub params: [u32; 4],
    pub lights: [GpuLight; MAX_GPU_LIGHTS],
}

impl DrawUniform {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Distance between consecutive draws in the uniform buffer.
    pub const STRIDE: u64 = Self::SIZE.div_ceil(UNIFORM_ALIGNMENT) * UNIFORM_ALIGNMENT;

    pub fn new(
        model_view: Mat4,
        projection: Mat4,
        material: &Material,
        lighting: &LightingState,
    ) -> Self {
        Self {
            model_view,
            projection,
            normal_matrix: model_view.inverse().transpose(),
            diffuse: material.diffuse,
            specular: material.specular,
            emissive: material.emissive,
            ambient: lighting.ambient,
            params: [lighting.enabled as u32, lighting.light_mask, 0, 0],
            lights: lighting.lights,
        }
    }
}

/// Fixed-function lighting state the backend accumulates between draws.
#[derive(Debug, Clone, Copy)]
pub struct LightingState {
    pub enabled: bool,
    pub ambient: Vec4,
    pub light_mask: u32,
    pub lights: [GpuLight; MAX_GPU_LIGHTS],
}

impl Default for LightingState {
    fn default() -> Self {
        Self {
            enabled: false,
            ambient: Vec4::ZERO,
            light_mask: 0,
            lights: [GpuLight::default(); MAX_GPU_LIGHTS],
        }
    }
}

impl LightingState {
    pub fn bind(&mut self, slot: usize, light: &LightState) {
        self.lights[slot] = GpuLight::from(light);
        self.light_mask |= 1 << slot;
    }

    pub fn disable(&mut self, slot: usize) {
        self.light_mask &= !(1 << slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::Attenuation;

    #[test]
    fn stride_is_aligned_and_fits_the_uniform() {
        assert_eq!(DrawUniform::STRIDE % UNIFORM_ALIGNMENT, 0);
        assert!(DrawUniform::STRIDE >= DrawUniform::SIZE);
        assert_eq!(std::mem::size_of::<GpuLight>() % 16, 0);
    }

    #[test]
    fn binding_and_disabling_updates_the_mask() {
        let mut lighting = LightingState::default();
        let light = LightState {
            position: Vec4::new(0.0, 0.0, -5.0, 1.0),
            ambient: Vec4::ZERO,
            diffuse: Vec4::ONE,
            specular: Vec4::ONE,
            attenuation: Attenuation::default(),
        };

        lighting.bind(0, &light);
        lighting.bind(3, &light);
        assert_eq!(lighting.light_mask, 0b1001);

        lighting.disable(0);
        assert_eq!(lighting.light_mask, 0b1000);
        assert_eq!(lighting.lights[3].attenuation, Vec4::new(1.0, 0.0, 0.0, 0.0));
    }
}
