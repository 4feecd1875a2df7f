use glam::{Mat4, Vec4};

use crate::error::BackendError;
use crate::rendering::{
    backend::{GraphicsBackend, LightState, Material},
    context::Viewport,
    mesh::MeshId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Viewport(Viewport),
    Projection(Mat4),
    Ambient(Vec4),
    Lighting(bool),
    BindLight { slot: usize, light: LightState },
    DisableLight(usize),
    ClearDepth,
    DepthTest(bool),
    Blending(bool),
    Wireframe(bool),
    DrawMesh {
        mesh: MeshId,
        model_view: Mat4,
        material: Material,
    },
}

/// Headless backend that keeps every call in order, for tests and for
/// inspecting what a frame would submit.
pub struct RecordingBackend {
    max_lights: usize,
    calls: Vec<BackendCall>,
}

impl RecordingBackend {
    pub fn new(max_lights: usize) -> Self {
        Self {
            max_lights,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::DrawMesh { .. }))
            .count()
    }

    pub fn projections(&self) -> Vec<Mat4> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Projection(projection) => Some(*projection),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: BackendCall) -> Result<(), BackendError> {
        self.calls.push(call);
        Ok(())
    }

    fn check_slot(&self, slot: usize) -> Result<(), BackendError> {
        if slot >= self.max_lights {
            return Err(BackendError::LightSlot {
                slot,
                capacity: self.max_lights,
            });
        }
        Ok(())
    }
}

impl GraphicsBackend for RecordingBackend {
    fn max_lights(&self) -> usize {
        self.max_lights
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<(), BackendError> {
        self.record(BackendCall::Viewport(viewport))
    }

    fn set_projection(&mut self, projection: Mat4) -> Result<(), BackendError> {
        self.record(BackendCall::Projection(projection))
    }

    fn set_ambient(&mut self, color: Vec4) -> Result<(), BackendError> {
        self.record(BackendCall::Ambient(color))
    }

    fn set_lighting(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.record(BackendCall::Lighting(enabled))
    }

    fn bind_light(&mut self, slot: usize, light: &LightState) -> Result<(), BackendError> {
        self.check_slot(slot)?;
        self.record(BackendCall::BindLight {
            slot,
            light: *light,
        })
    }

    fn disable_light(&mut self, slot: usize) -> Result<(), BackendError> {
        self.check_slot(slot)?;
        self.record(BackendCall::DisableLight(slot))
    }

    fn clear_depth(&mut self) -> Result<(), BackendError> {
        self.record(BackendCall::ClearDepth)
    }

    fn set_depth_test(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.record(BackendCall::DepthTest(enabled))
    }

    fn set_blending(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.record(BackendCall::Blending(enabled))
    }

    fn set_wireframe(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.record(BackendCall::Wireframe(enabled))
    }

    fn draw_mesh(
        &mut self,
        mesh: MeshId,
        model_view: Mat4,
        material: &Material,
    ) -> Result<(), BackendError> {
        self.record(BackendCall::DrawMesh {
            mesh,
            model_view,
            material: *material,
        })
    }
}
