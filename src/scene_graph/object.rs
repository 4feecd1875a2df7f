use glam::{Mat4, Vec3};

use crate::error::BackendError;
use crate::rendering::{
    backend::GraphicsBackend,
    context::{RenderContext, Viewport},
};
use crate::scene_graph::{light::Light, node::Node, record::NodeRecord, transform::Transform};

/// How a node takes part in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPriority {
    /// Not drawn as a world object (containers, cameras, lights).
    Ignore,
    /// Opaque, drawn under the shared near/far projection.
    Solid,
    /// Blended, drawn after all solids under the shared projection.
    Translucent,
    /// Painter's-algorithm draw with the node's own projection. Higher values
    /// are drawn first.
    Painted(i32),
}

impl DrawPriority {
    /// Raw value of [`DrawPriority::Translucent`]; raw priorities above it are painted.
    pub const TRANSLUCENT_RAW: i32 = 2;

    pub fn from_raw(raw: i32) -> Self {
        match raw {
            i32::MIN..=0 => DrawPriority::Ignore,
            1 => DrawPriority::Solid,
            Self::TRANSLUCENT_RAW => DrawPriority::Translucent,
            painted => DrawPriority::Painted(painted),
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            DrawPriority::Ignore => 0,
            DrawPriority::Solid => 1,
            DrawPriority::Translucent => Self::TRANSLUCENT_RAW,
            DrawPriority::Painted(priority) => priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    ViewportResized(Viewport),
    /// Application-defined command, matched by name.
    Command(String),
}

/// Everything a node needs while drawing itself.
pub struct DrawArgs<'a> {
    pub context: &'a RenderContext,
    pub node: &'a Node,
    pub backend: &'a mut dyn GraphicsBackend,
}

impl DrawArgs<'_> {
    /// View-space transform including the node's own scale.
    pub fn model_view(&self) -> Mat4 {
        self.node.modelview() * Mat4::from_scale(Vec3::splat(self.node.transform().scale()))
    }

    pub fn eye_position(&self) -> Vec3 {
        self.node.eye_position()
    }

    pub fn set_projection(&mut self, near: f32, far: f32) -> Result<(), BackendError> {
        let projection = self.context.projection(near, far);
        self.backend.set_projection(projection)
    }

    /// Installs a projection whose depth range just encloses this node.
    pub fn fit_projection_to_self(&mut self, extent: f32) -> Result<(), BackendError> {
        let config = &self.context.config;
        let distance = self.eye_position().length();
        let radius = extent * self.node.transform().scale();
        let near = (distance - radius).max(config.min_near_plane) * config.near_margin;
        let mut far = (distance + radius) * config.far_margin;
        if far <= near {
            far = near * 2.0;
        }
        self.set_projection(near, far)
    }
}

pub struct UpdateArgs<'a> {
    pub context: &'a RenderContext,
    pub transform: &'a mut Transform,
    pub dt: f32,
}

/// Behaviour attached to a scene node.
///
/// The traversal only ever talks to nodes through this trait, so concrete
/// kinds (bodies, vehicles, stars, lights) are free to draw however they
/// like as long as they report their priority and extent honestly.
pub trait SceneObject {
    fn priority(&self, _context: &RenderContext) -> DrawPriority {
        DrawPriority::Ignore
    }

    /// Bounding radius in node-local units, before the node's scale.
    fn max_extent(&self) -> f32 {
        0.0
    }

    fn draw(&self, _args: &mut DrawArgs<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn init(&mut self, _context: &RenderContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn update(&mut self, _args: UpdateArgs<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn cleanup(&mut self, _context: &RenderContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Returns true when the event was consumed.
    fn handle_event(&mut self, _event: &NodeEvent) -> bool {
        false
    }

    fn save(&self, _record: &mut NodeRecord) {}

    fn as_light(&self) -> Option<&Light> {
        None
    }

    /// Identity the kind wants when the node has no explicit name.
    fn default_name(&self) -> Option<String> {
        None
    }
}

/// Plain container; also used for cameras and attachment points.
#[derive(Debug, Default, Clone, Copy)]
pub struct Group;

impl SceneObject for Group {}
