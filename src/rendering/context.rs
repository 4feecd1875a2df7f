use bitflags::bitflags;
use glam::Mat4;

use crate::config::RenderConfig;
use crate::math::{bounds::BoundingSphere, frustum::Frustum};
use crate::scene_graph::{Node, NodeId};

bitflags! {
    /// Frame-wide render modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u32 {
        const UNLIT = 1 << 0;
        const WIREFRAME = 1 << 1;
        const NO_TEXTURES = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Per-frame inputs supplied by the application.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub camera: NodeId,
    pub viewport: Viewport,
    /// Full vertical field of view, radians.
    pub fov_y: f32,
    pub flags: RenderFlags,
    /// Number of hardware light slots.
    pub max_lights: usize,
    pub config: RenderConfig,
}

impl RenderContext {
    pub const DEFAULT_MAX_LIGHTS: usize = 8;

    pub fn new(camera: NodeId, viewport: Viewport) -> Self {
        Self {
            camera,
            viewport,
            fov_y: 45f32.to_radians(),
            flags: RenderFlags::empty(),
            max_lights: Self::DEFAULT_MAX_LIGHTS,
            config: RenderConfig::default(),
        }
    }

    pub fn with_fov_y(mut self, fov_y: f32) -> Self {
        self.fov_y = fov_y;
        self
    }

    pub fn with_flags(mut self, flags: RenderFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_max_lights(mut self, max_lights: usize) -> Self {
        self.max_lights = max_lights;
        self
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.viewport.aspect_ratio()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_field_of_view(self.fov_y, self.aspect_ratio())
    }

    pub fn projection(&self, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio(), near, far)
    }

    /// Field-of-view test of the node's scaled bounding sphere at its
    /// stamped eye-space position.
    pub fn is_on_screen(&self, frustum: &Frustum, node: &Node) -> bool {
        BoundingSphere {
            center: node.eye_position(),
            radius: node.scaled_extent(),
        }
        .intersects_frustum(frustum)
    }
}
