pub mod config;
pub mod error;
pub mod math;
pub mod objects;
pub mod rendering;
pub mod scene_graph;

pub use config::RenderConfig;
pub use error::{BackendError, Error, Result};
pub use rendering::{
    context::{RenderContext, RenderFlags, Viewport},
    draw_list::{pre_draw_scene, DrawList},
    renderer::{draw_scene, FrameStats},
};
pub use scene_graph::{
    DrawFlags, DrawPriority, DrawResults, Light, Node, NodeId, Scene, SceneObject, Transform,
};
