pub mod light;
pub mod node;
pub mod object;
pub mod record;
pub mod relative;
pub mod scene;
pub mod transform;

// Re-export main types for convenience
pub use light::{Attenuation, Light};
pub use node::{DrawFlags, DrawResults, Node, NodeId};
pub use object::{DrawArgs, DrawPriority, Group, NodeEvent, SceneObject, UpdateArgs};
pub use record::NodeRecord;
pub use relative::{relative_distance, relative_position, relative_transform};
pub use scene::Scene;
pub use transform::Transform;
