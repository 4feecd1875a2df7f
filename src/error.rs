use thiserror::Error;

use crate::rendering::mesh::MeshId;
use crate::scene_graph::NodeId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("camera node {0:?} is not part of the scene")]
    MissingCamera(NodeId),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A node hook failed; the frame is aborted.
    #[error("node `{name}` failed during {stage}")]
    Node {
        name: String,
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised by a [`GraphicsBackend`](crate::rendering::backend::GraphicsBackend).
///
/// These are fatal for the current frame.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("mesh {0:?} has not been uploaded to the backend")]
    UnknownMesh(MeshId),

    #[error("light slot {slot} is out of range (backend supports {capacity})")]
    LightSlot { slot: usize, capacity: usize },

    #[error("graphics device error: {0}")]
    Device(String),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
