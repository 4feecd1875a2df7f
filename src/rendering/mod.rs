pub mod backend;
pub mod context;
pub mod draw_list;
pub mod gpu;
pub mod mesh;
pub mod recording;
pub mod renderer;
