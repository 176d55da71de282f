pub mod file_renderer;
pub mod render_channel;

pub use file_renderer::FileRenderer;
pub use render_channel::{spawn_render_worker, RenderDispatcher, RenderJob, Renderer};
