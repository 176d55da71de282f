pub mod lesson_ctx;
pub mod lesson_flow;
pub mod revision;

pub use lesson_ctx::{LessonCtx, UnitState};
pub use lesson_flow::LessonFlow;
pub use revision::{RevisionController, RevisionState};
