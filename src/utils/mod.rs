pub mod json;
pub mod logging;

pub use json::safe_json_loads;
pub use logging::truncate_text;
