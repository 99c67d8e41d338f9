pub mod api_types;
pub mod classify_types;
pub mod screenshot_types;
