//! Validation modules

pub mod path;

pub use path::{sanitize_file_name, sanitize_segment, ImagePathPolicy};
