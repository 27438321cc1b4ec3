//! Rendering of pipeline outputs to JSON and plain text.

mod json;
mod text;

pub use json::{chunks_to_json, to_json, to_json_lines, JsonFormat};
pub use text::{chunks_to_text, to_text};
