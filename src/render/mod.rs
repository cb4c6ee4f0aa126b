//! Export of reconstructed trees.

mod json;

pub use json::{from_json, to_json, JsonFormat};
