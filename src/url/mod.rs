//! URL handling module for Web-Harvest
//!
//! This module provides seed validation, origin comparison and link
//! resolution. URLs are compared in their resolved form; no further
//! normalization is applied.

mod origin;
mod resolve;

// Re-export main functions
pub use origin::{is_same_origin, origin_of, parse_http_url, path_of};
pub use resolve::resolve_link;
