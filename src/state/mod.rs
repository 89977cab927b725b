//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RunState`: Lifecycle of a crawl run (idle, running, paused, stopped, completed)
//! - `DispatchPacer`: Per-worker spacing between successive fetches

mod pacer;
mod run_state;

// Re-export main types
pub use pacer::DispatchPacer;
pub use run_state::RunState;
