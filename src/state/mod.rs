//! State module for tracking fetch progress
//!
//! # Components
//!
//! - `FetchState`: the lifecycle of a single page request (pending, attempting, backoff, terminal)
//! - `FetchTracker`: owns one request's state and attempt counter, rejecting illegal transitions

mod fetch_state;

// Re-export main types
pub use fetch_state::{FetchState, FetchTracker};
