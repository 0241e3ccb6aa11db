//! Shared test fixtures and utilities for cinder crates.
//!
//! Provides a recording scheduler, a recording contact delegate, and
//! helpers for building small scene/world fixtures.

pub mod mocks;
pub mod spawn;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use mocks::{ContactLog, RecordingDelegate, RecordingScheduler};
pub use spawn::{circle_node, ground_node, test_world};
