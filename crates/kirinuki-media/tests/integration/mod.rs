//! End-to-end tests for caption compositing and filter graphs.
//!
//! Tests that drive a real encoder are ignored by default.

pub mod ffmpeg_tests;
pub mod scenario_tests;
pub mod snapshot_tests;
