//! Integration test runner.
//!
//! Run all integration tests:
//!   cargo test -p kirinuki-media --test integration
//!
//! Run tests that need a real ffmpeg binary:
//!   cargo test -p kirinuki-media --test integration -- --ignored

#[path = "integration/mod.rs"]
mod integration;
