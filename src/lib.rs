//! Bufshrew Test Suite
//!
//! End-to-end tests that drive real guest modules through the bufshrew
//! runtime, the guest `File` adapter and the `bufshrew` CLI.

pub mod test_utils;

#[cfg(test)]
pub mod tests;

// Re-export test utilities for external use
pub use test_utils::{ContextBridge, TestConfig, TRANSFORM_GUEST_WAT};
