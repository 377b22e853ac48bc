//! End-to-end tests for the bufshrew buffer bridge
//!
//! These run the test guest from [`crate::test_utils`] under the real
//! runtime, use the guest `File` adapter against the host registry, and
//! drive the `bufshrew` CLI against files on disk.
