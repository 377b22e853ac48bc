//! Error types for bufshrew-runtime

use bufshrew_support::BufferHandle;
use thiserror::Error;

/// Failure of a single bridge call.
///
/// The guest never sees these directly: the host function leaves the buffer
/// untouched, reports zero bytes where it can, and records the error on the
/// store so the embedder gets it back from [`crate::BridgeRuntime::invoke`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Invalid or stale buffer handle {0}")]
    InvalidHandle(BufferHandle),

    #[error("Call frame at {sp:#x} ({size} bytes) is outside guest memory")]
    FrameOutOfBounds { sp: u32, size: usize },

    #[error("Guest range {ptr:#x}+{len} is outside guest memory")]
    GuestRangeOutOfBounds { ptr: u64, len: u64 },

    #[error("Guest module does not export a memory named \"memory\"")]
    MissingMemory,

    #[error("Bridge context lock poisoned: {0}")]
    ContextPoisoned(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
