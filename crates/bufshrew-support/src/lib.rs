//! # Bufshrew Support
//!
//! ABI definitions shared by the host runtime (`bufshrew-runtime`) and guest
//! bindings (`bufshrew-core`). Nothing in here touches wasmtime or guest
//! memory directly; it only describes how a buffer handle is encoded and where
//! each argument of a bridge call lives inside its call frame.
//!
//! ## Crate hierarchy
//!
//! ```text
//! bufshrew-cli
//! ├── bufshrew-runtime (wasmtime host, buffer registry)
//! ├── bufshrew-core    (guest bindings, File adapter)
//! └── bufshrew-support (handle + frame ABI)
//! ```

pub mod frame;
pub mod handle;

pub use frame::{ReadFrame, WriteFrame, FRAME_ABI_VERSION, READ_FRAME_SIZE, WRITE_FRAME_SIZE};
pub use handle::BufferHandle;

/// Import module the host functions are linked under unless configured otherwise.
pub const DEFAULT_IMPORT_MODULE: &str = "env";

/// Import name of the read operation. Part of the guest ABI, do not rename.
pub const READ_SYMBOL: &str = "__buffer_read";

/// Import name of the append-write operation. Part of the guest ABI, do not rename.
pub const WRITE_SYMBOL: &str = "__buffer_write";
