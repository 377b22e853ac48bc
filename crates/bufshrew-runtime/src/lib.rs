//! Host runtime for the bufshrew buffer bridge
//!
//! Guests running under wasmtime get two imports, `__buffer_read` and
//! `__buffer_write`, which copy bytes out of and append bytes to buffers the
//! host keeps in a [`BufferRegistry`]. Guests only ever hold opaque
//! [`BufferHandle`]s; the bytes stay on the host side.

// Core modules
pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod runtime;

#[cfg(test)]
pub mod tests;

pub use bridge::{append, read_at};
pub use config::BridgeConfig;
pub use context::{BridgeContext, BridgeStats};
pub use error::{BridgeError, BridgeResult};
pub use registry::BufferRegistry;
pub use runtime::{BridgeRuntime, State};

pub use bufshrew_support::{BufferHandle, DEFAULT_IMPORT_MODULE, READ_SYMBOL, WRITE_SYMBOL};
