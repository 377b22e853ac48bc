//! Guest bindings for the bufshrew buffer bridge
//!
//! Guest code compiled to `wasm32` talks to host buffers through
//! [`HostBridge`], which lays out call frames in its own linear memory and
//! calls the `__buffer_read` / `__buffer_write` imports. Most code should not
//! call the bridge directly and instead wrap a handle in a [`File`], which
//! tracks the read cursor and gives `std::io::Read` / `std::io::Write`.

pub mod bridge;
pub mod file;

pub use bridge::BufferBridge;
#[cfg(target_arch = "wasm32")]
pub use bridge::HostBridge;
pub use file::File;

pub use bufshrew_support::BufferHandle;
