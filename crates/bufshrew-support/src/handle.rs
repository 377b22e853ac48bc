//! Opaque buffer handles
//!
//! A handle is a generational index into the host's buffer registry, packed
//! into a single `u64` so it fits one call-frame slot and one `i64` export
//! parameter:
//!
//! ```text
//!  63            32 31             0
//! +----------------+----------------+
//! |   generation   |     index      |
//! +----------------+----------------+
//! ```
//!
//! The host never hands out generation 0, so a zeroed frame slot is never a
//! live handle.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle {
    index: u32,
    generation: u32,
}

impl BufferHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the registry.
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time the handle was issued.
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    pub const fn to_raw(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl From<BufferHandle> for u64 {
    fn from(handle: BufferHandle) -> u64 {
        handle.to_raw()
    }
}

impl From<u64> for BufferHandle {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
