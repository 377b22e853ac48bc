//! Call-frame layouts for the two bridge operations
//!
//! The guest passes a single `i32` to each import: the address of a flat
//! frame in its linear memory. Every argument and the result occupy one
//! 8-byte little-endian slot at a fixed offset. The offsets below are the
//! whole wire contract with the guest; the `#[repr(C)]` layout structs exist
//! only so the compiler can check the constants never drift.
//!
//! ## Read frame (64 bytes)
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0      | reserved (return slot) |
//! | 8      | `start` |
//! | 16     | `handle` |
//! | 24     | reserved (handle aux) |
//! | 32     | `dest_ptr` |
//! | 40     | `dest_len` |
//! | 48     | `dest_cap` (ignored by the host) |
//! | 56     | result: bytes copied |
//!
//! ## Write frame (48 bytes)
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0      | reserved (return slot) |
//! | 8      | `handle` |
//! | 16     | reserved (handle aux) |
//! | 24     | `src_ptr` |
//! | 32     | `src_len` |
//! | 40     | `src_cap` (ignored by the host) |

use crate::handle::BufferHandle;
use std::mem::{offset_of, size_of};

/// Bumped whenever an offset or width below changes.
pub const FRAME_ABI_VERSION: u32 = 1;

const SLOT: usize = 8;

pub const READ_START_OFFSET: usize = 8;
pub const READ_HANDLE_OFFSET: usize = 16;
pub const READ_DEST_PTR_OFFSET: usize = 32;
pub const READ_DEST_LEN_OFFSET: usize = 40;
pub const READ_DEST_CAP_OFFSET: usize = 48;
pub const READ_RESULT_OFFSET: usize = 56;
pub const READ_FRAME_SIZE: usize = 64;

pub const WRITE_HANDLE_OFFSET: usize = 8;
pub const WRITE_SRC_PTR_OFFSET: usize = 24;
pub const WRITE_SRC_LEN_OFFSET: usize = 32;
pub const WRITE_SRC_CAP_OFFSET: usize = 40;
pub const WRITE_FRAME_SIZE: usize = 48;

#[allow(dead_code)]
#[repr(C)]
struct ReadFrameLayout {
    ret: u64,
    start: u64,
    handle: u64,
    handle_aux: u64,
    dest_ptr: u64,
    dest_len: u64,
    dest_cap: u64,
    result: u64,
}

#[allow(dead_code)]
#[repr(C)]
struct WriteFrameLayout {
    ret: u64,
    handle: u64,
    handle_aux: u64,
    src_ptr: u64,
    src_len: u64,
    src_cap: u64,
}

const _: () = {
    assert!(offset_of!(ReadFrameLayout, start) == READ_START_OFFSET);
    assert!(offset_of!(ReadFrameLayout, handle) == READ_HANDLE_OFFSET);
    assert!(offset_of!(ReadFrameLayout, dest_ptr) == READ_DEST_PTR_OFFSET);
    assert!(offset_of!(ReadFrameLayout, dest_len) == READ_DEST_LEN_OFFSET);
    assert!(offset_of!(ReadFrameLayout, dest_cap) == READ_DEST_CAP_OFFSET);
    assert!(offset_of!(ReadFrameLayout, result) == READ_RESULT_OFFSET);
    assert!(size_of::<ReadFrameLayout>() == READ_FRAME_SIZE);

    assert!(offset_of!(WriteFrameLayout, handle) == WRITE_HANDLE_OFFSET);
    assert!(offset_of!(WriteFrameLayout, src_ptr) == WRITE_SRC_PTR_OFFSET);
    assert!(offset_of!(WriteFrameLayout, src_len) == WRITE_SRC_LEN_OFFSET);
    assert!(offset_of!(WriteFrameLayout, src_cap) == WRITE_SRC_CAP_OFFSET);
    assert!(size_of::<WriteFrameLayout>() == WRITE_FRAME_SIZE);
};

fn load_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; SLOT];
    word.copy_from_slice(&bytes[offset..offset + SLOT]);
    u64::from_le_bytes(word)
}

fn store_u64(bytes: &mut [u8], offset: usize, value: u64) {
    bytes[offset..offset + SLOT].copy_from_slice(&value.to_le_bytes());
}

/// Arguments of a read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFrame {
    pub start: u64,
    pub handle: BufferHandle,
    pub dest_ptr: u64,
    pub dest_len: u64,
}

impl ReadFrame {
    pub fn decode(bytes: &[u8; READ_FRAME_SIZE]) -> Self {
        Self {
            start: load_u64(bytes, READ_START_OFFSET),
            handle: BufferHandle::from_raw(load_u64(bytes, READ_HANDLE_OFFSET)),
            dest_ptr: load_u64(bytes, READ_DEST_PTR_OFFSET),
            dest_len: load_u64(bytes, READ_DEST_LEN_OFFSET),
        }
    }

    /// Lays the arguments out as the guest would, with a zeroed result slot.
    pub fn encode(&self) -> [u8; READ_FRAME_SIZE] {
        let mut bytes = [0u8; READ_FRAME_SIZE];
        store_u64(&mut bytes, READ_START_OFFSET, self.start);
        store_u64(&mut bytes, READ_HANDLE_OFFSET, self.handle.to_raw());
        store_u64(&mut bytes, READ_DEST_PTR_OFFSET, self.dest_ptr);
        store_u64(&mut bytes, READ_DEST_LEN_OFFSET, self.dest_len);
        store_u64(&mut bytes, READ_DEST_CAP_OFFSET, self.dest_len);
        bytes
    }

    /// Writes the byte count into the result slot; the upper half of the slot is zeroed.
    pub fn store_result(bytes: &mut [u8; READ_FRAME_SIZE], copied: u32) {
        store_u64(bytes, READ_RESULT_OFFSET, copied as u64);
    }

    pub fn load_result(bytes: &[u8; READ_FRAME_SIZE]) -> u32 {
        load_u64(bytes, READ_RESULT_OFFSET) as u32
    }
}

/// Arguments of an append-write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFrame {
    pub handle: BufferHandle,
    pub src_ptr: u64,
    pub src_len: u64,
}

impl WriteFrame {
    pub fn decode(bytes: &[u8; WRITE_FRAME_SIZE]) -> Self {
        Self {
            handle: BufferHandle::from_raw(load_u64(bytes, WRITE_HANDLE_OFFSET)),
            src_ptr: load_u64(bytes, WRITE_SRC_PTR_OFFSET),
            src_len: load_u64(bytes, WRITE_SRC_LEN_OFFSET),
        }
    }

    pub fn encode(&self) -> [u8; WRITE_FRAME_SIZE] {
        let mut bytes = [0u8; WRITE_FRAME_SIZE];
        store_u64(&mut bytes, WRITE_HANDLE_OFFSET, self.handle.to_raw());
        store_u64(&mut bytes, WRITE_SRC_PTR_OFFSET, self.src_ptr);
        store_u64(&mut bytes, WRITE_SRC_LEN_OFFSET, self.src_len);
        store_u64(&mut bytes, WRITE_SRC_CAP_OFFSET, self.src_len);
        bytes
    }
}
