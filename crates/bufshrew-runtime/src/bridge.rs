//! The two bridge operations
//!
//! [`read_at`] and [`append`] are the whole semantics of the bridge, written
//! against plain slices. [`host_read`] and [`host_write`] are the marshalling
//! around them: decode the call frame at `sp` from guest memory, bounds-check
//! every guest span, run the operation against the registry, and store the
//! result back into the frame.

use std::ops::Range;
use std::sync::Mutex;

use bufshrew_support::{ReadFrame, WriteFrame, READ_FRAME_SIZE, WRITE_FRAME_SIZE};
use log::trace;
use wasmtime::{Caller, Memory};

use crate::context::BridgeContext;
use crate::error::{BridgeError, BridgeResult};
use crate::runtime::State;

const TRACE_PREVIEW_LEN: usize = 32;

/// Copies `min(dest.len(), buffer.len() - start)` bytes from `buffer[start..]`
/// into the front of `dest`. A `start` at or past the end copies nothing.
pub fn read_at(buffer: &[u8], start: u64, dest: &mut [u8]) -> usize {
    let start = match usize::try_from(start) {
        Ok(start) if start < buffer.len() => start,
        _ => return 0,
    };
    let available = &buffer[start..];
    let copied = available.len().min(dest.len());
    dest[..copied].copy_from_slice(&available[..copied]);
    copied
}

/// Appends `src` to `buffer`, preserving order.
pub fn append(buffer: &mut Vec<u8>, src: &[u8]) {
    buffer.extend_from_slice(src);
}

/// Resolves a guest `(ptr, len)` span to a range inside a memory of `memory_len` bytes.
pub fn guest_range(ptr: u64, len: u64, memory_len: usize) -> BridgeResult<Range<usize>> {
    let out_of_bounds = || BridgeError::GuestRangeOutOfBounds { ptr, len };
    let start = usize::try_from(ptr).map_err(|_| out_of_bounds())?;
    let size = usize::try_from(len).map_err(|_| out_of_bounds())?;
    let end = start.checked_add(size).ok_or_else(out_of_bounds)?;
    if end > memory_len {
        return Err(out_of_bounds());
    }
    Ok(start..end)
}

/// Resolves the frame at guest address `sp`. Guest addresses are unsigned.
pub fn frame_range(sp: i32, size: usize, memory_len: usize) -> BridgeResult<Range<usize>> {
    let sp = sp as u32;
    let start = sp as usize;
    match start.checked_add(size) {
        Some(end) if end <= memory_len => Ok(start..end),
        _ => Err(BridgeError::FrameOutOfBounds { sp, size }),
    }
}

pub fn guest_memory(caller: &mut Caller<'_, State>) -> BridgeResult<Memory> {
    match caller.get_export("memory") {
        Some(export) => export.into_memory().ok_or(BridgeError::MissingMemory),
        None => Err(BridgeError::MissingMemory),
    }
}

fn lock(context: &Mutex<BridgeContext>) -> BridgeResult<std::sync::MutexGuard<'_, BridgeContext>> {
    context
        .lock()
        .map_err(|e| BridgeError::ContextPoisoned(e.to_string()))
}

/// Body of the `__buffer_read` import. Returns the number of bytes copied.
///
/// Once the frame itself is in bounds its result slot is always written, with
/// 0 when the call fails.
pub fn host_read(
    context: &Mutex<BridgeContext>,
    caller: &mut Caller<'_, State>,
    sp: i32,
) -> BridgeResult<u32> {
    let memory = guest_memory(caller)?;
    let data = memory.data_mut(&mut *caller);
    let frame_at = frame_range(sp, READ_FRAME_SIZE, data.len())?;
    let frame_bytes = <[u8; READ_FRAME_SIZE]>::try_from(&data[frame_at.clone()]).map_err(|_| {
        BridgeError::FrameOutOfBounds {
            sp: sp as u32,
            size: READ_FRAME_SIZE,
        }
    })?;
    let frame = ReadFrame::decode(&frame_bytes);

    let outcome = copy_out(context, data, &frame);
    let copied = match &outcome {
        Ok(copied) => *copied,
        Err(_) => 0,
    };
    if let Ok(slot) = <&mut [u8; READ_FRAME_SIZE]>::try_from(&mut data[frame_at]) {
        ReadFrame::store_result(slot, copied);
    }
    trace!(
        "__buffer_read {} start={} cap={} copied={}",
        frame.handle,
        frame.start,
        frame.dest_len,
        copied
    );
    outcome
}

/// Resolves a read destination. The copied count is reported as a `u32`, so a
/// span longer than `u32::MAX` is rejected before anything is copied.
pub fn dest_range(frame: &ReadFrame, memory_len: usize) -> BridgeResult<Range<usize>> {
    let dest = guest_range(frame.dest_ptr, frame.dest_len, memory_len)?;
    if u32::try_from(dest.len()).is_err() {
        return Err(BridgeError::GuestRangeOutOfBounds {
            ptr: frame.dest_ptr,
            len: frame.dest_len,
        });
    }
    Ok(dest)
}

fn copy_out(context: &Mutex<BridgeContext>, data: &mut [u8], frame: &ReadFrame) -> BridgeResult<u32> {
    let dest = dest_range(frame, data.len())?;
    let copied = lock(context)?.read(frame.handle, frame.start, &mut data[dest])?;
    u32::try_from(copied).map_err(|_| BridgeError::GuestRangeOutOfBounds {
        ptr: frame.dest_ptr,
        len: frame.dest_len,
    })
}

/// Body of the `__buffer_write` import. Returns the number of bytes appended.
pub fn host_write(
    context: &Mutex<BridgeContext>,
    caller: &mut Caller<'_, State>,
    sp: i32,
) -> BridgeResult<usize> {
    let memory = guest_memory(caller)?;
    let data = memory.data(&*caller);
    let frame_at = frame_range(sp, WRITE_FRAME_SIZE, data.len())?;
    let frame_bytes = <[u8; WRITE_FRAME_SIZE]>::try_from(&data[frame_at]).map_err(|_| {
        BridgeError::FrameOutOfBounds {
            sp: sp as u32,
            size: WRITE_FRAME_SIZE,
        }
    })?;
    let frame = WriteFrame::decode(&frame_bytes);

    let src = &data[guest_range(frame.src_ptr, frame.src_len, data.len())?];
    lock(context)?.write(frame.handle, src)?;
    trace!(
        "__buffer_write {} +{} bytes: {}",
        frame.handle,
        src.len(),
        hex::encode(&src[..src.len().min(TRACE_PREVIEW_LEN)])
    );
    Ok(src.len())
}
