//! Generational registry of host-owned byte buffers
//!
//! Guests only ever see [`BufferHandle`]s. A handle stays valid until the host
//! removes its buffer; after that the slot may be reused, but with a bumped
//! generation, so the old handle keeps failing lookups instead of silently
//! aliasing the new buffer.

use bufshrew_support::BufferHandle;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::bridge::{append, read_at};
use crate::error::{BridgeError, BridgeResult};

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    buffer: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
pub struct BufferRegistry {
    slots: Vec<Slot>,
    // Min-heap, so the lowest free index is reused first.
    free: BinaryHeap<Reverse<u32>>,
    live: usize,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` and returns the handle naming them.
    pub fn insert(&mut self, bytes: Vec<u8>) -> BufferHandle {
        self.live += 1;
        if let Some(Reverse(index)) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = next_generation(slot.generation);
            slot.buffer = Some(bytes);
            return BufferHandle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            buffer: Some(bytes),
        });
        BufferHandle::new(index, 1)
    }

    /// Registers a fresh, empty buffer.
    pub fn create(&mut self) -> BufferHandle {
        self.insert(Vec::new())
    }

    /// Releases the buffer and hands its bytes back to the caller.
    pub fn remove(&mut self, handle: BufferHandle) -> Option<Vec<u8>> {
        let slot = self.slot_mut(handle)?;
        let bytes = slot.buffer.take()?;
        self.free.push(Reverse(handle.index()));
        self.live -= 1;
        Some(bytes)
    }

    pub fn get(&self, handle: BufferHandle) -> Option<&[u8]> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.buffer.as_deref()
    }

    pub fn get_mut(&mut self, handle: BufferHandle) -> Option<&mut Vec<u8>> {
        self.slot_mut(handle)?.buffer.as_mut()
    }

    pub fn contains(&self, handle: BufferHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live buffers.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Copies bytes starting at `start` into `dest`, returning how many were copied.
    pub fn read(&self, handle: BufferHandle, start: u64, dest: &mut [u8]) -> BridgeResult<usize> {
        let buffer = self.get(handle).ok_or(BridgeError::InvalidHandle(handle))?;
        Ok(read_at(buffer, start, dest))
    }

    /// Appends `src` to the end of the buffer.
    pub fn write(&mut self, handle: BufferHandle, src: &[u8]) -> BridgeResult<()> {
        let buffer = self
            .get_mut(handle)
            .ok_or(BridgeError::InvalidHandle(handle))?;
        append(buffer, src);
        Ok(())
    }

    fn slot_mut(&mut self, handle: BufferHandle) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        Some(slot)
    }
}

// Generation 0 is reserved for "never issued".
fn next_generation(generation: u32) -> u32 {
    match generation.wrapping_add(1) {
        0 => 1,
        g => g,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut registry = BufferRegistry::new();
        let a = registry.insert(b"alpha".to_vec());
        let b = registry.create();

        assert_ne!(a, b);
        assert_eq!(registry.get(a), Some(&b"alpha"[..]));
        assert_eq!(registry.get(b), Some(&b""[..]));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_zero_handle_never_resolves() {
        let mut registry = BufferRegistry::new();
        registry.insert(b"data".to_vec());
        assert!(!registry.contains(BufferHandle::from_raw(0)));
        assert_eq!(
            registry.read(BufferHandle::from_raw(0), 0, &mut [0u8; 4]),
            Err(BridgeError::InvalidHandle(BufferHandle::from_raw(0)))
        );
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut registry = BufferRegistry::new();
        let old = registry.insert(b"old".to_vec());
        assert_eq!(registry.remove(old), Some(b"old".to_vec()));
        assert!(registry.is_empty());

        let new = registry.insert(b"new".to_vec());
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());

        assert_eq!(registry.get(old), None);
        assert_eq!(registry.remove(old), None);
        assert_eq!(
            registry.write(old, b"x"),
            Err(BridgeError::InvalidHandle(old))
        );
        assert_eq!(registry.get(new), Some(&b"new"[..]));
    }

    #[test]
    fn test_lowest_free_slot_is_reused_first() {
        let mut registry = BufferRegistry::new();
        let a = registry.create();
        let b = registry.create();
        let c = registry.create();
        registry.remove(a);
        registry.remove(c);

        let d = registry.create();
        let e = registry.create();
        let f = registry.create();

        assert_eq!(d.index(), a.index());
        assert_eq!(e.index(), c.index());
        assert_eq!(f.index(), 3);
        assert!(registry.contains(b));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_remove_twice() {
        let mut registry = BufferRegistry::new();
        let handle = registry.create();
        assert!(registry.remove(handle).is_some());
        assert!(registry.remove(handle).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_write_then_read_back() {
        let mut registry = BufferRegistry::new();
        let handle = registry.insert(b"head".to_vec());

        registry.write(handle, b"-tail").unwrap();
        let mut dest = [0u8; 32];
        let copied = registry.read(handle, 4, &mut dest).unwrap();

        assert_eq!(copied, 5);
        assert_eq!(&dest[..copied], b"-tail");
        assert_eq!(registry.get(handle), Some(&b"head-tail"[..]));
    }

    #[test]
    fn test_generation_skips_zero_on_wrap() {
        assert_eq!(next_generation(u32::MAX), 1);
        assert_eq!(next_generation(1), 2);
    }
}
