//! Shared host state reachable from the bridge host functions

use std::collections::HashMap;

use bufshrew_support::BufferHandle;

use crate::error::{BridgeError, BridgeResult};
use crate::registry::BufferRegistry;

/// Running totals of bridge traffic, mostly for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    pub reads: u64,
    pub writes: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

#[derive(Debug, Default)]
pub struct BridgeContext {
    pub registry: BufferRegistry,
    pub stats: BridgeStats,
    /// Names output buffers were saved under, keyed by live handle.
    pub names: HashMap<BufferHandle, String>,
}

impl BridgeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&mut self, handle: BufferHandle, start: u64, dest: &mut [u8]) -> BridgeResult<usize> {
        let copied = self.registry.read(handle, start, dest)?;
        self.stats.reads += 1;
        self.stats.bytes_read += copied as u64;
        Ok(copied)
    }

    pub fn write(&mut self, handle: BufferHandle, src: &[u8]) -> BridgeResult<()> {
        self.registry.write(handle, src)?;
        self.stats.writes += 1;
        self.stats.bytes_written += src.len() as u64;
        Ok(())
    }

    /// Publishes a live buffer under `name`. Saving again renames it.
    pub fn save(&mut self, handle: BufferHandle, name: &str) -> BridgeResult<()> {
        if !self.registry.contains(handle) {
            return Err(BridgeError::InvalidHandle(handle));
        }
        self.names.insert(handle, name.to_string());
        Ok(())
    }

    pub fn saved_name(&self, handle: BufferHandle) -> Option<&str> {
        self.names.get(&handle).map(String::as_str)
    }

    /// Releases a buffer together with any name it was saved under.
    pub fn remove(&mut self, handle: BufferHandle) -> Option<Vec<u8>> {
        let bytes = self.registry.remove(handle)?;
        self.names.remove(&handle);
        Some(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_names_live_buffer() {
        let mut context = BridgeContext::new();
        let handle = context.registry.create();

        context.save(handle, "draft.txt").unwrap();
        context.save(handle, "final.txt").unwrap();

        assert_eq!(context.saved_name(handle), Some("final.txt"));
    }

    #[test]
    fn test_save_rejects_released_handle() {
        let mut context = BridgeContext::new();
        let handle = context.registry.create();
        context.save(handle, "out.bin").unwrap();
        assert!(context.remove(handle).is_some());

        assert_eq!(context.saved_name(handle), None);
        assert_eq!(
            context.save(handle, "again.bin"),
            Err(BridgeError::InvalidHandle(handle))
        );
        // The reused slot starts without a name
        let reused = context.registry.create();
        assert_eq!(reused.index(), handle.index());
        assert_eq!(context.saved_name(reused), None);
    }
}
