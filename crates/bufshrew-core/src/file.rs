//! File-like access to a host buffer
//!
//! A [`File`] is either readable (opened on an existing buffer) or writable
//! (created for output), never both. Reads advance an internal cursor and
//! return `Ok(0)` at end of file; writes append. Closing a writable file saves
//! the buffer under the file's name through [`BufferBridge::save`]. Any use
//! after [`File::close`] fails with [`io::ErrorKind::BrokenPipe`].

use std::io;

use bufshrew_support::BufferHandle;

use crate::bridge::BufferBridge;

pub struct File<B: BufferBridge> {
    bridge: B,
    handle: BufferHandle,
    name: String,
    index: u64,
    readable: bool,
    writable: bool,
    closed: bool,
}

fn closed_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "file is closed or not open for this operation")
}

impl<B: BufferBridge> File<B> {
    /// Opens an existing buffer for reading from its first byte.
    pub fn open(bridge: B, handle: BufferHandle) -> Self {
        Self {
            bridge,
            handle,
            name: String::new(),
            index: 0,
            readable: true,
            writable: false,
            closed: false,
        }
    }

    /// Wraps an output buffer for writing under `name`.
    pub fn create(bridge: B, handle: BufferHandle, name: impl Into<String>) -> Self {
        Self {
            bridge,
            handle,
            name: name.into(),
            index: 0,
            readable: false,
            writable: true,
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Offset of the next read.
    pub fn position(&self) -> u64 {
        self.index
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes the file, then saves a writable file under its name.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(closed_pipe());
        }
        self.closed = true;
        if self.writable {
            self.bridge.save(self.handle, &self.name)?;
        }
        Ok(())
    }
}

impl<B: BufferBridge> io::Read for File<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed || !self.readable {
            return Err(closed_pipe());
        }
        let copied = self.bridge.read(self.handle, self.index, buf);
        self.index += copied as u64;
        Ok(copied)
    }
}

impl<B: BufferBridge> io::Write for File<B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed || !self.writable {
            return Err(closed_pipe());
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.bridge.write(self.handle, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
