use std::io;

use bufshrew_support::BufferHandle;

/// What a guest can do with a host buffer.
///
/// `read` copies at most `dest.len()` bytes starting at `start` and returns
/// how many were copied; 0 means `start` is at or past the end. `write`
/// appends all of `src`.
///
/// `save` publishes a finished output buffer under a name. It is called once
/// when a writable [`crate::File`] is closed. Bridges with nowhere to publish
/// names keep the default, which does nothing.
pub trait BufferBridge {
    fn read(&self, handle: BufferHandle, start: u64, dest: &mut [u8]) -> usize;
    fn write(&self, handle: BufferHandle, src: &[u8]);

    fn save(&self, _handle: BufferHandle, _name: &str) -> io::Result<()> {
        Ok(())
    }
}

impl<B: BufferBridge + ?Sized> BufferBridge for &B {
    fn read(&self, handle: BufferHandle, start: u64, dest: &mut [u8]) -> usize {
        (**self).read(handle, start, dest)
    }

    fn write(&self, handle: BufferHandle, src: &[u8]) {
        (**self).write(handle, src)
    }

    fn save(&self, handle: BufferHandle, name: &str) -> io::Result<()> {
        (**self).save(handle, name)
    }
}

#[cfg(target_arch = "wasm32")]
pub use host::HostBridge;

#[cfg(target_arch = "wasm32")]
mod host {
    use super::BufferBridge;
    use bufshrew_support::{BufferHandle, ReadFrame, WriteFrame, READ_FRAME_SIZE, WRITE_FRAME_SIZE};

    #[link(wasm_import_module = "env")]
    extern "C" {
        fn __buffer_read(sp: i32);
        fn __buffer_write(sp: i32);
    }

    #[repr(C, align(8))]
    struct Frame<const N: usize>([u8; N]);

    impl<const N: usize> Frame<N> {
        fn sp(&mut self) -> i32 {
            self.0.as_mut_ptr() as usize as i32
        }
    }

    /// Bridge backed by the host imports.
    ///
    /// The imports are resolved from the `env` module, so the host must link
    /// them under the default `import_module`. Only `read` and `write` cross
    /// the boundary; `save` keeps the no-op default and the host names its
    /// outputs itself.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct HostBridge;

    impl BufferBridge for HostBridge {
        fn read(&self, handle: BufferHandle, start: u64, dest: &mut [u8]) -> usize {
            let mut frame = Frame::<READ_FRAME_SIZE>(
                ReadFrame {
                    start,
                    handle,
                    dest_ptr: dest.as_mut_ptr() as usize as u64,
                    dest_len: dest.len() as u64,
                }
                .encode(),
            );
            unsafe {
                __buffer_read(frame.sp());
            }
            ReadFrame::load_result(&frame.0) as usize
        }

        fn write(&self, handle: BufferHandle, src: &[u8]) {
            let mut frame = Frame::<WRITE_FRAME_SIZE>(
                WriteFrame {
                    handle,
                    src_ptr: src.as_ptr() as usize as u64,
                    src_len: src.len() as u64,
                }
                .encode(),
            );
            unsafe {
                __buffer_write(frame.sp());
            }
        }
    }
}
