use anyhow::{Context, Result};
use bufshrew_core::{BufferBridge, BufferHandle};
use bufshrew_runtime::{BridgeConfig, BridgeContext, BridgeRuntime};
use log::warn;
use std::io;
use std::sync::{Arc, Mutex};

/// Guest used by the end-to-end tests.
///
/// Exports:
/// - `uppercase(src, dst) -> n`: streams `src` into `dst` in 8-byte chunks, upper-casing ASCII
/// - `concat(a, b, dst) -> n`: appends `a` then `b` to `dst`
/// - `greet(dst)`: appends a constant from the data segment
///
/// Read frames live at 256, write frames at 512, the chunk buffer at 1024.
pub const TRANSFORM_GUEST_WAT: &str = r#"
(module
  (import "env" "__buffer_read" (func $read (param i32)))
  (import "env" "__buffer_write" (func $write (param i32)))
  (memory (export "memory") 1)
  (data (i32.const 2048) "guest says hi")

  (func $pump (param $src i64) (param $dst i64) (param $upper i32) (result i64)
    (local $pos i64)
    (local $n i32)
    (local $i i32)
    (local $b i32)
    (block $done
      (loop $next
        (i64.store offset=8 (i32.const 256) (local.get $pos))
        (i64.store offset=16 (i32.const 256) (local.get $src))
        (i64.store offset=32 (i32.const 256) (i64.const 1024))
        (i64.store offset=40 (i32.const 256) (i64.const 8))
        (i64.store offset=48 (i32.const 256) (i64.const 8))
        (call $read (i32.const 256))
        (local.set $n (i32.load offset=56 (i32.const 256)))
        (br_if $done (i32.eqz (local.get $n)))
        (if (local.get $upper)
          (then
            (local.set $i (i32.const 0))
            (block $chunk_done
              (loop $byte
                (br_if $chunk_done (i32.ge_u (local.get $i) (local.get $n)))
                (local.set $b (i32.load8_u offset=1024 (local.get $i)))
                (if (i32.and
                      (i32.ge_u (local.get $b) (i32.const 97))
                      (i32.le_u (local.get $b) (i32.const 122)))
                  (then
                    (i32.store8 offset=1024 (local.get $i)
                      (i32.sub (local.get $b) (i32.const 32)))))
                (local.set $i (i32.add (local.get $i) (i32.const 1)))
                (br $byte)))))
        (i64.store offset=8 (i32.const 512) (local.get $dst))
        (i64.store offset=24 (i32.const 512) (i64.const 1024))
        (i64.store offset=32 (i32.const 512) (i64.extend_i32_u (local.get $n)))
        (i64.store offset=40 (i32.const 512) (i64.extend_i32_u (local.get $n)))
        (call $write (i32.const 512))
        (local.set $pos (i64.add (local.get $pos) (i64.extend_i32_u (local.get $n))))
        (br $next)))
    (local.get $pos))

  (func (export "uppercase") (param $src i64) (param $dst i64) (result i32)
    (i32.wrap_i64 (call $pump (local.get $src) (local.get $dst) (i32.const 1))))

  (func (export "concat") (param $a i64) (param $b i64) (param $dst i64) (result i32)
    (i32.wrap_i64
      (i64.add
        (call $pump (local.get $a) (local.get $dst) (i32.const 0))
        (call $pump (local.get $b) (local.get $dst) (i32.const 0)))))

  (func (export "greet") (param $dst i64)
    (i64.store offset=8 (i32.const 512) (local.get $dst))
    (i64.store offset=24 (i32.const 512) (i64.const 2048))
    (i64.store offset=32 (i32.const 512) (i64.const 13))
    (i64.store offset=40 (i32.const 512) (i64.const 13))
    (call $write (i32.const 512)))
)
"#;

/// Configuration for setting up a test environment
pub struct TestConfig {
    pub wasm: Vec<u8>,
    pub bridge: BridgeConfig,
}

impl TestConfig {
    pub fn new() -> Result<Self> {
        let _ = env_logger::builder().is_test(true).try_init();
        let wasm = wat::parse_str(TRANSFORM_GUEST_WAT).context("Failed to parse test guest")?;
        Ok(Self {
            wasm,
            bridge: BridgeConfig::default(),
        })
    }

    /// Create a new BridgeRuntime for testing
    pub fn create_runtime(&self) -> Result<BridgeRuntime> {
        BridgeRuntime::new(&self.wasm, self.bridge.clone())
    }
}

/// Host-side [`BufferBridge`] over a runtime's shared context, so the
/// guest `File` adapter can be exercised against the real registry.
///
/// Read and write failures are logged and surface as empty reads / dropped
/// writes, the same thing a guest observes. Saving a released buffer fails.
#[derive(Clone)]
pub struct ContextBridge(pub Arc<Mutex<BridgeContext>>);

impl BufferBridge for ContextBridge {
    fn read(&self, handle: BufferHandle, start: u64, dest: &mut [u8]) -> usize {
        let mut context = match self.0.lock() {
            Ok(context) => context,
            Err(e) => {
                warn!("bridge context poisoned: {}", e);
                return 0;
            }
        };
        match context.read(handle, start, dest) {
            Ok(copied) => copied,
            Err(e) => {
                warn!("read failed: {}", e);
                0
            }
        }
    }

    fn write(&self, handle: BufferHandle, src: &[u8]) {
        match self.0.lock() {
            Ok(mut context) => {
                if let Err(e) = context.write(handle, src) {
                    warn!("write failed: {}", e);
                }
            }
            Err(e) => warn!("bridge context poisoned: {}", e),
        }
    }

    fn save(&self, handle: BufferHandle, name: &str) -> io::Result<()> {
        let mut context = self
            .0
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        context
            .save(handle, name)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))
    }
}
