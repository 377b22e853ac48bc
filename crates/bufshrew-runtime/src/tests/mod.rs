//! Test modules for bufshrew-runtime
//!
//! Guest modules are written in WAT and build their call frames by hand, the
//! same way a compiled guest would.

use crate::{BridgeConfig, BridgeRuntime};


/// Frame addresses used by the fixture guest.
pub const READ_FRAME_AT: usize = 256;
pub const WRITE_FRAME_AT: usize = 512;
pub const SCRATCH_AT: usize = 1024;
/// Chunk size of the fixture's `copy` loop.
pub const COPY_CHUNK: usize = 16;

/// Fixture guest importing the bridge under `import_module`.
///
/// Exports:
/// - `read_into(handle, start, ptr, len) -> copied`
/// - `write_from(handle, ptr, len)`
/// - `read_frame_at(sp)` / `write_frame_at(sp)`: raw calls on a caller-built frame
/// - `copy(src, dst) -> total`: chunked copy between two buffers
/// - `spin`: never returns
pub fn guest_wat(import_module: &str) -> String {
    format!(
        r#"
(module
  (import "{module}" "__buffer_read" (func $read (param i32)))
  (import "{module}" "__buffer_write" (func $write (param i32)))
  (memory (export "memory") 1)

  (func $read_into (export "read_into")
    (param $handle i64) (param $start i64) (param $ptr i32) (param $len i32) (result i32)
    (i64.store offset=8 (i32.const 256) (local.get $start))
    (i64.store offset=16 (i32.const 256) (local.get $handle))
    (i64.store offset=24 (i32.const 256) (i64.const 0))
    (i64.store offset=32 (i32.const 256) (i64.extend_i32_u (local.get $ptr)))
    (i64.store offset=40 (i32.const 256) (i64.extend_i32_u (local.get $len)))
    (i64.store offset=48 (i32.const 256) (i64.extend_i32_u (local.get $len)))
    (call $read (i32.const 256))
    (i32.load offset=56 (i32.const 256)))

  (func $write_from (export "write_from")
    (param $handle i64) (param $ptr i32) (param $len i32)
    (i64.store offset=8 (i32.const 512) (local.get $handle))
    (i64.store offset=16 (i32.const 512) (i64.const 0))
    (i64.store offset=24 (i32.const 512) (i64.extend_i32_u (local.get $ptr)))
    (i64.store offset=32 (i32.const 512) (i64.extend_i32_u (local.get $len)))
    (i64.store offset=40 (i32.const 512) (i64.extend_i32_u (local.get $len)))
    (call $write (i32.const 512)))

  (func (export "read_frame_at") (param $sp i32)
    (call $read (local.get $sp)))

  (func (export "write_frame_at") (param $sp i32)
    (call $write (local.get $sp)))

  (func (export "copy") (param $src i64) (param $dst i64) (result i32)
    (local $pos i64)
    (local $n i32)
    (block $done
      (loop $next
        (local.set $n
          (call $read_into (local.get $src) (local.get $pos) (i32.const 1024) (i32.const 16)))
        (br_if $done (i32.eqz (local.get $n)))
        (call $write_from (local.get $dst) (i32.const 1024) (local.get $n))
        (local.set $pos (i64.add (local.get $pos) (i64.extend_i32_u (local.get $n))))
        (br $next)))
    (i32.wrap_i64 (local.get $pos)))

  (func (export "spin")
    (loop $forever (br $forever)))
)
"#,
        module = import_module
    )
}

pub fn guest_wasm(import_module: &str) -> Vec<u8> {
    wat::parse_str(guest_wat(import_module)).expect("Failed to parse fixture WAT")
}

pub fn new_runtime() -> BridgeRuntime {
    let _ = env_logger::builder().is_test(true).try_init();
    BridgeRuntime::new(&guest_wasm("env"), BridgeConfig::default())
        .expect("Failed to create runtime")
}
