use anyhow::{anyhow, Context, Result};
use bufshrew_support::{BufferHandle, READ_SYMBOL, WRITE_SYMBOL};
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use wasmtime::{Caller, Linker, Memory, Store, StoreLimits, StoreLimitsBuilder, Val};

use crate::bridge::{host_read, host_write};
use crate::config::BridgeConfig;
use crate::context::{BridgeContext, BridgeStats};
use crate::error::BridgeError;

fn lock_err<T>(err: std::sync::PoisonError<T>) -> anyhow::Error {
    anyhow!("Mutex lock error: {}", err)
}

/// Per-store data seen by the host functions.
pub struct State {
    limits: StoreLimits,
    failure: Option<BridgeError>,
}

impl State {
    pub fn new(config: &BridgeConfig) -> Self {
        let mut limits = StoreLimitsBuilder::new()
            .memories(usize::MAX)
            .tables(usize::MAX)
            .instances(usize::MAX);
        if let Some(max) = config.max_memory_bytes {
            limits = limits.memory_size(max);
        }
        State {
            limits: limits.build(),
            failure: None,
        }
    }

    /// Keeps the first failure of an invocation; later ones are only logged.
    pub fn record_failure(&mut self, err: BridgeError) {
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    pub fn had_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn take_failure(&mut self) -> Option<BridgeError> {
        self.failure.take()
    }
}

/// A guest module instantiated with the buffer bridge linked in.
pub struct BridgeRuntime {
    pub context: Arc<Mutex<BridgeContext>>,
    pub engine: wasmtime::Engine,
    pub wasmstore: wasmtime::Store<State>,
    pub module: wasmtime::Module,
    pub linker: wasmtime::Linker<State>,
    pub instance: wasmtime::Instance,
    config: BridgeConfig,
}

impl BridgeRuntime {
    /// Compiles `wasm` (binary or text format) and instantiates it.
    pub fn new(wasm: &[u8], config: BridgeConfig) -> Result<Self> {
        let engine = Self::engine(&config)?;
        let module = wasmtime::Module::new(&engine, wasm).context("Failed to load WASM module")?;
        Self::instantiate(engine, module, config)
    }

    pub fn load(path: PathBuf, config: BridgeConfig) -> Result<Self> {
        let engine = Self::engine(&config)?;
        let module = wasmtime::Module::from_file(&engine, &path)
            .with_context(|| format!("Failed to load WASM module {}", path.display()))?;
        Self::instantiate(engine, module, config)
    }

    fn engine(config: &BridgeConfig) -> Result<wasmtime::Engine> {
        let mut wasm_config = wasmtime::Config::default();
        wasm_config.consume_fuel(config.fuel.is_some());
        wasmtime::Engine::new(&wasm_config)
    }

    fn instantiate(
        engine: wasmtime::Engine,
        module: wasmtime::Module,
        config: BridgeConfig,
    ) -> Result<Self> {
        let mut linker = Linker::<State>::new(&engine);
        let mut wasmstore = Store::<State>::new(&engine, State::new(&config));
        wasmstore.limiter(|state| &mut state.limits);
        if let Some(fuel) = config.fuel {
            wasmstore.set_fuel(fuel)?;
        }

        let context = Arc::new(Mutex::new(BridgeContext::new()));
        Self::setup_linker(context.clone(), &mut linker, &config.import_module)
            .context("Failed to setup bridge linker")?;

        let instance = linker
            .instantiate(&mut wasmstore, &module)
            .context("Failed to instantiate WASM module")?;
        debug!(
            "instantiated guest module with bridge imports under \"{}\"",
            config.import_module
        );

        Ok(BridgeRuntime {
            context,
            engine,
            wasmstore,
            module,
            linker,
            instance,
            config,
        })
    }

    /// Links `__buffer_read` and `__buffer_write` into `linker` under `import_module`.
    ///
    /// Both imports take the guest address of their call frame. Failures are
    /// recorded on the store instead of trapping, so the guest always gets
    /// control back.
    pub fn setup_linker(
        context: Arc<Mutex<BridgeContext>>,
        linker: &mut Linker<State>,
        import_module: &str,
    ) -> Result<()> {
        let context_read = context.clone();
        let context_write = context.clone();

        linker
            .func_wrap(
                import_module,
                READ_SYMBOL,
                move |mut caller: Caller<'_, State>, sp: i32| {
                    if let Err(e) = host_read(&context_read, &mut caller, sp) {
                        warn!("{} failed: {}", READ_SYMBOL, e);
                        caller.data_mut().record_failure(e);
                    }
                },
            )
            .map_err(|e| anyhow!("Failed to wrap {}: {:?}", READ_SYMBOL, e))?;

        linker
            .func_wrap(
                import_module,
                WRITE_SYMBOL,
                move |mut caller: Caller<'_, State>, sp: i32| {
                    if let Err(e) = host_write(&context_write, &mut caller, sp) {
                        warn!("{} failed: {}", WRITE_SYMBOL, e);
                        caller.data_mut().record_failure(e);
                    }
                },
            )
            .map_err(|e| anyhow!("Failed to wrap {}: {:?}", WRITE_SYMBOL, e))?;

        Ok(())
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn context(&self) -> Arc<Mutex<BridgeContext>> {
        self.context.clone()
    }

    fn lock_context(&self) -> Result<MutexGuard<'_, BridgeContext>> {
        self.context.lock().map_err(lock_err)
    }

    pub fn insert_buffer(&self, bytes: Vec<u8>) -> Result<BufferHandle> {
        let len = bytes.len();
        let handle = self.lock_context()?.registry.insert(bytes);
        debug!("registered buffer {} ({} bytes)", handle, len);
        Ok(handle)
    }

    pub fn create_buffer(&self) -> Result<BufferHandle> {
        self.insert_buffer(Vec::new())
    }

    /// Snapshot of the buffer's current contents.
    pub fn buffer(&self, handle: BufferHandle) -> Result<Option<Vec<u8>>> {
        Ok(self
            .lock_context()?
            .registry
            .get(handle)
            .map(|bytes| bytes.to_vec()))
    }

    /// Removes the buffer from the registry; its handle becomes invalid.
    pub fn take_buffer(&self, handle: BufferHandle) -> Result<Option<Vec<u8>>> {
        let taken = self.lock_context()?.remove(handle);
        if taken.is_some() {
            debug!("released buffer {}", handle);
        }
        Ok(taken)
    }

    /// Name the buffer was saved under, if any.
    pub fn saved_name(&self, handle: BufferHandle) -> Result<Option<String>> {
        Ok(self
            .lock_context()?
            .saved_name(handle)
            .map(str::to_string))
    }

    pub fn stats(&self) -> Result<BridgeStats> {
        Ok(self.lock_context()?.stats)
    }

    /// Calls the guest export `symbol`.
    ///
    /// Fuel is refilled before the call when metering is enabled. A bridge
    /// failure during the call is returned as an error even if the guest
    /// itself finished normally.
    pub fn invoke(&mut self, symbol: &str, params: &[Val]) -> Result<Vec<Val>> {
        let func = self
            .instance
            .get_func(&mut self.wasmstore, symbol)
            .ok_or_else(|| anyhow!("Guest module does not export {}", symbol))?;
        let mut results = vec![Val::I32(0); func.ty(&self.wasmstore).results().len()];

        self.wasmstore.data_mut().take_failure();
        if let Some(fuel) = self.config.fuel {
            self.wasmstore.set_fuel(fuel)?;
        }

        func.call(&mut self.wasmstore, params, &mut results)
            .with_context(|| format!("Guest export {} trapped", symbol))?;

        if let Some(failure) = self.wasmstore.data_mut().take_failure() {
            return Err(anyhow::Error::new(failure)
                .context(format!("Bridge call failed during {}", symbol)));
        }
        Ok(results)
    }

    /// Calls `symbol` with one `i64` argument per handle.
    pub fn invoke_with_handles(
        &mut self,
        symbol: &str,
        handles: &[BufferHandle],
    ) -> Result<Vec<Val>> {
        let params: Vec<Val> = handles
            .iter()
            .map(|handle| Val::I64(handle.to_raw() as i64))
            .collect();
        self.invoke(symbol, &params)
    }

    pub fn guest_memory(&mut self) -> Result<Memory> {
        self.instance
            .get_memory(&mut self.wasmstore, "memory")
            .ok_or_else(|| anyhow!(BridgeError::MissingMemory))
    }

    pub fn read_guest_memory(&mut self, ptr: usize, len: usize) -> Result<Vec<u8>> {
        let memory = self.guest_memory()?;
        let mut bytes = vec![0u8; len];
        memory
            .read(&self.wasmstore, ptr, &mut bytes)
            .map_err(|e| anyhow!("Failed to read guest memory at {:#x}: {}", ptr, e))?;
        Ok(bytes)
    }

    pub fn write_guest_memory(&mut self, ptr: usize, bytes: &[u8]) -> Result<()> {
        let memory = self.guest_memory()?;
        memory
            .write(&mut self.wasmstore, ptr, bytes)
            .map_err(|e| anyhow!("Failed to write guest memory at {:#x}: {}", ptr, e))
    }
}
