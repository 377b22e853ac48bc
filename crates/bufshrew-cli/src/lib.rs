//! # bufshrew
//!
//! Runs one export of a guest module against files on disk. Every `--input`
//! file is registered as a buffer the guest can read, every `--output` path
//! gets an empty buffer the guest can append to, and the export is called
//! with all the handles (inputs first, then outputs, each in command-line
//! order). Output buffers are written to their paths once the call returns.

use anyhow::{anyhow, Context, Result};
use bufshrew_runtime::{BridgeConfig, BridgeRuntime, BridgeStats, BufferHandle};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, help = "Guest module (.wasm or .wat)")]
    pub module: PathBuf,
    #[arg(long, default_value = "main", help = "Export to invoke")]
    pub entry: String,
    #[arg(long = "input", help = "File exposed to the guest as a readable buffer")]
    pub inputs: Vec<PathBuf>,
    #[arg(long = "output", help = "File the guest's output buffer is saved to")]
    pub outputs: Vec<PathBuf>,
    #[arg(long, help = "JSON bridge configuration; flags below override it")]
    pub config: Option<PathBuf>,
    #[arg(long, env = "BUFSHREW_IMPORT_MODULE")]
    pub import_module: Option<String>,
    #[arg(long)]
    pub max_memory_bytes: Option<usize>,
    #[arg(long, help = "Fuel granted to the guest call")]
    pub fuel: Option<u64>,
}

impl Args {
    pub fn bridge_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_json_file(path)?,
            None => BridgeConfig::default(),
        };
        if let Some(import_module) = &self.import_module {
            config.import_module = import_module.clone();
        }
        if self.max_memory_bytes.is_some() {
            config.max_memory_bytes = self.max_memory_bytes;
        }
        if self.fuel.is_some() {
            config.fuel = self.fuel;
        }
        Ok(config)
    }
}

#[derive(Debug)]
pub struct RunSummary {
    /// Each output path with the number of bytes saved to it.
    pub outputs: Vec<(PathBuf, usize)>,
    pub stats: BridgeStats,
}

pub fn run(args: &Args) -> Result<RunSummary> {
    let config = args.bridge_config()?;
    debug!("bridge config: {:?}", config);
    let mut runtime = BridgeRuntime::load(args.module.clone(), config)?;

    let mut handles = Vec::with_capacity(args.inputs.len() + args.outputs.len());
    for path in &args.inputs {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read input {}", path.display()))?;
        info!("input {} ({} bytes)", path.display(), bytes.len());
        handles.push(runtime.insert_buffer(bytes)?);
    }

    let mut pending: Vec<(PathBuf, BufferHandle)> = Vec::with_capacity(args.outputs.len());
    for path in &args.outputs {
        let handle = runtime.create_buffer()?;
        handles.push(handle);
        pending.push((path.clone(), handle));
    }

    runtime.invoke_with_handles(&args.entry, &handles)?;

    let mut outputs = Vec::with_capacity(pending.len());
    for (path, handle) in pending {
        let bytes = runtime
            .take_buffer(handle)?
            .ok_or_else(|| anyhow!("Output buffer {} was released by the host", handle))?;
        std::fs::write(&path, &bytes)
            .with_context(|| format!("Failed to write output {}", path.display()))?;
        info!("output {} ({} bytes)", path.display(), bytes.len());
        outputs.push((path, bytes.len()));
    }

    Ok(RunSummary {
        outputs,
        stats: runtime.stats()?,
    })
}
