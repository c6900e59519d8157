//! Options shared by every command.

use anyhow::{Context as _, Result};
use clap::Parser;
use hostlink::{Config, FaultPolicy, Utf8Mode};
use std::path::Path;

/// Host environment options
#[derive(Parser, Clone, Debug)]
pub struct CommonOptions {
    /// Initial size of the shared `js.logMemory` memory, in 64 KiB pages
    #[arg(long, value_name = "PAGES", default_value_t = 1)]
    pub initial_pages: u32,

    /// Maximum size of the shared `js.logMemory` memory, in 64 KiB pages
    #[arg(long, value_name = "PAGES")]
    pub max_pages: Option<u32>,

    /// Largest size, in bytes, of any linear memory in the store
    #[arg(long, value_name = "BYTES")]
    pub max_memory_bytes: Option<usize>,

    /// Replace invalid UTF-8 in guest strings instead of rejecting it
    #[arg(long)]
    pub lossy_utf8: bool,

    /// Trap the guest when a host call fails instead of logging and continuing
    #[arg(long)]
    pub trap_on_fault: bool,
}

impl CommonOptions {
    pub fn init_logging(&self) {
        use std::io::IsTerminal;
        use tracing_subscriber::{EnvFilter, FmtSubscriber};
        let b = FmtSubscriber::builder()
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::from_env("HOSTLINK_LOG"))
            .with_ansi(std::io::stderr().is_terminal());
        b.init();
    }

    pub fn config(&self) -> Config {
        let mut config = Config::new();
        config
            .initial_pages(self.initial_pages)
            .max_pages(self.max_pages)
            .max_memory_bytes(self.max_memory_bytes);
        if self.lossy_utf8 {
            config.utf8_mode(Utf8Mode::Lossy);
        }
        if self.trap_on_fault {
            config.fault_policy(FaultPolicy::Trap);
        }
        config
    }
}

/// Reads a module from disk, in either the binary or the text format.
pub fn read_module(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))
}
