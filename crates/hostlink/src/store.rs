use crate::bridge::Sink;
use crate::config::Config;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use wasmtime::{Engine, Store, StoreLimits, StoreLimitsBuilder};

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(0);

/// Host data carried by every store that runs bridged guests.
///
/// Host functions reach it through their `Caller`; embedders through
/// `Store::data`.
pub struct HostState {
    id: u64,
    config: Config,
    sink: Box<dyn Sink>,
    limits: StoreLimits,
    faults: u64,
}

impl HostState {
    /// Creates host state writing guest output to `sink`.
    pub fn new(config: Config, sink: impl Sink) -> HostState {
        let mut limits = StoreLimitsBuilder::new();
        if let Some(bytes) = config.max_memory_bytes {
            limits = limits.memory_size(bytes);
        }
        HostState {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            config,
            sink: Box::new(sink),
            limits: limits.build(),
            faults: 0,
        }
    }

    /// The configuration this state was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Writes one line of guest output to the observation channel.
    pub fn emit(&mut self, text: &str) {
        self.sink.write(text);
    }

    /// Number of host calls that failed and were absorbed under
    /// [`FaultPolicy::Log`](crate::FaultPolicy::Log).
    pub fn faults(&self) -> u64 {
        self.faults
    }

    pub(crate) fn record_fault(&mut self) {
        self.faults += 1;
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostState")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("faults", &self.faults)
            .finish_non_exhaustive()
    }
}

/// Creates a store for `engine` whose memories are held to the configured
/// budget.
pub fn new_store(engine: &Engine, config: Config, sink: impl Sink) -> Store<HostState> {
    let mut store = Store::new(engine, HostState::new(config, sink));
    store.limiter(|state| &mut state.limits);
    store
}
