//! Host-side configuration.

/// How bytes read by [`log_string`](crate::log_string) are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Utf8Mode {
    /// Invalid UTF-8 is an [`Error::Decode`](crate::Error::Decode).
    #[default]
    Strict,
    /// Invalid sequences are replaced with U+FFFD.
    Lossy,
}

/// What happens to a guest call when a host function it called fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Log the failure, count it in [`HostState::faults`](crate::HostState::faults)
    /// and return to the guest as if the host function succeeded. A declared
    /// result is zero.
    #[default]
    Log,
    /// Abort the in-flight guest call with a trap whose cause is the host
    /// error. The instance remains usable afterwards.
    Trap,
}

/// Global configuration for a host store.
///
/// Built with chained setters, then handed to [`new_store`](crate::new_store).
///
/// ```ignore
/// let mut config = Config::new();
/// config.utf8_mode(Utf8Mode::Lossy).max_pages(Some(16));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) utf8_mode: Utf8Mode,
    pub(crate) fault_policy: FaultPolicy,
    pub(crate) initial_pages: u32,
    pub(crate) max_pages: Option<u32>,
    pub(crate) max_memory_bytes: Option<usize>,
}

impl Config {
    /// Creates a configuration with default settings.
    pub fn new() -> Config {
        Config {
            utf8_mode: Utf8Mode::default(),
            fault_policy: FaultPolicy::default(),
            initial_pages: 1,
            max_pages: None,
            max_memory_bytes: None,
        }
    }

    /// Selects strict or lossy UTF-8 decoding for guest strings.
    ///
    /// Defaults to [`Utf8Mode::Strict`].
    pub fn utf8_mode(&mut self, mode: Utf8Mode) -> &mut Self {
        self.utf8_mode = mode;
        self
    }

    /// Selects what a failing host function does to the calling guest.
    ///
    /// Defaults to [`FaultPolicy::Log`].
    pub fn fault_policy(&mut self, policy: FaultPolicy) -> &mut Self {
        self.fault_policy = policy;
        self
    }

    /// Initial size, in pages, of the memory created by
    /// [`standard_imports`](crate::environment::standard_imports).
    ///
    /// Defaults to 1.
    pub fn initial_pages(&mut self, pages: u32) -> &mut Self {
        self.initial_pages = pages;
        self
    }

    /// Maximum size, in pages, of the memory created by
    /// [`standard_imports`](crate::environment::standard_imports). `None`
    /// leaves it bounded only by the address space and the host budget.
    pub fn max_pages(&mut self, pages: Option<u32>) -> &mut Self {
        self.max_pages = pages;
        self
    }

    /// Largest size, in bytes, that any linear memory in the store may
    /// reach. Creation or growth past this budget fails.
    pub fn max_memory_bytes(&mut self, bytes: Option<usize>) -> &mut Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// The configured UTF-8 decoding mode.
    pub fn get_utf8_mode(&self) -> Utf8Mode {
        self.utf8_mode
    }

    /// The configured fault policy.
    pub fn get_fault_policy(&self) -> FaultPolicy {
        self.fault_policy
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}
