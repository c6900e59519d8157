//! The process-wide handle to the published guest instance.

use crate::instantiate::ModuleInstance;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

static GLOBAL: ExportRegistry = ExportRegistry::new();

/// Holds at most one published [`ModuleInstance`].
///
/// Readers see either nothing or a fully instantiated module: an instance is
/// only stored after instantiation succeeded, and a failed instantiation never
/// touches the registry. Registrations replace each other; nothing is ever
/// re-initialized implicitly.
#[derive(Debug)]
pub struct ExportRegistry {
    current: RwLock<Option<Arc<ModuleInstance>>>,
}

impl ExportRegistry {
    /// Creates an empty registry.
    pub const fn new() -> ExportRegistry {
        ExportRegistry {
            current: RwLock::new(None),
        }
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static ExportRegistry {
        &GLOBAL
    }

    /// Publishes `instance`, replacing any previous registration, and
    /// returns the shared handle.
    pub fn register(&self, instance: ModuleInstance) -> Arc<ModuleInstance> {
        let instance = Arc::new(instance);
        let previous = self.write().replace(instance.clone());
        debug!(replaced = previous.is_some(), "registered module instance");
        instance
    }

    /// The currently published instance, if any.
    pub fn get(&self) -> Option<Arc<ModuleInstance>> {
        self.read().clone()
    }

    /// Whether an instance is published.
    pub fn is_registered(&self) -> bool {
        self.read().is_some()
    }

    /// Withdraws the published instance and returns it.
    pub fn clear(&self) -> Option<Arc<ModuleInstance>> {
        let previous = self.write().take();
        if previous.is_some() {
            debug!("cleared module instance");
        }
        previous
    }

    // The slot is replaced wholesale, so a panic elsewhere cannot leave it
    // half-written.
    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<ModuleInstance>>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<ModuleInstance>>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ExportRegistry {
    fn default() -> ExportRegistry {
        ExportRegistry::new()
    }
}
