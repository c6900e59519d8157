//! The table of host capabilities a guest may import.

use crate::error::{Error, Result};
use crate::memory::MemoryArena;
use crate::store::HostState;
use crate::values::Signature;
use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use wasmtime::{Caller, Val};

type HostFn = dyn Fn(&mut Caller<'_, HostState>, &[Val]) -> Result<Option<Val>> + Send + Sync;

/// A native function with a fixed numeric signature, callable by guests.
///
/// The implementation receives arguments already checked against the
/// signature and returns at most one value of the declared result kind.
#[derive(Clone)]
pub struct HostFunction {
    name: String,
    signature: Signature,
    func: Arc<HostFn>,
    store_id: Option<u64>,
}

impl HostFunction {
    /// Creates a host function.
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        func: impl Fn(&mut Caller<'_, HostState>, &[Val]) -> Result<Option<Val>> + Send + Sync + 'static,
    ) -> HostFunction {
        HostFunction {
            name: name.into(),
            signature,
            func: Arc::new(func),
            store_id: None,
        }
    }

    /// Ties the function to the store that owns a memory it reads, so it can
    /// only be linked into that store.
    pub(crate) fn bound_to(mut self, arena: &MemoryArena) -> HostFunction {
        self.store_id = Some(arena.store_id());
        self
    }

    pub(crate) fn store_id(&self) -> Option<u64> {
        self.store_id
    }

    /// The function's own name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function's signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn call(
        &self,
        caller: &mut Caller<'_, HostState>,
        args: &[Val],
    ) -> Result<Option<Val>> {
        (self.func)(caller, args)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// A capability that can satisfy a guest import.
#[derive(Debug, Clone)]
pub enum Import {
    /// A host function.
    Func(HostFunction),
    /// A host-created linear memory.
    Memory(MemoryArena),
}

impl Import {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Import::Func(_) => "function",
            Import::Memory(_) => "memory",
        }
    }
}

type Key = (String, String);

/// Collects host capabilities under unique `(namespace, name)` keys.
///
/// ```ignore
/// let mut resolver = ImportResolver::new();
/// resolver
///     .register_function("console", "logNumber", log_number(ValKind::I32))?
///     .register_memory("js", "logMemory", &arena)?;
/// let table = resolver.build();
/// ```
#[derive(Debug, Default)]
pub struct ImportResolver {
    entries: BTreeMap<Key, Import>,
}

impl ImportResolver {
    /// Creates an empty resolver.
    pub fn new() -> ImportResolver {
        ImportResolver::default()
    }

    /// Registers `func` as `namespace.name`.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateImport`] if the key is taken; the existing entry is
    /// kept.
    pub fn register_function(
        &mut self,
        namespace: &str,
        name: &str,
        func: HostFunction,
    ) -> Result<&mut Self> {
        self.insert(namespace, name, Import::Func(func))
    }

    /// Registers `arena` as `namespace.name`.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateImport`] if the key is taken; the existing entry is
    /// kept.
    pub fn register_memory(
        &mut self,
        namespace: &str,
        name: &str,
        arena: &MemoryArena,
    ) -> Result<&mut Self> {
        self.insert(namespace, name, Import::Memory(*arena))
    }

    fn insert(&mut self, namespace: &str, name: &str, item: Import) -> Result<&mut Self> {
        match self.entries.entry((namespace.to_string(), name.to_string())) {
            Entry::Occupied(_) => Err(Error::DuplicateImport {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                debug!(namespace, name, kind = item.kind(), "registered import");
                slot.insert(item);
                Ok(self)
            }
        }
    }

    /// Whether `namespace.name` is registered.
    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.entries
            .contains_key(&(namespace.to_string(), name.to_string()))
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// An immutable snapshot of the registered capabilities.
    ///
    /// Later registrations do not affect tables already built.
    pub fn build(&self) -> ImportTable {
        ImportTable {
            entries: Arc::new(self.entries.clone()),
        }
    }
}

/// An immutable set of host capabilities, consumed by instantiation.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    entries: Arc<BTreeMap<Key, Import>>,
}

impl ImportTable {
    /// Looks up `namespace.name`.
    pub fn get(&self, namespace: &str, name: &str) -> Option<&Import> {
        self.entries.get(&(namespace.to_string(), name.to_string()))
    }

    /// Every entry as `(namespace, name, import)`, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Import)> + '_ {
        self.entries
            .iter()
            .map(|((namespace, name), import)| (namespace.as_str(), name.as_str(), import))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
