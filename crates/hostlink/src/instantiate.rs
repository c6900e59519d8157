//! Validating, linking and instantiating guest modules.

use crate::bridge;
use crate::error::{Error, Result};
use crate::imports::{Import, ImportTable};
use crate::memory::MemoryArena;
use crate::registry::ExportRegistry;
use crate::store::HostState;
use crate::values::{Signature, ValKind};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use wasmtime::{
    AsContext, AsContextMut, Engine, Extern, ExternType, Func, FuncType, Global, Instance, Linker,
    Memory, MemoryType, Module, Store, StoreContextMut, Table, TypedFunc, Val, WasmParams,
    WasmResults,
};

/// Turns module bytes and an [`ImportTable`] into a [`ModuleInstance`].
///
/// Every import the module declares is checked against the table before the
/// engine sees it, so mismatches are reported with the `(namespace, name)` at
/// fault rather than as a generic instantiation failure.
#[derive(Clone)]
pub struct Instantiator {
    engine: Engine,
}

impl Instantiator {
    /// Creates an instantiator compiling for `engine`.
    pub fn new(engine: &Engine) -> Instantiator {
        Instantiator {
            engine: engine.clone(),
        }
    }

    /// The engine modules are compiled for.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Validates and compiles `bytes` on the calling thread.
    ///
    /// Both the binary and the text format are accepted.
    pub fn compile_blocking(&self, bytes: &[u8]) -> Result<Module> {
        let binary = wat::parse_bytes(bytes).map_err(|e| Error::InvalidModule {
            reason: e.to_string(),
        })?;
        let module = Module::from_binary(&self.engine, &binary).map_err(|e| Error::InvalidModule {
            reason: format!("{e:#}"),
        })?;
        debug!(
            imports = module.imports().len(),
            exports = module.exports().len(),
            "compiled module"
        );
        Ok(module)
    }

    /// Validates and compiles `bytes` on Tokio's blocking pool.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub async fn compile(&self, bytes: &[u8]) -> Result<Module> {
        let this = self.clone();
        let bytes = bytes.to_vec();
        match tokio::task::spawn_blocking(move || this.compile_blocking(&bytes)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(Error::InvalidModule {
                reason: format!("compilation did not complete: {e}"),
            }),
        }
    }

    /// Compiles `bytes` and links the result against `imports`.
    ///
    /// Dropping the returned future before it completes leaves nothing
    /// behind: the store gains no instance and `imports` is only read.
    pub async fn instantiate(
        &self,
        store: &mut Store<HostState>,
        bytes: &[u8],
        imports: &ImportTable,
    ) -> Result<ModuleInstance> {
        let module = self.compile(bytes).await?;
        self.instantiate_module(store, &module, imports)
    }

    /// Instantiates `bytes` and publishes the instance to `registry`.
    ///
    /// The registry is written only once instantiation has fully succeeded;
    /// on failure it is left exactly as it was.
    pub async fn instantiate_and_register(
        &self,
        store: &mut Store<HostState>,
        bytes: &[u8],
        imports: &ImportTable,
        registry: &ExportRegistry,
    ) -> Result<Arc<ModuleInstance>> {
        let instance = self.instantiate(store, bytes, imports).await?;
        Ok(registry.register(instance))
    }

    /// Links an already compiled `module` against `imports`.
    ///
    /// # Errors
    ///
    /// * [`Error::UnresolvedImport`] for the first declared import missing
    ///   from the table.
    /// * [`Error::Link`] when an import's kind, signature or memory limits do
    ///   not match what the table provides, or when the engine fails to
    ///   instantiate (including a trap in the start function).
    pub fn instantiate_module(
        &self,
        mut store: impl AsContextMut<Data = HostState>,
        module: &Module,
        imports: &ImportTable,
    ) -> Result<ModuleInstance> {
        let mut store = store.as_context_mut();
        let mut linker = Linker::new(&self.engine);
        // A module may import the same key more than once.
        linker.allow_shadowing(true);
        let mut memories = Vec::new();

        for import in module.imports() {
            let (namespace, name) = (import.module(), import.name());
            let provided = imports
                .get(namespace, name)
                .ok_or_else(|| Error::UnresolvedImport {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                })?;
            match (import.ty(), provided) {
                (ExternType::Func(ty), Import::Func(func)) => {
                    check_signature(namespace, name, &ty, func.signature())?;
                    if func.store_id().is_some_and(|id| id != store.data().id()) {
                        return Err(Error::link(format!(
                            "function for `{namespace}.{name}` reads a memory that belongs to a different store"
                        )));
                    }
                    linker
                        .func_new(namespace, name, ty, bridge::trampoline(namespace, name, func.clone()))
                        .map_err(|e| Error::link(format!("cannot define `{namespace}.{name}`: {e:#}")))?;
                }
                (ExternType::Memory(ty), Import::Memory(arena)) => {
                    check_memory(&store, namespace, name, &ty, arena)?;
                    linker
                        .define(&store, namespace, name, arena.memory())
                        .map_err(|e| Error::link(format!("cannot define `{namespace}.{name}`: {e:#}")))?;
                    memories.push(*arena);
                }
                (ty, provided) => {
                    return Err(Error::link(format!(
                        "import `{namespace}.{name}` expects a {}, but the host provides a {}",
                        extern_kind(&ty),
                        provided.kind()
                    )))
                }
            }
            debug!(namespace, name, "resolved import");
        }

        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|e| Error::link(format!("instantiation failed: {e:#}")))?;
        Ok(ModuleInstance::new(&mut store, instance, memories))
    }
}

fn extern_kind(ty: &ExternType) -> &'static str {
    match ty {
        ExternType::Func(_) => "function",
        ExternType::Memory(_) => "memory",
        ExternType::Global(_) => "global",
        ExternType::Table(_) => "table",
        #[allow(unreachable_patterns)]
        _ => "tag",
    }
}

fn check_signature(namespace: &str, name: &str, ty: &FuncType, provided: &Signature) -> Result<()> {
    match Signature::from_func_type(ty) {
        Some(declared) if declared == *provided => Ok(()),
        Some(declared) => Err(Error::link(format!(
            "import `{namespace}.{name}` is declared as {declared}, but the host provides {provided}"
        ))),
        None => Err(Error::link(format!(
            "import `{namespace}.{name}` has type {ty:?}, which cannot cross the host boundary"
        ))),
    }
}

fn check_memory(
    store: &StoreContextMut<'_, HostState>,
    namespace: &str,
    name: &str,
    ty: &MemoryType,
    arena: &MemoryArena,
) -> Result<()> {
    if arena.store_id() != store.data().id() {
        return Err(Error::link(format!(
            "memory for `{namespace}.{name}` belongs to a different store"
        )));
    }
    if ty.is_64() || ty.is_shared() {
        return Err(Error::link(format!(
            "import `{namespace}.{name}` declares a 64-bit or shared memory, which the host does not provide"
        )));
    }
    let current = arena.size_pages(store);
    if current < ty.minimum() {
        return Err(Error::link(format!(
            "import `{namespace}.{name}` requires at least {} pages, but the memory has {current}",
            ty.minimum()
        )));
    }
    if let Some(required) = ty.maximum() {
        match arena.maximum_pages(store) {
            Some(max) if max <= required => {}
            Some(max) => {
                return Err(Error::link(format!(
                    "import `{namespace}.{name}` requires a maximum of at most {required} pages, but the memory allows {max}"
                )))
            }
            None => {
                return Err(Error::link(format!(
                    "import `{namespace}.{name}` requires a maximum of at most {required} pages, but the memory is unbounded"
                )))
            }
        }
    }
    Ok(())
}

/// An item exported by a [`ModuleInstance`].
#[derive(Debug, Clone)]
pub enum Export {
    /// A function.
    Func(Func),
    /// A linear memory.
    Memory(Memory),
    /// A global.
    Global(Global),
    /// A table.
    Table(Table),
}

/// A successfully instantiated guest module.
///
/// The set of exports is captured once, at instantiation, and never changes.
/// The instance holds handles only; the store that created it must be passed
/// to every call.
#[derive(Debug, Clone)]
pub struct ModuleInstance {
    instance: Instance,
    memories: Vec<MemoryArena>,
    exports: BTreeMap<String, Export>,
}

impl ModuleInstance {
    fn new(
        mut store: impl AsContextMut,
        instance: Instance,
        memories: Vec<MemoryArena>,
    ) -> ModuleInstance {
        let mut exports = BTreeMap::new();
        for export in instance.exports(store.as_context_mut()) {
            let name = export.name().to_string();
            let item = match export.into_extern() {
                Extern::Func(f) => Export::Func(f),
                Extern::Memory(m) => Export::Memory(m),
                Extern::Global(g) => Export::Global(g),
                Extern::Table(t) => Export::Table(t),
                _ => continue,
            };
            exports.insert(name, item);
        }
        ModuleInstance {
            instance,
            memories,
            exports,
        }
    }

    /// The engine instance.
    pub fn instance(&self) -> Instance {
        self.instance
    }

    /// The host memories this instance imported.
    pub fn imported_memories(&self) -> &[MemoryArena] {
        &self.memories
    }

    /// Every export, ordered by name.
    pub fn exports(&self) -> impl Iterator<Item = (&str, &Export)> + '_ {
        self.exports.iter().map(|(name, item)| (name.as_str(), item))
    }

    /// Looks up an export by name.
    pub fn get_export(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    /// Looks up a function export by name.
    pub fn get_func(&self, name: &str) -> Option<Func> {
        match self.exports.get(name)? {
            Export::Func(f) => Some(*f),
            _ => None,
        }
    }

    /// Looks up a memory export by name.
    pub fn get_memory(&self, name: &str) -> Option<Memory> {
        match self.exports.get(name)? {
            Export::Memory(m) => Some(*m),
            _ => None,
        }
    }

    /// A statically typed handle to the function export `name`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingExport`] if there is no such function, [`Error::Link`]
    /// if its type is not `Params -> Results`.
    pub fn typed_func<Params, Results>(
        &self,
        store: impl AsContext,
        name: &str,
    ) -> Result<TypedFunc<Params, Results>>
    where
        Params: WasmParams,
        Results: WasmResults,
    {
        let func = self.get_func(name).ok_or_else(|| Error::MissingExport {
            name: name.to_string(),
        })?;
        func.typed::<Params, Results>(&store)
            .map_err(|e| Error::link(format!("export `{name}` has an unexpected type: {e:#}")))
    }

    /// Calls the function export `name` with dynamically typed `args`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingExport`] if there is no such function,
    /// [`Error::Link`] if `args` do not match its parameters, and
    /// [`Error::Trap`] if the call traps.
    pub fn call(&self, mut store: impl AsContextMut, name: &str, args: &[Val]) -> Result<Vec<Val>> {
        let func = self.get_func(name).ok_or_else(|| Error::MissingExport {
            name: name.to_string(),
        })?;
        let ty = func.ty(&store);
        if ty.params().len() != args.len() {
            return Err(Error::link(format!(
                "export `{name}` takes {} arguments, but {} were given",
                ty.params().len(),
                args.len()
            )));
        }
        for (i, (param, arg)) in ty.params().zip(args).enumerate() {
            let expected = ValKind::from_val_type(&param);
            if expected.is_none() || expected != ValKind::of(arg) {
                return Err(Error::link(format!(
                    "argument {i} of export `{name}` must be {param:?}, got {}",
                    bridge::format_value(arg)
                )));
            }
        }
        let mut results = vec![Val::I32(0); ty.results().len()];
        func.call(&mut store, args, &mut results)
            .map_err(|source| Error::Trap {
                name: name.to_string(),
                source,
            })?;
        Ok(results)
    }
}
