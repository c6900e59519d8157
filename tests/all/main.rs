mod environment;
mod memory;
mod registry;

use anyhow::Result;
use hostlink::{
    environment as env, new_store, CaptureSink, Config, HostState, Instantiator, MemoryArena,
    ModuleInstance,
};
use wasmtime::{Engine, Store};

/// A guest written against the standard environment.
///
/// Holds `"hello\0"` at offset 16 and the invalid UTF-8 string
/// `"\xff\xfe\0"` at offset 64.
pub(crate) const GUEST: &str = r#"
(module
  (import "console" "logNumber" (func $log_number (param i32)))
  (import "console" "logString" (func $log_string (param i32)))
  (import "js" "logMemory" (memory 1))

  (data (i32.const 16) "hello\00")
  (data (i32.const 64) "\ff\fe\00")

  (func (export "add") (param i32 i32) (result i32)
    local.get 0
    local.get 1
    i32.add)

  (func (export "log") (param i32)
    local.get 0
    call $log_string)

  (func (export "number") (param i32)
    local.get 0
    call $log_number)

  (func (export "boom")
    unreachable))
"#;

/// A fresh store whose guest output is captured.
pub(crate) fn store_with(config: Config) -> (Store<HostState>, CaptureSink) {
    let engine = Engine::default();
    let sink = CaptureSink::new();
    (new_store(&engine, config, sink.clone()), sink)
}

pub(crate) fn store() -> (Store<HostState>, CaptureSink) {
    store_with(Config::new())
}

/// Links `wat` against the standard environment of `store`.
pub(crate) fn instantiate(
    store: &mut Store<HostState>,
    wat: &str,
) -> Result<(ModuleInstance, MemoryArena)> {
    let (resolver, arena) = env::standard_imports(&mut *store)?;
    let instantiator = Instantiator::new(store.engine());
    let module = instantiator.compile_blocking(wat.as_bytes())?;
    let instance = instantiator.instantiate_module(&mut *store, &module, &resolver.build())?;
    Ok((instance, arena))
}
