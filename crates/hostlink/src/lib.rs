//! Host side of a host/guest ABI bridge for WebAssembly modules.
//!
//! A guest module is compiled and executed by [`wasmtime`]; this crate owns
//! everything the host brings to the table:
//!
//! * [`MemoryArena`]: a linear memory created by the host, shared with the
//!   guest, and the substrate for every piece of bulk data crossing the
//!   boundary.
//! * [`ImportResolver`] and [`ImportTable`]: the named set of host
//!   capabilities, keyed by `(namespace, name)`, that a module may import.
//! * The host function bridge ([`log_number`], [`log_string`] and the
//!   [`Sink`] they write to): functions that receive only numeric arguments
//!   and translate them into host operations. Strings are passed as an offset
//!   to NUL-terminated UTF-8 bytes in the shared memory.
//! * [`Instantiator`]: validates a module, checks every declared import
//!   against the table (presence, kind and exact signature), and produces a
//!   [`ModuleInstance`].
//! * [`ExportRegistry`]: the process-wide handle to the most recently
//!   published instance.
//!
//! A typical embedding mirrors a browser loader:
//!
//! ```ignore
//! use hostlink::{environment, new_store, Config, ExportRegistry, Instantiator, TracingSink};
//! use wasmtime::Engine;
//!
//! let engine = Engine::default();
//! let mut store = new_store(&engine, Config::new(), TracingSink);
//! let (resolver, _memory) = environment::standard_imports(&mut store)?;
//! let instance = Instantiator::new(&engine)
//!     .instantiate_and_register(&mut store, &bytes, &resolver.build(), ExportRegistry::global())
//!     .await?;
//! let sum = instance.typed_func::<(i32, i32), i32>(&store, "add")?.call(&mut store, (2, 3))?;
//! ```

#![deny(missing_docs)]

mod bridge;
mod config;
pub mod environment;
mod error;
mod imports;
mod instantiate;
mod memory;
mod registry;
mod store;
mod values;

pub use crate::bridge::{
    format_value, log_number, log_string, read_c_str, CaptureSink, Sink, TracingSink, WriterSink,
};
pub use crate::config::{Config, FaultPolicy, Utf8Mode};
pub use crate::error::{Error, Result};
pub use crate::imports::{HostFunction, Import, ImportResolver, ImportTable};
pub use crate::instantiate::{Export, Instantiator, ModuleInstance};
pub use crate::memory::{MemoryArena, Offset, MAX_PAGES, WASM_PAGE_SIZE};
pub use crate::registry::ExportRegistry;
pub use crate::store::{new_store, HostState};
pub use crate::values::{Signature, ValKind};

pub use wasmtime;
