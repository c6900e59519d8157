//! The standard set of imports offered to guests.
//!
//! Guests written against this environment import:
//!
//! | namespace | name        | capability                                  |
//! |-----------|-------------|---------------------------------------------|
//! | `console` | `logNumber` | `(i32) -> ()`, prints the number            |
//! | `console` | `logString` | `(i32) -> ()`, prints the string at offset  |
//! | `js`      | `logMemory` | the memory `logString` reads from           |

use crate::bridge::{log_number, log_string};
use crate::error::Result;
use crate::imports::ImportResolver;
use crate::memory::MemoryArena;
use crate::store::HostState;
use crate::values::ValKind;
use wasmtime::AsContextMut;

/// Namespace of the logging functions.
pub const CONSOLE: &str = "console";
/// Name of the numeric logging function.
pub const LOG_NUMBER: &str = "logNumber";
/// Name of the string logging function.
pub const LOG_STRING: &str = "logString";
/// Namespace of the shared memory.
pub const JS: &str = "js";
/// Name of the shared memory.
pub const LOG_MEMORY: &str = "logMemory";

/// Creates the shared memory and a resolver holding the standard imports.
///
/// The memory's size comes from the store's
/// [`Config::initial_pages`](crate::Config::initial_pages) and
/// [`Config::max_pages`](crate::Config::max_pages). The resolver is returned
/// open so embedders can add their own capabilities before building the
/// table.
pub fn standard_imports(
    mut store: impl AsContextMut<Data = HostState>,
) -> Result<(ImportResolver, MemoryArena)> {
    let mut store = store.as_context_mut();
    let (initial_pages, max_pages) = {
        let config = store.data().config();
        (config.initial_pages, config.max_pages)
    };
    let arena = MemoryArena::create(&mut store, initial_pages, max_pages)?;

    let mut resolver = ImportResolver::new();
    resolver
        .register_function(CONSOLE, LOG_NUMBER, log_number(ValKind::I32))?
        .register_function(CONSOLE, LOG_STRING, log_string(arena))?
        .register_memory(JS, LOG_MEMORY, &arena)?;
    Ok((resolver, arena))
}
