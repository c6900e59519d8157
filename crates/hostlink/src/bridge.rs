//! Host functions callable from guests, and the channel they report to.
//!
//! Guests can only pass numbers across the boundary. A string is passed as
//! the offset of its first byte in a shared [`MemoryArena`]; the string ends
//! at the first zero byte or at the end of the memory, whichever comes first.

use crate::config::{FaultPolicy, Utf8Mode};
use crate::error::{Error, Result};
use crate::imports::HostFunction;
use crate::memory::{MemoryArena, Offset};
use crate::store::HostState;
use crate::values::{Signature, ValKind};
use std::borrow::Cow;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};
use wasmtime::{Caller, Val};

/// The observation channel host functions write guest output to.
pub trait Sink: Send + 'static {
    /// Records one line of output.
    fn write(&mut self, text: &str);
}

/// Emits guest output as `tracing` events on the `hostlink::guest` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn write(&mut self, text: &str) {
        info!(target: "hostlink::guest", "{text}");
    }
}

/// Writes each line of guest output, newline-terminated, to a writer.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: io::Write> WriterSink<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> WriterSink<W> {
        WriterSink { writer }
    }
}

impl<W: io::Write + Send + 'static> Sink for WriterSink<W> {
    fn write(&mut self, text: &str) {
        if let Err(e) = writeln!(self.writer, "{text}").and_then(|()| self.writer.flush()) {
            warn!("failed to write guest output: {e}");
        }
    }
}

/// Collects guest output in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    /// Creates an empty sink.
    pub fn new() -> CaptureSink {
        CaptureSink::default()
    }

    /// A copy of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns every line written so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Sink for CaptureSink {
    fn write(&mut self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }
}

/// Formats a numeric value the way the bridge reports it.
pub fn format_value(val: &Val) -> String {
    match val {
        Val::I32(v) => v.to_string(),
        Val::I64(v) => v.to_string(),
        Val::F32(bits) => f32::from_bits(*bits).to_string(),
        Val::F64(bits) => f64::from_bits(*bits).to_string(),
        other => format!("{other:?}"),
    }
}

/// Reads the NUL-terminated string starting at `offset` in `bytes`.
///
/// The string runs to the first zero byte (exclusive) or to the end of
/// `bytes`.
///
/// # Errors
///
/// [`Error::OutOfBounds`] if `offset` is not inside `bytes`, and in
/// [`Utf8Mode::Strict`] [`Error::Decode`] if the bytes are not UTF-8.
pub fn read_c_str(bytes: &[u8], offset: Offset, mode: Utf8Mode) -> Result<Cow<'_, str>> {
    let size = bytes.len() as u64;
    if offset >= size {
        return Err(Error::OutOfBounds {
            offset,
            length: 1,
            size,
        });
    }
    let tail = &bytes[offset as usize..];
    let raw = match tail.iter().position(|&b| b == 0) {
        Some(end) => &tail[..end],
        None => tail,
    };
    match mode {
        Utf8Mode::Strict => std::str::from_utf8(raw)
            .map(Cow::Borrowed)
            .map_err(|e| Error::Decode {
                offset,
                valid_up_to: e.valid_up_to(),
            }),
        Utf8Mode::Lossy => Ok(String::from_utf8_lossy(raw)),
    }
}

/// `logNumber`: emits its single argument of kind `kind` in decimal.
pub fn log_number(kind: ValKind) -> HostFunction {
    HostFunction::new("logNumber", Signature::new([kind], None), |caller, args| {
        let text = args.first().map(format_value).unwrap_or_default();
        caller.data_mut().emit(&text);
        Ok(None)
    })
}

/// `logString`: emits the NUL-terminated string at the `i32` offset it
/// receives, read from `arena`.
///
/// The offset is an unsigned 32-bit guest address. Strings are decoded
/// according to the store's [`Utf8Mode`].
pub fn log_string(arena: MemoryArena) -> HostFunction {
    HostFunction::new(
        "logString",
        Signature::new([ValKind::I32], None),
        move |caller, args| {
            let offset = match args.first() {
                Some(Val::I32(ptr)) => u64::from(*ptr as u32),
                _ => 0,
            };
            let mode = caller.data().config().utf8_mode;
            let text = read_c_str(arena.data(&*caller), offset, mode)?.into_owned();
            caller.data_mut().emit(&text);
            Ok(None)
        },
    )
    .bound_to(&arena)
}

/// Adapts a [`HostFunction`] to the engine's dynamic calling convention and
/// applies the store's [`FaultPolicy`] to its failures.
pub(crate) fn trampoline(
    namespace: &str,
    name: &str,
    func: HostFunction,
) -> impl Fn(Caller<'_, HostState>, &[Val], &mut [Val]) -> anyhow::Result<()> + Send + Sync + 'static
{
    let import = format!("{namespace}.{name}");
    move |mut caller: Caller<'_, HostState>, params: &[Val], results: &mut [Val]| {
        let declared = func.signature().result();
        match func.call(&mut caller, params) {
            Ok(value) => match (results.first_mut(), value) {
                (Some(slot), Some(value)) if ValKind::of(&value) == declared => {
                    *slot = value;
                    Ok(())
                }
                (None, None) => Ok(()),
                (_, value) => anyhow::bail!(
                    "host function `{import}` returned {} but is declared as {}",
                    value.as_ref().map_or_else(|| "nothing".to_string(), format_value),
                    func.signature()
                ),
            },
            Err(err) => match caller.data().config().fault_policy {
                FaultPolicy::Trap => Err(err.into()),
                FaultPolicy::Log => {
                    warn!(import = %import, "host call faulted: {err}");
                    caller.data_mut().record_fault();
                    if let (Some(slot), Some(kind)) = (results.first_mut(), declared) {
                        *slot = kind.zero();
                    }
                    Ok(())
                }
            },
        }
    }
}
