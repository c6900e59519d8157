//! Host-created linear memories shared with guests.

use crate::error::{Error, Result};
use crate::store::HostState;
use std::ops::Range;
use tracing::debug;
use wasmtime::{AsContext, AsContextMut, Memory, MemoryType, StoreContext, StoreContextMut};

/// Size of a WebAssembly page, in bytes.
pub const WASM_PAGE_SIZE: u64 = 0x10000;

/// Largest number of pages a 32-bit linear memory can hold (4 GiB).
pub const MAX_PAGES: u32 = 0x10000;

/// A guest-relative byte address into a [`MemoryArena`].
pub type Offset = u64;

/// A linear memory owned by a host store.
///
/// The arena is a cheap handle; the bytes live in the store. Every view
/// borrows the store and every growth borrows it mutably, so a view can never
/// be held across a [`grow`](MemoryArena::grow): growth may move the backing
/// storage and views must be re-acquired afterwards.
#[derive(Debug, Clone, Copy)]
pub struct MemoryArena {
    memory: Memory,
    store_id: u64,
}

impl MemoryArena {
    /// Creates a zero-filled memory of `initial_pages` pages in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if `initial_pages` exceeds `max_pages`,
    /// if either exceeds [`MAX_PAGES`], or if the store's memory budget
    /// refuses the allocation.
    pub fn create(
        mut store: impl AsContextMut<Data = HostState>,
        initial_pages: u32,
        max_pages: Option<u32>,
    ) -> Result<MemoryArena> {
        let refuse = |reason: String| Error::Allocation {
            pages: u64::from(initial_pages),
            reason,
        };
        if let Some(max) = max_pages {
            if initial_pages > max {
                return Err(refuse(format!("initial size exceeds the maximum of {max} pages")));
            }
        }
        if initial_pages > MAX_PAGES || max_pages.is_some_and(|max| max > MAX_PAGES) {
            return Err(refuse(format!(
                "size exceeds the 32-bit limit of {MAX_PAGES} pages"
            )));
        }

        let mut store = store.as_context_mut();
        let store_id = store.data().id();
        let memory = Memory::new(&mut store, MemoryType::new(initial_pages, max_pages))
            .map_err(|e| refuse(format!("{e:#}")))?;
        debug!(initial_pages, ?max_pages, "created linear memory");
        Ok(MemoryArena { memory, store_id })
    }

    /// Current size, in pages.
    pub fn size_pages(&self, store: impl AsContext) -> u64 {
        self.memory.size(&store)
    }

    /// Current size, in bytes.
    pub fn data_size(&self, store: impl AsContext) -> usize {
        self.memory.data_size(&store)
    }

    /// Maximum size, in pages, if the memory is bounded.
    pub fn maximum_pages(&self, store: impl AsContext) -> Option<u64> {
        self.memory.ty(&store).maximum()
    }

    /// Grows the memory by `delta_pages` and returns the size before growth.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Growth`] if the new size would exceed the maximum or
    /// the store's memory budget. The size is unchanged in that case.
    pub fn grow(&self, mut store: impl AsContextMut, delta_pages: u64) -> Result<u64> {
        let mut store = store.as_context_mut();
        let current = self.memory.size(&store);
        let maximum = self
            .memory
            .ty(&store)
            .maximum()
            .unwrap_or(u64::from(MAX_PAGES));
        let refuse = |reason: String| Error::Growth {
            current,
            delta: delta_pages,
            reason,
        };
        match current.checked_add(delta_pages) {
            Some(desired) if desired <= maximum => {}
            _ => return Err(refuse(format!("the maximum is {maximum} pages"))),
        }
        let previous = self
            .memory
            .grow(&mut store, delta_pages)
            .map_err(|e| refuse(format!("{e:#}")))?;
        debug!(previous, delta_pages, "grew linear memory");
        Ok(previous)
    }

    /// The whole memory as a byte slice.
    pub fn data<'a, T: 'a>(&self, store: impl Into<StoreContext<'a, T>>) -> &'a [u8] {
        self.memory.data(store)
    }

    /// A read-only window of `length` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `offset + length` exceeds the current
    /// size.
    pub fn view_bytes<'a, T: 'a>(
        &self,
        store: impl Into<StoreContext<'a, T>>,
        offset: Offset,
        length: u64,
    ) -> Result<&'a [u8]> {
        let data = self.memory.data(store);
        let range = checked_range(offset, length, data.len())?;
        Ok(&data[range])
    }

    /// A writable window of `length` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `offset + length` exceeds the current
    /// size.
    pub fn view_bytes_mut<'a, T: 'a>(
        &self,
        store: impl Into<StoreContextMut<'a, T>>,
        offset: Offset,
        length: u64,
    ) -> Result<&'a mut [u8]> {
        let data = self.memory.data_mut(store);
        let range = checked_range(offset, length, data.len())?;
        Ok(&mut data[range])
    }

    /// Copies `bytes` into the memory at `offset`.
    pub fn write(&self, mut store: impl AsContextMut, offset: Offset, bytes: &[u8]) -> Result<()> {
        let length = bytes.len() as u64;
        self.view_bytes_mut(store.as_context_mut(), offset, length)?
            .copy_from_slice(bytes);
        Ok(())
    }

    /// Fills `buf` from the memory at `offset`.
    pub fn read(&self, store: impl AsContext, offset: Offset, buf: &mut [u8]) -> Result<()> {
        let length = buf.len() as u64;
        buf.copy_from_slice(self.view_bytes(store.as_context(), offset, length)?);
        Ok(())
    }

    /// The underlying engine memory.
    pub fn memory(&self) -> Memory {
        self.memory
    }

    pub(crate) fn store_id(&self) -> u64 {
        self.store_id
    }
}

fn checked_range(offset: u64, length: u64, size: usize) -> Result<Range<usize>> {
    let size = size as u64;
    match offset.checked_add(length) {
        // Both ends are bounded by `size`, which came from a `usize`.
        Some(end) if end <= size => Ok(offset as usize..end as usize),
        _ => Err(Error::OutOfBounds {
            offset,
            length,
            size,
        }),
    }
}
