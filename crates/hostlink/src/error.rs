//! Errors produced while setting up, linking or calling into a guest module.

use thiserror::Error;

/// A specialized [`Result`](std::result::Result) for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong between the host and a guest module.
///
/// Setup errors (`Allocation` through `Link`) abort the operation that
/// produced them and never leave a partially initialized instance behind.
/// `OutOfBounds` and `Decode` also surface from host functions called by the
/// guest, where the store's [`FaultPolicy`](crate::FaultPolicy) decides what
/// happens to the in-flight call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A linear memory could not be created.
    #[error("failed to allocate a linear memory of {pages} pages: {reason}")]
    Allocation {
        /// Requested initial size, in pages.
        pages: u64,
        /// Why the allocation was refused.
        reason: String,
    },

    /// A linear memory could not be grown. Its size is unchanged.
    #[error("failed to grow linear memory of {current} pages by {delta} pages: {reason}")]
    Growth {
        /// Size before the attempt, in pages.
        current: u64,
        /// Requested growth, in pages.
        delta: u64,
        /// Why the growth was refused.
        reason: String,
    },

    /// A byte range reaches past the end of a linear memory.
    #[error("access of {length} bytes at offset {offset} is out of bounds for a memory of {size} bytes")]
    OutOfBounds {
        /// Start of the access.
        offset: u64,
        /// Length of the access.
        length: u64,
        /// Byte size of the memory at the time of the access.
        size: u64,
    },

    /// Guest bytes were expected to be UTF-8 but were not.
    #[error("string at offset {offset} is not valid UTF-8 (valid up to byte {valid_up_to})")]
    Decode {
        /// Offset of the first byte of the string.
        offset: u64,
        /// Number of leading bytes that decoded successfully.
        valid_up_to: usize,
    },

    /// A `(namespace, name)` pair was registered twice.
    #[error("import `{namespace}.{name}` is already registered")]
    DuplicateImport {
        /// Import namespace (the module name in the guest's import section).
        namespace: String,
        /// Import name.
        name: String,
    },

    /// The module bytes are not a well-formed WebAssembly module.
    #[error("invalid module: {reason}")]
    InvalidModule {
        /// Diagnostic from the parser or validator.
        reason: String,
    },

    /// The module declares an import that the table does not provide.
    #[error("unresolved import `{namespace}.{name}`")]
    UnresolvedImport {
        /// Import namespace.
        namespace: String,
        /// Import name.
        name: String,
    },

    /// The shape of an import or export does not match what was provided or
    /// requested.
    #[error("link error: {reason}")]
    Link {
        /// Description of the mismatch.
        reason: String,
    },

    /// The instance has no function export with this name.
    #[error("no function export named `{name}`")]
    MissingExport {
        /// Requested export name.
        name: String,
    },

    /// A call into the guest trapped.
    #[error("call to `{name}` trapped")]
    Trap {
        /// Name of the export that was called.
        name: String,
        /// The engine's trap, including any host error that caused it.
        source: anyhow::Error,
    },
}

impl Error {
    pub(crate) fn link(reason: impl Into<String>) -> Error {
        Error::Link {
            reason: reason.into(),
        }
    }
}
