//! # Error Types
//!
//! General error handling for program-counter resolution.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for pcfind operations
///
/// Only *fatal* conditions are errors. A missing attribute (no `DW_AT_low_pc`,
/// no name, no ranges) is reported as "absent" by the reading layer, and an
/// address that no subprogram covers is a normal negative result.
///
/// ## Error Categories
///
/// 1. **Container errors**: Io, ObjectParse, Section, MissingDebugInfo
/// 2. **DWARF read errors**: Dwarf, MalformedUnit
/// 3. **Input errors**: InvalidAddress
#[derive(Error, Debug)]
pub enum PcfindError
{
    /// The object file could not be recognised or parsed
    ///
    /// This happens when the path points at something that is not an
    /// ELF, Mach-O, PE or other container the `object` crate understands,
    /// or when the file is truncated.
    #[error("Failed to parse {}: {message}", path.display())]
    ObjectParse
    {
        /// Path of the file that failed to parse
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A debug section exists but its contents could not be read
    ///
    /// Usually a compressed section whose compression format is not
    /// supported or whose payload is corrupt.
    #[error("Failed to read section {name}: {message}")]
    Section
    {
        /// Section name as found in the object
        name: String,
        /// Reader message
        message: String,
    },

    /// The container has no `.debug_info` data at all
    #[error("No DWARF debug info in {}", .0.display())]
    MissingDebugInfo(PathBuf),

    /// gimli reported a hard failure while decoding DWARF
    ///
    /// `context` describes what was being read (e.g. "reading unit header")
    /// so the message points at the failing step.
    #[error("{context}: {source}")]
    Dwarf
    {
        /// What the resolver was doing when the read failed
        context: String,
        /// Underlying gimli error
        #[source]
        source: gimli::Error,
    },

    /// A unit is structurally unusable (for example, it has no root DIE)
    #[error("Malformed compilation unit: {0}")]
    MalformedUnit(String),

    /// An address argument could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// I/O error (for file operations, etc.)
    ///
    /// Used for errors when reading the object file from disk.
    /// This is a standard Rust `std::io::Error` converted to our error type.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, PcfindError>`
///
/// ```rust
/// use pcfind_core::error::PcfindResult;
/// fn foo() -> PcfindResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type PcfindResult<T> = std::result::Result<T, PcfindError>;

/// Map a gimli DWARF error to a `PcfindError` with context.
///
/// This helper wraps gimli errors with a description of the operation that
/// was being performed when the error occurred.
pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> PcfindError
{
    PcfindError::Dwarf {
        context: context.to_string(),
        source: err,
    }
}
