//! # Error Types
//!
//! General error handling for the header reconstruction engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::tree::{AttrName, Tag};

/// Main error type for header reconstruction
///
/// This enum represents all the ways reconstructing a header from a stub
/// binary can fail. Symbol-level problems discovered by the collector
/// (an index entry whose name does not match the entry it points at, or an
/// index entry pointing nowhere) are *diagnostics*, not errors: collection
/// excludes the entry and continues, so they never appear here.
///
/// ## Error Categories
///
/// 1. **Input errors**: NoDebugInfo, InvalidInput
/// 2. **Stub-rule errors**: DisallowedEntryKind (strict mode only)
/// 3. **Tree errors**: MissingAttribute, CyclicTypeReference
/// 4. **Backend errors**: Dwarf (from the DWARF reader)
/// 5. **I/O errors**: Io (for file operations, etc.)
#[derive(Error, Debug)]
pub enum HeaderError
{
    /// The entry does not carry the requested attribute
    ///
    /// Most callers recover from this locally (a missing name renders as the
    /// `(null)` marker, a missing array bound renders as `[]`). It surfaces
    /// as an error only from the attribute decoder, whose contract is to
    /// decode exactly what is present.
    #[error("entry at 0x{offset:08x} has no attribute {attr}")]
    MissingAttribute
    {
        /// The attribute that was requested
        attr: AttrName,
        /// Unit-relative offset of the entry that lacked it
        offset: u64,
    },

    /// A chain of type references did not terminate
    ///
    /// Malformed debug info can contain self-referential modifier chains.
    /// Synthesis bounds its recursion depth and fails with this error rather
    /// than looping forever.
    #[error("type reference chain at 0x{offset:08x} exceeds the recursion limit")]
    CyclicTypeReference
    {
        /// Unit-relative offset of the entry where the limit was hit
        offset: u64,
    },

    /// The input contains an entry kind that implies an executable body
    ///
    /// A stub binary must not contain lexical blocks or inlined subroutines.
    /// In strict mode (the default) hitting one is fatal; lenient mode skips
    /// the offending subtree instead and never raises this.
    #[error("entry kind {tag} implies an executable body; input is not a stub")]
    DisallowedEntryKind
    {
        /// The offending entry kind
        tag: Tag,
    },

    /// The input has no debug-information section
    #[error("input has no debug information")]
    NoDebugInfo,

    /// The input container could not be parsed
    ///
    /// Wraps object/archive parsing failures as a message, since the exact
    /// container error type is an implementation detail of the backend.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Low-level DWARF reader error
    #[error("DWARF error: {0}")]
    Dwarf(#[from] gimli::Error),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, HeaderError>`
///
/// ```rust
/// use stubhdr_core::error::HeaderResult;
/// fn foo() -> HeaderResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type HeaderResult<T> = std::result::Result<T, HeaderError>;
