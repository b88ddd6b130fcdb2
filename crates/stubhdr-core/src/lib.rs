//! # stubhdr-core
//!
//! Header reconstruction engine for stub binaries.
//!
//! A stub binary is an object, archive or shared-object file compiled with no
//! executable bodies: uninitialized variables and empty functions only. This
//! crate rebuilds compilable C/C++ header declarations from such a file's
//! debug-information tree:
//!
//! - [`tree`]: the owned, navigable entry tree, with a [`tree::loader`]
//!   backend that fills it from DWARF sections
//! - [`attr`]: attribute display decoding
//! - [`typedesc`]: the parsed type-expression value and its declarator
//!   rendering
//! - [`declarator`]: recursive synthesis of precedence-correct declarators
//! - [`worklist`]: one-time emission registry for referenced named types
//! - [`collector`]: public-symbol collection from the exported indexes
//! - [`emitter`]: final header assembly
//! - [`dump`]: diagnostic tree dumps for the CLI's verbosity modes
//!
//! One run is single-threaded and shares nothing across inputs: each input
//! gets its own tree, worklist and collector.

pub mod attr;
pub mod collector;
pub mod declarator;
pub mod dump;
pub mod emitter;
pub mod error;
pub mod prelude;
pub mod tree;
pub mod typedesc;
pub mod worklist;

// Re-export commonly used types
pub use error::{HeaderError, HeaderResult};
