//! Common module for library exports

pub use crate::collector::{collect, Collected, PublicSymbol, SymbolDiagnostic};
pub use crate::declarator::{synthesize, Synthesis, TypeRef};
pub use crate::dump::{dump_tree, DumpMode};
pub use crate::emitter::emit;
pub use crate::error::{HeaderError, HeaderResult};
pub use crate::tree::loader::{load_bytes, load_path, LoadedInput, StubPolicy};
pub use crate::tree::{AttrName, AttrValue, DebugTree, EntryId, Tag, UnitId, UnitKind};
pub use crate::typedesc::{Modifier, TypeClass, TypeDesc};
pub use crate::worklist::PendingTypeSet;
