//! Diagnostic dumps of the debug tree, for the CLI's verbosity modes.
//!
//! Dumps go to an arbitrary writer so they never mix with the generated
//! header text; the CLI points them at stderr.

use std::io::{self, Write};

use crate::attr::decode_value;
use crate::tree::{DebugTree, EntryId, UnitKind};

/// How much of each entry to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpMode
{
    /// Offset and tag only.
    Tags,
    /// Offset, tag, and every attribute decoded.
    Attrs,
}

/// Dump every unit of `tree` to `out`.
pub fn dump_tree<W: Write>(tree: &DebugTree, mode: DumpMode, out: &mut W) -> io::Result<()>
{
    for unit in tree.units() {
        let u = tree.unit(unit);
        match u.kind() {
            UnitKind::Compile => {
                writeln!(out, "compile unit at 0x{:08x}", u.section_offset())?;
            }
            UnitKind::Type { signature } => writeln!(
                out,
                "type unit at 0x{:08x}, signature 0x{signature:016x}",
                u.section_offset()
            )?,
        }
        if let Some(root) = tree.root(unit) {
            dump_entry(tree, root, mode, 1, out)?;
        }
    }
    Ok(())
}

fn dump_entry<W: Write>(
    tree: &DebugTree,
    entry: EntryId,
    mode: DumpMode,
    depth: usize,
    out: &mut W,
) -> io::Result<()>
{
    let e = tree.entry(entry);
    let pad = "  ".repeat(depth);
    writeln!(out, "{pad}<0x{:08x}> {}", e.offset, e.tag)?;
    if mode == DumpMode::Attrs {
        for (name, value) in e.attrs() {
            writeln!(out, "{pad}  {:<18} {}", name.to_string(), decode_value(value))?;
        }
    }
    for child in tree.children(entry) {
        dump_entry(tree, child, mode, depth + 1, out)?;
    }
    Ok(())
}
