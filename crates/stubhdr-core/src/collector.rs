//! Public symbol collector: cross-matches the exported-name and
//! exported-type index tables against the debug tree.
//!
//! Index rows that fail validation are excluded and recorded as diagnostics;
//! collection itself never fails. Output order follows index-table order,
//! names before types.

use tracing::warn;

use crate::tree::{AttrName, AttrValue, DebugTree, EntryId, IndexedSymbol};

/// An entry reachable from the exported index, annotated with its declaring
/// source path.
#[derive(Debug, Clone)]
pub struct PublicSymbol
{
    pub entry: EntryId,
    pub name: String,
    pub decl_path: String,
}

/// A problem with one index row. Non-fatal: the row is excluded and
/// collection continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolDiagnostic
{
    /// The entry at the indexed offset carries a different name.
    NameMismatch
    {
        indexed: String,
        found: String,
        offset: u64,
    },
    /// No entry at the indexed offset (or the indexed unit is unknown).
    NotFound
    {
        indexed: String, offset: u64
    },
}

#[derive(Debug, Default)]
pub struct Collected
{
    pub symbols: Vec<PublicSymbol>,
    pub diagnostics: Vec<SymbolDiagnostic>,
}

/// Collect the ordered public symbols of `tree`.
pub fn collect(tree: &DebugTree) -> Collected
{
    let mut out = Collected::default();
    for row in tree.pub_names().iter().chain(tree.pub_types().iter()) {
        collect_row(tree, row, &mut out);
    }
    out
}

fn collect_row(tree: &DebugTree, row: &IndexedSymbol, out: &mut Collected)
{
    let located = row.unit.and_then(|unit| tree.entry_at(unit, row.die_offset));
    let Some(entry) = located else {
        warn!(name = %row.name, offset = row.die_offset, "indexed symbol not found");
        out.diagnostics.push(SymbolDiagnostic::NotFound {
            indexed: row.name.clone(),
            offset: row.die_offset,
        });
        return;
    };

    let found = tree.entry(entry).name().unwrap_or("(null)");
    if found != row.name {
        warn!(
            indexed = %row.name,
            found = %found,
            offset = row.die_offset,
            "indexed symbol name mismatch"
        );
        out.diagnostics.push(SymbolDiagnostic::NameMismatch {
            indexed: row.name.clone(),
            found: found.to_string(),
            offset: row.die_offset,
        });
        return;
    }

    out.symbols.push(PublicSymbol {
        entry,
        name: row.name.clone(),
        decl_path: decl_path(tree, entry),
    });
}

/// The declaring source path: the declaration-file index resolved through the
/// owning unit's file table, falling back to the unit's own name.
fn decl_path(tree: &DebugTree, entry: EntryId) -> String
{
    let unit = tree.owning_unit(entry);
    if let Some(AttrValue::Unsigned(index)) = tree.entry(entry).attr(AttrName::DeclFile) {
        if let Some(path) = tree.unit(unit).file_name(*index) {
            return path.to_string();
        }
    }
    tree.root(unit)
        .and_then(|root| tree.entry(root).name())
        .unwrap_or("<unknown>")
        .to_string()
}
