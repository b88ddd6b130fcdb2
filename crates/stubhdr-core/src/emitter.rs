//! Header emitter: drives the collector output through the synthesizer and
//! the worklist to produce the final header text.
//!
//! The global-symbols section is rendered first into its own buffer (this is
//! what discovers the referenced types), but the referenced-types section is
//! placed first in the output, since types must be known before use.

use tracing::debug;

use crate::attr;
use crate::collector::Collected;
use crate::declarator::{display_name, synthesize, TypeRef};
use crate::error::HeaderResult;
use crate::tree::{AttrName, DebugTree, EntryId, Tag, UnitKind};
use crate::worklist::PendingTypeSet;

/// Placeholder for entities that carry no name attribute.
const NO_NAME: &str = "(null)";

/// Render the complete header for one input.
pub fn emit(
    tree: &DebugTree,
    collected: &Collected,
    generator: &str,
    origin: &str,
) -> HeaderResult<String>
{
    let mut worklist = PendingTypeSet::new();
    let mut globals = String::new();
    let mut current_path: Option<&str> = None;

    for symbol in &collected.symbols {
        let entry = tree.entry(symbol.entry);

        // Only external declarations surface at top level; the rest are
        // reachable through type bodies if anything refers to them.
        if matches!(entry.tag, Tag::Variable | Tag::Subprogram) && !entry.flag(AttrName::External) {
            debug!(name = %symbol.name, "skipping non-external symbol");
            continue;
        }

        if current_path != Some(symbol.decl_path.as_str()) {
            globals.push_str(&format!(
                "// processing public symbols in file {} ...\n",
                symbol.decl_path
            ));
            current_path = Some(symbol.decl_path.as_str());
        }

        match entry.tag {
            Tag::Variable => {
                let s = synthesize(tree, symbol.entry)?;
                merge(&mut worklist, s.referenced);
                globals.push_str(&format!("extern {};\n", s.desc.declare(&symbol.name)));
            }
            Tag::Subprogram => {
                let (text, refs) = render_prototype(tree, symbol.entry, &symbol.name)?;
                merge(&mut worklist, refs);
                globals.push_str(&text);
            }
            Tag::Typedef => {
                let s = synthesize(tree, symbol.entry)?;
                merge(&mut worklist, s.referenced);
                globals.push_str(&format!("typedef {};\n", s.desc.declare(&symbol.name)));
                worklist.mark_rendered(&display_name(tree, symbol.entry));
            }
            tag if tag.is_aggregate() || tag == Tag::EnumerationType => {
                let (body, refs) = render_type_body(tree, symbol.entry, 0)?;
                merge(&mut worklist, refs);
                globals.push_str(&body);
                worklist.mark_rendered(&display_name(tree, symbol.entry));
            }
            Tag::BaseType => {}
            other => debug!(name = %symbol.name, tag = %other, "no top-level rendering"),
        }
    }

    // Drain in passes: each body may register further nested types.
    let mut types = String::new();
    loop {
        let batch = worklist.drain_newly_registered();
        if batch.is_empty() {
            break;
        }
        for (_name, entry) in batch {
            let (body, refs) = render_type_body(tree, entry, 0)?;
            merge(&mut worklist, refs);
            match tree.unit(tree.owning_unit(entry)).kind() {
                UnitKind::Type { signature } => {
                    // Signature guard keeps independently generated copies of
                    // the same type-unit definition textually idempotent.
                    let guard = format!("Type_{signature:x}");
                    types.push_str(&format!("#ifndef {guard}\n#define {guard}\n{body}#endif\n"));
                }
                UnitKind::Compile => types.push_str(&body),
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!("// generated by  : {generator}\n"));
    out.push_str(&format!("// generated from: {origin}\n"));
    out.push_str("// referenced types\n");
    out.push_str(&types);
    out.push_str("// global symbols\n");
    out.push_str(&globals);
    out.push_str("// end of header\n");
    Ok(out)
}

fn merge(worklist: &mut PendingTypeSet, refs: Vec<TypeRef>)
{
    for r in refs {
        worklist.register(&r.name, r.entry);
    }
}

/// `extern <ret> <name> (` with one parameter per line.
fn render_prototype(
    tree: &DebugTree,
    entry: EntryId,
    name: &str,
) -> HeaderResult<(String, Vec<TypeRef>)>
{
    let ret = synthesize(tree, entry)?;
    let mut refs = ret.referenced;

    let mut params = Vec::new();
    for child in tree.children(entry) {
        match tree.entry(child).tag {
            Tag::FormalParameter => {
                if tree.entry(child).flag(AttrName::Artificial) {
                    continue;
                }
                let p = synthesize(tree, child)?;
                refs.extend(p.referenced);
                let pname = tree.entry(child).name().unwrap_or(NO_NAME);
                params.push(format!("  {}", p.desc.declare(pname)));
            }
            Tag::UnspecifiedParameters => params.push("  ...".to_string()),
            _ => {}
        }
    }

    let text = if params.is_empty() {
        format!("extern {} {} ();\n", ret.desc.type_text(), name)
    } else {
        format!(
            "extern {} {} (\n{}\n);\n",
            ret.desc.type_text(),
            name,
            params.join(",\n")
        )
    };
    Ok((text, refs))
}

/// Render the full definition of an aggregate, enum or typedef entry.
///
/// Returns the body text and the named types its members refer to; the
/// caller merges those into the worklist (bodies are rendered during drains,
/// which must not mutate the registry mid-iteration).
pub fn render_type_body(
    tree: &DebugTree,
    entry: EntryId,
    indent: usize,
) -> HeaderResult<(String, Vec<TypeRef>)>
{
    let e = tree.entry(entry);
    let pad = "  ".repeat(indent);
    let mut refs = Vec::new();
    let mut out = String::new();

    match e.tag {
        tag if tag.is_aggregate() => {
            let keyword = match tag {
                Tag::UnionType => "union",
                Tag::ClassType => "class",
                _ => "struct",
            };
            let name = crate::declarator::name_or_anonymous(tree, entry);
            out.push_str(&format!("{pad}{keyword} {name} {{\n"));
            for child in tree.children(entry) {
                if tree.entry(child).tag != Tag::Member {
                    continue;
                }
                let s = synthesize(tree, child)?;
                refs.extend(s.referenced);
                let mname = tree.entry(child).name().unwrap_or(NO_NAME);
                out.push_str(&format!("{pad}  {};\n", s.desc.declare(mname)));
            }
            out.push_str(&format!("{pad}}};\n"));
        }
        Tag::EnumerationType => {
            let name = crate::declarator::name_or_anonymous(tree, entry);
            out.push_str(&format!("{pad}enum {name} {{\n"));
            let mut items = Vec::new();
            for child in tree.children(entry) {
                if tree.entry(child).tag != Tag::Enumerator {
                    continue;
                }
                let ename = tree.entry(child).name().unwrap_or(NO_NAME);
                match attr::decode(tree.entry(child), AttrName::ConstValue) {
                    Ok(value) => items.push(format!("{pad}  {ename} = {value}")),
                    Err(_) => items.push(format!("{pad}  {ename}")),
                }
            }
            out.push_str(&items.join(",\n"));
            if !items.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("{pad}}};\n"));
        }
        Tag::Typedef => {
            let s = synthesize(tree, entry)?;
            refs.extend(s.referenced);
            let name = tree.entry(entry).name().unwrap_or(NO_NAME);
            out.push_str(&format!("{pad}typedef {};\n", s.desc.declare(name)));
        }
        other => {
            debug!(offset = e.offset, tag = %other, "no body rendering for entry kind");
        }
    }

    Ok((out, refs))
}
