//! Declarator synthesizer: renders a precedence-correct type expression for
//! any type-bearing entry.
//!
//! Synthesis walks the modifier chain from the declaration to the underlying
//! type, then dispatches on the terminal entry kind. It returns two explicit
//! channels: the parsed expression, and the named types it resolved along the
//! way (for the caller to merge into the emission worklist). Recursion depth
//! is bounded so malformed self-referential chains fail instead of hanging.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use smallvec::SmallVec;
use tracing::warn;

use crate::error::{HeaderError, HeaderResult};
use crate::tree::{AttrName, DebugTree, EntryId, Tag, UnitKind};
use crate::typedesc::{Modifier, TypeClass, TypeDesc};

const MAX_TYPE_REF_DEPTH: usize = 128;

/// C tag keyword required when naming a type of the given kind.
///
/// Class and typedef names are referenced bare; base types have no keyword at
/// all. Built once, process-wide.
static TAG_KEYWORD: Lazy<HashMap<Tag, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (Tag::StructureType, "struct"),
        (Tag::UnionType, "union"),
        (Tag::EnumerationType, "enum"),
    ])
});

pub(crate) fn tag_keyword(tag: Tag) -> Option<&'static str>
{
    TAG_KEYWORD.get(&tag).copied()
}

/// A named type discovered while synthesizing, keyed by its display name.
#[derive(Debug, Clone)]
pub struct TypeRef
{
    pub name: String,
    pub entry: EntryId,
}

/// The two return channels of one synthesis call.
#[derive(Debug)]
pub struct Synthesis
{
    pub desc: TypeDesc,
    pub referenced: Vec<TypeRef>,
}

/// Synthesize the type expression of `entry` (a variable, member, parameter,
/// subprogram, typedef or similar type-bearing entry).
///
/// An entry without a type reference is `void`.
pub fn synthesize(tree: &DebugTree, entry: EntryId) -> HeaderResult<Synthesis>
{
    synthesize_at(tree, entry, 0)
}

fn synthesize_at(tree: &DebugTree, entry: EntryId, depth: usize) -> HeaderResult<Synthesis>
{
    if depth > MAX_TYPE_REF_DEPTH {
        return Err(HeaderError::CyclicTypeReference {
            offset: tree.entry(entry).offset,
        });
    }

    let mut referenced = Vec::new();
    let Some(mut current) = tree.type_of(entry) else {
        return Ok(Synthesis {
            desc: TypeDesc::void(),
            referenced,
        });
    };

    // Peel the modifier prefix, innermost-first storage order.
    let mut mods: SmallVec<[Modifier; 4]> = SmallVec::new();
    let mut steps = 0usize;
    loop {
        let tag = tree.entry(current).tag;
        if !tag.is_modifier() {
            break;
        }
        steps += 1;
        if depth + steps > MAX_TYPE_REF_DEPTH {
            return Err(HeaderError::CyclicTypeReference {
                offset: tree.entry(current).offset,
            });
        }
        let modifier = match tag {
            Tag::PointerType => Some(Modifier::Pointer),
            Tag::ReferenceType | Tag::RvalueReferenceType => Some(Modifier::Reference),
            Tag::ConstType => Some(Modifier::Const),
            Tag::RestrictType => Some(Modifier::Restrict),
            // volatile/atomic wrappers have no counterpart in the modifier
            // model and peel silently
            _ => None,
        };
        if let Some(modifier) = modifier {
            mods.insert(0, modifier);
        }
        match tree.type_of(current) {
            Some(next) => current = next,
            None => {
                // A wrapper over nothing is a wrapper over void; a bare
                // pointer here is the classic void pointer.
                let mut desc = TypeDesc::void();
                desc.modifiers = mods;
                return Ok(Synthesis { desc, referenced });
            }
        }
    }

    let tag = tree.entry(current).tag;
    match tag {
        Tag::SubroutineType | Tag::PtrToMemberType => {
            synth_function(tree, current, mods, depth + steps, referenced)
        }
        Tag::ArrayType => synth_array(tree, current, mods, depth + steps, referenced),
        t if t.is_aggregate() => {
            if let Some(pfn) = member_fn_pointer_target(tree, current) {
                // Compiler convention for pointer-to-member-function: a
                // synthetic two-member structure whose first member carries
                // the real expression. The chain's own modifiers are
                // discarded.
                let mut inner = synthesize_at(tree, pfn, depth + steps + 1)?;
                if inner.desc.modifiers.last() == Some(&Modifier::Pointer) {
                    inner.desc.modifiers.pop();
                }
                inner.desc.class = TypeClass::PtrToMember;
                Ok(inner)
            } else {
                let desc = synth_named(tree, current, mods, &mut referenced);
                Ok(Synthesis { desc, referenced })
            }
        }
        _ => {
            let desc = synth_named(tree, current, mods, &mut referenced);
            Ok(Synthesis { desc, referenced })
        }
    }
}

/// The `__pfn`/`__delta` detection rule, implemented exactly as the
/// convention dictates and not generalized. Returns the `__pfn` member when
/// the structure matches.
fn member_fn_pointer_target(tree: &DebugTree, entry: EntryId) -> Option<EntryId>
{
    let members: Vec<EntryId> = tree
        .children(entry)
        .filter(|&c| tree.entry(c).tag == Tag::Member)
        .collect();
    match members.as_slice() {
        [pfn, delta]
            if tree.entry(*pfn).name() == Some("__pfn")
                && tree.entry(*delta).name() == Some("__delta") =>
        {
            Some(*pfn)
        }
        _ => None,
    }
}

fn synth_function(
    tree: &DebugTree,
    fentry: EntryId,
    mut mods: SmallVec<[Modifier; 4]>,
    depth: usize,
    mut referenced: Vec<TypeRef>,
) -> HeaderResult<Synthesis>
{
    let mut prefix = String::new();
    let mut sub = fentry;
    let mut inherent_pointer = false;

    if tree.entry(fentry).tag == Tag::PtrToMemberType {
        inherent_pointer = true;
        if let Some(class) = containing_name(tree, fentry) {
            prefix = format!("{class}::");
        }
        match tree.type_of(fentry) {
            Some(target) if tree.entry(target).tag == Tag::SubroutineType => sub = target,
            Some(_target) => {
                // Pointer to member data: `T Cls::*`.
                let inner = synthesize_at(tree, fentry, depth + 1)?;
                referenced.extend(inner.referenced);
                let base_name = format!("{} {prefix}*", inner.desc.type_text());
                let desc = TypeDesc {
                    base_name,
                    modifiers: mods,
                    class: TypeClass::PtrToMember,
                    ..TypeDesc::void()
                };
                return Ok(Synthesis { desc, referenced });
            }
            None => {
                let mut desc = TypeDesc::void();
                desc.modifiers = mods;
                return Ok(Synthesis { desc, referenced });
            }
        }
    } else if let Some(class) = object_pointer_class(tree, fentry) {
        prefix = format!("{class}::");
    }

    let ret = synthesize_at(tree, sub, depth + 1)?;
    referenced.extend(ret.referenced);

    let mut params = Vec::new();
    for child in tree.children(sub) {
        match tree.entry(child).tag {
            Tag::FormalParameter => {
                if tree.entry(child).flag(AttrName::Artificial) {
                    continue;
                }
                let p = synthesize_at(tree, child, depth + 1)?;
                referenced.extend(p.referenced);
                let name = tree.entry(child).name().unwrap_or("");
                params.push(p.desc.declare(name));
            }
            Tag::UnspecifiedParameters => params.push("...".to_string()),
            _ => {}
        }
    }
    let params = params.join(", ");
    let ret_text = ret.desc.type_text();

    let base_name = if inherent_pointer || mods.last() == Some(&Modifier::Pointer) {
        if mods.last() == Some(&Modifier::Pointer) {
            mods.pop();
        }
        format!("{ret_text} ({prefix}*)({params})")
    } else {
        format!("{ret_text} ({params})")
    };

    let class = if tree.entry(fentry).tag == Tag::PtrToMemberType {
        TypeClass::PtrToMember
    } else {
        TypeClass::Function
    };
    let desc = TypeDesc {
        base_name,
        modifiers: mods,
        class,
        ..TypeDesc::void()
    };
    Ok(Synthesis { desc, referenced })
}

fn synth_array(
    tree: &DebugTree,
    aentry: EntryId,
    mods: SmallVec<[Modifier; 4]>,
    depth: usize,
    mut referenced: Vec<TypeRef>,
) -> HeaderResult<Synthesis>
{
    let mut dims = Vec::new();
    for child in tree.children(aentry) {
        if tree.entry(child).tag != Tag::SubrangeType {
            continue;
        }
        let entry = tree.entry(child);
        let dim = entry
            .unsigned(AttrName::UpperBound)
            .map(|bound| bound + 1)
            .or_else(|| entry.unsigned(AttrName::Count));
        dims.push(dim);
    }
    if dims.is_empty() {
        dims.push(None);
    }

    // The element expression folds into the base name so element-level
    // pointers stay inside the brackets; the chain's own modifiers stay
    // outside and parenthesize against the dimension suffix.
    let element = synthesize_at(tree, aentry, depth + 1)?;
    referenced.extend(element.referenced);
    let desc = TypeDesc {
        base_name: element.desc.type_text(),
        modifiers: mods,
        dims,
        class: TypeClass::Array,
        ..TypeDesc::void()
    };
    Ok(Synthesis { desc, referenced })
}

fn synth_named(
    tree: &DebugTree,
    nentry: EntryId,
    mods: SmallVec<[Modifier; 4]>,
    referenced: &mut Vec<TypeRef>,
) -> TypeDesc
{
    let e = tree.entry(nentry);
    let class = match e.tag {
        Tag::BaseType => TypeClass::Base,
        Tag::EnumerationType => TypeClass::Enum,
        Tag::Typedef => TypeClass::Typedef,
        Tag::UnspecifiedType => TypeClass::Void,
        t if t.is_aggregate() => TypeClass::Aggregate,
        other => {
            warn!(offset = e.offset, tag = %other, "unexpected type terminal");
            TypeClass::Base
        }
    };

    let named = e.name().is_some();
    let mut desc = TypeDesc::named(name_or_anonymous(tree, nentry), tag_keyword(e.tag), class);
    desc.modifiers = mods;
    desc.scopes = scope_chain(tree, nentry);

    // Named aggregates, enums and typedefs are worth a definition of their
    // own; anonymous ones only when a type-unit signature names them.
    let registrable = matches!(
        class,
        TypeClass::Enum | TypeClass::Aggregate | TypeClass::Typedef
    );
    let unit_named = matches!(
        tree.unit(tree.owning_unit(nentry)).kind(),
        UnitKind::Type { .. }
    );
    if registrable && (named || unit_named) {
        referenced.push(TypeRef {
            name: desc.qualified_name(),
            entry: nentry,
        });
    }
    desc
}

/// The declared name, or a synthesized anonymous one: the type-unit
/// signature in hex when there is one, the entry offset otherwise.
pub(crate) fn name_or_anonymous(tree: &DebugTree, entry: EntryId) -> String
{
    if let Some(name) = tree.entry(entry).name() {
        return name.to_string();
    }
    match tree.unit(tree.owning_unit(entry)).kind() {
        UnitKind::Type { signature } => format!("Type_{signature:x}"),
        UnitKind::Compile => format!("anon_0x{:x}", tree.entry(entry).offset),
    }
}

/// Display name of a type entry: the key under which its definition is
/// emitted at most once.
pub fn display_name(tree: &DebugTree, entry: EntryId) -> String
{
    let mut desc = TypeDesc::named(
        name_or_anonymous(tree, entry),
        tag_keyword(tree.entry(entry).tag),
        TypeClass::Base,
    );
    desc.scopes = scope_chain(tree, entry);
    desc.qualified_name()
}

/// Enclosing named aggregate/namespace scopes, outermost first, stopping at
/// the first ancestor that is not a scope.
fn scope_chain(tree: &DebugTree, entry: EntryId) -> Vec<String>
{
    let mut scopes = Vec::new();
    let mut current = tree.parent(entry);
    while let Some(parent) = current {
        let e = tree.entry(parent);
        if !e.tag.is_scope() {
            break;
        }
        if let Some(name) = e.name() {
            scopes.insert(0, name.to_string());
        }
        current = tree.parent(parent);
    }
    scopes
}

fn containing_name(tree: &DebugTree, entry: EntryId) -> Option<String>
{
    let value = tree.entry(entry).attr(AttrName::ContainingType)?;
    let target = tree.resolve_ref(entry, value)?;
    tree.entry(target).name().map(str::to_string)
}

/// The class a member function belongs to, from the explicit object-pointer
/// reference or, failing that, an artificial first parameter (the legacy
/// convention).
fn object_pointer_class(tree: &DebugTree, sub: EntryId) -> Option<String>
{
    if let Some(value) = tree.entry(sub).attr(AttrName::ObjectPointer) {
        if let Some(param) = tree.resolve_ref(sub, value) {
            if let Some(name) = pointee_name(tree, param) {
                return Some(name);
            }
        }
    }
    let first = tree
        .children(sub)
        .find(|&c| tree.entry(c).tag == Tag::FormalParameter)?;
    if tree.entry(first).flag(AttrName::Artificial) {
        return pointee_name(tree, first);
    }
    None
}

/// `param -> pointer type -> pointee`, the shape of a `this` parameter.
fn pointee_name(tree: &DebugTree, param: EntryId) -> Option<String>
{
    let pointer = tree.type_of(param)?;
    let pointee = tree.type_of(pointer)?;
    tree.entry(pointee).name().map(str::to_string)
}
