//! Tests for declarator synthesis

use stubhdr_core::declarator::synthesize;
use stubhdr_core::error::HeaderError;
use stubhdr_core::tree::{AttrName, AttrValue, DebugTree, EntryId, Tag, UnitId, UnitKind};

fn compile_unit(tree: &mut DebugTree) -> (UnitId, EntryId)
{
    let unit = tree.add_unit(UnitKind::Compile, 0, false);
    let root = tree.add_entry(
        unit,
        None,
        Tag::CompileUnit,
        0x0b,
        vec![(AttrName::Name, AttrValue::Str("test.c".into()))],
    );
    (unit, root)
}

fn named_entry(
    tree: &mut DebugTree,
    unit: UnitId,
    parent: EntryId,
    tag: Tag,
    offset: u64,
    name: &str,
) -> EntryId
{
    tree.add_entry(
        unit,
        Some(parent),
        tag,
        offset,
        vec![(AttrName::Name, AttrValue::Str(name.into()))],
    )
}

fn typed_entry(
    tree: &mut DebugTree,
    unit: UnitId,
    parent: EntryId,
    tag: Tag,
    offset: u64,
    target: u64,
) -> EntryId
{
    tree.add_entry(
        unit,
        Some(parent),
        tag,
        offset,
        vec![(AttrName::Type, AttrValue::UnitRef(target))],
    )
}

#[test]
fn test_plain_int_variable()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::BaseType, 0x10, "int");
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x10);

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("count"), "int count");
    assert!(s.referenced.is_empty());
}

#[test]
fn test_missing_type_reference_is_void()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    let var = tree.add_entry(unit, Some(root), Tag::Variable, 0x20, Vec::new());

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("x"), "void x");
}

#[test]
fn test_pointer_to_void_stops_immediately()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    tree.add_entry(unit, Some(root), Tag::PointerType, 0x10, Vec::new());
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x10);

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("p"), "void *p");
}

#[test]
fn test_pointer_to_named_struct()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::StructureType, 0x10, "Foo");
    typed_entry(&mut tree, unit, root, Tag::PointerType, 0x18, 0x10);
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x18);

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("name"), "struct Foo *name");
    assert_eq!(s.referenced.len(), 1);
    assert_eq!(s.referenced[0].name, "struct Foo");
}

#[test]
fn test_const_pointer_versus_pointer_to_const()
{
    // const pointer: variable -> const -> pointer -> Foo (a class, bare name)
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::ClassType, 0x10, "Foo");
    typed_entry(&mut tree, unit, root, Tag::PointerType, 0x18, 0x10);
    typed_entry(&mut tree, unit, root, Tag::ConstType, 0x1c, 0x18);
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x1c);
    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("name"), "Foo *const name");

    // pointer to const: variable -> pointer -> const -> char
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::BaseType, 0x10, "char");
    typed_entry(&mut tree, unit, root, Tag::ConstType, 0x18, 0x10);
    typed_entry(&mut tree, unit, root, Tag::PointerType, 0x1c, 0x18);
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x1c);
    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("name"), "const char *name");
}

#[test]
fn test_array_of_pointers_and_pointer_to_array()
{
    // int *name[10]
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::BaseType, 0x10, "int");
    typed_entry(&mut tree, unit, root, Tag::PointerType, 0x18, 0x10);
    let array = typed_entry(&mut tree, unit, root, Tag::ArrayType, 0x1c, 0x18);
    tree.add_entry(
        unit,
        Some(array),
        Tag::SubrangeType,
        0x1e,
        vec![(AttrName::UpperBound, AttrValue::Unsigned(9))],
    );
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x1c);
    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("name"), "int *name[10]");

    // int (*name)[10]
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::BaseType, 0x10, "int");
    let array = typed_entry(&mut tree, unit, root, Tag::ArrayType, 0x18, 0x10);
    tree.add_entry(
        unit,
        Some(array),
        Tag::SubrangeType,
        0x1a,
        vec![(AttrName::Count, AttrValue::Unsigned(10))],
    );
    typed_entry(&mut tree, unit, root, Tag::PointerType, 0x1c, 0x18);
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x1c);
    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("name"), "int (*name)[10]");
}

#[test]
fn test_subrange_without_bound_is_unknown_dimension()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::BaseType, 0x10, "char");
    let array = typed_entry(&mut tree, unit, root, Tag::ArrayType, 0x18, 0x10);
    tree.add_entry(unit, Some(array), Tag::SubrangeType, 0x1a, Vec::new());
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x18);

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("buf"), "char buf[]");
}

#[test]
fn test_function_pointer_with_object_pointer_prefix()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::BaseType, 0x10, "int");
    named_entry(&mut tree, unit, root, Tag::ClassType, 0x14, "C");
    typed_entry(&mut tree, unit, root, Tag::PointerType, 0x16, 0x14);

    let sub = tree.add_entry(
        unit,
        Some(root),
        Tag::SubroutineType,
        0x30,
        vec![
            (AttrName::Type, AttrValue::UnitRef(0x10)),
            (AttrName::ObjectPointer, AttrValue::UnitRef(0x32)),
        ],
    );
    tree.add_entry(
        unit,
        Some(sub),
        Tag::FormalParameter,
        0x32,
        vec![
            (AttrName::Type, AttrValue::UnitRef(0x16)),
            (AttrName::Artificial, AttrValue::Flag(true)),
        ],
    );
    tree.add_entry(
        unit,
        Some(sub),
        Tag::FormalParameter,
        0x36,
        vec![
            (AttrName::Name, AttrValue::Str("b".into())),
            (AttrName::Type, AttrValue::UnitRef(0x10)),
        ],
    );
    typed_entry(&mut tree, unit, root, Tag::PointerType, 0x40, 0x30);
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x44, 0x40);

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("mp"), "int (C::*)(int b) mp");
}

#[test]
fn test_member_fn_pointer_convention_is_rewritten()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::BaseType, 0x10, "int");
    named_entry(&mut tree, unit, root, Tag::ClassType, 0x14, "C");
    typed_entry(&mut tree, unit, root, Tag::PointerType, 0x16, 0x14);

    let sub = tree.add_entry(
        unit,
        Some(root),
        Tag::SubroutineType,
        0x30,
        vec![(AttrName::Type, AttrValue::UnitRef(0x10))],
    );
    tree.add_entry(
        unit,
        Some(sub),
        Tag::FormalParameter,
        0x32,
        vec![
            (AttrName::Type, AttrValue::UnitRef(0x16)),
            (AttrName::Artificial, AttrValue::Flag(true)),
        ],
    );
    typed_entry(&mut tree, unit, root, Tag::PointerType, 0x40, 0x30);

    // The synthetic two-member structure.
    let holder = tree.add_entry(unit, Some(root), Tag::StructureType, 0x50, Vec::new());
    tree.add_entry(
        unit,
        Some(holder),
        Tag::Member,
        0x52,
        vec![
            (AttrName::Name, AttrValue::Str("__pfn".into())),
            (AttrName::Type, AttrValue::UnitRef(0x40)),
        ],
    );
    tree.add_entry(
        unit,
        Some(holder),
        Tag::Member,
        0x56,
        vec![
            (AttrName::Name, AttrValue::Str("__delta".into())),
            (AttrName::Type, AttrValue::UnitRef(0x10)),
        ],
    );
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x60, 0x50);

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("mp"), "int (C::*)() mp");
}

#[test]
fn test_nested_type_carries_scope_chain()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    let outer = named_entry(&mut tree, unit, root, Tag::StructureType, 0x10, "Outer");
    named_entry(&mut tree, unit, outer, Tag::StructureType, 0x14, "Inner");
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x14);

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("x"), "struct Outer::Inner x");
    assert_eq!(s.referenced[0].name, "struct Outer::Inner");
}

#[test]
fn test_base_types_are_not_registered()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::BaseType, 0x10, "double");
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x10);

    let s = synthesize(&tree, var).unwrap();
    assert!(s.referenced.is_empty());
}

#[test]
fn test_anonymous_aggregate_in_compile_unit_is_not_registered()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    tree.add_entry(unit, Some(root), Tag::UnionType, 0x10, Vec::new());
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x10);

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("u"), "union anon_0x10 u");
    assert!(s.referenced.is_empty());
}

#[test]
fn test_cyclic_modifier_chain_fails_instead_of_hanging()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    // A const wrapper that names itself as its own target.
    typed_entry(&mut tree, unit, root, Tag::ConstType, 0x10, 0x10);
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x10);

    match synthesize(&tree, var) {
        Err(HeaderError::CyclicTypeReference { .. }) => {}
        other => panic!("expected CyclicTypeReference, got {other:?}"),
    }
}

#[test]
fn test_typedef_reference_registers_the_typedef()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree);
    named_entry(&mut tree, unit, root, Tag::BaseType, 0x10, "unsigned long");
    let td = tree.add_entry(
        unit,
        Some(root),
        Tag::Typedef,
        0x18,
        vec![
            (AttrName::Name, AttrValue::Str("size_t".into())),
            (AttrName::Type, AttrValue::UnitRef(0x10)),
        ],
    );
    let var = typed_entry(&mut tree, unit, root, Tag::Variable, 0x20, 0x18);

    let s = synthesize(&tree, var).unwrap();
    assert_eq!(s.desc.declare("n"), "size_t n");
    assert_eq!(s.referenced.len(), 1);
    assert_eq!(s.referenced[0].name, "size_t");
    assert_eq!(s.referenced[0].entry, td);
}
