//! End-to-end tests: collect, synthesize, drain, emit

use stubhdr_core::collector::{collect, SymbolDiagnostic};
use stubhdr_core::emitter::emit;
use stubhdr_core::tree::{AttrName, AttrValue, DebugTree, EntryId, Tag, UnitId, UnitKind};

fn compile_unit(tree: &mut DebugTree, source: &str) -> (UnitId, EntryId)
{
    let unit = tree.add_unit(UnitKind::Compile, 0, false);
    let root = tree.add_entry(
        unit,
        None,
        Tag::CompileUnit,
        0x0b,
        vec![(AttrName::Name, AttrValue::Str(source.into()))],
    );
    (unit, root)
}

fn base_type(tree: &mut DebugTree, unit: UnitId, root: EntryId, offset: u64, name: &str)
{
    tree.add_entry(
        unit,
        Some(root),
        Tag::BaseType,
        offset,
        vec![(AttrName::Name, AttrValue::Str(name.into()))],
    );
}

#[test]
fn test_single_function_end_to_end()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree, "a.c");
    base_type(&mut tree, unit, root, 0x10, "int");
    let add = tree.add_entry(
        unit,
        Some(root),
        Tag::Subprogram,
        0x20,
        vec![
            (AttrName::Name, AttrValue::Str("add".into())),
            (AttrName::External, AttrValue::Flag(true)),
            (AttrName::Type, AttrValue::UnitRef(0x10)),
        ],
    );
    tree.add_entry(
        unit,
        Some(add),
        Tag::FormalParameter,
        0x24,
        vec![
            (AttrName::Name, AttrValue::Str("a".into())),
            (AttrName::Type, AttrValue::UnitRef(0x10)),
        ],
    );
    tree.add_entry(
        unit,
        Some(add),
        Tag::FormalParameter,
        0x28,
        vec![
            (AttrName::Name, AttrValue::Str("b".into())),
            (AttrName::Type, AttrValue::UnitRef(0x10)),
        ],
    );
    tree.add_pub_name("add", Some(unit), 0x20);

    let collected = collect(&tree);
    let header = emit(&tree, &collected, "stubhdr", "add.o").unwrap();

    let expected = "\
// generated by  : stubhdr
// generated from: add.o
// referenced types
// global symbols
// processing public symbols in file a.c ...
extern int add (
  int a,
  int b
);
// end of header
";
    assert_eq!(header, expected);
}

#[test]
fn test_pointer_to_const_char_variable()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree, "a.c");
    base_type(&mut tree, unit, root, 0x10, "char");
    tree.add_entry(
        unit,
        Some(root),
        Tag::ConstType,
        0x18,
        vec![(AttrName::Type, AttrValue::UnitRef(0x10))],
    );
    tree.add_entry(
        unit,
        Some(root),
        Tag::PointerType,
        0x1c,
        vec![(AttrName::Type, AttrValue::UnitRef(0x18))],
    );
    tree.add_entry(
        unit,
        Some(root),
        Tag::Variable,
        0x20,
        vec![
            (AttrName::Name, AttrValue::Str("name".into())),
            (AttrName::External, AttrValue::Flag(true)),
            (AttrName::Type, AttrValue::UnitRef(0x1c)),
        ],
    );
    tree.add_pub_name("name", Some(unit), 0x20);

    let collected = collect(&tree);
    let header = emit(&tree, &collected, "stubhdr", "name.o").unwrap();
    assert!(header.contains("extern const char *name;\n"));
}

#[test]
fn test_referenced_struct_is_emitted_once()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree, "a.c");
    base_type(&mut tree, unit, root, 0x10, "int");
    let foo = tree.add_entry(
        unit,
        Some(root),
        Tag::StructureType,
        0x18,
        vec![(AttrName::Name, AttrValue::Str("Foo".into()))],
    );
    tree.add_entry(
        unit,
        Some(foo),
        Tag::Member,
        0x1a,
        vec![
            (AttrName::Name, AttrValue::Str("a".into())),
            (AttrName::Type, AttrValue::UnitRef(0x10)),
        ],
    );
    for (offset, name) in [(0x30u64, "first"), (0x38u64, "second")] {
        tree.add_entry(
            unit,
            Some(root),
            Tag::Variable,
            offset,
            vec![
                (AttrName::Name, AttrValue::Str(name.into())),
                (AttrName::External, AttrValue::Flag(true)),
                (AttrName::Type, AttrValue::UnitRef(0x18)),
            ],
        );
        tree.add_pub_name(name, Some(unit), offset);
    }

    let collected = collect(&tree);
    let header = emit(&tree, &collected, "stubhdr", "foo.o").unwrap();

    assert_eq!(header.matches("struct Foo {").count(), 1);
    assert!(header.contains("  int a;\n"));
    assert!(header.contains("extern struct Foo first;\n"));
    assert!(header.contains("extern struct Foo second;\n"));
    // Types come before globals.
    let types_at = header.find("// referenced types").unwrap();
    let body_at = header.find("struct Foo {").unwrap();
    let globals_at = header.find("// global symbols").unwrap();
    assert!(types_at < body_at && body_at < globals_at);
}

fn signature_guarded_tree() -> DebugTree
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree, "a.c");
    base_type(&mut tree, unit, root, 0x10, "int");

    let tu = tree.add_unit(
        UnitKind::Type {
            signature: 0x0102_0304_0506_0708,
        },
        0x100,
        false,
    );
    let tu_root = tree.add_entry(tu, None, Tag::TypeUnit, 0x0b, Vec::new());
    let point = tree.add_entry(
        tu,
        Some(tu_root),
        Tag::StructureType,
        0x18,
        vec![(AttrName::Name, AttrValue::Str("Point".into()))],
    );
    tree.set_type_root(tu, 0x18);
    tree.add_entry(
        tu,
        Some(tu_root),
        Tag::BaseType,
        0x40,
        vec![(AttrName::Name, AttrValue::Str("int".into()))],
    );
    tree.add_entry(
        tu,
        Some(point),
        Tag::Member,
        0x1a,
        vec![
            (AttrName::Name, AttrValue::Str("x".into())),
            (AttrName::Type, AttrValue::UnitRef(0x40)),
        ],
    );

    tree.add_entry(
        unit,
        Some(root),
        Tag::Variable,
        0x20,
        vec![
            (AttrName::Name, AttrValue::Str("origin".into())),
            (AttrName::External, AttrValue::Flag(true)),
            (
                AttrName::Type,
                AttrValue::Signature(0x0102_0304_0506_0708),
            ),
        ],
    );
    tree.add_pub_name("origin", Some(unit), 0x20);
    tree
}

#[test]
fn test_type_unit_definitions_are_signature_guarded()
{
    let tree = signature_guarded_tree();
    let collected = collect(&tree);
    let header = emit(&tree, &collected, "stubhdr", "point.o").unwrap();

    assert!(header.contains("#ifndef Type_102030405060708\n"));
    assert!(header.contains("#define Type_102030405060708\n"));
    assert!(header.contains("struct Point {\n  int x;\n};\n#endif\n"));
    assert!(header.contains("extern struct Point origin;\n"));
}

#[test]
fn test_independent_runs_share_guard_names()
{
    let first = {
        let tree = signature_guarded_tree();
        emit(&tree, &collect(&tree), "stubhdr", "one.o").unwrap()
    };
    let second = {
        let tree = signature_guarded_tree();
        emit(&tree, &collect(&tree), "stubhdr", "two.o").unwrap()
    };

    let guard = "#ifndef Type_102030405060708";
    assert!(first.contains(guard));
    assert!(second.contains(guard));
}

#[test]
fn test_non_external_symbols_are_suppressed()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree, "a.c");
    base_type(&mut tree, unit, root, 0x10, "int");
    tree.add_entry(
        unit,
        Some(root),
        Tag::Variable,
        0x20,
        vec![
            (AttrName::Name, AttrValue::Str("hidden".into())),
            (AttrName::Type, AttrValue::UnitRef(0x10)),
        ],
    );
    tree.add_pub_name("hidden", Some(unit), 0x20);

    let collected = collect(&tree);
    let header = emit(&tree, &collected, "stubhdr", "a.o").unwrap();
    assert!(!header.contains("hidden"));
}

#[test]
fn test_exported_type_index_expands_bodies_without_duplication()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree, "colors.c");
    let color = tree.add_entry(
        unit,
        Some(root),
        Tag::EnumerationType,
        0x18,
        vec![(AttrName::Name, AttrValue::Str("Color".into()))],
    );
    for (offset, name, value) in [(0x1au64, "RED", 0u64), (0x1cu64, "GREEN", 1u64)] {
        tree.add_entry(
            unit,
            Some(color),
            Tag::Enumerator,
            offset,
            vec![
                (AttrName::Name, AttrValue::Str(name.into())),
                (AttrName::ConstValue, AttrValue::Unsigned(value)),
            ],
        );
    }
    tree.add_entry(
        unit,
        Some(root),
        Tag::Variable,
        0x30,
        vec![
            (AttrName::Name, AttrValue::Str("shade".into())),
            (AttrName::External, AttrValue::Flag(true)),
            (AttrName::Type, AttrValue::UnitRef(0x18)),
        ],
    );
    tree.add_pub_name("shade", Some(unit), 0x30);
    tree.add_pub_type("Color", Some(unit), 0x18);

    let collected = collect(&tree);
    let header = emit(&tree, &collected, "stubhdr", "colors.o").unwrap();

    // The body appears exactly once, expanded from the exported-type index;
    // the variable reference does not emit it a second time.
    assert_eq!(header.matches("enum Color {").count(), 1);
    assert!(header.contains("  RED = 0,\n  GREEN = 1\n};\n"));
    assert!(header.contains("extern enum Color shade;\n"));
}

#[test]
fn test_mismatched_index_row_does_not_fail_the_run()
{
    let mut tree = DebugTree::new();
    let (unit, root) = compile_unit(&mut tree, "a.c");
    base_type(&mut tree, unit, root, 0x10, "int");
    tree.add_entry(
        unit,
        Some(root),
        Tag::Variable,
        0x20,
        vec![
            (AttrName::Name, AttrValue::Str("count".into())),
            (AttrName::External, AttrValue::Flag(true)),
            (AttrName::Type, AttrValue::UnitRef(0x10)),
        ],
    );
    tree.add_pub_name("tally", Some(unit), 0x20);
    tree.add_pub_name("count", Some(unit), 0x20);

    let collected = collect(&tree);
    assert_eq!(collected.symbols.len(), 1);
    assert!(matches!(
        collected.diagnostics[0],
        SymbolDiagnostic::NameMismatch { .. }
    ));

    let header = emit(&tree, &collected, "stubhdr", "a.o").unwrap();
    assert!(header.contains("extern int count;\n"));
}
