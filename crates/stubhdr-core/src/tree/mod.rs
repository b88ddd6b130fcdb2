//! Owned debug-entry tree: the navigable data model every component consumes.
//!
//! The tree is deliberately decoupled from any particular debug-info reader.
//! [`loader`] fills it from the DWARF sections of a binary; tests fill it
//! through the same public construction API with hand-built entries. Entries
//! are arena-allocated per unit and addressed by [`EntryId`], so parent and
//! child links are plain indices and the whole structure is read-only once
//! built.

use std::collections::HashMap;
use std::fmt;

pub mod loader;

/// Entry kind classifier.
///
/// A closed enum over the entry kinds the engine understands, with an
/// [`Tag::Other`] escape hatch for vendor extensions. Components match on it
/// exhaustively; there is no string- or table-driven dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag
{
    CompileUnit,
    TypeUnit,
    PartialUnit,
    Variable,
    Member,
    FormalParameter,
    UnspecifiedParameters,
    Subprogram,
    SubroutineType,
    StructureType,
    ClassType,
    UnionType,
    EnumerationType,
    Enumerator,
    Typedef,
    BaseType,
    PointerType,
    ReferenceType,
    RvalueReferenceType,
    ConstType,
    VolatileType,
    RestrictType,
    AtomicType,
    ArrayType,
    SubrangeType,
    PtrToMemberType,
    Namespace,
    Inheritance,
    TemplateTypeParameter,
    TemplateValueParameter,
    ImportedDeclaration,
    ImportedModule,
    UnspecifiedType,
    LexicalBlock,
    InlinedSubroutine,
    Label,
    VariantPart,
    Variant,
    Friend,
    AccessDeclaration,
    /// Vendor or otherwise unhandled kind, with the raw tag value.
    Other(u16),
}

impl Tag
{
    /// Type wrappers that sit between a declaration and its underlying type.
    pub fn is_modifier(self) -> bool
    {
        matches!(
            self,
            Tag::PointerType
                | Tag::ReferenceType
                | Tag::RvalueReferenceType
                | Tag::ConstType
                | Tag::VolatileType
                | Tag::RestrictType
                | Tag::AtomicType
        )
    }

    pub fn is_aggregate(self) -> bool
    {
        matches!(self, Tag::StructureType | Tag::ClassType | Tag::UnionType)
    }

    /// Ancestors of these kinds contribute to a type's scope chain.
    pub fn is_scope(self) -> bool
    {
        self.is_aggregate() || self == Tag::Namespace
    }

    /// Entry kinds that only appear when the input carries executable bodies,
    /// violating the stub rule.
    pub fn is_disallowed(self) -> bool
    {
        matches!(self, Tag::LexicalBlock | Tag::InlinedSubroutine)
    }
}

impl fmt::Display for Tag
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            Tag::CompileUnit => "compile_unit",
            Tag::TypeUnit => "type_unit",
            Tag::PartialUnit => "partial_unit",
            Tag::Variable => "variable",
            Tag::Member => "member",
            Tag::FormalParameter => "formal_parameter",
            Tag::UnspecifiedParameters => "unspecified_parameters",
            Tag::Subprogram => "subprogram",
            Tag::SubroutineType => "subroutine_type",
            Tag::StructureType => "structure_type",
            Tag::ClassType => "class_type",
            Tag::UnionType => "union_type",
            Tag::EnumerationType => "enumeration_type",
            Tag::Enumerator => "enumerator",
            Tag::Typedef => "typedef",
            Tag::BaseType => "base_type",
            Tag::PointerType => "pointer_type",
            Tag::ReferenceType => "reference_type",
            Tag::RvalueReferenceType => "rvalue_reference_type",
            Tag::ConstType => "const_type",
            Tag::VolatileType => "volatile_type",
            Tag::RestrictType => "restrict_type",
            Tag::AtomicType => "atomic_type",
            Tag::ArrayType => "array_type",
            Tag::SubrangeType => "subrange_type",
            Tag::PtrToMemberType => "ptr_to_member_type",
            Tag::Namespace => "namespace",
            Tag::Inheritance => "inheritance",
            Tag::TemplateTypeParameter => "template_type_parameter",
            Tag::TemplateValueParameter => "template_value_parameter",
            Tag::ImportedDeclaration => "imported_declaration",
            Tag::ImportedModule => "imported_module",
            Tag::UnspecifiedType => "unspecified_type",
            Tag::LexicalBlock => "lexical_block",
            Tag::InlinedSubroutine => "inlined_subroutine",
            Tag::Label => "label",
            Tag::VariantPart => "variant_part",
            Tag::Variant => "variant",
            Tag::Friend => "friend",
            Tag::AccessDeclaration => "access_declaration",
            Tag::Other(raw) => return write!(f, "unknown_tag_0x{raw:04x}"),
        };
        f.write_str(name)
    }
}

/// Attribute name, a closed enum with an escape hatch like [`Tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrName
{
    Name,
    Type,
    External,
    Declaration,
    LowerBound,
    UpperBound,
    Count,
    ConstValue,
    Producer,
    CompDir,
    DeclFile,
    DeclLine,
    ByteSize,
    BitSize,
    Encoding,
    ContainingType,
    ObjectPointer,
    Artificial,
    Prototyped,
    DataMemberLocation,
    Language,
    Other(u16),
}

impl fmt::Display for AttrName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            AttrName::Name => "name",
            AttrName::Type => "type",
            AttrName::External => "external",
            AttrName::Declaration => "declaration",
            AttrName::LowerBound => "lower_bound",
            AttrName::UpperBound => "upper_bound",
            AttrName::Count => "count",
            AttrName::ConstValue => "const_value",
            AttrName::Producer => "producer",
            AttrName::CompDir => "comp_dir",
            AttrName::DeclFile => "decl_file",
            AttrName::DeclLine => "decl_line",
            AttrName::ByteSize => "byte_size",
            AttrName::BitSize => "bit_size",
            AttrName::Encoding => "encoding",
            AttrName::ContainingType => "containing_type",
            AttrName::ObjectPointer => "object_pointer",
            AttrName::Artificial => "artificial",
            AttrName::Prototyped => "prototyped",
            AttrName::DataMemberLocation => "data_member_location",
            AttrName::Language => "language",
            AttrName::Other(raw) => return write!(f, "unknown_attr_0x{raw:04x}"),
        };
        f.write_str(name)
    }
}

/// Attribute value, already classified into its semantic bucket.
///
/// Raw encoding forms are classified exactly once, by the provider backend.
/// Forms without a bucket of their own degrade to [`AttrValue::Unsigned`]
/// (decimal display) there, so consumers never see an unknown form.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue
{
    /// Plain unsigned constant, displayed in decimal.
    Unsigned(u64),
    /// Signed constant, displayed in decimal.
    Signed(i64),
    /// Boolean flag.
    Flag(bool),
    /// Machine address, displayed as fixed-width hex.
    Address(u64),
    /// Cross reference, relative to the owning unit.
    UnitRef(u64),
    /// Cross reference, relative to the whole debug-info section.
    SectionRef(u64),
    /// 8-byte type signature referencing a type unit.
    Signature(u64),
    /// String value.
    Str(String),
    /// Uninterpreted byte block.
    Block(Vec<u8>),
}

/// Identifies a unit within a [`DebugTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(usize);

/// Identifies an entry within a [`DebugTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId
{
    unit: usize,
    index: usize,
}

/// The translation-unit-like boundary a unit represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind
{
    Compile,
    /// A type unit, carrying its deduplication signature.
    Type
    {
        signature: u64,
    },
}

/// One debug-tree node.
#[derive(Debug)]
pub struct Entry
{
    pub tag: Tag,
    /// Unit-relative offset, unique within the owning unit.
    pub offset: u64,
    attrs: Vec<(AttrName, AttrValue)>,
    children: Vec<usize>,
    parent: Option<usize>,
}

impl Entry
{
    /// Look up an attribute by name.
    pub fn attr(&self, name: AttrName) -> Option<&AttrValue>
    {
        self.attrs.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// All attributes, in the order they were recorded.
    pub fn attrs(&self) -> impl Iterator<Item = &(AttrName, AttrValue)>
    {
        self.attrs.iter()
    }

    /// The declared name, when present as a string attribute.
    pub fn name(&self) -> Option<&str>
    {
        match self.attr(AttrName::Name) {
            Some(AttrValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True when the named flag attribute is present and set.
    pub fn flag(&self, name: AttrName) -> bool
    {
        matches!(self.attr(name), Some(AttrValue::Flag(true)))
    }

    /// The named attribute as an unsigned constant, when it is one.
    pub fn unsigned(&self, name: AttrName) -> Option<u64>
    {
        match self.attr(name) {
            Some(AttrValue::Unsigned(v)) => Some(*v),
            Some(AttrValue::Signed(v)) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }
}

/// A compile unit or type unit: one entry arena plus lookup tables.
#[derive(Debug)]
pub struct Unit
{
    kind: UnitKind,
    /// Offset of the unit header within its section, for resolving
    /// section-relative references.
    section_offset: u64,
    /// Whether the unit lives in the separate types section (pre-v5 layout).
    types_section: bool,
    /// Unit-relative offset of the type-unit's primary type entry.
    type_root: Option<u64>,
    entries: Vec<Entry>,
    by_offset: HashMap<u64, usize>,
    /// Declaration-file index to source path, resolved from the line program.
    files: HashMap<u64, String>,
}

impl Unit
{
    pub fn kind(&self) -> UnitKind
    {
        self.kind
    }

    pub fn section_offset(&self) -> u64
    {
        self.section_offset
    }

    /// Resolve a declaration-file index to its source path.
    pub fn file_name(&self, index: u64) -> Option<&str>
    {
        self.files.get(&index).map(String::as_str)
    }
}

/// One row of the exported-name or exported-type index.
#[derive(Debug, Clone)]
pub struct IndexedSymbol
{
    pub name: String,
    /// The owning unit, when the index row's unit offset matched one.
    pub unit: Option<UnitId>,
    /// Unit-relative offset of the entry the row claims to describe.
    pub die_offset: u64,
}

/// The whole parsed debug-information tree of one input.
///
/// Read-only after construction; built either by [`loader`] or directly by
/// any other provider (tests build small trees by hand).
#[derive(Debug, Default)]
pub struct DebugTree
{
    units: Vec<Unit>,
    pub_names: Vec<IndexedSymbol>,
    pub_types: Vec<IndexedSymbol>,
}

impl DebugTree
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append a unit. `section_offset` is the unit header's position within
    /// its section; `types_section` marks units from the pre-v5 separate
    /// types section.
    pub fn add_unit(&mut self, kind: UnitKind, section_offset: u64, types_section: bool) -> UnitId
    {
        self.units.push(Unit {
            kind,
            section_offset,
            types_section,
            type_root: None,
            entries: Vec::new(),
            by_offset: HashMap::new(),
            files: HashMap::new(),
        });
        UnitId(self.units.len() - 1)
    }

    /// Record the unit-relative offset of a type unit's primary type entry.
    pub fn set_type_root(&mut self, unit: UnitId, offset: u64)
    {
        self.units[unit.0].type_root = Some(offset);
    }

    /// Record one declaration-file index to source path mapping.
    pub fn add_unit_file(&mut self, unit: UnitId, index: u64, path: String)
    {
        self.units[unit.0].files.insert(index, path);
    }

    /// Append an entry to a unit. The first entry added to a unit becomes its
    /// root; children are linked to their parent in insertion order.
    pub fn add_entry(
        &mut self,
        unit: UnitId,
        parent: Option<EntryId>,
        tag: Tag,
        offset: u64,
        attrs: Vec<(AttrName, AttrValue)>,
    ) -> EntryId
    {
        let u = &mut self.units[unit.0];
        let index = u.entries.len();
        u.entries.push(Entry {
            tag,
            offset,
            attrs,
            children: Vec::new(),
            parent: parent.map(|p| p.index),
        });
        u.by_offset.insert(offset, index);
        if let Some(p) = parent {
            debug_assert_eq!(p.unit, unit.0, "parent links never cross units");
            u.entries[p.index].children.push(index);
        }
        EntryId { unit: unit.0, index }
    }

    /// Append a row to the exported-name index.
    pub fn add_pub_name(&mut self, name: impl Into<String>, unit: Option<UnitId>, die_offset: u64)
    {
        self.pub_names.push(IndexedSymbol {
            name: name.into(),
            unit,
            die_offset,
        });
    }

    /// Append a row to the exported-type index.
    pub fn add_pub_type(&mut self, name: impl Into<String>, unit: Option<UnitId>, die_offset: u64)
    {
        self.pub_types.push(IndexedSymbol {
            name: name.into(),
            unit,
            die_offset,
        });
    }

    pub fn units(&self) -> impl Iterator<Item = UnitId>
    {
        (0..self.units.len()).map(UnitId)
    }

    pub fn unit(&self, id: UnitId) -> &Unit
    {
        &self.units[id.0]
    }

    pub fn entry(&self, id: EntryId) -> &Entry
    {
        &self.units[id.unit].entries[id.index]
    }

    pub fn owning_unit(&self, id: EntryId) -> UnitId
    {
        UnitId(id.unit)
    }

    /// The root entry of a unit, if the unit has any entries.
    pub fn root(&self, unit: UnitId) -> Option<EntryId>
    {
        if self.units[unit.0].entries.is_empty() {
            None
        } else {
            Some(EntryId { unit: unit.0, index: 0 })
        }
    }

    pub fn children(&self, id: EntryId) -> impl Iterator<Item = EntryId> + '_
    {
        self.units[id.unit].entries[id.index]
            .children
            .iter()
            .map(move |&index| EntryId { unit: id.unit, index })
    }

    pub fn parent(&self, id: EntryId) -> Option<EntryId>
    {
        self.units[id.unit].entries[id.index]
            .parent
            .map(|index| EntryId { unit: id.unit, index })
    }

    /// Find an entry by its unit-relative offset.
    pub fn entry_at(&self, unit: UnitId, offset: u64) -> Option<EntryId>
    {
        self.units[unit.0]
            .by_offset
            .get(&offset)
            .map(|&index| EntryId { unit: unit.0, index })
    }

    /// Find the unit whose header sits at `section_offset`.
    pub fn unit_by_section_offset(&self, section_offset: u64, types_section: bool) -> Option<UnitId>
    {
        self.units
            .iter()
            .position(|u| u.section_offset == section_offset && u.types_section == types_section)
            .map(UnitId)
    }

    /// Resolve a cross reference held by `from` to the entry it points at.
    ///
    /// Unit-relative references resolve within the owner's unit;
    /// section-relative references locate the containing unit first;
    /// signatures resolve through the type-unit index. Anything else is not a
    /// reference and yields `None`.
    pub fn resolve_ref(&self, from: EntryId, value: &AttrValue) -> Option<EntryId>
    {
        match value {
            AttrValue::UnitRef(offset) => self.entry_at(UnitId(from.unit), *offset),
            AttrValue::SectionRef(offset) => {
                let (uid, unit) = self
                    .units
                    .iter()
                    .enumerate()
                    .filter(|(_, u)| !u.types_section && u.section_offset <= *offset)
                    .max_by_key(|(_, u)| u.section_offset)?;
                unit.by_offset
                    .get(&(offset - unit.section_offset))
                    .map(|&index| EntryId { unit: uid, index })
            }
            AttrValue::Signature(sig) => self.resolve_signature(*sig),
            _ => None,
        }
    }

    /// Resolve a type signature to the defining entry of its type unit.
    pub fn resolve_signature(&self, signature: u64) -> Option<EntryId>
    {
        let (uid, unit) = self
            .units
            .iter()
            .enumerate()
            .find(|(_, u)| matches!(u.kind, UnitKind::Type { signature: s } if s == signature))?;
        if let Some(offset) = unit.type_root {
            if let Some(&index) = unit.by_offset.get(&offset) {
                return Some(EntryId { unit: uid, index });
            }
        }
        // No recorded type root: take the first defining entry in tree order.
        unit.entries
            .iter()
            .position(|e| {
                e.tag.is_aggregate() || matches!(e.tag, Tag::EnumerationType | Tag::Typedef)
            })
            .map(|index| EntryId { unit: uid, index })
    }

    /// Follow an entry's type-reference attribute, if it has one that
    /// resolves.
    pub fn type_of(&self, id: EntryId) -> Option<EntryId>
    {
        let value = self.entry(id).attr(AttrName::Type)?;
        let target = self.resolve_ref(id, value);
        if target.is_none() {
            tracing::warn!(
                offset = self.entry(id).offset,
                "dangling type reference {:?}",
                value
            );
        }
        target
    }

    pub fn pub_names(&self) -> &[IndexedSymbol]
    {
        &self.pub_names
    }

    pub fn pub_types(&self) -> &[IndexedSymbol]
    {
        &self.pub_types
    }
}
