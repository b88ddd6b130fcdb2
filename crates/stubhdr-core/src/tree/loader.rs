//! Default provider backend: fills a [`DebugTree`] from the DWARF sections
//! of an object, archive or shared-object file.
//!
//! Container parsing goes through `object`, DWARF decoding through `gimli`.
//! Raw attribute values are classified into the tree's semantic buckets here,
//! exactly once; unknown encoding forms degrade to the decimal bucket and
//! never fail.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gimli::{
    constants, AttributeValue, DebugPubNames, DebugPubTypes, DwAt, DwTag, Dwarf, EndianArcSlice,
    Reader, RunTimeEndian, SectionId, Unit as DwarfUnit, UnitSectionOffset, UnitType,
};
use object::{Object, ObjectSection};
use tracing::{debug, warn};

use super::{AttrName, AttrValue, DebugTree, EntryId, Tag, UnitKind};
use crate::error::{HeaderError, HeaderResult};

type OwnedReader = EndianArcSlice<RunTimeEndian>;
type OwnedDwarf = Dwarf<OwnedReader>;

/// What to do when an entry kind violates the stub rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubPolicy
{
    /// Fail the whole load (the default).
    Strict,
    /// Skip the offending subtree with a warning.
    Lenient,
}

/// One loaded input: a whole file, or one member of an archive.
#[derive(Debug)]
pub struct LoadedInput
{
    /// Archive member name, `None` for a plain object file.
    pub member: Option<String>,
    pub tree: DebugTree,
}

/// Load a stub binary from disk.
pub fn load_path(path: &Path, policy: StubPolicy) -> HeaderResult<Vec<LoadedInput>>
{
    let bytes = fs::read(path)?;
    load_bytes(&bytes, policy)
}

/// Load a stub binary from a byte buffer. Archives unpack into one
/// [`LoadedInput`] per member.
pub fn load_bytes(data: &[u8], policy: StubPolicy) -> HeaderResult<Vec<LoadedInput>>
{
    if let Ok(archive) = object::read::archive::ArchiveFile::parse(data) {
        let mut out = Vec::new();
        for member in archive.members() {
            let member = member
                .map_err(|err| HeaderError::InvalidInput(format!("bad archive member: {err}")))?;
            let name = String::from_utf8_lossy(member.name()).into_owned();
            let member_data = member.data(data).map_err(|err| {
                HeaderError::InvalidInput(format!("unreadable archive member {name}: {err}"))
            })?;
            debug!(member = %name, "loading archive member");
            out.push(LoadedInput {
                member: Some(name),
                tree: load_object(member_data, policy)?,
            });
        }
        if out.is_empty() {
            return Err(HeaderError::NoDebugInfo);
        }
        return Ok(out);
    }

    Ok(vec![LoadedInput {
        member: None,
        tree: load_object(data, policy)?,
    }])
}

/// Section-name aliases per platform object format.
const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
    (".debug_types", &[".debug_types", "__debug_types"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
    (".debug_pubnames", &[".debug_pubnames", "__debug_pubnames"]),
    (".debug_pubtypes", &[".debug_pubtypes", "__debug_pubtypes"]),
    (".debug_frame", &[".debug_frame", "__debug_frame"]),
    (".debug_macro", &[".debug_macro", "__debug_macro"]),
    (".debug_cu_index", &[".debug_cu_index"]),
    (".debug_tu_index", &[".debug_tu_index"]),
];

fn load_object(data: &[u8], policy: StubPolicy) -> HeaderResult<DebugTree>
{
    let file = object::File::parse(data)
        .map_err(|err| HeaderError::InvalidInput(format!("failed to parse input: {err}")))?;

    let endian = if file.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };

    let mut sections: HashMap<&'static str, Arc<[u8]>> = HashMap::new();
    for (canonical, aliases) in DWARF_SECTIONS {
        sections.insert(*canonical, load_section_bytes(&file, aliases)?);
    }

    if sections[".debug_info"].is_empty() {
        return Err(HeaderError::NoDebugInfo);
    }

    let dwarf = Dwarf::load(|id| {
        Ok::<_, gimli::Error>(section_reader(&sections, endian, id))
    })?;

    let mut tree = DebugTree::new();

    let mut headers = dwarf.units();
    while let Some(header) = headers.next()? {
        let unit = dwarf.unit(header)?;
        convert_unit(&dwarf, &unit, false, &mut tree, policy)?;
    }
    let mut type_headers = dwarf.type_units();
    while let Some(header) = type_headers.next()? {
        let unit = dwarf.unit(header)?;
        convert_unit(&dwarf, &unit, true, &mut tree, policy)?;
    }

    load_pub_tables(&sections, endian, &mut tree)?;
    Ok(tree)
}

fn load_section_bytes<'data>(
    file: &object::File<'data>,
    names: &[&str],
) -> HeaderResult<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section
                .uncompressed_data()
                .map_err(|err| HeaderError::InvalidInput(format!("failed to read {name}: {err}")))?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }
    Ok(Arc::<[u8]>::from(Vec::new()))
}

fn section_reader(
    sections: &HashMap<&'static str, Arc<[u8]>>,
    endian: RunTimeEndian,
    id: SectionId,
) -> OwnedReader
{
    let data = sections
        .get(id.name())
        .cloned()
        .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
    EndianArcSlice::new(data, endian)
}

fn convert_unit(
    dwarf: &OwnedDwarf,
    unit: &DwarfUnit<OwnedReader>,
    types_section: bool,
    tree: &mut DebugTree,
    policy: StubPolicy,
) -> HeaderResult<()>
{
    let (kind, type_root) = match unit.header.type_() {
        UnitType::Type {
            type_signature,
            type_offset,
        }
        | UnitType::SplitType {
            type_signature,
            type_offset,
        } => (
            UnitKind::Type {
                signature: type_signature.0,
            },
            Some(type_offset.0 as u64),
        ),
        _ => (UnitKind::Compile, None),
    };
    let section_offset = match unit.header.offset() {
        UnitSectionOffset::DebugInfoOffset(offset) => offset.0 as u64,
        UnitSectionOffset::DebugTypesOffset(offset) => offset.0 as u64,
    };

    let uid = tree.add_unit(kind, section_offset, types_section);
    if let Some(offset) = type_root {
        tree.set_type_root(uid, offset);
    }
    for (index, path) in resolve_file_table(dwarf, unit) {
        tree.add_unit_file(uid, index, path);
    }

    let mut stack: Vec<EntryId> = Vec::new();
    let mut depth: isize = 0;
    let mut skip_below: Option<usize> = None;
    let mut cursor = unit.entries();
    while let Some((delta, die)) = cursor.next_dfs()? {
        depth += delta;
        let d = usize::try_from(depth).unwrap_or(0);
        stack.truncate(d);
        if let Some(limit) = skip_below {
            if d > limit {
                continue;
            }
            skip_below = None;
        }

        let tag = convert_tag(die.tag());
        if tag.is_disallowed() {
            match policy {
                StubPolicy::Strict => return Err(HeaderError::DisallowedEntryKind { tag }),
                StubPolicy::Lenient => {
                    warn!(offset = die.offset().0 as u64, %tag, "skipping non-stub entry");
                    skip_below = Some(d);
                    continue;
                }
            }
        }

        let attrs = convert_attrs(dwarf, unit, die)?;
        let parent = stack.last().copied();
        let id = tree.add_entry(uid, parent, tag, die.offset().0 as u64, attrs);
        stack.push(id);
    }

    Ok(())
}

fn convert_attrs(
    dwarf: &OwnedDwarf,
    unit: &DwarfUnit<OwnedReader>,
    die: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>,
) -> HeaderResult<Vec<(AttrName, AttrValue)>>
{
    let mut out = Vec::new();
    let mut attrs = die.attrs();
    while let Some(attr) = attrs.next()? {
        let name = convert_attr_name(attr.name());
        let value = convert_attr_value(dwarf, unit, attr.value())?;
        out.push((name, value));
    }
    Ok(out)
}

/// Classify one raw attribute value into its semantic bucket.
fn convert_attr_value(
    dwarf: &OwnedDwarf,
    unit: &DwarfUnit<OwnedReader>,
    value: AttributeValue<OwnedReader>,
) -> HeaderResult<AttrValue>
{
    Ok(match value {
        AttributeValue::Addr(v) => AttrValue::Address(v),
        AttributeValue::Udata(v) => AttrValue::Unsigned(v),
        AttributeValue::Data1(v) => AttrValue::Unsigned(u64::from(v)),
        AttributeValue::Data2(v) => AttrValue::Unsigned(u64::from(v)),
        AttributeValue::Data4(v) => AttrValue::Unsigned(u64::from(v)),
        AttributeValue::Data8(v) => AttrValue::Unsigned(v),
        AttributeValue::Sdata(v) => AttrValue::Signed(v),
        AttributeValue::Flag(v) => AttrValue::Flag(v),
        AttributeValue::FileIndex(v) => AttrValue::Unsigned(v),
        AttributeValue::UnitRef(offset) => AttrValue::UnitRef(offset.0 as u64),
        AttributeValue::DebugInfoRef(offset) => AttrValue::SectionRef(offset.0 as u64),
        AttributeValue::DebugTypesRef(signature) => AttrValue::Signature(signature.0),
        AttributeValue::Encoding(e) => AttrValue::Unsigned(u64::from(e.0)),
        AttributeValue::Language(l) => AttrValue::Unsigned(u64::from(l.0)),
        AttributeValue::Exprloc(ref expression) => {
            AttrValue::Block(expression.0.to_slice()?.to_vec())
        }
        AttributeValue::Block(ref block) => AttrValue::Block(block.to_slice()?.to_vec()),
        value @ (AttributeValue::String(_)
        | AttributeValue::DebugStrRef(_)
        | AttributeValue::DebugStrOffsetsIndex(_)
        | AttributeValue::DebugLineStrRef(_)) => {
            let reader = dwarf.attr_string(unit, value)?;
            AttrValue::Str(reader.to_string_lossy()?.into_owned())
        }
        // Everything else degrades to the decimal bucket.
        other => match other.udata_value() {
            Some(v) => AttrValue::Unsigned(v),
            None => match other.sdata_value() {
                Some(v) => AttrValue::Signed(v),
                None => AttrValue::Unsigned(0),
            },
        },
    })
}

/// Resolve the line-program file table to plain paths, keyed by the raw
/// declaration-file index.
fn resolve_file_table(dwarf: &OwnedDwarf, unit: &DwarfUnit<OwnedReader>) -> Vec<(u64, String)>
{
    let mut out = Vec::new();
    let Some(program) = unit.line_program.clone() else {
        return out;
    };
    let header = program.header();
    let count = header.file_names().len() as u64;
    for index in 0..=count {
        let Some(file) = header.file(index) else {
            continue;
        };
        let mut path = String::new();
        if let Some(dir) = file.directory(header) {
            if let Ok(reader) = dwarf.attr_string(unit, dir) {
                if let Ok(text) = reader.to_string_lossy() {
                    path.push_str(&text);
                }
            }
        }
        if let Ok(reader) = dwarf.attr_string(unit, file.path_name()) {
            if let Ok(text) = reader.to_string_lossy() {
                if text.starts_with('/') {
                    path.clear();
                } else if !path.is_empty() && !path.ends_with('/') {
                    path.push('/');
                }
                path.push_str(&text);
            }
        }
        if !path.is_empty() {
            out.push((index, path));
        }
    }
    out
}

fn load_pub_tables(
    sections: &HashMap<&'static str, Arc<[u8]>>,
    endian: RunTimeEndian,
    tree: &mut DebugTree,
) -> HeaderResult<()>
{
    let pub_names = DebugPubNames::from(section_reader(sections, endian, SectionId::DebugPubNames));
    let mut items = pub_names.items();
    while let Some(item) = items.next()? {
        let name = item.name().to_string_lossy()?.into_owned();
        let unit = tree.unit_by_section_offset(item.unit_header_offset().0 as u64, false);
        tree.add_pub_name(name, unit, item.die_offset().0 as u64);
    }

    let pub_types = DebugPubTypes::from(section_reader(sections, endian, SectionId::DebugPubTypes));
    let mut items = pub_types.items();
    while let Some(item) = items.next()? {
        let name = item.name().to_string_lossy()?.into_owned();
        let unit = tree.unit_by_section_offset(item.unit_header_offset().0 as u64, false);
        tree.add_pub_type(name, unit, item.die_offset().0 as u64);
    }
    Ok(())
}

fn convert_tag(tag: DwTag) -> Tag
{
    match tag {
        constants::DW_TAG_compile_unit => Tag::CompileUnit,
        constants::DW_TAG_type_unit => Tag::TypeUnit,
        constants::DW_TAG_partial_unit => Tag::PartialUnit,
        constants::DW_TAG_variable => Tag::Variable,
        constants::DW_TAG_member => Tag::Member,
        constants::DW_TAG_formal_parameter => Tag::FormalParameter,
        constants::DW_TAG_unspecified_parameters => Tag::UnspecifiedParameters,
        constants::DW_TAG_subprogram => Tag::Subprogram,
        constants::DW_TAG_subroutine_type => Tag::SubroutineType,
        constants::DW_TAG_structure_type => Tag::StructureType,
        constants::DW_TAG_class_type => Tag::ClassType,
        constants::DW_TAG_union_type => Tag::UnionType,
        constants::DW_TAG_enumeration_type => Tag::EnumerationType,
        constants::DW_TAG_enumerator => Tag::Enumerator,
        constants::DW_TAG_typedef => Tag::Typedef,
        constants::DW_TAG_base_type => Tag::BaseType,
        constants::DW_TAG_pointer_type => Tag::PointerType,
        constants::DW_TAG_reference_type => Tag::ReferenceType,
        constants::DW_TAG_rvalue_reference_type => Tag::RvalueReferenceType,
        constants::DW_TAG_const_type => Tag::ConstType,
        constants::DW_TAG_volatile_type => Tag::VolatileType,
        constants::DW_TAG_restrict_type => Tag::RestrictType,
        constants::DW_TAG_atomic_type => Tag::AtomicType,
        constants::DW_TAG_array_type => Tag::ArrayType,
        constants::DW_TAG_subrange_type => Tag::SubrangeType,
        constants::DW_TAG_ptr_to_member_type => Tag::PtrToMemberType,
        constants::DW_TAG_namespace => Tag::Namespace,
        constants::DW_TAG_inheritance => Tag::Inheritance,
        constants::DW_TAG_template_type_parameter => Tag::TemplateTypeParameter,
        constants::DW_TAG_template_value_parameter => Tag::TemplateValueParameter,
        constants::DW_TAG_imported_declaration => Tag::ImportedDeclaration,
        constants::DW_TAG_imported_module => Tag::ImportedModule,
        constants::DW_TAG_unspecified_type => Tag::UnspecifiedType,
        constants::DW_TAG_lexical_block => Tag::LexicalBlock,
        constants::DW_TAG_inlined_subroutine => Tag::InlinedSubroutine,
        constants::DW_TAG_label => Tag::Label,
        constants::DW_TAG_variant_part => Tag::VariantPart,
        constants::DW_TAG_variant => Tag::Variant,
        constants::DW_TAG_friend => Tag::Friend,
        constants::DW_TAG_access_declaration => Tag::AccessDeclaration,
        other => Tag::Other(other.0),
    }
}

fn convert_attr_name(name: DwAt) -> AttrName
{
    match name {
        constants::DW_AT_name => AttrName::Name,
        constants::DW_AT_type => AttrName::Type,
        constants::DW_AT_external => AttrName::External,
        constants::DW_AT_declaration => AttrName::Declaration,
        constants::DW_AT_lower_bound => AttrName::LowerBound,
        constants::DW_AT_upper_bound => AttrName::UpperBound,
        constants::DW_AT_count => AttrName::Count,
        constants::DW_AT_const_value => AttrName::ConstValue,
        constants::DW_AT_producer => AttrName::Producer,
        constants::DW_AT_comp_dir => AttrName::CompDir,
        constants::DW_AT_decl_file => AttrName::DeclFile,
        constants::DW_AT_decl_line => AttrName::DeclLine,
        constants::DW_AT_byte_size => AttrName::ByteSize,
        constants::DW_AT_bit_size => AttrName::BitSize,
        constants::DW_AT_encoding => AttrName::Encoding,
        constants::DW_AT_containing_type => AttrName::ContainingType,
        constants::DW_AT_object_pointer => AttrName::ObjectPointer,
        constants::DW_AT_artificial => AttrName::Artificial,
        constants::DW_AT_prototyped => AttrName::Prototyped,
        constants::DW_AT_data_member_location => AttrName::DataMemberLocation,
        constants::DW_AT_language => AttrName::Language,
        other => AttrName::Other(other.0),
    }
}
