//! Attribute decoder: renders attribute values as display text.
//!
//! Values arrive pre-classified into semantic buckets (see
//! [`AttrValue`](crate::tree::AttrValue)), so decoding is an exhaustive match
//! per bucket. Encoding forms without a bucket were already degraded to the
//! decimal bucket by the provider backend, which is why decoding a present
//! value can never fail.

use std::fmt::Write as _;

use crate::error::{HeaderError, HeaderResult};
use crate::tree::{AttrName, AttrValue, Entry};

/// Decode the named attribute of `entry` to display text.
///
/// Fails with [`HeaderError::MissingAttribute`] when the entry does not carry
/// the attribute at all.
pub fn decode(entry: &Entry, attr: AttrName) -> HeaderResult<String>
{
    match entry.attr(attr) {
        Some(value) => Ok(decode_value(value)),
        None => Err(HeaderError::MissingAttribute {
            attr,
            offset: entry.offset,
        }),
    }
}

/// Render one attribute value.
pub fn decode_value(value: &AttrValue) -> String
{
    match value {
        AttrValue::Unsigned(v) => v.to_string(),
        AttrValue::Signed(v) => v.to_string(),
        AttrValue::Flag(v) => v.to_string(),
        AttrValue::Address(v) => format!("0x{v:08x}"),
        AttrValue::UnitRef(v) => format!("<0x{v:08x}>"),
        AttrValue::SectionRef(v) => format!("<0x{v:x}>"),
        AttrValue::Signature(v) => format!("0x{v:016x}"),
        AttrValue::Str(s) => s.clone(),
        AttrValue::Block(bytes) => {
            let mut out = format!("{} byte block:", bytes.len());
            for byte in bytes {
                let _ = write!(out, " {byte:02x}");
            }
            out
        }
    }
}
