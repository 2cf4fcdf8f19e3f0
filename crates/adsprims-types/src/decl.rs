//! Symbol and data type entries as returned by the device.
//!
//! Symbol entry:
//! ```text
//! entry length (4) │ index group (4) │ index offset (4) │ size (4) │ data type (4)
//! flags (2) │ array dims (2) │ name len (2) │ type len (2) │ comment len (2)
//! name\0 │ type\0 │ comment\0 │ ...
//! ```
//!
//! Data type entry:
//! ```text
//! entry length (4) │ version (4) │ hash (4) │ type hash (4) │ size (4) │ offset (4)
//! data type (4) │ flags (4) │ name len (2) │ type len (2) │ comment len (2)
//! array dims (2) │ sub item count (2)
//! name\0 │ type\0 │ comment\0 │ array info (8 each) │ sub item entries
//! [guid (16)] │ [copy mask (size)] │ [method infos] │ [attributes] │ [enum infos]
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::latin1_until_nul;
use crate::data_type::AdsDataType;
use crate::error::{CodecError, Result};
use crate::node::{
    ArrayDim, Attribute, EnumValue, TypeNode, FLAG_ATTRIBUTES, FLAG_COPY_MASK, FLAG_ENUM_INFOS,
    FLAG_METHOD_INFOS, FLAG_TYPE_GUID,
};

const SYMBOL_HEADER_SIZE: usize = 30;
const DATA_TYPE_HEADER_SIZE: usize = 42;

/// A named variable in the device's symbol table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub index_group: u32,
    pub index_offset: u32,
    pub size: u32,
    pub data_type: u32,
    pub flags: u16,
    pub name: String,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl Symbol {
    pub fn kind(&self) -> AdsDataType {
        AdsDataType::from_code(self.data_type)
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], what: &'static str) -> Self {
        Self { data, pos: 0, what }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                CodecError::Declaration(format!(
                    "{} truncated: need {n} bytes at {}, have {}",
                    self.what,
                    self.pos,
                    self.data.len()
                ))
            })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// `len` characters followed by a terminating zero.
    fn string(&mut self, len: usize) -> Result<String> {
        let raw = self.take(len + 1)?;
        Ok(latin1_until_nul(&raw[..len]))
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Parse one symbol entry.
pub fn parse_symbol_entry(data: &[u8]) -> Result<Symbol> {
    let mut cur = Cursor::new(data, "symbol entry");
    if data.len() < SYMBOL_HEADER_SIZE {
        return Err(CodecError::Declaration(format!(
            "symbol entry truncated: {} bytes, need {SYMBOL_HEADER_SIZE}",
            data.len()
        )));
    }

    let _entry_length = cur.u32()?;
    let index_group = cur.u32()?;
    let index_offset = cur.u32()?;
    let size = cur.u32()?;
    let data_type = cur.u32()?;
    let flags = cur.u16()?;
    let _array_dims = cur.u16()?;
    let name_len = cur.u16()? as usize;
    let type_len = cur.u16()? as usize;
    let comment_len = cur.u16()? as usize;

    Ok(Symbol {
        index_group,
        index_offset,
        size,
        data_type,
        flags,
        name: cur.string(name_len)?,
        type_name: cur.string(type_len)?,
        comment: cur.string(comment_len)?,
    })
}

/// Parse one data type entry, including nested sub item entries.
///
/// Sub items are returned unresolved: each carries its own name, type name,
/// offset and comment, with nested sub items only as deep as the device sent
/// them.
pub fn parse_data_type_entry(data: &[u8]) -> Result<TypeNode> {
    parse_data_type_at(data, 0)
}

/// Sub item nesting accepted inside one entry.
pub const MAX_ENTRY_DEPTH: usize = 64;

fn parse_data_type_at(data: &[u8], depth: usize) -> Result<TypeNode> {
    if depth > MAX_ENTRY_DEPTH {
        return Err(CodecError::Declaration(format!(
            "sub items nested deeper than {MAX_ENTRY_DEPTH}"
        )));
    }
    let mut cur = Cursor::new(data, "data type entry");
    let entry_length = cur.u32()? as usize;
    if entry_length < DATA_TYPE_HEADER_SIZE || entry_length > data.len() {
        return Err(CodecError::Declaration(format!(
            "data type entry length {entry_length} outside 42..={}",
            data.len()
        )));
    }
    let mut cur = Cursor::new(&data[..entry_length], "data type entry");
    cur.skip(4)?;

    let _version = cur.u32()?;
    let _hash = cur.u32()?;
    let _type_hash = cur.u32()?;
    let size = cur.u32()?;
    let offset = cur.u32()?;
    let data_type = cur.u32()?;
    let flags = cur.u32()?;
    let name_len = cur.u16()? as usize;
    let type_len = cur.u16()? as usize;
    let comment_len = cur.u16()? as usize;
    let dim_count = cur.u16()? as usize;
    let sub_item_count = cur.u16()? as usize;

    let mut node = TypeNode {
        name: cur.string(name_len)?,
        type_name: cur.string(type_len)?,
        comment: cur.string(comment_len)?,
        data_type,
        size,
        offset,
        flags,
        ..TypeNode::default()
    };

    for _ in 0..dim_count {
        let start_index = cur.u32()? as i32;
        let length = cur.u32()?;
        node.array_dims.push(ArrayDim {
            start_index,
            length,
        });
    }

    for _ in 0..sub_item_count {
        let rest = &cur.data[cur.pos..];
        let sub = parse_data_type_at(rest, depth + 1)?;
        let sub_len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        cur.skip(sub_len)?;
        node.sub_items.push(sub);
    }

    if flags & FLAG_TYPE_GUID != 0 {
        cur.skip(16)?;
    }
    if flags & FLAG_COPY_MASK != 0 {
        cur.skip(size as usize)?;
    }
    if flags & FLAG_METHOD_INFOS != 0 {
        let count = cur.u16()?;
        for _ in 0..count {
            let method_len = cur.u32()? as usize;
            cur.skip(method_len.saturating_sub(4))?;
        }
        trace!(type_name = %node.name, count, "skipped method infos");
    }
    if flags & FLAG_ATTRIBUTES != 0 {
        let count = cur.u16()?;
        for _ in 0..count {
            let name_len = cur.u8()? as usize;
            let value_len = cur.u8()? as usize;
            let name = cur.string(name_len)?;
            let value = cur.string(value_len)?;
            node.attributes.push(Attribute { name, value });
        }
    }
    if flags & FLAG_ENUM_INFOS != 0 && cur.remaining() >= 2 {
        let count = cur.u16()?;
        let kind = AdsDataType::from_code(data_type);
        for _ in 0..count {
            let name_len = cur.u16()? as usize;
            let name = cur.string(name_len)?;
            let raw = cur.take(size as usize)?;
            node.enum_values.push(EnumValue {
                name,
                value: enum_raw_value(raw, kind),
            });
        }
    }

    Ok(node)
}

/// Little-endian integer of up to 8 bytes, sign-extended for signed kinds.
fn enum_raw_value(raw: &[u8], kind: AdsDataType) -> i64 {
    let width = raw.len().min(8);
    let mut bytes = [0u8; 8];
    bytes[..width].copy_from_slice(&raw[..width]);
    let unsigned = u64::from_le_bytes(bytes);
    if kind.is_signed() && width > 0 && width < 8 {
        let shift = 64 - 8 * width as u32;
        ((unsigned << shift) as i64) >> shift
    } else {
        unsigned as i64
    }
}
