//! Conversion between raw process image bytes and [`Value`]s.
//!
//! Both directions walk the same [`TypeNode`] tree:
//! - structures decode each member at its offset from the structure start;
//! - arrays walk dimensions outer to inner and read `size` bytes per element
//!   from one advancing cursor, row-major;
//! - leaves convert by wire type code.

use std::collections::BTreeMap;

use crate::data_type::AdsDataType;
use crate::error::{CodecError, Result};
use crate::node::TypeNode;
use crate::value::Value;

/// Decode `data` laid out as `node`.
///
/// The node's own `offset` is honoured, so a resolved root (offset 0)
/// decodes the buffer returned by a read of the node's byte size.
pub fn decode(data: &[u8], node: &TypeNode) -> Result<Value> {
    decode_at(data, node, &mut String::new())
}

/// Encode `value` as `node`, producing exactly the node's byte size.
///
/// Nothing is returned on error; the message names the offending field.
pub fn encode(value: &Value, node: &TypeNode) -> Result<Vec<u8>> {
    let size = byte_size(node, "")?;
    if size > u32::MAX as usize {
        return Err(CodecError::SizeOverflow {
            path: String::new(),
            detail: format!("{size} bytes exceed one ADS write"),
        });
    }
    let mut buf = vec![0u8; size];
    encode_body(value, node, &mut buf, &mut String::new())?;
    Ok(buf)
}

fn slice<'a>(data: &'a [u8], offset: usize, needed: usize, path: &str) -> Result<&'a [u8]> {
    offset
        .checked_add(needed)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| CodecError::BufferTooShort {
            path: path.to_string(),
            offset,
            needed,
            available: data.len(),
        })
}

fn slice_mut<'a>(
    data: &'a mut [u8],
    offset: usize,
    needed: usize,
    path: &str,
) -> Result<&'a mut [u8]> {
    let available = data.len();
    offset
        .checked_add(needed)
        .and_then(|end| data.get_mut(offset..end))
        .ok_or_else(|| CodecError::BufferTooShort {
            path: path.to_string(),
            offset,
            needed,
            available,
        })
}

fn byte_size(node: &TypeNode, path: &str) -> Result<usize> {
    node.byte_size().ok_or_else(|| CodecError::SizeOverflow {
        path: path.to_string(),
        detail: format!("{} bytes x {:?}", node.size, node.array_dims),
    })
}

fn with_segment<T>(path: &mut String, segment: &str, f: impl FnOnce(&mut String) -> T) -> T {
    let len = path.len();
    path.push_str(segment);
    let out = f(path);
    path.truncate(len);
    out
}

// ---- decode ----

fn decode_at(data: &[u8], node: &TypeNode, path: &mut String) -> Result<Value> {
    let base = slice(data, node.offset as usize, byte_size(node, path)?, path)?;
    if node.is_array() {
        let mut cursor = 0;
        decode_dims(base, node, 0, &mut cursor, path)
    } else {
        decode_element(base, node, path)
    }
}

fn decode_dims(
    base: &[u8],
    node: &TypeNode,
    dim: usize,
    cursor: &mut usize,
    path: &mut String,
) -> Result<Value> {
    let ArrayDimView { start, length } = dim_view(node, dim);
    let innermost = dim + 1 == node.array_dims.len();
    let size = node.size as usize;
    let mut items = Vec::with_capacity(length.min(base.len()));
    for i in 0..length {
        let segment = format!("[{}]", start + i as i64);
        let item = with_segment(path, &segment, |path| {
            if innermost {
                let element = slice(base, *cursor, size, path)?;
                *cursor += size;
                decode_element(element, node, path)
            } else {
                decode_dims(base, node, dim + 1, cursor, path)
            }
        })?;
        items.push(item);
    }
    Ok(Value::Array(items))
}

fn decode_element(base: &[u8], node: &TypeNode, path: &mut String) -> Result<Value> {
    if node.is_struct() {
        let mut fields = BTreeMap::new();
        for member in &node.sub_items {
            let value = with_segment(path, &format!(".{}", member.name), |path| {
                decode_at(base, member, path)
            })?;
            fields.insert(member.name.clone(), value);
        }
        return Ok(Value::Struct(fields));
    }
    decode_primitive(base, node, path)
}

fn decode_primitive(data: &[u8], node: &TypeNode, path: &str) -> Result<Value> {
    let kind = node.kind();
    let fixed = |n: usize| slice(data, 0, n, path);
    let value = match kind {
        AdsDataType::Bit => Value::Bool(fixed(1)?[0] != 0),
        AdsDataType::Int8 => Value::SInt(i8::from_le_bytes(array(fixed(1)?))),
        AdsDataType::UInt8 => Value::USInt(fixed(1)?[0]),
        AdsDataType::Int16 => Value::Int(i16::from_le_bytes(array(fixed(2)?))),
        AdsDataType::UInt16 => Value::UInt(u16::from_le_bytes(array(fixed(2)?))),
        AdsDataType::Int32 => Value::DInt(i32::from_le_bytes(array(fixed(4)?))),
        AdsDataType::UInt32 => Value::UDInt(u32::from_le_bytes(array(fixed(4)?))),
        AdsDataType::Int64 => Value::LInt(i64::from_le_bytes(array(fixed(8)?))),
        AdsDataType::UInt64 => Value::ULInt(u64::from_le_bytes(array(fixed(8)?))),
        AdsDataType::Real32 => Value::Real(f32::from_le_bytes(array(fixed(4)?))),
        AdsDataType::Real64 => Value::LReal(f64::from_le_bytes(array(fixed(8)?))),
        AdsDataType::String => {
            let bytes = slice(data, 0, node.size as usize, path)?;
            Value::String(latin1_until_nul(bytes))
        }
        AdsDataType::WString => {
            let bytes = slice(data, 0, node.size as usize, path)?;
            Value::String(utf16_until_nul(bytes))
        }
        _ => return Err(unsupported(node, path)),
    };
    Ok(value)
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Bytes up to the first zero (all of them if none), one char per byte.
pub fn latin1_until_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    bytes[..end].iter().map(|b| char::from(*b)).collect()
}

fn utf16_until_nul(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

fn unsupported(node: &TypeNode, path: &str) -> CodecError {
    CodecError::UnsupportedType {
        path: path.to_string(),
        code: node.data_type,
        type_name: node.type_name.clone(),
    }
}

// ---- encode ----

fn encode_body(value: &Value, node: &TypeNode, buf: &mut [u8], path: &mut String) -> Result<()> {
    if node.is_array() {
        let mut cursor = 0;
        encode_dims(value, node, 0, buf, &mut cursor, path)
    } else {
        encode_element(value, node, buf, path)
    }
}

struct ArrayDimView {
    start: i64,
    length: usize,
}

fn dim_view(node: &TypeNode, dim: usize) -> ArrayDimView {
    let d = node.array_dims[dim];
    ArrayDimView {
        start: i64::from(d.start_index),
        length: d.length as usize,
    }
}

fn encode_dims(
    value: &Value,
    node: &TypeNode,
    dim: usize,
    buf: &mut [u8],
    cursor: &mut usize,
    path: &mut String,
) -> Result<()> {
    let ArrayDimView { start, length } = dim_view(node, dim);
    let items = array_items(value, start, path)?;
    if items.len() != length {
        return Err(CodecError::LengthMismatch {
            path: path.clone(),
            expected: length,
            got: items.len(),
        });
    }

    let innermost = dim + 1 == node.array_dims.len();
    let size = node.size as usize;
    for (i, item) in items.into_iter().enumerate() {
        let segment = format!("[{}]", start + i as i64);
        with_segment(path, &segment, |path| {
            if innermost {
                let element = slice_mut(buf, *cursor, size, path)?;
                *cursor += size;
                encode_element(item, node, element, path)
            } else {
                encode_dims(item, node, dim + 1, buf, cursor, path)
            }
        })?;
    }
    Ok(())
}

/// Array elements in order. A map keyed by consecutive indices (from 0 or
/// from the dimension's start index) is accepted as well.
fn array_items<'a>(value: &'a Value, start: i64, path: &str) -> Result<Vec<&'a Value>> {
    match value {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Struct(map) => {
            let mut keyed = Vec::with_capacity(map.len());
            for (key, item) in map {
                let index: i64 = key.trim().parse().map_err(|_| mismatch("array", value, path))?;
                keyed.push((index, item));
            }
            keyed.sort_by_key(|(index, _)| *index);
            let first = keyed.first().map(|(index, _)| *index).unwrap_or(0);
            let consecutive = keyed
                .iter()
                .enumerate()
                .all(|(i, (index, _))| *index == first + i as i64);
            if !consecutive || (first != 0 && first != start) {
                return Err(mismatch("array", value, path));
            }
            Ok(keyed.into_iter().map(|(_, item)| item).collect())
        }
        other => Err(mismatch("array", other, path)),
    }
}

fn encode_element(value: &Value, node: &TypeNode, buf: &mut [u8], path: &mut String) -> Result<()> {
    if !node.is_struct() {
        return encode_primitive(value, node, buf, path);
    }

    let Value::Struct(fields) = value else {
        return Err(mismatch(&format!("struct {}", node.type_name), value, path));
    };
    // Check every member first so a failure leaves nothing half-written.
    if let Some(missing) = node.sub_items.iter().find(|m| !fields.contains_key(&m.name)) {
        return Err(CodecError::MissingMember {
            path: path.clone(),
            member: missing.name.clone(),
        });
    }
    for member in &node.sub_items {
        let member_value = &fields[&member.name];
        with_segment(path, &format!(".{}", member.name), |path| {
            let target = slice_mut(buf, member.offset as usize, byte_size(member, path)?, path)?;
            encode_body(member_value, member, target, path)
        })?;
    }
    Ok(())
}

fn encode_primitive(value: &Value, node: &TypeNode, buf: &mut [u8], path: &str) -> Result<()> {
    let kind = node.kind();
    match kind {
        AdsDataType::Bit => {
            let v = value
                .as_bool()
                .ok_or_else(|| mismatch("BOOL", value, path))?;
            slice_mut(buf, 0, 1, path)?[0] = u8::from(v);
        }
        AdsDataType::Int8 => put(buf, &(int_in_range::<i8>(value, node, path)?).to_le_bytes(), path)?,
        AdsDataType::UInt8 => put(buf, &(int_in_range::<u8>(value, node, path)?).to_le_bytes(), path)?,
        AdsDataType::Int16 => put(buf, &(int_in_range::<i16>(value, node, path)?).to_le_bytes(), path)?,
        AdsDataType::UInt16 => put(buf, &(int_in_range::<u16>(value, node, path)?).to_le_bytes(), path)?,
        AdsDataType::Int32 => put(buf, &(int_in_range::<i32>(value, node, path)?).to_le_bytes(), path)?,
        AdsDataType::UInt32 => put(buf, &(int_in_range::<u32>(value, node, path)?).to_le_bytes(), path)?,
        AdsDataType::Int64 => put(buf, &(int_in_range::<i64>(value, node, path)?).to_le_bytes(), path)?,
        AdsDataType::UInt64 => put(buf, &(int_in_range::<u64>(value, node, path)?).to_le_bytes(), path)?,
        AdsDataType::Real32 => {
            let v = float_value(value, path)?;
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                return Err(out_of_range(v, kind, path));
            }
            put(buf, &(v as f32).to_le_bytes(), path)?;
        }
        AdsDataType::Real64 => put(buf, &float_value(value, path)?.to_le_bytes(), path)?,
        AdsDataType::String => {
            let s = value.as_str().ok_or_else(|| mismatch("STRING", value, path))?;
            let target = slice_mut(buf, 0, node.size as usize, path)?;
            encode_latin1(s, target, path)?;
        }
        AdsDataType::WString => {
            let s = value
                .as_str()
                .ok_or_else(|| mismatch("WSTRING", value, path))?;
            let target = slice_mut(buf, 0, node.size as usize, path)?;
            encode_utf16(s, target);
        }
        _ => return Err(unsupported(node, path)),
    }
    Ok(())
}

fn put(buf: &mut [u8], bytes: &[u8], path: &str) -> Result<()> {
    slice_mut(buf, 0, bytes.len(), path)?.copy_from_slice(bytes);
    Ok(())
}

/// Integer to store in an integer-typed node.
///
/// Integers and integral floats are range-checked against `T`; enum nodes
/// additionally take the enumerator name.
fn int_in_range<T>(value: &Value, node: &TypeNode, path: &str) -> Result<T>
where
    T: TryFrom<i128>,
{
    let kind = node.kind();
    let wide: i128 = match value {
        Value::String(name) if node.is_enum() => {
            node.enum_value(name)
                .map(i128::from)
                .ok_or_else(|| CodecError::UnknownEnumerator {
                    path: path.to_string(),
                    name: name.clone(),
                })?
        }
        Value::Real(_) | Value::LReal(_) => {
            let f = value.as_f64().unwrap_or(f64::NAN);
            if !f.is_finite() || f.fract() != 0.0 || f.abs() > 1.9e19 {
                return Err(out_of_range(f, kind, path));
            }
            f as i128
        }
        other => other.as_i128().ok_or_else(|| {
            let expected = if node.is_enum() {
                format!("{} or enumerator name", kind.plc_name())
            } else {
                kind.plc_name().to_string()
            };
            mismatch(&expected, other, path)
        })?,
    };
    T::try_from(wide).map_err(|_| out_of_range(wide, kind, path))
}

fn float_value(value: &Value, path: &str) -> Result<f64> {
    value.as_f64().ok_or_else(|| mismatch("REAL", value, path))
}

/// Latin-1 bytes truncated to `buf.len() - 1`, zero padded.
fn encode_latin1(s: &str, buf: &mut [u8], path: &str) -> Result<()> {
    buf.fill(0);
    let capacity = buf.len().saturating_sub(1);
    for (slot, ch) in buf[..capacity].iter_mut().zip(s.chars()) {
        *slot = u8::try_from(u32::from(ch)).map_err(|_| CodecError::OutOfRange {
            path: path.to_string(),
            value: format!("{ch:?}"),
            target: "STRING",
        })?;
    }
    Ok(())
}

/// UTF-16LE with capacity `(len / 2) - 1` code units; the last two bytes stay
/// zero. A surrogate pair that would be cut in half is dropped whole.
fn encode_utf16(s: &str, buf: &mut [u8]) {
    buf.fill(0);
    let capacity = (buf.len() / 2).saturating_sub(1);
    let mut units = Vec::with_capacity(capacity.min(s.len()));
    for ch in s.chars() {
        let mut pair = [0u16; 2];
        let encoded = ch.encode_utf16(&mut pair);
        if units.len() + encoded.len() > capacity {
            break;
        }
        units.extend_from_slice(encoded);
    }
    for (chunk, unit) in buf.chunks_exact_mut(2).zip(units) {
        chunk.copy_from_slice(&unit.to_le_bytes());
    }
}

fn mismatch(expected: &str, got: &Value, path: &str) -> CodecError {
    CodecError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        got: got.kind_name(),
    }
}

fn out_of_range(value: impl ToString, kind: AdsDataType, path: &str) -> CodecError {
    CodecError::OutOfRange {
        path: path.to_string(),
        value: value.to_string(),
        target: kind.plc_name(),
    }
}
