use serde::{Deserialize, Serialize};

use crate::data_type::AdsDataType;

/// Data type entry flag: a type GUID follows the sub items.
pub const FLAG_TYPE_GUID: u32 = 1 << 7;
/// Data type entry flag: a copy mask of `size` bytes follows.
pub const FLAG_COPY_MASK: u32 = 1 << 9;
/// Data type entry flag: method descriptions follow.
pub const FLAG_METHOD_INFOS: u32 = 1 << 11;
/// Data type entry flag: attributes (`{attribute 'name' := 'value'}`) follow.
pub const FLAG_ATTRIBUTES: u32 = 1 << 12;
/// Data type entry flag: enumerators follow.
pub const FLAG_ENUM_INFOS: u32 = 1 << 13;

/// One array dimension: `[start_index .. start_index + length - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayDim {
    pub start_index: i32,
    pub length: u32,
}

impl ArrayDim {
    pub fn end_index(&self) -> i64 {
        i64::from(self.start_index) + i64::from(self.length) - 1
    }
}

/// Named constant of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

/// Declaration attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Layout of a PLC type, possibly nested.
///
/// A node is exactly one of:
/// - a structure, when `sub_items` is non-empty; member offsets are relative
///   to the structure start;
/// - an array, when `array_dims` is non-empty; after resolution `size` is the
///   size of one element and the element layout is the node itself without
///   its dimensions;
/// - a primitive leaf, decoded from `data_type`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeNode {
    pub name: String,
    pub type_name: String,
    /// Wire type code, see [`AdsDataType`].
    pub data_type: u32,
    pub size: u32,
    pub offset: u32,
    pub flags: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array_dims: Vec<ArrayDim>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_items: Vec<TypeNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<EnumValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

impl TypeNode {
    /// Primitive leaf with the given wire type and size.
    pub fn primitive(type_name: impl Into<String>, data_type: AdsDataType, size: u32) -> Self {
        Self {
            type_name: type_name.into(),
            data_type: data_type.code(),
            size,
            ..Self::default()
        }
    }

    pub fn kind(&self) -> AdsDataType {
        AdsDataType::from_code(self.data_type)
    }

    pub fn is_array(&self) -> bool {
        !self.array_dims.is_empty()
    }

    pub fn is_struct(&self) -> bool {
        !self.sub_items.is_empty()
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }

    /// Number of elements across all dimensions; 1 for non-arrays.
    ///
    /// Dimensions come from the device, so the product is checked; `None`
    /// means it does not fit in `usize`.
    pub fn element_count(&self) -> Option<usize> {
        self.array_dims
            .iter()
            .try_fold(1usize, |count, dim| count.checked_mul(dim.length as usize))
    }

    /// Total bytes occupied by the node: element size × element count.
    pub fn byte_size(&self) -> Option<usize> {
        self.element_count()?.checked_mul(self.size as usize)
    }

    /// Enumerator name for a numeric value.
    pub fn enum_name(&self, value: i64) -> Option<&str> {
        self.enum_values
            .iter()
            .find(|e| e.value == value)
            .map(|e| e.name.as_str())
    }

    /// Numeric value of an enumerator. Accepts `Name` or `E_Type.Name`.
    pub fn enum_value(&self, name: &str) -> Option<i64> {
        let short = name.rsplit('.').next().unwrap_or(name);
        self.enum_values
            .iter()
            .find(|e| e.name == name || e.name == short)
            .map(|e| e.value)
    }

    /// Member by name.
    pub fn member(&self, name: &str) -> Option<&TypeNode> {
        self.sub_items.iter().find(|m| m.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }
}
