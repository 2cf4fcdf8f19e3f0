use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Decoded PLC value.
///
/// Serializes to plain JSON. Deserializing picks the first variant that
/// fits, so integers land in the smallest signed width that holds them;
/// [`encode`](crate::encode) converts to the declared width anyway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    SInt(i8),
    Int(i16),
    DInt(i32),
    LInt(i64),
    USInt(u8),
    UInt(u16),
    UDInt(u32),
    ULInt(u64),
    LReal(f64),
    Real(f32),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "BOOL",
            Value::SInt(_) => "SINT",
            Value::Int(_) => "INT",
            Value::DInt(_) => "DINT",
            Value::LInt(_) => "LINT",
            Value::USInt(_) => "USINT",
            Value::UInt(_) => "UINT",
            Value::UDInt(_) => "UDINT",
            Value::ULInt(_) => "ULINT",
            Value::Real(_) => "REAL",
            Value::LReal(_) => "LREAL",
            Value::String(_) => "STRING",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    /// Integer content, widened without loss.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::SInt(v) => Some(v.into()),
            Value::Int(v) => Some(v.into()),
            Value::DInt(v) => Some(v.into()),
            Value::LInt(v) => Some(v.into()),
            Value::USInt(v) => Some(v.into()),
            Value::UInt(v) => Some(v.into()),
            Value::UDInt(v) => Some(v.into()),
            Value::ULInt(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Numeric content as a float. Integers above 2^53 lose precision.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Real(v) => Some(v.into()),
            Value::LReal(v) => Some(v),
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::DInt(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::LInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UDInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::LReal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_is_plain() {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), Value::Int(-3));
        fields.insert("b".to_string(), Value::Array(vec![Value::Bool(true)]));
        fields.insert("c".to_string(), Value::from("x"));
        let json = serde_json::to_string(&Value::Struct(fields)).unwrap();
        assert_eq!(json, r#"{"a":-3,"b":[true],"c":"x"}"#);
    }

    #[test]
    fn test_json_integers_pick_smallest_signed() {
        let v: Value = serde_json::from_str("[5, 300, -70000, 4000000000, 18446744073709551615, 1.5]")
            .unwrap();
        assert_eq!(
            v,
            Value::Array(vec![
                Value::SInt(5),
                Value::Int(300),
                Value::DInt(-70000),
                Value::LInt(4_000_000_000),
                Value::ULInt(u64::MAX),
                Value::LReal(1.5),
            ])
        );
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::UDInt(7).as_i128(), Some(7));
        assert_eq!(Value::Real(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::Bool(true).as_f64(), None);
        assert!(Value::ULInt(1).is_numeric());
        assert!(!Value::from("1").is_numeric());
    }
}
