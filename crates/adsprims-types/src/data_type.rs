use std::fmt;

/// ADS wire type codes (`ADST_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdsDataType {
    Void,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Real32,
    Real64,
    Real80,
    String,
    WString,
    Bit,
    BigType,
    Unknown(u32),
}

impl AdsDataType {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => AdsDataType::Void,
            2 => AdsDataType::Int16,
            3 => AdsDataType::Int32,
            4 => AdsDataType::Real32,
            5 => AdsDataType::Real64,
            16 => AdsDataType::Int8,
            17 => AdsDataType::UInt8,
            18 => AdsDataType::UInt16,
            19 => AdsDataType::UInt32,
            20 => AdsDataType::Int64,
            21 => AdsDataType::UInt64,
            30 => AdsDataType::String,
            31 => AdsDataType::WString,
            32 => AdsDataType::Real80,
            33 => AdsDataType::Bit,
            65 => AdsDataType::BigType,
            other => AdsDataType::Unknown(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            AdsDataType::Void => 0,
            AdsDataType::Int16 => 2,
            AdsDataType::Int32 => 3,
            AdsDataType::Real32 => 4,
            AdsDataType::Real64 => 5,
            AdsDataType::Int8 => 16,
            AdsDataType::UInt8 => 17,
            AdsDataType::UInt16 => 18,
            AdsDataType::UInt32 => 19,
            AdsDataType::Int64 => 20,
            AdsDataType::UInt64 => 21,
            AdsDataType::String => 30,
            AdsDataType::WString => 31,
            AdsDataType::Real80 => 32,
            AdsDataType::Bit => 33,
            AdsDataType::BigType => 65,
            AdsDataType::Unknown(code) => code,
        }
    }

    /// Byte width of fixed-size primitives.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            AdsDataType::Int8 | AdsDataType::UInt8 | AdsDataType::Bit => Some(1),
            AdsDataType::Int16 | AdsDataType::UInt16 => Some(2),
            AdsDataType::Int32 | AdsDataType::UInt32 | AdsDataType::Real32 => Some(4),
            AdsDataType::Int64 | AdsDataType::UInt64 | AdsDataType::Real64 => Some(8),
            _ => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            AdsDataType::Int8
                | AdsDataType::UInt8
                | AdsDataType::Int16
                | AdsDataType::UInt16
                | AdsDataType::Int32
                | AdsDataType::UInt32
                | AdsDataType::Int64
                | AdsDataType::UInt64
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            AdsDataType::Int8 | AdsDataType::Int16 | AdsDataType::Int32 | AdsDataType::Int64
        )
    }

    /// IEC 61131-3 name of the canonical PLC type for this code.
    pub fn plc_name(self) -> &'static str {
        match self {
            AdsDataType::Void => "VOID",
            AdsDataType::Int8 => "SINT",
            AdsDataType::UInt8 => "USINT",
            AdsDataType::Int16 => "INT",
            AdsDataType::UInt16 => "UINT",
            AdsDataType::Int32 => "DINT",
            AdsDataType::UInt32 => "UDINT",
            AdsDataType::Int64 => "LINT",
            AdsDataType::UInt64 => "ULINT",
            AdsDataType::Real32 => "REAL",
            AdsDataType::Real64 => "LREAL",
            AdsDataType::Real80 => "REAL80",
            AdsDataType::String => "STRING",
            AdsDataType::WString => "WSTRING",
            AdsDataType::Bit => "BOOL",
            AdsDataType::BigType => "BIGTYPE",
            AdsDataType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for AdsDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdsDataType::Unknown(code) => write!(f, "UNKNOWN({code})"),
            other => f.write_str(other.plc_name()),
        }
    }
}
