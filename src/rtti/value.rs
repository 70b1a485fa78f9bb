//! Runtime values produced by the type reader.

use half::f16;
use smallvec::SmallVec;

use super::TypedObject;
use crate::streaming::{Ref, StreamingDataSource};

/// A decoded single-valued enum. Unknown raw values are kept as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: String,
    pub raw: u32,
    /// Declared name for `raw`, if any.
    pub name: Option<String>,
}

impl EnumValue {
    #[inline]
    pub fn is_known(&self) -> bool {
        self.name.is_some()
    }
}

/// A decoded flag-set enum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumFlags {
    pub type_name: String,
    pub raw: u32,
    /// Names of declared flags present in `raw`, in declaration order.
    pub names: SmallVec<[String; 4]>,
    /// Union of all declared flag bits.
    pub known_mask: u32,
}

impl EnumFlags {
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Bits set in `raw` that no declared flag covers.
    #[inline]
    pub fn unknown_bits(&self) -> u32 {
        self.raw & !self.known_mask
    }
}

/// Value of an attribute, container element or atom.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F16(f16),
    F32(f32),
    F64(f64),
    String(String),
    WString(String),
    Uuid([u8; 16]),
    Enum(EnumValue),
    Flags(EnumFlags),
    /// Packed 8-bit array.
    Bytes(Vec<u8>),
    /// Packed 16-bit array.
    Shorts(Vec<i16>),
    /// Packed 32-bit array.
    Ints(Vec<i32>),
    /// Packed 64-bit array.
    Longs(Vec<i64>),
    Array(Vec<Value>),
    Object(Box<TypedObject>),
    Ref(Ref),
    DataSource(StreamingDataSource),
}

impl Value {
    /// Short label of the variant, for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I8(_) => "int8",
            Self::U8(_) => "uint8",
            Self::I16(_) => "int16",
            Self::U16(_) => "uint16",
            Self::I32(_) => "int32",
            Self::U32(_) => "uint32",
            Self::I64(_) => "int64",
            Self::U64(_) => "uint64",
            Self::F16(_) => "half",
            Self::F32(_) => "float",
            Self::F64(_) => "double",
            Self::String(_) => "string",
            Self::WString(_) => "wstring",
            Self::Uuid(_) => "uuid",
            Self::Enum(_) => "enum",
            Self::Flags(_) => "flags",
            Self::Bytes(_) => "bytes",
            Self::Shorts(_) => "shorts",
            Self::Ints(_) => "ints",
            Self::Longs(_) => "longs",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Ref(_) => "ref",
            Self::DataSource(_) => "data source",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer variant widened to i64 (u64 only if it fits).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(v) => Some(v as i64),
            Self::U8(v) => Some(v as i64),
            Self::I16(v) => Some(v as i64),
            Self::U16(v) => Some(v as i64),
            Self::I32(v) => Some(v as i64),
            Self::U32(v) => Some(v as i64),
            Self::I64(v) => Some(v),
            Self::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Any float variant widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F16(v) => Some(v.to_f64()),
            Self::F32(v) => Some(v as f64),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::WString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&TypedObject> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&EnumFlags> {
        match self {
            Self::Flags(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Option<&Ref> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_data_source(&self) -> Option<&StreamingDataSource> {
        match self {
            Self::DataSource(d) => Some(d),
            _ => None,
        }
    }

    /// Element count for array-like values.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Self::Bytes(v) => Some(v.len()),
            Self::Shorts(v) => Some(v.len()),
            Self::Ints(v) => Some(v.len()),
            Self::Longs(v) => Some(v.len()),
            Self::Array(v) => Some(v.len()),
            _ => None,
        }
    }
}
