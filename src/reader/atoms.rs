//! Primitive decoders for atom types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use half::f16;

use crate::rtti::{AtomInfo, Value};
use crate::streaming::StreamingDataSource;
use crate::util::hash::verify_crc32c;
use crate::util::{ByteCursor, Error, Result};

/// Decodes one atom value from the cursor.
pub trait AtomDecoder: Send + Sync {
    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<Value>;
}

impl<F> AtomDecoder for F
where
    F: Fn(&mut ByteCursor<'_>) -> Result<Value> + Send + Sync,
{
    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<Value> {
        self(cursor)
    }
}

/// Packed representation used for `Array<T>` of fixed-width integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackedKind {
    Bytes,
    Shorts,
    Ints,
    Longs,
}

impl PackedKind {
    /// Read `count` packed elements.
    pub fn read(self, cursor: &mut ByteCursor<'_>, count: usize) -> Result<Value> {
        Ok(match self {
            Self::Bytes => Value::Bytes(cursor.read_bytes(count)?.to_vec()),
            Self::Shorts => Value::Shorts(cursor.read_i16_array(count)?),
            Self::Ints => Value::Ints(cursor.read_i32_array(count)?),
            Self::Longs => Value::Longs(cursor.read_i64_array(count)?),
        })
    }
}

type DecodeFn = fn(&mut ByteCursor<'_>) -> Result<Value>;

#[derive(Clone)]
struct AtomEntry {
    decoder: Arc<dyn AtomDecoder>,
    packed: Option<PackedKind>,
}

/// Atom decoders keyed by atom name or base representation.
///
/// Lookup tries the atom's own name first, then its base, so a decoder
/// registered for a specific atom overrides the one for its representation.
#[derive(Clone, Default)]
pub struct AtomRegistry {
    entries: HashMap<String, AtomEntry>,
}

impl fmt::Debug for AtomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("AtomRegistry").field("decoders", &keys).finish()
    }
}

impl AtomRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoders for every built-in atom representation.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.insert("bool", |c| Ok(Value::Bool(c.read_u8()? != 0)), None);
        reg.insert("int8", |c| Ok(Value::I8(c.read_i8()?)), Some(PackedKind::Bytes));
        reg.insert("uint8", |c| Ok(Value::U8(c.read_u8()?)), Some(PackedKind::Bytes));
        reg.insert("int16", |c| Ok(Value::I16(c.read_i16()?)), Some(PackedKind::Shorts));
        reg.insert("uint16", |c| Ok(Value::U16(c.read_u16()?)), Some(PackedKind::Shorts));
        reg.insert("int32", |c| Ok(Value::I32(c.read_i32()?)), Some(PackedKind::Ints));
        reg.insert("uint32", |c| Ok(Value::U32(c.read_u32()?)), Some(PackedKind::Ints));
        reg.insert("int64", |c| Ok(Value::I64(c.read_i64()?)), Some(PackedKind::Longs));
        reg.insert("uint64", |c| Ok(Value::U64(c.read_u64()?)), Some(PackedKind::Longs));
        reg.insert("float", |c| Ok(Value::F32(c.read_f32()?)), None);
        reg.insert("double", |c| Ok(Value::F64(c.read_f64()?)), None);
        reg.insert(
            "HalfFloat",
            |c| Ok(Value::F16(f16::from_bits(c.read_u16()?))),
            None,
        );
        reg.insert("String", read_string, None);
        reg.insert("WString", read_wstring, None);
        reg.insert("GGUUID", read_uuid, None);
        reg.insert("StreamingDataSource", read_data_source, None);
        reg
    }

    fn insert(&mut self, key: &str, decode: DecodeFn, packed: Option<PackedKind>) {
        self.entries.insert(key.to_string(), AtomEntry { decoder: Arc::new(decode), packed });
    }

    /// Register (or replace) the decoder for an atom name or base.
    pub fn register(&mut self, key: impl Into<String>, decoder: impl AtomDecoder + 'static) -> &mut Self {
        self.entries
            .insert(key.into(), AtomEntry { decoder: Arc::new(decoder), packed: None });
        self
    }

    fn entry(&self, atom: &AtomInfo) -> Result<&AtomEntry> {
        self.entries
            .get(&atom.name)
            .or_else(|| self.entries.get(&atom.base))
            .ok_or_else(|| Error::MissingAtomDecoder(atom.name.clone()))
    }

    pub fn contains(&self, atom: &AtomInfo) -> bool {
        self.entry(atom).is_ok()
    }

    /// Decode one value of `atom`.
    pub fn decode(&self, atom: &AtomInfo, cursor: &mut ByteCursor<'_>) -> Result<Value> {
        self.entry(atom)?.decoder.decode(cursor)
    }

    /// Packed array form of `atom`, if its decoder is a built-in integer one.
    pub fn packed_kind(&self, atom: &AtomInfo) -> Option<PackedKind> {
        self.entry(atom).ok().and_then(|e| e.packed)
    }
}

/// `[len:u32][utf8][crc32c:u32]`, checksum only for non-empty strings.
pub fn read_string(cursor: &mut ByteCursor<'_>) -> Result<Value> {
    let len = cursor.read_u32()? as usize;
    if len == 0 {
        return Ok(Value::String(String::new()));
    }
    let bytes = cursor.read_bytes(len)?;
    let crc = cursor.read_u32()?;
    verify_crc32c(bytes, crc)?;
    let s = std::str::from_utf8(bytes)
        .map_err(|e| Error::invalid(format!("string is not UTF-8: {}", e)))?;
    Ok(Value::String(s.to_string()))
}

/// `[units:u32][utf16le]`.
pub fn read_wstring(cursor: &mut ByteCursor<'_>) -> Result<Value> {
    let units = cursor.read_u32()? as usize;
    let raw = cursor.read_i16_array(units)?;
    let s = char::decode_utf16(raw.into_iter().map(|u| u as u16))
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::invalid(format!("wide string is not UTF-16: {}", e)))?;
    Ok(Value::WString(s))
}

pub fn read_uuid(cursor: &mut ByteCursor<'_>) -> Result<Value> {
    let mut uuid = [0u8; 16];
    uuid.copy_from_slice(cursor.read_bytes(16)?);
    Ok(Value::Uuid(uuid))
}

/// `[channel:i32][locator:u64][length:u32]`.
pub fn read_data_source(cursor: &mut ByteCursor<'_>) -> Result<Value> {
    let channel = cursor.read_i32()?;
    let locator = cursor.read_u64()?;
    let length = cursor.read_u32()?;
    Ok(Value::DataSource(StreamingDataSource::new(channel, locator, length)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hash::crc32c;

    fn string_bytes(s: &str, crc: u32) -> Vec<u8> {
        let mut out = (s.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }

    #[test]
    fn test_string_with_checksum() {
        let data = string_bytes("hello", 0x9a71bb4c);
        let mut c = ByteCursor::new(&data);
        assert_eq!(read_string(&mut c).unwrap(), Value::String("hello".into()));
        assert!(c.is_at_end());
    }

    #[test]
    fn test_string_checksum_mismatch() {
        let data = string_bytes("hello", crc32c(b"hellp"));
        let mut c = ByteCursor::new(&data);
        assert!(matches!(read_string(&mut c), Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_empty_string_has_no_checksum() {
        let data = 0u32.to_le_bytes();
        let mut c = ByteCursor::new(&data);
        assert_eq!(read_string(&mut c).unwrap(), Value::String(String::new()));
        assert!(c.is_at_end());
    }

    #[test]
    fn test_wstring() {
        let mut data = 2u32.to_le_bytes().to_vec();
        for unit in "hé".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        let mut c = ByteCursor::new(&data);
        assert_eq!(read_wstring(&mut c).unwrap(), Value::WString("hé".into()));
    }

    #[test]
    fn test_lookup_prefers_atom_name() {
        let mut reg = AtomRegistry::with_defaults();
        let handle = AtomInfo::new("Handle", "uint32");
        assert_eq!(reg.packed_kind(&handle), Some(PackedKind::Ints));

        fn doubled(c: &mut ByteCursor<'_>) -> Result<Value> {
            Ok(Value::U64(c.read_u32()? as u64 * 2))
        }
        reg.register("Handle", doubled);
        let data = 21u32.to_le_bytes();
        let mut c = ByteCursor::new(&data);
        assert_eq!(reg.decode(&handle, &mut c).unwrap(), Value::U64(42));
        assert_eq!(reg.packed_kind(&handle), None);
    }

    #[test]
    fn test_missing_decoder() {
        let reg = AtomRegistry::new();
        let mut c = ByteCursor::new(&[]);
        let result = reg.decode(&AtomInfo::new("Vec3", "Vec3"), &mut c);
        assert!(matches!(result, Err(Error::MissingAtomDecoder(n)) if n == "Vec3"));
    }

    #[test]
    fn test_data_source() {
        let mut data = (-1i32).to_le_bytes().to_vec();
        data.extend_from_slice(&0x55u64.to_le_bytes());
        data.extend_from_slice(&10u32.to_le_bytes());
        let mut c = ByteCursor::new(&data);
        let v = read_data_source(&mut c).unwrap();
        let ds = v.as_data_source().unwrap();
        assert!(ds.is_present());
        assert!(!ds.is_valid());
    }
}
