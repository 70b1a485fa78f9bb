//! Shared fixtures: a small schema and encoders for its wire format.

#![allow(dead_code)]

use std::sync::Arc;

use rtti_stream::reader::{CallbackRegistry, TypeReader};
use rtti_stream::rtti::{TypeFactory, TypeId, TypedObject, Value};
use rtti_stream::util::hash::crc32c;
use rtti_stream::util::{ByteCursor, Result};

pub const SCHEMA: &str = r#"{
    "types": {
        "Resource": {
            "kind": "class",
            "attrs": [{ "name": "name", "type": "String", "offset": 0 }]
        },
        "Texture": {
            "kind": "class",
            "bases": [{ "name": "Resource", "offset": 0 }],
            "attrs": [
                { "name": "width", "type": "uint16", "offset": 8 },
                { "name": "height", "type": "uint16", "offset": 10 },
                { "name": "format", "type": "EFormat", "offset": 12 },
                { "name": "mips", "type": "Array<uint8>", "offset": 16 },
                { "name": "data", "type": "StreamingDataSource", "offset": 24 },
                { "name": "gpu_handle", "type": "uint64", "offset": 40, "flags": 2 }
            ]
        },
        "Mesh": {
            "kind": "class",
            "bases": [{ "name": "Resource", "offset": 0 }],
            "attrs": [
                { "name": "vertex_count", "type": "uint32", "offset": 8 },
                { "name": "material", "type": "Ref<Texture>", "offset": 16 },
                { "name": "indices", "type": "Array<int32>", "offset": 24 }
            ]
        },
        "Sound": {
            "kind": "class",
            "bases": [{ "name": "Resource", "offset": 0 }],
            "attrs": [{ "name": "rate", "type": "uint32", "offset": 8 }],
            "messages": ["MsgReadBinary"]
        },
        "LoudSound": {
            "kind": "class",
            "bases": [{ "name": "Sound", "offset": 0 }],
            "attrs": [{ "name": "gain", "type": "float", "offset": 16 }]
        },
        "Table": {
            "kind": "class",
            "attrs": [
                { "name": "entries", "type": "HashMap<String>", "offset": 0 },
                { "name": "ids", "type": "HashSet<uint32>", "offset": 8 },
                { "name": "shorts", "type": "Array<int16>", "offset": 16 },
                { "name": "longs", "type": "Array<uint64>", "offset": 24 },
                { "name": "links", "type": "Array<Ref<Mesh>>", "offset": 32 }
            ]
        },
        "Misc": {
            "kind": "class",
            "attrs": [
                { "name": "flags", "type": "EFlags", "offset": 0 },
                { "name": "label", "type": "WString", "offset": 4 },
                { "name": "scale", "type": "HalfFloat", "offset": 12 },
                { "name": "guid", "type": "GGUUID", "offset": 16 },
                { "name": "enabled", "type": "bool", "offset": 32 }
            ]
        },
        "EFormat": {
            "kind": "enum", "size": 1,
            "values": { "RGBA8": 0, "BC1": 1, "BC7": 2 }
        },
        "EFlags": {
            "kind": "enum", "size": 4, "flags": true,
            "values": { "Visible": 1, "Static": 2, "Shadow": 4 }
        }
    }
}"#;

pub fn factory() -> Arc<TypeFactory> {
    Arc::new(TypeFactory::from_json_str(SCHEMA).expect("fixture schema builds"))
}

/// `Sound` trailing data: `[len:u32][len bytes]`, stored as extra "blob".
pub fn read_sound_blob(
    _reader: &TypeReader,
    object: &mut TypedObject,
    cursor: &mut ByteCursor<'_>,
) -> Result<()> {
    let len = cursor.read_u32()? as usize;
    let blob = cursor.read_bytes(len)?;
    object.set_extra("blob", Value::Bytes(blob.to_vec()));
    Ok(())
}

pub fn reader() -> TypeReader {
    let mut callbacks = CallbackRegistry::new();
    callbacks.register("Sound", read_sound_blob);
    TypeReader::new(
        factory(),
        Arc::new(rtti_stream::reader::AtomRegistry::with_defaults()),
        Arc::new(callbacks),
    )
}

/// Pointer as written below a class attribute.
#[derive(Clone, Copy, Debug)]
pub enum Ptr {
    Null,
    Local(u32),
    External(u32, u32),
}

/// Little-endian payload builder.
#[derive(Default, Clone)]
pub struct Enc {
    pub buf: Vec<u8>,
}

impl Enc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(mut self, v: f32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// String with its CRC32C (omitted when empty).
    pub fn string(self, s: &str) -> Self {
        self.string_with_crc(s, crc32c(s.as_bytes()))
    }

    pub fn string_with_crc(self, s: &str, crc: u32) -> Self {
        let enc = self.u32(s.len() as u32);
        if s.is_empty() {
            return enc;
        }
        enc.raw(s.as_bytes()).u32(crc)
    }

    pub fn wstring(self, s: &str) -> Self {
        let units: Vec<u16> = s.encode_utf16().collect();
        let mut enc = self.u32(units.len() as u32);
        for unit in units {
            enc = enc.u16(unit);
        }
        enc
    }

    pub fn data_source(self, channel: i32, locator: u64, length: u32) -> Self {
        self.i32(channel).u64(locator).u32(length)
    }

    pub fn ptr(self, ptr: Ptr) -> Self {
        match ptr {
            Ptr::Null => self.u8(0),
            Ptr::Local(index) => self.u8(1).u32(index),
            Ptr::External(group, index) => self.u8(2).u32(group).u32(index),
        }
    }

    pub fn bytes_array(self, items: &[u8]) -> Self {
        self.u32(items.len() as u32).raw(items)
    }

    pub fn i32_array(self, items: &[i32]) -> Self {
        let mut enc = self.u32(items.len() as u32);
        for &v in items {
            enc = enc.i32(v);
        }
        enc
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// `[typeHash:u64][byteSize:u32][payload]`.
pub fn frame(type_name: &str, payload: &[u8]) -> Vec<u8> {
    frame_with_size(type_name, payload, payload.len() as u32)
}

pub fn frame_with_size(type_name: &str, payload: &[u8], declared: u32) -> Vec<u8> {
    Enc::new()
        .u64(TypeId::of(type_name).raw())
        .u32(declared)
        .raw(payload)
        .build()
}

pub fn texture_payload(
    name: &str,
    width: u16,
    height: u16,
    format: u8,
    mips: &[u8],
    data: (i32, u64, u32),
) -> Vec<u8> {
    Enc::new()
        .string(name)
        .u16(width)
        .u16(height)
        .u8(format)
        .bytes_array(mips)
        .data_source(data.0, data.1, data.2)
        .build()
}

pub fn texture(name: &str, width: u16, height: u16, format: u8, mips: &[u8], data: (i32, u64, u32)) -> Vec<u8> {
    frame("Texture", &texture_payload(name, width, height, format, mips, data))
}

pub fn mesh_payload(name: &str, vertex_count: u32, material: Ptr, indices: &[i32]) -> Vec<u8> {
    Enc::new()
        .string(name)
        .u32(vertex_count)
        .ptr(material)
        .i32_array(indices)
        .build()
}

pub fn mesh(name: &str, vertex_count: u32, material: Ptr, indices: &[i32]) -> Vec<u8> {
    frame("Mesh", &mesh_payload(name, vertex_count, material, indices))
}

pub fn sound(name: &str, rate: u32, blob: &[u8]) -> Vec<u8> {
    let payload = Enc::new()
        .string(name)
        .u32(rate)
        .u32(blob.len() as u32)
        .raw(blob)
        .build();
    frame("Sound", &payload)
}
