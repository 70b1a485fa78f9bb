//! JSON schema documents.
//!
//! ```json
//! {
//!   "types": {
//!     "Texture": {
//!       "kind": "class",
//!       "bases": [{ "name": "Resource", "offset": 0 }],
//!       "attrs": [{ "name": "width", "type": "uint16", "offset": 8 }]
//!     },
//!     "EFormat": { "kind": "enum", "size": 1, "values": { "RGBA8": 0, "BC7": 1 } }
//!   }
//! }
//! ```
//!
//! Built-in atoms are added unless `"builtins": false`. Container and pointer
//! types are derived from attribute usage.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    AtomInfo, ClassAttrInfo, ClassBaseInfo, ClassInfo, EnumInfo, EnumValueInfo, TypeFactory,
    TypeFactoryBuilder, TypeInfo,
};
use crate::util::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default = "default_true")]
    pub builtins: bool,
    #[serde(default)]
    pub types: BTreeMap<String, SchemaEntry>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaEntry {
    Atom {
        base: String,
    },
    Class {
        #[serde(default)]
        version: u32,
        #[serde(default)]
        flags: u32,
        #[serde(default)]
        bases: Vec<SchemaBase>,
        #[serde(default)]
        attrs: Vec<SchemaAttr>,
        #[serde(default)]
        messages: Vec<String>,
    },
    Enum {
        size: u8,
        #[serde(default)]
        flags: bool,
        #[serde(default)]
        values: BTreeMap<String, u32>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaBase {
    pub name: String,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaAttr {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub offset: u32,
    #[serde(default)]
    pub flags: u32,
    #[serde(default = "default_true")]
    pub serializable: bool,
}

impl SchemaEntry {
    fn into_type_info(self, name: String) -> TypeInfo {
        match self {
            Self::Atom { base } => AtomInfo::new(name, base).into(),
            Self::Class { version, flags, bases, attrs, messages } => ClassInfo {
                name,
                version,
                flags,
                bases: bases
                    .into_iter()
                    .map(|b| ClassBaseInfo { name: b.name, offset: b.offset })
                    .collect(),
                attrs: attrs
                    .into_iter()
                    .map(|a| ClassAttrInfo {
                        name: a.name,
                        type_name: a.type_name,
                        offset: a.offset,
                        flags: a.flags,
                        serializable: a.serializable,
                    })
                    .collect(),
                messages,
            }
            .into(),
            Self::Enum { size, flags, values } => {
                let mut values: Vec<_> = values
                    .into_iter()
                    .map(|(name, value)| EnumValueInfo { name, value })
                    .collect();
                values.sort_by_key(|v| v.value);
                EnumInfo { name, size, flags, values }.into()
            }
        }
    }
}

impl SchemaDocument {
    /// Builder holding every type of the document.
    pub fn into_builder(self) -> TypeFactoryBuilder {
        let mut builder = TypeFactoryBuilder::new();
        if self.builtins {
            builder = builder.with_builtin_atoms();
        }
        for (name, entry) in self.types {
            builder.register(entry.into_type_info(name));
        }
        builder
    }
}

impl TypeFactory {
    /// Build a factory from a JSON schema document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: SchemaDocument = serde_json::from_str(json)?;
        doc.into_builder().build()
    }

    /// Build a factory from a JSON schema file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
