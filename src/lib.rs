//! # rtti-stream
//!
//! Typed object streaming over chunk-compressed archives, driven by
//! reflected type metadata.
//!
//! Objects are stored as framed records (`[typeHash:u64][byteSize:u32][payload]`)
//! inside groups. A group lives in the logical byte space of an archive made
//! of independently LZ4-compressed chunks. The payload layout is not
//! self-describing: it follows the attribute order of the class as computed
//! from its schema.
//!
//! ## Modules
//!
//! - [`util`] - Errors, byte cursor, hashing and checksums
//! - [`rtti`] - Type model, type factory, runtime values
//! - [`reader`] - Schema-driven decoder
//! - [`archive`] - Chunked archive reader and writer
//! - [`streaming`] - Group directory, object reader, deferred references
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rtti_stream::prelude::*;
//!
//! let factory = Arc::new(TypeFactory::from_json_file("schema.json")?);
//! let graph = Arc::new(StreamingGraph::from_json_file("graph.json")?);
//! let config = StreamingConfig::default().with_mount("cache", "/data/package");
//!
//! let reader = StreamingObjectReader::new(graph, TypeReader::with_defaults(factory), config);
//! let texture = reader.read_object(0x1234, 0)?;
//! println!("{}", texture);
//! ```

pub mod util;
pub mod rtti;
pub mod reader;
pub mod archive;
pub mod streaming;

// Re-export commonly used types
pub use util::{Error, ErrorKind, Result};

/// Library version with build stamp.
pub fn version_string() -> String {
    let stamp = option_env!("RTTI_STREAM_BUILD_STAMP").unwrap_or("unknown");
    format!("rtti-stream {} (built {})", env!("CARGO_PKG_VERSION"), stamp)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{ByteCursor, Error, ErrorKind, Result};
    pub use crate::rtti::{
        ClassAttrInfo, ClassInfo, EnumInfo, AtomInfo, TypeFactory, TypeId, TypeInfo, TypedObject,
        Value,
    };
    pub use crate::reader::{AtomRegistry, CallbackRegistry, ReadContext, TypeReader};
    pub use crate::archive::{ArchiveWriter, ChunkedArchive};
    pub use crate::streaming::{
        Group, Ref, StreamingConfig, StreamingDataSource, StreamingGraph, StreamingObjectReader,
        SubgroupPolicy,
    };
}
