//! Group-addressed object streaming.
//!
//! A [`StreamingGraph`] says which archive and byte range hold each group.
//! [`StreamingObjectReader`] fetches those bytes through a
//! [`ChunkedArchive`](crate::archive::ChunkedArchive) and decodes them with a
//! [`TypeReader`](crate::reader::TypeReader).
//!
//! Two kinds of deferred value come out of decoding:
//!
//! - [`Ref`] - pointer to another object, resolved by a fresh read
//! - [`StreamingDataSource`] - locator of raw payload bytes

mod config;
mod data_source;
mod device;
mod graph;
mod reader;
mod reference;
mod scan;

pub use config::*;
pub use data_source::*;
pub use device::*;
pub use graph::*;
pub use reader::*;
pub use reference::*;
pub use scan::*;
