//! Utility types and functions shared by every layer.
//!
//! - [`Error`] / [`Result`] / [`ErrorKind`] - Error handling
//! - [`ByteCursor`] - Bounds-checked little-endian reads
//! - [`hash`] - Type name hashing and CRC32C checksums

mod error;
mod cursor;
pub mod hash;

pub use error::*;
pub use cursor::*;
