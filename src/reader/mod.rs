//! Decoding typed values from bytes.
//!
//! - [`TypeReader`] - Recursive decoder driven by the type factory
//! - [`AtomRegistry`] - Primitive decoders per atom representation
//! - [`CallbackRegistry`] - Handlers for per-class extra binary data

mod atoms;
mod callbacks;
mod type_reader;

pub use atoms::*;
pub use callbacks::*;
pub use type_reader::*;
