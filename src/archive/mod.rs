//! Chunk-compressed archive container.
//!
//! An archive is a header, a table of chunk records and a run of LZ4 block
//! payloads. Together the chunks tile one logical byte space that
//! [`ChunkedArchive`] exposes for random-access reads.
//!
//! ## Chunk record
//!
//! ```text
//! +-------------------+
//! | logical offset    |  i64
//! | compressed offset |  i64 (file position)
//! | uncompressed size |  i32
//! | compressed size   |  i32
//! | method            |  u8  (3 = LZ4 block)
//! | padding           |  7 bytes
//! +-------------------+
//! ```

mod format;
mod reader;
mod writer;

pub use format::*;
pub use reader::*;
pub use writer::*;
