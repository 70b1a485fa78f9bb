//! Error types for the streaming engine.

use std::path::PathBuf;
use thiserror::Error;

/// Broad failure class of an [`Error`].
///
/// Schema errors mean the type model does not cover what the data needs.
/// Format errors mean the bytes themselves are malformed. Lookup errors are
/// requests for things that do not exist. Io errors come from the filesystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Schema,
    Format,
    Lookup,
    Io,
}

/// Main error type for type model, archive and streaming operations.
#[derive(Error, Debug)]
pub enum Error {
    // ---- schema coverage ----
    /// No type registered under this (canonical) name
    #[error("Unknown type: {0}")]
    UnknownTypeName(String),

    /// No type registered under this hash id
    #[error("Unknown type id: {0:#018x}")]
    UnknownTypeId(u64),

    /// Type exists but is the wrong variant for the requested use
    #[error("Type {name} is not a {expected} type")]
    UnexpectedTypeKind { name: String, expected: &'static str },

    /// Two distinct canonical names hash to the same id
    #[error("Type id collision: {first} and {second} both hash to {id:#018x}")]
    TypeIdCollision { first: String, second: String, id: u64 },

    /// Class declares trailing binary data but no callback handles it
    #[error("No extra binary data callback registered for {0}")]
    MissingCallback(String),

    /// Atom has no primitive decoder
    #[error("No atom decoder registered for {0}")]
    MissingAtomDecoder(String),

    /// Framed object declared a different size than the decoder consumed
    #[error("Object {type_name} declared {declared} bytes but {consumed} were consumed")]
    SizeMismatch {
        type_name: String,
        declared: u64,
        consumed: u64,
    },

    /// Schema definition is internally inconsistent
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    // ---- wire format ----
    /// Archive does not start with the expected magic
    #[error("Invalid archive magic: {0:#010x}")]
    InvalidMagic(u32),

    /// Archive version is not supported by this reader
    #[error("Unsupported archive version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    /// Chunk uses a compression method other than LZ4 block
    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u8),

    /// Archive header, chunk table or chunk payload is inconsistent
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    /// Embedded checksum does not match the payload
    #[error("Checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Read past the end of a buffer or logical space
    #[error("Unexpected end of data at {pos} (needed {needed} more bytes)")]
    UnexpectedEof { pos: u64, needed: u64 },

    /// Pointer type reached outside of a class attribute
    #[error("Pointer type {0} cannot be decoded outside a class attribute")]
    BarePointer(String),

    /// Malformed value bytes
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Resolved object is not an instance of the pointer's target type
    #[error("Reference expected {expected}, found {actual}")]
    RefTypeMismatch { expected: String, actual: String },

    // ---- lookup ----
    /// Group id not present in the graph directory
    #[error("Group not found: {0}")]
    GroupNotFound(u32),

    /// Object index outside the group
    #[error("Object index {index} out of bounds for group {group} (count: {count})")]
    ObjectOutOfBounds { group: u32, index: usize, count: usize },

    /// Archive file index outside the graph's file table
    #[error("File index {index} out of bounds (count: {count})")]
    FileOutOfBounds { index: usize, count: usize },

    /// Device prefix has no mount
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// Device path that would leave its mounted root
    #[error("Path escapes its device root: {0}")]
    PathEscapesRoot(String),

    /// Streaming data source has no locator or no bytes
    #[error("Streaming data source is not present")]
    DataSourceAbsent,

    // ---- io ----
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON schema, graph or config could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid data error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a corrupt archive error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptArchive(msg.into())
    }

    /// Create an invalid schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::InvalidSchema(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTypeName(_)
            | Self::UnknownTypeId(_)
            | Self::UnexpectedTypeKind { .. }
            | Self::TypeIdCollision { .. }
            | Self::MissingCallback(_)
            | Self::MissingAtomDecoder(_)
            | Self::SizeMismatch { .. }
            | Self::InvalidSchema(_) => ErrorKind::Schema,

            Self::InvalidMagic(_)
            | Self::UnsupportedVersion { .. }
            | Self::UnsupportedCompression(_)
            | Self::CorruptArchive(_)
            | Self::ChecksumMismatch { .. }
            | Self::UnexpectedEof { .. }
            | Self::BarePointer(_)
            | Self::InvalidData(_)
            | Self::RefTypeMismatch { .. } => ErrorKind::Format,

            Self::GroupNotFound(_)
            | Self::ObjectOutOfBounds { .. }
            | Self::FileOutOfBounds { .. }
            | Self::UnknownDevice(_)
            | Self::PathEscapesRoot(_)
            | Self::DataSourceAbsent => ErrorKind::Lookup,

            Self::FileNotFound(_) | Self::MmapFailed(_) | Self::Io(_) | Self::Json(_) => {
                ErrorKind::Io
            }
        }
    }
}

/// Result type alias for streaming operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic(0x1234);
        assert!(e.to_string().contains("magic"));

        let e = Error::ObjectOutOfBounds { group: 7, index: 5, count: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::UnknownTypeId(1).kind(), ErrorKind::Schema);
        assert_eq!(
            Error::SizeMismatch { type_name: "A".into(), declared: 4, consumed: 3 }.kind(),
            ErrorKind::Schema
        );
        assert_eq!(Error::UnsupportedCompression(2).kind(), ErrorKind::Format);
        assert_eq!(Error::ChecksumMismatch { expected: 1, actual: 2 }.kind(), ErrorKind::Format);
        assert_eq!(Error::GroupNotFound(9).kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
