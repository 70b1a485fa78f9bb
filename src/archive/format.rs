//! Archive header and chunk table layout.
//!
//! ```text
//! +----------------------+
//! | Header               |  32 bytes
//! +----------------------+
//! | Chunk table          |  chunk_count * 32 bytes
//! +----------------------+
//! | Chunk payloads       |  LZ4 blocks, starting at first_chunk_offset
//! +----------------------+
//! ```

use byteorder::{ByteOrder, LittleEndian};

use crate::util::{Error, Result};

/// "DSAR" read as a little-endian u32.
pub const ARCHIVE_MAGIC: u32 = 0x5241_5344;

pub const VERSION_MAJOR: u16 = 3;
pub const VERSION_MINOR: u16 = 1;

pub const HEADER_SIZE: usize = 32;
pub const CHUNK_ENTRY_SIZE: usize = 32;

/// LZ4 block format, the only accepted chunk method.
pub const METHOD_LZ4: u8 = 3;

/// Default uncompressed chunk size used by the writer.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub magic: u32,
    pub major: u16,
    pub minor: u16,
    pub chunk_count: u32,
    /// File offset of the first chunk payload.
    pub first_chunk_offset: u32,
    /// Size of the logical (uncompressed) byte space.
    pub total_size: u64,
}

impl ArchiveHeader {
    pub fn new(chunk_count: u32, total_size: u64) -> Self {
        Self {
            magic: ARCHIVE_MAGIC,
            major: VERSION_MAJOR,
            minor: VERSION_MINOR,
            chunk_count,
            first_chunk_offset: (HEADER_SIZE + chunk_count as usize * CHUNK_ENTRY_SIZE) as u32,
            total_size,
        }
    }

    /// Parse and validate magic and version.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof {
                pos: 0,
                needed: (HEADER_SIZE - data.len()) as u64,
            });
        }
        let magic = LittleEndian::read_u32(&data[0..4]);
        if magic != ARCHIVE_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }
        let major = LittleEndian::read_u16(&data[4..6]);
        let minor = LittleEndian::read_u16(&data[6..8]);
        if major != VERSION_MAJOR || minor > VERSION_MINOR {
            return Err(Error::UnsupportedVersion { major, minor });
        }
        let header = Self {
            magic,
            major,
            minor,
            chunk_count: LittleEndian::read_u32(&data[8..12]),
            first_chunk_offset: LittleEndian::read_u32(&data[12..16]),
            total_size: LittleEndian::read_u64(&data[16..24]),
        };
        if (header.first_chunk_offset as u64) < header.table_end() {
            return Err(Error::corrupt(format!(
                "first chunk offset {} overlaps the chunk table",
                header.first_chunk_offset
            )));
        }
        Ok(header)
    }

    /// File offset just past the chunk table.
    #[inline]
    pub fn table_end(&self) -> u64 {
        HEADER_SIZE as u64 + self.chunk_count as u64 * CHUNK_ENTRY_SIZE as u64
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; HEADER_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], self.magic);
        LittleEndian::write_u16(&mut buf[4..6], self.major);
        LittleEndian::write_u16(&mut buf[6..8], self.minor);
        LittleEndian::write_u32(&mut buf[8..12], self.chunk_count);
        LittleEndian::write_u32(&mut buf[12..16], self.first_chunk_offset);
        LittleEndian::write_u64(&mut buf[16..24], self.total_size);
        out.extend_from_slice(&buf);
    }
}

/// One record of the chunk table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkEntry {
    pub logical_offset: i64,
    pub compressed_offset: i64,
    pub uncompressed_size: i32,
    pub compressed_size: i32,
    pub method: u8,
}

impl ChunkEntry {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < CHUNK_ENTRY_SIZE {
            return Err(Error::corrupt("truncated chunk table"));
        }
        Ok(Self {
            logical_offset: LittleEndian::read_i64(&data[0..8]),
            compressed_offset: LittleEndian::read_i64(&data[8..16]),
            uncompressed_size: LittleEndian::read_i32(&data[16..20]),
            compressed_size: LittleEndian::read_i32(&data[20..24]),
            method: data[24],
        })
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; CHUNK_ENTRY_SIZE];
        LittleEndian::write_i64(&mut buf[0..8], self.logical_offset);
        LittleEndian::write_i64(&mut buf[8..16], self.compressed_offset);
        LittleEndian::write_i32(&mut buf[16..20], self.uncompressed_size);
        LittleEndian::write_i32(&mut buf[20..24], self.compressed_size);
        buf[24] = self.method;
        out.extend_from_slice(&buf);
    }

    #[inline]
    pub fn logical_start(&self) -> u64 {
        self.logical_offset as u64
    }

    #[inline]
    pub fn logical_end(&self) -> u64 {
        self.logical_offset as u64 + self.uncompressed_size as u64
    }

    #[inline]
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.logical_start() && offset < self.logical_end()
    }
}

/// Check the table against the header and the file size.
///
/// Chunks must tile `[0, total_size)` in order without gaps or overlap, and
/// every payload must lie inside the file after the table.
pub fn validate_chunks(header: &ArchiveHeader, chunks: &[ChunkEntry], file_size: u64) -> Result<()> {
    let mut expected = 0u64;
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.method != METHOD_LZ4 {
            return Err(Error::UnsupportedCompression(chunk.method));
        }
        if chunk.logical_offset < 0
            || chunk.compressed_offset < 0
            || chunk.uncompressed_size < 0
            || chunk.compressed_size < 0
        {
            return Err(Error::corrupt(format!("chunk {} has negative fields", i)));
        }
        if chunk.logical_start() != expected {
            return Err(Error::corrupt(format!(
                "chunk {} starts at {} but {} was expected",
                i, chunk.logical_offset, expected
            )));
        }
        let start = chunk.compressed_offset as u64;
        let end = start + chunk.compressed_size as u64;
        if start < header.first_chunk_offset as u64 || end > file_size {
            return Err(Error::corrupt(format!(
                "chunk {} payload {}..{} outside of file data (size {})",
                i, start, end, file_size
            )));
        }
        expected = chunk.logical_end();
    }
    if expected != header.total_size {
        return Err(Error::corrupt(format!(
            "chunks cover {} bytes, header declares {}",
            expected, header.total_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_spells_dsar() {
        assert_eq!(&ARCHIVE_MAGIC.to_le_bytes(), b"DSAR");
    }

    #[test]
    fn test_header_layout() {
        let header = ArchiveHeader::new(2, 1000);
        let mut buf = Vec::new();
        header.write_to(&mut buf);
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(header.first_chunk_offset, 96);
        assert_eq!(ArchiveHeader::parse(&buf).unwrap(), header);
    }

    #[test]
    fn test_bad_magic_and_version() {
        let mut buf = Vec::new();
        ArchiveHeader::new(0, 0).write_to(&mut buf);

        let mut bad = buf.clone();
        bad[0] = b'X';
        assert!(matches!(ArchiveHeader::parse(&bad), Err(Error::InvalidMagic(_))));

        let mut bad = buf.clone();
        bad[4] = 4;
        assert!(matches!(
            ArchiveHeader::parse(&bad),
            Err(Error::UnsupportedVersion { major: 4, minor: 1 })
        ));

        assert!(ArchiveHeader::parse(&buf[..10]).is_err());
    }

    #[test]
    fn test_chunk_entry_layout() {
        let entry = ChunkEntry {
            logical_offset: 8192,
            compressed_offset: 400,
            uncompressed_size: 8192,
            compressed_size: 120,
            method: METHOD_LZ4,
        };
        let mut buf = Vec::new();
        entry.write_to(&mut buf);
        assert_eq!(buf.len(), CHUNK_ENTRY_SIZE);
        assert_eq!(&buf[0..8], &8192i64.to_le_bytes());
        assert_eq!(&buf[20..24], &120i32.to_le_bytes());
        assert_eq!(buf[24], 3);
        assert!(buf[25..].iter().all(|&b| b == 0));
        assert_eq!(ChunkEntry::parse(&buf).unwrap(), entry);
        assert!(entry.contains(8192));
        assert!(!entry.contains(16384));
    }

    #[test]
    fn test_validate_chunks() {
        let header = ArchiveHeader::new(2, 200);
        let first = header.first_chunk_offset as i64;
        let chunk = |logical: i64, size: i32, at: i64| ChunkEntry {
            logical_offset: logical,
            compressed_offset: at,
            uncompressed_size: size,
            compressed_size: 10,
            method: METHOD_LZ4,
        };
        let good = [chunk(0, 100, first), chunk(100, 100, first + 10)];
        validate_chunks(&header, &good, first as u64 + 20).unwrap();

        let gap = [chunk(0, 100, first), chunk(110, 90, first + 10)];
        assert!(matches!(
            validate_chunks(&header, &gap, first as u64 + 20),
            Err(Error::CorruptArchive(_))
        ));

        let short = [chunk(0, 100, first), chunk(100, 50, first + 10)];
        assert!(validate_chunks(&header, &short, first as u64 + 20).is_err());

        assert!(validate_chunks(&header, &good, first as u64 + 15).is_err());

        let mut zlib = good;
        zlib[1].method = 2;
        assert!(matches!(
            validate_chunks(&header, &zlib, first as u64 + 20),
            Err(Error::UnsupportedCompression(2))
        ));
    }
}
