//! Building archives from a logical byte buffer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use super::format::*;
use crate::util::{Error, Result};

/// Accumulates logical bytes and writes them as an LZ4-chunked archive.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    chunk_size: usize,
    data: Vec<u8>,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ArchiveWriter {
    /// Writer splitting the logical space into chunks of `chunk_size` bytes
    /// (the last chunk may be shorter).
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size: chunk_size.clamp(1, i32::MAX as usize), data: Vec::new() }
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Current logical size.
    #[inline]
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append bytes and return the logical offset they start at.
    pub fn append(&mut self, bytes: &[u8]) -> u64 {
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(bytes);
        offset
    }

    /// Encode `data` as a complete archive.
    pub fn write(&self, data: &[u8]) -> Result<Vec<u8>> {
        let blocks: Vec<Vec<u8>> = data
            .chunks(self.chunk_size)
            .map(lz4_flex::block::compress)
            .collect();
        let chunk_count = u32::try_from(blocks.len())
            .map_err(|_| Error::invalid("too many chunks for one archive"))?;

        let header = ArchiveHeader::new(chunk_count, data.len() as u64);
        let payload_len: usize = blocks.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(header.first_chunk_offset as usize + payload_len);
        header.write_to(&mut out);

        let mut logical = 0i64;
        let mut compressed = header.first_chunk_offset as i64;
        for (raw, block) in data.chunks(self.chunk_size).zip(&blocks) {
            let block_len = i32::try_from(block.len())
                .map_err(|_| Error::invalid("compressed chunk exceeds i32 range"))?;
            ChunkEntry {
                logical_offset: logical,
                compressed_offset: compressed,
                uncompressed_size: raw.len() as i32,
                compressed_size: block_len,
                method: METHOD_LZ4,
            }
            .write_to(&mut out);
            logical += raw.len() as i64;
            compressed += block.len() as i64;
        }
        for block in &blocks {
            out.extend_from_slice(block);
        }

        debug!(chunks = chunk_count, logical = data.len(), file = out.len(), "encoded archive");
        Ok(out)
    }

    /// Encode the accumulated bytes.
    pub fn finish(&self) -> Result<Vec<u8>> {
        self.write(&self.data)
    }

    /// Encode the accumulated bytes into a file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.finish()?;
        let mut file = BufWriter::new(File::create(path.as_ref())?);
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(())
    }
}
