//! Random access over the logical byte space of a chunked archive.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, trace};

use super::format::*;
use crate::util::{Error, Result};

/// How an archive is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Memory-map the file instead of seeking through a file handle.
    pub use_mmap: bool,
    /// Keep the most recently decompressed chunk around.
    pub cache_last_chunk: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self { use_mmap: true, cache_last_chunk: true }
    }
}

/// Totals gathered by [`ChunkedArchive::verify`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub chunk_count: usize,
    pub compressed_bytes: u64,
    pub uncompressed_bytes: u64,
}

impl ArchiveStats {
    /// Compressed size as a fraction of the logical size.
    pub fn ratio(&self) -> f64 {
        if self.uncompressed_bytes == 0 {
            return 1.0;
        }
        self.compressed_bytes as f64 / self.uncompressed_bytes as f64
    }
}

enum Source {
    /// Memory-mapped file
    Mmap(Mmap),
    /// Seek + read under a lock
    File(Mutex<File>),
    /// Whole archive in memory
    Memory(Vec<u8>),
}

struct CachedChunk {
    index: usize,
    data: Arc<Vec<u8>>,
}

/// A chunk-compressed archive presented as one flat logical byte range.
///
/// Chunks are independently LZ4-compressed and always decompressed whole.
/// Reads take `&self`; the optional last-chunk cache and the file handle sit
/// behind their own locks. Decompression buffers are allocated per call.
pub struct ChunkedArchive {
    path: Option<PathBuf>,
    source: Source,
    file_size: u64,
    header: ArchiveHeader,
    chunks: Vec<ChunkEntry>,
    cache: Option<Mutex<Option<CachedChunk>>>,
    /// Logical position for the `Read`/`Seek` impls.
    position: u64,
}

impl ChunkedArchive {
    /// Open an archive memory-mapped, with the chunk cache enabled.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, ArchiveOptions::default())
    }

    pub fn open_opts(path: impl AsRef<Path>, opts: ArchiveOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let file_size = file.metadata()?.len();

        let source = if opts.use_mmap && file_size > 0 {
            // Safety: mapped read-only; the archive is not modified while open
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            Source::Mmap(mmap)
        } else {
            Source::File(Mutex::new(file))
        };

        let archive = Self::from_source(source, file_size, Some(path.to_path_buf()), opts)?;
        debug!(
            path = %path.display(),
            chunks = archive.chunks.len(),
            total_size = archive.header.total_size,
            mmap = opts.use_mmap,
            "opened archive"
        );
        Ok(archive)
    }

    /// Archive held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let size = data.len() as u64;
        Self::from_source(Source::Memory(data), size, None, ArchiveOptions::default())
    }

    fn from_source(
        source: Source,
        file_size: u64,
        path: Option<PathBuf>,
        opts: ArchiveOptions,
    ) -> Result<Self> {
        let mut archive = Self {
            path,
            source,
            file_size,
            header: ArchiveHeader::new(0, 0),
            chunks: Vec::new(),
            cache: opts.cache_last_chunk.then(|| Mutex::new(None)),
            position: 0,
        };

        if file_size < HEADER_SIZE as u64 {
            return Err(Error::corrupt(format!("{} bytes is too small for an archive header", file_size)));
        }
        let header = ArchiveHeader::parse(&archive.read_raw(0, HEADER_SIZE)?)?;
        if header.table_end() > file_size {
            return Err(Error::corrupt(format!(
                "chunk table of {} entries does not fit in {} bytes",
                header.chunk_count, file_size
            )));
        }
        let chunks = {
            let table_len = (header.table_end() - HEADER_SIZE as u64) as usize;
            let table = archive.read_raw(HEADER_SIZE as u64, table_len)?;
            table
                .chunks_exact(CHUNK_ENTRY_SIZE)
                .map(ChunkEntry::parse)
                .collect::<Result<Vec<_>>>()?
        };

        validate_chunks(&header, &chunks, file_size)?;

        archive.header = header;
        archive.chunks = chunks;
        Ok(archive)
    }

    /// Raw file bytes, borrowed when the source allows it.
    fn read_raw(&self, pos: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        let end = pos
            .checked_add(len as u64)
            .filter(|&e| e <= self.file_size)
            .ok_or_else(|| Error::UnexpectedEof {
                pos,
                needed: pos.saturating_add(len as u64).saturating_sub(self.file_size),
            })?;
        match &self.source {
            Source::Mmap(mmap) => Ok(Cow::Borrowed(&mmap[pos as usize..end as usize])),
            Source::Memory(data) => Ok(Cow::Borrowed(&data[pos as usize..end as usize])),
            Source::File(file) => {
                let mut f = file.lock();
                f.seek(SeekFrom::Start(pos))?;
                let mut buf = vec![0u8; len];
                f.read_exact(&mut buf)?;
                Ok(Cow::Owned(buf))
            }
        }
    }

    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    #[inline]
    pub fn chunks(&self) -> &[ChunkEntry] {
        &self.chunks
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Size of the logical byte space.
    #[inline]
    pub fn total_size(&self) -> u64 {
        self.header.total_size
    }

    /// Size of the archive file.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Index of the chunk holding logical `offset`.
    pub fn find_chunk(&self, offset: u64) -> Option<usize> {
        let index = self.chunks.partition_point(|c| c.logical_end() <= offset);
        self.chunks.get(index).filter(|c| c.contains(offset)).map(|_| index)
    }

    /// Decompress one chunk into a fresh buffer.
    pub fn decompress_chunk(&self, index: usize) -> Result<Vec<u8>> {
        let chunk = self
            .chunks
            .get(index)
            .ok_or_else(|| Error::corrupt(format!("chunk index {} out of range", index)))?;
        if chunk.method != METHOD_LZ4 {
            return Err(Error::UnsupportedCompression(chunk.method));
        }
        let raw = self.read_raw(chunk.compressed_offset as u64, chunk.compressed_size as usize)?;
        let expected = chunk.uncompressed_size as usize;

        trace!(chunk = index, compressed = raw.len(), size = expected, "decompress chunk");

        let data = lz4_flex::block::decompress(&raw, expected)
            .map_err(|e| Error::corrupt(format!("chunk {}: {}", index, e)))?;
        if data.len() != expected {
            return Err(Error::corrupt(format!(
                "chunk {} decompressed to {} bytes, expected {}",
                index,
                data.len(),
                expected
            )));
        }
        Ok(data)
    }

    fn chunk_data(&self, index: usize) -> Result<Arc<Vec<u8>>> {
        let Some(cache) = &self.cache else {
            return Ok(Arc::new(self.decompress_chunk(index)?));
        };
        if let Some(cached) = cache.lock().as_ref().filter(|c| c.index == index) {
            trace!(chunk = index, "chunk cache hit");
            return Ok(Arc::clone(&cached.data));
        }
        let data = Arc::new(self.decompress_chunk(index)?);
        *cache.lock() = Some(CachedChunk { index, data: Arc::clone(&data) });
        Ok(data)
    }

    /// Read `len` logical bytes starting at `offset`.
    pub fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.range_end(offset, len)?;
        let mut buf = vec![0u8; len];
        self.read_into(offset, &mut buf)?;
        Ok(buf)
    }

    /// End of `[offset, offset + len)` if it lies inside the logical space.
    fn range_end(&self, offset: u64, len: usize) -> Result<u64> {
        offset
            .checked_add(len as u64)
            .filter(|&e| e <= self.header.total_size)
            .ok_or_else(|| Error::UnexpectedEof {
                pos: offset,
                needed: offset
                    .saturating_add(len as u64)
                    .saturating_sub(self.header.total_size),
            })
    }

    /// Fill `buf` from logical `offset`, decompressing every touched chunk.
    pub fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = self.range_end(offset, buf.len())?;

        let mut pos = offset;
        let mut written = 0;
        while pos < end {
            let index = self
                .find_chunk(pos)
                .ok_or_else(|| Error::corrupt(format!("no chunk covers offset {}", pos)))?;
            let chunk = &self.chunks[index];
            let data = self.chunk_data(index)?;

            let within = (pos - chunk.logical_start()) as usize;
            let n = (data.len() - within).min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&data[within..within + n]);

            written += n;
            pos += n as u64;
        }
        Ok(())
    }

    /// Decompress every chunk in parallel and check its size.
    pub fn verify(&self) -> Result<ArchiveStats> {
        let sizes = (0..self.chunks.len())
            .into_par_iter()
            .map(|i| self.decompress_chunk(i).map(|data| data.len() as u64))
            .collect::<Result<Vec<_>>>()?;

        Ok(ArchiveStats {
            chunk_count: self.chunks.len(),
            compressed_bytes: self.chunks.iter().map(|c| c.compressed_size as u64).sum(),
            uncompressed_bytes: sizes.iter().sum(),
        })
    }
}

impl std::fmt::Debug for ChunkedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedArchive")
            .field("path", &self.path)
            .field("file_size", &self.file_size)
            .field("header", &self.header)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl Read for ChunkedArchive {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = self.header.total_size.saturating_sub(self.position);
        let n = (buf.len() as u64).min(left) as usize;
        if n == 0 {
            return Ok(0);
        }
        self.read_into(self.position, &mut buf[..n])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for ChunkedArchive {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(d) => self.header.total_size.checked_add_signed(d),
            SeekFrom::Current(d) => self.position.checked_add_signed(d),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of archive")
        })?;
        self.position = target;
        Ok(target)
    }
}
