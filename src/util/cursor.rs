//! Bounds-checked little-endian cursor over a byte slice.

use byteorder::{ByteOrder, LittleEndian};

use super::{Error, Result};

/// Forward-only reader over borrowed bytes.
///
/// Every read checks the remaining length first and fails with
/// [`Error::UnexpectedEof`] instead of panicking, so truncated records
/// surface as errors.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the slice.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying slice.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::UnexpectedEof {
                pos: self.pos as u64,
                needed: (n - self.remaining()) as u64,
            });
        }
        Ok(())
    }

    /// Borrow the next `n` bytes and advance.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Split off a sub-cursor over the next `n` bytes and advance past them.
    pub fn sub_cursor(&mut self, n: usize) -> Result<ByteCursor<'a>> {
        Ok(ByteCursor::new(self.read_bytes(n)?))
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    #[inline]
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.read_bytes(8)?))
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    #[inline]
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.read_bytes(8)?))
    }

    /// Read a count of elements of `elem_size` bytes, checking the byte span
    /// fits before anything is allocated.
    fn array_span(&mut self, count: usize, elem_size: usize) -> Result<&'a [u8]> {
        let span = count
            .checked_mul(elem_size)
            .ok_or_else(|| Error::invalid(format!("array of {} elements overflows", count)))?;
        self.read_bytes(span)
    }

    pub fn read_i16_array(&mut self, count: usize) -> Result<Vec<i16>> {
        let src = self.array_span(count, 2)?;
        let mut out = vec![0i16; count];
        LittleEndian::read_i16_into(src, &mut out);
        Ok(out)
    }

    pub fn read_i32_array(&mut self, count: usize) -> Result<Vec<i32>> {
        let src = self.array_span(count, 4)?;
        let mut out = vec![0i32; count];
        LittleEndian::read_i32_into(src, &mut out);
        Ok(out)
    }

    pub fn read_i64_array(&mut self, count: usize) -> Result<Vec<i64>> {
        let src = self.array_span(count, 8)?;
        let mut out = vec![0i64; count];
        LittleEndian::read_i64_into(src, &mut out);
        Ok(out)
    }
}
