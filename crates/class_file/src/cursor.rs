use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use crate::{ClassFileError, Result};

type Endian = BigEndian;

/// Forward-only big-endian reader over a borrowed byte slice.
///
/// `base` is the absolute offset of the slice within the class file, so a
/// cursor created over an attribute payload still reports file offsets.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    r: Cursor<&'a [u8]>,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_base(buf, 0)
    }

    pub(crate) fn with_base(buf: &'a [u8], base: usize) -> Self {
        Self {
            r: Cursor::new(buf),
            base,
        }
    }

    pub fn position(&self) -> usize {
        self.base + self.local_position()
    }

    pub fn remaining(&self) -> usize {
        self.r.get_ref().len() - self.local_position()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.r.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.r.read_u16::<Endian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.r.read_u32::<Endian>()?)
    }

    /// Reads a constant pool index and hands it to `resolve`. Index errors
    /// report the offset the index was read at.
    pub fn read_index_with<T>(&mut self, resolve: impl FnOnce(u16) -> Result<T>) -> Result<T> {
        let offset = self.position();
        let index = self.read_u16()?;
        resolve(index).map_err(|e| e.at(offset))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let start = self.local_position();
        let buf: &'a [u8] = *self.r.get_ref();
        self.r.set_position((start + n) as u64);
        Ok(&buf[start..start + n])
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Consumes `n` bytes and returns a cursor bounded to exactly those bytes.
    pub fn sub_cursor(&mut self, n: usize) -> Result<ByteCursor<'a>> {
        let base = self.position();
        let bytes = self.read_bytes(n)?;
        Ok(ByteCursor::with_base(bytes, base))
    }

    fn local_position(&self) -> usize {
        self.r.position() as usize
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(ClassFileError::TruncatedInput {
                offset: self.position(),
                needed,
                remaining,
            });
        }

        Ok(())
    }
}
