use thiserror::Error;

macro_rules! impl_read {
    ($fn_name:ident, $typ:ty) => {
        pub fn $fn_name(&mut self) -> Result<$typ, VeroBufReaderError> {
            let bytes = self.read_array::<{ size_of::<$typ>() }>()?;

            Ok(<$typ>::from_be_bytes(bytes))
        }
    };
}

/// Represents the possible errors that can occur when using `VeroBufReader`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VeroBufReaderError {
    /// A read of `width` bytes starting at `offset` would run past the end
    /// of a buffer holding `len` bytes.
    #[error("Read of {width} bytes at offset {offset} is out of bounds (buffer is {len} bytes)")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// Seeking to a position past the end of the buffer.
    #[error("Failed to seek to {pos}, buffer is {len} bytes")]
    FailedToSeek { pos: usize, len: usize },
}

/// A big-endian cursor over an in-memory font buffer.
///
/// Every read is checked against the length of the underlying slice, a read
/// that does not fit fails with [`VeroBufReaderError::OutOfBounds`] and leaves
/// the cursor where it was.
#[derive(Debug, Clone, Copy)]
pub struct VeroBufReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> VeroBufReader<'a> {
    /// Returns a new reader positioned at the start of `data`
    pub fn from_buffer(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns a reader over `length` bytes starting at `offset`, the
    /// returned reader sees `offset` as its position 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use vero_glyphs::buffer::VeroBufReader;
    ///
    /// let data = [0, 0, 0, 10, 0, 0, 0, 20];
    /// let reader = VeroBufReader::from_buffer(&data);
    ///
    /// let mut second = reader.sub_reader(4, 4).unwrap();
    /// assert_eq!(second.read_u32().unwrap(), 20);
    /// assert!(second.read_u8().is_err());
    /// ```
    pub fn sub_reader(&self, offset: usize, length: usize) -> Result<Self, VeroBufReaderError> {
        Ok(Self::from_buffer(self.slice(offset, length)?))
    }

    /// Borrows `length` bytes starting at `offset` without moving the cursor
    pub fn slice(&self, offset: usize, length: usize) -> Result<&'a [u8], VeroBufReaderError> {
        let out_of_bounds = || VeroBufReaderError::OutOfBounds {
            offset,
            width: length,
            len: self.data.len(),
        };

        let end = offset.checked_add(length).ok_or_else(out_of_bounds)?;
        self.data.get(offset..end).ok_or_else(out_of_bounds)
    }

    /// Seeks to a specific place in the buffer
    /// from the start of the buffer
    pub fn seek_to(&mut self, pos: usize) -> Result<(), VeroBufReaderError> {
        if pos > self.data.len() {
            return Err(VeroBufReaderError::FailedToSeek {
                pos,
                len: self.data.len(),
            });
        }

        self.pos = pos;
        Ok(())
    }

    /// Skips n bytes from the CURRENT cursor position
    pub fn skip(&mut self, n: usize) -> Result<(), VeroBufReaderError> {
        let pos = self.pos.checked_add(n).ok_or(VeroBufReaderError::FailedToSeek {
            pos: usize::MAX,
            len: self.data.len(),
        })?;

        self.seek_to(pos)
    }

    /// The current cursor position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The amount of bytes between the cursor and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The length of the whole underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads `n` bytes and advances the cursor past them
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], VeroBufReaderError> {
        let bytes = self.slice(self.pos, n)?;
        self.pos += n;

        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], VeroBufReaderError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);

        Ok(out)
    }

    /// Reads a 4 byte table tag
    pub fn read_tag(&mut self) -> Result<[u8; 4], VeroBufReaderError> {
        self.read_array::<4>()
    }

    impl_read!(read_i64, i64);
    impl_read!(read_i32, i32);
    impl_read!(read_u32, u32);
    impl_read!(read_i16, i16);
    impl_read!(read_u16, u16);
    impl_read!(read_i8, i8);
    impl_read!(read_u8, u8);
}
