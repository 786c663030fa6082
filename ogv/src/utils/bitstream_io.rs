//! Bitstream reading utilities for header parsing.
//!
//! Theora headers are packed MSB-first, except for the little-endian length
//! fields of the comment header which are read byte by byte.

use std::io;

use bitstream_io::{BigEndian, BitRead, BitReader, UnsignedInteger};

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger + Default>(&mut self, n: u32) -> io::Result<I> {
        if n == 0 {
            return Ok(I::default());
        }

        match self.bs.read_unsigned_var(n) {
            Ok(val) => Ok(val),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "get_n({}): out of bounds bits at {}",
                    n,
                    self.bs.position_in_bits().unwrap_or(0)
                ),
            )),
            Err(e) => Err(e),
        }
    }

    /// Reads a 32-bit little-endian value from byte-aligned data.
    #[inline(always)]
    pub fn get_u32_le(&mut self) -> io::Result<u32> {
        let mut bytes = [0u8; 4];
        self.bs.read_bytes(&mut bytes)?;

        Ok(u32::from_le_bytes(bytes))
    }

    pub fn get_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        if (len as u64) << 3 > self.available()? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("get_bytes({len}): out of bounds bits"),
            ));
        }

        let mut buf = vec![0; len];
        self.bs.read_bytes(&mut buf)?;

        Ok(buf)
    }

    #[inline(always)]
    pub fn available(&mut self) -> io::Result<u64> {
        self.bs
            .position_in_bits()
            .map(|pos| self.len.saturating_sub(pos))
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}

impl Default for BsIoSliceReader<'_> {
    fn default() -> Self {
        Self::from_slice(&[])
    }
}

/// Number of bits needed to represent `value` (`ilog(0) == 0`).
#[inline(always)]
pub const fn ilog(value: u32) -> u32 {
    u32::BITS - value.leading_zeros()
}

#[test]
fn reads_mixed_widths() -> io::Result<()> {
    let data = [0b1010_0000, 0x01, 0x02, 0x03, 0x04];
    let mut reader = BsIoSliceReader::from_slice(&data);

    assert!(reader.get()?);
    assert_eq!(reader.get_n::<u8>(3)?, 0b010);
    assert_eq!(reader.get_n::<u8>(4)?, 0);
    assert_eq!(reader.get_u32_le()?, 0x0403_0201);
    assert_eq!(reader.available()?, 0);
    assert!(reader.get_n::<u8>(1).is_err());

    assert_eq!(ilog(0), 0);
    assert_eq!(ilog(1), 1);
    assert_eq!(ilog(62), 6);
    assert_eq!(ilog(383), 9);
    Ok(())
}
