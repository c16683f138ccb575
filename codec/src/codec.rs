//! Traits for reading and writing wire values.

use crate::error::Error;
use bytes::{Buf, BufMut, BytesMut};

/// Fails with [Error::EndOfBuffer] unless `buf` still holds `len` bytes.
#[inline]
pub fn at_least(buf: &mut impl Buf, len: usize) -> Result<(), Error> {
    if buf.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    Ok(())
}

/// A value that can be appended to a buffer.
pub trait Write {
    /// Appends the encoding of `self` to `buf`.
    ///
    /// Panics if `buf` cannot hold it.
    fn write(&self, buf: &mut impl BufMut);
}

/// A value that knows the length of its encoding up front.
pub trait EncodeSize {
    /// Exact number of bytes [Write::write] appends for this value.
    fn encode_size(&self) -> usize;
}

/// A value that can be parsed back out of a buffer.
pub trait Read: Sized {
    /// Parses one value, consuming exactly the bytes of its encoding.
    fn read(buf: &mut impl Buf) -> Result<Self, Error>;
}

/// A value whose encoding is the same length for every instance.
pub trait FixedSize {
    /// Encoded length in bytes.
    const SIZE: usize;
}

// A constant-size encoding needs no per-value measurement.
impl<T: FixedSize> EncodeSize for T {
    #[inline]
    fn encode_size(&self) -> usize {
        Self::SIZE
    }
}

/// Encoding into an owned buffer, provided for any `Write + EncodeSize`.
pub trait Encode: Write + EncodeSize {
    /// Encodes `self` into a fresh [BytesMut] holding exactly
    /// [EncodeSize::encode_size] bytes.
    ///
    /// Panics if the [Write] implementation appends a different number of
    /// bytes than [EncodeSize] promised.
    fn encode(&self) -> BytesMut {
        let len = self.encode_size();
        let mut buf = BytesMut::with_capacity(len);
        self.write(&mut buf);
        assert_eq!(buf.len(), len, "encoding diverged from encode_size()");
        buf
    }
}

impl<T: Write + EncodeSize> Encode for T {}

/// Whole-buffer decoding, provided for any [Read].
pub trait Decode: Read {
    /// Parses one value and requires it to account for every byte of `buf`.
    fn decode(mut buf: impl Buf) -> Result<Self, Error> {
        let value = Self::read(&mut buf)?;
        let trailing = buf.remaining();
        if trailing > 0 {
            return Err(Error::ExtraData(trailing));
        }
        Ok(value)
    }
}

impl<T: Read> Decode for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    struct Pair {
        left: u16,
        right: u8,
    }

    impl Write for Pair {
        fn write(&self, buf: &mut impl BufMut) {
            self.left.write(buf);
            self.right.write(buf);
        }
    }

    impl FixedSize for Pair {
        const SIZE: usize = u16::SIZE + u8::SIZE;
    }

    impl Read for Pair {
        fn read(buf: &mut impl Buf) -> Result<Self, Error> {
            Ok(Self {
                left: u16::read(buf)?,
                right: u8::read(buf)?,
            })
        }
    }

    #[test]
    fn test_encode_decode() {
        let pair = Pair {
            left: 0x0102,
            right: 0x7F,
        };
        let encoded = pair.encode();
        assert_eq!(encoded.len(), Pair::SIZE);
        assert_eq!(&encoded[..], &[0x01, 0x02, 0x7F]);

        let decoded = Pair::decode(encoded).unwrap();
        assert_eq!(decoded.left, 0x0102);
        assert_eq!(decoded.right, 0x7F);
    }

    #[test]
    fn test_read_past_end() {
        let mut short = Bytes::from_static(&[0x01]);
        assert!(matches!(Pair::read(&mut short), Err(Error::EndOfBuffer)));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let buf = Bytes::from_static(&[0x01, 0x02, 0x7F, 0x00]);
        assert!(matches!(Pair::decode(buf), Err(Error::ExtraData(1))));
    }

    #[test]
    fn test_read_leaves_trailing_bytes() {
        let mut buf = Bytes::from_static(&[0x01, 0x02, 0x7F, 0xAA]);
        Pair::read(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0xAA]);
    }

    #[test]
    fn test_at_least() {
        let mut buf = Bytes::from_static(&[0x00, 0x00]);
        assert!(at_least(&mut buf, 2).is_ok());
        assert!(matches!(at_least(&mut buf, 3), Err(Error::EndOfBuffer)));
    }
}
