//! Codec implementations for primitive types.
//!
//! All integers are written big-endian to avoid host-endian ambiguity.

use crate::{at_least, Error, FixedSize, Read, Write};
use bytes::{Buf, BufMut};

// Unsigned integer implementations
macro_rules! impl_uint {
    ($type:ty, $read_method:ident, $write_method:ident) => {
        impl Write for $type {
            #[inline]
            fn write(&self, buf: &mut impl BufMut) {
                buf.$write_method(*self);
            }
        }

        impl Read for $type {
            #[inline]
            fn read(buf: &mut impl Buf) -> Result<Self, Error> {
                at_least(buf, std::mem::size_of::<$type>())?;
                Ok(buf.$read_method())
            }
        }

        impl FixedSize for $type {
            const SIZE: usize = std::mem::size_of::<$type>();
        }
    };
}

impl_uint!(u8, get_u8, put_u8);
impl_uint!(u16, get_u16, put_u16);
impl_uint!(u32, get_u32, put_u32);
impl_uint!(u64, get_u64, put_u64);

// Constant-size byte array implementation
impl<const N: usize> Write for [u8; N] {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(self);
    }
}

impl<const N: usize> Read for [u8; N] {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        at_least(buf, N)?;
        let mut out = [0u8; N];
        buf.copy_to_slice(&mut out);
        Ok(out)
    }
}

impl<const N: usize> FixedSize for [u8; N] {
    const SIZE: usize = N;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decode, Encode};

    #[test]
    fn test_uint_roundtrip() {
        let values = (0x01u8, 0x0203u16, 0x04050607u32, 0x08090a0b0c0d0e0fu64);
        assert_eq!(u8::decode(values.0.encode()).unwrap(), values.0);
        assert_eq!(u16::decode(values.1.encode()).unwrap(), values.1);
        assert_eq!(u32::decode(values.2.encode()).unwrap(), values.2);
        assert_eq!(u64::decode(values.3.encode()).unwrap(), values.3);
    }

    #[test]
    fn test_uint_big_endian() {
        assert_eq!(&0x0102u16.encode()[..], &[0x01, 0x02]);
        assert_eq!(&0x01020304u32.encode()[..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_array_roundtrip() {
        let value = [0xABu8; 32];
        let encoded = value.encode();
        assert_eq!(encoded.len(), <[u8; 32]>::SIZE);
        assert_eq!(<[u8; 32]>::decode(encoded).unwrap(), value);
    }

    #[test]
    fn test_array_truncated() {
        let short = [0u8; 16];
        assert!(matches!(
            <[u8; 32]>::decode(&short[..]),
            Err(Error::EndOfBuffer)
        ));
    }
}
