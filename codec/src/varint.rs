//! Variable-length integer encoding
//!
//! Each byte carries seven value bits; the high bit marks continuation.
//! Encodings must be minimal: a value whose terminal byte contributes no bits
//! is rejected as non-canonical.

use crate::Error;
use bytes::{Buf, BufMut};

const DATA_BITS_MASK: u8 = 0x7F;
const CONTINUATION_BIT_MASK: u8 = 0x80;

/// Returns the encoded size of `value` in bytes.
pub fn size(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    std::cmp::max(1, (bits + 6) / 7)
}

/// Encodes `value` as a varint.
pub fn write(mut value: u64, buf: &mut impl BufMut) {
    while value >= CONTINUATION_BIT_MASK as u64 {
        buf.put_u8((value as u8) | CONTINUATION_BIT_MASK);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Decodes a varint into a `u64`.
pub fn read(buf: &mut impl Buf) -> Result<u64, Error> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(Error::EndOfBuffer);
        }
        let byte = buf.get_u8();

        // The tenth byte holds the final bit of a u64; anything above it
        // overflows.
        if shift == 63 && byte > 1 {
            return Err(Error::InvalidVarint);
        }
        result |= ((byte & DATA_BITS_MASK) as u64) << shift;

        if byte & CONTINUATION_BIT_MASK == 0 {
            // A terminal zero byte after a continuation is non-canonical.
            if byte == 0 && shift != 0 {
                return Err(Error::InvalidVarint);
            }
            return Ok(result);
        }

        shift += 7;
        if shift > 63 {
            return Err(Error::InvalidVarint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = BytesMut::new();
        write(value, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(300), vec![0xAC, 0x02]);

        let mut max = vec![0xFF; 9];
        max.push(0x01);
        assert_eq!(encode(u64::MAX), max);
    }

    #[test]
    fn test_roundtrip_and_size() {
        for value in [0u64, 1, 127, 128, 16383, 16384, u32::MAX as u64, u64::MAX] {
            let encoded = encode(value);
            assert_eq!(encoded.len(), size(value));
            let mut buf = Bytes::from(encoded);
            assert_eq!(read(&mut buf).unwrap(), value);
            assert!(!buf.has_remaining());
        }
    }

    #[test]
    fn test_truncated() {
        let mut buf = Bytes::from_static(&[0x80]);
        assert!(matches!(read(&mut buf), Err(Error::EndOfBuffer)));
    }

    #[test]
    fn test_non_canonical() {
        let mut buf = Bytes::from_static(&[0x80, 0x00]);
        assert!(matches!(read(&mut buf), Err(Error::InvalidVarint)));
    }

    #[test]
    fn test_overflow() {
        let mut encoded = vec![0xFF; 9];
        encoded.push(0x02);
        let mut buf = Bytes::from(encoded);
        assert!(matches!(read(&mut buf), Err(Error::InvalidVarint)));
    }
}
