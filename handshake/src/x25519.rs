//! X25519 keys for the Diffie-Hellman exchanges.

use bytes::{Buf, BufMut};
use hawser_codec::{Error as CodecError, FixedSize, Read, Write};
use rand::{CryptoRng, Rng};
pub use x25519_dalek::{EphemeralSecret, StaticSecret};

pub(crate) const PUBLIC_KEY_LENGTH: usize = 32;

/// Generates a new ephemeral secret from `rng`.
pub fn new<R: Rng + CryptoRng>(rng: &mut R) -> EphemeralSecret {
    EphemeralSecret::random_from_rng(rng)
}

/// X25519 public key that can travel over the wire.
///
/// Any 32-byte string decodes to a key. Low-order points are only rejected
/// once a shared secret is computed from them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PublicKey(x25519_dalek::PublicKey);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        self.0.as_bytes()
    }

    pub(crate) fn inner(&self) -> &x25519_dalek::PublicKey {
        &self.0
    }
}

impl From<&EphemeralSecret> for PublicKey {
    fn from(secret: &EphemeralSecret) -> Self {
        Self(x25519_dalek::PublicKey::from(secret))
    }
}

impl From<&StaticSecret> for PublicKey {
    fn from(secret: &StaticSecret) -> Self {
        Self(x25519_dalek::PublicKey::from(secret))
    }
}

impl From<[u8; PUBLIC_KEY_LENGTH]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(x25519_dalek::PublicKey::from(bytes))
    }
}

impl Write for PublicKey {
    fn write(&self, buf: &mut impl BufMut) {
        self.0.as_bytes().write(buf);
    }
}

impl Read for PublicKey {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let raw = <[u8; PUBLIC_KEY_LENGTH]>::read(buf)?;
        Ok(Self::from(raw))
    }
}

impl FixedSize for PublicKey {
    const SIZE: usize = PUBLIC_KEY_LENGTH;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawser_codec::{Decode, Encode, Error as CodecError};
    use rand::rngs::OsRng;

    #[test]
    fn test_codec_roundtrip() {
        let secret = new(&mut OsRng);
        let public_key = PublicKey::from(&secret);

        let encoded = public_key.encode();
        assert_eq!(encoded.len(), PublicKey::SIZE);
        let decoded = PublicKey::decode(encoded).unwrap();
        assert_eq!(public_key, decoded);
    }

    #[test]
    fn test_decode_short_buffer() {
        let result = PublicKey::decode(&[1u8, 2, 3][..]);
        assert!(matches!(result, Err(CodecError::EndOfBuffer)));
    }

    #[test]
    fn test_static_secret_public_key() {
        let secret = StaticSecret::random_from_rng(&mut OsRng);
        let public_key = PublicKey::from(&secret);
        assert_eq!(
            public_key.as_bytes(),
            x25519_dalek::PublicKey::from(&secret).as_bytes()
        );
    }
}
