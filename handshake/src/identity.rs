//! Ed25519 identities.
//!
//! A node is identified by its long-term Ed25519 public key. Key types keep
//! the raw encoding alongside the parsed key so encoding never re-derives it.

use bytes::{Buf, BufMut};
use ed25519_consensus::VerificationKey;
use hawser_codec::{varint, Error as CodecError, FixedSize, Read, Write};
use rand::{rngs::StdRng, CryptoRng, Rng, SeedableRng};
use std::fmt::{Debug, Display};
use thiserror::Error;

const PRIVATE_KEY_LENGTH: usize = 32;
const PUBLIC_KEY_LENGTH: usize = 32;
const SIGNATURE_LENGTH: usize = 64;

/// Errors that can occur when parsing identity material.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid private key length")]
    InvalidPrivateKeyLength,
    #[error("invalid public key length")]
    InvalidPublicKeyLength,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid signature length")]
    InvalidSignatureLength,
}

/// Prefixes `msg` with the length-delimited `namespace` so a signature can
/// never be replayed by another protocol sharing the same keys.
fn union_unique(namespace: &[u8], msg: &[u8]) -> Vec<u8> {
    let len = namespace.len() as u64;
    let mut payload = Vec::with_capacity(varint::size(len) + namespace.len() + msg.len());
    varint::write(len, &mut payload);
    payload.extend_from_slice(namespace);
    payload.extend_from_slice(msg);
    payload
}

fn hex(bytes: &[u8]) -> String {
    let mut encoded = String::new();
    for byte in bytes.iter() {
        encoded.push_str(&format!("{:02x}", byte));
    }
    encoded
}

/// Ed25519 private key.
#[derive(Clone)]
pub struct PrivateKey {
    raw: [u8; PRIVATE_KEY_LENGTH],
    key: ed25519_consensus::SigningKey,
}

impl PrivateKey {
    /// Generates a private key from `rng`.
    pub fn from_rng<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        let key = ed25519_consensus::SigningKey::new(rng);
        Self {
            raw: key.to_bytes(),
            key,
        }
    }

    /// Generates a private key from a seed.
    ///
    /// # Warning
    ///
    /// This is insecure and should only be used for examples and testing.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::from_rng(&mut rng)
    }

    /// Returns the public key for this private key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.key.verification_key())
    }

    /// Signs `msg` under `namespace`.
    pub fn sign(&self, namespace: &[u8], msg: &[u8]) -> Signature {
        Signature::from(self.key.sign(&union_unique(namespace, msg)))
    }
}

impl AsRef<[u8]> for PrivateKey {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl TryFrom<&[u8]> for PrivateKey {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; PRIVATE_KEY_LENGTH] = value
            .try_into()
            .map_err(|_| Error::InvalidPrivateKeyLength)?;
        let key = ed25519_consensus::SigningKey::from(raw);
        Ok(Self { raw, key })
    }
}

/// Ed25519 public key.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PublicKey {
    raw: [u8; PUBLIC_KEY_LENGTH],
    key: VerificationKey,
}

impl PublicKey {
    /// Verifies `signature` over `msg` under `namespace`.
    pub fn verify(&self, namespace: &[u8], msg: &[u8], signature: &Signature) -> bool {
        self.key
            .verify(&signature.signature, &union_unique(namespace, msg))
            .is_ok()
    }
}

impl Write for PublicKey {
    fn write(&self, buf: &mut impl BufMut) {
        self.raw.write(buf);
    }
}

impl Read for PublicKey {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let raw = <[u8; PUBLIC_KEY_LENGTH]>::read(buf)?;
        let key = VerificationKey::try_from(raw.as_ref())
            .map_err(|_| CodecError::Invalid("PublicKey", "not a curve point"))?;
        Ok(Self { raw, key })
    }
}

impl FixedSize for PublicKey {
    const SIZE: usize = PUBLIC_KEY_LENGTH;
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl From<VerificationKey> for PublicKey {
    fn from(key: VerificationKey) -> Self {
        let raw = key.to_bytes();
        Self { raw, key }
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; PUBLIC_KEY_LENGTH] = value
            .try_into()
            .map_err(|_| Error::InvalidPublicKeyLength)?;
        let key = VerificationKey::try_from(value).map_err(|_| Error::InvalidPublicKey)?;
        Ok(Self { raw, key })
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

/// Ed25519 signature.
#[derive(Clone, Eq, PartialEq)]
pub struct Signature {
    raw: [u8; SIGNATURE_LENGTH],
    signature: ed25519_consensus::Signature,
}

impl Write for Signature {
    fn write(&self, buf: &mut impl BufMut) {
        self.raw.write(buf);
    }
}

impl Read for Signature {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let raw = <[u8; SIGNATURE_LENGTH]>::read(buf)?;
        let signature = ed25519_consensus::Signature::from(raw);
        Ok(Self { raw, signature })
    }
}

impl FixedSize for Signature {
    const SIZE: usize = SIGNATURE_LENGTH;
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl From<ed25519_consensus::Signature> for Signature {
    fn from(signature: ed25519_consensus::Signature) -> Self {
        let raw = signature.to_bytes();
        Self { raw, signature }
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; SIGNATURE_LENGTH] = value
            .try_into()
            .map_err(|_| Error::InvalidSignatureLength)?;
        let signature = ed25519_consensus::Signature::from(raw);
        Ok(Self { raw, signature })
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawser_codec::{Decode, Encode};
    use rand::rngs::OsRng;

    const NAMESPACE: &[u8] = b"test_namespace";

    #[test]
    fn test_sign_and_verify() {
        let signer = PrivateKey::from_rng(&mut OsRng);
        let message = b"hello";
        let signature = signer.sign(NAMESPACE, message);
        assert!(signer.public_key().verify(NAMESPACE, message, &signature));
    }

    #[test]
    fn test_verify_wrong_namespace() {
        let signer = PrivateKey::from_rng(&mut OsRng);
        let message = b"hello";
        let signature = signer.sign(NAMESPACE, message);
        assert!(!signer
            .public_key()
            .verify(b"other_namespace", message, &signature));
    }

    #[test]
    fn test_verify_wrong_message() {
        let signer = PrivateKey::from_rng(&mut OsRng);
        let signature = signer.sign(NAMESPACE, b"hello");
        assert!(!signer.public_key().verify(NAMESPACE, b"world", &signature));
    }

    #[test]
    fn test_verify_wrong_signer() {
        let signer = PrivateKey::from_seed(0);
        let other = PrivateKey::from_seed(1);
        let message = b"hello";
        let signature = signer.sign(NAMESPACE, message);
        assert!(!other.public_key().verify(NAMESPACE, message, &signature));
    }

    #[test]
    fn test_verify_tampered_signature() {
        let signer = PrivateKey::from_rng(&mut OsRng);
        let message = b"hello";
        let signature = signer.sign(NAMESPACE, message);
        let mut raw = signature.raw;
        raw[0] ^= 0xFF;
        let tampered = Signature::try_from(raw.as_ref()).unwrap();
        assert!(!signer.public_key().verify(NAMESPACE, message, &tampered));
    }

    #[test]
    fn test_from_seed_deterministic() {
        let a = PrivateKey::from_seed(42);
        let b = PrivateKey::from_seed(42);
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.public_key(), PrivateKey::from_seed(43).public_key());
    }

    #[test]
    fn test_public_key_codec() {
        let public_key = PrivateKey::from_seed(7).public_key();
        let encoded = public_key.encode();
        assert_eq!(encoded.len(), PublicKey::SIZE);
        let decoded = PublicKey::decode(encoded).unwrap();
        assert_eq!(public_key, decoded);
    }

    #[test]
    fn test_signature_codec() {
        let signature = PrivateKey::from_seed(7).sign(NAMESPACE, b"hello");
        let encoded = signature.encode();
        assert_eq!(encoded.len(), Signature::SIZE);
        let decoded = Signature::decode(encoded).unwrap();
        assert_eq!(signature, decoded);
    }

    #[test]
    fn test_try_from_wrong_length() {
        assert_eq!(
            PublicKey::try_from([0u8; 31].as_ref()).unwrap_err(),
            Error::InvalidPublicKeyLength
        );
        assert_eq!(
            Signature::try_from([0u8; 63].as_ref()).unwrap_err(),
            Error::InvalidSignatureLength
        );
        assert!(matches!(
            PrivateKey::try_from([0u8; 33].as_ref()),
            Err(Error::InvalidPrivateKeyLength)
        ));
    }

    #[test]
    fn test_union_unique_is_unambiguous() {
        // Moving bytes between the namespace and the message must change the
        // signable payload.
        assert_ne!(union_unique(b"ab", b"c"), union_unique(b"a", b"bc"));
        assert_ne!(union_unique(b"", b"abc"), union_unique(b"abc", b""));
    }
}
