//! Seals small payloads to a recipient's static x25519 key.
//!
//! Every seal draws a fresh ephemeral key, so two sealed payloads are never
//! linkable and the zero nonce is safe: each derived key encrypts exactly one
//! message. Layout: ephemeral public key (32 bytes) || ciphertext.

use crate::{x25519, Error};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, KeyInit, KeySizeUser, Nonce};
use hkdf::{hmac::digest::typenum::Unsigned, Hkdf};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// The size of the key used by the ChaCha20Poly1305 cipher.
const CHACHA_KEY_SIZE: usize = <ChaCha20Poly1305 as KeySizeUser>::KeySize::USIZE;

/// A constant prefix used for the salt hash in the HKDF key derivation.
/// This prevents key derivation collisions with other uses of the secret.
const SEAL_KDF_PREFIX: &[u8] = b"hawser-handshake/SEAL/v1/";

const SEAL_INFO: &[u8] = b"sealed";

/// Seals `plaintext` to `recipient` using the one-off `secret`.
///
/// `secret` must not be reused: the zero nonce is only safe because each
/// derived key encrypts a single message.
pub fn seal(
    secret: x25519::EphemeralSecret,
    recipient: &x25519::PublicKey,
    plaintext: &[u8],
) -> Result<Vec<u8>, Error> {
    let public = x25519::PublicKey::from(&secret);
    let shared = secret.diffie_hellman(recipient.inner());
    if !shared.was_contributory() {
        return Err(Error::SharedSecretNotContributory);
    }
    let cipher = derive(shared.as_bytes(), public.as_bytes(), recipient.as_bytes())?;
    let ciphertext = cipher
        .encrypt(&Nonce::default(), plaintext)
        .map_err(|_| Error::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(x25519::PUBLIC_KEY_LENGTH + ciphertext.len());
    sealed.extend_from_slice(public.as_bytes());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Opens a payload sealed to `secret`'s public key.
pub fn open(secret: &x25519::StaticSecret, sealed: &[u8]) -> Result<Vec<u8>, Error> {
    if sealed.len() < x25519::PUBLIC_KEY_LENGTH {
        return Err(Error::DecryptionFailed);
    }
    let (public, ciphertext) = sealed.split_at(x25519::PUBLIC_KEY_LENGTH);
    let mut raw = [0u8; x25519::PUBLIC_KEY_LENGTH];
    raw.copy_from_slice(public);
    let ephemeral = x25519::PublicKey::from(raw);

    let shared = secret.diffie_hellman(ephemeral.inner());
    if !shared.was_contributory() {
        return Err(Error::SharedSecretNotContributory);
    }
    let recipient = x25519::PublicKey::from(secret);
    let cipher = derive(shared.as_bytes(), public, recipient.as_bytes())?;
    cipher
        .decrypt(&Nonce::default(), ciphertext)
        .map_err(|_| Error::DecryptionFailed)
}

/// Derives the sealing cipher from the shared secret and both public keys.
fn derive(ikm: &[u8], sealer: &[u8], recipient: &[u8]) -> Result<ChaCha20Poly1305, Error> {
    let mut hasher = Sha256::new();
    hasher.update(SEAL_KDF_PREFIX);
    hasher.update(sealer);
    hasher.update(recipient);
    let salt: [u8; 32] = hasher.finalize().into();

    let prk = Hkdf::<Sha256>::new(Some(&salt), ikm);
    let mut key = [0u8; CHACHA_KEY_SIZE];
    prk.expand(SEAL_INFO, &mut key)
        .map_err(|_| Error::HKDFExpansion)?;
    let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| Error::CipherCreation)?;
    key.zeroize();
    Ok(cipher)
}
