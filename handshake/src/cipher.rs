//! Session key derivation and the per-direction frame ciphers.
//!
//! Both sides derive the same encryption and integrity keys. Directionality
//! comes from the nonce: the dialer bit keeps traffic in the two directions
//! from ever sharing a nonce.

use crate::{nonce, wire::NONCE_LENGTH, x25519, Error};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, KeyInit, KeySizeUser};
use hkdf::{hmac::digest::typenum::Unsigned, Hkdf};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The size of the key used by the ChaCha20Poly1305 cipher.
const CHACHA_KEY_SIZE: usize = <ChaCha20Poly1305 as KeySizeUser>::KeySize::USIZE;

/// The size of the key used for frame integrity tags.
const MAC_KEY_SIZE: usize = 32;

/// The length of the AEAD authentication tag appended to the ciphertext.
const AUTHENTICATION_TAG_LENGTH: usize = 16;

/// The length of the keyed integrity tag appended to each frame.
pub const MAC_LENGTH: usize = 32;

/// Bytes added to every message by the authentication and integrity tags.
pub const OVERHEAD: usize = AUTHENTICATION_TAG_LENGTH + MAC_LENGTH;

/// A constant prefix used for the salt hash in the HKDF key derivation.
/// This prevents key derivation collisions with other uses of the secret.
const SESSION_KDF_PREFIX: &[u8] = b"hawser-handshake/KDF/v1/";

// Constant infos for the derived keys.
const TRAFFIC_INFO: &[u8] = b"traffic";
const MAC_INFO: &[u8] = b"mac";

/// Encrypts and tags outbound frames.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct SendCipher {
    #[zeroize(skip)]
    cipher: ChaCha20Poly1305,
    mac_key: [u8; MAC_KEY_SIZE],
    #[zeroize(skip)]
    nonce: nonce::Counter,
}

impl SendCipher {
    /// Encrypts `msg` and appends the integrity tag.
    pub fn send(&mut self, msg: &[u8]) -> Result<Vec<u8>, Error> {
        let nonce = self.nonce.next()?;
        let mut frame = self
            .cipher
            .encrypt(&nonce, msg)
            .map_err(|_| Error::EncryptionFailed)?;

        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.mac_key)
            .map_err(|_| Error::CipherCreation)?;
        mac.update(&nonce);
        mac.update(&frame);
        frame.extend_from_slice(&mac.finalize().into_bytes());
        Ok(frame)
    }
}

/// Verifies and decrypts inbound frames.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct RecvCipher {
    #[zeroize(skip)]
    cipher: ChaCha20Poly1305,
    mac_key: [u8; MAC_KEY_SIZE],
    #[zeroize(skip)]
    nonce: nonce::Counter,
}

impl RecvCipher {
    /// Verifies the integrity tag on `frame` and decrypts the remainder.
    ///
    /// The tag is checked in constant time before the ciphertext is touched.
    pub fn recv(&mut self, frame: &[u8]) -> Result<Vec<u8>, Error> {
        if frame.len() < MAC_LENGTH {
            return Err(Error::InvalidMac);
        }
        let (ciphertext, tag) = frame.split_at(frame.len() - MAC_LENGTH);
        let nonce = self.nonce.next()?;

        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.mac_key)
            .map_err(|_| Error::CipherCreation)?;
        mac.update(&nonce);
        mac.update(ciphertext);
        mac.verify_slice(tag).map_err(|_| Error::InvalidMac)?;

        self.cipher
            .decrypt(&nonce, ciphertext)
            .map_err(|_| Error::DecryptionFailed)
    }
}

/// Derives the session ciphers from the ephemeral exchange.
///
/// Nonces are ordered dialer-then-listener so both sides hash the same salt.
/// The ephemeral secret is consumed: keys for a session can only be derived
/// once.
pub(crate) fn derive(
    secret: x25519::EphemeralSecret,
    peer: &x25519::PublicKey,
    dialer_nonce: &[u8; NONCE_LENGTH],
    listener_nonce: &[u8; NONCE_LENGTH],
    dialer: bool,
) -> Result<(SendCipher, RecvCipher), Error> {
    let shared = secret.diffie_hellman(peer.inner());
    if !shared.was_contributory() {
        return Err(Error::SharedSecretNotContributory);
    }

    let mut hasher = Sha256::new();
    hasher.update(SESSION_KDF_PREFIX);
    hasher.update(dialer_nonce);
    hasher.update(listener_nonce);
    let salt: [u8; 32] = hasher.finalize().into();

    let prk = Hkdf::<Sha256>::new(Some(&salt), shared.as_bytes());
    let mut key = [0u8; CHACHA_KEY_SIZE];
    prk.expand(TRAFFIC_INFO, &mut key)
        .map_err(|_| Error::HKDFExpansion)?;
    let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| Error::CipherCreation)?;
    key.zeroize();

    let mut mac_key = [0u8; MAC_KEY_SIZE];
    prk.expand(MAC_INFO, &mut mac_key)
        .map_err(|_| Error::HKDFExpansion)?;

    Ok((
        SendCipher {
            cipher: cipher.clone(),
            mac_key,
            nonce: nonce::Counter::new(dialer),
        },
        RecvCipher {
            cipher,
            mac_key,
            nonce: nonce::Counter::new(!dialer),
        },
    ))
}
