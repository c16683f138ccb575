//! Per-direction nonces for the session cipher.

use crate::Error;
use chacha20poly1305::Nonce;

const DIALER_TAG: u8 = 0x80;

/// Strictly increasing counter producing the 12-byte nonce for one direction
/// of traffic.
///
/// Byte 0 carries the direction tag (dialer traffic sets the high bit),
/// bytes 2..4 a 16-bit iteration counter, and bytes 4..12 a 64-bit sequence.
/// The direction tag keeps the two halves of a session from ever producing
/// the same nonce even though they share a key.
pub struct Counter {
    dialer: bool,
    iter: u16,
    seq: u64,
}

impl Counter {
    pub fn new(dialer: bool) -> Self {
        Self {
            dialer,
            iter: 0,
            seq: 0,
        }
    }

    /// Returns the current nonce and advances, failing once every counter
    /// value has been handed out.
    pub fn next(&mut self) -> Result<Nonce, Error> {
        let nonce = self.materialize();
        self.advance()?;
        Ok(nonce)
    }

    fn advance(&mut self) -> Result<(), Error> {
        self.seq = match self.seq.checked_add(1) {
            Some(seq) => seq,
            None => {
                self.iter = self.iter.checked_add(1).ok_or(Error::NonceOverflow)?;
                0
            }
        };
        Ok(())
    }

    fn materialize(&self) -> Nonce {
        let mut nonce = Nonce::default();
        if self.dialer {
            nonce[0] = DIALER_TAG;
        }
        if self.iter > 0 {
            nonce[2..4].copy_from_slice(&self.iter.to_be_bytes());
        }
        nonce[4..].copy_from_slice(&self.seq.to_be_bytes());
        nonce
    }
}
