//! Messages exchanged during the handshake.
//!
//! A [Hello] travels in the clear before any keys exist. [Auth] and [Ack] are
//! sealed to the recipient's advertised encryption key and exist in two
//! encodings: the bare fixed-size form and an extended form that prefixes the
//! payload with its length so future revisions can append fields.

use crate::{identity, x25519};
use bytes::{Buf, BufMut, BytesMut};
use hawser_codec::{at_least, EncodeSize, Error as CodecError, FixedSize, Read, Write};
use std::fmt::{Display, Formatter};

/// Size of the random contribution each side makes to key derivation.
pub const NONCE_LENGTH: usize = 32;

/// Maximum number of capabilities a hello may carry.
pub const MAX_CAPABILITIES: usize = 64;

/// The network a node participates in.
///
/// Peers on different networks must not establish sessions, even when they
/// speak compatible protocol versions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Network {
    Live,
    Beta,
    Test,
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Beta => write!(f, "beta"),
            Self::Test => write!(f, "test"),
        }
    }
}

impl Write for Network {
    fn write(&self, buf: &mut impl BufMut) {
        let raw: u8 = match self {
            Self::Live => 0,
            Self::Beta => 1,
            Self::Test => 2,
        };
        raw.write(buf);
    }
}

impl Read for Network {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        match u8::read(buf)? {
            0 => Ok(Self::Live),
            1 => Ok(Self::Beta),
            2 => Ok(Self::Test),
            _ => Err(CodecError::Invalid("Network", "unknown")),
        }
    }
}

impl FixedSize for Network {
    const SIZE: usize = u8::SIZE;
}

/// A protocol a node can speak, by name and version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Capability {
    /// Short protocol name. Must not exceed 255 bytes.
    pub name: String,
    /// Highest version of the protocol the node speaks.
    pub version: u16,
}

impl Write for Capability {
    fn write(&self, buf: &mut impl BufMut) {
        debug_assert!(self.name.len() <= u8::MAX as usize);
        (self.name.len() as u8).write(buf);
        buf.put_slice(self.name.as_bytes());
        self.version.write(buf);
    }
}

impl EncodeSize for Capability {
    fn encode_size(&self) -> usize {
        u8::SIZE + self.name.len() + u16::SIZE
    }
}

impl Read for Capability {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let len = u8::read(buf)? as usize;
        at_least(buf, len)?;
        let mut name = vec![0u8; len];
        buf.copy_to_slice(&mut name);
        let name =
            String::from_utf8(name).map_err(|_| CodecError::Invalid("Capability", "not utf-8"))?;
        let version = u16::read(buf)?;
        Ok(Self { name, version })
    }
}

/// First message on the wire, sent in the clear by both sides.
///
/// Carries everything needed to agree on a protocol version, to detect a
/// network mismatch, and to seal the authentication payload that follows. It
/// is resent through the session cipher once keys are established, and the
/// authenticated copy is the one trusted for negotiation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Hello {
    /// Long-term identity of the sender.
    pub id: identity::PublicKey,
    /// Highest session protocol version the sender speaks.
    pub version: u16,
    /// Network the sender participates in.
    pub network: Network,
    /// Protocols the sender offers, in preference order.
    pub capabilities: Vec<Capability>,
    /// Static x25519 key the sender accepts sealed payloads under.
    pub enckey: x25519::PublicKey,
}

impl Write for Hello {
    fn write(&self, buf: &mut impl BufMut) {
        debug_assert!(self.capabilities.len() <= MAX_CAPABILITIES);
        self.id.write(buf);
        self.version.write(buf);
        self.network.write(buf);
        (self.capabilities.len() as u16).write(buf);
        for capability in &self.capabilities {
            capability.write(buf);
        }
        self.enckey.write(buf);
    }
}

impl EncodeSize for Hello {
    fn encode_size(&self) -> usize {
        identity::PublicKey::SIZE
            + u16::SIZE
            + Network::SIZE
            + u16::SIZE
            + self
                .capabilities
                .iter()
                .map(|capability| capability.encode_size())
                .sum::<usize>()
            + x25519::PublicKey::SIZE
    }
}

impl Read for Hello {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let id = identity::PublicKey::read(buf)?;
        let version = u16::read(buf)?;
        let network = Network::read(buf)?;
        let count = u16::read(buf)? as usize;
        if count > MAX_CAPABILITIES {
            return Err(CodecError::LengthExceeded(count, MAX_CAPABILITIES));
        }
        let mut capabilities = Vec::with_capacity(count);
        for _ in 0..count {
            capabilities.push(Capability::read(buf)?);
        }
        let enckey = x25519::PublicKey::read(buf)?;
        Ok(Self {
            id,
            version,
            network,
            capabilities,
            enckey,
        })
    }
}

/// Authentication payload sent by the dialer, sealed to the listener.
///
/// The signature binds the sender's long-term identity to the ephemeral key
/// and nonce for this session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Auth {
    /// Long-term identity of the sender.
    pub id: identity::PublicKey,
    /// Ephemeral x25519 key for this session.
    pub ephemeral: x25519::PublicKey,
    /// Random contribution to key derivation.
    pub nonce: [u8; NONCE_LENGTH],
    /// Signature over [Auth::signable] under the sender's identity.
    pub signature: identity::Signature,
}

impl Auth {
    /// Payload bound by the signature.
    pub fn signable(ephemeral: &x25519::PublicKey, nonce: &[u8; NONCE_LENGTH]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(x25519::PublicKey::SIZE + NONCE_LENGTH);
        payload.extend_from_slice(ephemeral.as_bytes());
        payload.extend_from_slice(nonce);
        payload
    }
}

impl Write for Auth {
    fn write(&self, buf: &mut impl BufMut) {
        self.id.write(buf);
        self.ephemeral.write(buf);
        self.nonce.write(buf);
        self.signature.write(buf);
    }
}

impl Read for Auth {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let id = identity::PublicKey::read(buf)?;
        let ephemeral = x25519::PublicKey::read(buf)?;
        let nonce = <[u8; NONCE_LENGTH]>::read(buf)?;
        let signature = identity::Signature::read(buf)?;
        Ok(Self {
            id,
            ephemeral,
            nonce,
            signature,
        })
    }
}

impl FixedSize for Auth {
    const SIZE: usize =
        identity::PublicKey::SIZE + x25519::PublicKey::SIZE + NONCE_LENGTH + identity::Signature::SIZE;
}

/// Acknowledgement sent by the listener, sealed to the dialer.
///
/// Carries no signature: the listener proves itself by decrypting the sealed
/// [Auth], which only the holder of the advertised encryption key can do.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ack {
    /// Ephemeral x25519 key for this session.
    pub ephemeral: x25519::PublicKey,
    /// Random contribution to key derivation.
    pub nonce: [u8; NONCE_LENGTH],
}

impl Write for Ack {
    fn write(&self, buf: &mut impl BufMut) {
        self.ephemeral.write(buf);
        self.nonce.write(buf);
    }
}

impl Read for Ack {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let ephemeral = x25519::PublicKey::read(buf)?;
        let nonce = <[u8; NONCE_LENGTH]>::read(buf)?;
        Ok(Self { ephemeral, nonce })
    }
}

impl FixedSize for Ack {
    const SIZE: usize = x25519::PublicKey::SIZE + NONCE_LENGTH;
}

/// Encodes `msg` in the extended form: a u16 length prefix, the fixed-size
/// fields, then `pad`. Receivers ignore the padding, so its length (and the
/// total payload length) can vary freely.
pub fn encode_extended<M: Write + FixedSize>(msg: &M, pad: &[u8]) -> BytesMut {
    let len = M::SIZE + pad.len();
    debug_assert!(len <= u16::MAX as usize);
    let mut buf = BytesMut::with_capacity(u16::SIZE + len);
    (len as u16).write(&mut buf);
    msg.write(&mut buf);
    buf.put_slice(pad);
    buf
}

/// Decodes `msg` as `M`, accepting either encoding.
///
/// A payload of exactly [FixedSize::SIZE] bytes is parsed as the fixed form
/// and any error in it is final. Everything else is parsed as the extended
/// form. Returns whether the extended form was used so a reply can match.
pub fn decode_either<M: Read + FixedSize>(mut buf: &[u8]) -> Result<(M, bool), CodecError> {
    if buf.len() == M::SIZE {
        let msg = M::read(&mut buf)?;
        return Ok((msg, false));
    }
    let declared = u16::read(&mut buf)? as usize;
    if declared < M::SIZE {
        return Err(CodecError::Invalid("extended", "shorter than message"));
    }
    if buf.remaining() != declared {
        return Err(CodecError::Invalid("extended", "length mismatch"));
    }
    let msg = M::read(&mut buf)?;
    Ok((msg, true))
}
