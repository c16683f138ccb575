//! Authenticate peers and establish encrypted sessions over arbitrary transport.
//!
//! # Overview
//!
//! A [Handshake] upgrades any ordered byte stream (implementing tokio's
//! `AsyncRead + AsyncWrite`) into a [Session]: both sides prove control of a
//! long-term ed25519 identity, agree on a protocol version and a set of
//! capabilities, and derive fresh symmetric keys that encrypt and
//! authenticate everything sent afterwards.
//!
//! # Design
//!
//! A handshake exchanges three rounds of messages, each under its own
//! deadline:
//!
//! - **Hello**: both sides send their identity, protocol version, network,
//!   capabilities, and a static x25519 key in the clear. The dialer verifies
//!   it reached the peer it wanted.
//! - **Auth/Ack**: the dialer seals its identity, an ephemeral x25519 key, a
//!   random nonce, and a signature binding them together to the listener's
//!   static key. The listener verifies the signature and answers with its own
//!   ephemeral key and nonce, sealed to the dialer's static key. Peers at
//!   version [EXTENDED_AUTH_VERSION] or later use a length-prefixed encoding
//!   with random padding; older peers use the bare fixed-size encoding, and
//!   the listener always replies in the encoding it received.
//! - **Confirmation**: both sides derive per-direction ciphers from the
//!   ephemeral shared secret and the two nonces, then re-send their hello
//!   through them. The authenticated copy must be consistent with the
//!   plaintext one and is authoritative for negotiation: the session speaks
//!   the lower of the two versions and the capabilities both sides offer.
//!
//! Sessions encrypt every message with ChaCha20-Poly1305 and append an
//! HMAC-SHA256 tag keyed separately, under strictly ordered per-direction
//! nonces. A message replayed, reordered, or dropped by the transport fails
//! to authenticate.
//!
//! Handshakes are bounded: every phase races a deadline
//! ([Config::phase_timeout]) and a [Canceler] that any task can fire.
//!
//! # Example
//!
//! ```
//! use hawser_handshake::{
//!     wire::Network, x25519, Capability, Config, Direction, Handshake, PrivateKey,
//!     DEFAULT_PHASE_TIMEOUT,
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let listener_signer = PrivateKey::from_seed(1);
//! let listener_id = listener_signer.public_key();
//! let dialer_config = Config {
//!     signing_key: PrivateKey::from_seed(0),
//!     encryption_key: x25519::StaticSecret::random_from_rng(&mut rng),
//!     namespace: b"_MY_APP".to_vec(),
//!     network: Network::Test,
//!     capabilities: vec![Capability {
//!         name: "sync".into(),
//!         version: 1,
//!     }],
//!     max_message_size: 1024 * 1024,
//!     phase_timeout: DEFAULT_PHASE_TIMEOUT,
//! };
//! let listener_config = Config {
//!     signing_key: listener_signer,
//!     encryption_key: x25519::StaticSecret::random_from_rng(&mut rng),
//!     ..dialer_config.clone()
//! };
//!
//! tokio::runtime::Runtime::new().unwrap().block_on(async move {
//!     let (dialer_stream, listener_stream) = tokio::io::duplex(4096);
//!     let dialer = Handshake::new(&mut rng, dialer_config, Direction::Dial(listener_id));
//!     let listener = Handshake::new(&mut rng, listener_config, Direction::Listen);
//!
//!     let listener = tokio::spawn(async move { listener.start(listener_stream).await });
//!     let dialer_session = dialer.start(dialer_stream).await.unwrap();
//!     let listener_session = listener.await.unwrap().unwrap();
//!
//!     let (mut sender, _receiver) = dialer_session.split();
//!     let (_sender, mut receiver) = listener_session.split();
//!     sender.send(b"hello").await.unwrap();
//!     assert_eq!(receiver.recv().await.unwrap(), &b"hello"[..]);
//! });
//! ```

use hawser_codec::Error as CodecError;
use std::time::Duration;
use thiserror::Error;

mod cipher;
mod frame;
mod handshake;
pub mod identity;
mod nonce;
mod sealed;
mod session;
pub mod wire;
pub mod x25519;

pub use handshake::{Canceler, Direction, Handshake};
pub use identity::{PrivateKey, PublicKey, Signature};
pub use session::{Receiver, Sender, Session};
pub use wire::{Capability, Network};

/// Highest version of the session protocol this crate speaks.
///
/// Advertised in the hello; a session runs at the lower of the two sides'
/// versions.
pub const PROTOCOL_VERSION: u16 = 5;

/// First version to use the extended authentication encoding.
pub const EXTENDED_AUTH_VERSION: u16 = 5;

/// Default time allotted to each phase of the handshake.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_millis(1800);

/// Errors that can occur when establishing or using a session.
#[derive(Error, Debug)]
pub enum Error {
    // Handshake errors
    #[error("handshake timeout")]
    HandshakeTimeout,
    #[error("handshake canceled")]
    Canceled,
    #[error("cannot dial self")]
    DialSelf,
    #[error("network mismatch: peer is on {0}")]
    NetworkMismatch(Network),

    // Authentication errors
    #[error("wrong peer")]
    WrongPeer,
    #[error("identity mismatch")]
    IdentityMismatch,
    #[error("invalid signature")]
    InvalidSignature,

    // Key agreement errors
    #[error("shared secret was not contributory")]
    SharedSecretNotContributory,
    #[error("unable to expand key material")]
    HKDFExpansion,
    #[error("unable to create cipher")]
    CipherCreation,

    // Connection errors
    #[error("recv failed")]
    RecvFailed(std::io::Error),
    #[error("recv too large: {0} bytes")]
    RecvTooLarge(usize),
    #[error("send failed")]
    SendFailed(std::io::Error),
    #[error("send zero size")]
    SendZeroSize,
    #[error("send too large: {0} bytes")]
    SendTooLarge(usize),
    #[error("stream closed")]
    StreamClosed,

    // Encryption errors
    #[error("nonce overflow")]
    NonceOverflow,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("invalid mac")]
    InvalidMac,

    // Codec errors
    #[error("unable to decode: {0}")]
    UnableToDecode(CodecError),
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        Self::UnableToDecode(err)
    }
}

/// Configuration for a [Handshake].
///
/// # Warning
///
/// Synchronize this configuration across all peers. Mismatched namespaces,
/// networks, or message size limits will cause unnecessary handshake
/// failures.
#[derive(Clone)]
pub struct Config {
    /// The private key used to prove our identity to peers.
    pub signing_key: PrivateKey,

    /// The static x25519 secret whose public half we advertise in the hello.
    /// Peers seal authentication payloads to it.
    pub encryption_key: x25519::StaticSecret,

    /// Prefix for all signed messages to prevent signature replay across
    /// applications that share keys.
    ///
    /// Should be unique to the application.
    pub namespace: Vec<u8>,

    /// The network this node participates in. Sessions are only established
    /// between nodes on the same network.
    pub network: Network,

    /// Protocols this node offers, in preference order.
    pub capabilities: Vec<Capability>,

    /// Maximum size (in bytes) of a message sent over a session. Messages
    /// larger than this are rejected before any allocation.
    pub max_message_size: usize,

    /// Time allotted to each phase of the handshake. The clock resets
    /// whenever a phase completes, so a slow peer cannot hold a connection
    /// open indefinitely.
    pub phase_timeout: Duration,
}
