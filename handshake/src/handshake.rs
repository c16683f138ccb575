//! The handshake that turns a raw byte stream into an authenticated session.
//!
//! Identities are exchanged in a plaintext hello, proven inside a sealed
//! authentication payload, and bound to fresh key material by re-sending the
//! hello through the session cipher. Every phase runs under its own deadline
//! and can be canceled from another task.

use crate::{
    cipher,
    frame::{recv_frame, send_frame},
    identity, sealed,
    session::Session,
    wire, x25519, Config, Error, EXTENDED_AUTH_VERSION, PROTOCOL_VERSION,
};
use hawser_codec::{Decode, Encode};
use rand::{CryptoRng, Rng};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::watch,
    time::{sleep_until, Instant},
};
use tracing::{debug, trace};

/// Most padding bytes appended to an extended authentication payload.
///
/// Padding varies the sealed payload's length so an observer cannot pick
/// handshakes out of a stream by size alone.
const MAX_AUTH_PAD: usize = 64;

/// Who opened the transport.
#[derive(Clone, Debug)]
pub enum Direction {
    /// We dialed and expect this identity to answer.
    Dial(identity::PublicKey),
    /// We accepted the connection and learn the peer from its hello.
    Listen,
}

/// Stops an in-flight handshake from another task.
///
/// Cancellation is sticky: once requested, [Handshake::start] fails with
/// [Error::Canceled] (immediately if it has not yet begun). Dropping a
/// canceler does not cancel anything.
#[derive(Clone)]
pub struct Canceler {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceler {
    /// Requests cancellation. Safe to call more than once.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// A prepared handshake.
///
/// All randomness is drawn at construction: the session ephemeral key, the
/// key-derivation nonce, the one-off key that seals the authentication
/// payload, and the padding for the extended encoding. [Handshake::start]
/// performs only I/O and arithmetic.
pub struct Handshake {
    config: Config,
    direction: Direction,
    secret: x25519::EphemeralSecret,
    seal_secret: x25519::EphemeralSecret,
    nonce: [u8; wire::NONCE_LENGTH],
    pad: Vec<u8>,
    cancel: Arc<watch::Sender<bool>>,
    canceled: watch::Receiver<bool>,
}

impl Handshake {
    /// Prepares a handshake in the given direction.
    pub fn new<R: Rng + CryptoRng>(rng: &mut R, config: Config, direction: Direction) -> Self {
        let secret = x25519::new(rng);
        let seal_secret = x25519::new(rng);
        let mut nonce = [0u8; wire::NONCE_LENGTH];
        rng.fill(&mut nonce[..]);
        let mut pad = vec![0u8; rng.gen_range(0..=MAX_AUTH_PAD)];
        rng.fill(pad.as_mut_slice());
        let (cancel, canceled) = watch::channel(false);
        Self {
            config,
            direction,
            secret,
            seal_secret,
            nonce,
            pad,
            cancel: Arc::new(cancel),
            canceled,
        }
    }

    /// Returns a handle that can cancel this handshake.
    pub fn canceler(&self) -> Canceler {
        Canceler {
            tx: self.cancel.clone(),
        }
    }

    /// Runs the handshake over `stream` and returns the established session.
    ///
    /// The peer's hello arrives twice: once in the clear (trusted only for
    /// the key we seal to and the encoding of the authentication payload) and
    /// once through the session cipher. The authenticated copy decides the
    /// negotiated version and capabilities.
    pub async fn start<S: AsyncRead + AsyncWrite + Unpin>(
        self,
        mut stream: S,
    ) -> Result<Session<S>, Error> {
        let Self {
            config,
            direction,
            secret,
            seal_secret,
            nonce,
            pad,
            cancel: _cancel,
            mut canceled,
        } = self;

        // Canceled before any I/O.
        if *canceled.borrow() {
            return Err(Error::Canceled);
        }

        let id = config.signing_key.public_key();
        if let Direction::Dial(ref peer) = direction {
            if *peer == id {
                return Err(Error::DialSelf);
            }
        }

        let timeout = config.phase_timeout;
        let max = config.max_message_size;
        let hello = wire::Hello {
            id: id.clone(),
            version: PROTOCOL_VERSION,
            network: config.network,
            capabilities: config.capabilities.clone(),
            enckey: x25519::PublicKey::from(&config.encryption_key),
        };

        match direction {
            Direction::Dial(peer) => {
                trace!(?peer, "dialing");
                phase(
                    &mut canceled,
                    timeout,
                    send_frame(&mut stream, &hello.encode(), max),
                )
                .await?;
                let msg = phase(&mut canceled, timeout, recv_frame(&mut stream, max)).await?;
                let remote = wire::Hello::decode(msg)?;
                if remote.id != peer {
                    return Err(Error::WrongPeer);
                }

                // The advertised version picks the encoding of the
                // authentication payload.
                let extended = PROTOCOL_VERSION.min(remote.version) >= EXTENDED_AUTH_VERSION;
                let ephemeral = x25519::PublicKey::from(&secret);
                let signature = config
                    .signing_key
                    .sign(&config.namespace, &wire::Auth::signable(&ephemeral, &nonce));
                let auth = wire::Auth {
                    id: id.clone(),
                    ephemeral,
                    nonce,
                    signature,
                };
                let payload = if extended {
                    wire::encode_extended(&auth, &pad)
                } else {
                    auth.encode()
                };
                let sealed_auth = sealed::seal(seal_secret, &remote.enckey, &payload)?;
                phase(
                    &mut canceled,
                    timeout,
                    send_frame(&mut stream, &sealed_auth, max),
                )
                .await?;

                let msg = phase(&mut canceled, timeout, recv_frame(&mut stream, max)).await?;
                let payload = sealed::open(&config.encryption_key, &msg)?;
                let (ack, _) = wire::decode_either::<wire::Ack>(&payload)?;

                let (mut send_cipher, mut recv_cipher) =
                    cipher::derive(secret, &ack.ephemeral, &nonce, &ack.nonce, true)?;
                let confirmed = confirm(
                    &mut stream,
                    &mut canceled,
                    &config,
                    &hello,
                    &mut send_cipher,
                    &mut recv_cipher,
                )
                .await?;
                if confirmed.id != peer {
                    return Err(Error::WrongPeer);
                }
                if confirmed.enckey != remote.enckey {
                    return Err(Error::IdentityMismatch);
                }

                let version = PROTOCOL_VERSION.min(confirmed.version);
                let capabilities = negotiate(&config.capabilities, &confirmed.capabilities);
                debug!(peer = ?confirmed.id, version, "session established");
                Ok(Session::new(
                    stream,
                    send_cipher,
                    recv_cipher,
                    confirmed.id,
                    confirmed.enckey,
                    version,
                    capabilities,
                    max,
                ))
            }
            Direction::Listen => {
                let msg = phase(&mut canceled, timeout, recv_frame(&mut stream, max)).await?;
                let remote = wire::Hello::decode(msg)?;
                if remote.id == id {
                    return Err(Error::DialSelf);
                }
                trace!(peer = ?remote.id, "answering");
                phase(
                    &mut canceled,
                    timeout,
                    send_frame(&mut stream, &hello.encode(), max),
                )
                .await?;

                let msg = phase(&mut canceled, timeout, recv_frame(&mut stream, max)).await?;
                let payload = sealed::open(&config.encryption_key, &msg)?;
                let (auth, extended) = wire::decode_either::<wire::Auth>(&payload)?;
                if auth.id != remote.id {
                    return Err(Error::IdentityMismatch);
                }
                if !auth.id.verify(
                    &config.namespace,
                    &wire::Auth::signable(&auth.ephemeral, &auth.nonce),
                    &auth.signature,
                ) {
                    return Err(Error::InvalidSignature);
                }

                // Reply in whichever encoding the dialer used.
                let ack = wire::Ack {
                    ephemeral: x25519::PublicKey::from(&secret),
                    nonce,
                };
                let payload = if extended {
                    wire::encode_extended(&ack, &pad)
                } else {
                    ack.encode()
                };
                let sealed_ack = sealed::seal(seal_secret, &remote.enckey, &payload)?;
                phase(
                    &mut canceled,
                    timeout,
                    send_frame(&mut stream, &sealed_ack, max),
                )
                .await?;

                let (mut send_cipher, mut recv_cipher) =
                    cipher::derive(secret, &auth.ephemeral, &auth.nonce, &nonce, false)?;
                let confirmed = confirm(
                    &mut stream,
                    &mut canceled,
                    &config,
                    &hello,
                    &mut send_cipher,
                    &mut recv_cipher,
                )
                .await?;
                if confirmed.id != auth.id {
                    return Err(Error::IdentityMismatch);
                }
                if confirmed.enckey != remote.enckey {
                    return Err(Error::IdentityMismatch);
                }

                let version = PROTOCOL_VERSION.min(confirmed.version);
                let capabilities = negotiate(&config.capabilities, &confirmed.capabilities);
                debug!(peer = ?confirmed.id, version, "session established");
                Ok(Session::new(
                    stream,
                    send_cipher,
                    recv_cipher,
                    confirmed.id,
                    confirmed.enckey,
                    version,
                    capabilities,
                    max,
                ))
            }
        }
    }
}

/// Runs one phase of the handshake, racing `io` against the phase deadline
/// and cancellation.
async fn phase<F, T>(
    canceled: &mut watch::Receiver<bool>,
    timeout: Duration,
    io: F,
) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    let deadline = Instant::now() + timeout;
    tokio::select! {
        _ = canceled.changed() => Err(Error::Canceled),
        _ = sleep_until(deadline) => Err(Error::HandshakeTimeout),
        result = io => result,
    }
}

/// Exchanges hellos through the session cipher and returns the peer's
/// authenticated copy.
async fn confirm<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    canceled: &mut watch::Receiver<bool>,
    config: &Config,
    hello: &wire::Hello,
    send_cipher: &mut cipher::SendCipher,
    recv_cipher: &mut cipher::RecvCipher,
) -> Result<wire::Hello, Error> {
    let frame = send_cipher.send(&hello.encode())?;
    phase(
        canceled,
        config.phase_timeout,
        send_frame(
            stream,
            &frame,
            config.max_message_size + cipher::OVERHEAD,
        ),
    )
    .await?;

    let frame = phase(
        canceled,
        config.phase_timeout,
        recv_frame(stream, config.max_message_size + cipher::OVERHEAD),
    )
    .await?;
    let msg = recv_cipher.recv(&frame)?;
    let confirmed = wire::Hello::decode(&msg[..])?;
    if confirmed.network != config.network {
        return Err(Error::NetworkMismatch(confirmed.network));
    }
    Ok(confirmed)
}

/// Intersects capability lists, keeping our preference order and the lower
/// version of each shared protocol.
fn negotiate(ours: &[wire::Capability], theirs: &[wire::Capability]) -> Vec<wire::Capability> {
    let mut shared = Vec::new();
    for capability in ours {
        if let Some(peer) = theirs.iter().find(|c| c.name == capability.name) {
            shared.push(wire::Capability {
                name: capability.name.clone(),
                version: capability.version.min(peer.version),
            });
        }
    }
    shared
}
