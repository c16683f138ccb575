//! An established session.

use crate::{
    cipher::{self, RecvCipher, SendCipher},
    frame::{recv_frame, send_frame},
    identity, wire, x25519, Error,
};
use bytes::Bytes;
use tokio::io::{self, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};

/// An authenticated, encrypted session with a peer.
///
/// Produced by [crate::Handshake::start]. Everything sent after the handshake
/// travels in tagged, encrypted frames. Split the session to send and receive
/// from separate tasks.
pub struct Session<S> {
    stream: S,
    send: SendCipher,
    recv: RecvCipher,
    peer: identity::PublicKey,
    peer_enckey: x25519::PublicKey,
    version: u16,
    capabilities: Vec<wire::Capability>,
    max_message_size: usize,
}

impl<S> Session<S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        stream: S,
        send: SendCipher,
        recv: RecvCipher,
        peer: identity::PublicKey,
        peer_enckey: x25519::PublicKey,
        version: u16,
        capabilities: Vec<wire::Capability>,
        max_message_size: usize,
    ) -> Self {
        Self {
            stream,
            send,
            recv,
            peer,
            peer_enckey,
            version,
            capabilities,
            max_message_size,
        }
    }

    /// The peer's authenticated identity.
    pub fn peer(&self) -> &identity::PublicKey {
        &self.peer
    }

    /// The static key the peer accepts sealed payloads under.
    pub fn peer_enckey(&self) -> &x25519::PublicKey {
        &self.peer_enckey
    }

    /// The negotiated protocol version: the lower of the versions the two
    /// sides speak.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Protocols both sides speak, in our preference order, each at the lower
    /// of the two offered versions.
    pub fn capabilities(&self) -> &[wire::Capability] {
        &self.capabilities
    }
}

impl<S: AsyncRead + AsyncWrite> Session<S> {
    /// Splits the session into independently usable halves.
    pub fn split(self) -> (Sender<S>, Receiver<S>) {
        let (read, write) = io::split(self.stream);
        (
            Sender {
                cipher: self.send,
                sink: write,
                max_message_size: self.max_message_size,
            },
            Receiver {
                cipher: self.recv,
                stream: read,
                max_message_size: self.max_message_size,
            },
        )
    }
}

/// The sending half of a [Session].
pub struct Sender<S> {
    cipher: SendCipher,
    sink: WriteHalf<S>,
    max_message_size: usize,
}

impl<S: AsyncRead + AsyncWrite> Sender<S> {
    /// Encrypts and sends `msg`.
    pub async fn send(&mut self, msg: &[u8]) -> Result<(), Error> {
        let frame = self.cipher.send(msg)?;
        send_frame(
            &mut self.sink,
            &frame,
            self.max_message_size + cipher::OVERHEAD,
        )
        .await
    }
}

/// The receiving half of a [Session].
pub struct Receiver<S> {
    cipher: RecvCipher,
    stream: ReadHalf<S>,
    max_message_size: usize,
}

impl<S: AsyncRead + AsyncWrite> Receiver<S> {
    /// Receives and decrypts one message.
    pub async fn recv(&mut self) -> Result<Bytes, Error> {
        let frame = recv_frame(
            &mut self.stream,
            self.max_message_size + cipher::OVERHEAD,
        )
        .await?;
        Ok(Bytes::from(self.cipher.recv(&frame)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::NONCE_LENGTH;
    use rand::{rngs::StdRng, SeedableRng};

    const MAX_MESSAGE_SIZE: usize = 1024;

    fn session_pair(
        dialer_stream: tokio::io::DuplexStream,
        listener_stream: tokio::io::DuplexStream,
    ) -> (
        Session<tokio::io::DuplexStream>,
        Session<tokio::io::DuplexStream>,
    ) {
        let mut rng = StdRng::seed_from_u64(0);
        let dialer_secret = crate::x25519::new(&mut rng);
        let listener_secret = crate::x25519::new(&mut rng);
        let dialer_public = x25519::PublicKey::from(&dialer_secret);
        let listener_public = x25519::PublicKey::from(&listener_secret);
        let dialer_nonce = [1u8; NONCE_LENGTH];
        let listener_nonce = [2u8; NONCE_LENGTH];

        let (dialer_send, dialer_recv) = cipher::derive(
            dialer_secret,
            &listener_public,
            &dialer_nonce,
            &listener_nonce,
            true,
        )
        .unwrap();
        let (listener_send, listener_recv) = cipher::derive(
            listener_secret,
            &dialer_public,
            &dialer_nonce,
            &listener_nonce,
            false,
        )
        .unwrap();

        let dialer_id = identity::PrivateKey::from_seed(0).public_key();
        let listener_id = identity::PrivateKey::from_seed(1).public_key();
        (
            Session::new(
                dialer_stream,
                dialer_send,
                dialer_recv,
                listener_id,
                listener_public,
                5,
                vec![],
                MAX_MESSAGE_SIZE,
            ),
            Session::new(
                listener_stream,
                listener_send,
                listener_recv,
                dialer_id,
                dialer_public,
                5,
                vec![],
                MAX_MESSAGE_SIZE,
            ),
        )
    }

    #[tokio::test]
    async fn test_send_recv() {
        let (dialer_stream, listener_stream) = tokio::io::duplex(MAX_MESSAGE_SIZE * 4);
        let (dialer, listener) = session_pair(dialer_stream, listener_stream);
        let (mut dialer_sender, mut dialer_receiver) = dialer.split();
        let (mut listener_sender, mut listener_receiver) = listener.split();

        let msg = [3u8; MAX_MESSAGE_SIZE];
        dialer_sender.send(&msg).await.unwrap();
        assert_eq!(listener_receiver.recv().await.unwrap(), msg.to_vec());

        listener_sender.send(&msg).await.unwrap();
        assert_eq!(dialer_receiver.recv().await.unwrap(), msg.to_vec());
    }

    #[tokio::test]
    async fn test_send_too_large() {
        let (dialer_stream, listener_stream) = tokio::io::duplex(MAX_MESSAGE_SIZE * 4);
        let (dialer, _listener) = session_pair(dialer_stream, listener_stream);
        let (mut sender, _receiver) = dialer.split();

        let msg = [3u8; MAX_MESSAGE_SIZE + 1];
        let result = sender.send(&msg).await;
        assert!(matches!(result, Err(Error::SendTooLarge(_))));
    }

    #[tokio::test]
    async fn test_accessors() {
        let (dialer_stream, listener_stream) = tokio::io::duplex(64);
        let (dialer, _listener) = session_pair(dialer_stream, listener_stream);
        assert_eq!(dialer.peer(), &identity::PrivateKey::from_seed(1).public_key());
        assert_eq!(dialer.version(), 5);
        assert!(dialer.capabilities().is_empty());
    }
}
