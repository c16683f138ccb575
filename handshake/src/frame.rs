//! Length-prefixed frames over a raw byte stream.

use crate::Error;
use bytes::Bytes;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Writes `buf` to the sink behind a 4-byte big-endian length prefix.
///
/// Rejects empty payloads and payloads over `max_message_size` before
/// touching the sink.
pub async fn send_frame<S: AsyncWrite + Unpin>(
    sink: &mut S,
    buf: &[u8],
    max_message_size: usize,
) -> Result<(), Error> {
    let n = buf.len();
    if n == 0 {
        return Err(Error::SendZeroSize);
    }
    if n > max_message_size {
        return Err(Error::SendTooLarge(n));
    }
    let len: u32 = n.try_into().map_err(|_| Error::SendTooLarge(n))?;

    sink.write_all(&len.to_be_bytes())
        .await
        .map_err(Error::SendFailed)?;
    sink.write_all(buf).await.map_err(Error::SendFailed)?;
    sink.flush().await.map_err(Error::SendFailed)?;

    Ok(())
}

/// Reads one length-prefixed frame from the stream.
///
/// The declared length is checked against `max_message_size` before any
/// allocation. EOF (clean or mid-frame) and a zero-length prefix both
/// surface as [Error::StreamClosed].
pub async fn recv_frame<S: AsyncRead + Unpin>(
    stream: &mut S,
    max_message_size: usize,
) -> Result<Bytes, Error> {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await.map_err(recv_err)?;

    let len = u32::from_be_bytes(prefix) as usize;
    if len > max_message_size {
        return Err(Error::RecvTooLarge(len));
    }
    if len == 0 {
        return Err(Error::StreamClosed);
    }

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.map_err(recv_err)?;

    Ok(Bytes::from(buf))
}

fn recv_err(err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::UnexpectedEof {
        return Error::StreamClosed;
    }
    Error::RecvFailed(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_MESSAGE_SIZE: usize = 1024;

    #[tokio::test]
    async fn test_send_recv_roundtrip() {
        let (mut dialer, mut listener) = tokio::io::duplex(MAX_MESSAGE_SIZE * 2);

        let buf = [42u8; MAX_MESSAGE_SIZE];
        send_frame(&mut dialer, &buf, MAX_MESSAGE_SIZE).await.unwrap();

        let data = recv_frame(&mut listener, MAX_MESSAGE_SIZE).await.unwrap();
        assert_eq!(data, Bytes::from(buf.to_vec()));
    }

    #[tokio::test]
    async fn test_send_frame_layout() {
        let (mut dialer, mut listener) = tokio::io::duplex(MAX_MESSAGE_SIZE * 2);

        let buf = [7u8; 100];
        send_frame(&mut dialer, &buf, MAX_MESSAGE_SIZE).await.unwrap();

        let mut prefix = [0u8; 4];
        listener.read_exact(&mut prefix).await.unwrap();
        assert_eq!(prefix, 100u32.to_be_bytes());

        let mut body = [0u8; 100];
        listener.read_exact(&mut body).await.unwrap();
        assert_eq!(body, buf);
    }

    #[tokio::test]
    async fn test_send_zero_size() {
        let (mut dialer, _listener) = tokio::io::duplex(64);
        let result = send_frame(&mut dialer, &[], MAX_MESSAGE_SIZE).await;
        assert!(matches!(result, Err(Error::SendZeroSize)));
    }

    #[tokio::test]
    async fn test_send_too_large() {
        let (mut dialer, _listener) = tokio::io::duplex(64);
        let result = send_frame(&mut dialer, &[0u8; 17], 16).await;
        assert!(matches!(result, Err(Error::SendTooLarge(17))));
    }

    #[tokio::test]
    async fn test_recv_too_large() {
        let (mut dialer, mut listener) = tokio::io::duplex(64);

        dialer.write_all(&17u32.to_be_bytes()).await.unwrap();
        let result = recv_frame(&mut listener, 16).await;
        assert!(matches!(result, Err(Error::RecvTooLarge(17))));
    }

    #[tokio::test]
    async fn test_recv_zero_length_prefix() {
        let (mut dialer, mut listener) = tokio::io::duplex(64);

        dialer.write_all(&0u32.to_be_bytes()).await.unwrap();
        let result = recv_frame(&mut listener, MAX_MESSAGE_SIZE).await;
        assert!(matches!(result, Err(Error::StreamClosed)));
    }

    #[tokio::test]
    async fn test_recv_closed_stream() {
        let (dialer, mut listener) = tokio::io::duplex(64);
        drop(dialer);

        let result = recv_frame(&mut listener, MAX_MESSAGE_SIZE).await;
        assert!(matches!(result, Err(Error::StreamClosed)));
    }

    #[tokio::test]
    async fn test_recv_truncated_body() {
        let (mut dialer, mut listener) = tokio::io::duplex(64);

        dialer.write_all(&8u32.to_be_bytes()).await.unwrap();
        dialer.write_all(&[1u8, 2, 3]).await.unwrap();
        drop(dialer);

        let result = recv_frame(&mut listener, MAX_MESSAGE_SIZE).await;
        assert!(matches!(result, Err(Error::StreamClosed)));
    }
}
