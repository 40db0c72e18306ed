//! Wire format for message framing.
//!
//! Frames are length-prefixed: [4 bytes big-endian u32][payload]
//!
//! The async half is used by the server workers, the blocking half by the
//! client connection. Both enforce the same rules: a reader never returns a
//! partial frame, and no maximum frame size is applied. A peer may announce a
//! length up to `u32::MAX`; the payload buffer grows with the bytes that
//! actually arrive rather than being allocated up front.

use std::io::{Read, Write};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{ConnectionErrorKind, FramingErrorKind, RpcError, RpcResult};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Build the 4-byte big-endian length prefix for a payload.
fn length_prefix(payload: &[u8]) -> RpcResult<[u8; LENGTH_PREFIX_SIZE]> {
    let len = u32::try_from(payload.len()).map_err(|_| RpcError::Framing {
        kind: FramingErrorKind::PayloadTooLarge {
            size: payload.len(),
        },
    })?;
    Ok(len.to_be_bytes())
}

/// Encode a payload into a complete frame.
pub fn encode_frame(payload: &[u8]) -> RpcResult<Vec<u8>> {
    let prefix = length_prefix(payload)?;
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&prefix);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Classify a short length-prefix read.
///
/// Zero bytes means the peer closed cleanly between frames; anything else is
/// a torn frame.
fn truncated_prefix(received: usize) -> RpcError {
    if received == 0 {
        RpcError::Connection {
            kind: ConnectionErrorKind::Closed,
        }
    } else {
        RpcError::Framing {
            kind: FramingErrorKind::TruncatedLength { received },
        }
    }
}

fn check_payload(buf: &[u8], expected: usize) -> RpcResult<()> {
    if buf.len() < expected {
        return Err(RpcError::Framing {
            kind: FramingErrorKind::TruncatedPayload {
                received: buf.len(),
                expected,
            },
        });
    }
    Ok(())
}

/// Read a length-prefixed frame from an async reader.
pub async fn read_frame<R>(reader: &mut R) -> RpcResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_SIZE {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            return Err(truncated_prefix(filled));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    let mut buf = Vec::new();
    (&mut *reader).take(len as u64).read_to_end(&mut buf).await?;
    check_payload(&buf, len)?;

    Ok(buf)
}

/// Write a length-prefixed frame to an async writer and flush it.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> RpcResult<()>
where
    W: AsyncWrite + Unpin,
{
    let prefix = length_prefix(payload)?;
    writer.write_all(&prefix).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a frame, failing with a connection timeout after `timeout_duration`.
pub async fn read_frame_with_timeout<R>(
    reader: &mut R,
    timeout_duration: Duration,
) -> RpcResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    timeout(timeout_duration, read_frame(reader))
        .await
        .map_err(|_| RpcError::Connection {
            kind: ConnectionErrorKind::Timeout,
        })?
}

/// Write a frame, failing with a connection timeout after `timeout_duration`.
pub async fn write_frame_with_timeout<W>(
    writer: &mut W,
    payload: &[u8],
    timeout_duration: Duration,
) -> RpcResult<()>
where
    W: AsyncWrite + Unpin,
{
    timeout(timeout_duration, write_frame(writer, payload))
        .await
        .map_err(|_| RpcError::Connection {
            kind: ConnectionErrorKind::Timeout,
        })?
}

/// Read a length-prefixed frame from a blocking reader.
///
/// Timeouts come from the underlying socket configuration.
pub fn read_frame_blocking<R>(reader: &mut R) -> RpcResult<Vec<u8>>
where
    R: Read,
{
    let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_SIZE {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) => return Err(truncated_prefix(filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    check_payload(&buf, len)?;

    Ok(buf)
}

/// Write a length-prefixed frame to a blocking writer and flush it.
pub fn write_frame_blocking<W>(writer: &mut W, payload: &[u8]) -> RpcResult<()>
where
    W: Write,
{
    let prefix = length_prefix(payload)?;
    writer.write_all(&prefix)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_write_and_read_frame() {
        let mut buffer = Vec::new();
        let message = b"hello world";

        write_frame(&mut buffer, message).await.unwrap();

        assert_eq!(&buffer[0..4], &[0, 0, 0, 11]);
        assert_eq!(&buffer[4..], message);

        let mut cursor = Cursor::new(buffer);
        let result = read_frame(&mut cursor).await.unwrap();
        assert_eq!(result, message);
    }

    #[tokio::test]
    async fn test_empty_and_multibyte_payloads() {
        for payload in ["", "北京的常住人口有多少？", "{\"query\":\"ünïcödé 🚀\"}"] {
            let frame = encode_frame(payload.as_bytes()).unwrap();
            let mut cursor = Cursor::new(frame);
            let decoded = read_frame(&mut cursor).await.unwrap();
            assert_eq!(decoded, payload.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_reads_frames_back_to_back() {
        let mut stream = encode_frame(b"first").unwrap();
        stream.extend(encode_frame(b"second").unwrap());

        let mut cursor = Cursor::new(stream);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), b"first");
        assert_eq!(read_frame(&mut cursor).await.unwrap(), b"second");
        assert!(read_frame(&mut cursor)
            .await
            .unwrap_err()
            .is_connection_closed());
    }

    #[tokio::test]
    async fn test_truncated_length_prefix() {
        let mut cursor = Cursor::new(vec![0u8, 0]);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(
            result,
            Err(RpcError::Framing {
                kind: FramingErrorKind::TruncatedLength { received: 2 }
            })
        ));
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let mut data = 10u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"abc");

        let mut cursor = Cursor::new(data);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(
            result,
            Err(RpcError::Framing {
                kind: FramingErrorKind::TruncatedPayload {
                    received: 3,
                    expected: 10
                }
            })
        ));
    }

    #[tokio::test]
    async fn test_huge_announced_length_does_not_preallocate() {
        // Announces ~4 GiB but delivers 4 bytes
        let mut data = u32::MAX.to_be_bytes().to_vec();
        data.extend_from_slice(b"tiny");

        let mut cursor = Cursor::new(data);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(
            result,
            Err(RpcError::Framing {
                kind: FramingErrorKind::TruncatedPayload { received: 4, .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (_client, mut server) = tokio::io::duplex(64);
        let result = read_frame_with_timeout(&mut server, Duration::from_millis(20)).await;
        assert!(matches!(
            result,
            Err(RpcError::Connection {
                kind: ConnectionErrorKind::Timeout
            })
        ));
    }

    #[test]
    fn test_blocking_round_trip() {
        let mut buffer = Vec::new();
        write_frame_blocking(&mut buffer, "multi-byte: 数据".as_bytes()).unwrap();

        let mut cursor = Cursor::new(buffer);
        let decoded = read_frame_blocking(&mut cursor).unwrap();
        assert_eq!(decoded, "multi-byte: 数据".as_bytes());
    }

    #[test]
    fn test_blocking_clean_close_vs_torn_frame() {
        let mut empty = Cursor::new(Vec::new());
        assert!(read_frame_blocking(&mut empty)
            .unwrap_err()
            .is_connection_closed());

        let mut torn = Cursor::new(vec![0u8, 0, 0]);
        assert!(matches!(
            read_frame_blocking(&mut torn),
            Err(RpcError::Framing {
                kind: FramingErrorKind::TruncatedLength { received: 3 }
            })
        ));
    }
}
