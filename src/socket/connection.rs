//! Blocking client-side connection.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{ConnectionErrorKind, RpcError, RpcResult};
use crate::protocol::{read_frame_blocking, write_frame_blocking, Message};

/// One TCP stream with read/write timeouts and an open/closed state.
///
/// Any transport or framing failure closes the connection; it is never reused
/// after an error. Dropping the connection closes it.
#[derive(Debug)]
pub struct Connection {
    stream: Option<TcpStream>,
    peer: SocketAddr,
}

impl Connection {
    /// Connect to `addr`, trying each resolved address in turn.
    pub fn open(addr: &str, connect_timeout: Duration, io_timeout: Duration) -> RpcResult<Self> {
        let candidates: Vec<SocketAddr> = addr
            .to_socket_addrs()
            .map_err(|e| RpcError::Connection {
                kind: ConnectionErrorKind::Io(e),
            })?
            .collect();

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(io_timeout))?;
                    stream.set_write_timeout(Some(io_timeout))?;
                    stream.set_nodelay(true)?;
                    debug!(peer = %candidate, "Connected");
                    return Ok(Self {
                        stream: Some(stream),
                        peer: candidate,
                    });
                }
                Err(e) => {
                    trace!(peer = %candidate, error = %e, "Connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) if e.kind() == io::ErrorKind::ConnectionRefused => RpcError::Connection {
                kind: ConnectionErrorKind::Refused {
                    addr: addr.to_string(),
                },
            },
            Some(e) => e.into(),
            None => RpcError::Connection {
                kind: ConnectionErrorKind::Io(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("{} resolved to no addresses", addr),
                )),
            },
        })
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the connection is still usable.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&mut self) -> RpcResult<&mut TcpStream> {
        self.stream.as_mut().ok_or(RpcError::Connection {
            kind: ConnectionErrorKind::NotConnected,
        })
    }

    /// Close the connection if a result carries a dead-connection error.
    fn check<T>(&mut self, result: RpcResult<T>) -> RpcResult<T> {
        if let Err(e) = &result {
            if e.is_retryable() {
                self.close();
            }
        }
        result
    }

    /// Write one frame and flush.
    pub fn write_frame(&mut self, payload: &[u8]) -> RpcResult<()> {
        let result = self
            .stream()
            .and_then(|stream| write_frame_blocking(stream, payload));
        self.check(result)
    }

    /// Block until one complete frame arrives.
    pub fn read_frame(&mut self) -> RpcResult<Vec<u8>> {
        let result = self.stream().and_then(read_frame_blocking);
        self.check(result)
    }

    /// Send a message and wait for the reply envelope.
    pub fn round_trip(&mut self, message: &Message) -> RpcResult<Message> {
        let payload = message.encode()?;
        self.write_frame(&payload)?;
        let reply = self.read_frame()?;
        Message::decode(&reply)
    }

    /// Close the connection. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone
            let _ = stream.shutdown(Shutdown::Both);
            debug!(peer = %self.peer, "Connection closed");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = Connection::open(
            &format!("127.0.0.1:{}", port),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert!(matches!(
            result,
            Err(RpcError::Connection {
                kind: ConnectionErrorKind::Refused { .. }
            })
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut conn =
            Connection::open(&addr, Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        assert!(conn.is_open());
        conn.close();
        conn.close();
        assert!(!conn.is_open());
        assert!(matches!(
            conn.write_frame(b"{}"),
            Err(RpcError::Connection {
                kind: ConnectionErrorKind::NotConnected
            })
        ));
    }

    #[test]
    fn test_read_timeout_closes_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut conn =
            Connection::open(&addr, Duration::from_secs(1), Duration::from_millis(50)).unwrap();
        let _accepted = listener.accept().unwrap();

        let result = conn.read_frame();
        assert!(matches!(
            result,
            Err(RpcError::Connection {
                kind: ConnectionErrorKind::Timeout
            })
        ));
        assert!(!conn.is_open());
    }
}
