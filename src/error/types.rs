//! Error types for the MCP RPC protocol.

use std::io;

use thiserror::Error;

/// Main error type for protocol, server and client operations.
#[derive(Error, Debug)]
pub enum RpcError {
    /// Transport failures. The connection is dead; retry on a fresh one.
    #[error("Connection error: {kind}")]
    Connection { kind: ConnectionErrorKind },

    /// Malformed length-prefixed stream. Discard the socket.
    #[error("Framing error: {kind}")]
    Framing { kind: FramingErrorKind },

    /// Well-framed but semantically invalid traffic, or an error status from the peer.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// Failures raised by a bound request handler.
    #[error("Handler error: {kind}")]
    Handler { kind: HandlerErrorKind },

    /// Listener setup errors.
    #[error("Socket error: {message}")]
    Socket { message: String },

    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization errors while producing outgoing JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Transport failure kinds.
#[derive(Error, Debug)]
pub enum ConnectionErrorKind {
    #[error("Connection refused by {addr}")]
    Refused { addr: String },

    #[error("Connection timed out")]
    Timeout,

    #[error("Connection closed by peer")]
    Closed,

    #[error("Connection reset by peer")]
    Reset,

    #[error("Broken pipe")]
    BrokenPipe,

    #[error("Not connected")]
    NotConnected,

    #[error("I/O failure: {0}")]
    Io(io::Error),
}

/// Framing failure kinds.
#[derive(Error, Debug)]
pub enum FramingErrorKind {
    #[error("Stream ended after {received} of 4 length bytes")]
    TruncatedLength { received: usize },

    #[error("Stream ended after {received} of {expected} payload bytes")]
    TruncatedPayload { received: usize, expected: usize },

    #[error("Payload of {size} bytes does not fit a 32-bit length prefix")]
    PayloadTooLarge { size: usize },
}

/// Protocol failure kinds.
#[derive(Error, Debug)]
pub enum ProtocolErrorKind {
    #[error("Malformed JSON: {message}")]
    MalformedJson { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Unsupported protocol version: {version}")]
    UnsupportedVersion { version: String },

    #[error("Unsupported type: {request_type}")]
    UnsupportedType { request_type: String },

    #[error("Server returned error: {message}")]
    Remote { message: String },

    #[error("Server busy")]
    Busy,
}

/// Handler failure kinds.
#[derive(Error, Debug)]
pub enum HandlerErrorKind {
    #[error("Missing required parameter: {param}")]
    MissingParameter { param: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("{message}")]
    Failed { message: String },
}

impl RpcError {
    /// Shorthand for a handler failure with a free-form message.
    pub fn handler_failed(message: impl Into<String>) -> Self {
        RpcError::Handler {
            kind: HandlerErrorKind::Failed {
                message: message.into(),
            },
        }
    }

    /// Whether the call may be retried on a fresh connection.
    ///
    /// Transport and framing failures say nothing about the request itself;
    /// protocol and handler failures are rejections of the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RpcError::Connection { .. } | RpcError::Framing { .. })
    }

    /// Whether this error is a clean close by the peer between frames.
    pub fn is_connection_closed(&self) -> bool {
        matches!(
            self,
            RpcError::Connection {
                kind: ConnectionErrorKind::Closed
            }
        )
    }
}

impl From<io::Error> for RpcError {
    fn from(e: io::Error) -> Self {
        let kind = match e.kind() {
            io::ErrorKind::ConnectionRefused => ConnectionErrorKind::Refused {
                addr: String::from("peer"),
            },
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ConnectionErrorKind::Timeout,
            io::ErrorKind::UnexpectedEof => ConnectionErrorKind::Closed,
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                ConnectionErrorKind::Reset
            }
            io::ErrorKind::BrokenPipe => ConnectionErrorKind::BrokenPipe,
            io::ErrorKind::NotConnected => ConnectionErrorKind::NotConnected,
            _ => ConnectionErrorKind::Io(e),
        };
        RpcError::Connection { kind }
    }
}

/// Result type alias for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;
