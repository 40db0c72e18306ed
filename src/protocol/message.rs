//! The header + body envelope carried inside every frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HandlerErrorKind, ProtocolErrorKind, RpcError, RpcResult};

/// The single supported protocol version literal.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Wire message sent in place of internal handler failures.
const SANITIZED_HANDLER_ERROR: &str = "request handling failed";

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Message header.
///
/// Field order matters for the wire layout: requests serialize as
/// `{version, type}`, responses as `{status, version[, error]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    #[serde(default)]
    pub version: String,

    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A decoded protocol envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub header: Header,

    #[serde(default = "empty_body")]
    pub body: Value,
}

/// A validated request: version checked, type present.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub request_type: String,
    pub body: Value,
}

fn empty_body() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Message {
    /// Build a request envelope.
    pub fn request(request_type: impl Into<String>, params: Value) -> Self {
        Self {
            header: Header {
                version: PROTOCOL_VERSION.to_string(),
                request_type: Some(request_type.into()),
                ..Header::default()
            },
            body: params,
        }
    }

    /// Build a success response envelope.
    pub fn response_ok(body: Value) -> Self {
        Self {
            header: Header {
                status: Some(Status::Success),
                version: PROTOCOL_VERSION.to_string(),
                ..Header::default()
            },
            body,
        }
    }

    /// Build an error response envelope with an empty body.
    pub fn response_err(message: impl Into<String>) -> Self {
        Self {
            header: Header {
                status: Some(Status::Error),
                version: PROTOCOL_VERSION.to_string(),
                error: Some(message.into()),
                ..Header::default()
            },
            body: empty_body(),
        }
    }

    /// Parse a frame payload.
    ///
    /// Only JSON well-formedness is checked here; use [`Message::into_request`]
    /// or [`Message::into_result`] to enforce the header rules for each side.
    pub fn decode(payload: &[u8]) -> RpcResult<Self> {
        serde_json::from_slice(payload).map_err(|e| RpcError::Protocol {
            kind: ProtocolErrorKind::MalformedJson {
                message: e.to_string(),
            },
        })
    }

    /// Serialize to a frame payload.
    pub fn encode(&self) -> RpcResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Reject anything but the supported version literal.
    pub fn check_version(&self) -> RpcResult<()> {
        if self.header.version.is_empty() {
            return Err(RpcError::Protocol {
                kind: ProtocolErrorKind::MissingField { field: "version" },
            });
        }
        if self.header.version != PROTOCOL_VERSION {
            return Err(RpcError::Protocol {
                kind: ProtocolErrorKind::UnsupportedVersion {
                    version: self.header.version.clone(),
                },
            });
        }
        Ok(())
    }

    /// Validate as a request and split into type and body.
    pub fn into_request(self) -> RpcResult<Request> {
        self.check_version()?;
        let request_type = self.header.request_type.ok_or(RpcError::Protocol {
            kind: ProtocolErrorKind::MissingField { field: "type" },
        })?;
        Ok(Request {
            request_type,
            body: self.body,
        })
    }

    /// Convert a response into a tagged result.
    ///
    /// This is the only place the wire `status` field becomes a `Result`.
    pub fn into_result(self) -> RpcResult<Value> {
        self.check_version()?;
        match self.header.status {
            Some(Status::Success) => Ok(self.body),
            Some(Status::Error) => Err(RpcError::Protocol {
                kind: ProtocolErrorKind::Remote {
                    message: self
                        .header
                        .error
                        .unwrap_or_else(|| "unknown error".to_string()),
                },
            }),
            None => Err(RpcError::Protocol {
                kind: ProtocolErrorKind::MissingField { field: "status" },
            }),
        }
    }

    /// Build a response from a tagged result.
    pub fn from_result(result: RpcResult<Value>, expose_handler_errors: bool) -> Self {
        match result {
            Ok(body) => Self::response_ok(body),
            Err(e) => Self::response_err(wire_error(&e, expose_handler_errors)),
        }
    }

    /// Whether this message carries a success status.
    pub fn is_success(&self) -> bool {
        self.header.status == Some(Status::Success)
    }
}

/// Render an error for the wire `error` field.
///
/// Protocol rejections and parameter errors describe the caller's own
/// request and are sent as is. Internal handler failures collapse to a fixed
/// string unless exposure is enabled; the full text is logged by the worker.
pub fn wire_error(err: &RpcError, expose_handler_errors: bool) -> String {
    match err {
        RpcError::Protocol { kind } => kind.to_string(),
        RpcError::Handler {
            kind: kind @ HandlerErrorKind::Failed { .. },
        } => {
            if expose_handler_errors {
                kind.to_string()
            } else {
                SANITIZED_HANDLER_ERROR.to_string()
            }
        }
        RpcError::Handler { kind } => kind.to_string(),
        _ if expose_handler_errors => err.to_string(),
        _ => SANITIZED_HANDLER_ERROR.to_string(),
    }
}
