//! Handler parameter helpers.

use serde_json::Value;

use crate::error::{HandlerErrorKind, RpcError, RpcResult};

/// Wrapper around a request body with typed accessors.
#[derive(Debug, Clone)]
pub struct HandlerParams {
    inner: Value,
}

fn missing(key: &str) -> RpcError {
    RpcError::Handler {
        kind: HandlerErrorKind::MissingParameter {
            param: key.to_string(),
        },
    }
}

impl HandlerParams {
    /// Create new handler parameters from a JSON value.
    pub fn new(value: Value) -> Self {
        Self { inner: value }
    }

    /// Get the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.inner
    }

    /// Consume the wrapper and return the raw body.
    pub fn into_value(self) -> Value {
        self.inner
    }

    /// Get a required string parameter.
    pub fn get_string(&self, key: &str) -> RpcResult<String> {
        self.inner
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| missing(key))
    }

    /// Get an optional string parameter.
    pub fn get_optional_string(&self, key: &str) -> Option<String> {
        self.inner.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
    }

    /// Get an optional integer parameter.
    ///
    /// Present but non-integer values are rejected rather than ignored.
    pub fn get_optional_i64(&self, key: &str) -> RpcResult<Option<i64>> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v.as_i64().map(Some).ok_or_else(|| RpcError::Handler {
                kind: HandlerErrorKind::InvalidParameter {
                    param: key.to_string(),
                    message: "expected an integer".to_string(),
                },
            }),
        }
    }

    /// Require that a string parameter exists (for validation).
    pub fn require_string(&self, key: &str) -> RpcResult<()> {
        if self.inner.get(key).and_then(|v| v.as_str()).is_some() {
            Ok(())
        } else {
            Err(missing(key))
        }
    }
}

impl From<Value> for HandlerParams {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
