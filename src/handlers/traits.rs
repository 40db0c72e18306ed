//! Handler trait definition.

use serde_json::Value;

use crate::error::RpcResult;

use super::types::HandlerParams;

/// Application logic bound to one request type.
///
/// The router never looks inside the request body; only the handler
/// interprets it.
///
/// # Example
///
/// ```ignore
/// pub struct ShoutHandler;
///
/// impl Handler for ShoutHandler {
///     fn request_type(&self) -> &str {
///         "shout"
///     }
///
///     fn validate(&self, params: &HandlerParams) -> RpcResult<()> {
///         params.require_string("query")
///     }
///
///     fn handle(&self, params: HandlerParams) -> RpcResult<Value> {
///         let query = params.get_string("query")?;
///         Ok(serde_json::json!({"result": query.to_uppercase()}))
///     }
/// }
/// ```
pub trait Handler: Send + Sync {
    /// Request type this handler answers (the header `type` field).
    fn request_type(&self) -> &str;

    /// Check the parameters before `handle` runs.
    fn validate(&self, _params: &HandlerParams) -> RpcResult<()> {
        Ok(())
    }

    /// Produce the response body.
    ///
    /// Called from a blocking worker thread, so synchronous I/O is fine here.
    fn handle(&self, params: HandlerParams) -> RpcResult<Value>;
}

/// Adapter turning a closure into a [`Handler`].
pub struct FnHandler<F> {
    request_type: String,
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(HandlerParams) -> RpcResult<Value> + Send + Sync,
{
    pub fn new(request_type: impl Into<String>, func: F) -> Self {
        Self {
            request_type: request_type.into(),
            func,
        }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(HandlerParams) -> RpcResult<Value> + Send + Sync,
{
    fn request_type(&self) -> &str {
        &self.request_type
    }

    fn handle(&self, params: HandlerParams) -> RpcResult<Value> {
        (self.func)(params)
    }
}
