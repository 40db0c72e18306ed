//! Ping handler for health checking.

use serde_json::Value;

use crate::error::RpcResult;
use crate::handlers::{Handler, HandlerParams};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simple ping handler that returns a pong response.
pub struct PingHandler;

impl Handler for PingHandler {
    fn request_type(&self) -> &str {
        "ping"
    }

    fn handle(&self, _params: HandlerParams) -> RpcResult<Value> {
        Ok(serde_json::json!({
            "pong": true,
            "version": VERSION,
        }))
    }
}
