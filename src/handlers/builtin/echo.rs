//! Echo handler.

use serde_json::Value;

use crate::error::RpcResult;
use crate::handlers::{Handler, HandlerParams};

/// Returns `{"result": "echo:<query>"}`.
pub struct EchoHandler;

impl Handler for EchoHandler {
    fn request_type(&self) -> &str {
        "echo"
    }

    fn validate(&self, params: &HandlerParams) -> RpcResult<()> {
        params.require_string("query")
    }

    fn handle(&self, params: HandlerParams) -> RpcResult<Value> {
        let query = params.get_string("query")?;
        Ok(serde_json::json!({ "result": format!("echo:{}", query) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_echo() {
        let result = EchoHandler
            .handle(HandlerParams::new(json!({"query": "X"})))
            .unwrap();
        assert_eq!(result, json!({"result": "echo:X"}));
    }

    #[test]
    fn test_echo_requires_query() {
        assert!(EchoHandler
            .validate(&HandlerParams::new(json!({})))
            .is_err());
    }
}
