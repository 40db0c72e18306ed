//! Request router mapping request types to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ProtocolErrorKind, RpcError, RpcResult};

use super::builtin::{DataQueryHandler, EchoHandler, PingHandler, TimeQueryHandler};
use super::traits::{FnHandler, Handler};
use super::types::HandlerParams;

/// Immutable table of request handlers.
///
/// Built once through [`RouterBuilder`] before serving starts and shared
/// read-only between workers afterwards.
#[derive(Clone)]
pub struct RequestRouter {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

/// Collects routes before the router is frozen.
#[derive(Default)]
pub struct RouterBuilder {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own request type.
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        let request_type = handler.request_type().to_string();
        debug!(request_type = %request_type, "Registering handler");
        if self.handlers.insert(request_type.clone(), handler).is_some() {
            warn!(request_type = %request_type, "Handler replaced an existing route");
        }
        self
    }

    /// Register a closure for `request_type`.
    pub fn register<F>(self, request_type: impl Into<String>, func: F) -> Self
    where
        F: Fn(HandlerParams) -> RpcResult<Value> + Send + Sync + 'static,
    {
        self.handler(Arc::new(FnHandler::new(request_type, func)))
    }

    /// Register the built-in handlers.
    pub fn with_builtin_handlers(self) -> Self {
        self.handler(Arc::new(PingHandler))
            .handler(Arc::new(EchoHandler))
            .handler(Arc::new(DataQueryHandler))
            .handler(Arc::new(TimeQueryHandler))
    }

    /// Freeze the routing table.
    pub fn build(self) -> RequestRouter {
        info!(count = self.handlers.len(), "Request router initialized");
        RequestRouter {
            handlers: self.handlers,
        }
    }
}

impl RequestRouter {
    /// Start building a router.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// A router with only the built-in handlers.
    pub fn with_builtin_handlers() -> Self {
        RouterBuilder::new().with_builtin_handlers().build()
    }

    /// Get a handler by request type.
    pub fn get(&self, request_type: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(request_type).cloned()
    }

    /// Whether a request type is routable.
    pub fn contains(&self, request_type: &str) -> bool {
        self.handlers.contains_key(request_type)
    }

    /// Dispatch a request body to the handler for `request_type`.
    pub fn dispatch(&self, request_type: &str, body: Value) -> RpcResult<Value> {
        let handler = self
            .handlers
            .get(request_type)
            .ok_or_else(|| RpcError::Protocol {
                kind: ProtocolErrorKind::UnsupportedType {
                    request_type: request_type.to_string(),
                },
            })?;

        let params = HandlerParams::new(body);
        handler.validate(&params)?;
        handler.handle(params)
    }

    /// List all registered request types, sorted.
    pub fn request_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl Default for RequestRouter {
    fn default() -> Self {
        Self::with_builtin_handlers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_router_has_builtin_handlers() {
        let router = RequestRouter::default();
        assert_eq!(
            router.request_types(),
            vec!["data_query", "echo", "ping", "time_query"]
        );
        assert!(router.get("nonexistent").is_none());
    }

    #[test]
    fn test_dispatch_unknown_type_invokes_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let router = RequestRouter::builder()
            .register("known", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({}))
            })
            .build();

        let result = router.dispatch("unknown", json!({}));
        assert!(matches!(
            result,
            Err(RpcError::Protocol {
                kind: ProtocolErrorKind::UnsupportedType { .. }
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispatch_closure_handler() {
        let router = RequestRouter::builder()
            .register("identity", |params| Ok(params.into_value()))
            .build();

        let body = json!({"nested": {"list": [1, "two", null]}});
        assert_eq!(router.dispatch("identity", body.clone()).unwrap(), body);
    }

    #[test]
    fn test_handler_failure_propagates() {
        let router = RequestRouter::builder()
            .register("fail", |_| Err(RpcError::handler_failed("nope")))
            .build();

        assert!(matches!(
            router.dispatch("fail", json!({})),
            Err(RpcError::Handler { .. })
        ));
    }

    #[test]
    fn test_later_registration_wins() {
        let router = RequestRouter::builder()
            .register("x", |_| Ok(json!(1)))
            .register("x", |_| Ok(json!(2)))
            .build();

        assert_eq!(router.dispatch("x", json!({})).unwrap(), json!(2));
    }
}
