//! Prompt augmentation.
//!
//! Looks up context for a question over RPC and splices it in front of the
//! question before it goes to a text generation engine. The engine itself
//! lives outside this crate.

use serde_json::json;
use tracing::{debug, warn};

use crate::client::RpcClient;
use crate::config::ClientConfig;
use crate::error::{ProtocolErrorKind, RpcError, RpcResult};

/// Default request type used for context lookups.
pub const DEFAULT_CONTEXT_REQUEST: &str = "data_query";

/// Fetches `body.result` for a question and prepends it as context.
#[derive(Debug, Clone)]
pub struct ContextInjector {
    config: ClientConfig,
    request_type: String,
}

impl ContextInjector {
    pub fn new(config: ClientConfig, request_type: impl Into<String>) -> Self {
        Self {
            config,
            request_type: request_type.into(),
        }
    }

    /// Look up context for `question`.
    ///
    /// Fails if the call fails or the response has no string `result`.
    pub fn fetch_context(&self, question: &str) -> RpcResult<String> {
        let body = RpcClient::scoped(self.config.clone(), |client| {
            client.call(&self.request_type, json!({ "query": question }))
        })?;

        body.get("result")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(RpcError::Protocol {
                kind: ProtocolErrorKind::MissingField { field: "result" },
            })
    }

    /// Return the prompt to hand to the generator.
    ///
    /// Context lookup is best effort: on any failure the question is returned
    /// unchanged so generation can still run.
    pub fn augment(&self, question: &str) -> String {
        match self.fetch_context(question) {
            Ok(context) => {
                let prompt = format_prompt(&context, question);
                debug!(prompt = %prompt, "Prompt augmented with context");
                prompt
            }
            Err(e) => {
                warn!(
                    error = %e,
                    request_type = %self.request_type,
                    "Context lookup failed, using question as is"
                );
                question.to_string()
            }
        }
    }
}

/// Combine context and question into one prompt.
pub fn format_prompt(context: &str, question: &str) -> String {
    format!("Context data: {}\n\tUser question: {}", context, question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_format_prompt() {
        assert_eq!(
            format_prompt("pop is 21M", "How many people?"),
            "Context data: pop is 21M\n\tUser question: How many people?"
        );
    }

    #[test]
    fn test_augment_falls_back_without_server() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let injector = ContextInjector::new(
            ClientConfig::new("127.0.0.1", port),
            DEFAULT_CONTEXT_REQUEST,
        );

        assert!(injector.fetch_context("q").is_err());
        assert_eq!(injector.augment("q"), "q");
    }
}
