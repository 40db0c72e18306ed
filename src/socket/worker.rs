//! Per-connection worker.
//!
//! A worker runs exactly one request/response cycle:
//! Reading -> Dispatching -> Writing -> Closed. There is no loop back to
//! Reading; the connection is shut down after the response frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{ProtocolErrorKind, RpcError, RpcResult};
use crate::handlers::RequestRouter;
use crate::protocol::{read_frame_with_timeout, wire_error, write_frame_with_timeout, Message};

/// Settings shared by every worker.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Read/write timeout for the single frame in each direction.
    pub socket_timeout: Duration,
    /// Send raw handler failure text instead of a generic message.
    pub expose_handler_errors: bool,
}

/// What a worker did with its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A success response was written.
    Served,
    /// An error response was written.
    Rejected,
    /// No response could be delivered (peer gone or never sent a frame).
    Abandoned,
}

/// Handle a single client connection: one request, one response, close.
pub async fn handle_connection<S>(
    stream: S,
    router: Arc<RequestRouter>,
    options: Arc<WorkerOptions>,
) -> Outcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request_id = Uuid::new_v4();
    let (mut reader, mut writer) = tokio::io::split(stream);

    let response = match read_frame_with_timeout(&mut reader, options.socket_timeout).await {
        Ok(payload) => process_request(request_id, &payload, &router, &options).await,
        Err(e) if e.is_connection_closed() => {
            debug!(request_id = %request_id, "Peer closed before sending a request");
            return Outcome::Abandoned;
        }
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Failed to read request frame");
            Message::response_err(e.to_string())
        }
    };

    let outcome = if response.is_success() {
        Outcome::Served
    } else {
        Outcome::Rejected
    };

    match write_response(&mut writer, &response, options.socket_timeout).await {
        Ok(()) => {}
        Err(e) => {
            // No above-TCP ack exists; a peer that vanished just loses its answer
            debug!(request_id = %request_id, error = %e, "Failed to write response");
            return Outcome::Abandoned;
        }
    }

    let _ = writer.shutdown().await;
    debug!(request_id = %request_id, ?outcome, "Worker finished");
    outcome
}

/// Write one response frame, synthesizing an error if encoding fails.
async fn write_response<W>(writer: &mut W, response: &Message, timeout: Duration) -> RpcResult<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = match response.encode() {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "Failed to encode response");
            Message::response_err("failed to encode response").encode()?
        }
    };
    write_frame_with_timeout(writer, &payload, timeout).await
}

/// Decode, validate and dispatch one request frame.
async fn process_request(
    request_id: Uuid,
    payload: &[u8],
    router: &Arc<RequestRouter>,
    options: &WorkerOptions,
) -> Message {
    let request = match Message::decode(payload).and_then(Message::into_request) {
        Ok(request) => request,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Rejected malformed request");
            return Message::response_err(wire_error(&e, options.expose_handler_errors));
        }
    };

    info!(
        request_id = %request_id,
        request_type = %request.request_type,
        "Received request"
    );

    if !router.contains(&request.request_type) {
        warn!(
            request_id = %request_id,
            request_type = %request.request_type,
            "Unsupported request type"
        );
        let e = RpcError::Protocol {
            kind: ProtocolErrorKind::UnsupportedType {
                request_type: request.request_type,
            },
        };
        return Message::response_err(wire_error(&e, options.expose_handler_errors));
    }

    let start_time = Instant::now();
    let result = dispatch_blocking(Arc::clone(router), request.request_type.clone(), request.body).await;
    let duration_ms = start_time.elapsed().as_millis() as u64;

    match &result {
        Ok(_) => info!(
            request_id = %request_id,
            request_type = %request.request_type,
            duration_ms,
            "Request handled"
        ),
        Err(e) => {
            warn!(
                request_id = %request_id,
                request_type = %request.request_type,
                duration_ms,
                "Handler failed"
            );
            // Full error server-side; the wire copy may be sanitized
            debug!(request_id = %request_id, error = %e, "Handler error detail");
        }
    }

    Message::from_result(result, options.expose_handler_errors)
}

/// Run a handler on the blocking pool, converting panics into errors.
async fn dispatch_blocking(
    router: Arc<RequestRouter>,
    request_type: String,
    body: Value,
) -> RpcResult<Value> {
    tokio::task::spawn_blocking(move || router.dispatch(&request_type, body))
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "Handler task panicked");
            Err(RpcError::handler_failed("handler panicked"))
        })
}

/// Answer a connection turned away at the concurrency limit.
///
/// The request is read first so the error reply is not lost to a reset
/// caused by unread data.
pub async fn reject_busy<S>(stream: S, socket_timeout: Duration)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    if read_frame_with_timeout(&mut reader, socket_timeout).await.is_err() {
        return;
    }

    let e = RpcError::Protocol {
        kind: ProtocolErrorKind::Busy,
    };
    let response = Message::response_err(wire_error(&e, false));
    if write_response(&mut writer, &response, socket_timeout).await.is_ok() {
        let _ = writer.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{read_frame, write_frame};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn options() -> Arc<WorkerOptions> {
        Arc::new(WorkerOptions {
            socket_timeout: Duration::from_secs(5),
            expose_handler_errors: false,
        })
    }

    async fn exchange(router: RequestRouter, request: &[u8]) -> (Outcome, Message) {
        let (mut client, server) = tokio::io::duplex(4096);
        let worker = tokio::spawn(handle_connection(server, Arc::new(router), options()));

        write_frame(&mut client, request).await.unwrap();
        let reply = read_frame(&mut client).await.unwrap();
        let outcome = worker.await.unwrap();

        // Exactly one response, then closed
        assert!(read_frame(&mut client).await.unwrap_err().is_connection_closed());

        (outcome, Message::decode(&reply).unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_echo_request() {
        let request = br#"{"header":{"version":"1.0","type":"echo"},"body":{"query":"X"}}"#;
        let (outcome, reply) = exchange(RequestRouter::default(), request).await;

        assert_eq!(outcome, Outcome::Served);
        assert_eq!(reply.into_result().unwrap(), json!({"result": "echo:X"}));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_version_mismatch_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let router = RequestRouter::builder()
            .register("count", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({}))
            })
            .build();

        let request = br#"{"header":{"version":"0.9","type":"count"},"body":{}}"#;
        let (outcome, reply) = exchange(router, request).await;

        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(
            reply.header.error.as_deref(),
            Some("Unsupported protocol version: 0.9")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_malformed_json_gets_error_response() {
        let (outcome, reply) = exchange(RequestRouter::default(), b"{oops").await;
        assert_eq!(outcome, Outcome::Rejected);
        assert!(reply.header.error.unwrap().starts_with("Malformed JSON"));
        assert_eq!(reply.body, json!({}));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_handler_panic_is_contained() {
        let router = RequestRouter::builder()
            .register("panic", |_| panic!("handler blew up"))
            .build();

        let request = br#"{"header":{"version":"1.0","type":"panic"},"body":{}}"#;
        let (outcome, reply) = exchange(router, request).await;

        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(reply.header.error.as_deref(), Some("request handling failed"));
    }

    #[tokio::test]
    async fn test_peer_closing_early_is_abandoned() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let outcome = handle_connection(server, Arc::new(RequestRouter::default()), options()).await;
        assert_eq!(outcome, Outcome::Abandoned);
    }

    #[tokio::test]
    async fn test_reject_busy() {
        let (mut client, server) = tokio::io::duplex(4096);
        let worker = tokio::spawn(reject_busy(server, Duration::from_secs(5)));

        let request = Message::request("ping", json!({})).encode().unwrap();
        write_frame(&mut client, &request).await.unwrap();
        let reply = Message::decode(&read_frame(&mut client).await.unwrap()).unwrap();
        worker.await.unwrap();

        assert_eq!(reply.header.error.as_deref(), Some("Server busy"));
    }
}
