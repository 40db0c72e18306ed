//! Blocking RPC client.
//!
//! The server answers exactly one request per connection and then closes it.
//! The client therefore treats a connection as single-use: [`RpcClient::call`]
//! opens a fresh connection whenever it has none and always releases it once
//! the response has been read.

use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::RpcResult;
use crate::protocol::Message;
use crate::socket::Connection;

/// Synchronous client issuing one request/response round trip per call.
///
/// Calls on one client are sequential (`&mut self`); run several clients for
/// overlapping calls.
#[derive(Debug)]
pub struct RpcClient {
    config: ClientConfig,
    connection: Option<Connection>,
}

impl RpcClient {
    /// Create a disconnected client.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    /// Run `f` with a connected client, closing it on every exit path.
    ///
    /// Release also happens on panic, since the client closes on drop.
    pub fn scoped<T, F>(config: ClientConfig, f: F) -> RpcResult<T>
    where
        F: FnOnce(&mut RpcClient) -> RpcResult<T>,
    {
        let mut client = Self::new(config);
        client.connect()?;
        let result = f(&mut client);
        client.close();
        result
    }

    /// The configuration this client connects with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_open)
    }

    /// Open a connection if none is held.
    pub fn connect(&mut self) -> RpcResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.connection = Some(self.open_connection()?);
        Ok(())
    }

    fn open_connection(&self) -> RpcResult<Connection> {
        Connection::open(
            &self.config.address(),
            self.config.connect_timeout(),
            self.config.io_timeout(),
        )
    }

    /// Send `(request_type, params)` and return the response body.
    ///
    /// Transport failures come back as connection or framing errors; a
    /// rejected request comes back as a protocol error carrying the server's
    /// message.
    pub fn call(&mut self, request_type: &str, params: Value) -> RpcResult<Value> {
        let mut connection = match self.connection.take() {
            Some(connection) if connection.is_open() => connection,
            _ => self.open_connection()?,
        };

        debug!(request_type, peer = %connection.peer_addr(), "Sending request");
        let request = Message::request(request_type, params);
        let result = connection.round_trip(&request);
        connection.close();

        result?.into_result()
    }

    /// Release the connection. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.close();
    }
}
