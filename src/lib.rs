//! MCP RPC Library
//!
//! A minimal request/response protocol over TCP: length-prefixed JSON frames,
//! a versioned header + body envelope, a server that routes each request by
//! type to a registered handler, and a blocking client that turns
//! `(type, params)` into one round trip.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod socket;

pub use client::RpcClient;
pub use error::{RpcError, RpcResult};
pub use handlers::{Handler, HandlerParams, RequestRouter, RouterBuilder};
pub use protocol::{Message, PROTOCOL_VERSION};
pub use socket::{Connection, RpcServer};
