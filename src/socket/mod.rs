//! Socket module.
//!
//! TCP listening and per-connection workers on the server side, and the
//! blocking connection used by the client.

mod connection;
mod listener;
mod worker;

pub use connection::Connection;
pub use listener::{ConnectionMetrics, RpcServer};
pub use worker::{handle_connection, Outcome, WorkerOptions};
