//! Error types for the MCP RPC crate.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
