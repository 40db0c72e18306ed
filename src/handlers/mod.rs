//! Request handlers and the router that dispatches to them.

mod builtin;
mod router;
mod traits;
mod types;

pub use builtin::{DataQueryHandler, EchoHandler, PingHandler, TimeQueryHandler};
pub use router::{RequestRouter, RouterBuilder};
pub use traits::{FnHandler, Handler};
pub use types::HandlerParams;
