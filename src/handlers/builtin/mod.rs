//! Built-in request handlers.

mod data_query;
mod echo;
mod ping;
mod time_query;

pub use data_query::DataQueryHandler;
pub use echo::EchoHandler;
pub use ping::PingHandler;
pub use time_query::TimeQueryHandler;
