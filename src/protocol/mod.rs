//! Wire protocol module.
//!
//! Defines the message envelope and frame codec for socket communication.
//!
//! ## Wire Format
//!
//! Frames are length-prefixed UTF-8 JSON:
//! ```text
//! [4 bytes: length (big-endian u32)][JSON payload]
//! ```
//!
//! Request:  `{"header":{"version":"1.0","type":"<type>"},"body":{...}}`
//! Success:  `{"header":{"status":"success","version":"1.0"},"body":{...}}`
//! Error:    `{"header":{"status":"error","version":"1.0","error":"<msg>"},"body":{}}`

mod message;
mod wire;

pub use message::{wire_error, Header, Message, Request, Status, PROTOCOL_VERSION};
pub use wire::{
    encode_frame, read_frame, read_frame_blocking, read_frame_with_timeout, write_frame,
    write_frame_blocking, write_frame_with_timeout, LENGTH_PREFIX_SIZE,
};
