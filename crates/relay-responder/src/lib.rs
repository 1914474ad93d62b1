//! # relay-responder
//!
//! Remote side of the relay: a `StreamingServer` implementation that echoes
//! messages back in three call shapes.
//!
//! - bidirectional: one reply per message, numbered from 1 per call
//! - server-stream: a fixed number of paced echoes for one message
//! - client-stream: one summary after the caller finishes sending
//!
//! Every handler rejects an empty `stream_id` with `InvalidArgument`, which
//! ends that call only.

#![deny(unsafe_code)]

pub mod server;
pub mod service;

pub use server::serve;
pub use service::StreamResponder;
