//! # relay-core
//!
//! Foundation types shared by the relay gateway and the stream responder.
//!
//! - [`proto`]: protobuf `StreamMessage` / `StreamResponse` and the generated
//!   `StreamingServer` client and server
//! - [`frame`]: JSON duplex frames and the codec between frames and RPC messages
//! - [`errors`]: error hierarchy built on `thiserror`
//! - [`logging`]: `tracing` subscriber bootstrap
//! - [`shutdown`]: `CancellationToken`-based shutdown coordination
//! - [`time`]: wall-clock timestamps in the wire format

#![deny(unsafe_code)]

pub mod errors;
pub mod frame;
pub mod logging;
pub mod proto;
pub mod shutdown;
pub mod time;

pub use errors::{FrameError, RelayError, Result};
pub use proto::{StreamMessage, StreamResponse, StreamingClient};
