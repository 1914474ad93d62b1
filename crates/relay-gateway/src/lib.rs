//! # relay-gateway
//!
//! Accepts browser WebSocket connections and bridges each one onto a
//! streaming call of the `StreamingServer` gRPC service.
//!
//! | route                       | call shape      |
//! |-----------------------------|-----------------|
//! | `/ws/stream/bidirectional`  | bidirectional   |
//! | `/ws/stream/server`         | server-stream   |
//! | `/ws/stream/client`         | client-stream   |
//!
//! Frames are JSON (see [`relay_core::frame`]). Liveness is kept with
//! ping/pong and a pong-refreshed read deadline ([`liveness`]).

#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod duplex;
pub mod health;
pub mod liveness;
pub mod server;
pub mod sessions;

pub use bridge::StreamShape;
pub use config::GatewayConfig;
pub use server::GatewayServer;
