//! Protobuf messages for the `relay.streaming.StreamingServer` service.
//!
//! Field tags are part of the wire contract:
//!
//! | message          | 1           | 2                 | 3           | 4          | 5         |
//! |------------------|-------------|-------------------|-------------|------------|-----------|
//! | `StreamMessage`  | `stream_id` | `sequence_number` | `timestamp` | `message`  |           |
//! | `StreamResponse` | `stream_id` | `sequence_number` | `timestamp` | `response` | `success` |

use tonic::transport::Channel;

/// A caller-supplied message on one of the streaming calls.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct StreamMessage {
    /// Logical stream identifier. Must be non-empty.
    #[prost(string, tag = "1")]
    pub stream_id: String,
    /// Sequence number chosen by the sender. Informational only.
    #[prost(int64, tag = "2")]
    pub sequence_number: i64,
    /// Sender timestamp.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    /// Payload text.
    #[prost(string, tag = "4")]
    pub message: String,
}

/// A responder-generated reply.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct StreamResponse {
    /// Logical stream this reply belongs to.
    #[prost(string, tag = "1")]
    pub stream_id: String,
    /// Responder-assigned sequence number, starting at 1 per call.
    #[prost(int64, tag = "2")]
    pub sequence_number: i64,
    /// Responder timestamp in Unix epoch nanoseconds.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    /// Reply text.
    #[prost(string, tag = "4")]
    pub response: String,
    /// Whether the reply reports success.
    #[prost(bool, tag = "5")]
    pub success: bool,
}

impl StreamMessage {
    /// Build a message with a zero sequence number and timestamp.
    pub fn new(stream_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            message: message.into(),
            ..Self::default()
        }
    }
}

#[allow(missing_docs, unused_results, clippy::all, clippy::pedantic)]
mod generated {
    include!(concat!(env!("OUT_DIR"), "/relay.streaming.StreamingServer.rs"));
}

pub use generated::streaming_server_client::StreamingServerClient;
pub use generated::streaming_server_server::{StreamingServer, StreamingServerServer};

/// Client handle the gateway uses to open streaming calls.
pub type StreamingClient = StreamingServerClient<Channel>;
