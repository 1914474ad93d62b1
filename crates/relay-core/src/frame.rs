//! Duplex frame codec.
//!
//! Browser-facing connections carry one JSON object per text frame. Inbound
//! frames mirror [`StreamMessage`], outbound frames mirror [`StreamResponse`]:
//!
//! ```text
//! inbound:  { "stream_id", "sequence_number", "timestamp", "message" }
//! outbound: { "stream_id", "sequence_number", "timestamp", "response", "success" }
//! ```
//!
//! `stream_id` and `message` are required on inbound frames; the numeric
//! fields default to zero when absent.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::FrameError;
use crate::proto::{StreamMessage, StreamResponse};

/// Response text of the inline error frame sent for undecodable input.
pub const INVALID_FORMAT: &str = "invalid message format";

/// Inbound frame as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// Logical stream identifier.
    pub stream_id: String,
    /// Sender-chosen sequence number.
    #[serde(default)]
    pub sequence_number: i64,
    /// Sender timestamp.
    #[serde(default)]
    pub timestamp: i64,
    /// Payload text.
    pub message: String,
}

/// Outbound frame as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    /// Logical stream identifier.
    pub stream_id: String,
    /// Responder-assigned sequence number.
    pub sequence_number: i64,
    /// Responder timestamp.
    pub timestamp: i64,
    /// Reply text.
    pub response: String,
    /// Whether the reply reports success.
    pub success: bool,
}

impl From<InboundFrame> for StreamMessage {
    fn from(frame: InboundFrame) -> Self {
        Self {
            stream_id: frame.stream_id,
            sequence_number: frame.sequence_number,
            timestamp: frame.timestamp,
            message: frame.message,
        }
    }
}

impl From<StreamMessage> for InboundFrame {
    fn from(msg: StreamMessage) -> Self {
        Self {
            stream_id: msg.stream_id,
            sequence_number: msg.sequence_number,
            timestamp: msg.timestamp,
            message: msg.message,
        }
    }
}

impl From<&StreamResponse> for OutboundFrame {
    fn from(resp: &StreamResponse) -> Self {
        Self {
            stream_id: resp.stream_id.clone(),
            sequence_number: resp.sequence_number,
            timestamp: resp.timestamp,
            response: resp.response.clone(),
            success: resp.success,
        }
    }
}

impl From<OutboundFrame> for StreamResponse {
    fn from(frame: OutboundFrame) -> Self {
        Self {
            stream_id: frame.stream_id,
            sequence_number: frame.sequence_number,
            timestamp: frame.timestamp,
            response: frame.response,
            success: frame.success,
        }
    }
}

/// Decode an inbound frame payload into a [`StreamMessage`].
pub fn decode(payload: &[u8]) -> Result<StreamMessage, FrameError> {
    let frame: InboundFrame = serde_json::from_slice(payload)?;
    Ok(frame.into())
}

/// Encode a [`StreamResponse`] as an outbound frame payload.
pub fn encode(response: &StreamResponse) -> String {
    serde_json::to_string(&OutboundFrame::from(response)).unwrap_or_else(|e| {
        error!(error = %e, "failed to serialize outbound frame");
        String::new()
    })
}

/// The inline reply for a frame that failed to decode.
pub fn invalid_format() -> StreamResponse {
    rejection(INVALID_FORMAT)
}

/// An unsuccessful reply carrying `reason`, not tied to any stream.
pub fn rejection(reason: &str) -> StreamResponse {
    StreamResponse {
        response: reason.to_string(),
        success: false,
        ..StreamResponse::default()
    }
}

/// Whether a payload is the client-streaming end-of-input marker.
///
/// WebSocket peers cannot receive data after they send a Close frame, so a
/// client that wants the summary signals the end of its input with an empty
/// (or whitespace-only) text frame instead.
pub fn is_end_of_input(payload: &[u8]) -> bool {
    payload.iter().all(u8::is_ascii_whitespace)
}
