//! Error hierarchy for the relay.
//!
//! - [`FrameError`]: an inbound duplex frame could not be decoded. Recoverable;
//!   the session answers with an inline error frame and keeps going.
//! - [`RelayError`]: a failed streaming call, a failed duplex write, or a
//!   write that missed its deadline. These end the session.

use std::time::Duration;

use thiserror::Error;

/// Failure to decode an inbound duplex frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The payload was not JSON, was not an object, or lacked a required field.
    #[error("invalid message format: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Top-level error type for bridge and responder operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The RPC call failed or was rejected by the responder.
    #[error("rpc failed: {0}")]
    Rpc(Box<tonic::Status>),

    /// The duplex connection reported an error.
    #[error("duplex connection error: {0}")]
    Duplex(String),

    /// A frame write did not complete within the write window.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
}

impl RelayError {
    /// Wrap any displayable duplex-side error.
    pub fn duplex(err: impl std::fmt::Display) -> Self {
        Self::Duplex(err.to_string())
    }

    /// The RPC status, if this error came from the RPC call.
    pub fn status(&self) -> Option<&tonic::Status> {
        match self {
            Self::Rpc(status) => Some(status.as_ref()),
            _ => None,
        }
    }
}

impl From<tonic::Status> for RelayError {
    fn from(status: tonic::Status) -> Self {
        Self::Rpc(Box::new(status))
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
