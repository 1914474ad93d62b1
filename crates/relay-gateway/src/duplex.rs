//! Deadline-aware read and write halves of a WebSocket.
//!
//! [`FrameReader`] yields data frames and swallows control frames, refreshing
//! the read deadline on every pong. [`FrameWriter`] bounds every write by the
//! write window.

use std::fmt::Display;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, close_code};
use futures::{Sink, SinkExt, Stream, StreamExt};
use relay_core::{RelayError, Result, StreamResponse, frame};
use tracing::{debug, trace};

use crate::liveness::{Liveness, ReadDeadline};

/// What a read produced.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A text or binary data frame.
    Frame(Vec<u8>),
    /// The peer closed, the stream ended, or the read failed.
    Closed,
    /// No pong arrived within the read window.
    Expired,
}

/// Read half with a pong-refreshed deadline.
pub struct FrameReader<St> {
    stream: St,
    deadline: ReadDeadline,
}

impl<St, E> FrameReader<St>
where
    St: Stream<Item = std::result::Result<Message, E>> + Unpin,
    E: Display,
{
    /// Wrap `stream`; the read deadline starts now.
    pub fn new(stream: St, liveness: &Liveness) -> Self {
        Self {
            stream,
            deadline: liveness.read_deadline(),
        }
    }

    /// Next data frame, or why there is none.
    ///
    /// Cancel-safe: dropping the future loses no frame.
    pub async fn next_frame(&mut self) -> ReadOutcome {
        loop {
            let Ok(next) = tokio::time::timeout_at(self.deadline.at(), self.stream.next()).await
            else {
                debug!("read deadline expired");
                return ReadOutcome::Expired;
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    return ReadOutcome::Frame(text.as_str().as_bytes().to_vec());
                }
                Some(Ok(Message::Binary(data))) => return ReadOutcome::Frame(data.to_vec()),
                Some(Ok(Message::Pong(_))) => {
                    trace!("pong");
                    self.deadline.refresh();
                }
                Some(Ok(Message::Ping(_))) => {}
                Some(Ok(Message::Close(close))) => {
                    debug!(?close, "peer closed");
                    return ReadOutcome::Closed;
                }
                Some(Err(e)) => {
                    debug!(error = %e, "read failed");
                    return ReadOutcome::Closed;
                }
                None => return ReadOutcome::Closed,
            }
        }
    }
}

/// Write half with a per-write deadline.
pub struct FrameWriter<S> {
    sink: S,
    write_wait: Duration,
}

impl<S> FrameWriter<S>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    /// Wrap `sink` with the session's write window.
    pub fn new(sink: S, liveness: &Liveness) -> Self {
        Self {
            sink,
            write_wait: liveness.write_wait(),
        }
    }

    async fn write(&mut self, message: Message) -> Result<()> {
        match tokio::time::timeout(self.write_wait, self.sink.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RelayError::duplex(e)),
            Err(_) => Err(RelayError::WriteTimeout(self.write_wait)),
        }
    }

    /// Encode and send one response frame.
    pub async fn send_response(&mut self, response: &StreamResponse) -> Result<()> {
        self.write(Message::Text(frame::encode(response).into())).await
    }

    /// Send a liveness ping.
    pub async fn send_ping(&mut self) -> Result<()> {
        trace!("ping");
        self.write(Message::Ping(Bytes::new())).await
    }

    /// Close with 1011 (internal error) and `reason`.
    pub async fn close_abnormal(&mut self, reason: &str) -> Result<()> {
        self.write(Message::Close(Some(CloseFrame {
            code: close_code::ERROR,
            reason: reason.to_string().into(),
        })))
        .await
    }

    /// Close with 1000 (normal closure).
    pub async fn close(&mut self) -> Result<()> {
        self.write(Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: String::new().into(),
        })))
        .await
    }
}
