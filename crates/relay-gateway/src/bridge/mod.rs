//! Per-connection bridges between a WebSocket and a streaming call.
//!
//! Each accepted connection runs one session: a span with a fresh session
//! id, a slot in the [`ActiveSessions`] gauge, and the bridge for the route's
//! [`StreamShape`]. Every exit path drops both the socket and the call.

mod bidirectional;
mod client_stream;
mod server_stream;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, StreamExt};
use futures::stream::{SplitSink, SplitStream};
use relay_core::StreamingClient;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::duplex::{FrameReader, FrameWriter};
use crate::sessions::ActiveSessions;

/// Close reason sent when the streaming call cannot be opened.
pub const CONNECTION_FAILED: &str = "gRPC connection failed";

/// Requests buffered between the socket reader and the call.
const OUTBOUND_BUFFER: usize = 32;

type SocketReader = FrameReader<SplitStream<WebSocket>>;
type SocketWriter = FrameWriter<SplitSink<WebSocket, Message>>;

/// Which streaming call a route bridges to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamShape {
    /// Both sides stream.
    Bidirectional,
    /// One request, many responses.
    ServerStream,
    /// Many requests, one summary.
    ClientStream,
}

impl StreamShape {
    /// Short name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bidirectional => "bidirectional",
            Self::ServerStream => "server",
            Self::ClientStream => "client",
        }
    }

    /// HTTP route serving this shape.
    pub fn path(self) -> &'static str {
        match self {
            Self::Bidirectional => "/ws/stream/bidirectional",
            Self::ServerStream => "/ws/stream/server",
            Self::ClientStream => "/ws/stream/client",
        }
    }
}

impl fmt::Display for StreamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a session needs besides its socket.
#[derive(Clone)]
pub struct SessionContext {
    /// Upstream client; clones share one channel.
    pub client: StreamingClient,
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
    /// Live session gauge.
    pub sessions: ActiveSessions,
    /// Fires on server shutdown.
    pub shutdown: CancellationToken,
}

/// Run one bridged session to completion.
pub async fn run_session(socket: WebSocket, shape: StreamShape, ctx: SessionContext) {
    let session_id = Uuid::now_v7();
    let span = info_span!("session", %session_id, %shape);

    async move {
        let _guard = ctx.sessions.enter();
        debug!("session opened");

        let liveness = ctx.config.liveness();
        let (sink, stream) = socket.split();
        let reader = FrameReader::new(stream, &liveness);
        let writer = FrameWriter::new(sink, &liveness);
        let client = ctx.client.clone();

        let bridge = async {
            match shape {
                StreamShape::Bidirectional => {
                    bidirectional::run(client, reader, writer, liveness, ctx.config.drain_timeout())
                        .await;
                }
                StreamShape::ServerStream => {
                    server_stream::run(client, reader, writer, liveness).await;
                }
                StreamShape::ClientStream => {
                    client_stream::run(client, reader, writer, liveness, ctx.config.drain_timeout())
                        .await;
                }
            }
        };

        tokio::select! {
            () = bridge => debug!("session closed"),
            () = ctx.shutdown.cancelled() => debug!("session cancelled by shutdown"),
        }
    }
    .instrument(span)
    .await;
}

/// A spawned session task that is aborted when the session is dropped.
struct SessionTask<T>(JoinHandle<T>);

impl<T: Send + 'static> SessionTask<T> {
    fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self(tokio::spawn(fut))
    }

    fn abort(&self) {
        self.0.abort();
    }
}

impl<T> Future for SessionTask<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for SessionTask<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Tell the peer the call could not be opened.
async fn abort_session(writer: &mut SocketWriter) {
    if let Err(e) = writer.close_abnormal(CONNECTION_FAILED).await {
        debug!(error = %e, "failed to send abnormal close");
    }
}

/// Close normally, ignoring a peer that is already gone.
async fn finish<S>(writer: &mut FrameWriter<S>)
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    if let Err(e) = writer.close().await {
        debug!(error = %e, "failed to send close");
    }
}
