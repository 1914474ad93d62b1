//! Bidirectional bridge.
//!
//! Two legs share the session. The receive leg owns the socket writer and
//! forwards call responses, inline error frames from the send leg and pings.
//! The send leg (this task) reads frames and feeds the call. When the send
//! leg stops it half-closes the call and waits, up to the drain timeout, for
//! the receive leg to forward whatever is still in flight.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, Stream, StreamExt};
use relay_core::{StreamMessage, StreamResponse, StreamingClient, frame};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Status, Streaming};
use tracing::{debug, error, warn};

use super::{OUTBOUND_BUFFER, SessionTask, SocketReader, SocketWriter, abort_session, finish};
use crate::duplex::{FrameWriter, ReadOutcome};
use crate::liveness::Liveness;

pub(super) async fn run(
    mut client: StreamingClient,
    mut reader: SocketReader,
    mut writer: SocketWriter,
    liveness: Liveness,
    drain_timeout: Duration,
) {
    let (rpc_tx, rpc_rx) = mpsc::channel::<StreamMessage>(OUTBOUND_BUFFER);
    let responses = match open(&mut client, rpc_rx).await {
        Ok(responses) => responses,
        Err(e) => {
            error!(error = %e, code = ?e.status().map(Status::code), "failed to open bidirectional stream");
            abort_session(&mut writer).await;
            return;
        }
    };

    let (outbox_tx, outbox_rx) = mpsc::channel::<StreamResponse>(OUTBOUND_BUFFER);
    let mut receive = SessionTask::spawn(receive_leg(responses, writer, outbox_rx, liveness));

    let mut receive_done = false;
    loop {
        let outcome = tokio::select! {
            outcome = reader.next_frame() => outcome,
            _ = &mut receive => {
                receive_done = true;
                break;
            }
        };

        match outcome {
            ReadOutcome::Frame(payload) => match frame::decode(&payload) {
                Ok(msg) => {
                    if rpc_tx.send(msg).await.is_err() {
                        debug!("call no longer accepts messages");
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "rejecting inbound frame");
                    if outbox_tx.send(frame::invalid_format()).await.is_err() {
                        break;
                    }
                }
            },
            ReadOutcome::Closed | ReadOutcome::Expired => break,
        }
    }

    // half-close: the responder sees end of input
    drop(rpc_tx);
    drop(outbox_tx);

    if !receive_done {
        drain(receive, drain_timeout).await;
    }
}

async fn open(
    client: &mut StreamingClient,
    requests: mpsc::Receiver<StreamMessage>,
) -> relay_core::Result<Streaming<StreamResponse>> {
    let response = client
        .bidirectional_stream(ReceiverStream::new(requests))
        .await?;
    Ok(response.into_inner())
}

async fn drain(mut receive: SessionTask<()>, drain_timeout: Duration) {
    match tokio::time::timeout(drain_timeout, &mut receive).await {
        Ok(_) => debug!("receive leg drained"),
        Err(_) => {
            warn!(?drain_timeout, "receive leg did not drain, aborting");
            receive.abort();
        }
    }
}

async fn receive_leg<R, S>(
    mut responses: R,
    mut writer: FrameWriter<S>,
    mut outbox: mpsc::Receiver<StreamResponse>,
    liveness: Liveness,
) where
    R: Stream<Item = Result<StreamResponse, Status>> + Unpin,
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut ping = liveness.ping_ticker();
    let mut outbox_open = true;

    loop {
        let sent = tokio::select! {
            next = responses.next() => match next {
                Some(Ok(response)) => writer.send_response(&response).await,
                None => {
                    debug!("call ended");
                    break;
                }
                Some(Err(status)) => {
                    debug!(code = ?status.code(), message = status.message(), "call failed");
                    break;
                }
            },
            rejected = outbox.recv(), if outbox_open => match rejected {
                Some(response) => writer.send_response(&response).await,
                None => {
                    outbox_open = false;
                    Ok(())
                }
            },
            _ = ping.tick() => writer.send_ping().await,
        };

        if let Err(e) = sent {
            debug!(error = %e, "write failed, stopping receive leg");
            return;
        }
    }

    finish(&mut writer).await;
}
