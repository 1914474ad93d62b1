//! Client-stream bridge: many request frames, one summary.
//!
//! An empty text frame marks the end of input. The bridge then half-closes
//! the call, writes the summary and closes. If the peer closes first the
//! call is still finished, but the summary can only be logged. A read
//! expiry also ends input; the summary is then still written.

use std::time::Duration;

use relay_core::{StreamMessage, StreamResponse, StreamingClient, frame};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Code;
use tracing::{debug, error, warn};

use super::{OUTBOUND_BUFFER, SessionTask, SocketReader, SocketWriter, abort_session, finish};
use crate::duplex::ReadOutcome;
use crate::liveness::Liveness;

type CallResult = relay_core::Result<StreamResponse>;

pub(super) async fn run(
    mut client: StreamingClient,
    mut reader: SocketReader,
    mut writer: SocketWriter,
    liveness: Liveness,
    summary_timeout: Duration,
) {
    let (rpc_tx, rpc_rx) = mpsc::channel::<StreamMessage>(OUTBOUND_BUFFER);
    let mut call: SessionTask<CallResult> =
        SessionTask::spawn(async move { summarize(&mut client, rpc_rx).await });

    let mut ping = liveness.ping_ticker();
    let mut peer_open = true;
    let mut forwarded: u64 = 0;

    let early = loop {
        let outcome = tokio::select! {
            outcome = reader.next_frame() => outcome,
            result = &mut call => break Some(result),
            _ = ping.tick() => {
                if let Err(e) = writer.send_ping().await {
                    debug!(error = %e, "ping failed");
                    peer_open = false;
                    break None;
                }
                continue;
            }
        };

        match outcome {
            ReadOutcome::Frame(payload) if frame::is_end_of_input(&payload) => {
                debug!(forwarded, "end of input");
                break None;
            }
            ReadOutcome::Frame(payload) => match frame::decode(&payload) {
                Ok(msg) => {
                    if rpc_tx.send(msg).await.is_err() {
                        // the call ended; the next turn picks up its result
                        debug!("call no longer accepts messages");
                    } else {
                        forwarded += 1;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "rejecting inbound frame");
                    if let Err(e) = writer.send_response(&frame::invalid_format()).await {
                        debug!(error = %e, "write failed");
                        peer_open = false;
                        break None;
                    }
                }
            },
            ReadOutcome::Closed => {
                peer_open = false;
                break None;
            }
            // still writable; the summary and close are bounded by the write wait
            ReadOutcome::Expired => break None,
        }
    };

    // half-close: the responder sees end of input and answers
    drop(rpc_tx);

    let result = match early {
        Some(result) => result,
        None => match tokio::time::timeout(summary_timeout, &mut call).await {
            Ok(result) => result,
            Err(_) => {
                error!(?summary_timeout, "failed to close client stream: no summary in time");
                call.abort();
                if peer_open {
                    finish(&mut writer).await;
                }
                return;
            }
        },
    };

    let summary = match result {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) if e.status().is_some_and(|status| status.code() == Code::Unavailable) => {
            error!(error = %e, "failed to open client stream");
            if peer_open {
                abort_session(&mut writer).await;
            }
            return;
        }
        Ok(Err(e)) => {
            error!(error = %e, "failed to close client stream");
            if peer_open {
                finish(&mut writer).await;
            }
            return;
        }
        Err(e) => {
            error!(error = %e, "client stream task failed");
            return;
        }
    };

    if !peer_open {
        warn!(
            stream_id = %summary.stream_id,
            count = summary.sequence_number,
            "peer closed before the summary could be delivered"
        );
        return;
    }

    if let Err(e) = writer.send_response(&summary).await {
        error!(error = %e, "failed to deliver summary");
        return;
    }
    debug!(stream_id = %summary.stream_id, count = summary.sequence_number, "summary delivered");
    finish(&mut writer).await;
}

async fn summarize(
    client: &mut StreamingClient,
    requests: mpsc::Receiver<StreamMessage>,
) -> CallResult {
    let response = client.client_stream(ReceiverStream::new(requests)).await?;
    Ok(response.into_inner())
}
