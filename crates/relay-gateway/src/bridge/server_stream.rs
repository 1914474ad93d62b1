//! Server-stream bridge: one request frame, then every response.
//!
//! The bridge does no pacing of its own. The gap between responses is only
//! bounded by liveness: pings keep the peer's read deadline fresh, so the
//! responder's interval just has to stay below the pong wait.

use relay_core::{StreamMessage, StreamResponse, StreamingClient, frame};
use tonic::{Status, Streaming};
use tracing::{debug, error, warn};

use super::{SocketReader, SocketWriter, abort_session, finish};
use crate::duplex::ReadOutcome;
use crate::liveness::Liveness;

/// Inline reply for a request without a stream id.
pub(super) const STREAM_ID_REQUIRED: &str = "stream_id is required";

pub(super) async fn run(
    mut client: StreamingClient,
    mut reader: SocketReader,
    mut writer: SocketWriter,
    liveness: Liveness,
) {
    // pings run from the start so a peer may take its time with the request
    let mut ping = liveness.ping_ticker();
    let payload = loop {
        tokio::select! {
            outcome = reader.next_frame() => match outcome {
                ReadOutcome::Frame(payload) => break payload,
                ReadOutcome::Closed => {
                    debug!("peer left before sending a request");
                    return;
                }
                ReadOutcome::Expired => {
                    debug!("peer stopped answering pings before sending a request");
                    finish(&mut writer).await;
                    return;
                }
            },
            _ = ping.tick() => {
                if let Err(e) = writer.send_ping().await {
                    debug!(error = %e, "ping failed while awaiting request");
                    return;
                }
            }
        }
    };

    let request = match frame::decode(&payload) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "rejecting request frame");
            reject(&mut writer, &frame::invalid_format()).await;
            return;
        }
    };
    if request.stream_id.is_empty() {
        warn!("rejecting request without stream_id");
        reject(&mut writer, &frame::rejection(STREAM_ID_REQUIRED)).await;
        return;
    }

    let stream_id = request.stream_id.clone();
    let mut responses = match open(&mut client, request).await {
        Ok(responses) => responses,
        Err(e) => {
            error!(%stream_id, error = %e, code = ?e.status().map(Status::code), "failed to open server stream");
            abort_session(&mut writer).await;
            return;
        }
    };

    let mut forwarded: u64 = 0;
    loop {
        let sent = tokio::select! {
            next = responses.message() => match next {
                Ok(Some(response)) => {
                    forwarded += 1;
                    writer.send_response(&response).await
                }
                Ok(None) => break,
                Err(status) => {
                    debug!(code = ?status.code(), message = status.message(), "server stream failed");
                    break;
                }
            },
            _ = ping.tick() => writer.send_ping().await,
            // keep reading so pongs refresh the deadline and closes are seen
            outcome = reader.next_frame() => match outcome {
                ReadOutcome::Frame(_) => {
                    debug!("ignoring frame after request");
                    Ok(())
                }
                ReadOutcome::Closed => {
                    debug!(%stream_id, forwarded, "peer gone before stream ended");
                    return;
                }
                ReadOutcome::Expired => {
                    debug!(%stream_id, forwarded, "peer stopped answering pings");
                    finish(&mut writer).await;
                    return;
                }
            },
        };

        if let Err(e) = sent {
            debug!(error = %e, "write failed, ending server stream");
            return;
        }
    }

    debug!(%stream_id, forwarded, "server stream complete");
    finish(&mut writer).await;
}

async fn open(
    client: &mut StreamingClient,
    request: StreamMessage,
) -> relay_core::Result<Streaming<StreamResponse>> {
    let response = client.server_stream(request).await?;
    Ok(response.into_inner())
}

async fn reject(writer: &mut SocketWriter, response: &StreamResponse) {
    if let Err(e) = writer.send_response(response).await {
        debug!(error = %e, "failed to send rejection");
        return;
    }
    finish(writer).await;
}
