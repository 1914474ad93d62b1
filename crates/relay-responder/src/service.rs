//! `StreamingServer` handlers.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use relay_core::time::now_nanos;
use relay_core::{StreamMessage, StreamResponse};
use relay_core::proto::StreamingServer;
use tonic::{Request, Response, Status, Streaming};
use tracing::info;

/// Boxed reply stream shared by the streaming handlers.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<StreamResponse, Status>> + Send>>;

/// Default number of server-stream echoes.
pub const DEFAULT_ECHO_COUNT: u32 = 5;

/// Default pause between server-stream echoes.
pub const DEFAULT_ECHO_INTERVAL: Duration = Duration::from_secs(1);

/// Echo responder.
///
/// Holds only pacing configuration. Counters live inside each call so
/// concurrent calls never share one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamResponder {
    echo_count: u32,
    echo_interval: Duration,
}

impl Default for StreamResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamResponder {
    /// Responder with the default pacing (5 echoes, 1s apart).
    pub fn new() -> Self {
        Self::with_pacing(DEFAULT_ECHO_COUNT, DEFAULT_ECHO_INTERVAL)
    }

    /// Responder with custom server-stream pacing.
    pub fn with_pacing(echo_count: u32, echo_interval: Duration) -> Self {
        Self {
            echo_count,
            echo_interval,
        }
    }
}

fn require_stream_id(msg: &StreamMessage) -> Result<(), Status> {
    if msg.stream_id.is_empty() {
        return Err(Status::invalid_argument("stream_id is required"));
    }
    Ok(())
}

fn reply(stream_id: &str, sequence_number: i64, response: String) -> StreamResponse {
    StreamResponse {
        stream_id: stream_id.to_string(),
        sequence_number,
        timestamp: now_nanos(),
        response,
        success: true,
    }
}

/// Per-call state for a client-stream call.
#[derive(Debug, Default)]
struct ClientTally {
    count: i64,
    stream_id: String,
}

impl ClientTally {
    fn record(&mut self, msg: &StreamMessage) -> Result<i64, Status> {
        require_stream_id(msg)?;
        if self.stream_id.is_empty() {
            self.stream_id.clone_from(&msg.stream_id);
        }
        self.count += 1;
        Ok(self.count)
    }

    fn into_summary(self) -> StreamResponse {
        let text = format!("from server: received {} messages", self.count);
        reply(&self.stream_id, self.count, text)
    }
}

#[tonic::async_trait]
impl StreamingServer for StreamResponder {
    type BidirectionalStreamStream = ResponseStream;
    type ServerStreamStream = ResponseStream;

    async fn bidirectional_stream(
        &self,
        request: Request<Streaming<StreamMessage>>,
    ) -> Result<Response<Self::BidirectionalStreamStream>, Status> {
        let mut inbound = request.into_inner();

        let output = async_stream::stream! {
            let mut seq: i64 = 0;
            loop {
                let msg = match inbound.message().await {
                    Ok(Some(msg)) => msg,
                    Ok(None) => break,
                    Err(status) => {
                        yield Err(status);
                        break;
                    }
                };
                if let Err(status) = require_stream_id(&msg) {
                    yield Err(status);
                    break;
                }
                seq += 1;
                info!(stream_id = %msg.stream_id, seq, "echoed message");
                yield Ok(reply(&msg.stream_id, seq, format!("from server: {}", msg.message)));
            }
        };
        let output: ResponseStream = Box::pin(output);

        Ok(Response::new(output))
    }

    async fn server_stream(
        &self,
        request: Request<StreamMessage>,
    ) -> Result<Response<Self::ServerStreamStream>, Status> {
        let msg = request.into_inner();
        require_stream_id(&msg)?;

        let total = self.echo_count;
        let interval = self.echo_interval;
        info!(stream_id = %msg.stream_id, "starting {total} echoes");

        let output = async_stream::stream! {
            for i in 1..=total {
                let text = format!("from server: {} (echo {i}/{total})", msg.message);
                yield Ok::<_, Status>(reply(&msg.stream_id, i64::from(i), text));
                info!(stream_id = %msg.stream_id, echo = i, "sent echo");
                if i < total {
                    tokio::time::sleep(interval).await;
                }
            }
        };
        let output: ResponseStream = Box::pin(output);

        Ok(Response::new(output))
    }

    async fn client_stream(
        &self,
        request: Request<Streaming<StreamMessage>>,
    ) -> Result<Response<StreamResponse>, Status> {
        let mut inbound = request.into_inner();
        let mut tally = ClientTally::default();

        while let Some(msg) = inbound.message().await? {
            let count = tally.record(&msg)?;
            info!(stream_id = %msg.stream_id, count, "received message");
        }

        info!(stream_id = %tally.stream_id, count = tally.count, "completed");
        Ok(Response::new(tally.into_summary()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn default_pacing() {
        assert_eq!(
            StreamResponder::default(),
            StreamResponder::with_pacing(5, Duration::from_secs(1))
        );
    }

    #[test]
    fn empty_stream_id_is_invalid_argument() {
        let status = require_stream_id(&StreamMessage::new("", "hi")).unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(status.message(), "stream_id is required");
    }

    #[test]
    fn reply_is_successful_and_timestamped() {
        let resp = reply("abc", 4, "from server: x".into());
        assert!(resp.success);
        assert_eq!(resp.stream_id, "abc");
        assert_eq!(resp.sequence_number, 4);
        assert!(resp.timestamp > 0);
    }

    #[test]
    fn tally_remembers_first_stream_id() {
        let mut tally = ClientTally::default();
        for id in ["x", "y", "z"] {
            let _ = tally.record(&StreamMessage::new(id, "m")).unwrap();
        }
        let summary = tally.into_summary();
        assert_eq!(summary.stream_id, "x");
        assert_eq!(summary.sequence_number, 3);
        assert_eq!(summary.response, "from server: received 3 messages");
    }

    #[test]
    fn tally_empty_summary() {
        let summary = ClientTally::default().into_summary();
        assert_eq!(summary.stream_id, "");
        assert_eq!(summary.sequence_number, 0);
        assert_eq!(summary.response, "from server: received 0 messages");
        assert!(summary.success);
    }

    #[test]
    fn tally_rejects_empty_stream_id() {
        let mut tally = ClientTally::default();
        let _ = tally.record(&StreamMessage::new("a", "m")).unwrap();
        let status = tally.record(&StreamMessage::new("", "m")).unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(tally.count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_stream_paces_echoes() {
        let responder = StreamResponder::with_pacing(3, Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        let stream = responder
            .server_stream(Request::new(StreamMessage::new("abc", "hi")))
            .await
            .unwrap()
            .into_inner();

        let replies: Vec<_> = stream.map(Result::unwrap).collect().await;
        let seqs: Vec<_> = replies.iter().map(|r| r.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(replies[2].response, "from server: hi (echo 3/3)");
        // two pauses, none after the last echo
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn server_stream_rejects_empty_stream_id() {
        let responder = StreamResponder::new();
        let result = responder
            .server_stream(Request::new(StreamMessage::new("", "hi")))
            .await;
        match result {
            Err(status) => assert_eq!(status.code(), tonic::Code::InvalidArgument),
            Ok(_) => panic!("expected invalid argument"),
        }
    }
}
