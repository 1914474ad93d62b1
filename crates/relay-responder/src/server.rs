//! tonic server bootstrap.

use relay_core::proto::StreamingServerServer;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

use crate::service::StreamResponder;

/// Serve on a bound listener until `shutdown` fires.
///
/// Binding `127.0.0.1:0` first lets callers learn the port before serving.
pub async fn serve(
    listener: TcpListener,
    responder: StreamResponder,
    shutdown: CancellationToken,
) -> Result<(), tonic::transport::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "stream responder listening");
    }
    Server::builder()
        .add_service(StreamingServerServer::new(responder))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown.cancelled_owned())
        .await
}
