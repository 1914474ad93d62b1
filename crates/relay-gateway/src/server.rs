//! `GatewayServer`: axum router, upgrade handling and health endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use relay_core::StreamingClient;
use relay_core::shutdown::ShutdownCoordinator;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::bridge::{self, SessionContext, StreamShape};
use crate::config::GatewayConfig;
use crate::health::{self, HealthResponse};
use crate::sessions::ActiveSessions;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upstream client.
    pub client: StreamingClient,
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
    /// Live session gauge.
    pub sessions: ActiveSessions,
    /// Shutdown coordinator.
    pub shutdown: ShutdownCoordinator,
    /// When the server started.
    pub start_time: Instant,
}

/// The WebSocket gateway.
pub struct GatewayServer {
    state: AppState,
}

impl GatewayServer {
    /// Create a server bridging to `client`.
    pub fn new(config: GatewayConfig, client: StreamingClient) -> Self {
        Self {
            state: AppState {
                client,
                config: Arc::new(config),
                sessions: ActiveSessions::new(),
                shutdown: ShutdownCoordinator::new(),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route(StreamShape::Bidirectional.path(), get(bidirectional_handler))
            .route(StreamShape::ServerStream.path(), get(server_stream_handler))
            .route(StreamShape::ClientStream.path(), get(client_stream_handler))
            .route("/healthz", get(health_handler))
            .route("/readyz", get(ready_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.state.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.state.shutdown.token();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "gateway server failed");
            }
        });

        info!(%addr, "gateway listening");
        Ok((addr, handle))
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.state.shutdown
    }

    /// The live session gauge.
    pub fn sessions(&self) -> &ActiveSessions {
        &self.state.sessions
    }
}

async fn bidirectional_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    upgrade(StreamShape::Bidirectional, ws, &headers, state)
}

async fn server_stream_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    upgrade(StreamShape::ServerStream, ws, &headers, state)
}

async fn client_stream_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    upgrade(StreamShape::ClientStream, ws, &headers, state)
}

/// Check the origin, apply socket limits and hand off to the bridge.
fn upgrade(shape: StreamShape, ws: WebSocketUpgrade, headers: &HeaderMap, state: AppState) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    if !state.config.origin_allowed(origin) {
        warn!(%shape, origin = origin.unwrap_or_default(), "rejecting upgrade from disallowed origin");
        return StatusCode::FORBIDDEN.into_response();
    }

    let config = &state.config;
    let ctx = SessionContext {
        client: state.client.clone(),
        config: Arc::clone(config),
        sessions: state.sessions.clone(),
        shutdown: state.shutdown.token(),
    };

    ws.read_buffer_size(config.read_buffer_size)
        .write_buffer_size(config.write_buffer_size)
        .max_message_size(config.max_message_size)
        .on_failed_upgrade(move |e| error!(%shape, error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| bridge::run_session(socket, shape, ctx))
}

/// GET /healthz
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, state.sessions.count()))
}

/// GET /readyz
async fn ready_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let shutting_down = state.shutdown.is_shutting_down();
    let resp = health::readiness(state.start_time, state.sessions.count(), shutting_down);
    let status = if shutting_down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(resp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tonic::transport::Endpoint;
    use tower::ServiceExt;

    fn make_server() -> GatewayServer {
        let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
        GatewayServer::new(GatewayConfig::default(), StreamingClient::new(channel))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let server = make_server();
        let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();

        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = body_json(resp).await;
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["active_sessions"], 0);
    }

    #[tokio::test]
    async fn readyz_flips_on_shutdown() {
        let server = make_server();
        let req = || Request::builder().uri("/readyz").body(Body::empty()).unwrap();

        let resp = server.router().oneshot(req()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        server.shutdown().shutdown();
        let resp = server.router().oneshot(req()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["status"], "shutting_down");
    }

    #[tokio::test]
    async fn plain_get_on_ws_route_is_rejected() {
        let server = make_server();
        let req = Request::builder()
            .uri("/ws/stream/bidirectional")
            .body(Body::empty())
            .unwrap();

        let resp = server.router().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let server = make_server();
        let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn accessors() {
        let server = make_server();
        assert_eq!(server.sessions().count(), 0);
        assert!(!server.shutdown().is_shutting_down());
    }
}
