use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use super::status::{StatusBoard, StatusSnapshot};

/// Serve `GET /api/status` until the token cancels. Binding failures are
/// logged and tolerated; the trading loop does not depend on the server.
pub async fn start_server(
    board: Arc<StatusBoard>,
    host: String,
    port: u16,
    cancel: CancellationToken,
) {
    let app = Router::new()
        .route("/api/status", get(status_handler))
        .with_state(board);

    let addr: SocketAddr = match format!("{host}:{port}").parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid status server address {host}:{port}: {e}");
            return;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!("Failed to bind status server on {addr}: {e}");
            return;
        }
    };

    info!("Status server running on http://{addr}");

    let shutdown = async move { cancel.cancelled().await };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        warn!("Status server error: {e}");
    }
}

async fn status_handler(State(board): State<Arc<StatusBoard>>) -> Json<StatusSnapshot> {
    Json(board.snapshot().await)
}
