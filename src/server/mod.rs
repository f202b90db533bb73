mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::board::Board;
use crate::server::handlers::{bids, board, jobs};

pub async fn serve(board: Arc<Board>) {
    let app = Router::new()
        .route("/board", get(board::show))
        .route("/role", patch(board::set_role))
        .route("/jobs", post(jobs::create))
        .route("/jobs/:id/bids", post(bids::create))
        .layer(Extension(board));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
}
