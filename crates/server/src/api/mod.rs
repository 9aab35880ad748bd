//! HTTP surface.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | POST | `/embed` | `{text, metadata?}` |
//! | POST | `/search` | `{query, limit?}` |
//! | DELETE | `/cleanup/{timestamp}` | |
//! | POST | `/chat/{user_id}` | `{message}` |
//! | GET | `/chat/{user_id}/history` | |
//! | GET | `/health` | |

pub mod error;
pub mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use vecgate_chat::ChatService;
use vecgate_core::AppResult;
use vecgate_store::VectorService;

/// State shared by all handlers: the one live service and the chat
/// pipeline built on it.
#[derive(Clone)]
pub struct AppState {
    pub service: VectorService,
    pub chat: ChatService,
}

impl AppState {
    pub fn new(service: VectorService, chat: ChatService) -> Self {
        Self { service, chat }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/embed", post(handlers::embed))
        .route("/search", post(handlers::search))
        .route("/cleanup/{timestamp}", delete(handlers::cleanup))
        .route("/chat/{user_id}", post(handlers::chat))
        .route("/chat/{user_id}/history", get(handlers::chat_history))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on `addr` until Ctrl-C or SIGTERM, then disconnect the backend.
pub async fn serve(state: AppState, addr: &str) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("vecgate listening on http://{}", listener.local_addr()?);

    let service = state.service.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(
        "Server stopped, disconnecting {} backend",
        service.backend().backend_name()
    );
    service.shutdown().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
