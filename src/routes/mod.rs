//! Route table for the problem bank, the grading and adaptation endpoints, and
//! the drag-and-drop frontend.
//!
//! Every endpoint is a thin adapter over `logic`. The same behaviors are
//! reachable over the `/ws` socket.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// API routes share one `AppState` and sit behind HTTP trace spans at INFO
/// and permissive CORS. Anything else is the static frontend from `./static`,
/// with unknown paths falling back to `index.html`.
///
/// API:
/// - `GET /api/v1/problems`, `GET|DELETE /api/v1/problems/:id`, `POST /api/v1/problems/generate`
/// - `POST /api/v1/validate`, `/adapt`, `/attempt`, `/arrangement/move`, `/hints/indentation`
/// - `GET /api/v1/health`, `GET /ws`
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        // Problem bank
        .route("/api/v1/problems", get(http::http_list_problems))
        .route("/api/v1/problems/generate", post(http::http_generate_problem))
        .route(
            "/api/v1/problems/:id",
            get(http::http_get_problem).delete(http::http_delete_problem),
        )
        // Grading and adaptation
        .route("/api/v1/validate", post(http::http_validate))
        .route("/api/v1/adapt", post(http::http_adapt))
        .route("/api/v1/attempt", post(http::http_attempt))
        .route("/api/v1/arrangement/move", post(http::http_move_block))
        .route("/api/v1/hints/indentation", post(http::http_indentation_hints))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}
