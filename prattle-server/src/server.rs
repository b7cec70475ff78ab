use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    app_js_handler, ask_handler, clear_session_handler, delete_session_handler,
    get_session_handler, home_handler, list_sessions_handler, new_session_handler,
};
use crate::state::AppState;

/// Build the chat application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/static/app.js", get(app_js_handler))
        .route("/sessions", get(list_sessions_handler))
        .route(
            "/session/:id",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/new", post(new_session_handler))
        .route("/clear", post(clear_session_handler))
        .route("/ask", post(ask_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the chat application until ctrl-c
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = app(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
