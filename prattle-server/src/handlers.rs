use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::{AppendHeaders, Html, IntoResponse, Response},
    Json,
};
use futures::stream::StreamExt;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;

use prattle_core::session::SessionSummary;

use crate::state::{AppState, AskRequest, ChatCommand, ChatEvent, NewSessionResponse};

pub async fn home_handler() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

pub async fn app_js_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        include_str!("../assets/app.js"),
    )
}

pub async fn list_sessions_handler(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    let (tx, rx) = oneshot::channel();
    if let Err(e) = state
        .chat_tx
        .send(ChatCommand::ListSessions { reply: tx })
        .await
    {
        tracing::error!("Failed to send ListSessions command: {}", e);
        return Json(Vec::new());
    }

    match rx.await {
        Ok(sessions) => Json(sessions),
        Err(e) => {
            tracing::error!("Failed to receive ListSessions response: {}", e);
            Json(Vec::new())
        }
    }
}

pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let (tx, rx) = oneshot::channel();
    if let Err(e) = state
        .chat_tx
        .send(ChatCommand::LoadSession { id, reply: tx })
        .await
    {
        tracing::error!("Failed to send LoadSession command: {}", e);
        return internal_error();
    }

    match rx.await {
        Ok(Ok(session)) => Json(session).into_response(),
        Ok(Err(prattle_core::Error::NotFound(_))) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
        }
        Ok(Err(e)) => {
            tracing::error!("Failed to load session: {}", e);
            internal_error()
        }
        Err(e) => {
            tracing::error!("Failed to receive LoadSession response: {}", e);
            internal_error()
        }
    }
}

pub async fn new_session_handler(State(state): State<AppState>) -> Json<NewSessionResponse> {
    let (tx, rx) = oneshot::channel();
    if let Err(e) = state
        .chat_tx
        .send(ChatCommand::NewSession { reply: tx })
        .await
    {
        tracing::error!("Failed to send NewSession command: {}", e);
        return Json(NewSessionResponse { id: String::new() });
    }

    match rx.await {
        Ok(id) => Json(NewSessionResponse { id }),
        Err(e) => {
            tracing::error!("Failed to receive NewSession response: {}", e);
            Json(NewSessionResponse { id: String::new() })
        }
    }
}

// "/clear" behaves exactly like "/new".
pub async fn clear_session_handler(state: State<AppState>) -> Json<NewSessionResponse> {
    new_session_handler(state).await
}

pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let (tx, rx) = oneshot::channel();
    if let Err(e) = state
        .chat_tx
        .send(ChatCommand::DeleteSession { id, reply: tx })
        .await
    {
        tracing::error!("Failed to send DeleteSession command: {}", e);
    } else {
        let _ = rx.await;
    }

    // Deleting an unknown id is a no-op, so this is unconditional.
    Json(json!({ "ok": true }))
}

pub async fn ask_handler(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> impl IntoResponse {
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    if let Err(e) = state
        .chat_tx
        .send(ChatCommand::Ask {
            prompt: payload.prompt,
            events: event_tx,
        })
        .await
    {
        tracing::error!("Failed to send Ask command: {}", e);
    }

    let stream = UnboundedReceiverStream::new(event_rx).map(|event| {
        let payload = match event {
            ChatEvent::Chunk(text) => json!({ "chunk": text }),
            ChatEvent::Done { session_id, title } => {
                json!({ "done": true, "session_id": session_id, "title": title })
            }
        };
        Ok::<_, Infallible>(Event::default().data(payload.to_string()))
    });

    // Proxies must not buffer or cache the event stream.
    (
        AppendHeaders([
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ]),
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal error" })),
    )
        .into_response()
}
