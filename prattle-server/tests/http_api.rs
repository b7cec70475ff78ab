//! End-to-end tests for the chat routes, driven through the router with a
//! deterministic completion backend.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::util::ServiceExt;

use prattle_core::session::{ChatMessage, SessionStore};
use prattle_providers::{Assistant, CompletionBackend, FragmentStream, Message, ProviderResult};
use prattle_server::{app, AppState, ChatController};

struct ScriptedBackend {
    fragments: Vec<&'static str>,
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _messages: Vec<Message>) -> ProviderResult<String> {
        Ok(self.fragments.concat())
    }

    async fn complete_stream(&self, _messages: Vec<Message>) -> ProviderResult<FragmentStream> {
        let items: Vec<ProviderResult<String>> =
            self.fragments.iter().map(|f| Ok(f.to_string())).collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

fn test_app(dir: &TempDir, fragments: Vec<&'static str>) -> Router {
    let store = SessionStore::new(dir.path());
    let assistant = Assistant::new(Box::new(ScriptedBackend { fragments }));
    let (chat_tx, chat_rx) = mpsc::channel(32);
    tokio::spawn(ChatController::new(store, assistant).run(chat_rx));
    app(AppState { chat_tx })
}

async fn post_json(app: &Router, uri: &str, body: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect an `/ask` event stream into (concatenated chunks, done frame).
async fn read_event_stream(
    response: axum::response::Response,
) -> (String, Option<serde_json::Value>) {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    let mut reply = String::new();
    let mut done = None;
    for line in text.lines() {
        if let Some(payload) = line.strip_prefix("data: ") {
            let value: serde_json::Value = serde_json::from_str(payload).unwrap();
            if let Some(chunk) = value.get("chunk").and_then(|c| c.as_str()) {
                reply.push_str(chunk);
            }
            if value.get("done").is_some() {
                done = Some(value);
            }
        }
    }
    (reply, done)
}

#[tokio::test]
async fn test_home_serves_chat_page() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, vec!["hi"]);

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Prattle"));
}

#[tokio::test]
async fn test_ask_streams_and_persists_conversation() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, vec!["Hel", "lo ", "there"]);

    let response = post_json(&app, "/ask", r#"{"prompt":"Hi"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-cache"
    );
    assert_eq!(response.headers().get("x-accel-buffering").unwrap(), "no");

    let (reply, done) = read_event_stream(response).await;
    assert_eq!(reply, "Hello there");

    let done = done.unwrap();
    assert_eq!(done["done"], true);
    assert_eq!(done["title"], "Hi");
    let session_id = done["session_id"].as_str().unwrap().to_string();

    let response = get(&app, &format!("/session/{}", session_id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let session = body_json(response).await;
    assert_eq!(session["id"], session_id.as_str());
    assert_eq!(session["title"], "Hi");
    let messages = session["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "Hi");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "Hello there");
}

#[tokio::test]
async fn test_get_unknown_session_returns_404() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, vec!["hi"]);

    let response = get(&app, "/session/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_delete_session_is_always_ok() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, vec!["hi"]);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/session/never-existed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
    }
}

#[tokio::test]
async fn test_new_and_clear_create_fresh_sessions() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, vec!["hi"]);

    let first = body_json(post_json(&app, "/new", "").await).await;
    let second = body_json(post_json(&app, "/clear", "").await).await;

    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();
    assert!(!first_id.is_empty());
    assert!(!second_id.is_empty());
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn test_delete_current_session_recreates_one() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, vec!["reply"]);

    let response = post_json(&app, "/ask", r#"{"prompt":"First"}"#).await;
    let (_, done) = read_event_stream(response).await;
    let first_id = done.unwrap()["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/session/{}", first_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(&app, "/ask", r#"{"prompt":"Second"}"#).await;
    let (_, done) = read_event_stream(response).await;
    let second_id = done.unwrap()["session_id"].as_str().unwrap().to_string();

    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn test_sessions_list_uses_reverse_filename_order() {
    let dir = TempDir::new().unwrap();

    // Seed stored sessions out of id order before the server starts.
    let store = SessionStore::new(dir.path());
    for id in ["bbb", "aaa", "ccc"] {
        store
            .save(id, &format!("title-{}", id), &[ChatMessage::user("hey")])
            .unwrap();
    }

    let app = test_app(&dir, vec!["hi"]);
    let response = get(&app, "/sessions").await;
    assert_eq!(response.status(), StatusCode::OK);

    let sessions = body_json(response).await;
    let ids: Vec<&str> = sessions
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ccc", "bbb", "aaa"]);
}

#[tokio::test]
async fn test_ask_continues_loaded_session() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir, vec!["reply"]);

    let response = post_json(&app, "/ask", r#"{"prompt":"First"}"#).await;
    let (_, done) = read_event_stream(response).await;
    let session_id = done.unwrap()["session_id"].as_str().unwrap().to_string();

    // Switch away, then load the stored session back.
    post_json(&app, "/new", "").await;
    let response = get(&app, &format!("/session/{}", session_id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(&app, "/ask", r#"{"prompt":"Second"}"#).await;
    let (_, done) = read_event_stream(response).await;
    let done = done.unwrap();
    assert_eq!(done["session_id"].as_str().unwrap(), session_id);
    // Title still derives from the first user message.
    assert_eq!(done["title"], "First");

    let session = body_json(get(&app, &format!("/session/{}", session_id)).await).await;
    assert_eq!(session["messages"].as_array().unwrap().len(), 4);
}
