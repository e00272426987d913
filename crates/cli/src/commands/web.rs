//! Web chat front end.
//!
//! Serves a single chat page and a JSON endpoint that answers one message
//! at a time. All sessions share the process-wide answerer.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docqa_core::config::WebSettings;
use docqa_core::{AppError, AppResult};
use docqa_knowledge::QuestionAnswerer;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const CHAT_PAGE: &str = include_str!("../../assets/chat.html");

/// Shared state for the web front end.
#[derive(Clone)]
pub struct WebState {
    pub answerer: Arc<dyn QuestionAnswerer>,
    pub page: Arc<String>,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,

    /// Earlier turns as kept by the page; not used to answer
    #[serde(default)]
    pub history: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// Error returned by the chat endpoint.
#[derive(Debug)]
pub enum WebError {
    BadRequest(String),
    Internal(AppError),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            WebError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Render the chat page with the configured title (HTML-escaped).
pub fn render_page(title: &str) -> AppResult<String> {
    let handlebars = Handlebars::new();
    handlebars
        .render_template(CHAT_PAGE, &serde_json::json!({ "title": title }))
        .map_err(|e| AppError::Web(format!("Failed to render chat page: {}", e)))
}

async fn index(State(state): State<WebState>) -> Html<String> {
    Html(state.page.as_ref().clone())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<WebState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, WebError> {
    if request.message.trim().is_empty() {
        return Err(WebError::BadRequest("message must not be empty".to_string()));
    }

    if let Some(turns) = request.history.as_array() {
        tracing::debug!("Ignoring {} earlier turn(s) sent by the page", turns.len());
    }

    match state.answerer.answer(&request.message, "").await {
        Ok(result) => Ok(Json(ChatResponse {
            answer: result.answer,
        })),
        Err(e) => {
            tracing::error!("Question failed: {}", e);
            Err(WebError::Internal(e))
        }
    }
}

/// Build the router for the chat page and API.
pub fn build_router(settings: &WebSettings, answerer: Arc<dyn QuestionAnswerer>) -> AppResult<Router> {
    let state = WebState {
        answerer,
        page: Arc::new(render_page(&settings.title)?),
    };

    Ok(Router::new()
        .route("/", get(index))
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Serve the web front end until the process is stopped.
pub async fn serve(settings: &WebSettings, answerer: Arc<dyn QuestionAnswerer>) -> AppResult<()> {
    let app = build_router(settings, answerer)?;

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .map_err(|e| AppError::Web(format!("Failed to bind {}: {}", settings.bind, e)))?;

    tracing::info!("Web chat listening on http://{}", settings.bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Web(format!("Server error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::StubAnswerer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state(answerer: StubAnswerer) -> (WebState, Arc<StubAnswerer>) {
        let answerer = Arc::new(answerer);
        let state = WebState {
            answerer: answerer.clone(),
            page: Arc::new(render_page("Docs <Demo>").unwrap()),
        };
        (state, answerer)
    }

    fn request(message: &str) -> Json<ChatRequest> {
        Json(ChatRequest {
            message: message.to_string(),
            history: serde_json::json!([["earlier", "turn"]]),
        })
    }

    #[test]
    fn test_render_page_escapes_title() {
        let page = render_page("Docs <Demo>").unwrap();
        assert!(page.contains("<title>Docs &lt;Demo&gt;</title>"));
        assert!(page.contains("api/chat"));
    }

    #[tokio::test]
    async fn test_chat_ignores_history() {
        let (state, answerer) = state(StubAnswerer::default());

        let Json(response) = chat(State(state), request("What color is the sky?"))
            .await
            .unwrap();

        assert_eq!(response.answer, "echo: What color is the sky?");
        assert_eq!(
            answerer.calls(),
            vec![("What color is the sky?".to_string(), String::new())]
        );
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let (state, answerer) = state(StubAnswerer::default());

        let err = chat(State(state), request("   ")).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert!(answerer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_chat_error_is_500_with_message() {
        let (state, _) = state(StubAnswerer::failing());

        let response = chat(State(state), request("Why?"))
            .await
            .unwrap_err()
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "LLM error: chat service unavailable");
    }

    #[tokio::test]
    async fn test_router_serves_page_and_health() {
        let app = build_router(&WebSettings::default(), Arc::new(StubAnswerer::default())).unwrap();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("Document Question Answer Demo"));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_router_chat_round_trip() {
        let app = build_router(&WebSettings::default(), Arc::new(StubAnswerer::default())).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message":"hello","history":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["answer"], "echo: hello");
    }
}
