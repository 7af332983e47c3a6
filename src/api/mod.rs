//! HTTP surface: health check and the draft endpoint.

pub mod auth;
pub mod error;
pub mod rate_limit;

pub use error::ApiError;
pub use rate_limit::SlidingWindowLimiter;

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use secrecy::SecretString;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Settings;
use crate::drafts::{DraftGenerator, DraftRequest, DraftResponse};

pub const SERVICE_NAME: &str = "smart-reply-service";

/// Shared state for handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<DraftGenerator>,
    /// `None` disables API-key checks.
    pub api_key: Option<Arc<SecretString>>,
    pub limiter: Arc<SlidingWindowLimiter>,
}

impl AppState {
    /// Assemble state from loaded settings. Fails when generator tuning is
    /// out of range or the provider client cannot be built.
    pub fn from_settings(settings: &Settings) -> crate::error::Result<Self> {
        let generator =
            DraftGenerator::from_llm_config(settings.llm.as_ref(), settings.generator_config())?;
        Ok(Self {
            generator: Arc::new(generator),
            api_key: settings.api_key.clone().map(Arc::new),
            limiter: Arc::new(SlidingWindowLimiter::per_minute(settings.rate_limit_per_minute)),
        })
    }
}

/// Build the service router. Only the draft route is authenticated and
/// rate limited.
pub fn router(state: AppState) -> Router {
    // Layers run outermost-last: auth is checked before a rate-limit slot is spent.
    let drafts = Router::new()
        .route("/v1/reply/draft", post(create_draft))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce_rate_limit,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(drafts)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}

async fn create_draft(
    State(state): State<AppState>,
    payload: Result<Json<DraftRequest>, JsonRejection>,
) -> Result<Json<DraftResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    request.validate()?;

    let response = state.generator.generate(&request).await?;
    info!(
        request_id = %response.request_id,
        channel = %response.channel_applied,
        confidence = response.confidence_score,
        "Drafts returned"
    );
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
    use tower::ServiceExt;

    use super::*;
    use crate::drafts::GeneratorConfig;

    fn app() -> Router {
        router(AppState {
            generator: Arc::new(DraftGenerator::local(GeneratorConfig::default())),
            api_key: None,
            limiter: Arc::new(SlidingWindowLimiter::per_minute(100)),
        })
    }

    async fn post_json(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/reply/draft")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_service() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], SERVICE_NAME);
    }

    #[tokio::test]
    async fn draft_endpoint_returns_three_drafts() {
        let (status, body) = post_json(
            app(),
            r#"{"incoming_message": "Thanks for the update.", "channel": "email"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drafts"].as_array().unwrap().len(), 3);
        assert_eq!(body["channel_applied"], "email");
    }

    #[tokio::test]
    async fn unknown_tone_is_unprocessable() {
        let (status, body) = post_json(
            app(),
            r#"{"incoming_message": "Hi", "tone": "sarcastic"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid request body");
    }

    #[test]
    fn state_follows_settings() {
        let settings = Settings::from_lookup(|key| match key {
            "SMART_REPLY_API_KEY" => Some("s3cret".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::from_settings(&settings).unwrap();
        assert!(state.api_key.is_some());
        assert!(!state.generator.uses_provider());

        let settings = Settings::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::from_settings(&settings).unwrap();
        assert!(state.api_key.is_none());
        assert!(state.generator.uses_provider());
    }

    #[tokio::test]
    async fn out_of_range_constraint_is_unprocessable() {
        let (status, body) = post_json(
            app(),
            r#"{"incoming_message": "Hi", "constraints": {"max_words": 5000}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .contains("constraints.max_words")
        );
    }
}
