//! HTTP boundary – JSON envelopes over the two pipelines plus the
//! shared-secret gate.
//!
//! The wire format matches the service this one replaces: requests wrap
//! their payload in `{"data": …}`, successful responses return the PDF as
//! base64 in `{"data": …}`, and failures carry `{"msg": …, "error": …}`.

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64_STD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::engine::{EngineError, HtmlEngine};
use crate::form::{FormError, FormRecord, FormRenderer};

/// Header carrying the caller's shared secret.
pub const INTERNAL_CODE_HEADER: &str = "x-internalcode";

#[derive(Clone)]
pub struct AppState {
    pub engine: HtmlEngine,
    pub forms: Arc<FormRenderer>,
    pub internal_code: String,
}

/// Build the service router. `/health` is open; both generation endpoints sit
/// behind the internal-code gate.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/html-to-pdf", post(html_to_pdf))
        .route("/dian-form-220", post(dian_form_220))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_internal_code,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

enum ApiError {
    /// The shared secret did not match; short-circuits before any pipeline.
    InvalidCode,
    BadRequest(String),
    Internal(String),
    /// The engine hit its deadline.
    Timeout(String),
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<&'static str>,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg, error) = match self {
            ApiError::InvalidCode => (
                StatusCode::BAD_REQUEST,
                None,
                format!("the {INTERNAL_CODE_HEADER} header sent is not valid"),
            ),
            ApiError::BadRequest(error) => {
                (StatusCode::BAD_REQUEST, Some("can't create the PDF"), error)
            }
            ApiError::Timeout(error) => (
                StatusCode::GATEWAY_TIMEOUT,
                Some("can't create the PDF"),
                error,
            ),
            ApiError::Internal(error) => {
                log::error!("pdf generation failed: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Some("can't create the PDF"),
                    error,
                )
            }
        };
        (status, Json(ErrorBody { msg, error })).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled => ApiError::Timeout(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::Empty | FormError::UnsupportedYear(_) => {
                ApiError::BadRequest(err.to_string())
            }
            FormError::Render(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}

// ── Middleware ────────────────────────────────────────────────────────────

async fn require_internal_code(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let received = req
        .headers()
        .get(INTERNAL_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if received != state.internal_code {
        return Err(ApiError::InvalidCode);
    }
    Ok(next.run(req).await)
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RenderRequest {
    /// Raw HTML markup.
    data: String,
}

#[derive(Deserialize)]
struct FormRequest {
    data: Vec<FormRecord>,
}

#[derive(Serialize)]
struct PdfResponse {
    /// PDF bytes, base64.
    data: String,
}

#[derive(Serialize)]
struct HealthResponse {
    date: String,
}

#[derive(Deserialize)]
struct DebugParams {
    debug: Option<String>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        date: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
    })
}

async fn html_to_pdf(
    State(state): State<AppState>,
    Json(req): Json<RenderRequest>,
) -> Result<Json<PdfResponse>, ApiError> {
    let pdf = state.engine.render(&req.data).await?;
    Ok(Json(PdfResponse {
        data: BASE64_STD.encode(pdf),
    }))
}

async fn dian_form_220(
    State(state): State<AppState>,
    Query(params): Query<DebugParams>,
    Json(req): Json<FormRequest>,
) -> Result<Json<PdfResponse>, ApiError> {
    let debug = params
        .debug
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    // The grid build and PDF serialization are pure CPU; keep them off the
    // async workers.
    let renderer = Arc::clone(&state.forms);
    let records = req.data;
    let pdf = tokio::task::spawn_blocking(move || renderer.render(&records, debug))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(PdfResponse {
        data: BASE64_STD.encode(pdf),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            engine: HtmlEngine::new("/nonexistent/engine", None),
            forms: Arc::new(FormRenderer::new("assets", ".")),
            internal_code: "s3cret".to_string(),
        }
    }

    fn post_json(uri: &str, code: Option<&str>, body: &str) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(code) = code {
            builder = builder.header(INTERNAL_CODE_HEADER, code);
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_is_open() {
        let response = router(test_state())
            .oneshot(
                axum::http::Request::get("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body.get("date").is_some());
    }

    #[tokio::test]
    async fn missing_internal_code_is_rejected() {
        let response = router(test_state())
            .oneshot(post_json("/dian-form-220", None, r#"{"data":[]}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .expect("error text")
            .contains(INTERNAL_CODE_HEADER));
    }

    #[tokio::test]
    async fn wrong_internal_code_is_rejected() {
        let response = router(test_state())
            .oneshot(post_json("/html-to-pdf", Some("nope"), r#"{"data":"<p>x</p>"}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_batch_maps_to_bad_request() {
        let response = router(test_state())
            .oneshot(post_json("/dian-form-220", Some("s3cret"), r#"{"data":[]}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["msg"], "can't create the PDF");
        assert!(body["error"].as_str().expect("error").contains("no records"));
    }

    #[tokio::test]
    async fn missing_engine_maps_to_internal_error() {
        let response = router(test_state())
            .oneshot(post_json(
                "/html-to-pdf",
                Some("s3cret"),
                r#"{"data":"<p>hola</p>"}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
