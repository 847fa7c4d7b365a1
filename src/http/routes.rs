//! HTTP Routes
//!
//! Request handlers and the mapping from [`ServiceError`] to HTTP status
//! codes:
//!
//! | Error                         | Status |
//! |-------------------------------|--------|
//! | missing id / text, bad expiry | 400    |
//! | not found or expired          | 404    |
//! | storage failure               | 500    |

use crate::service::{PasteService, ServiceError};
use crate::storage::format_expiration;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Form body of `POST /msg`. Absent fields arrive as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub expiration: String,
}

/// JSON body of `GET /msg/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResponse {
    pub expiration: String,
    pub text: String,
}

/// Errors that end a request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The blocking task running the storage call failed
    #[error("request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Service(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
            return (status, "Internal server error").into_response();
        }

        debug!(status = status.as_u16(), error = %self, "Request rejected");
        (status, self.to_string()).into_response()
    }
}

/// Builds the application router.
///
/// When `static_dir` is given, every path not matched by the API is served
/// from that directory.
pub fn router(service: PasteService, static_dir: Option<&std::path::Path>) -> Router {
    let api = Router::new()
        .route("/msg", get(missing_id).post(save_text))
        .route("/msg/", get(missing_id).post(save_text))
        .route("/msg/:id", get(get_text))
        .with_state(service);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(TraceLayer::new_for_http())
}

/// GET /msg/{id}
async fn get_text(
    State(service): State<PasteService>,
    Path(id): Path<String>,
) -> Result<Json<TextResponse>, ApiError> {
    let entry = tokio::task::spawn_blocking(move || service.fetch(&id)).await??;

    Ok(Json(TextResponse {
        expiration: format_expiration(&entry.expires_at),
        text: entry.text,
    }))
}

/// POST /msg
async fn save_text(
    State(service): State<PasteService>,
    Form(form): Form<SaveForm>,
) -> Result<String, ApiError> {
    let id = tokio::task::spawn_blocking(move || service.save(&form.text, &form.expiration))
        .await??;
    Ok(id)
}

/// GET /msg without an id
async fn missing_id() -> ApiError {
    ServiceError::MissingId.into()
}
