use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::application::freshness::FreshnessError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INVALID_LOCATOR: &str = "invalid_locator";
    pub const NOT_FOUND: &str = "not_found";
    pub const DOCUMENT_MISSING: &str = "document_missing";
    pub const UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
    pub const UPSTREAM_UNAUTHORIZED: &str = "upstream_unauthorized";
    pub const DECODE_ERROR: &str = "decode_error";
    pub const EMPTY_CONTENT: &str = "empty_content";
    pub const NO_HISTORY: &str = "no_history";
    pub const TIMEOUT: &str = "timeout";
    pub const RENDER: &str = "render_error";
    pub const STORE: &str = "store_unavailable";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<FreshnessError> for ApiError {
    fn from(err: FreshnessError) -> Self {
        let hint = Some(err.to_string());
        match err {
            FreshnessError::InvalidLocator(_) => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_LOCATOR,
                "Unsupported document URL",
                hint,
            ),
            FreshnessError::DocumentMissing(_) => Self::new(
                StatusCode::NOT_FOUND,
                codes::DOCUMENT_MISSING,
                "Document not found upstream",
                hint,
            ),
            FreshnessError::Timeout(_) => Self::new(
                StatusCode::GATEWAY_TIMEOUT,
                codes::TIMEOUT,
                "Upstream did not answer in time",
                hint,
            ),
            FreshnessError::UpstreamUnavailable(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::UPSTREAM_UNAVAILABLE,
                "Upstream unavailable",
                hint,
            ),
            FreshnessError::Unauthorized(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::UPSTREAM_UNAUTHORIZED,
                "Upstream rejected the configured credential",
                hint,
            ),
            FreshnessError::DecodeError(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::DECODE_ERROR,
                "Upstream content could not be decoded",
                hint,
            ),
            FreshnessError::EmptyContent => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::EMPTY_CONTENT,
                "Document is empty",
                hint,
            ),
            FreshnessError::NoHistory(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::NO_HISTORY,
                "Upstream has no revision history",
                hint,
            ),
            FreshnessError::Render(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::RENDER,
                "Document could not be rendered",
                hint,
            ),
            FreshnessError::Store(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::STORE,
                "Cache store unavailable",
                hint,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}
