use std::error::Error;
use std::fmt::{Display, Formatter, Result};

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

#[macro_export]
macro_rules! create_streamhub_error {
    ($kind: expr, $($arg:tt)*) => {
        $crate::streamhub_error::StreamHubError::new($kind, format!($($arg)*))
    }
}

#[macro_export]
macro_rules! create_streamhub_error_result {
     ($kind: expr, $($arg:tt)*) => {
        Err($crate::streamhub_error::StreamHubError::new($kind, format!($($arg)*)))
    }
}

pub use create_streamhub_error;
pub use create_streamhub_error_result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamHubErrorKind {
    // internal, startup and storage failures
    Info,
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    TooManyRequests,
    Upstream,
}

impl StreamHubErrorKind {
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Info => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamHubError {
    pub kind: StreamHubErrorKind,
    pub message: String,
}

impl StreamHubError {
    pub const fn new(kind: StreamHubErrorKind, message: String) -> Self {
        Self {
            kind,
            message,
        }
    }

    pub fn validation(message: &str) -> Self {
        Self::new(StreamHubErrorKind::Validation, message.to_string())
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(StreamHubErrorKind::NotFound, message.to_string())
    }

    pub fn forbidden(message: &str) -> Self {
        Self::new(StreamHubErrorKind::Forbidden, message.to_string())
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StreamHubErrorKind::Unauthorized, message.to_string())
    }

    pub fn conflict(message: &str) -> Self {
        Self::new(StreamHubErrorKind::Conflict, message.to_string())
    }
}

impl Display for StreamHubError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}", self.message)
    }
}

impl Error for StreamHubError {}

impl IntoResponse for StreamHubError {
    fn into_response(self) -> axum::response::Response {
        (self.kind.status_code(), axum::Json(json!({"error": self.message}))).into_response()
    }
}
