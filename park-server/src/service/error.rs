//! Mapping of failures to HTTP responses

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error(transparent)]
    Core(#[from] park::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        use park::Error::*;

        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Core(NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Core(MalformedToken(_) | InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Core(UpstreamUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Core(DeadlineExceeded) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
