//! Maps the cross-cutting [`search_types::Error`] taxonomy onto
//! `actix_web::ResponseError` using the status codes and codes §7 already
//! assigns, so every route can bubble a plain `search_types::Error` with
//! `?` instead of hand-rolling a response at each call site.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Search(#[from] search_types::Error),
    #[error(transparent)]
    Config(#[from] crate::config::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Search(e) => StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match self {
            ApiError::Search(e) => e.error_code(),
            ApiError::Config(_) => "config_invalid",
            ApiError::Other(_) => "internal_error",
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { error: self.to_string(), code: code.to_string() })
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
