use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid upload token")]
    Unauthorized,
    #[error("UPLOAD_TOKEN not configured on server")]
    TokenNotConfigured,
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("File type not allowed: {0}")]
    DisallowedExtension(String),
    #[error("File too large (limit {0} bytes)")]
    TooLarge(u64),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Collision(String),
    #[error("Invalid link URL: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::Unauthorized => StatusCode::UNAUTHORIZED,
            CatalogError::TokenNotConfigured => StatusCode::BAD_REQUEST,
            CatalogError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            CatalogError::DisallowedExtension(_) => StatusCode::BAD_REQUEST,
            CatalogError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Collision(_) => StatusCode::CONFLICT,
            CatalogError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            CatalogError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CatalogError::Io(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                StatusCode::FORBIDDEN
            }
            CatalogError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CatalogError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}
