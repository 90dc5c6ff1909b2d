use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::domain::IdentityError;

// Custom error type untuk messaging service dengan response standardized
#[derive(Debug)]
pub enum AppError {
    DatabaseError(sqlx::Error),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    ValidationError(String),
    Upload(String),
    WebSocket(String),
    InternalServer(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalServer(msg.into())
    }

    // Kode error yang stabil, dipakai di body JSON dan event `error` WebSocket
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "database_error",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::BadRequest(_) => "bad_request",
            AppError::ValidationError(_) => "validation_error",
            AppError::Upload(_) => "upload_error",
            AppError::WebSocket(_) => "websocket_error",
            AppError::InternalServer(_) => "internal_server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::WebSocket(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Pesan yang aman ditampilkan ke client (detail database tidak bocor)
    pub fn public_message(&self) -> String {
        match self {
            AppError::DatabaseError(_) => "Terjadi kesalahan pada database".to_string(),
            AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::ValidationError(msg)
            | AppError::Upload(msg)
            | AppError::WebSocket(msg)
            | AppError::InternalServer(msg) => msg.clone(),
        }
    }
}

// Konversi dari sqlx::Error ke AppError
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Data tidak ditemukan".to_string()),
            // foreign_key_violation: message untuk conversation yang tidak ada
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23503") => {
                AppError::NotFound("Conversation tidak ditemukan".to_string())
            }
            _ => {
                tracing::error!("Database error: {:?}", err);
                AppError::DatabaseError(err)
            }
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        tracing::error!("Migration error: {:?}", err);
        AppError::InternalServer(format!("Migration gagal: {}", err))
    }
}

// Konversi dari axum::Error ke AppError untuk WebSocket
impl From<axum::Error> for AppError {
    fn from(err: axum::Error) -> Self {
        AppError::WebSocket(err.to_string())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<shared::utils::jwt::JwtError> for AppError {
    fn from(err: shared::utils::jwt::JwtError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

// Implementasi IntoResponse untuk return error sebagai JSON response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::DatabaseError(err) => tracing::error!("Database error: {:?}", err),
            AppError::ValidationError(msg) => tracing::warn!("Validation error: {}", msg),
            AppError::Upload(msg) => tracing::warn!("Upload error: {}", msg),
            AppError::WebSocket(msg) => tracing::error!("WebSocket error: {}", msg),
            AppError::InternalServer(msg) => tracing::error!("Internal server error: {}", msg),
            _ => {}
        }

        let body = Json(json!({
            "error": self.code(),
            "message": self.public_message(),
        }));

        (self.status(), body).into_response()
    }
}

// Display trait untuk error formatting
impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(err) => write!(f, "Database error: {}", err),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Upload(msg) => write!(f, "Upload error: {}", msg),
            AppError::WebSocket(msg) => write!(f, "WebSocket error: {}", msg),
            AppError::InternalServer(msg) => write!(f, "Internal server error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
