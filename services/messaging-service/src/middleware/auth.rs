// JWT Authentication untuk Messaging Service
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::utils::jwt;

use crate::{config::AppConfig, domain::UserId, error::AppError};

// Authenticated user structure
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
}

/// Validasi token dan ambil identitas dari claim `sub`
pub fn authenticate(token: &str, secret: &str) -> Result<UserId, AppError> {
    let claims = jwt::validate_token(token, secret)?;

    UserId::parse(&claims.sub)
        .map_err(|_| AppError::unauthorized("Token tidak memiliki identitas user"))
}

// Axum extractor implementation untuk AuthUser
impl<S> FromRequestParts<S> for AuthUser
where
    AppConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::unauthorized("Authorization header dengan Bearer token diperlukan"))?;

        let config = AppConfig::from_ref(state);
        let user_id = authenticate(bearer.token(), &config.jwt_secret)?;

        tracing::debug!("User authenticated - ID: {}", user_id);

        Ok(AuthUser { user_id })
    }
}
