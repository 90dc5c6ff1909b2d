use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::models::claims::TokenClaims;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token invalid atau expired")]
    InvalidToken,

    #[error("JWT secret tidak ditemukan")]
    MissingSecret,

    #[error("Token type tidak valid untuk endpoint ini")]
    InvalidTokenType,

    #[error("Gagal membuat token: {0}")]
    Encoding(String),
}

/// Validate JWT access token (HS256) dan extract claims
pub fn validate_token(token: &str, secret: &str) -> Result<TokenClaims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| JwtError::InvalidToken)?;

    // Pastikan token adalah access token, bukan refresh token
    if !token_data.claims.is_access_token() {
        return Err(JwtError::InvalidTokenType);
    }

    tracing::debug!("JWT validation successful for user: {}", token_data.claims.sub);

    Ok(token_data.claims)
}

/// Sign claims menjadi JWT (HS256). Dipakai oleh tooling dan tests.
pub fn issue_token(claims: &TokenClaims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::Encoding(e.to_string()))
}
