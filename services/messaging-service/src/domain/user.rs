// Identitas user yang dikirim oleh auth collaborator / handshake WebSocket
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

// Sentinel yang dikirim client lama ketika userId belum tersedia
const PLACEHOLDER_IDENTITY: &str = "undefined";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("user id wajib diisi")]
    Missing,

    #[error("user id 'undefined' tidak valid")]
    Placeholder,
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(String);

impl UserId {
    /// Parse raw identity. String kosong dan literal "undefined" ditolak.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, IdentityError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(IdentityError::Missing);
        }
        if raw == PLACEHOLDER_IDENTITY {
            return Err(IdentityError::Placeholder);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
