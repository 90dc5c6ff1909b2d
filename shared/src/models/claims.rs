use serde::{Deserialize, Serialize};

/// Model JWT claims yang dikeluarkan oleh identity provider eksternal.
/// `sub` adalah identitas user (opaque string, misal ObjectId hex).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String,
}

impl TokenClaims {
    /// Buat access token claims untuk subject dengan masa berlaku `ttl_secs`
    pub fn access(sub: impl Into<String>, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: sub.into(),
            exp: now + ttl_secs,
            iat: now,
            token_type: "access".to_string(),
        }
    }

    /// Cek apakah token adalah access token
    pub fn is_access_token(&self) -> bool {
        self.token_type == "access"
    }

    /// Cek apakah token sudah expired berdasarkan current time
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp <= now
    }

    /// Get remaining validity duration dalam detik
    pub fn remaining_validity(&self) -> i64 {
        let now = chrono::Utc::now().timestamp();
        (self.exp - now).max(0)
    }
}
