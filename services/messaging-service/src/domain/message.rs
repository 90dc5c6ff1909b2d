// Domain model untuk Message
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{LastMessage, UserId};

/// Attachment yang kosong disimpan dan dikirim sebagai "" (sentinel "tidak ada").
pub mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|value| !value.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: UserId,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(with = "empty_as_none", default)]
    #[schema(value_type = String)]
    pub img: Option<String>,
    #[serde(with = "empty_as_none", default)]
    #[schema(value_type = String)]
    pub audio: Option<String>,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

/// Data message yang sudah siap dipersist (attachment sudah jadi URL)
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: UserId,
    pub text: Option<String>,
    pub img: Option<String>,
    pub audio: Option<String>,
}

impl NewMessage {
    // Materialisasi message dengan id baru dan seen=false
    pub fn into_message(self, created_at: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            text: self.text,
            img: self.img,
            audio: self.audio,
            seen: false,
            created_at,
        }
    }

    /// Preview conversation untuk message ini, belum seen
    pub fn preview(&self) -> LastMessage {
        LastMessage::unseen(self.text.clone(), self.sender_id.clone())
    }
}

// Body untuk POST /api/messages
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Gambar inline (data URI base64)
    #[serde(with = "empty_as_none", default)]
    #[schema(value_type = Option<String>)]
    pub img: Option<String>,
    /// Audio inline (base64 tanpa prefix)
    #[serde(with = "empty_as_none", default)]
    #[schema(value_type = Option<String>)]
    pub audio: Option<String>,
}

impl SendMessageRequest {
    // Text kosong dianggap tidak ada
    pub fn text(&self) -> Option<String> {
        self.message
            .as_ref()
            .filter(|text| !text.trim().is_empty())
            .cloned()
    }

    pub fn has_content(&self) -> bool {
        self.text().is_some() || self.img.is_some() || self.audio.is_some()
    }
}
