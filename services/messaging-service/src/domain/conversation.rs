// Domain model untuk Conversation (selalu tepat dua participant)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::UserId;

/// Pasangan participant yang sudah dinormalisasi (urut), jadi {A, B} == {B, A}.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
    low: UserId,
    high: UserId,
}

impl ParticipantPair {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> &UserId {
        &self.low
    }

    pub fn high(&self) -> &UserId {
        &self.high
    }

    pub fn contains(&self, user: &UserId) -> bool {
        &self.low == user || &self.high == user
    }

    /// Participant lain dari `user`. None kalau `user` bukan participant.
    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if &self.low == user {
            Some(&self.high)
        } else if &self.high == user {
            Some(&self.low)
        } else {
            None
        }
    }
}

/// Preview pesan terakhir yang di-denormalisasi ke conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: Option<String>,
    pub sender_id: UserId,
    pub seen: bool,
}

impl LastMessage {
    pub fn unseen(text: Option<String>, sender_id: UserId) -> Self {
        Self {
            text,
            sender_id,
            seen: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    pub participants: ParticipantPair,
    pub last_message: LastMessage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(participants: ParticipantPair, last_message: LastMessage) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            participants,
            last_message,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    pub fn other_participant(&self, user: &UserId) -> Option<&UserId> {
        self.participants.other(user)
    }

    // Bentuk response untuk `viewer`: viewer sendiri dihapus dari daftar participants
    pub fn view_for(&self, viewer: &UserId) -> ConversationView {
        let participants = [self.participants.low(), self.participants.high()]
            .into_iter()
            .filter(|participant| *participant != viewer)
            .cloned()
            .collect();

        ConversationView {
            id: self.id,
            participants,
            last_message: self.last_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: Uuid,
    pub participants: Vec<UserId>,
    pub last_message: LastMessage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
