// Repository untuk Conversation operations (PostgreSQL)
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use super::{ConversationStore, PgStore};
use crate::domain::{Conversation, LastMessage, ParticipantPair, UserId};
use crate::error::AppError;

const CONVERSATION_COLUMNS: &str = "id, participant_low, participant_high, last_message_text, \
     last_message_sender, last_message_seen, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ConversationRow {
    id: Uuid,
    participant_low: UserId,
    participant_high: UserId,
    last_message_text: Option<String>,
    last_message_sender: UserId,
    last_message_seen: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            participants: ParticipantPair::new(row.participant_low, row.participant_high),
            last_message: LastMessage {
                text: row.last_message_text,
                sender_id: row.last_message_sender,
                seen: row.last_message_seen,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// Tulis preview. UPDATE ini juga mengunci row conversation sampai transaction selesai,
// jadi send dan ack untuk conversation yang sama berjalan berurutan.
pub(super) async fn write_preview<'e, E>(executor: E, conversation_id: Uuid, preview: &LastMessage) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE conversations
         SET last_message_text = $1, last_message_sender = $2, last_message_seen = $3, updated_at = NOW()
         WHERE id = $4",
    )
    .bind(&preview.text)
    .bind(&preview.sender_id)
    .bind(preview.seen)
    .bind(conversation_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Conversation tidak ditemukan"));
    }

    Ok(())
}

// Flip preview seen. Dipakai juga di dalam transaction mark_conversation_seen.
pub(super) async fn flip_preview_seen<'e, E>(executor: E, conversation_id: Uuid) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE conversations SET last_message_seen = TRUE, updated_at = NOW() WHERE id = $1",
    )
    .bind(conversation_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Conversation tidak ditemukan"));
    }

    Ok(())
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn find_or_create(
        &self,
        participants: ParticipantPair,
        initial_preview: LastMessage,
    ) -> Result<Conversation, AppError> {
        // UNIQUE (participant_low, participant_high) yang menjamin atomicity,
        // insert yang kalah race jatuh ke re-read di bawah
        let inserted = sqlx::query_as::<_, ConversationRow>(&format!(
            "INSERT INTO conversations (id, participant_low, participant_high, last_message_text, last_message_sender, last_message_seen)
             VALUES ($1, $2, $3, $4, $5, FALSE)
             ON CONFLICT (participant_low, participant_high) DO NOTHING
             RETURNING {}",
            CONVERSATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(participants.low())
        .bind(participants.high())
        .bind(&initial_preview.text)
        .bind(&initial_preview.sender_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            tracing::info!("Conversation baru {} dibuat untuk {} & {}", row.id, participants.low(), participants.high());
            return Ok(row.into());
        }

        let existing = self
            .find_between(&participants)
            .await?
            .ok_or_else(|| AppError::internal("Conversation hilang setelah conflict insert"))?;

        Ok(existing)
    }

    async fn find_between(&self, participants: &ParticipantPair) -> Result<Option<Conversation>, AppError> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {} FROM conversations WHERE participant_low = $1 AND participant_high = $2",
            CONVERSATION_COLUMNS
        ))
        .bind(participants.low())
        .bind(participants.high())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Conversation::from))
    }

    async fn get(&self, conversation_id: Uuid) -> Result<Option<Conversation>, AppError> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {} FROM conversations WHERE id = $1",
            CONVERSATION_COLUMNS
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Conversation::from))
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Conversation>, AppError> {
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {} FROM conversations
             WHERE participant_low = $1 OR participant_high = $1
             ORDER BY updated_at DESC",
            CONVERSATION_COLUMNS
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Conversation::from).collect())
    }

    async fn update_preview(&self, conversation_id: Uuid, preview: LastMessage) -> Result<(), AppError> {
        write_preview(&self.pool, conversation_id, &preview).await
    }

    async fn mark_preview_seen(&self, conversation_id: Uuid) -> Result<(), AppError> {
        flip_preview_seen(&self.pool, conversation_id).await
    }
}
