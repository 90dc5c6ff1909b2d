// Repository untuk Message operations (PostgreSQL)
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use super::{
    conversation_repo::{flip_preview_seen, write_preview},
    ChatStore, MessageStore, PgStore,
};
use crate::domain::{Message, NewMessage, UserId};
use crate::error::AppError;

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: UserId,
    text: Option<String>,
    img: String,
    audio: String,
    seen: bool,
    created_at: DateTime<Utc>,
}

// Kolom attachment NOT NULL DEFAULT '' -> '' berarti tidak ada
fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|v| !v.is_empty())
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            text: row.text,
            img: non_empty(row.img),
            audio: non_empty(row.audio),
            seen: row.seen,
            created_at: row.created_at,
        }
    }
}

async fn flip_messages_seen<'e, E>(executor: E, conversation_id: Uuid) -> Result<u64, AppError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("UPDATE messages SET seen = TRUE WHERE conversation_id = $1 AND seen = FALSE")
        .bind(conversation_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

async fn insert_message<'e, E>(executor: E, message: &NewMessage) -> Result<Message, AppError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, MessageRow>(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, text, img, audio)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, conversation_id, sender_id, text, img, audio, seen, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(message.conversation_id)
    .bind(&message.sender_id)
    .bind(&message.text)
    .bind(message.img.as_deref().unwrap_or(""))
    .bind(message.audio.as_deref().unwrap_or(""))
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}

#[async_trait]
impl MessageStore for PgStore {
    async fn append(&self, message: NewMessage) -> Result<Message, AppError> {
        insert_message(&self.pool, &message).await
    }

    async fn list_by_conversation(&self, conversation_id: Uuid) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, conversation_id, sender_id, text, img, audio, seen, created_at
             FROM messages WHERE conversation_id = $1
             ORDER BY created_at ASC, seq ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn mark_all_seen(&self, conversation_id: Uuid) -> Result<u64, AppError> {
        flip_messages_seen(&self.pool, conversation_id).await
    }
}

#[async_trait]
impl ChatStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn append_with_preview(&self, message: NewMessage) -> Result<Message, AppError> {
        let mut tx = self.pool.begin().await?;

        // Preview duluan: lock row conversation sebelum insert, supaya urutan insert = urutan preview
        write_preview(&mut *tx, message.conversation_id, &message.preview()).await?;
        let persisted = insert_message(&mut *tx, &message).await?;

        tx.commit().await?;

        Ok(persisted)
    }

    async fn mark_conversation_seen(&self, conversation_id: Uuid) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock row conversation dulu, sama seperti append_with_preview
        flip_preview_seen(&mut *tx, conversation_id).await?;
        // Error di sini -> tx di-drop -> rollback, preview tidak ikut ter-flip
        let flipped = flip_messages_seen(&mut *tx, conversation_id).await?;

        tx.commit().await?;

        Ok(flipped)
    }
}
