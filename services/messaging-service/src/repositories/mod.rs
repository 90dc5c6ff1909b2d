// Repository modules untuk Messaging Service
pub mod conversation_repo;
pub mod memory;
pub mod message_repo;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Conversation, LastMessage, Message, NewMessage, ParticipantPair, UserId};
use crate::error::AppError;

pub use memory::InMemoryStore;

/// Penyimpanan conversation. Satu conversation per pasangan participant.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Cari conversation untuk pasangan ini, atau buat baru dengan `initial_preview`.
    /// Harus atomic: pemanggilan bersamaan untuk pasangan yang sama menghasilkan satu conversation.
    async fn find_or_create(
        &self,
        participants: ParticipantPair,
        initial_preview: LastMessage,
    ) -> Result<Conversation, AppError>;

    async fn find_between(&self, participants: &ParticipantPair) -> Result<Option<Conversation>, AppError>;

    async fn get(&self, conversation_id: Uuid) -> Result<Option<Conversation>, AppError>;

    /// Semua conversation yang memuat `user`, aktivitas terbaru duluan
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Conversation>, AppError>;

    /// Operasi preview tunggal. Jalur send dan ack memakai komposit atomic di `ChatStore`.
    async fn update_preview(&self, conversation_id: Uuid, preview: LastMessage) -> Result<(), AppError>;

    async fn mark_preview_seen(&self, conversation_id: Uuid) -> Result<(), AppError>;
}

/// Log message per conversation, urut berdasarkan waktu pembuatan
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist message baru dengan seen=false tanpa menyentuh preview. Return setelah write durable.
    async fn append(&self, message: NewMessage) -> Result<Message, AppError>;

    async fn list_by_conversation(&self, conversation_id: Uuid) -> Result<Vec<Message>, AppError>;

    /// Flip semua message yang belum seen. Return jumlah message yang berubah.
    /// Jalur ack memakai `ChatStore::mark_conversation_seen`, yang juga mem-flip preview.
    async fn mark_all_seen(&self, conversation_id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait ChatStore: ConversationStore + MessageStore {
    fn backend(&self) -> &'static str;

    /// `append` lalu `update_preview` ke message itu sebagai satu unit, diserialisasi terhadap
    /// send dan ack lain di conversation yang sama. Preview selalu mencerminkan message terakhir.
    async fn append_with_preview(&self, message: NewMessage) -> Result<Message, AppError>;

    /// `mark_all_seen` lalu `mark_preview_seen` sebagai satu unit: gagal di tengah berarti tidak ada yang berubah.
    async fn mark_conversation_seen(&self, conversation_id: Uuid) -> Result<u64, AppError>;
}

// Store berbasis PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Jalankan migrations yang di-embed saat compile
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("✅ Database migrations applied");
        Ok(())
    }
}
