// Alur kirim & baca direct message
use std::sync::Arc;

use crate::domain::{
    ConversationView, LastMessage, Message, NewMessage, ParticipantPair, SendMessageRequest, ServerEvent,
    UserId,
};
use crate::error::AppError;
use crate::realtime::DeliveryGateway;
use crate::repositories::ChatStore;
use crate::utils::media::{resolve_optional, AttachmentKind, MediaResolver};

#[derive(Clone)]
pub struct MessagingService {
    store: Arc<dyn ChatStore>,
    media: Arc<dyn MediaResolver>,
    gateway: DeliveryGateway,
}

impl MessagingService {
    pub fn new(store: Arc<dyn ChatStore>, media: Arc<dyn MediaResolver>, gateway: DeliveryGateway) -> Self {
        Self { store, media, gateway }
    }

    /// Kirim message: resolve attachment -> conversation -> append + preview (atomic) -> push.
    /// Push ke penerima tidak mempengaruhi hasil; message sudah durable sebelum push.
    pub async fn send(&self, sender: &UserId, request: SendMessageRequest) -> Result<Message, AppError> {
        let recipient = UserId::parse(&request.recipient_id)?;
        if &recipient == sender {
            return Err(AppError::validation("Tidak bisa mengirim pesan ke diri sendiri"));
        }
        if !request.has_content() {
            return Err(AppError::validation("Pesan harus berisi text, gambar, atau audio"));
        }

        // Upload dulu, supaya upload gagal tidak meninggalkan conversation/message setengah jadi
        let img = resolve_optional(self.media.as_ref(), AttachmentKind::Image, request.img.as_deref()).await?;
        let audio = resolve_optional(self.media.as_ref(), AttachmentKind::Audio, request.audio.as_deref()).await?;
        let text = request.text();

        let conversation = self
            .store
            .find_or_create(
                ParticipantPair::new(sender.clone(), recipient.clone()),
                LastMessage::unseen(text.clone(), sender.clone()),
            )
            .await?;

        let message = self
            .store
            .append_with_preview(NewMessage {
                conversation_id: conversation.id,
                sender_id: sender.clone(),
                text,
                img,
                audio,
            })
            .await?;

        let delivery = self
            .gateway
            .push(&recipient, ServerEvent::NewMessage(message.clone()))
            .await;

        tracing::info!(
            "User {} mengirim message {} ke {} (conversation {}, push: {:?})",
            sender, message.id, recipient, conversation.id, delivery
        );

        Ok(message)
    }

    /// Semua message antara `user` dan `other_raw`, urut waktu. 404 kalau belum pernah ada conversation.
    pub async fn conversation_messages(&self, user: &UserId, other_raw: &str) -> Result<Vec<Message>, AppError> {
        let other = UserId::parse(other_raw)?;

        let conversation = self
            .store
            .find_between(&ParticipantPair::new(user.clone(), other))
            .await?
            .ok_or_else(|| AppError::not_found("Conversation not found"))?;

        self.store.list_by_conversation(conversation.id).await
    }

    /// Conversation milik `user`, dengan `user` sendiri dihapus dari participants
    pub async fn conversations_for(&self, user: &UserId) -> Result<Vec<ConversationView>, AppError> {
        let conversations = self.store.list_for_user(user).await?;
        Ok(conversations.iter().map(|c| c.view_for(user)).collect())
    }
}
