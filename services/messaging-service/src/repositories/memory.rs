// Store in-memory, dipakai kalau DATABASE_URL tidak diset (development) dan di tests
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChatStore, ConversationStore, MessageStore};
use crate::domain::{Conversation, LastMessage, Message, NewMessage, ParticipantPair, UserId};
use crate::error::AppError;

#[derive(Default)]
struct MemoryState {
    conversations: HashMap<Uuid, Conversation>,
    by_pair: HashMap<ParticipantPair, Uuid>,
    messages: HashMap<Uuid, Vec<Message>>,
}

impl MemoryState {
    fn conversation_mut(&mut self, conversation_id: Uuid) -> Result<&mut Conversation, AppError> {
        self.conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| AppError::not_found("Conversation tidak ditemukan"))
    }

    fn push_message(&mut self, message: NewMessage) -> Result<Message, AppError> {
        let log = self
            .messages
            .get_mut(&message.conversation_id)
            .ok_or_else(|| AppError::not_found("Conversation tidak ditemukan"))?;

        // created_at tidak boleh mundur dalam satu conversation
        let created_at = match log.last() {
            Some(last) => Utc::now().max(last.created_at),
            None => Utc::now(),
        };

        let persisted = message.into_message(created_at);
        log.push(persisted.clone());
        Ok(persisted)
    }

    fn set_preview(&mut self, conversation_id: Uuid, preview: LastMessage) -> Result<(), AppError> {
        let conversation = self.conversation_mut(conversation_id)?;
        conversation.last_message = preview;
        conversation.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn find_or_create(
        &self,
        participants: ParticipantPair,
        initial_preview: LastMessage,
    ) -> Result<Conversation, AppError> {
        // Lookup dan insert di bawah satu write lock
        let mut state = self.state.write().await;

        if let Some(existing) = state.by_pair.get(&participants).copied() {
            if let Some(conversation) = state.conversations.get(&existing) {
                return Ok(conversation.clone());
            }
        }

        let conversation = Conversation::new(participants.clone(), initial_preview);
        state.by_pair.insert(participants, conversation.id);
        state.conversations.insert(conversation.id, conversation.clone());
        state.messages.insert(conversation.id, Vec::new());

        Ok(conversation)
    }

    async fn find_between(&self, participants: &ParticipantPair) -> Result<Option<Conversation>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .by_pair
            .get(participants)
            .and_then(|id| state.conversations.get(id))
            .cloned())
    }

    async fn get(&self, conversation_id: Uuid) -> Result<Option<Conversation>, AppError> {
        let state = self.state.read().await;
        Ok(state.conversations.get(&conversation_id).cloned())
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Conversation>, AppError> {
        let state = self.state.read().await;
        let mut conversations: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|conversation| conversation.is_participant(user))
            .cloned()
            .collect();

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn update_preview(&self, conversation_id: Uuid, preview: LastMessage) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.set_preview(conversation_id, preview)
    }

    async fn mark_preview_seen(&self, conversation_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let conversation = state.conversation_mut(conversation_id)?;
        conversation.last_message.seen = true;
        conversation.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn append(&self, message: NewMessage) -> Result<Message, AppError> {
        let mut state = self.state.write().await;
        state.push_message(message)
    }

    async fn list_by_conversation(&self, conversation_id: Uuid) -> Result<Vec<Message>, AppError> {
        let state = self.state.read().await;
        Ok(state.messages.get(&conversation_id).cloned().unwrap_or_default())
    }

    async fn mark_all_seen(&self, conversation_id: Uuid) -> Result<u64, AppError> {
        let mut state = self.state.write().await;
        Ok(flip_unseen(state.messages.get_mut(&conversation_id)))
    }
}

fn flip_unseen(log: Option<&mut Vec<Message>>) -> u64 {
    let mut flipped = 0;
    for message in log.into_iter().flatten().filter(|m| !m.seen) {
        message.seen = true;
        flipped += 1;
    }
    flipped
}

#[async_trait]
impl ChatStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn append_with_preview(&self, message: NewMessage) -> Result<Message, AppError> {
        // Satu write lock: ack lain tidak bisa menyelip di antara append dan preview
        let mut state = self.state.write().await;
        let preview = message.preview();
        let persisted = state.push_message(message)?;
        state.set_preview(persisted.conversation_id, preview)?;
        Ok(persisted)
    }

    async fn mark_conversation_seen(&self, conversation_id: Uuid) -> Result<u64, AppError> {
        let mut state = self.state.write().await;

        // Validasi dulu supaya tidak ada flip parsial
        state.conversation_mut(conversation_id)?;

        let flipped = flip_unseen(state.messages.get_mut(&conversation_id));
        let conversation = state.conversation_mut(conversation_id)?;
        conversation.last_message.seen = true;
        conversation.updated_at = Utc::now();

        Ok(flipped)
    }
}
