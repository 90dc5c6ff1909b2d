// Seen Synchronizer: ack dari client -> flip seen -> notify participant lain
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{SeenReceipt, ServerEvent, UserId};
use crate::error::AppError;
use crate::repositories::ChatStore;

use super::{DeliveryGateway, DeliveryOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenOutcome {
    pub conversation_id: Uuid,
    pub flipped: u64,
    pub notified: UserId,
    pub delivery: DeliveryOutcome,
}

#[derive(Clone)]
pub struct SeenSynchronizer {
    store: Arc<dyn ChatStore>,
    gateway: DeliveryGateway,
}

impl SeenSynchronizer {
    pub fn new(store: Arc<dyn ChatStore>, gateway: DeliveryGateway) -> Self {
        Self { store, gateway }
    }

    pub async fn acknowledge(&self, conversation_id: Uuid, acking_user: &UserId) -> Result<SeenOutcome, AppError> {
        let conversation = self
            .store
            .get(conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation tidak ditemukan"))?;

        // Conversation selalu tepat dua participant, jadi "participant lain" selalu tunggal
        let other = conversation
            .other_participant(acking_user)
            .cloned()
            .ok_or_else(|| AppError::forbidden("Tidak memiliki akses ke conversation ini"))?;

        // Messages lalu preview, sebagai satu unit. Error di sini membatalkan semuanya.
        let flipped = self.store.mark_conversation_seen(conversation_id).await?;

        let delivery = self
            .gateway
            .push(
                &other,
                ServerEvent::MessagesSeen(SeenReceipt {
                    conversation_id,
                    seen_by: acking_user.clone(),
                }),
            )
            .await;

        tracing::info!(
            "User {} menandai {} message sebagai seen di conversation {}",
            acking_user, flipped, conversation_id
        );

        Ok(SeenOutcome {
            conversation_id,
            flipped,
            notified: other,
            delivery,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Conversation, LastMessage, Message, NewMessage, ParticipantPair};
    use crate::realtime::{ConnectionHandle, PresenceRegistry};
    use crate::repositories::{ConversationStore, InMemoryStore, MessageStore};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    fn user(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    async fn seeded(store: &InMemoryStore) -> Conversation {
        let conversation = store
            .find_or_create(
                ParticipantPair::new(user("alice"), user("bob")),
                LastMessage::unseen(Some("hi".into()), user("alice")),
            )
            .await
            .unwrap();

        for text in ["hi", "are you there?"] {
            store
                .append(NewMessage {
                    conversation_id: conversation.id,
                    sender_id: user("alice"),
                    text: Some(text.to_string()),
                    img: None,
                    audio: None,
                })
                .await
                .unwrap();
        }
        conversation
    }

    #[tokio::test]
    async fn test_ack_flips_messages_and_notifies_sender() {
        let store = InMemoryStore::new();
        let conversation = seeded(&store).await;
        let presence = PresenceRegistry::new();
        let (tx, mut alice_rx) = mpsc::channel(16);
        presence.register(user("alice"), ConnectionHandle::new(tx)).await;
        while alice_rx.try_recv().is_ok() {}

        let synchronizer = SeenSynchronizer::new(Arc::new(store.clone()), DeliveryGateway::new(presence));
        let outcome = synchronizer.acknowledge(conversation.id, &user("bob")).await.unwrap();

        assert_eq!(outcome.flipped, 2);
        assert_eq!(outcome.notified, user("alice"));
        assert_eq!(outcome.delivery, DeliveryOutcome::Delivered);

        let messages = store.list_by_conversation(conversation.id).await.unwrap();
        assert!(messages.iter().all(|m| m.seen));
        assert!(store.get(conversation.id).await.unwrap().unwrap().last_message.seen);

        assert_eq!(
            alice_rx.try_recv().unwrap(),
            ServerEvent::MessagesSeen(SeenReceipt {
                conversation_id: conversation.id,
                seen_by: user("bob"),
            })
        );
    }

    #[tokio::test]
    async fn test_ack_with_sender_offline_still_flips() {
        let store = InMemoryStore::new();
        let conversation = seeded(&store).await;
        let synchronizer =
            SeenSynchronizer::new(Arc::new(store.clone()), DeliveryGateway::new(PresenceRegistry::new()));

        let outcome = synchronizer.acknowledge(conversation.id, &user("bob")).await.unwrap();

        assert_eq!(outcome.delivery, DeliveryOutcome::Offline);
        let messages = store.list_by_conversation(conversation.id).await.unwrap();
        assert!(messages.iter().all(|m| m.seen));
    }

    #[tokio::test]
    async fn test_non_participant_is_rejected() {
        let store = InMemoryStore::new();
        let conversation = seeded(&store).await;
        let synchronizer =
            SeenSynchronizer::new(Arc::new(store.clone()), DeliveryGateway::new(PresenceRegistry::new()));

        let result = synchronizer.acknowledge(conversation.id, &user("mallory")).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        let messages = store.list_by_conversation(conversation.id).await.unwrap();
        assert!(messages.iter().all(|m| !m.seen));
    }

    #[tokio::test]
    async fn test_unknown_conversation() {
        let synchronizer = SeenSynchronizer::new(
            Arc::new(InMemoryStore::new()),
            DeliveryGateway::new(PresenceRegistry::new()),
        );

        let result = synchronizer.acknowledge(Uuid::new_v4(), &user("bob")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    // Store yang gagal saat flip seen, untuk memastikan tidak ada notifikasi
    struct BrokenSeenStore(InMemoryStore);

    #[async_trait]
    impl ConversationStore for BrokenSeenStore {
        async fn find_or_create(&self, p: ParticipantPair, l: LastMessage) -> Result<Conversation, AppError> {
            self.0.find_or_create(p, l).await
        }
        async fn find_between(&self, p: &ParticipantPair) -> Result<Option<Conversation>, AppError> {
            self.0.find_between(p).await
        }
        async fn get(&self, id: Uuid) -> Result<Option<Conversation>, AppError> {
            self.0.get(id).await
        }
        async fn list_for_user(&self, u: &UserId) -> Result<Vec<Conversation>, AppError> {
            self.0.list_for_user(u).await
        }
        async fn update_preview(&self, id: Uuid, l: LastMessage) -> Result<(), AppError> {
            self.0.update_preview(id, l).await
        }
        async fn mark_preview_seen(&self, _id: Uuid) -> Result<(), AppError> {
            Err(AppError::internal("store down"))
        }
    }

    #[async_trait]
    impl MessageStore for BrokenSeenStore {
        async fn append(&self, m: NewMessage) -> Result<Message, AppError> {
            self.0.append(m).await
        }
        async fn list_by_conversation(&self, id: Uuid) -> Result<Vec<Message>, AppError> {
            self.0.list_by_conversation(id).await
        }
        async fn mark_all_seen(&self, _id: Uuid) -> Result<u64, AppError> {
            Err(AppError::internal("store down"))
        }
    }

    #[async_trait]
    impl ChatStore for BrokenSeenStore {
        fn backend(&self) -> &'static str {
            "broken"
        }
        async fn append_with_preview(&self, m: NewMessage) -> Result<Message, AppError> {
            self.0.append_with_preview(m).await
        }
        async fn mark_conversation_seen(&self, _id: Uuid) -> Result<u64, AppError> {
            Err(AppError::internal("store down"))
        }
    }

    #[tokio::test]
    async fn test_store_failure_aborts_without_notification() {
        let inner = InMemoryStore::new();
        let conversation = seeded(&inner).await;
        let presence = PresenceRegistry::new();
        let (tx, mut alice_rx) = mpsc::channel(16);
        presence.register(user("alice"), ConnectionHandle::new(tx)).await;
        while alice_rx.try_recv().is_ok() {}

        let synchronizer =
            SeenSynchronizer::new(Arc::new(BrokenSeenStore(inner.clone())), DeliveryGateway::new(presence));
        let result = synchronizer.acknowledge(conversation.id, &user("bob")).await;

        assert!(matches!(result, Err(AppError::InternalServer(_))));
        assert!(alice_rx.try_recv().is_err());
        let messages = inner.list_by_conversation(conversation.id).await.unwrap();
        assert!(messages.iter().all(|m| !m.seen));
    }
}
