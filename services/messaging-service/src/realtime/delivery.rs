// Delivery Gateway: push best-effort ke koneksi live penerima
use crate::domain::{ServerEvent, UserId};

use super::PresenceRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Penerima tidak online, tidak ada outbox
    Offline,
    /// Koneksi tertutup atau antreannya penuh, event dibuang
    Dropped,
}

#[derive(Clone)]
pub struct DeliveryGateway {
    presence: PresenceRegistry,
}

impl DeliveryGateway {
    pub fn new(presence: PresenceRegistry) -> Self {
        Self { presence }
    }

    /// Fire-and-forget. Tidak pernah gagal: write durable sudah commit sebelum push dipanggil.
    pub async fn push(&self, recipient: &UserId, event: ServerEvent) -> DeliveryOutcome {
        let name = event.name();

        let Some(handle) = self.presence.lookup(recipient).await else {
            tracing::debug!("User {} offline, event {} tidak di-push", recipient, name);
            return DeliveryOutcome::Offline;
        };

        match handle.send(event) {
            Ok(()) => {
                tracing::debug!("Event {} di-push ke user {} (koneksi {})", name, recipient, handle.id());
                DeliveryOutcome::Delivered
            }
            Err(_) => {
                tracing::warn!("Gagal push event {} ke user {}: koneksi tertutup atau penuh", name, recipient);
                DeliveryOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ConnectionHandle;
    use tokio::sync::mpsc;

    fn user(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_push_to_online_user() {
        let presence = PresenceRegistry::new();
        let gateway = DeliveryGateway::new(presence.clone());
        let (handle, mut rx) = ConnectionHandle::channel();
        presence.register(user("bob"), handle).await;
        while rx.try_recv().is_ok() {}

        let outcome = gateway.push(&user("bob"), ServerEvent::Pong).await;

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::Pong);
    }

    #[tokio::test]
    async fn test_push_to_offline_user_is_noop() {
        let gateway = DeliveryGateway::new(PresenceRegistry::new());
        assert_eq!(gateway.push(&user("bob"), ServerEvent::Pong).await, DeliveryOutcome::Offline);
    }

    #[tokio::test]
    async fn test_push_after_unregister_is_noop() {
        let presence = PresenceRegistry::new();
        let gateway = DeliveryGateway::new(presence.clone());
        let (handle, mut rx) = ConnectionHandle::channel();
        let bob_connection = handle.id();
        presence.register(user("bob"), handle).await;
        presence.unregister(&user("bob"), bob_connection).await;
        while rx.try_recv().is_ok() {}

        assert_eq!(gateway.push(&user("bob"), ServerEvent::Pong).await, DeliveryOutcome::Offline);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_push_to_closed_connection_is_swallowed() {
        let presence = PresenceRegistry::new();
        let gateway = DeliveryGateway::new(presence.clone());
        let (handle, rx) = ConnectionHandle::channel();
        presence.register(user("bob"), handle).await;
        drop(rx);

        assert_eq!(gateway.push(&user("bob"), ServerEvent::Pong).await, DeliveryOutcome::Dropped);
    }

    #[tokio::test]
    async fn test_push_to_full_queue_is_dropped() {
        let presence = PresenceRegistry::new();
        let gateway = DeliveryGateway::new(presence.clone());
        // Kapasitas 2: snapshot getUsersOnline dari register lalu satu push
        let (tx, mut rx) = mpsc::channel(2);
        presence.register(user("bob"), ConnectionHandle::new(tx)).await;

        assert_eq!(gateway.push(&user("bob"), ServerEvent::Pong).await, DeliveryOutcome::Delivered);
        assert_eq!(gateway.push(&user("bob"), ServerEvent::Pong).await, DeliveryOutcome::Dropped);

        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::GetUsersOnline(_)));
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::Pong);
        assert!(rx.try_recv().is_err());
    }
}
