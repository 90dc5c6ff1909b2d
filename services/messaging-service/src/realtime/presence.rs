// Presence Registry: user -> koneksi WebSocket aktif (single process, in-memory)
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{ServerEvent, UserId};

/// Kapasitas antrean event per koneksi. Client yang tidak membaca akan kehilangan event, bukan menumpuk memori.
pub const OUTBOUND_BUFFER: usize = 64;

/// Handle ke satu koneksi live. Event dikirim lewat channel bounded ke task writer socket.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    sender: mpsc::Sender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
        }
    }

    /// Handle baru beserta receiver untuk task writer
    pub fn channel() -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Kirim event tanpa menunggu. Gagal kalau socket sudah tertutup atau antreannya penuh.
    pub fn send(&self, event: ServerEvent) -> Result<(), ServerEvent> {
        self.sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(event) => {
                tracing::warn!("Antrean koneksi {} penuh, event {} dibuang", self.id, event.name());
                event
            }
            TrySendError::Closed(event) => event,
        })
    }
}

#[derive(Default)]
struct RegistryState {
    // Semua koneksi yang menerima broadcast getUsersOnline (termasuk yang anonim)
    observers: HashMap<Uuid, ConnectionHandle>,
    online: HashMap<UserId, ConnectionHandle>,
    // Urutan registrasi, overwrite tidak mengubah posisi
    order: Vec<UserId>,
}

impl RegistryState {
    fn snapshot(&self) -> Vec<UserId> {
        self.order.clone()
    }

    fn broadcast_online(&self) {
        let event = ServerEvent::GetUsersOnline(self.snapshot());
        for observer in self.observers.values() {
            if observer.send(event.clone()).is_err() {
                tracing::debug!("Skip broadcast ke koneksi {} yang sudah tertutup", observer.id());
            }
        }
    }

    fn remove_user(&mut self, user: &UserId) -> Option<ConnectionHandle> {
        let removed = self.online.remove(user)?;
        self.order.retain(|online| online != user);
        Some(removed)
    }
}

/// Registry milik proses server. Setiap mutasi dan broadcast-nya terjadi di bawah lock yang sama,
/// jadi observer tidak pernah menerima daftar online yang sudah basi.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tambah koneksi sebagai observer dan kirim snapshot online users ke koneksi itu saja
    pub async fn attach(&self, handle: ConnectionHandle) {
        let mut state = self.state.lock().await;
        let _ = handle.send(ServerEvent::GetUsersOnline(state.snapshot()));
        state.observers.insert(handle.id(), handle);
        tracing::info!("Koneksi ditambahkan. Total koneksi: {}", state.observers.len());
    }

    /// Insert atau overwrite mapping user -> koneksi (last-registered-wins), lalu broadcast
    pub async fn register(&self, user: UserId, handle: ConnectionHandle) {
        let mut state = self.state.lock().await;

        state.observers.entry(handle.id()).or_insert_with(|| handle.clone());
        if state.online.insert(user.clone(), handle).is_some() {
            tracing::info!("User {} reconnect, koneksi lama di-overwrite", user);
        } else {
            state.order.push(user.clone());
            tracing::info!("User {} online. Total online: {}", user, state.order.len());
        }

        state.broadcast_online();
    }

    /// Hapus mapping user, tapi hanya kalau masih menunjuk ke `connection_id`, lalu broadcast.
    /// Koneksi baru dari user yang sama tidak ikut terhapus oleh close koneksi lamanya.
    pub async fn unregister(&self, user: &UserId, connection_id: Uuid) -> bool {
        let mut state = self.state.lock().await;

        let still_current = state
            .online
            .get(user)
            .is_some_and(|handle| handle.id() == connection_id);

        if !still_current {
            tracing::debug!("Koneksi {} milik {} sudah digantikan, mapping dipertahankan", connection_id, user);
            return false;
        }

        state.remove_user(user);
        tracing::info!("User {} offline. Total online: {}", user, state.order.len());
        state.broadcast_online();
        true
    }

    /// Lepas koneksi dari daftar penerima broadcast. Dipanggil saat socket tertutup.
    pub async fn detach(&self, connection_id: Uuid) {
        let mut state = self.state.lock().await;
        state.observers.remove(&connection_id);
        tracing::info!("Koneksi {} dilepas. Total koneksi: {}", connection_id, state.observers.len());
    }

    /// Pure read, tanpa side effect
    pub async fn lookup(&self, user: &UserId) -> Option<ConnectionHandle> {
        let state = self.state.lock().await;
        state.online.get(user).cloned()
    }

    pub async fn online_users(&self) -> Vec<UserId> {
        let state = self.state.lock().await;
        state.snapshot()
    }

    pub async fn connection_count(&self) -> usize {
        let state = self.state.lock().await;
        state.observers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::Receiver;

    fn user(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    fn connection() -> (ConnectionHandle, Receiver<ServerEvent>) {
        ConnectionHandle::channel()
    }

    fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn last_online(rx: &mut Receiver<ServerEvent>) -> Vec<UserId> {
        match drain(rx).pop() {
            Some(ServerEvent::GetUsersOnline(users)) => users,
            other => panic!("expected getUsersOnline, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_attach_sends_snapshot() {
        let registry = PresenceRegistry::new();
        let (alice, _alice_rx) = connection();
        registry.register(user("alice"), alice).await;

        let (observer, mut observer_rx) = connection();
        registry.attach(observer).await;

        assert_eq!(last_online(&mut observer_rx), vec![user("alice")]);
    }

    #[tokio::test]
    async fn test_register_broadcasts_to_every_connection() {
        let registry = PresenceRegistry::new();
        let (observer, mut observer_rx) = connection();
        registry.attach(observer).await;
        drain(&mut observer_rx);

        let (alice, mut alice_rx) = connection();
        registry.register(user("alice"), alice).await;
        let (bob, _bob_rx) = connection();
        registry.register(user("bob"), bob).await;

        assert_eq!(last_online(&mut observer_rx), vec![user("alice"), user("bob")]);
        assert_eq!(last_online(&mut alice_rx), vec![user("alice"), user("bob")]);
    }

    #[tokio::test]
    async fn test_second_connection_overwrites_and_keeps_order() {
        let registry = PresenceRegistry::new();
        let (first, _first_rx) = connection();
        let (bob, _bob_rx) = connection();
        let (second, _second_rx) = connection();
        let second_id = second.id();

        registry.register(user("alice"), first).await;
        registry.register(user("bob"), bob).await;
        registry.register(user("alice"), second).await;

        assert_eq!(registry.lookup(&user("alice")).await.unwrap().id(), second_id);
        assert_eq!(registry.online_users().await, vec![user("alice"), user("bob")]);
    }

    #[tokio::test]
    async fn test_unregister_removes_and_broadcasts() {
        let registry = PresenceRegistry::new();
        let (alice, mut alice_rx) = connection();
        let (bob, _bob_rx) = connection();
        let bob_id = bob.id();
        registry.register(user("alice"), alice).await;
        registry.register(user("bob"), bob).await;

        assert!(registry.unregister(&user("bob"), bob_id).await);
        assert!(registry.lookup(&user("bob")).await.is_none());
        assert_eq!(last_online(&mut alice_rx), vec![user("alice")]);

        assert!(!registry.unregister(&user("bob"), bob_id).await);
    }

    #[tokio::test]
    async fn test_stale_close_keeps_newer_connection() {
        let registry = PresenceRegistry::new();
        let (old, _old_rx) = connection();
        let old_id = old.id();
        let (new, _new_rx) = connection();
        let new_id = new.id();

        registry.register(user("alice"), old).await;
        registry.register(user("alice"), new).await;
        assert!(!registry.unregister(&user("alice"), old_id).await);
        registry.detach(old_id).await;

        assert_eq!(registry.lookup(&user("alice")).await.unwrap().id(), new_id);

        assert!(registry.unregister(&user("alice"), new_id).await);
        registry.detach(new_id).await;
        assert!(registry.lookup(&user("alice")).await.is_none());
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_skips_closed_connection() {
        let registry = PresenceRegistry::new();
        let (closed, closed_rx) = connection();
        registry.attach(closed).await;
        drop(closed_rx);

        let (alice, mut alice_rx) = connection();
        registry.register(user("alice"), alice).await;

        assert_eq!(last_online(&mut alice_rx), vec![user("alice")]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_event_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(tx);

        assert!(handle.send(ServerEvent::Pong).is_ok());
        assert_eq!(handle.send(ServerEvent::Pong), Err(ServerEvent::Pong));

        assert_eq!(rx.try_recv().unwrap(), ServerEvent::Pong);
        assert!(handle.send(ServerEvent::Pong).is_ok());
    }

    #[tokio::test]
    async fn test_stalled_connection_does_not_block_broadcast() {
        let registry = PresenceRegistry::new();
        // Koneksi yang tidak pernah dibaca, antreannya cepat penuh
        let (stalled, mut stalled_rx) = connection();
        registry.attach(stalled).await;

        let (alice, mut alice_rx) = connection();
        registry.register(user("alice"), alice).await;
        for i in 0..(OUTBOUND_BUFFER * 2) {
            let (peer, _peer_rx) = connection();
            registry.register(user(&format!("peer-{}", i)), peer).await;
            drain(&mut alice_rx);
        }

        assert_eq!(registry.online_users().await.len(), OUTBOUND_BUFFER * 2 + 1);
        assert_eq!(drain(&mut stalled_rx).len(), OUTBOUND_BUFFER);
    }
}
