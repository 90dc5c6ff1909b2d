// WebSocket Handler untuk presence, push message, dan seen receipt
use axum::{
    extract::{
        ws::{Message as WsFrame, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;

use crate::{
    config::AppState,
    domain::{ClientEvent, ServerEvent, SocketError, UserId},
    error::AppError,
    middleware::auth::authenticate,
    realtime::ConnectionHandle,
};

// Query handshake: /ws?userId=..&token=..
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

/// Identitas koneksi. Token valid menang atas `userId`; token tidak valid ditolak.
/// Tanpa identitas (atau "undefined") koneksi hanya menjadi observer.
fn resolve_identity(query: &WsQuery, jwt_secret: &str) -> Result<Option<UserId>, AppError> {
    if let Some(token) = query.token.as_deref().filter(|token| !token.is_empty()) {
        return authenticate(token, jwt_secret).map(Some);
    }

    Ok(query
        .user_id
        .as_deref()
        .and_then(|raw| UserId::parse(raw).ok()))
}

/// User yang melakukan ack. Identitas koneksi selalu menang; `userId` di payload (biasanya lawan
/// bicara yang akan dinotifikasi) hanya dipakai untuk koneksi anonim.
fn acking_user(identity: Option<&UserId>, payload_user: Option<&str>) -> Result<UserId, AppError> {
    if let Some(identity) = identity {
        return Ok(identity.clone());
    }

    payload_user
        .and_then(|raw| UserId::parse(raw).ok())
        .ok_or_else(|| AppError::unauthorized("Identitas user diperlukan untuk markMessageAsSeen"))
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let identity = resolve_identity(&query, &state.config.jwt_secret)?;

    match &identity {
        Some(user) => tracing::info!("WebSocket handshake dari user {}", user),
        None => tracing::info!("WebSocket handshake tanpa identitas, koneksi sebagai observer"),
    }

    Ok(ws.on_upgrade(move |socket| handle_websocket_socket(socket, state, identity)))
}

async fn handle_websocket_socket(socket: WebSocket, state: AppState, identity: Option<UserId>) {
    let (handle, mut rx) = ConnectionHandle::channel();
    let connection_id = handle.id();

    // Registrasi sekaligus mengirim snapshot getUsersOnline ke koneksi ini
    match &identity {
        Some(user) => state.presence.register(user.clone(), handle.clone()).await,
        None => state.presence.attach(handle.clone()).await,
    }

    let (mut sender, mut receiver) = socket.split();

    // Outgoing: drain channel event ke socket
    let mut outgoing_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("Gagal serialize event {}: {}", event.name(), e);
                    continue;
                }
            };

            if sender.send(WsFrame::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Incoming: proses frame dari client
    let incoming_state = state.clone();
    let incoming_identity = identity.clone();
    let incoming_handle = handle.clone();
    let mut incoming_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    let err = AppError::from(e);
                    tracing::warn!("Koneksi {} putus: {}", connection_id, err);
                    break;
                }
            };

            match frame {
                WsFrame::Text(text) => {
                    if let Err(err) = handle_client_frame(
                        &incoming_state,
                        incoming_identity.as_ref(),
                        &incoming_handle,
                        text.as_str(),
                    )
                    .await
                    {
                        send_error(&incoming_handle, &err);
                    }
                }
                WsFrame::Binary(_) => {
                    send_error(&incoming_handle, &AppError::bad_request("Frame binary tidak didukung"));
                }
                WsFrame::Close(_) => break,
                // Ping/Pong level protocol dijawab otomatis oleh axum
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut outgoing_task => incoming_task.abort(),
        _ = &mut incoming_task => outgoing_task.abort(),
    }

    if let Some(user) = &identity {
        state.presence.unregister(user, connection_id).await;
    }
    state.presence.detach(connection_id).await;
    tracing::info!("WebSocket koneksi {} ditutup", connection_id);
}

/// Proses satu frame text dari client
async fn handle_client_frame(
    state: &AppState,
    identity: Option<&UserId>,
    handle: &ConnectionHandle,
    raw: &str,
) -> Result<(), AppError> {
    let event: ClientEvent = serde_json::from_str(raw)
        .map_err(|e| AppError::bad_request(format!("Frame tidak valid: {}", e)))?;

    match event {
        ClientEvent::Ping => {
            let _ = handle.send(ServerEvent::Pong);
        }
        ClientEvent::MarkMessageAsSeen(payload) => {
            let user = acking_user(identity, payload.user_id.as_deref())?;
            state.seen.acknowledge(payload.conversation_id, &user).await?;
        }
    }

    Ok(())
}

fn send_error(handle: &ConnectionHandle, err: &AppError) {
    tracing::warn!("Event error ke koneksi {}: {}", handle.id(), err);
    let _ = handle.send(ServerEvent::Error(SocketError {
        code: err.code().to_string(),
        message: err.public_message(),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::{SendMessageRequest, SeenReceipt};
    use crate::repositories::{InMemoryStore, MessageStore};
    use crate::utils::media::UnconfiguredResolver;
    use shared::{models::claims::TokenClaims, utils::jwt::issue_token};
    use std::sync::Arc;
    use tokio::sync::mpsc::{self, Receiver};

    const SECRET: &str = "test-secret";

    fn user(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    fn test_state() -> (AppState, InMemoryStore) {
        let store = InMemoryStore::new();
        let state = AppState::with_parts(
            AppConfig::for_tests(SECRET),
            Arc::new(store.clone()),
            Arc::new(UnconfiguredResolver),
        );
        (state, store)
    }

    async fn connect(state: &AppState, who: &str) -> (ConnectionHandle, Receiver<ServerEvent>) {
        let (handle, mut rx) = ConnectionHandle::channel();
        state.presence.register(user(who), handle.clone()).await;
        while rx.try_recv().is_ok() {}
        (handle, rx)
    }

    fn query(user_id: Option<&str>, token: Option<&str>) -> WsQuery {
        WsQuery {
            user_id: user_id.map(str::to_string),
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_identity_from_user_id() {
        let identity = resolve_identity(&query(Some("alice"), None), SECRET).unwrap();
        assert_eq!(identity, Some(user("alice")));
    }

    #[test]
    fn test_placeholder_identity_becomes_observer() {
        assert_eq!(resolve_identity(&query(Some("undefined"), None), SECRET).unwrap(), None);
        assert_eq!(resolve_identity(&query(None, None), SECRET).unwrap(), None);
    }

    #[test]
    fn test_token_subject_wins_over_user_id() {
        let token = issue_token(&TokenClaims::access("bob", 300), SECRET).unwrap();
        let identity = resolve_identity(&query(Some("alice"), Some(&token)), SECRET).unwrap();
        assert_eq!(identity, Some(user("bob")));
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let result = resolve_identity(&query(Some("alice"), Some("not-a-jwt")), SECRET);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_acking_user_resolution() {
        let alice = user("alice");
        assert_eq!(acking_user(Some(&alice), None).unwrap(), alice);
        assert_eq!(acking_user(Some(&alice), Some("alice")).unwrap(), alice);
        assert_eq!(acking_user(None, Some("bob")).unwrap(), user("bob"));
        // userId di payload tidak pernah mengganti identitas koneksi
        assert_eq!(acking_user(Some(&alice), Some("bob")).unwrap(), alice);
        assert!(matches!(acking_user(None, Some("undefined")), Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_ping_frame_gets_pong() {
        let (state, _store) = test_state();
        let (handle, mut rx) = connect(&state, "alice").await;

        handle_client_frame(&state, Some(&user("alice")), &handle, r#"{"event":"ping"}"#)
            .await
            .unwrap();

        assert_eq!(rx.try_recv().unwrap(), ServerEvent::Pong);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_bad_request() {
        let (state, _store) = test_state();
        let (handle, _rx) = connect(&state, "alice").await;

        let result = handle_client_frame(&state, Some(&user("alice")), &handle, "{not json").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_mark_seen_frame_notifies_sender() {
        let (state, store) = test_state();
        let (_alice, mut alice_rx) = connect(&state, "alice").await;
        let (bob, _bob_rx) = connect(&state, "bob").await;
        while alice_rx.try_recv().is_ok() {}

        let sent = state
            .messaging
            .send(
                &user("alice"),
                SendMessageRequest {
                    recipient_id: "bob".to_string(),
                    message: Some("hi".to_string()),
                    img: None,
                    audio: None,
                },
            )
            .await
            .unwrap();

        let frame = format!(
            r#"{{"event":"markMessageAsSeen","data":{{"conversationId":"{}","userId":"bob"}}}}"#,
            sent.conversation_id
        );
        handle_client_frame(&state, Some(&user("bob")), &bob, &frame).await.unwrap();

        assert_eq!(
            alice_rx.try_recv().unwrap(),
            ServerEvent::MessagesSeen(SeenReceipt {
                conversation_id: sent.conversation_id,
                seen_by: user("bob"),
            })
        );
        let messages = store.list_by_conversation(sent.conversation_id).await.unwrap();
        assert!(messages.iter().all(|m| m.seen));
    }

    async fn alice_to_bob(state: &AppState) -> crate::domain::Message {
        state
            .messaging
            .send(
                &user("alice"),
                SendMessageRequest {
                    recipient_id: "bob".to_string(),
                    message: Some("hi".to_string()),
                    img: None,
                    audio: None,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_mark_seen_frame_naming_peer_acks_as_connection_user() {
        let (state, store) = test_state();
        let (_alice, mut alice_rx) = connect(&state, "alice").await;
        let (bob, _bob_rx) = connect(&state, "bob").await;
        while alice_rx.try_recv().is_ok() {}

        let sent = alice_to_bob(&state).await;

        // Client mengirim id lawan bicara di userId
        let frame = format!(
            r#"{{"event":"markMessageAsSeen","data":{{"conversationId":"{}","userId":"alice"}}}}"#,
            sent.conversation_id
        );
        handle_client_frame(&state, Some(&user("bob")), &bob, &frame).await.unwrap();

        let messages = store.list_by_conversation(sent.conversation_id).await.unwrap();
        assert!(messages.iter().all(|m| m.seen));
        assert_eq!(
            alice_rx.try_recv().unwrap(),
            ServerEvent::MessagesSeen(SeenReceipt {
                conversation_id: sent.conversation_id,
                seen_by: user("bob"),
            })
        );
    }

    #[tokio::test]
    async fn test_anonymous_mark_seen_uses_payload_user() {
        let (state, store) = test_state();
        let (_alice, mut alice_rx) = connect(&state, "alice").await;
        let (observer, _observer_rx) = ConnectionHandle::channel();
        state.presence.attach(observer.clone()).await;
        while alice_rx.try_recv().is_ok() {}

        let sent = alice_to_bob(&state).await;

        let frame = format!(
            r#"{{"event":"markMessageAsSeen","data":{{"conversationId":"{}","userId":"bob"}}}}"#,
            sent.conversation_id
        );
        handle_client_frame(&state, None, &observer, &frame).await.unwrap();

        let messages = store.list_by_conversation(sent.conversation_id).await.unwrap();
        assert!(messages.iter().all(|m| m.seen));
        assert!(matches!(alice_rx.try_recv().unwrap(), ServerEvent::MessagesSeen(_)));
    }

    #[tokio::test]
    async fn test_error_event_shape() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx);

        send_error(&handle, &AppError::not_found("Conversation tidak ditemukan"));

        match rx.try_recv().unwrap() {
            ServerEvent::Error(err) => assert_eq!(err.code, "not_found"),
            other => panic!("expected error event, got {:?}", other),
        }
    }
}
