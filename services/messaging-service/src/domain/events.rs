// Event WebSocket. Frame: {"event": <nama>, "data": <payload>}
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Message, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    NewMessage(Message),
    MessagesSeen(SeenReceipt),
    GetUsersOnline(Vec<UserId>),
    Pong,
    Error(SocketError),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage(_) => "newMessage",
            ServerEvent::MessagesSeen(_) => "messagesSeen",
            ServerEvent::GetUsersOnline(_) => "getUsersOnline",
            ServerEvent::Pong => "pong",
            ServerEvent::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenReceipt {
    pub conversation_id: Uuid,
    pub seen_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    MarkMessageAsSeen(MarkSeenPayload),
    Ping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeenPayload {
    pub conversation_id: Uuid,
    #[serde(default)]
    pub user_id: Option<String>,
}
