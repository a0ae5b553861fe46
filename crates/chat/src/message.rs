//! Payloads exchanged with the chat broker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Broadcast by the server for every room.
pub const ONLINE_USERS_TOPIC: &str = "/topic/online-users";
/// Chat messages are published here.
pub const SEND_MESSAGE: &str = "/app/sendMessage";
/// Asks the server to publish the online user list.
pub const GET_ONLINE_USERS: &str = "/app/get-online-users";

/// Topic carrying one room's messages.
pub fn room_topic(room_id: &str) -> String {
    format!("/topic/message/{room_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatType {
    #[default]
    Text,
    Join,
    Leave,
    UserList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub username: String,
    pub room_id: String,
    #[serde(default, rename = "type")]
    pub kind: ChatType,
}

impl ChatMessage {
    pub fn text(room_id: impl Into<String>, username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            username: username.into(),
            room_id: room_id.into(),
            kind: ChatType::Text,
        }
    }

    pub fn join(room_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            kind: ChatType::Join,
            ..Self::text(room_id, username, "")
        }
    }

    pub fn leave(room_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            kind: ChatType::Leave,
            ..Self::text(room_id, username, "")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Online,
}

/// Username → presence. Replaced wholesale on every update.
pub type OnlineUsers = BTreeMap<String, Presence>;
