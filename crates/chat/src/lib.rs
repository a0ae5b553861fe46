//! Realtime chat: a STOMP client over websocket/SockJS and the session state
//! kept around it (connection handle, room membership, online users).

pub mod client;
pub mod error;
pub mod message;
pub mod session;

#[cfg(test)]
mod test_support;

pub use {
    client::{StompClient, Subscription},
    error::ChatError,
    message::{ChatMessage, ChatType, OnlineUsers, Presence},
    session::RealtimeSession,
};
