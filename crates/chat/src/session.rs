//! Realtime session: the live connection plus the little state the UI keeps
//! alongside it.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    tokio::sync::RwLock,
    tracing::{debug, info, warn},
};

use parlor_config::{ParlorConfig, RealtimeConfig};

use crate::{
    client::{StompClient, Subscription},
    error::ChatError,
    message::{
        ChatMessage, GET_ONLINE_USERS, ONLINE_USERS_TOPIC, OnlineUsers, Presence, SEND_MESSAGE,
        room_topic,
    },
};

pub struct RealtimeSession {
    base_url: String,
    realtime: RealtimeConfig,
    client: RwLock<Option<Arc<StompClient>>>,
    in_room: AtomicBool,
    online_users: RwLock<OnlineUsers>,
}

impl RealtimeSession {
    pub fn new(config: &ParlorConfig) -> Self {
        Self {
            base_url: config.server.base_url.clone(),
            realtime: config.realtime.clone(),
            client: RwLock::new(None),
            in_room: AtomicBool::new(false),
            online_users: RwLock::new(OnlineUsers::new()),
        }
    }

    /// Connect and keep the handle. A previously held connection is closed
    /// once the new one is up.
    pub async fn connect(&self, headers: &[(String, String)]) -> Result<(), ChatError> {
        let client = StompClient::connect(
            &self.base_url,
            &self.realtime.endpoint,
            self.realtime.transport,
            headers,
        )
        .await?;
        let previous = self.client.write().await.replace(Arc::new(client));
        if let Some(previous) = previous
            && let Err(e) = previous.disconnect().await
        {
            warn!(error = %e, "closing previous realtime connection failed");
        }
        Ok(())
    }

    /// Close the connection if one is live. Never fails.
    pub async fn disconnect(&self) {
        let client = self.client.write().await.take();
        match client {
            Some(client) if client.is_connected() => {
                if let Err(e) = client.disconnect().await {
                    warn!(error = %e, "realtime disconnect failed");
                }
            },
            _ => debug!("no live realtime connection"),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.client
            .read()
            .await
            .as_ref()
            .is_some_and(|c| c.is_connected())
    }

    pub fn enter_room(&self) {
        self.in_room.store(true, Ordering::SeqCst);
    }

    pub fn leave_room(&self) {
        self.in_room.store(false, Ordering::SeqCst);
    }

    pub fn is_in_room(&self) -> bool {
        self.in_room.load(Ordering::SeqCst)
    }

    /// Replace the online user set wholesale.
    pub async fn update_online_users<I>(&self, users: I)
    where
        I: IntoIterator<Item = String>,
    {
        let users: OnlineUsers = users.into_iter().map(|u| (u, Presence::Online)).collect();
        debug!(count = users.len(), "online users updated");
        *self.online_users.write().await = users;
    }

    pub async fn online_users(&self) -> OnlineUsers {
        self.online_users.read().await.clone()
    }

    // ── Messaging ────────────────────────────────────────────────────────────

    pub async fn subscribe(&self, destination: &str) -> Result<Subscription, ChatError> {
        self.client().await?.subscribe(destination)
    }

    pub async fn unsubscribe(&self, subscription: Subscription) -> Result<(), ChatError> {
        self.client().await?.unsubscribe(subscription)
    }

    pub async fn send(&self, destination: &str, body: impl Into<String>) -> Result<(), ChatError> {
        self.client().await?.send(destination, body)
    }

    pub async fn subscribe_room(&self, room_id: &str) -> Result<Subscription, ChatError> {
        self.subscribe(&room_topic(room_id)).await
    }

    pub async fn send_chat(&self, message: &ChatMessage) -> Result<(), ChatError> {
        self.client().await?.send_json(SEND_MESSAGE, message)
    }

    /// Ask the server for the online user list and wait for the answer.
    pub async fn request_online_users(&self) -> Result<Vec<String>, ChatError> {
        let client = self.client().await?;
        let mut subscription = client.subscribe(ONLINE_USERS_TOPIC)?;
        client.send(GET_ONLINE_USERS, "")?;
        let users: Vec<String> = subscription.next_json().await.ok_or(ChatError::Closed)??;
        client.unsubscribe(subscription)?;
        info!(count = users.len(), "online users received");
        self.update_online_users(users.clone()).await;
        Ok(users)
    }

    async fn client(&self) -> Result<Arc<StompClient>, ChatError> {
        self.client
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(ChatError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{Broker, BrokerOptions},
        parlor_protocol::Command,
    };

    async fn session_for(broker: &Broker) -> RealtimeSession {
        let mut config = ParlorConfig::default();
        config.server.base_url = broker.base_url.clone();
        RealtimeSession::new(&config)
    }

    #[tokio::test]
    async fn disconnect_without_connection_is_noop() {
        let session = RealtimeSession::new(&ParlorConfig::default());
        session.disconnect().await;
        session.disconnect().await;
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn room_flag_and_presence_are_plain_state() {
        let session = RealtimeSession::new(&ParlorConfig::default());
        assert!(!session.is_in_room());
        session.enter_room();
        session.enter_room();
        assert!(session.is_in_room());
        session.leave_room();
        assert!(!session.is_in_room());

        session
            .update_online_users(["alice".to_string(), "bob".to_string()])
            .await;
        session.update_online_users(["carol".to_string()]).await;
        let users = session.online_users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users.get("carol"), Some(&Presence::Online));
    }

    #[tokio::test]
    async fn messaging_requires_connection() {
        let session = RealtimeSession::new(&ParlorConfig::default());
        let msg = ChatMessage::text("1", "alice", "hi");
        assert!(matches!(
            session.send_chat(&msg).await,
            Err(ChatError::NotConnected)
        ));
        assert!(matches!(
            session.subscribe_room("1").await,
            Err(ChatError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn chat_round_trip_through_broker() {
        let broker = Broker::start(BrokerOptions::default()).await;
        let session = session_for(&broker).await;
        session
            .connect(&[("roomId".to_string(), "9".to_string())])
            .await
            .unwrap();
        assert!(session.is_connected().await);

        let mut room = session.subscribe_room("9").await.unwrap();
        assert_eq!(room.destination(), "/topic/message/9");
        session
            .send_chat(&ChatMessage::join("9", "alice"))
            .await
            .unwrap();
        let got: ChatMessage = room.next_json().await.unwrap().unwrap();
        assert_eq!(got, ChatMessage::join("9", "alice"));

        let users = session.request_online_users().await.unwrap();
        assert_eq!(users, ["alice", "bob"]);
        assert_eq!(session.online_users().await.len(), 2);
        broker.wait_for(Command::Unsubscribe).await;

        session.disconnect().await;
        assert!(!session.is_connected().await);
        broker.wait_for(Command::Disconnect).await;
    }

    #[tokio::test]
    async fn reconnect_closes_previous_connection() {
        let broker = Broker::start(BrokerOptions::default()).await;
        let session = session_for(&broker).await;
        session.connect(&[]).await.unwrap();
        session.connect(&[]).await.unwrap();

        broker.wait_for(Command::Disconnect).await;
        assert_eq!(broker.count(Command::Connect), 2);
        assert_eq!(broker.count(Command::Disconnect), 1);
        assert!(session.is_connected().await);
    }

    #[tokio::test]
    async fn rejected_connect_leaves_no_handle() {
        let broker = Broker::start(BrokerOptions {
            reject: true,
            ..Default::default()
        })
        .await;
        let session = session_for(&broker).await;
        assert!(matches!(
            session.connect(&[]).await,
            Err(ChatError::Rejected(_))
        ));
        assert!(!session.is_connected().await);
        session.disconnect().await;
    }
}
