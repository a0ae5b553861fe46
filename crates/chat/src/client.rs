//! STOMP client over a websocket, optionally wrapped in SockJS framing.
//!
//! One task owns the write half and drains an outbound queue; another reads,
//! decodes, and routes `MESSAGE` frames to their subscription by id.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use {
    futures::{SinkExt, Stream, StreamExt},
    rand::{Rng, distr::Alphanumeric},
    serde::{Serialize, de::DeserializeOwned},
    tokio::{
        sync::{mpsc, oneshot},
        task::JoinHandle,
    },
    tokio_tungstenite::tungstenite::{self, Message},
    tracing::{debug, info, warn},
};

use {
    parlor_config::TransportKind,
    parlor_protocol::{Command, Frame, FrameDecoder, Inbound, SockJsFrame, sockjs},
};

use crate::error::ChatError;

type Routes = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Frame>>>>;

enum Outgoing {
    /// Transport-ready text.
    Text(String),
    Close,
}

// ── Subscription ─────────────────────────────────────────────────────────────

/// Stream of `MESSAGE` frames for one `SUBSCRIBE`.
#[derive(Debug)]
pub struct Subscription {
    id: String,
    destination: String,
    frames: mpsc::UnboundedReceiver<Frame>,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Next frame, or `None` once the connection is gone.
    pub async fn next(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    /// Next frame with its body parsed as JSON.
    pub async fn next_json<T: DeserializeOwned>(&mut self) -> Option<Result<T, ChatError>> {
        let frame = self.next().await?;
        Some(serde_json::from_str(&frame.body).map_err(ChatError::from))
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct StompClient {
    transport: TransportKind,
    outbound: mpsc::UnboundedSender<Outgoing>,
    connected: Arc<AtomicBool>,
    routes: Routes,
    next_id: AtomicU64,
    writer: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    reader: JoinHandle<()>,
}

impl StompClient {
    /// Open the websocket and complete the STOMP handshake.
    ///
    /// Resolves once `CONNECTED` arrives. An `ERROR` frame or a closed socket
    /// before that fails the call. There is no timeout.
    #[tracing::instrument(skip_all, fields(base_url = %base_url, transport = ?transport))]
    pub async fn connect(
        base_url: &str,
        endpoint: &str,
        transport: TransportKind,
        headers: &[(String, String)],
    ) -> Result<Self, ChatError> {
        let url = match transport {
            TransportKind::Sockjs => {
                sockjs::sockjs_websocket_url(base_url, endpoint, &server_id(), &session_id())?
            },
            TransportKind::Websocket => sockjs::websocket_url(base_url, endpoint)?,
        };
        debug!(%url, "opening realtime connection");
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        let (mut sink, stream) = ws.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Outgoing>();
        let writer = tokio::spawn(async move {
            while let Some(out) = outbound_rx.recv().await {
                let text = match out {
                    Outgoing::Text(text) => text,
                    Outgoing::Close => {
                        let _ = sink.close().await;
                        break;
                    },
                };
                if let Err(e) = sink.send(Message::text(text)).await {
                    warn!(error = %e, "realtime write failed");
                    break;
                }
            }
        });

        // SockJS sends `o` before it accepts client messages.
        let connect = wrap(transport, Frame::connect(headers).encode())?;
        let pending_connect = match transport {
            TransportKind::Sockjs => Some(connect),
            TransportKind::Websocket => {
                let _ = outbound.send(Outgoing::Text(connect));
                None
            },
        };

        let connected = Arc::new(AtomicBool::new(false));
        let routes: Routes = Arc::default();
        let (ready_tx, ready_rx) = oneshot::channel();
        let reader = tokio::spawn(read_loop(stream, ReadState {
            transport,
            outbound: outbound.clone(),
            pending_connect,
            connected: Arc::clone(&connected),
            routes: Arc::clone(&routes),
            ready: Some(ready_tx),
        }));

        match ready_rx.await {
            Ok(Ok(frame)) => {
                info!(
                    version = frame.get("version").unwrap_or("unknown"),
                    "realtime connected"
                );
            },
            Ok(Err(e)) => {
                reader.abort();
                return Err(e);
            },
            Err(_) => {
                reader.abort();
                return Err(ChatError::Closed);
            },
        }

        Ok(Self {
            transport,
            outbound,
            connected,
            routes,
            next_id: AtomicU64::new(0),
            writer: tokio::sync::Mutex::new(Some(writer)),
            reader,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self, destination: &str) -> Result<Subscription, ChatError> {
        self.ensure_connected()?;
        let id = format!("sub-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, frames) = mpsc::unbounded_channel();
        self.routes().insert(id.clone(), tx);
        self.push(Frame::subscribe(&id, destination))?;
        debug!(id, destination, "subscribed");
        Ok(Subscription {
            id,
            destination: destination.to_string(),
            frames,
        })
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> Result<(), ChatError> {
        self.routes().remove(&subscription.id);
        self.ensure_connected()?;
        self.push(Frame::unsubscribe(&subscription.id))
    }

    pub fn send(&self, destination: &str, body: impl Into<String>) -> Result<(), ChatError> {
        self.ensure_connected()?;
        self.push(Frame::send(destination, body))
    }

    pub fn send_json<T: Serialize>(&self, destination: &str, value: &T) -> Result<(), ChatError> {
        self.ensure_connected()?;
        let body = serde_json::to_string(value)?;
        self.push(Frame::send(destination, body).header("content-type", "application/json"))
    }

    /// Send `DISCONNECT` and close the socket. A no-op when already closed.
    pub async fn disconnect(&self) -> Result<(), ChatError> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let receipt = format!("disconnect-{}", uuid::Uuid::new_v4().simple());
        self.push(Frame::disconnect(&receipt))?;
        let _ = self.outbound.send(Outgoing::Close);
        if let Some(writer) = self.writer.lock().await.take() {
            let _ = writer.await;
        }
        self.routes().clear();
        info!("realtime disconnected");
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), ChatError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ChatError::NotConnected)
        }
    }

    fn push(&self, frame: Frame) -> Result<(), ChatError> {
        debug!(frame = %frame, "sending");
        let text = wrap(self.transport, frame.encode())?;
        self.outbound
            .send(Outgoing::Text(text))
            .map_err(|_| ChatError::Closed)
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<String, mpsc::UnboundedSender<Frame>>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StompClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn wrap(transport: TransportKind, wire: String) -> Result<String, ChatError> {
    Ok(match transport {
        TransportKind::Sockjs => sockjs::encode(&[wire.as_str()])?,
        TransportKind::Websocket => wire,
    })
}

fn server_id() -> String {
    format!("{:03}", rand::rng().random_range(0..1000))
}

fn session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

// ── Read loop ────────────────────────────────────────────────────────────────

struct ReadState {
    transport: TransportKind,
    outbound: mpsc::UnboundedSender<Outgoing>,
    pending_connect: Option<String>,
    connected: Arc<AtomicBool>,
    routes: Routes,
    ready: Option<oneshot::Sender<Result<Frame, ChatError>>>,
}

impl ReadState {
    fn dispatch(&mut self, frame: Frame) {
        match frame.command {
            Command::Connected => {
                self.connected.store(true, Ordering::SeqCst);
                if let Some(ready) = self.ready.take() {
                    let _ = ready.send(Ok(frame));
                }
            },
            Command::Error => {
                let message = frame
                    .get("message")
                    .map(str::to_string)
                    .unwrap_or_else(|| frame.body.clone());
                match self.ready.take() {
                    Some(ready) => {
                        let _ = ready.send(Err(ChatError::Rejected(message)));
                    },
                    None => warn!(message, "broker error"),
                }
            },
            Command::Message => {
                let Some(id) = frame.get("subscription").map(str::to_string) else {
                    debug!("MESSAGE without subscription header");
                    return;
                };
                let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
                let dropped = match routes.get(&id) {
                    Some(tx) => tx.send(frame).is_err(),
                    None => {
                        debug!(id, "MESSAGE for unknown subscription");
                        false
                    },
                };
                if dropped {
                    routes.remove(&id);
                }
            },
            Command::Receipt => debug!(receipt = frame.get("receipt-id"), "receipt"),
            other => debug!(command = %other, "ignoring frame"),
        }
    }

    fn finish(mut self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Err(ChatError::Closed));
        }
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

async fn read_loop<S>(mut stream: S, mut state: ReadState)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let mut decoder = FrameDecoder::new();
    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "realtime read failed");
                break;
            },
        };

        let payloads = match state.transport {
            TransportKind::Websocket => vec![text.as_str().to_string()],
            TransportKind::Sockjs => match SockJsFrame::decode(text.as_str()) {
                Ok(SockJsFrame::Open) => {
                    if let Some(connect) = state.pending_connect.take() {
                        let _ = state.outbound.send(Outgoing::Text(connect));
                    }
                    continue;
                },
                Ok(SockJsFrame::Heartbeat) => continue,
                Ok(SockJsFrame::Messages(messages)) => messages,
                Ok(SockJsFrame::Close { code, reason }) => {
                    info!(code, reason, "sockjs session closed");
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "dropping sockjs frame");
                    continue;
                },
            },
        };

        for payload in payloads {
            match decoder.push(&payload) {
                Ok(items) => {
                    for item in items {
                        if let Inbound::Frame(frame) = item {
                            state.dispatch(frame);
                        }
                    }
                },
                Err(e) => warn!(error = %e, "dropping malformed STOMP data"),
            }
        }
    }
    state.finish();
}
