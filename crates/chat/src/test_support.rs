//! In-process STOMP broker speaking just enough of the chat server's contract.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    futures::{SinkExt, StreamExt},
    tokio::net::{TcpListener, TcpStream},
    tokio_tungstenite::{
        WebSocketStream, accept_hdr_async,
        tungstenite::{
            Message,
            handshake::server::{ErrorResponse, Request, Response},
        },
    },
};

use parlor_protocol::{Command, Frame, FrameDecoder, Inbound, SockJsFrame, sockjs};

#[derive(Debug, Clone, Copy)]
pub(crate) struct BrokerOptions {
    pub(crate) sockjs: bool,
    /// Answer `CONNECT` with `ERROR`.
    pub(crate) reject: bool,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            sockjs: true,
            reject: false,
        }
    }
}

pub(crate) struct Broker {
    pub(crate) base_url: String,
    frames: Arc<Mutex<Vec<Frame>>>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl Broker {
    pub(crate) async fn start(options: BrokerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let paths = Arc::new(Mutex::new(Vec::new()));

        let (frames_, paths_) = (Arc::clone(&frames), Arc::clone(&paths));
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let (frames, paths) = (Arc::clone(&frames_), Arc::clone(&paths_));
                tokio::spawn(async move {
                    let record = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        paths.lock().unwrap().push(req.uri().path().to_string());
                        Ok(resp)
                    };
                    if let Ok(ws) = accept_hdr_async(stream, record).await {
                        serve(ws, options, frames).await;
                    }
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            frames,
            paths,
        }
    }

    /// Every client frame received, in order, across connections.
    pub(crate) fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    /// Request paths of accepted websocket handshakes.
    pub(crate) fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, command: Command) -> usize {
        self.frames()
            .iter()
            .filter(|f| f.command == command)
            .count()
    }

    /// Poll until a frame with `command` has arrived.
    pub(crate) async fn wait_for(&self, command: Command) {
        for _ in 0..200 {
            if self.count(command) > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("broker never received {command}");
    }
}

async fn serve(ws: WebSocketStream<TcpStream>, options: BrokerOptions, frames: Arc<Mutex<Vec<Frame>>>) {
    let (mut sink, mut stream) = ws.split();
    let wrap = |frame: &Frame| {
        let wire = frame.encode();
        if options.sockjs {
            Message::text(format!("a{}", sockjs::encode(&[wire.as_str()]).unwrap()))
        } else {
            Message::text(wire)
        }
    };

    if options.sockjs && sink.send(Message::text("o")).await.is_err() {
        return;
    }

    let mut decoder = FrameDecoder::new();
    // destination → subscription id
    let mut subscriptions: HashMap<String, String> = HashMap::new();

    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let payloads = if options.sockjs {
            match SockJsFrame::decode(text.as_str()).unwrap() {
                SockJsFrame::Messages(messages) => messages,
                _ => continue,
            }
        } else {
            vec![text.as_str().to_string()]
        };

        for payload in payloads {
            for item in decoder.push(&payload).unwrap() {
                let Inbound::Frame(frame) = item else {
                    continue;
                };
                frames.lock().unwrap().push(frame.clone());
                for reply in respond(&frame, options, &mut subscriptions) {
                    let _ = sink.send(wrap(&reply)).await;
                }
                let closing = match frame.command {
                    Command::Disconnect => true,
                    Command::Connect => options.reject,
                    _ => false,
                };
                if closing {
                    let _ = sink.close().await;
                    return;
                }
            }
        }
    }
}

fn respond(
    frame: &Frame,
    options: BrokerOptions,
    subscriptions: &mut HashMap<String, String>,
) -> Vec<Frame> {
    match frame.command {
        Command::Connect if options.reject => {
            vec![Frame::new(Command::Error).header("message", "Invalid credentials")]
        },
        Command::Connect => vec![Frame::new(Command::Connected).header("version", "1.2")],
        Command::Subscribe => {
            if let (Some(id), Some(dest)) = (frame.get("id"), frame.get("destination")) {
                subscriptions.insert(dest.to_string(), id.to_string());
            }
            Vec::new()
        },
        Command::Unsubscribe => {
            subscriptions.retain(|_, id| Some(id.as_str()) != frame.get("id"));
            Vec::new()
        },
        Command::Send => {
            let (topic, body) = match frame.get("destination") {
                Some("/app/sendMessage") => {
                    let value: serde_json::Value = serde_json::from_str(&frame.body).unwrap();
                    let room = value["roomId"].as_str().unwrap_or_default();
                    (format!("/topic/message/{room}"), frame.body.clone())
                },
                Some("/app/get-online-users") => {
                    ("/topic/online-users".to_string(), r#"["alice","bob"]"#.to_string())
                },
                _ => return Vec::new(),
            };
            match subscriptions.get(&topic) {
                Some(id) => vec![
                    Frame::new(Command::Message)
                        .header("destination", topic.as_str())
                        .header("subscription", id.as_str())
                        .header("message-id", "m-1")
                        .with_body(body),
                ],
                None => Vec::new(),
            }
        },
        Command::Disconnect => match frame.get("receipt") {
            Some(receipt) => vec![Frame::new(Command::Receipt).header("receipt-id", receipt)],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}
