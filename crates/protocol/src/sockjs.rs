//! SockJS websocket transport framing.
//!
//! Server frames are a one-letter type followed by an optional JSON payload:
//! `o` (open), `h` (heartbeat), `a["…",…]` (messages), `c[code,"reason"]`
//! (close). Client messages are sent as a JSON array of strings.

use url::Url;

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SockJsFrame {
    Open,
    Heartbeat,
    Messages(Vec<String>),
    Close { code: u16, reason: String },
}

impl SockJsFrame {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let Some(kind) = text.chars().next() else {
            return Err(ProtocolError::SockJs("empty frame".into()));
        };
        let payload = &text[kind.len_utf8()..];
        match kind {
            'o' => Ok(Self::Open),
            'h' => Ok(Self::Heartbeat),
            'a' => Ok(Self::Messages(serde_json::from_str(payload)?)),
            'c' => {
                let (code, reason): (u16, String) = serde_json::from_str(payload)?;
                Ok(Self::Close { code, reason })
            },
            other => Err(ProtocolError::SockJs(format!("unknown frame type {other:?}"))),
        }
    }
}

/// Encode outgoing messages for the SockJS websocket transport.
pub fn encode(messages: &[&str]) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(messages)?)
}

/// `http(s)://host/…` → `ws(s)://host/…` with `endpoint` appended.
pub fn websocket_url(base: &str, endpoint: &str) -> Result<Url, ProtocolError> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|()| ProtocolError::SockJs(format!("cannot use {scheme} for {base}")))?;
    let path = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    url.set_path(&path);
    Ok(url)
}

/// `{ws-base}{endpoint}/<server-id>/<session-id>/websocket`.
pub fn sockjs_websocket_url(
    base: &str,
    endpoint: &str,
    server_id: &str,
    session_id: &str,
) -> Result<Url, ProtocolError> {
    let mut url = websocket_url(base, endpoint)?;
    let path = format!(
        "{}/{server_id}/{session_id}/websocket",
        url.path().trim_end_matches('/')
    );
    url.set_path(&path);
    Ok(url)
}
