//! STOMP 1.2 frames.
//!
//! ```text
//! COMMAND EOL
//! (header EOL)*
//! EOL
//! body NULL
//! ```
//!
//! EOL is `\n` or `\r\n`. A bare EOL between frames is a heart-beat.

use std::{fmt, str::FromStr};

use crate::error::ProtocolError;

/// Largest frame the decoder buffers before giving up on it.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Client
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    // Server
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Connected => "CONNECTED",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// `CONNECT`/`CONNECTED` headers are sent without escaping.
    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Stomp | Self::Connected)
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "BEGIN" => Self::Begin,
            "COMMIT" => Self::Commit,
            "ABORT" => Self::Abort,
            "DISCONNECT" => Self::Disconnect,
            "CONNECTED" => Self::Connected,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame with a text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    /// Headers in wire order. Lookups honor the first occurrence.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    // ── Client frames ────────────────────────────────────────────────────────

    pub fn connect(extra: &[(String, String)]) -> Self {
        let mut frame = Self::new(Command::Connect)
            .header("accept-version", crate::ACCEPT_VERSION)
            .header("heart-beat", crate::HEART_BEAT);
        frame.headers.extend(extra.iter().cloned());
        frame
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).header("id", id)
    }

    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .header("destination", destination)
            .with_body(body)
    }

    pub fn disconnect(receipt: &str) -> Self {
        Self::new(Command::Disconnect).header("receipt", receipt)
    }

    // ── Codec ────────────────────────────────────────────────────────────────

    /// Serialize to wire text, NULL-terminated. Adds `content-length` to
    /// frames with a body unless already present.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (k, v) in &self.headers {
            if escape {
                out.push_str(&escape_header(k));
                out.push(':');
                out.push_str(&escape_header(v));
            } else {
                out.push_str(k);
                out.push(':');
                out.push_str(v);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse exactly one frame from the start of `buf`.
    ///
    /// Returns the frame and the number of bytes consumed, or `None` when
    /// `buf` holds only part of a frame.
    fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, ProtocolError> {
        let mut pos = 0;
        let Some(command_line) = next_line(buf, &mut pos)? else {
            return Ok(None);
        };
        let command: Command = command_line.parse()?;

        let mut headers = Vec::new();
        loop {
            let Some(line) = next_line(buf, &mut pos)? else {
                return Ok(None);
            };
            if line.is_empty() {
                break;
            }
            let (k, v) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;
            let (k, v) = if command.escapes_headers() {
                (unescape_header(k)?, unescape_header(v)?)
            } else {
                (k.to_string(), v.to_string())
            };
            headers.push((k, v));
        }

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| ProtocolError::InvalidContentLength(v.clone()))
            })
            .transpose()?;

        let body_end = match content_length {
            Some(len) => {
                if len > MAX_FRAME_LEN {
                    return Err(ProtocolError::FrameTooLarge(len));
                }
                let end = pos
                    .checked_add(len)
                    .ok_or_else(|| ProtocolError::InvalidContentLength(len.to_string()))?;
                if buf.len() <= end {
                    return Ok(None);
                }
                if buf[end] != 0 {
                    return Err(ProtocolError::UnterminatedBody);
                }
                end
            },
            None => match buf[pos..].iter().position(|b| *b == 0) {
                Some(offset) => pos + offset,
                None => return Ok(None),
            },
        };

        let body = std::str::from_utf8(&buf[pos..body_end])
            .map_err(|_| ProtocolError::InvalidUtf8)?
            .to_string();

        Ok(Some((
            Self {
                command,
                headers,
                body,
            },
            body_end + 1,
        )))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        if let Some(dest) = self.get("destination") {
            write!(f, " {dest}")?;
        }
        Ok(())
    }
}

/// Read one EOL-terminated line starting at `pos`, advancing past the EOL.
fn next_line<'a>(buf: &'a [u8], pos: &mut usize) -> Result<Option<&'a str>, ProtocolError> {
    let Some(offset) = buf[*pos..].iter().position(|b| *b == b'\n') else {
        return Ok(None);
    };
    let mut line = &buf[*pos..*pos + offset];
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    *pos += offset + 1;
    std::str::from_utf8(line)
        .map(Some)
        .map_err(|_| ProtocolError::InvalidUtf8)
}

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_header(s: &str) -> Result<String, ProtocolError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some('\\') => out.push('\\'),
            _ => return Err(ProtocolError::InvalidEscape(s.to_string())),
        }
    }
    Ok(out)
}

/// Something read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Frame(Frame),
    Heartbeat,
}

/// Incremental decoder: frames may be split across or packed into messages.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received data; returns every complete frame and heart-beat.
    pub fn push(&mut self, data: &str) -> Result<Vec<Inbound>, ProtocolError> {
        self.buf.extend_from_slice(data.as_bytes());
        let mut out = Vec::new();
        loop {
            let eols = self.leading_eols();
            if eols > 0 {
                self.buf.drain(..eols);
                out.push(Inbound::Heartbeat);
            }
            if self.buf.is_empty() {
                break;
            }
            match Frame::parse(&self.buf) {
                Ok(Some((frame, used))) => {
                    self.buf.drain(..used);
                    out.push(Inbound::Frame(frame));
                },
                Ok(None) if self.buf.len() > MAX_FRAME_LEN => {
                    let buffered = self.buf.len();
                    self.buf.clear();
                    return Err(ProtocolError::FrameTooLarge(buffered));
                },
                Ok(None) => break,
                Err(e) => {
                    self.buf.clear();
                    return Err(e);
                },
            }
        }
        Ok(out)
    }

    fn leading_eols(&self) -> usize {
        let mut n = 0;
        loop {
            match &self.buf[n..] {
                [b'\n', ..] => n += 1,
                [b'\r', b'\n', ..] => n += 2,
                _ => return n,
            }
        }
    }
}
