//! Wire formats for the realtime channel: STOMP 1.2 frames, carried either
//! directly in websocket text messages or inside SockJS framing.

pub mod error;
pub mod frame;
pub mod sockjs;

pub use {
    error::ProtocolError,
    frame::{Command, Frame, FrameDecoder, Inbound},
    sockjs::SockJsFrame,
};

/// STOMP versions offered in `CONNECT`.
pub const ACCEPT_VERSION: &str = "1.2,1.1,1.0";

/// Heart-beating is not negotiated.
pub const HEART_BEAT: &str = "0,0";
