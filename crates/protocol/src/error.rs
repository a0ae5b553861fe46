/// Errors decoding or encoding realtime wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown STOMP command: {0:?}")]
    UnknownCommand(String),

    #[error("malformed STOMP header line: {0:?}")]
    MalformedHeader(String),

    #[error("invalid escape sequence in header: {0:?}")]
    InvalidEscape(String),

    #[error("frame body is not terminated by NULL")]
    UnterminatedBody,

    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    #[error("frame of {0} bytes exceeds the size limit")]
    FrameTooLarge(usize),

    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed SockJS frame: {0}")]
    SockJs(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
