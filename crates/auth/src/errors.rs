/// Errors from token decoding and renewal.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token is not a decodable JWT.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Transport-level failure talking to the backend.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The renewal endpoint refused or returned an unusable body.
    #[error("token renewal failed ({status}): {message}")]
    Renewal {
        /// HTTP status code (0 if the response never arrived).
        status: u16,
        message: String,
    },
}
