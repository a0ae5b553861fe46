use reqwest::StatusCode;

use parlor_auth::AuthError;

/// Failure of a request sent through the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 401/403 on a redirect-eligible URL. The navigation layer sends the user
    /// to the login view.
    #[error("not authorized ({status}) for {url}")]
    Unauthorized { status: StatusCode, url: String },

    /// Any other non-success response, including auth failures on exempt URLs.
    #[error("request to {url} failed with {status}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// The stored token could not be decoded.
    #[error("session token: {0}")]
    Token(#[from] AuthError),

    /// No response (connect, TLS, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl GatewayError {
    /// Response status, when a response arrived.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            Self::Token(_) | Self::Storage(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
