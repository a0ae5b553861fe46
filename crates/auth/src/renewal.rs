//! Client for the token renewal endpoint.

use {
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::errors::AuthError;

#[derive(Deserialize)]
struct RenewResponse {
    token: Option<String>,
}

/// Exchanges a still-valid token for a fresh one.
///
/// One request per call: no retry, no backoff.
#[derive(Debug, Clone)]
pub struct TokenRenewer {
    client: reqwest::Client,
    url: String,
}

impl TokenRenewer {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `POST` the renewal endpoint authenticated with `current` and return the
    /// replacement token from `{ "token": "…" }`.
    #[tracing::instrument(skip_all, fields(url = %self.url))]
    pub async fn renew(&self, current: &str) -> Result<String, AuthError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(current)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.text().await {
                Ok(message) => message,
                Err(e) => {
                    debug!(error = %e, "failed to read renewal refusal body");
                    String::new()
                },
            };
            warn!(status = status.as_u16(), "renewal endpoint refused");
            return Err(AuthError::Renewal {
                status: status.as_u16(),
                message,
            });
        }

        let body: RenewResponse = resp.json().await.map_err(|e| AuthError::Renewal {
            status: status.as_u16(),
            message: format!("unreadable renewal response: {e}"),
        })?;

        match body.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                debug!("session token renewed");
                Ok(token)
            },
            None => Err(AuthError::Renewal {
                status: status.as_u16(),
                message: "renewal response carried no token".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_new_token_and_sends_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/user/renew-token")
            .match_header("authorization", "Bearer old-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token":"new-token"}"#)
            .create_async()
            .await;

        let renewer = TokenRenewer::new(
            reqwest::Client::new(),
            format!("{}/user/renew-token", server.url()),
        );
        assert_eq!(renewer.renew("old-token").await.unwrap(), "new-token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_is_renewal_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/user/renew-token")
            .with_status(403)
            .with_body("expired")
            .create_async()
            .await;

        let renewer = TokenRenewer::new(
            reqwest::Client::new(),
            format!("{}/user/renew-token", server.url()),
        );
        match renewer.renew("old").await {
            Err(AuthError::Renewal { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "expired");
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn truncated_refusal_is_still_a_renewal_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            sock.write_all(b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 64\r\n\r\nexp")
                .await
                .unwrap();
        });

        let renewer = TokenRenewer::new(
            reqwest::Client::new(),
            format!("http://{addr}/user/renew-token"),
        );
        match renewer.renew("old").await {
            Err(AuthError::Renewal { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "");
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_token_field_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/user/renew-token")
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let renewer = TokenRenewer::new(
            reqwest::Client::new(),
            format!("{}/user/renew-token", server.url()),
        );
        assert!(matches!(
            renewer.renew("old").await,
            Err(AuthError::Renewal { status: 200, .. })
        ));
    }
}
