use std::sync::{Arc, Mutex, PoisonError, RwLock};

use {
    reqwest::{Method, RequestBuilder, Response, header::AUTHORIZATION},
    secrecy::{ExposeSecret, Secret},
    tokio::{sync::mpsc, task::JoinHandle},
    tracing::{debug, info, warn},
};

use {
    parlor_auth::{TokenRenewer, decode_claims, now_secs},
    parlor_config::{AuthConfig, ParlorConfig, ServerConfig},
    parlor_sessions::{SessionStorage, SessionStorageExt},
};

use crate::{
    error::GatewayError,
    events::{SessionEvent, SessionEvents},
    inbound::{InboundVerdict, classify},
};

struct Inner {
    client: reqwest::Client,
    server: ServerConfig,
    auth: AuthConfig,
    storage: Arc<dyn SessionStorage>,
    renewer: TokenRenewer,
    /// Authorization applied when storage holds no token; replaced on renewal.
    default_token: RwLock<Option<Secret<String>>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    renewals: Mutex<Vec<JoinHandle<()>>>,
}

/// Authenticated HTTP client for the chat backend. Cheap to clone.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<Inner>,
}

impl HttpGateway {
    /// Build a gateway over `storage`. The returned receiver yields
    /// [`SessionEvent`]s from background renewals.
    pub fn new(config: &ParlorConfig, storage: Arc<dyn SessionStorage>) -> (Self, SessionEvents) {
        Self::with_client(reqwest::Client::new(), config, storage)
    }

    pub fn with_client(
        client: reqwest::Client,
        config: &ParlorConfig,
        storage: Arc<dyn SessionStorage>,
    ) -> (Self, SessionEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let renewer = TokenRenewer::new(
            client.clone(),
            config.server.endpoint(&config.auth.renew_path),
        );
        let gateway = Self {
            inner: Arc::new(Inner {
                client,
                server: config.server.clone(),
                auth: config.auth.clone(),
                storage,
                renewer,
                default_token: RwLock::new(None),
                events: tx,
                renewals: Mutex::new(Vec::new()),
            }),
        };
        (gateway, rx)
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.inner.storage
    }

    pub fn auth_config(&self) -> &AuthConfig {
        &self.inner.auth
    }

    /// Absolute URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        self.inner.server.endpoint(path)
    }

    /// Start a request to `path` on the backend. Interception happens in
    /// [`send`](Self::send).
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner.client.request(method, self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    // ── Interception ────────────────────────────────────────────────────────

    /// Attach the bearer token and kick off a renewal when it is close to
    /// expiry. The renewal runs in the background; this never waits for it.
    pub fn intercept_outbound(&self, builder: RequestBuilder) -> Result<RequestBuilder, GatewayError> {
        let Some(token) = self.inner.storage.auth_token() else {
            let default = self
                .inner
                .default_token
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            return Ok(match default.as_ref() {
                Some(t) => builder.header(AUTHORIZATION, bearer(t.expose_secret())),
                None => builder,
            });
        };

        let claims = decode_claims(&token)?;
        if claims.needs_renewal(now_secs(), self.inner.auth.renew_threshold()) {
            debug!(
                expires_in = claims.expires_in(now_secs()),
                "session token near expiry, renewing"
            );
            self.spawn_renewal(token.clone());
        }

        Ok(builder.header(AUTHORIZATION, bearer(&token)))
    }

    /// Map a response to success or a [`GatewayError`].
    pub async fn intercept_inbound(&self, url: &str, resp: Response) -> Result<Response, GatewayError> {
        let status = resp.status();
        match classify(status, url, &self.inner.auth.redirect_exempt) {
            InboundVerdict::Pass => Ok(resp),
            InboundVerdict::Unauthorized => {
                debug!(status = status.as_u16(), url, "auth failure, login required");
                Err(GatewayError::Unauthorized {
                    status,
                    url: url.to_string(),
                })
            },
            InboundVerdict::Reject => {
                let body = match resp.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        debug!(error = %e, url, "failed to read rejected response body");
                        String::new()
                    },
                };
                Err(GatewayError::Status {
                    status,
                    url: url.to_string(),
                    body,
                })
            },
        }
    }

    /// Send a request through both interceptors.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, GatewayError> {
        let request = self.intercept_outbound(builder)?.build()?;
        let url = request.url().to_string();
        debug!(method = %request.method(), %url, "sending request");
        let resp = self.inner.client.execute(request).await?;
        self.intercept_inbound(&url, resp).await
    }

    // ── Session endpoints ────────────────────────────────────────────────────

    /// Ask the backend whether the current session is valid. Returns the
    /// success status; failures come back as errors.
    #[tracing::instrument(skip_all)]
    pub async fn who_am_i(&self) -> Result<reqwest::StatusCode, GatewayError> {
        let resp = self.send(self.post(&self.inner.auth.me_path)).await?;
        Ok(resp.status())
    }

    /// End the session server-side and forget the token locally, whatever the
    /// server said.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), GatewayError> {
        let result = self.send(self.post(&self.inner.auth.logout_path)).await;
        self.inner.forget_token();
        info!("logged out");
        result.map(|_| ())
    }

    // ── Renewal ─────────────────────────────────────────────────────────────

    fn spawn_renewal(&self, token: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, skipping token renewal");
            return;
        };
        let inner = Arc::clone(&self.inner);
        let handle = runtime.spawn(async move { inner.renew(&token).await });
        let mut renewals = self
            .inner
            .renewals
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        renewals.retain(|h| !h.is_finished());
        renewals.push(handle);
    }

    /// Wait for every renewal started so far to settle.
    pub async fn wait_for_renewals(&self) {
        let pending: Vec<_> = self
            .inner
            .renewals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "renewal task ended abnormally");
            }
        }
    }
}

impl Inner {
    async fn renew(&self, current: &str) {
        match self.renewer.renew(current).await {
            Ok(token) => {
                if let Err(e) = self.storage.set_auth_token(&token) {
                    warn!(error = %e, "failed to store renewed token");
                }
                *self
                    .default_token
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(Secret::new(token));
                info!("session token renewed");
                let _ = self.events.send(SessionEvent::Renewed);
            },
            Err(e) => {
                warn!(error = %e, "session token renewal failed, session ended");
                self.forget_token();
                let _ = self.events.send(SessionEvent::RenewalFailed {
                    message: self.auth.renewal_failed_message.clone(),
                    reason: e.to_string(),
                });
            },
        }
    }

    fn forget_token(&self) {
        if let Err(e) = self.storage.clear_auth_token() {
            warn!(error = %e, "failed to clear session token");
        }
        *self
            .default_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
