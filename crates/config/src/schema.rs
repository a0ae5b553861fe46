/// Config schema types (server, auth, realtime, storage).
use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParlorConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub realtime: RealtimeConfig,
    pub storage: StorageConfig,
}

/// Backend location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL every endpoint path is appended to (no trailing slash needed).
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
        }
    }
}

impl ServerConfig {
    /// Join an absolute endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Session and token lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Renew the session token once fewer than this many seconds remain.
    pub renew_threshold_secs: u64,
    /// "Who am I" session check endpoint.
    pub me_path: String,
    /// Token renewal endpoint.
    pub renew_path: String,
    pub logout_path: String,
    /// Client-side login route that unauthenticated navigation lands on.
    pub login_path: String,
    /// URL substrings whose auth failures are left to the caller.
    pub redirect_exempt: Vec<String>,
    /// Message shown when the session could not be renewed.
    pub renewal_failed_message: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            renew_threshold_secs: 180,
            me_path: "/user/me".into(),
            renew_path: "/user/renew-token".into(),
            logout_path: "/user/logout".into(),
            login_path: "/login".into(),
            redirect_exempt: vec!["/export-chat-history".into()],
            renewal_failed_message: "登入已逾時，請重新登入".into(),
        }
    }
}

impl AuthConfig {
    pub fn renew_threshold(&self) -> Duration {
        Duration::from_secs(self.renew_threshold_secs)
    }
}

/// How the STOMP connection reaches the broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// SockJS websocket transport (`/<server>/<session>/websocket`).
    #[default]
    Sockjs,
    /// Plain websocket on the endpoint itself.
    Websocket,
}

/// Realtime messaging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub endpoint: String,
    pub transport: TransportKind,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "/ws-message".into(),
            transport: TransportKind::default(),
        }
    }
}

/// Where session storage (`authToken`, `bypassAuth`) lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Session file path. Defaults to `~/.parlor/session.json`.
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_server_contract() {
        let cfg = ParlorConfig::default();
        assert_eq!(cfg.auth.renew_threshold(), Duration::from_secs(180));
        assert_eq!(cfg.auth.redirect_exempt, vec!["/export-chat-history"]);
        assert_eq!(cfg.realtime.endpoint, "/ws-message");
        assert_eq!(cfg.realtime.transport, TransportKind::Sockjs);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let server = ServerConfig {
            base_url: "http://chat.local:9000/".into(),
        };
        assert_eq!(server.endpoint("/user/me"), "http://chat.local:9000/user/me");
        assert_eq!(server.endpoint("user/me"), "http://chat.local:9000/user/me");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: ParlorConfig = toml::from_str(
            r#"
            [auth]
            renew_threshold_secs = 60

            [realtime]
            transport = "websocket"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.auth.renew_threshold_secs, 60);
        assert_eq!(cfg.auth.me_path, "/user/me");
        assert_eq!(cfg.realtime.transport, TransportKind::Websocket);
        assert_eq!(cfg.server.base_url, "http://localhost:8080");
    }
}
