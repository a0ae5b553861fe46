//! Auth check run before every navigation.

use std::sync::Arc;

use {
    async_trait::async_trait,
    reqwest::StatusCode,
    tracing::{debug, info},
};

use {
    parlor_gateway::{GatewayError, HttpGateway},
    parlor_sessions::{SessionStorage, SessionStorageExt},
};

use crate::{location::Location, routes::RouteRecord};

/// Asks the backend whether the current session is still valid.
#[async_trait]
pub trait SessionCheck: Send + Sync {
    async fn who_am_i(&self) -> Result<StatusCode, GatewayError>;
}

#[async_trait]
impl SessionCheck for HttpGateway {
    async fn who_am_i(&self) -> Result<StatusCode, GatewayError> {
        HttpGateway::who_am_i(self).await
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Location),
}

/// Lets navigation through only with a live session when the route asks for
/// one. Results are never cached: each guarded navigation checks again.
pub struct RouteGuard<P> {
    storage: Arc<dyn SessionStorage>,
    checker: P,
    login_path: String,
}

impl<P: SessionCheck> RouteGuard<P> {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        checker: P,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            checker,
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn checker(&self) -> &P {
        &self.checker
    }

    /// Decide whether navigation to `to`, matching `matched`, may proceed.
    pub async fn check(&self, to: &Location, matched: &[&RouteRecord]) -> GuardDecision {
        if self.storage.bypass_auth() {
            debug!(to = %to, "auth bypass enabled");
            return GuardDecision::Allow;
        }
        if !matched.iter().any(|r| r.requires_auth) {
            return GuardDecision::Allow;
        }

        match self.checker.who_am_i().await {
            Ok(status) if status == StatusCode::OK => GuardDecision::Allow,
            outcome => {
                match outcome {
                    Ok(status) => info!(to = %to, status = status.as_u16(), "session check not OK"),
                    Err(e) => info!(to = %to, error = %e, "session check failed"),
                }
                GuardDecision::Redirect(Location::login_redirect(&self.login_path, to))
            },
        }
    }
}
