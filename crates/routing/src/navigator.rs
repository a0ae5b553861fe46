//! Navigation controller: the one place that moves the user between views.

use std::sync::Arc;

use {
    async_trait::async_trait,
    tracing::{debug, info, warn},
};

use parlor_gateway::{GatewayError, SessionEvent, SessionEvents};

use crate::{
    guard::{GuardDecision, RouteGuard, SessionCheck},
    location::Location,
    routes::RouteTable,
};

/// Route-level redirects followed before giving up on a navigation.
const MAX_REDIRECTS: usize = 8;

/// Blocking, user-facing notification.
#[async_trait]
pub trait Dialog: Send + Sync {
    /// Show `message` and return once the user has acknowledged it.
    async fn alert(&self, title: &str, message: &str);
}

/// Dialog that only logs. For headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDialog;

#[async_trait]
impl Dialog for LogDialog {
    async fn alert(&self, title: &str, message: &str) {
        warn!(title, message, "dialog");
    }
}

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Reached the requested location (after any route redirects).
    Arrived(Location),
    /// The guard sent the user elsewhere.
    Redirected { requested: Location, to: Location },
}

impl NavigationOutcome {
    pub fn location(&self) -> &Location {
        match self {
            Self::Arrived(loc) | Self::Redirected { to: loc, .. } => loc,
        }
    }
}

/// Owns the current location and executes every redirect the gateway and the
/// guard ask for.
pub struct Navigator<P> {
    routes: RouteTable,
    guard: RouteGuard<P>,
    dialog: Arc<dyn Dialog>,
    current: Location,
}

impl<P: SessionCheck> Navigator<P> {
    pub fn new(routes: RouteTable, guard: RouteGuard<P>, dialog: Arc<dyn Dialog>) -> Self {
        Self {
            routes,
            guard,
            dialog,
            current: Location::new("/"),
        }
    }

    /// Start from `location` without running the guard (e.g. restoring state).
    pub fn starting_at(mut self, location: Location) -> Self {
        self.current = location;
        self
    }

    pub fn current(&self) -> &Location {
        &self.current
    }

    pub fn guard(&self) -> &RouteGuard<P> {
        &self.guard
    }

    /// Navigate to `target`, following route redirects and the auth guard.
    pub async fn navigate(&mut self, target: &str) -> NavigationOutcome {
        let requested = self.follow_route_redirects(Location::parse(target));
        let matched = self.routes.resolve(requested.path());

        match self.guard.check(&requested, &matched).await {
            GuardDecision::Allow => {
                self.move_to(requested.clone());
                NavigationOutcome::Arrived(requested)
            },
            GuardDecision::Redirect(to) => {
                info!(from = %requested, to = %to, "navigation redirected");
                let to = self.follow_route_redirects(to);
                self.move_to(to.clone());
                NavigationOutcome::Redirected { requested, to }
            },
        }
    }

    /// React to a failed request. A redirect-eligible auth failure sends the
    /// user to the login view, remembering where they were, unless they are
    /// already there. Returns the new location when navigation happened.
    pub fn handle_gateway_error(&mut self, error: &GatewayError) -> Option<Location> {
        if !error.is_unauthorized() {
            return None;
        }
        let login_path = self.guard.login_path();
        if self.current.path() == login_path {
            debug!("auth failure while on login view, staying");
            return None;
        }
        let to = Location::login_redirect(login_path, &self.current);
        info!(to = %to, error = %error, "auth failure, redirecting to login");
        self.move_to(to.clone());
        Some(to)
    }

    /// React to a session lifecycle event from the gateway.
    pub async fn handle_session_event(&mut self, event: &SessionEvent) -> Option<NavigationOutcome> {
        match event {
            SessionEvent::Renewed => None,
            SessionEvent::RenewalFailed { message, reason } => {
                warn!(reason, "session could not be renewed");
                self.dialog.alert("Error", message).await;
                let login_path = self.guard.login_path().to_string();
                Some(self.navigate(&login_path).await)
            },
        }
    }

    /// Handle every session event already queued, without waiting for more.
    pub async fn drain_events(&mut self, events: &mut SessionEvents) -> Vec<NavigationOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let Some(outcome) = self.handle_session_event(&event).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    fn follow_route_redirects(&self, mut location: Location) -> Location {
        for _ in 0..MAX_REDIRECTS {
            let matched = self.routes.resolve(location.path());
            let Some(redirect) = matched.last().and_then(|r| r.redirect.as_deref()) else {
                return location;
            };
            debug!(from = %location, to = redirect, "route redirect");
            location = Location::parse(redirect);
        }
        warn!(at = %location, "too many route redirects");
        location
    }

    fn move_to(&mut self, location: Location) {
        debug!(from = %self.current, to = %location, "moving");
        self.current = location;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use {
        parlor_sessions::{MemoryStorage, SessionStorageExt},
        reqwest::StatusCode,
    };

    use {super::*, crate::guard::tests::FakeCheck};

    #[derive(Default)]
    struct RecordingDialog {
        shown: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Dialog for RecordingDialog {
        async fn alert(&self, _title: &str, message: &str) {
            self.shown.lock().unwrap().push(message.to_string());
        }
    }

    fn navigator(status: Option<StatusCode>) -> (Navigator<FakeCheck>, Arc<RecordingDialog>) {
        let dialog = Arc::new(RecordingDialog::default());
        let guard = RouteGuard::new(
            Arc::new(MemoryStorage::new()),
            FakeCheck::answering(status),
            "/login",
        );
        let nav = Navigator::new(RouteTable::chat_routes(), guard, dialog.clone());
        (nav, dialog)
    }

    fn unauthorized() -> GatewayError {
        GatewayError::Unauthorized {
            status: StatusCode::FORBIDDEN,
            url: "http://backend/room/list".into(),
        }
    }

    #[tokio::test]
    async fn root_redirects_to_index() {
        let (mut nav, _) = navigator(Some(StatusCode::OK));
        let outcome = nav.navigate("/").await;
        assert_eq!(outcome, NavigationOutcome::Arrived(Location::parse("/index")));
        assert_eq!(nav.current().path(), "/index");
    }

    #[tokio::test]
    async fn guarded_route_without_session_lands_on_login() {
        let (mut nav, _) = navigator(None);
        let outcome = nav.navigate("/security?tab=keys").await;
        assert_eq!(outcome, NavigationOutcome::Redirected {
            requested: Location::parse("/security?tab=keys"),
            to: Location::parse("/login?redirect=%2Fsecurity%3Ftab%3Dkeys"),
        });
        assert_eq!(nav.current().path(), "/login");
        assert_eq!(nav.current().query("redirect"), Some("/security?tab=keys"));
    }

    #[tokio::test]
    async fn bypass_flag_skips_session_check() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_bypass_auth(true).unwrap();
        let guard = RouteGuard::new(storage, FakeCheck::answering(None), "/login");
        let mut nav = Navigator::new(RouteTable::chat_routes(), guard, Arc::new(LogDialog));

        assert!(matches!(
            nav.navigate("/security").await,
            NavigationOutcome::Arrived(_)
        ));
        assert_eq!(nav.guard().checker().calls(), 0);
    }

    #[tokio::test]
    async fn unauthorized_response_redirects_exactly_once() {
        let (nav, _) = navigator(Some(StatusCode::OK));
        let mut nav = nav.starting_at(Location::parse("/history?room=7"));

        let to = nav.handle_gateway_error(&unauthorized()).unwrap();
        assert_eq!(to.full_path(), "/login?redirect=%2Fhistory%3Froom%3D7");

        // Already on the login view: further failures do not navigate again.
        assert_eq!(nav.handle_gateway_error(&unauthorized()), None);
        assert_eq!(nav.current(), &to);
    }

    #[tokio::test]
    async fn other_errors_do_not_navigate() {
        let (mut nav, _) = navigator(Some(StatusCode::OK));
        let err = GatewayError::Status {
            status: StatusCode::UNAUTHORIZED,
            url: "http://backend/export-chat-history".into(),
            body: String::new(),
        };
        assert_eq!(nav.handle_gateway_error(&err), None);
        assert_eq!(nav.current().path(), "/");
    }

    #[tokio::test]
    async fn renewal_failure_shows_dialog_then_login() {
        let (nav, dialog) = navigator(Some(StatusCode::OK));
        let mut nav = nav.starting_at(Location::parse("/index"));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(SessionEvent::Renewed).unwrap();
        tx.send(SessionEvent::RenewalFailed {
            message: "請重新登入".into(),
            reason: "401".into(),
        })
        .unwrap();

        let outcomes = nav.drain_events(&mut rx).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(nav.current().path(), "/login");
        assert_eq!(*dialog.shown.lock().unwrap(), vec!["請重新登入".to_string()]);
    }
}
