//! Application root: builds the long-lived objects every command shares.

use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::{debug, info},
};

use {
    parlor_config::ParlorConfig,
    parlor_gateway::{GatewayError, HttpGateway, SessionEvents},
    parlor_routing::{Dialog, Location, NavigationOutcome, Navigator, RouteGuard, RouteTable},
    parlor_sessions::{FileStorage, MemoryStorage, SessionStorage},
};

/// Prints to stderr and, on a terminal, waits for Enter.
pub struct TerminalDialog;

#[async_trait]
impl Dialog for TerminalDialog {
    async fn alert(&self, title: &str, message: &str) {
        eprintln!("[{title}] {message}");
        if !std::io::stdin().is_terminal() {
            return;
        }
        eprint!("Press Enter to continue...");
        let mut line = String::new();
        let _ = BufReader::new(tokio::io::stdin()).read_line(&mut line).await;
    }
}

pub struct App {
    pub config: ParlorConfig,
    pub storage: Arc<dyn SessionStorage>,
    pub gateway: HttpGateway,
    events: SessionEvents,
}

impl App {
    pub fn new(config: ParlorConfig, ephemeral: bool) -> Self {
        let storage: Arc<dyn SessionStorage> = if ephemeral {
            debug!("using in-memory session storage");
            Arc::new(MemoryStorage::new())
        } else {
            let path = storage_path(&config, &parlor_config::data_dir());
            debug!(path = %path.display(), "using file session storage");
            Arc::new(FileStorage::new(path))
        };
        let (gateway, events) = HttpGateway::new(&config, Arc::clone(&storage));
        Self {
            config,
            storage,
            gateway,
            events,
        }
    }

    /// Load config from `path`, or discover it in the usual places.
    pub fn load_config(path: Option<&Path>) -> Result<ParlorConfig> {
        match path {
            Some(path) => parlor_config::load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display())),
            None => Ok(parlor_config::discover_and_load()),
        }
    }

    pub fn navigator(&self) -> Navigator<HttpGateway> {
        let guard = RouteGuard::new(
            Arc::clone(&self.storage),
            self.gateway.clone(),
            self.config.auth.login_path.clone(),
        );
        Navigator::new(RouteTable::chat_routes(), guard, Arc::new(TerminalDialog))
    }

    /// Let background renewals finish and hand their outcome to `navigator`.
    pub async fn settle(&mut self, navigator: &mut Navigator<HttpGateway>) {
        self.gateway.wait_for_renewals().await;
        for outcome in navigator.drain_events(&mut self.events).await {
            report(&outcome);
        }
    }
}

/// Hand a failed request to `navigator`. Auth failures move it to the login
/// view (unless already there) and are reported; other errors are returned.
pub fn redirect_on_auth_failure(
    navigator: &mut Navigator<HttpGateway>,
    error: GatewayError,
) -> Result<Option<Location>> {
    if !error.is_unauthorized() {
        return Err(error.into());
    }
    let requested = navigator.current().clone();
    let to = navigator.handle_gateway_error(&error);
    if let Some(to) = &to {
        report(&NavigationOutcome::Redirected {
            requested,
            to: to.clone(),
        });
    }
    Ok(to)
}

/// Print where a navigation ended up.
pub fn report(outcome: &NavigationOutcome) {
    match outcome {
        NavigationOutcome::Arrived(at) => println!("{at}"),
        NavigationOutcome::Redirected { requested, to } => {
            info!(from = %requested, to = %to, "redirected");
            println!("{requested} -> {to}");
        },
    }
}

fn storage_path(config: &ParlorConfig, data_dir: &Path) -> PathBuf {
    config
        .storage
        .path
        .clone()
        .unwrap_or_else(|| data_dir.join("session.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_defaults_to_data_dir() {
        let config = ParlorConfig::default();
        assert_eq!(
            storage_path(&config, Path::new("/home/u/.parlor")),
            PathBuf::from("/home/u/.parlor/session.json")
        );
    }

    #[test]
    fn storage_path_from_config_wins() {
        let mut config = ParlorConfig::default();
        config.storage.path = Some(PathBuf::from("/tmp/s.json"));
        assert_eq!(
            storage_path(&config, Path::new("/ignored")),
            PathBuf::from("/tmp/s.json")
        );
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.toml");
        std::fs::write(&path, "[server]\nbase_url = \"http://chat.internal:9000\"\n").unwrap();
        let config = App::load_config(Some(&path)).unwrap();
        assert_eq!(config.server.base_url, "http://chat.internal:9000");

        assert!(App::load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
