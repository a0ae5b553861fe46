use {anyhow::Result, clap::Subcommand, reqwest::StatusCode};

use {
    parlor_auth::{Claims, decode_claims, now_secs},
    parlor_gateway::HttpGateway,
    parlor_routing::{Location, Navigator},
    parlor_sessions::SessionStorageExt,
};

use crate::app::{App, redirect_on_auth_failure, report};

#[derive(Subcommand)]
pub enum TokenAction {
    /// Show who the stored token belongs to and when it expires.
    Show,
    /// Store a token obtained elsewhere (e.g. from the login page).
    Set { token: String },
    /// Forget the stored token.
    Clear,
}

#[derive(Subcommand)]
pub enum BypassAction {
    /// Skip session checks on navigation.
    On,
    Off,
}

pub fn handle_token(app: &App, action: TokenAction) -> Result<()> {
    match action {
        TokenAction::Show => {
            let Some(token) = app.storage.auth_token() else {
                println!("No session token.");
                return Ok(());
            };
            match decode_claims(&token) {
                Ok(claims) => println!("{}", describe(&claims, now_secs())),
                Err(e) => println!("Stored token is unreadable: {e}"),
            }
        },
        TokenAction::Set { token } => {
            let claims = decode_claims(&token)?;
            app.storage.set_auth_token(&token)?;
            println!("Token stored. {}", describe(&claims, now_secs()));
        },
        TokenAction::Clear => {
            app.storage.clear_auth_token()?;
            println!("Token cleared.");
        },
    }
    Ok(())
}

pub fn handle_bypass(app: &App, action: BypassAction) -> Result<()> {
    let enabled = matches!(action, BypassAction::On);
    app.storage.set_bypass_auth(enabled)?;
    println!("Auth bypass {}.", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub async fn whoami(app: &mut App) -> Result<()> {
    let mut navigator = app.navigator();
    match check_session(app, &mut navigator).await? {
        Some(status) => println!("Session valid ({status})."),
        None => println!("Not logged in."),
    }
    app.settle(&mut navigator).await;
    Ok(())
}

/// `Some(status)` when the backend accepted the session. `None` after an
/// auth failure, which also moves `navigator` to the login view.
async fn check_session(
    app: &App,
    navigator: &mut Navigator<HttpGateway>,
) -> Result<Option<StatusCode>> {
    match app.gateway.who_am_i().await {
        Ok(status) => Ok(Some(status)),
        Err(e) => {
            redirect_on_auth_failure(navigator, e)?;
            Ok(None)
        },
    }
}

pub async fn navigate(app: &mut App, target: &str, from: Option<&str>) -> Result<()> {
    let mut navigator = app.navigator();
    if let Some(from) = from {
        navigator = navigator.starting_at(Location::parse(from));
    }
    let outcome = navigator.navigate(target).await;
    report(&outcome);
    app.settle(&mut navigator).await;
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    match app.gateway.logout().await {
        Ok(()) => println!("Logged out."),
        Err(e) if e.is_unauthorized() => {
            println!("Logged out locally; session had already ended.");
            redirect_on_auth_failure(&mut app.navigator(), e)?;
        },
        Err(e) => println!("Logged out locally; server said: {e}"),
    }
    Ok(())
}

fn describe(claims: &Claims, now: i64) -> String {
    let who = claims.sub.as_deref().unwrap_or("unknown user");
    let expiry = match claims.expires_in(now) {
        None => "no expiry".to_string(),
        Some(left) if left > 0 => {
            let hours = left / 3600;
            let mins = (left % 3600) / 60;
            format!("valid ({hours}h {mins}m remaining)")
        },
        Some(_) => "expired".to_string(),
    };
    format!("{who} [{expiry}]")
}
