mod app;
mod chat_commands;
mod session_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::{
    app::App,
    session_commands::{BypassAction, TokenAction},
};

#[derive(Parser)]
#[command(name = "parlor", about = "Parlor: terminal chat client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of the discovered one.
    #[arg(long, global = true, env = "PARLOR_CONFIG")]
    config: Option<PathBuf>,

    /// Keep session storage in memory for this run only.
    #[arg(long, global = true, default_value_t = false)]
    ephemeral: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the stored session is still valid.
    Whoami,
    /// Navigate to a view, running the same auth checks as the web client.
    Navigate {
        path: String,
        /// Location to navigate from.
        #[arg(long)]
        from: Option<String>,
    },
    /// Manage the stored session token.
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Toggle the auth bypass flag (testing only).
    Bypass {
        #[command(subcommand)]
        action: BypassAction,
    },
    /// End the session.
    Logout,
    /// Join a chat room.
    Chat {
        #[arg(long)]
        room: String,
        #[arg(long)]
        username: Option<String>,
    },
    /// List online users.
    Online,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "parlor starting");

    let config = App::load_config(cli.config.as_deref())?;
    let mut app = App::new(config, cli.ephemeral);

    match cli.command {
        Commands::Whoami => session_commands::whoami(&mut app).await,
        Commands::Navigate { path, from } => {
            session_commands::navigate(&mut app, &path, from.as_deref()).await
        },
        Commands::Token { action } => session_commands::handle_token(&app, action),
        Commands::Bypass { action } => session_commands::handle_bypass(&app, action),
        Commands::Logout => session_commands::logout(&app).await,
        Commands::Chat { room, username } => chat_commands::chat(&mut app, &room, username).await,
        Commands::Online => chat_commands::online(&app).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_with_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "parlor", "chat", "--room", "12", "--username", "alice", "--ephemeral",
        ])
        .unwrap();
        assert!(cli.ephemeral);
        assert!(matches!(
            cli.command,
            Commands::Chat { ref room, ref username }
                if room == "12" && username.as_deref() == Some("alice")
        ));
    }

    #[test]
    fn parses_navigate_and_token() {
        let cli = Cli::try_parse_from(["parlor", "navigate", "/security", "--from", "/index"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Navigate { ref path, ref from }
                if path == "/security" && from.as_deref() == Some("/index")
        ));

        let cli = Cli::try_parse_from(["parlor", "token", "set", "a.b.c"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Token { action: TokenAction::Set { ref token } } if token == "a.b.c"
        ));

        assert!(Cli::try_parse_from(["parlor", "chat"]).is_err());
    }
}
