use std::time::Duration;

use {
    anyhow::{Context, Result, bail},
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::{debug, warn},
};

use {
    parlor_auth::decode_claims,
    parlor_chat::{ChatMessage, ChatType, RealtimeSession},
    parlor_routing::NavigationOutcome,
    parlor_sessions::SessionStorageExt,
};

use crate::app::{App, report};

const ONLINE_USERS_TIMEOUT: Duration = Duration::from_secs(10);

/// Join `room`, print its traffic and send each stdin line until EOF or Ctrl-C.
pub async fn chat(app: &mut App, room: &str, username: Option<String>) -> Result<()> {
    let mut navigator = app.navigator();
    let outcome = navigator.navigate("/index").await;
    app.settle(&mut navigator).await;
    if let NavigationOutcome::Redirected { .. } = outcome {
        report(&outcome);
        bail!("login required before joining a room");
    }
    let username = resolve_username(app, username)?;

    let session = RealtimeSession::new(&app.config);
    session
        .connect(&[("roomId".to_string(), room.to_string())])
        .await
        .context("failed to connect to chat server")?;
    session.enter_room();

    let mut incoming = session.subscribe_room(room).await?;
    let printer = tokio::spawn(async move {
        while let Some(message) = incoming.next_json::<ChatMessage>().await {
            match message {
                Ok(m) => println!("{}", render(&m)),
                Err(e) => warn!(error = %e, "unreadable chat message"),
            }
        }
    });

    session.send_chat(&ChatMessage::join(room, &username)).await?;
    println!("Joined room {room} as {username}. Ctrl-D to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => session.send_chat(&ChatMessage::text(room, &username, line)).await?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Err(e) = session.send_chat(&ChatMessage::leave(room, &username)).await {
        debug!(error = %e, "could not announce leaving");
    }
    session.leave_room();
    session.disconnect().await;
    printer.abort();
    Ok(())
}

/// Print the users the server reports as online.
pub async fn online(app: &App) -> Result<()> {
    let session = RealtimeSession::new(&app.config);
    session
        .connect(&[])
        .await
        .context("failed to connect to chat server")?;
    let result = tokio::time::timeout(ONLINE_USERS_TIMEOUT, session.request_online_users()).await;
    session.disconnect().await;

    let users = result.context("server did not answer")??;
    if users.is_empty() {
        println!("Nobody is online.");
    }
    for user in users {
        println!("{user}");
    }
    Ok(())
}

fn resolve_username(app: &App, explicit: Option<String>) -> Result<String> {
    if let Some(name) = explicit {
        return Ok(name);
    }
    app.storage
        .auth_token()
        .and_then(|t| decode_claims(&t).ok())
        .and_then(|c| c.sub)
        .context("no username: pass --username or store a session token")
}

fn render(message: &ChatMessage) -> String {
    match message.kind {
        ChatType::Join => format!("* {} joined", message.username),
        ChatType::Leave => format!("* {} left", message.username),
        ChatType::UserList => format!("* online: {}", message.message),
        ChatType::Text => format!("<{}> {}", message.username, message.message),
    }
}
