// Console layer - a line-oriented front end over the moderation service.
//
// Stands in for a web front end: it owns the "current session" the way a
// cookie would, turns typed commands into service calls, and prints the
// results. No business logic lives here.

pub mod commands;
pub mod formatter;

use crate::core::moderation::{ModerationProvider, ModerationService, ModerationStore, SessionId};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Service wired with runtime-selected store and provider.
pub type AppModerationService =
    ModerationService<Box<dyn ModerationStore>, Box<dyn ModerationProvider>>;

/// Shared state handed to every command.
#[derive(Clone)]
pub struct Data {
    pub moderation: Arc<AppModerationService>,
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(data: Data) -> Result<(), Error> {
    let mut session = SessionId::generate();
    data.moderation.touch_user(&session).await?;
    println!("Session {} started. Type `help` for commands.", session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match commands::parse(line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match commands::execute(&data, &mut session, command).await {
            Ok(commands::Reply::Say(text)) => println!("{}", text),
            Ok(commands::Reply::Quit) => break,
            Err(e) => tracing::error!("Command failed: {}", e),
        }
    }

    Ok(())
}
