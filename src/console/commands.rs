// Console commands.
//
// **Notice the pattern:**
// 1. Parse the line into a command
// 2. Call the core service
// 3. Format the response based on the result
//
// Local errors (validation, unknown ids, invalid review transitions, bans)
// become messages. Only storage failures are returned as errors.

use super::formatter;
use super::{Data, Error};
use crate::core::moderation::{
    BanAction, ModerationError, PostId, ReviewAction, SessionId, Submission, BANNED_NOTICE,
};

pub const HELP: &str = "\
Commands:
  post <text>          submit a text post
  post-image <path>    submit an image file
  feed                 show your visible posts
  whoami               show the current session
  login <session>      switch to another session
  new-session          start a fresh session
  show <post id>       show one post
  queue                moderator: posts waiting for review
  approve <post id>    moderator: approve a post in review
  remove <post id>     moderator: remove a post in review
  ban <session>        moderator: ban a user
  unban <session>      moderator: unban a user
  user <session>       moderator: show one user
  users                moderator: list users
  dashboard            moderator: review queue and users
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Help,
    Post(String),
    PostImage(String),
    Feed,
    WhoAmI,
    Login(SessionId),
    NewSession,
    Show(PostId),
    Queue,
    Review(PostId, ReviewAction),
    Ban(SessionId, BanAction),
    User(SessionId),
    Users,
    Dashboard,
    Quit,
}

pub enum Reply {
    Say(String),
    Quit,
}

pub fn parse(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let require = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("`{}` needs {}", name, what))
        } else {
            Ok(rest.to_string())
        }
    };
    let post_id = || -> Result<PostId, String> {
        let raw = require("a post id")?;
        raw.parse::<u64>()
            .map(PostId)
            .map_err(|_| format!("`{}` is not a post id", raw))
    };

    match name {
        "help" => Ok(ConsoleCommand::Help),
        "post" => Ok(ConsoleCommand::Post(require("some text")?)),
        "post-image" => Ok(ConsoleCommand::PostImage(require("a file path")?)),
        "feed" => Ok(ConsoleCommand::Feed),
        "whoami" => Ok(ConsoleCommand::WhoAmI),
        "login" => Ok(ConsoleCommand::Login(SessionId::new(require("a session id")?))),
        "new-session" => Ok(ConsoleCommand::NewSession),
        "show" => Ok(ConsoleCommand::Show(post_id()?)),
        "queue" => Ok(ConsoleCommand::Queue),
        "approve" => Ok(ConsoleCommand::Review(post_id()?, ReviewAction::Approve)),
        "remove" => Ok(ConsoleCommand::Review(post_id()?, ReviewAction::Remove)),
        "ban" => Ok(ConsoleCommand::Ban(
            SessionId::new(require("a session id")?),
            BanAction::Ban,
        )),
        "unban" => Ok(ConsoleCommand::Ban(
            SessionId::new(require("a session id")?),
            BanAction::Unban,
        )),
        "user" => Ok(ConsoleCommand::User(SessionId::new(require("a session id")?))),
        "users" => Ok(ConsoleCommand::Users),
        "dashboard" => Ok(ConsoleCommand::Dashboard),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(format!("Unknown command `{}`. Type `help`.", other)),
    }
}

pub async fn execute(
    data: &Data,
    session: &mut SessionId,
    command: ConsoleCommand,
) -> Result<Reply, Error> {
    let service = &data.moderation;

    let text = match command {
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => return Ok(Reply::Quit),

        ConsoleCommand::Post(text) => submit(data, session, Submission::text(text)).await?,
        ConsoleCommand::PostImage(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => submit(data, session, Submission::image(bytes)).await?,
            Err(e) => format!("Could not read {}: {}", path, e),
        },

        ConsoleCommand::Feed => formatter::format_posts(&service.own_feed(session).await?),
        ConsoleCommand::WhoAmI => {
            let user = service.touch_user(session).await?;
            formatter::format_user(&user)
        }
        ConsoleCommand::Login(id) => {
            let user = service.touch_user(&id).await?;
            *session = id;
            format!("Switched to {}", formatter::format_user(&user))
        }
        ConsoleCommand::NewSession => {
            let id = SessionId::generate();
            service.touch_user(&id).await?;
            *session = id;
            format!("Started session {}", session)
        }

        ConsoleCommand::Show(id) => match service.get_post(id).await {
            Ok(post) => formatter::format_post(&post),
            Err(e) => local_error_message(e)?,
        },
        ConsoleCommand::Queue => formatter::format_posts(&service.review_queue().await?),
        ConsoleCommand::Review(id, action) => match service.review_post(id, action).await {
            Ok(post) => format!("Post {} is now {}.", post.id, post.status),
            Err(e) => local_error_message(e)?,
        },
        ConsoleCommand::Ban(id, action) => match service.set_user_ban(&id, action).await {
            Ok(user) => formatter::format_user(&user),
            Err(e) => local_error_message(e)?,
        },
        ConsoleCommand::User(id) => match service.get_user(&id).await {
            Ok(user) => formatter::format_user(&user),
            Err(e) => local_error_message(e)?,
        },
        ConsoleCommand::Users => formatter::format_users(&service.list_users().await?),
        ConsoleCommand::Dashboard => formatter::format_dashboard(&service.dashboard().await?),
    };

    Ok(Reply::Say(text))
}

async fn submit(data: &Data, session: &SessionId, submission: Submission) -> Result<String, Error> {
    match data.moderation.submit(session, submission).await {
        Ok(outcome) => Ok(format!(
            "{}\n{}",
            outcome.notice(),
            formatter::format_post(&outcome.post)
        )),
        Err(ModerationError::Banned(_)) => Ok(BANNED_NOTICE.to_string()),
        Err(e) => local_error_message(e),
    }
}

/// Non-fatal errors become a message; storage failures propagate.
fn local_error_message(e: ModerationError) -> Result<String, Error> {
    if let ModerationError::StorageError(_) = e {
        return Err(e.into());
    }

    match e {
        ModerationError::Validation(message) => Ok(message),
        other => Ok(other.to_string()),
    }
}
