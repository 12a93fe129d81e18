//! Pure parsing of inbound chat text.
//!
//! This module only classifies text; it never touches state. The router owns
//! precedence (dialog continuation, active-item membership for callbacks)
//! and side effects.

use crate::lifecycle::event::TaskEvent;
use crate::lifecycle::state::TaskId;
use crate::team::TeamId;

/// A classified inbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    /// `/createteam`: begin (or continue) the team creation dialog.
    CreateTeam,
    /// `/movetoreview`: begin (or continue) the submit-for-review dialog.
    MoveToReview,
    /// `/help`
    Help,
    /// `/cancel`: abort the open dialog.
    Cancel,
    /// `/start <teamId>`: deep-link team join. `team_id` is `None` when the
    /// payload is missing or not a valid id.
    Start { team_id: Option<TeamId> },
    /// An entity-targeted callback: an event token suffixed with a task id.
    Callback { event: TaskEvent, task_id: TaskId },
    /// Anything else.
    Unknown,
}

/// Strip the bot's own mention suffix when the text begins with it.
///
/// `"@reviewbot /help"` and `"/help"` classify identically.
pub fn strip_mention<'a>(text: &'a str, mention: &str) -> &'a str {
    let trimmed = text.trim();
    let Some(prefix) = trimmed.get(..mention.len()) else {
        return trimmed;
    };
    if prefix.eq_ignore_ascii_case(mention) {
        trimmed[mention.len()..].trim_start()
    } else {
        trimmed
    }
}

/// Classify a (mention-stripped) inbound text.
pub fn parse(text: &str) -> ParsedCommand {
    let trimmed = text.trim();

    if let Some((event, task_id)) = parse_callback(trimmed) {
        return ParsedCommand::Callback { event, task_id };
    }

    let lower = trimmed.to_ascii_lowercase();
    match lower.as_str() {
        "/createteam" => return ParsedCommand::CreateTeam,
        "/movetoreview" => return ParsedCommand::MoveToReview,
        "/help" => return ParsedCommand::Help,
        "/cancel" => return ParsedCommand::Cancel,
        _ => {}
    }

    if lower == "/start" {
        return ParsedCommand::Start { team_id: None };
    }
    if let Some(payload) = strip_prefix_ignore_case(trimmed, "/start ") {
        return ParsedCommand::Start {
            team_id: TeamId::parse(payload.trim()),
        };
    }

    ParsedCommand::Unknown
}

/// Try to read the text as `<event token><task id>`.
///
/// Callback tokens are matched exactly: they are produced by this crate's
/// own buttons, never typed by hand.
pub fn parse_callback(text: &str) -> Option<(TaskEvent, TaskId)> {
    for event in TaskEvent::CALLBACKS {
        if let Some(rest) = text.strip_prefix(event.callback_token()) {
            if let Some(task_id) = TaskId::parse(rest.trim()) {
                return Some((event, task_id));
            }
        }
    }
    None
}

/// Whether the text has the shape of a command allowed in a private chat:
/// `/start` deep links and the lifecycle callbacks. Everything else in a
/// private chat gets the help prompt before any dispatch happens.
pub fn is_public_shape(text: &str) -> bool {
    let trimmed = text.trim();
    if parse_callback(trimmed).is_some() {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    lower == "/start" || lower.starts_with("/start ")
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}
