//! Events that drive the review lifecycle.
//!
//! Events arrive either from the command router (a reviewer or owner pressed
//! a callback button) or from internal flows. They are inputs to the pure
//! transition function; any pair of (state, event) outside the legal table
//! is a silent no-op.

use serde::{Deserialize, Serialize};
use std::fmt;

/// All events a review item can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskEvent {
    /// Reviewer takes the item into review.
    MoveToInProgress,
    /// Reviewer accepts the item.
    Accept,
    /// Reviewer declines the item; the owner must revise it.
    Decline,
    /// Owner sends the revised item back for another review round.
    MoveToNextRound,
    /// Accepted item is moved out of the visible backlog. Not reachable
    /// from any chat command or button; issued by storage maintenance when
    /// accepted history is swept out of view.
    Archive,
}

impl TaskEvent {
    /// Events a chat user can trigger through an entity-targeted callback.
    pub const CALLBACKS: [TaskEvent; 4] = [
        TaskEvent::MoveToInProgress,
        TaskEvent::Accept,
        TaskEvent::Decline,
        TaskEvent::MoveToNextRound,
    ];

    /// Callback token prefix; a full callback is this token followed by the
    /// task id.
    pub fn callback_token(&self) -> &'static str {
        match self {
            TaskEvent::MoveToInProgress => "moveToInProgress",
            TaskEvent::Accept => "accept",
            TaskEvent::Decline => "decline",
            TaskEvent::MoveToNextRound => "moveToNextRound",
            TaskEvent::Archive => "archive",
        }
    }
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.callback_token())
    }
}
