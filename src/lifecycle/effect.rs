//! Effects (side effects as data).
//!
//! Transitions describe what should happen as pure data; the interpreter
//! executes effects against the real transport and translator. This keeps
//! the transition table testable without any mocking.

use super::state::{TaskForReview, TaskState};
use crate::team::Player;
use crate::translate::MessageKey;
use crate::transport::{ChatId, MessageId};
use serde::{Deserialize, Serialize};

/// All effects a transition can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Edit the item's live status message in place. No new message is sent;
    /// if the item has no recorded message id, the edit is skipped with a
    /// warning.
    UpdateStatusMessage {
        chat_id: ChatId,
        message_id: Option<MessageId>,
        content: StatusContent,
    },

    /// Send a message to the owner's private chat.
    NotifyOwner {
        owner: Player,
        content: OwnerNotification,
    },

    /// Log a message.
    Log { level: LogLevel, message: String },
}

/// Content of the live status message, keyed by lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusContent {
    pub state: TaskState,
    pub description: String,
    pub owner_name: String,
    pub reviewer_name: String,
}

impl StatusContent {
    pub fn for_task(task: &TaskForReview) -> Self {
        Self {
            state: task.state,
            description: task.description.clone(),
            owner_name: task.owner.name.clone(),
            reviewer_name: task.reviewer.name.clone(),
        }
    }

    pub fn message_key(&self) -> MessageKey {
        match self.state {
            TaskState::New => MessageKey::StatusWaiting,
            TaskState::InProgress => MessageKey::StatusInProgress,
            TaskState::OnCorrection => MessageKey::StatusOnCorrection,
            TaskState::Accept | TaskState::Archived => MessageKey::StatusAccepted,
        }
    }
}

/// What the owner is told about their item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerNotification {
    /// The reviewer accepted the item.
    Accepted { description: String },
    /// The reviewer declined the item; carries the task id so the prompt can
    /// offer exactly one "move to next round" button.
    Declined {
        description: String,
        task_id: super::state::TaskId,
    },
}

/// Log level for logging effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
