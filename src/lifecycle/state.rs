//! State types for the review lifecycle.
//!
//! A [`TaskForReview`] is the reviewable work item. Its `state` only ever
//! changes through the pure transition function in this module's parent;
//! terminal items are retained for history, never deleted.

use crate::team::{Owner, Player, Reviewer, TeamId, UserId};
use crate::transport::{ChatId, MessageId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Newtype for a generated review-item id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Created, reviewer not yet started.
    New,
    /// Reviewer is working on it.
    InProgress,
    /// Declined; owner must revise and send it to the next round.
    OnCorrection,
    /// Accepted by the reviewer.
    Accept,
    /// Accepted and moved out of the visible backlog; kept for history.
    Archived,
}

impl TaskState {
    /// States eligible for callbacks and notification.
    pub const ACTIVE: [TaskState; 3] =
        [TaskState::New, TaskState::InProgress, TaskState::OnCorrection];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Accept | TaskState::Archived)
    }
}

/// The reviewable work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskForReview {
    pub id: TaskId,
    pub team_id: TeamId,
    /// Chat the live status message lives in.
    pub chat_id: ChatId,
    pub owner: Player,
    pub reviewer: Player,
    pub description: String,
    pub state: TaskState,
    /// When the next reminder fires. `None` only in terminal states.
    pub next_notification: Option<DateTime<Utc>>,
    /// Set exactly when the item reaches Accept; survives archiving.
    pub accept_date: Option<DateTime<Utc>>,
    /// Id of the live status message to edit in place.
    pub message_id: Option<MessageId>,
}

impl TaskForReview {
    /// Create a new item in `New` state with the notification clock armed,
    /// so the reviewer gets nudged to start.
    ///
    /// Owner and reviewer must be distinct; callers resolve the reviewer via
    /// team rotation which already excludes the owner.
    pub fn create(
        team_id: TeamId,
        chat_id: ChatId,
        owner: Player,
        reviewer: Player,
        description: impl Into<String>,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Self {
        debug_assert_ne!(owner.user_id, reviewer.user_id);
        Self {
            id: TaskId::generate(),
            team_id,
            chat_id,
            owner,
            reviewer,
            description: description.into(),
            state: TaskState::New,
            next_notification: Some(now + interval),
            accept_date: None,
            message_id: None,
        }
    }

    pub fn owner(&self) -> Owner<'_> {
        self.owner.as_owner()
    }

    pub fn reviewer(&self) -> Reviewer<'_> {
        self.reviewer.as_reviewer()
    }

    /// The user the next reminder goes to: the owner while the item waits
    /// for corrections, the reviewer otherwise.
    pub fn reminder_recipient(&self) -> UserId {
        match self.state {
            TaskState::OnCorrection => self.owner.user_id,
            _ => self.reviewer.user_id,
        }
    }

}
