//! Repository abstraction for review items and teams.
//!
//! The core acts on storage only through these traits; the router and the
//! notification scheduler share the same instances and always re-read
//! current state before mutating, so neither can clobber the other through
//! a stale private copy. Last-writer-wins at the storage layer is
//! acceptable only because every lifecycle transition is idempotent or a
//! no-op on illegal state.

mod memory;

pub use memory::{InMemoryTaskRepository, InMemoryTeamRepository};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::lifecycle::state::{TaskForReview, TaskId, TaskState};
use crate::team::{Team, TeamId};
use crate::transport::ChatId;

/// Error from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("storage operation failed: {0}")]
    Storage(String),
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

/// Storage for [`TaskForReview`] items. Items are never deleted; terminal
/// states are retained for history.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Ids of all items currently in one of `states`.
    async fn get_ids(&self, states: &[TaskState]) -> Result<Vec<TaskId>, RepositoryError>;

    /// Fetch a single item.
    async fn get_by_id(&self, id: TaskId) -> Result<Option<TaskForReview>, RepositoryError>;

    /// Insert or replace an item.
    async fn upsert(&self, task: &TaskForReview) -> Result<(), RepositoryError>;

    /// Up to `batch_size` items in `states` whose notification clock is due
    /// at `now`, earliest due first. The ordering is a fairness contract: a
    /// backlog must not starve older items.
    async fn get_tasks_for_notifications(
        &self,
        now: DateTime<Utc>,
        states: &[TaskState],
        batch_size: usize,
    ) -> Result<Vec<TaskForReview>, RepositoryError>;

    /// Persist a batch of re-armed notification clocks in one call.
    ///
    /// Writes only `next_notification`, per item, against the currently
    /// stored record. The caller's copies are stale by the time this runs:
    /// a transition committed between the fetch and this call must win, so
    /// no other field is touched and items that have gone terminal (or
    /// vanished) are skipped entirely.
    async fn update(&self, tasks: &[TaskForReview]) -> Result<(), RepositoryError>;
}

/// Storage for [`Team`]s.
#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn find(&self, id: TeamId) -> Result<Option<Team>, RepositoryError>;

    async fn upsert(&self, team: &Team) -> Result<(), RepositoryError>;

    /// All teams originating from `chat_id`.
    async fn get_teams(&self, chat_id: ChatId) -> Result<Vec<Team>, RepositoryError>;
}
