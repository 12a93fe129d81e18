//! In-memory repository implementations.
//!
//! Backing store for tests, and the degraded-but-safe mode when no durable
//! store is wired: state is lost on restart, which the dialog and lifecycle
//! layers tolerate by idempotent recreation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{RepositoryError, TaskRepository, TeamRepository};
use crate::lifecycle::state::{TaskForReview, TaskId, TaskState};
use crate::team::{Team, TeamId};
use crate::transport::ChatId;

/// In-memory task store: a `HashMap` behind a `RwLock`.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<TaskId, TaskForReview>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn get_ids(&self, states: &[TaskState]) -> Result<Vec<TaskId>, RepositoryError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| states.contains(&t.state))
            .map(|t| t.id)
            .collect())
    }

    async fn get_by_id(&self, id: TaskId) -> Result<Option<TaskForReview>, RepositoryError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(&id).cloned())
    }

    async fn upsert(&self, task: &TaskForReview) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_tasks_for_notifications(
        &self,
        now: DateTime<Utc>,
        states: &[TaskState],
        batch_size: usize,
    ) -> Result<Vec<TaskForReview>, RepositoryError> {
        let tasks = self.tasks.read().await;
        let mut due: Vec<TaskForReview> = tasks
            .values()
            .filter(|t| states.contains(&t.state))
            .filter(|t| t.next_notification.is_some_and(|at| at <= now))
            .cloned()
            .collect();
        // Earliest due first so a backlog cannot starve older items.
        due.sort_by_key(|t| t.next_notification);
        due.truncate(batch_size);
        Ok(due)
    }

    async fn update(&self, batch: &[TaskForReview]) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.write().await;
        for task in batch {
            // Clock-only write against the stored record: a transition that
            // committed since the caller's fetch must not be reverted.
            if let Some(stored) = tasks.get_mut(&task.id) {
                if stored.state.is_active() {
                    stored.next_notification = task.next_notification;
                }
            }
        }
        Ok(())
    }
}

/// In-memory team store.
#[derive(Default)]
pub struct InMemoryTeamRepository {
    teams: RwLock<HashMap<TeamId, Team>>,
}

impl InMemoryTeamRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeamRepository for InMemoryTeamRepository {
    async fn find(&self, id: TeamId) -> Result<Option<Team>, RepositoryError> {
        let teams = self.teams.read().await;
        Ok(teams.get(&id).cloned())
    }

    async fn upsert(&self, team: &Team) -> Result<(), RepositoryError> {
        let mut teams = self.teams.write().await;
        teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn get_teams(&self, chat_id: ChatId) -> Result<Vec<Team>, RepositoryError> {
        let teams = self.teams.read().await;
        Ok(teams
            .values()
            .filter(|t| t.chat_id == chat_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::{Player, UserId};
    use chrono::Duration;
    use proptest::prelude::*;

    fn task_due_at(offset_minutes: i64, now: DateTime<Utc>) -> TaskForReview {
        let mut task = TaskForReview::create(
            TeamId::generate(),
            ChatId(100),
            Player::new(UserId(1), "Owner", "owner"),
            Player::new(UserId(2), "Reviewer", "reviewer"),
            "item",
            now,
            Duration::minutes(offset_minutes),
        );
        task.state = TaskState::InProgress;
        task
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let repo = InMemoryTaskRepository::new();
        let task = task_due_at(-5, Utc::now());
        repo.upsert(&task).await.unwrap();
        let fetched = repo.get_by_id(task.id).await.unwrap();
        assert_eq!(fetched, Some(task));
    }

    #[tokio::test]
    async fn test_get_ids_filters_by_state() {
        let repo = InMemoryTaskRepository::new();
        let now = Utc::now();

        let active = task_due_at(-5, now);
        repo.upsert(&active).await.unwrap();

        let mut accepted = task_due_at(-5, now);
        accepted.state = TaskState::Accept;
        accepted.next_notification = None;
        repo.upsert(&accepted).await.unwrap();

        let ids = repo.get_ids(&TaskState::ACTIVE).await.unwrap();
        assert_eq!(ids, vec![active.id]);
    }

    #[tokio::test]
    async fn test_notification_fetch_is_bounded_and_ordered() {
        let repo = InMemoryTaskRepository::new();
        let now = Utc::now();

        // Five items, due 50..10 minutes ago.
        let mut expected_order = vec![];
        for i in 1..=5 {
            let task = task_due_at(-10 * i, now);
            repo.upsert(&task).await.unwrap();
            expected_order.push((task.next_notification, task.id));
        }
        expected_order.sort_by_key(|(due, _)| *due);

        let batch = repo
            .get_tasks_for_notifications(now, &TaskState::ACTIVE, 3)
            .await
            .unwrap();
        assert_eq!(batch.len(), 3);
        // Earliest due first.
        for (task, (due, id)) in batch.iter().zip(expected_order.iter()) {
            assert_eq!(task.next_notification, *due);
            assert_eq!(task.id, *id);
        }
    }

    #[tokio::test]
    async fn test_notification_fetch_excludes_future_and_terminal() {
        let repo = InMemoryTaskRepository::new();
        let now = Utc::now();

        let future = task_due_at(10, now);
        repo.upsert(&future).await.unwrap();

        let mut terminal = task_due_at(-10, now);
        terminal.state = TaskState::Accept;
        repo.upsert(&terminal).await.unwrap();

        let due = task_due_at(-10, now);
        repo.upsert(&due).await.unwrap();

        let batch = repo
            .get_tasks_for_notifications(now, &TaskState::ACTIVE, 10)
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, due.id);
    }

    #[tokio::test]
    async fn test_batch_update_persists_all() {
        let repo = InMemoryTaskRepository::new();
        let now = Utc::now();
        let mut batch = vec![task_due_at(-10, now), task_due_at(-20, now)];
        for task in &batch {
            repo.upsert(task).await.unwrap();
        }

        for task in &mut batch {
            task.next_notification = Some(now + Duration::minutes(60));
        }
        repo.update(&batch).await.unwrap();

        for task in &batch {
            let stored = repo.get_by_id(task.id).await.unwrap().unwrap();
            assert_eq!(stored.next_notification, Some(now + Duration::minutes(60)));
        }
    }

    #[tokio::test]
    async fn test_batch_update_never_reverts_committed_transition() {
        let repo = InMemoryTaskRepository::new();
        let now = Utc::now();
        let task = task_due_at(-10, now);
        repo.upsert(&task).await.unwrap();

        // A reviewer's Accept lands after the scheduler fetched its copy.
        let mut accepted = task.clone();
        accepted.state = TaskState::Accept;
        accepted.accept_date = Some(now);
        accepted.next_notification = None;
        repo.upsert(&accepted).await.unwrap();

        let mut stale = task.clone();
        stale.next_notification = Some(now + Duration::minutes(60));
        repo.update(&[stale]).await.unwrap();

        let stored = repo.get_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(stored.state, TaskState::Accept);
        assert_eq!(stored.accept_date, Some(now));
        assert_eq!(stored.next_notification, None);
    }

    #[tokio::test]
    async fn test_batch_update_writes_clock_only() {
        let repo = InMemoryTaskRepository::new();
        let now = Utc::now();
        let task = task_due_at(-10, now);
        repo.upsert(&task).await.unwrap();

        // A Decline lands mid-batch; the item is still active, so the
        // re-armed clock applies but the newer state stands.
        let mut declined = task.clone();
        declined.state = TaskState::OnCorrection;
        repo.upsert(&declined).await.unwrap();

        let mut stale = task.clone();
        stale.next_notification = Some(now + Duration::minutes(60));
        repo.update(&[stale]).await.unwrap();

        let stored = repo.get_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(stored.state, TaskState::OnCorrection);
        assert_eq!(stored.next_notification, Some(now + Duration::minutes(60)));
    }

    #[tokio::test]
    async fn test_team_repository_round_trip() {
        let repo = InMemoryTeamRepository::new();
        let mut team = Team::new(ChatId(100), "Alpha", Player::new(UserId(1), "A", "a"));
        team.join(Player::new(UserId(2), "B", "b"));
        repo.upsert(&team).await.unwrap();

        assert_eq!(repo.find(team.id).await.unwrap(), Some(team.clone()));
        assert_eq!(repo.get_teams(ChatId(100)).await.unwrap(), vec![team]);
        assert!(repo.get_teams(ChatId(200)).await.unwrap().is_empty());
    }

    proptest! {
        /// Property: the notification fetch never exceeds the batch size and
        /// never returns an item that is not due or not active.
        #[test]
        fn notification_fetch_invariants(
            offsets in proptest::collection::vec(-120i64..120, 0..30),
            batch_size in 0usize..10,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let repo = InMemoryTaskRepository::new();
                let now = Utc::now();
                for (i, offset) in offsets.iter().enumerate() {
                    let mut task = task_due_at(*offset, now);
                    // Mix in some terminal items.
                    if i % 5 == 0 {
                        task.state = TaskState::Accept;
                        task.next_notification = None;
                    }
                    repo.upsert(&task).await.unwrap();
                }

                let batch = repo
                    .get_tasks_for_notifications(now, &TaskState::ACTIVE, batch_size)
                    .await
                    .unwrap();

                assert!(batch.len() <= batch_size);
                for task in &batch {
                    assert!(task.state.is_active());
                    assert!(task.next_notification.unwrap() <= now);
                }
                // Sorted earliest first.
                for pair in batch.windows(2) {
                    assert!(pair[0].next_notification <= pair[1].next_notification);
                }
            });
        }
    }
}
