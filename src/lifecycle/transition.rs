//! Pure state transition function.
//!
//! Takes the current item and an event, returns the updated item and a list
//! of effects. No side effects here; everything observable is returned as
//! data. Any (state, event) pair outside the legal table returns the item
//! unchanged with no effects: stale callback buttons (double-clicks, two
//! reviewers racing) must not surface errors, and the first transition's
//! result stays authoritative.

use super::effect::{Effect, OwnerNotification, StatusContent};
use super::event::TaskEvent;
use super::state::{TaskForReview, TaskState};
use chrono::{DateTime, Duration, Utc};

/// Result of a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The item after the transition.
    pub task: TaskForReview,
    /// Effects to execute.
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(task: TaskForReview, effects: Vec<Effect>) -> Self {
        Self { task, effects }
    }

    pub fn no_change(task: TaskForReview) -> Self {
        Self {
            task,
            effects: vec![],
        }
    }
}

/// Pure transition function for the review lifecycle.
///
/// `interval` is the notification re-arm interval; `now` is injected so the
/// function stays deterministic.
pub fn transition(
    task: TaskForReview,
    event: TaskEvent,
    now: DateTime<Utc>,
    interval: Duration,
) -> TransitionResult {
    match (task.state, event) {
        // Reviewer starts working: arm the notification clock fresh.
        (TaskState::New, TaskEvent::MoveToInProgress) => {
            let mut task = task;
            task.state = TaskState::InProgress;
            task.next_notification = Some(now + interval);
            let status = status_effect(&task);
            TransitionResult::new(task, vec![status])
        }

        // Accept from New or InProgress: terminal, clock cleared.
        (TaskState::New | TaskState::InProgress, TaskEvent::Accept) => {
            let mut task = task;
            task.state = TaskState::Accept;
            task.accept_date = Some(now);
            task.next_notification = None;
            let effects = vec![
                status_effect(&task),
                Effect::NotifyOwner {
                    owner: task.owner.clone(),
                    content: OwnerNotification::Accepted {
                        description: task.description.clone(),
                    },
                },
            ];
            TransitionResult::new(task, effects)
        }

        // Decline from New or InProgress: owner must revise. The clock stays
        // armed so the scheduler keeps nudging the owner; if it was somehow
        // unset, arm it to keep on-correction items schedulable.
        (TaskState::New | TaskState::InProgress, TaskEvent::Decline) => {
            let mut task = task;
            task.state = TaskState::OnCorrection;
            if task.next_notification.is_none() {
                task.next_notification = Some(now + interval);
            }
            let effects = vec![
                status_effect(&task),
                Effect::NotifyOwner {
                    owner: task.owner.clone(),
                    content: OwnerNotification::Declined {
                        description: task.description.clone(),
                        task_id: task.id,
                    },
                },
            ];
            TransitionResult::new(task, effects)
        }

        // Owner sends the revision back: another round, fresh clock.
        (TaskState::OnCorrection, TaskEvent::MoveToNextRound) => {
            let mut task = task;
            task.state = TaskState::InProgress;
            task.next_notification = Some(now + interval);
            let status = status_effect(&task);
            TransitionResult::new(task, vec![status])
        }

        // Accepted items can be archived by a storage maintenance sweep
        // (never by a user action); accept_date is retained.
        (TaskState::Accept, TaskEvent::Archive) => {
            let mut task = task;
            task.state = TaskState::Archived;
            TransitionResult::new(
                task,
                vec![Effect::Log {
                    level: super::effect::LogLevel::Info,
                    message: "task archived".to_string(),
                }],
            )
        }

        // Everything else is a stale or racing command: silently ignore.
        _ => TransitionResult::no_change(task),
    }
}

fn status_effect(task: &TaskForReview) -> Effect {
    Effect::UpdateStatusMessage {
        chat_id: task.chat_id,
        message_id: task.message_id,
        content: StatusContent::for_task(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::{Player, TeamId, UserId};
    use crate::transport::{ChatId, MessageId};
    use proptest::prelude::*;

    const INTERVAL_MINUTES: i64 = 60;

    fn interval() -> Duration {
        Duration::minutes(INTERVAL_MINUTES)
    }

    fn task_in(state: TaskState) -> TaskForReview {
        let mut task = TaskForReview::create(
            TeamId::generate(),
            ChatId(100),
            Player::new(UserId(1), "Owner", "owner"),
            Player::new(UserId(2), "Reviewer", "reviewer"),
            "Fix bug X",
            Utc::now(),
            interval(),
        );
        task.message_id = Some(MessageId(555));
        task.state = state;
        if state.is_terminal() {
            task.next_notification = None;
            task.accept_date = Some(Utc::now());
        }
        task
    }

    fn has_status_edit(effects: &[Effect]) -> bool {
        effects
            .iter()
            .any(|e| matches!(e, Effect::UpdateStatusMessage { .. }))
    }

    #[test]
    fn test_new_move_to_in_progress_arms_clock() {
        let now = Utc::now();
        let result = transition(
            task_in(TaskState::New),
            TaskEvent::MoveToInProgress,
            now,
            interval(),
        );
        assert_eq!(result.task.state, TaskState::InProgress);
        assert_eq!(result.task.next_notification, Some(now + interval()));
        assert!(has_status_edit(&result.effects));
        // Status edit only: no new message to the chat.
        assert_eq!(result.effects.len(), 1);
    }

    #[test]
    fn test_accept_sets_accept_date_and_clears_clock() {
        let now = Utc::now();
        for from in [TaskState::New, TaskState::InProgress] {
            let result = transition(task_in(from), TaskEvent::Accept, now, interval());
            assert_eq!(result.task.state, TaskState::Accept);
            assert_eq!(result.task.accept_date, Some(now));
            assert_eq!(result.task.next_notification, None);
            assert!(has_status_edit(&result.effects));
            assert!(result.effects.iter().any(|e| matches!(
                e,
                Effect::NotifyOwner {
                    content: OwnerNotification::Accepted { .. },
                    ..
                }
            )));
        }
    }

    #[test]
    fn test_decline_moves_to_on_correction_and_prompts_owner() {
        let now = Utc::now();
        for from in [TaskState::New, TaskState::InProgress] {
            let task = task_in(from);
            let armed_at = task.next_notification;
            let result = transition(task, TaskEvent::Decline, now, interval());
            assert_eq!(result.task.state, TaskState::OnCorrection);
            // Existing clock is left untouched; the scheduler re-arms on fire.
            assert_eq!(result.task.next_notification, armed_at);
            assert!(result.task.accept_date.is_none());
            assert!(result.effects.iter().any(|e| matches!(
                e,
                Effect::NotifyOwner {
                    content: OwnerNotification::Declined { .. },
                    ..
                }
            )));
        }
    }

    #[test]
    fn test_decline_arms_clock_when_unset() {
        let now = Utc::now();
        let mut task = task_in(TaskState::InProgress);
        task.next_notification = None;
        let result = transition(task, TaskEvent::Decline, now, interval());
        assert_eq!(result.task.next_notification, Some(now + interval()));
    }

    #[test]
    fn test_move_to_next_round_rearms() {
        let now = Utc::now();
        let result = transition(
            task_in(TaskState::OnCorrection),
            TaskEvent::MoveToNextRound,
            now,
            interval(),
        );
        assert_eq!(result.task.state, TaskState::InProgress);
        assert_eq!(result.task.next_notification, Some(now + interval()));
    }

    #[test]
    fn test_archive_from_accept_keeps_accept_date() {
        let now = Utc::now();
        let task = task_in(TaskState::Accept);
        let accept_date = task.accept_date;
        let result = transition(task, TaskEvent::Archive, now, interval());
        assert_eq!(result.task.state, TaskState::Archived);
        assert_eq!(result.task.accept_date, accept_date);
        assert_eq!(result.task.next_notification, None);
    }

    #[test]
    fn test_double_accept_is_noop() {
        let now = Utc::now();
        let first = transition(task_in(TaskState::InProgress), TaskEvent::Accept, now, interval());
        let accepted = first.task.clone();

        // Second Accept (stale button press) changes nothing.
        let later = now + Duration::minutes(5);
        let second = transition(first.task, TaskEvent::Accept, later, interval());
        assert_eq!(second.task, accepted);
        assert!(second.effects.is_empty());
    }

    fn legal(state: TaskState, event: TaskEvent) -> bool {
        matches!(
            (state, event),
            (TaskState::New, TaskEvent::MoveToInProgress)
                | (TaskState::New | TaskState::InProgress, TaskEvent::Accept)
                | (TaskState::New | TaskState::InProgress, TaskEvent::Decline)
                | (TaskState::OnCorrection, TaskEvent::MoveToNextRound)
                | (TaskState::Accept, TaskEvent::Archive)
        )
    }

    fn arb_state() -> impl Strategy<Value = TaskState> {
        prop_oneof![
            Just(TaskState::New),
            Just(TaskState::InProgress),
            Just(TaskState::OnCorrection),
            Just(TaskState::Accept),
            Just(TaskState::Archived),
        ]
    }

    fn arb_event() -> impl Strategy<Value = TaskEvent> {
        prop_oneof![
            Just(TaskEvent::MoveToInProgress),
            Just(TaskEvent::Accept),
            Just(TaskEvent::Decline),
            Just(TaskEvent::MoveToNextRound),
            Just(TaskEvent::Archive),
        ]
    }

    proptest! {
        /// Property: any (state, event) pair outside the legal table leaves
        /// state, accept_date and next_notification unchanged and emits no
        /// effects.
        #[test]
        fn illegal_transitions_change_nothing(state in arb_state(), event in arb_event()) {
            prop_assume!(!legal(state, event));
            let task = task_in(state);
            let before = task.clone();
            let result = transition(task, event, Utc::now(), interval());
            prop_assert_eq!(result.task, before);
            prop_assert!(result.effects.is_empty());
        }

        /// Property: no transition ever leaves an active item without a
        /// scheduled notification, and no terminal item with one.
        #[test]
        fn clock_matches_state(state in arb_state(), event in arb_event()) {
            let result = transition(task_in(state), event, Utc::now(), interval());
            if result.task.state.is_terminal() {
                prop_assert!(result.task.next_notification.is_none());
            } else {
                prop_assert!(result.task.next_notification.is_some());
            }
        }
    }
}
