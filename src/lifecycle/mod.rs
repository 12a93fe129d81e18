//! Review lifecycle state machine.
//!
//! The design separates:
//! - **State**: what the item is (`TaskForReview`, `TaskState`)
//! - **Events**: what happened (`TaskEvent`)
//! - **Effects**: what to do about it (`Effect`)
//! - **Transition**: pure function `(task, event) -> (task, effects)`
//!
//! [`apply_event`] glues them together against the repository and the effect
//! interpreter: it re-reads the item, transitions, persists, and only then
//! executes message effects. The repository upsert is the commit point: if
//! it fails, the transition never happened.

pub mod effect;
pub mod event;
pub mod interpreter;
pub mod state;
pub mod transition;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use self::event::TaskEvent;
use self::interpreter::{execute_effects, EffectContext};
use self::state::{TaskForReview, TaskId};
use self::transition::{transition, TransitionResult};
use crate::repository::TaskRepository;

/// Apply an event to a stored item.
///
/// Always re-reads the current item from the repository first: the router
/// and the scheduler share the store and neither may act on a cached copy.
/// A vanished item is a contract violation surfaced as an error; an illegal
/// transition is a silent no-op and skips the write entirely.
///
/// Returns the item as it is after the call.
pub async fn apply_event(
    repo: &dyn TaskRepository,
    effect_ctx: &EffectContext,
    task_id: TaskId,
    event: TaskEvent,
    now: DateTime<Utc>,
    interval: Duration,
) -> Result<TaskForReview> {
    let task = repo
        .get_by_id(task_id)
        .await
        .context("failed to load task")?
        .with_context(|| format!("task {task_id} vanished from storage"))?;

    let from = task.state;
    let TransitionResult { task, effects } = transition(task, event, now, interval);

    if effects.is_empty() && task.state == from {
        info!("Ignoring {event} for task {task_id} in state {from:?}");
        return Ok(task);
    }

    info!(
        "Task {task_id}: {from:?} -> {:?} on {event}",
        task.state
    );

    // Persist before any outbound message: a failed upsert means the
    // transition is not committed and must not be reported as done.
    repo.upsert(&task).await.context("failed to persist task")?;

    execute_effects(effect_ctx, effects).await;

    Ok(task)
}
