//! Notification scheduler.
//!
//! A single long-lived loop: every tick it checks whether this is a
//! notifiable moment, fetches a bounded batch of due items (earliest first),
//! re-arms every item's clock to tick-start + interval *before* sending so a
//! slow send cannot cause a tight re-fire loop, dispatches role-appropriate
//! reminders, and persists the batch's re-armed clocks in one call. A per-item send
//! failure never blocks the rest of the batch nor its re-arm; the item is
//! simply retried on its next due cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::calendar::WorkdayOracle;
use crate::config::Config;
use crate::lifecycle::event::TaskEvent;
use crate::lifecycle::state::{TaskForReview, TaskState};
use crate::repository::TaskRepository;
use crate::translate::{MessageKey, Translator};
use crate::transport::{Button, ChatId, MessageSender, ReplyMarkup};

/// Everything the scheduler loop needs.
pub struct NotifierContext {
    pub config: Config,
    pub tasks: Arc<dyn TaskRepository>,
    pub transport: Arc<dyn MessageSender>,
    pub translator: Arc<dyn Translator>,
    pub calendar: Arc<dyn WorkdayOracle>,
}

/// Run the scheduler until `cancel` fires. Cancellation wins over the next
/// tick; an in-flight tick finishes its persistence step before exit.
pub async fn notification_loop(ctx: Arc<NotifierContext>, cancel: CancellationToken) {
    let mut ticker = interval(ctx.config.poll_delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Notification loop cancelled, exiting");
                return;
            }
            _ = ticker.tick() => {}
        }

        if let Err(e) = run_tick(&ctx, Utc::now()).await {
            error!("Notification tick failed: {e:#}");
        }
    }
}

/// Whether reminders may fire at `now`: within the configured UTC window,
/// and on a workday per the calendar (unless holidays are allowed).
pub async fn is_work_time(
    now: DateTime<Utc>,
    config: &Config,
    calendar: &dyn WorkdayOracle,
) -> bool {
    let time = now.time();
    if time < config.notify_start_utc || time >= config.notify_end_utc {
        return false;
    }
    config.work_on_holiday || calendar.is_workday(now.date_naive()).await
}

/// One scheduler iteration at `now`.
pub async fn run_tick(ctx: &NotifierContext, now: DateTime<Utc>) -> anyhow::Result<()> {
    if !is_work_time(now, &ctx.config, ctx.calendar.as_ref()).await {
        return Ok(());
    }

    let mut batch = ctx
        .tasks
        .get_tasks_for_notifications(now, &TaskState::ACTIVE, ctx.config.notify_batch_size)
        .await?;
    if batch.is_empty() {
        return Ok(());
    }

    info!("Dispatching reminders for {} due items", batch.len());

    // Re-arm the whole batch relative to tick start, before any send.
    let next = now + ctx.config.notify_interval;
    for task in &mut batch {
        task.next_notification = Some(next);
    }

    for task in &batch {
        let (chat_id, text, markup) = build_reminder(task, ctx.translator.as_ref());
        if let Err(e) = ctx.transport.send_text(chat_id, &text, Some(markup)).await {
            warn!(
                "Failed to send reminder for task {} to chat {chat_id}: {e}",
                task.id
            );
        }
    }

    // One persistence call for the batch, after all sends were attempted.
    // Only the clocks are written: a transition committed by the router
    // while the sends were in flight wins over the scheduler's stale copy.
    ctx.tasks.update(&batch).await?;

    Ok(())
}

/// Build the role-appropriate reminder for a due item.
///
/// Reviewer gets the action buttons matching the item's state; the owner of
/// an on-correction item gets exactly one "move to next round" prompt.
pub fn build_reminder(
    task: &TaskForReview,
    translator: &dyn Translator,
) -> (ChatId, String, ReplyMarkup) {
    let callback = |event: TaskEvent| format!("{}{}", event.callback_token(), task.id);
    // Who the reminder waits on is the item's single source of truth.
    let recipient = ChatId(task.reminder_recipient().0);

    let (text, buttons) = match task.state {
        TaskState::New => {
            let reviewer = task.reviewer();
            (
                translator.get(
                    MessageKey::ReviewerReminder,
                    reviewer.language(),
                    &[&task.description, task.owner().name()],
                ),
                vec![Button::new(
                    translator.get(MessageKey::ButtonMoveToInProgress, reviewer.language(), &[]),
                    callback(TaskEvent::MoveToInProgress),
                )],
            )
        }
        TaskState::InProgress => {
            let reviewer = task.reviewer();
            (
                translator.get(
                    MessageKey::ReviewerReminder,
                    reviewer.language(),
                    &[&task.description, task.owner().name()],
                ),
                vec![
                    Button::new(
                        translator.get(MessageKey::ButtonAccept, reviewer.language(), &[]),
                        callback(TaskEvent::Accept),
                    ),
                    Button::new(
                        translator.get(MessageKey::ButtonDecline, reviewer.language(), &[]),
                        callback(TaskEvent::Decline),
                    ),
                ],
            )
        }
        // OnCorrection nudges the owner; terminal states are never fetched.
        _ => {
            let owner = task.owner();
            (
                translator.get(
                    MessageKey::OwnerReminder,
                    owner.language(),
                    &[&task.description, task.reviewer().name()],
                ),
                vec![Button::new(
                    translator.get(MessageKey::ButtonMoveToNextRound, owner.language(), &[]),
                    callback(TaskEvent::MoveToNextRound),
                )],
            )
        }
    };

    (recipient, text, ReplyMarkup::new(buttons))
}
