//! Inbound message router.
//!
//! Classifies each inbound chat event and drives exactly one action, in the
//! fixed precedence order: mention strip, private-chat filter, cancel,
//! entity-targeted callbacks, generic dispatch (with dialog continuation
//! taking precedence over the raw text), and finally the `/start` deep-link
//! join. The precedence is a correctness contract: callbacks share a textual
//! shape with nothing else and must win before generic dispatch.
//!
//! Nothing escapes [`handle_message`]: transport errors are logged and
//! swallowed, anything else is logged and reported back to the chat as a
//! generic failure. A failure to send even that is itself swallowed.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::command::{self, ParsedCommand};
use crate::dialog::{DialogFlow, DialogState};
use crate::lifecycle::interpreter::EffectContext;
use crate::lifecycle::state::{TaskForReview, TaskState};
use crate::lifecycle::{self, event::TaskEvent};
use crate::team::{Player, Team, TeamId, UserId};
use crate::translate::MessageKey;
use crate::transport::{Button, ChatId, MessageId, ReplyMarkup, TransportError};
use crate::BotContext;

/// One inbound chat event, already decoded by the transport layer.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub message_id: MessageId,
    pub text: String,
    /// Display name of the sender.
    pub user_name: String,
    /// Login handle of the sender.
    pub login: String,
    pub language: crate::translate::LanguageId,
}

impl InboundMessage {
    fn sender(&self) -> Player {
        let mut player = Player::new(self.user_id, self.user_name.clone(), self.login.clone());
        player.language = self.language.clone();
        player
    }

    /// A chat where the sender messages about themself.
    fn is_private(&self) -> bool {
        self.chat_id.0 == self.user_id.0
    }
}

/// Top-level entry point. Never panics, never propagates.
pub async fn handle_message(ctx: &BotContext, inbound: &InboundMessage) {
    if let Err(e) = dispatch(ctx, inbound).await {
        if let Some(transport_err) = e.downcast_ref::<TransportError>() {
            warn!(
                "Transport error handling message {} from {}: {transport_err}",
                inbound.message_id, inbound.user_id
            );
            return;
        }

        error!(
            "Failed to handle message {} from {}: {e:#}",
            inbound.message_id, inbound.user_id
        );
        let text = ctx
            .translator
            .get(MessageKey::OperationFailed, &inbound.language, &[]);
        if let Err(send_err) = ctx.transport.send_text(inbound.chat_id, &text, None).await {
            warn!(
                "Failed to report failure back to chat {}: {send_err}",
                inbound.chat_id
            );
        }
    }
}

async fn dispatch(ctx: &BotContext, inbound: &InboundMessage) -> Result<()> {
    let text = command::strip_mention(&inbound.text, &ctx.config.bot_mention);

    // Private chats only accept the public command shapes; everything else
    // gets the help prompt before any dispatch can mutate state.
    if inbound.is_private() && !command::is_public_shape(text) {
        return send_key(ctx, inbound.chat_id, inbound, MessageKey::Help, &[]).await;
    }

    let parsed = command::parse(text);

    if parsed == ParsedCommand::Cancel {
        return cancel_dialog(ctx, inbound).await;
    }

    // Entity-targeted callbacks win over generic dispatch, but only for
    // currently-active items; a callback for a terminal or unknown item is a
    // stale button press and is ignored.
    if let ParsedCommand::Callback { event, task_id } = &parsed {
        let (event, task_id) = (*event, *task_id);
        let active = ctx.tasks.get_ids(&TaskState::ACTIVE).await?;
        if active.contains(&task_id) {
            let effect_ctx = EffectContext::new(ctx.transport.clone(), ctx.translator.clone());
            lifecycle::apply_event(
                ctx.tasks.as_ref(),
                &effect_ctx,
                task_id,
                event,
                Utc::now(),
                ctx.config.notify_interval,
            )
            .await?;
        } else {
            info!("Ignoring stale callback {event} for inactive task {task_id}");
        }
        return Ok(());
    }

    // Generic dispatch: an open dialog's continuation takes precedence over
    // the raw text, which then becomes the dialog's next data turn.
    if let Some(dialog) = ctx.dialogs.find(inbound.user_id).await {
        return match dialog.flow.clone() {
            DialogFlow::CreateTeam => continue_create_team(ctx, inbound, text).await,
            DialogFlow::MoveToReview { team_id } => {
                continue_move_to_review(ctx, inbound, team_id, text).await
            }
        };
    }

    match parsed {
        ParsedCommand::CreateTeam => begin_create_team(ctx, inbound).await,
        ParsedCommand::MoveToReview => begin_move_to_review(ctx, inbound).await,
        ParsedCommand::Help => {
            send_key(ctx, inbound.chat_id, inbound, MessageKey::Help, &[]).await
        }
        ParsedCommand::Start { team_id } => join_team(ctx, inbound, team_id).await,
        // Free text outside any dialog is not addressed to the bot.
        ParsedCommand::Unknown => Ok(()),
        // Handled above.
        ParsedCommand::Cancel | ParsedCommand::Callback { .. } => Ok(()),
    }
}

// =============================================================================
// Cancel
// =============================================================================

async fn cancel_dialog(ctx: &BotContext, inbound: &InboundMessage) -> Result<()> {
    match ctx.dialogs.end(inbound.user_id).await {
        Some(dialog) => {
            delete_attached(ctx, inbound.chat_id, &dialog).await;
            send_key(ctx, inbound.chat_id, inbound, MessageKey::DialogCancelled, &[]).await
        }
        None => send_key(ctx, inbound.chat_id, inbound, MessageKey::NothingToCancel, &[]).await,
    }
}

/// Best-effort cleanup of the bot's own dialog messages.
async fn delete_attached(ctx: &BotContext, chat_id: ChatId, dialog: &DialogState) {
    for message_id in &dialog.attached_message_ids {
        if let Err(e) = ctx.transport.delete_message(chat_id, *message_id).await {
            warn!("Failed to delete dialog message {message_id}: {e}");
        }
    }
}

// =============================================================================
// CreateTeam dialog
// =============================================================================

async fn begin_create_team(ctx: &BotContext, inbound: &InboundMessage) -> Result<()> {
    let Some(_) = ctx
        .dialogs
        .try_begin(inbound.user_id, DialogFlow::CreateTeam, inbound.message_id)
        .await
    else {
        // A racing second begin lost; the first dialog stands.
        return Ok(());
    };

    let prompt = ctx
        .translator
        .get(MessageKey::EnterTeamName, &inbound.language, &[]);
    let message_id = ctx
        .transport
        .send_text(inbound.chat_id, &prompt, None)
        .await?;
    let _ = ctx
        .dialogs
        .attach_message(inbound.user_id, message_id)
        .await;
    Ok(())
}

async fn continue_create_team(ctx: &BotContext, inbound: &InboundMessage, text: &str) -> Result<()> {
    let name = text.trim();
    if name.is_empty() {
        // Re-prompt; the dialog stays open.
        let prompt = ctx
            .translator
            .get(MessageKey::EnterTeamName, &inbound.language, &[]);
        let message_id = ctx
            .transport
            .send_text(inbound.chat_id, &prompt, None)
            .await?;
        let _ = ctx
            .dialogs
            .attach_message(inbound.user_id, message_id)
            .await;
        return Ok(());
    }

    let team = Team::new(inbound.chat_id, name, inbound.sender());
    ctx.teams
        .upsert(&team)
        .await
        .context("failed to persist new team")?;

    info!("Team {} ({}) created in chat {}", team.id, team.name, team.chat_id);

    if let Some(dialog) = ctx.dialogs.end(inbound.user_id).await {
        delete_attached(ctx, inbound.chat_id, &dialog).await;
    }

    // Announce with the join deep link and pin it so latecomers find it.
    let invite = format!("/start {}", team.id);
    let text = ctx.translator.get(
        MessageKey::TeamCreated,
        &inbound.language,
        &[&team.name, &invite],
    );
    let message_id = ctx.transport.send_text(inbound.chat_id, &text, None).await?;
    if let Err(e) = ctx.transport.pin_message(inbound.chat_id, message_id).await {
        warn!("Failed to pin team invite in chat {}: {e}", inbound.chat_id);
    }
    Ok(())
}

// =============================================================================
// MoveToReview dialog
// =============================================================================

async fn begin_move_to_review(ctx: &BotContext, inbound: &InboundMessage) -> Result<()> {
    let teams = ctx.teams.get_teams(inbound.chat_id).await?;
    if teams.is_empty() {
        return send_key(ctx, inbound.chat_id, inbound, MessageKey::NoTeamsInChat, &[]).await;
    }

    let Some(_) = ctx
        .dialogs
        .try_begin(
            inbound.user_id,
            DialogFlow::MoveToReview { team_id: None },
            inbound.message_id,
        )
        .await
    else {
        return Ok(());
    };

    let prompt = ctx
        .translator
        .get(MessageKey::ChooseTeam, &inbound.language, &[]);
    let buttons = teams
        .iter()
        .map(|team| Button::new(team.name.clone(), team.id.to_string()))
        .collect();
    let message_id = ctx
        .transport
        .send_text(inbound.chat_id, &prompt, Some(ReplyMarkup::new(buttons)))
        .await?;
    let _ = ctx
        .dialogs
        .attach_message(inbound.user_id, message_id)
        .await;
    Ok(())
}

async fn continue_move_to_review(
    ctx: &BotContext,
    inbound: &InboundMessage,
    chosen_team: Option<TeamId>,
    text: &str,
) -> Result<()> {
    match chosen_team {
        None => choose_team_turn(ctx, inbound, text).await,
        Some(team_id) => submit_description_turn(ctx, inbound, team_id, text).await,
    }
}

/// First data turn: the text is the chosen team id.
async fn choose_team_turn(ctx: &BotContext, inbound: &InboundMessage, text: &str) -> Result<()> {
    let Some(team_id) = TeamId::parse(text.trim()) else {
        return end_with_error(ctx, inbound, MessageKey::TeamNotFound, &[]).await;
    };
    let Some(team) = ctx.teams.find(team_id).await? else {
        return end_with_error(ctx, inbound, MessageKey::TeamNotFound, &[]).await;
    };

    if team.member(inbound.user_id).is_none() {
        return end_with_error(ctx, inbound, MessageKey::NotATeamMember, &[]).await;
    }
    if team.players().len() < ctx.config.min_team_size {
        let min = ctx.config.min_team_size.to_string();
        return end_with_error(ctx, inbound, MessageKey::NotEnoughMembers, &[&min]).await;
    }

    let _ = ctx
        .dialogs
        .set_flow(
            inbound.user_id,
            DialogFlow::MoveToReview {
                team_id: Some(team_id),
            },
        )
        .await;

    let prompt = ctx
        .translator
        .get(MessageKey::EnterDescription, &inbound.language, &[]);
    let message_id = ctx
        .transport
        .send_text(inbound.chat_id, &prompt, None)
        .await?;
    let _ = ctx
        .dialogs
        .attach_message(inbound.user_id, message_id)
        .await;
    Ok(())
}

/// Second data turn: the text is the item description. Creates the item.
async fn submit_description_turn(
    ctx: &BotContext,
    inbound: &InboundMessage,
    team_id: TeamId,
    text: &str,
) -> Result<()> {
    let description = text.trim();
    if description.is_empty() {
        let prompt = ctx
            .translator
            .get(MessageKey::EnterDescription, &inbound.language, &[]);
        let message_id = ctx
            .transport
            .send_text(inbound.chat_id, &prompt, None)
            .await?;
        let _ = ctx
            .dialogs
            .attach_message(inbound.user_id, message_id)
            .await;
        return Ok(());
    }

    let mut team = ctx
        .teams
        .find(team_id)
        .await?
        .with_context(|| format!("team {team_id} vanished from storage"))?;

    let owner = team
        .member(inbound.user_id)
        .cloned()
        .with_context(|| format!("sender {} is no longer in team {team_id}", inbound.user_id))?;

    let Some(reviewer) = team.next_reviewer(inbound.user_id) else {
        let min = ctx.config.min_team_size.to_string();
        return end_with_error(ctx, inbound, MessageKey::NotEnoughMembers, &[&min]).await;
    };

    let now = Utc::now();
    let mut task = TaskForReview::create(
        team.id,
        team.chat_id,
        owner,
        reviewer,
        description,
        now,
        ctx.config.notify_interval,
    );

    // Live status message with the reviewer's first action.
    let status = ctx.translator.get(
        MessageKey::StatusWaiting,
        &inbound.language,
        &[&task.description, &task.owner.name, &task.reviewer.name],
    );
    let button = Button::new(
        ctx.translator
            .get(MessageKey::ButtonMoveToInProgress, &inbound.language, &[]),
        format!(
            "{}{}",
            TaskEvent::MoveToInProgress.callback_token(),
            task.id
        ),
    );
    let message_id = ctx
        .transport
        .send_text(
            team.chat_id,
            &status,
            Some(ReplyMarkup::new(vec![button])),
        )
        .await?;
    task.message_id = Some(message_id);

    ctx.tasks
        .upsert(&task)
        .await
        .context("failed to persist review item")?;
    // Rotation cursor moved; persist the team too.
    ctx.teams
        .upsert(&team)
        .await
        .context("failed to persist team rotation")?;

    info!(
        "Task {} created: owner {}, reviewer {}, team {}",
        task.id, task.owner.user_id, task.reviewer.user_id, team.id
    );

    if let Some(dialog) = ctx.dialogs.end(inbound.user_id).await {
        delete_attached(ctx, inbound.chat_id, &dialog).await;
    }
    Ok(())
}

// =============================================================================
// Deep-link join
// =============================================================================

async fn join_team(
    ctx: &BotContext,
    inbound: &InboundMessage,
    team_id: Option<TeamId>,
) -> Result<()> {
    let Some(team_id) = team_id else {
        // Bare /start: greet with help.
        return send_key(ctx, inbound.chat_id, inbound, MessageKey::Help, &[]).await;
    };

    let Some(mut team) = ctx.teams.find(team_id).await? else {
        return send_key(ctx, inbound.chat_id, inbound, MessageKey::TeamNotFound, &[]).await;
    };

    team.join(inbound.sender());
    ctx.teams
        .upsert(&team)
        .await
        .context("failed to persist team join")?;

    info!("User {} joined team {}", inbound.user_id, team.id);

    let name = team.name.clone();
    send_key(ctx, inbound.chat_id, inbound, MessageKey::JoinedTeam, &[&name]).await
}

// =============================================================================
// Helpers
// =============================================================================

async fn send_key(
    ctx: &BotContext,
    chat_id: ChatId,
    inbound: &InboundMessage,
    key: MessageKey,
    args: &[&str],
) -> Result<()> {
    let text = ctx.translator.get(key, &inbound.language, args);
    ctx.transport.send_text(chat_id, &text, None).await?;
    Ok(())
}

/// User-input error: translated message, dialog ended, no retry.
async fn end_with_error(
    ctx: &BotContext,
    inbound: &InboundMessage,
    key: MessageKey,
    args: &[&str],
) -> Result<()> {
    if let Some(dialog) = ctx.dialogs.end(inbound.user_id).await {
        delete_attached(ctx, inbound.chat_id, &dialog).await;
    }
    send_key(ctx, inbound.chat_id, inbound, key, args).await
}
