//! Effect interpreter.
//!
//! The boundary between the pure transition function and the impure world:
//! takes effects (descriptions of what to do) and executes them against the
//! transport and translator. A failed effect is logged and the rest of the
//! batch still runs; transport failures never propagate out of here.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::effect::{Effect, LogLevel, OwnerNotification, StatusContent};
use crate::team::Player;
use crate::translate::{MessageKey, Translator};
use crate::transport::{Button, ChatId, MessageSender, ReplyMarkup};

/// Handles the interpreter needs to execute effects.
pub struct EffectContext {
    pub transport: Arc<dyn MessageSender>,
    pub translator: Arc<dyn Translator>,
}

impl EffectContext {
    pub fn new(transport: Arc<dyn MessageSender>, translator: Arc<dyn Translator>) -> Self {
        Self {
            transport,
            translator,
        }
    }
}

/// Execute effects sequentially. Failures are logged; execution continues
/// with the remaining effects.
pub async fn execute_effects(ctx: &EffectContext, effects: Vec<Effect>) {
    for effect in effects {
        execute_effect(ctx, effect).await;
    }
}

async fn execute_effect(ctx: &EffectContext, effect: Effect) {
    match effect {
        Effect::UpdateStatusMessage {
            chat_id,
            message_id,
            content,
        } => execute_status_update(ctx, chat_id, message_id, content).await,

        Effect::NotifyOwner { owner, content } => execute_notify_owner(ctx, owner, content).await,

        Effect::Log { level, message } => match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => info!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        },
    }
}

async fn execute_status_update(
    ctx: &EffectContext,
    chat_id: ChatId,
    message_id: Option<crate::transport::MessageId>,
    content: StatusContent,
) {
    let Some(message_id) = message_id else {
        warn!("No status message recorded for item in chat {chat_id}, skipping edit");
        return;
    };

    // Status messages live in a shared chat, so they render in the
    // default language rather than any one member's.
    let text = render_status(ctx, &content);
    if let Err(e) = ctx.transport.edit_text(chat_id, message_id, &text).await {
        warn!("Failed to edit status message {message_id} in chat {chat_id}: {e}");
    }
}

/// Render the status message for the item's current state.
pub fn render_status(ctx: &EffectContext, content: &StatusContent) -> String {
    ctx.translator.get(
        content.message_key(),
        &crate::translate::LanguageId::default(),
        &[
            &content.description,
            &content.owner_name,
            &content.reviewer_name,
        ],
    )
}

async fn execute_notify_owner(ctx: &EffectContext, owner: Player, content: OwnerNotification) {
    // Owner notifications go to the owner's private chat.
    let chat_id = ChatId(owner.user_id.0);

    let (text, markup) = match content {
        OwnerNotification::Accepted { description } => (
            ctx.translator
                .get(MessageKey::OwnerAccepted, &owner.language, &[&description]),
            None,
        ),
        OwnerNotification::Declined {
            description,
            task_id,
        } => {
            let text =
                ctx.translator
                    .get(MessageKey::OwnerDeclined, &owner.language, &[&description]);
            // Exactly one action: send the item to the next round.
            let button = Button::new(
                ctx.translator
                    .get(MessageKey::ButtonMoveToNextRound, &owner.language, &[]),
                format!(
                    "{}{}",
                    super::event::TaskEvent::MoveToNextRound.callback_token(),
                    task_id
                ),
            );
            (text, Some(ReplyMarkup::new(vec![button])))
        }
    };

    if let Err(e) = ctx.transport.send_text(chat_id, &text, markup).await {
        warn!("Failed to notify owner {}: {e}", owner.user_id);
    }
}
