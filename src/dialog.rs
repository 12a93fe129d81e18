//! Per-user dialog continuation store.
//!
//! One multi-step conversation per user, surviving turns but not required to
//! survive restarts: a lost dialog is recreated by the user, which is the
//! degraded-but-safe mode. At-most-one-dialog-per-user is enforced here, in
//! [`DialogStore::try_begin`], not by callers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::team::{TeamId, UserId};
use crate::transport::MessageId;

/// Which multi-turn flow is active, carrying exactly the data that flow has
/// accumulated so far. A tagged union instead of an opaque command tag plus
/// a free-form string list, so a turn can never see the wrong data shape for
/// its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogFlow {
    /// Waiting for the team name.
    CreateTeam,
    /// Waiting for a team choice, then for the item description.
    MoveToReview { team_id: Option<TeamId> },
}

impl DialogFlow {
    /// Stable tag used for logging and for matching a continued command.
    pub fn tag(&self) -> &'static str {
        match self {
            DialogFlow::CreateTeam => "createTeam",
            DialogFlow::MoveToReview { .. } => "moveToReview",
        }
    }
}

/// State of one user's open dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogState {
    pub user_id: UserId,
    pub flow: DialogFlow,
    /// The message that started the dialog.
    pub origin_message_id: MessageId,
    /// Messages the bot sent during the dialog, deleted on cancel/end by the
    /// caller through the transport.
    pub attached_message_ids: Vec<MessageId>,
}

impl DialogState {
    fn new(user_id: UserId, flow: DialogFlow, origin_message_id: MessageId) -> Self {
        Self {
            user_id,
            flow,
            origin_message_id,
            attached_message_ids: Vec::new(),
        }
    }
}

/// Single-slot-per-user dialog store.
///
/// Same-user operations serialize through the write lock; distinct users
/// never contend beyond the brief map access.
#[derive(Default)]
pub struct DialogStore {
    dialogs: RwLock<HashMap<UserId, DialogState>>,
}

impl DialogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a dialog for `user_id`. Returns `None` if one is already open,
    /// leaving the existing dialog unchanged; two racing begins for the
    /// same user resolve to a single dialog here.
    pub async fn try_begin(
        &self,
        user_id: UserId,
        flow: DialogFlow,
        origin_message_id: MessageId,
    ) -> Option<DialogState> {
        use std::collections::hash_map::Entry;

        let mut dialogs = self.dialogs.write().await;
        match dialogs.entry(user_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let state = DialogState::new(user_id, flow, origin_message_id);
                entry.insert(state.clone());
                Some(state)
            }
        }
    }

    /// Pure lookup, no side effects.
    pub async fn find(&self, user_id: UserId) -> Option<DialogState> {
        let dialogs = self.dialogs.read().await;
        dialogs.get(&user_id).cloned()
    }

    /// Replace the flow data of an open dialog (append-only in spirit: flows
    /// only ever gain data as the conversation advances).
    pub async fn set_flow(&self, user_id: UserId, flow: DialogFlow) -> Option<DialogState> {
        let mut dialogs = self.dialogs.write().await;
        let state = dialogs.get_mut(&user_id)?;
        state.flow = flow;
        Some(state.clone())
    }

    /// Record a message the bot sent during the dialog so it can be cleaned
    /// up when the dialog ends.
    pub async fn attach_message(
        &self,
        user_id: UserId,
        message_id: MessageId,
    ) -> Option<DialogState> {
        let mut dialogs = self.dialogs.write().await;
        let state = dialogs.get_mut(&user_id)?;
        state.attached_message_ids.push(message_id);
        Some(state.clone())
    }

    /// Close the slot, returning the final state so the caller can delete
    /// attached messages through the transport.
    pub async fn end(&self, user_id: UserId) -> Option<DialogState> {
        let mut dialogs = self.dialogs.write().await;
        dialogs.remove(&user_id)
    }
}
