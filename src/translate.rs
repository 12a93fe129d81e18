//! Translation provider boundary.
//!
//! All user-facing text is looked up by [`MessageKey`] in the recipient's
//! language. The provider is a pure lookup with no side effects on the core;
//! localization content itself lives outside this crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language preference of a player, e.g. "en" or "ru".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageId(pub String);

impl LanguageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for LanguageId {
    fn default() -> Self {
        Self("en".to_string())
    }
}

/// Every message the core can emit. Format arguments are positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKey {
    /// Generic help prompt, also the reply to unrecognized private commands.
    Help,
    /// Prompt for the team name during the CreateTeam dialog.
    EnterTeamName,
    /// Team created; args: team name, invite deep link.
    TeamCreated,
    /// Prompt to pick a team during the MoveToReview dialog.
    ChooseTeam,
    /// Prompt for the work item description.
    EnterDescription,
    /// Confirmation after joining a team; args: team name.
    JoinedTeam,
    /// The referenced team does not exist.
    TeamNotFound,
    /// The sender is not a member of the chosen team.
    NotATeamMember,
    /// Team has fewer members than the configured minimum; args: minimum.
    NotEnoughMembers,
    /// The sender's chat has no teams to review in.
    NoTeamsInChat,
    /// An open dialog was cancelled.
    DialogCancelled,
    /// `/cancel` with no open dialog.
    NothingToCancel,
    /// Generic failure reported back to the chat.
    OperationFailed,
    /// Status message: waiting for the reviewer to start; args: description, owner, reviewer.
    StatusWaiting,
    /// Status message: review in progress; args: description, owner, reviewer.
    StatusInProgress,
    /// Status message: declined, waiting for corrections; args: description, owner, reviewer.
    StatusOnCorrection,
    /// Status message: accepted; args: description, owner, reviewer.
    StatusAccepted,
    /// Owner notification: the item was accepted; args: description.
    OwnerAccepted,
    /// Owner notification: the item was declined, revise and resubmit; args: description.
    OwnerDeclined,
    /// Reminder to the reviewer; args: description, owner.
    ReviewerReminder,
    /// Reminder to the owner of an item on correction; args: description, reviewer.
    OwnerReminder,
    /// Button label: take the item into review.
    ButtonMoveToInProgress,
    /// Button label: accept the item.
    ButtonAccept,
    /// Button label: decline the item.
    ButtonDecline,
    /// Button label: send the item to the next round.
    ButtonMoveToNextRound,
}

/// Pure message lookup. Implementations format `args` into the localized
/// template for `key`.
pub trait Translator: Send + Sync {
    fn get(&self, key: MessageKey, language: &LanguageId, args: &[&str]) -> String;
}
