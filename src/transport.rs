//! Boundary to the external chat transport.
//!
//! The core never talks to a concrete bot platform. Everything outbound goes
//! through [`MessageSender`], so the transport (and its rate limits, message
//! formatting, retries) stays outside the crate. All operations are fallible
//! and asynchronous.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for a chat identifier. For a private chat this equals the user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Newtype for a transport-level message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A single inline action button. The `callback` text comes back to the
/// router verbatim when the button is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub callback: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback: callback.into(),
        }
    }
}

/// Action buttons attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplyMarkup {
    pub buttons: Vec<Button>,
}

impl ReplyMarkup {
    pub fn new(buttons: Vec<Button>) -> Self {
        Self { buttons }
    }
}

/// Error from the chat transport.
///
/// The router swallows these (logged, never propagated); the scheduler treats
/// them as a skipped send that the next due cycle retries.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("message delivery failed: {0}")]
    Delivery(String),
    #[error("rate limited by the chat platform")]
    RateLimited,
    #[error("chat {0} is not reachable")]
    ChatUnreachable(ChatId),
}

/// Outbound message operations the core needs from the chat platform.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message, optionally with action buttons.
    /// Returns the id of the created message.
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageId, TransportError>;

    /// Edit an existing message in place.
    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), TransportError>;

    /// Delete a message.
    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError>;

    /// Pin a message in a chat.
    async fn pin_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError>;
}
