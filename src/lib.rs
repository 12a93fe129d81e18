//! Chat-bot-driven peer review workflow.
//!
//! Teams form inside group chats, members hand finished work to each other
//! for review through short guided dialogs, and a background scheduler nags
//! whoever the next action is waiting on. The review lifecycle itself is a
//! pure state machine ([`lifecycle::transition`]); everything imperative
//! (message sends, storage writes) happens in the interpreter and router
//! around it.

pub mod calendar;
pub mod command;
pub mod config;
pub mod dialog;
pub mod lifecycle;
pub mod notifier;
pub mod repository;
pub mod router;
pub mod team;
pub mod translate;
pub mod transport;

use std::sync::Arc;

use crate::calendar::WorkdayOracle;
use crate::config::Config;
use crate::dialog::DialogStore;
use crate::repository::{TaskRepository, TeamRepository};
use crate::translate::Translator;
use crate::transport::MessageSender;

/// Shared state for the router and the notifier. Cheap to clone.
#[derive(Clone)]
pub struct BotContext {
    pub config: Arc<Config>,
    pub transport: Arc<dyn MessageSender>,
    pub translator: Arc<dyn Translator>,
    pub tasks: Arc<dyn TaskRepository>,
    pub teams: Arc<dyn TeamRepository>,
    pub dialogs: Arc<DialogStore>,
    pub calendar: Arc<dyn WorkdayOracle>,
}

impl BotContext {
    pub fn new(
        config: Config,
        transport: Arc<dyn MessageSender>,
        translator: Arc<dyn Translator>,
        tasks: Arc<dyn TaskRepository>,
        teams: Arc<dyn TeamRepository>,
        calendar: Arc<dyn WorkdayOracle>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            translator,
            tasks,
            teams,
            dialogs: Arc::new(DialogStore::new()),
            calendar,
        }
    }
}
