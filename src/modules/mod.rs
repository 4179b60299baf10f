//! Message handlers run by the dispatch chain.
//!
//! Every module sees every chat message and decides on its own whether it
//! applies. Modules know nothing about each other; the only shared state is
//! the reply path.

pub mod commands;
pub mod ping;
pub mod sed;
pub mod text;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::irc::message::ChatEvent;
use crate::irc::outbound::Outbound;
use crate::irc::transport::TransportError;

/// How a module interacts with the chain's short-circuit rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// First match wins: once one command module handles a message, later
    /// command modules are skipped.
    Command,
    /// Always runs, whatever earlier modules reported.
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Declined,
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("failed to send reply: {0}")]
    Send(#[from] TransportError),
    #[error("external process failed: {0}")]
    Process(#[from] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("module panicked")]
    Panicked,
}

#[async_trait]
pub trait Module: Send + Sync {
    /// Name used in the `modules` config list and in logs.
    fn name(&self) -> &'static str;

    fn kind(&self) -> ModuleKind {
        ModuleKind::Command
    }

    async fn handle(&self, event: &ChatEvent, out: &Outbound) -> Result<Outcome, ModuleError>;
}

/// Instantiate the module registered under `name`.
pub fn from_name(name: &str, config: &AppConfig) -> Option<Arc<dyn Module>> {
    let module: Arc<dyn Module> = match name {
        "sed" => Arc::new(sed::SedModule::new(config.sed.max_length)),
        "rot13" => Arc::new(text::Rot13),
        "reverse" => Arc::new(text::Reverse),
        "spaced" => Arc::new(text::Spaced),
        "ping" => Arc::new(ping::PingModule),
        _ => return None,
    };
    Some(module)
}

/// Address a command result: `"<nick>, <text>"` in channels, bare in private.
pub fn address(event: &ChatEvent, text: &str) -> String {
    if event.is_channel {
        format!("{}, {}", event.sender, text)
    } else {
        text.to_string()
    }
}
