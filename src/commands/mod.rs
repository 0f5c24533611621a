mod ahoy;
mod announce;
pub mod permission;
pub mod registry;
mod whois;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::interaction::Interaction;
use crate::types::discord::{MessageBody, SlashCommand};

pub use permission::{AuthorizationLevel, LevelPolicy};
pub use registry::{CommandRegistry, DispatchOutcome};

/// Output of a handler: a renderable body or the error it failed with.
#[derive(Debug, Clone)]
pub enum CommandResult {
    Body(MessageBody),
    Error(BotError),
}

impl From<Result<MessageBody>> for CommandResult {
    fn from(result: Result<MessageBody>) -> Self {
        match result {
            Ok(body) => Self::Body(body),
            Err(e) => Self::Error(e),
        }
    }
}

/// How the inbound boundary acknowledges a command before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// "Thinking..." now, the result replaces the original response later.
    Deferred,
    /// Reply with `notice` now, the result is posted to the channel later.
    Channel { notice: &'static str },
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Receives a fully resolved interaction. Raw guild and channel ids are
    /// no longer available once their lookups succeeded.
    async fn run(&self, interaction: &Interaction) -> Result<MessageBody>;
}

/// A handler that also knows how to describe and gate itself.
pub trait Command: CommandHandler + Sized + 'static {
    /// Get command definition for registration
    fn definition() -> SlashCommand;

    fn required_level() -> AuthorizationLevel {
        AuthorizationLevel::EVERYONE
    }

    fn response_mode() -> ResponseMode {
        ResponseMode::Deferred
    }
}

/// Registry with every bundled command.
pub fn all_commands(config: &Config) -> Result<CommandRegistry> {
    let mut registry = CommandRegistry::new(LevelPolicy::new(config.owner_ids.clone()));
    registry.register_command(ahoy::Ahoy)?;
    registry.register_command(whois::Whois)?;
    registry.register_command(announce::Announce)?;
    Ok(registry)
}
