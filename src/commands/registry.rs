use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::commands::permission::{AuthorizationLevel, LevelPolicy};
use crate::commands::{Command, CommandHandler, CommandResult, ResponseMode};
use crate::error::{BotError, Result};
use crate::interaction::Interaction;
use crate::types::discord::{MessageBody, SlashCommand};

struct Entry {
    required: AuthorizationLevel,
    mode: ResponseMode,
    handler: Arc<dyn CommandHandler>,
    definition: Option<SlashCommand>,
}

/// Terminal result of dispatching one interaction.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Succeeded(MessageBody),
    HandlerError(BotError),
    Forbidden {
        required: AuthorizationLevel,
        effective: AuthorizationLevel,
    },
    UnknownCommand(String),
}

impl From<CommandResult> for DispatchOutcome {
    fn from(result: CommandResult) -> Self {
        match result {
            CommandResult::Body(body) => Self::Succeeded(body),
            CommandResult::Error(e) => Self::HandlerError(e),
        }
    }
}

/// Command name to handler mapping. Built once at startup, read-only after.
pub struct CommandRegistry {
    entries: HashMap<String, Entry>,
    policy: LevelPolicy,
}

impl CommandRegistry {
    pub fn new(policy: LevelPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
        }
    }

    /// Duplicate names are a configuration error.
    pub fn register(
        &mut self,
        name: &str,
        required: AuthorizationLevel,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<()> {
        self.insert(name, required, ResponseMode::Deferred, handler, None)
    }

    pub fn register_command<C: Command>(&mut self, command: C) -> Result<()> {
        let definition = C::definition();
        let name = definition.name.clone();
        self.insert(
            &name,
            C::required_level(),
            C::response_mode(),
            Arc::new(command),
            Some(definition),
        )
    }

    fn insert(
        &mut self,
        name: &str,
        required: AuthorizationLevel,
        mode: ResponseMode,
        handler: Arc<dyn CommandHandler>,
        definition: Option<SlashCommand>,
    ) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(BotError::new("duplicate_command")
                .push_str(format!("command `{}` is already registered", name)));
        }
        self.entries.insert(
            name.to_string(),
            Entry {
                required,
                mode,
                handler,
                definition,
            },
        );
        Ok(())
    }

    pub fn response_mode(&self, name: &str) -> Option<ResponseMode> {
        self.entries.get(name).map(|e| e.mode)
    }

    pub fn required_level(&self, name: &str) -> Option<AuthorizationLevel> {
        self.entries.get(name).map(|e| e.required)
    }

    /// Definitions for bulk registration with the platform.
    pub fn definitions(&self) -> Vec<SlashCommand> {
        self.entries
            .values()
            .filter_map(|e| e.definition.clone())
            .collect()
    }

    pub async fn dispatch(&self, interaction: &Interaction) -> DispatchOutcome {
        let name = interaction.command_name.as_str();
        let Some(entry) = self.entries.get(name) else {
            warn!("no handler registered for `{}`", name);
            return DispatchOutcome::UnknownCommand(name.to_string());
        };

        let effective = self.policy.effective_level(interaction);
        if !effective.permits(entry.required) {
            debug!(
                "`{}` needs level {}, invoker {:?} has {}",
                name,
                entry.required,
                interaction.invoker_id(),
                effective
            );
            return DispatchOutcome::Forbidden {
                required: entry.required,
                effective,
            };
        }

        let result = match AssertUnwindSafe(entry.handler.run(interaction))
            .catch_unwind()
            .await
        {
            Ok(result) => CommandResult::from(result),
            Err(_) => CommandResult::Error(
                BotError::new("handler_panic").push_str("the command panicked"),
            ),
        };

        if let CommandResult::Error(e) = &result {
            warn!("`{}` failed: {}", name, e.message());
        }
        result.into()
    }
}
