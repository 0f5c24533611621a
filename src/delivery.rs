//! Second half of the reply protocol: the acknowledgement already went out
//! with the HTTP response, this sends the real content exactly once.

use std::sync::Arc;

use tracing::{error, info};

use crate::commands::{DispatchOutcome, ResponseMode};
use crate::discord::api::PlatformApi;
use crate::discord::embed::{ERROR_COLOR, EmbedBuilder};
use crate::interaction::Interaction;
use crate::types::discord::MessageBody;

/// Sent instead of an empty body, which the platform refuses.
pub const PLACEHOLDER_CONTENT: &str = "✅ Done.";
pub const ERROR_AUTHOR: &str = "Something unexpected happened.";
pub const CONTACT_NOTICE: &str = "If this keeps happening, please contact a developer.";

/// Embed descriptions are capped at 4096 characters by the platform.
const MAX_ERROR_MESSAGE_CHARS: usize = 3500;
const MAX_COMMAND_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryPath {
    /// Plain message in the resolved channel.
    Direct { channel_id: String },
    /// `PATCH .../messages/@original`, replacing the deferred placeholder.
    EditOriginal,
    /// `POST /webhooks/{application_id}/{token}`
    Followup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum DeliveryState {
    Delivered,
    DeliveryFailed,
}

/// Deferred acknowledgements must be completed through the webhook; a
/// channel-mode acknowledgement allows a direct send when the channel
/// resolved.
pub fn choose_path(interaction: &Interaction, mode: ResponseMode) -> DeliveryPath {
    match (mode, interaction.channel()) {
        (ResponseMode::Deferred, _) => DeliveryPath::EditOriginal,
        (ResponseMode::Channel { .. }, Some(channel)) => DeliveryPath::Direct {
            channel_id: channel.id.clone(),
        },
        (ResponseMode::Channel { .. }, None) => DeliveryPath::Followup,
    }
}

pub fn error_body(command_name: &str, message: &str) -> MessageBody {
    let command_name = truncate_chars(&command_name.replace('`', "'"), MAX_COMMAND_NAME_CHARS);
    let message = truncate_chars(&escape_fences(message), MAX_ERROR_MESSAGE_CHARS);
    let embed = EmbedBuilder::new()
        .color(ERROR_COLOR)
        .author(ERROR_AUTHOR, None)
        .description(format!(
            "While trying to process the `{}` command, an error occurred:\n```\n{}\n```",
            command_name, message
        ))
        .field("\u{200b}", CONTACT_NOTICE, false)
        .build();
    MessageBody::embed(embed)
}

/// A zero-width space after every backtick keeps the text from closing the
/// surrounding code block.
fn escape_fences(text: &str) -> String {
    text.replace('`', "`\u{200b}")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn forbidden_body(command_name: &str, required_level: u16) -> MessageBody {
    let embed = EmbedBuilder::new()
        .color(ERROR_COLOR)
        .title("Forbidden")
        .description(format!(
            "You are not allowed to use `/{}` (requires level {}).",
            command_name, required_level
        ))
        .build();
    MessageBody::embed(embed)
}

/// Turns any dispatch outcome into something the platform will accept.
pub fn render(outcome: &DispatchOutcome, command_name: &str) -> MessageBody {
    match outcome {
        DispatchOutcome::Succeeded(body) if body.is_empty() => MessageBody::text(PLACEHOLDER_CONTENT),
        DispatchOutcome::Succeeded(body) => body.clone(),
        DispatchOutcome::HandlerError(e) => error_body(command_name, &e.message()),
        DispatchOutcome::UnknownCommand(_) => {
            error_body(command_name, "This command is not available right now.")
        }
        DispatchOutcome::Forbidden { required, .. } => forbidden_body(command_name, required.0),
    }
}

pub struct ResponseDelivery {
    api: Arc<dyn PlatformApi>,
}

impl ResponseDelivery {
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self { api }
    }

    /// One attempt, no retries: the interaction token expires anyway. Failures
    /// are logged and reported, never propagated.
    pub async fn deliver(
        &self,
        interaction: &Interaction,
        mode: ResponseMode,
        outcome: &DispatchOutcome,
    ) -> DeliveryState {
        let body = render(outcome, &interaction.command_name);
        let path = choose_path(interaction, mode);

        let result = match &path {
            DeliveryPath::Direct { channel_id } => self.api.create_message(channel_id, &body).await,
            DeliveryPath::EditOriginal => self.api.edit_original(&interaction.token, &body).await,
            DeliveryPath::Followup => self.api.create_followup(&interaction.token, &body).await,
        };

        match result {
            Ok(()) => {
                info!("delivered `{}` via {:?}", interaction.command_name, path);
                DeliveryState::Delivered
            }
            Err(e) => {
                error!("delivery of `{}` via {:?} failed", interaction.command_name, path);
                e.log_tree();
                DeliveryState::DeliveryFailed
            }
        }
    }
}
