use async_trait::async_trait;

use crate::commands::{AuthorizationLevel, Command, CommandHandler};
use crate::discord::embed::EmbedBuilder;
use crate::error::{BotError, Result};
use crate::interaction::{ArgumentNode, Interaction};
use crate::types::discord::{MessageBody, OptionType, SlashCommand, SlashCommandOption};

/// `/announce message send text:<..> [title:<..>]`
pub struct Announce;

#[async_trait]
impl CommandHandler for Announce {
    async fn run(&self, interaction: &Interaction) -> Result<MessageBody> {
        let Some(("message", _)) = interaction.arguments.subcommand() else {
            return Err(BotError::new("announce").push_str("Unsupported announcement type."));
        };
        let Some(ArgumentNode::Group { children: args, .. }) =
            interaction.arguments.path(&["message", "send"])
        else {
            return Err(BotError::new("announce").push_str("Unsupported announcement action."));
        };

        let text = args
            .str("text")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BotError::new("announce").push_str("'text' must not be empty."))?;

        let mut embed = EmbedBuilder::new().description(text);
        if let Some(title) = args.str("title") {
            embed = embed.title(title);
        }
        if let Some(author) = interaction.participant() {
            embed = embed.author(format!("Announcement from {}", author.display_name()), None);
        }

        Ok(MessageBody::embed(embed.build()))
    }
}

impl Command for Announce {
    fn definition() -> SlashCommand {
        SlashCommand {
            name: "announce".to_string(),
            command_type: 1,
            description: "Post an announcement".to_string(),
            options: vec![
                SlashCommandOption::new(OptionType::SubCommandGroup, "message", "Text announcements")
                    .with_option(
                        SlashCommandOption::new(OptionType::SubCommand, "send", "Send a text announcement")
                            .with_option(
                                SlashCommandOption::new(OptionType::String, "text", "What to announce").required(),
                            )
                            .with_option(SlashCommandOption::new(OptionType::String, "title", "Optional title")),
                    ),
            ],
        }
    }

    fn required_level() -> AuthorizationLevel {
        AuthorizationLevel::ADMINISTRATOR
    }
}
