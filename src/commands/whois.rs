use async_trait::async_trait;

use crate::commands::{Command, CommandHandler};
use crate::discord::embed::EmbedBuilder;
use crate::error::{BotError, Result};
use crate::interaction::{Interaction, Participant};
use crate::types::discord::{MessageBody, OptionType, SlashCommand, SlashCommandOption};

pub struct Whois;

#[async_trait]
impl CommandHandler for Whois {
    async fn run(&self, interaction: &Interaction) -> Result<MessageBody> {
        let target = if interaction.arguments.get("user").is_some() {
            interaction
                .mentions
                .iter()
                .find(|m| m.argument == "user")
                .map(|m| &m.participant)
                .ok_or_else(|| BotError::new("whois").push_str("That user could not be looked up."))?
        } else {
            interaction
                .participant()
                .ok_or_else(|| BotError::new("whois").push_str("Your profile could not be looked up."))?
        };

        Ok(MessageBody::embed(describe(target, interaction)))
    }
}

fn describe(participant: &Participant, interaction: &Interaction) -> crate::types::discord::Embed {
    let user = participant.user();
    let avatar = avatar_url(&user.id, user.avatar.as_deref());
    let mut embed = EmbedBuilder::new()
        .author(participant.display_name(), avatar.clone())
        .field("Id", user.id.clone(), true)
        .field("Username", user.username.clone(), true);
    if let Some(url) = avatar {
        embed = embed.thumbnail(url);
    }

    if user.bot == Some(true) {
        embed = embed.field("Bot", "yes", true);
    }

    embed = match participant.member() {
        Some(member) => {
            let guild = interaction.guild().map(|g| g.name.as_str()).unwrap_or("this server");
            let mut embed = embed
                .description(format!("Member of **{}**", guild))
                .field("Roles", member.roles.len().to_string(), true);
            if let Some(joined) = &member.joined_at {
                embed = embed.field("Joined", joined.clone(), true);
            }
            embed
        }
        None => embed.description("Not a member of this server"),
    };

    embed.build()
}

fn avatar_url(user_id: &str, avatar: Option<&str>) -> Option<String> {
    avatar.map(|hash| format!("https://cdn.discordapp.com/avatars/{}/{}.png", user_id, hash))
}

impl Command for Whois {
    fn definition() -> SlashCommand {
        SlashCommand {
            name: "whois".to_string(),
            command_type: 1,
            description: "Show what the bot knows about a user".to_string(),
            options: vec![SlashCommandOption::new(
                OptionType::User,
                "user",
                "Who to look up (defaults to you)",
            )],
        }
    }
}
