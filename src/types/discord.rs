use serde::{Deserialize, Serialize};
use serde_json::Value;

/// https://discord.com/developers/docs/interactions/receiving-and-responding#interaction-object-interaction-type
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    MessageComponent,
    ApplicationCommandAutocomplete,
    ModalSubmit,
    Unknown(u8),
}

impl InteractionType {
    pub fn from_u8(kind: u8) -> Self {
        match kind {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::ApplicationCommandAutocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }
}

/// https://discord.com/developers/docs/interactions/application-commands#application-command-object-application-command-option-type
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum OptionType {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
    Unknown(u8),
}

impl OptionType {
    pub fn from_u8(kind: u8) -> Self {
        match kind {
            1 => Self::SubCommand,
            2 => Self::SubCommandGroup,
            3 => Self::String,
            4 => Self::Integer,
            5 => Self::Boolean,
            6 => Self::User,
            7 => Self::Channel,
            8 => Self::Role,
            9 => Self::Mentionable,
            10 => Self::Number,
            11 => Self::Attachment,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::SubCommand => 1,
            Self::SubCommandGroup => 2,
            Self::String => 3,
            Self::Integer => 4,
            Self::Boolean => 5,
            Self::User => 6,
            Self::Channel => 7,
            Self::Role => 8,
            Self::Mentionable => 9,
            Self::Number => 10,
            Self::Attachment => 11,
            Self::Unknown(other) => other,
        }
    }

    /// Sub-commands and groups carry child options instead of a value.
    pub fn is_group(self) -> bool {
        matches!(self, Self::SubCommand | Self::SubCommandGroup)
    }
}

impl Serialize for OptionType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

/// https://discord.com/developers/docs/interactions/receiving-and-responding#interaction-response-object-interaction-callback-type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackType {
    Pong = 1,
    ChannelMessageWithSource = 4,
    DeferredChannelMessageWithSource = 5,
    DeferredUpdateMessage = 6,
    AutocompleteResult = 8,
}

/// https://discord.com/developers/docs/resources/user#user-object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<bool>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

/// https://discord.com/developers/docs/resources/guild#guild-member-object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GuildMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
    /// Only present on members delivered inside an interaction payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
}

/// https://discord.com/developers/docs/resources/channel#channel-object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
}

/// https://discord.com/developers/docs/resources/guild#guild-object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Guild {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_id: String,
}

/// https://discord.com/developers/docs/resources/message#embed-object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().is_none_or(str::is_empty)
            && self.description.as_deref().is_none_or(str::is_empty)
            && self.author.is_none()
            && self.thumbnail.is_none()
            && self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Body shared by channel messages, followups and original-response edits.
///
/// https://discord.com/developers/docs/interactions/receiving-and-responding#edit-original-interaction-response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl MessageBody {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embeds: Vec::new(),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embeds: vec![embed],
        }
    }

    /// The platform rejects messages that would render as nothing.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().is_none_or(|c| c.trim().is_empty())
            && self.embeds.iter().all(Embed::is_empty)
    }
}

// Interaction response to Discord
#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub response_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl InteractionResponse {
    pub fn new(kind: CallbackType) -> Self {
        Self {
            response_type: kind as u8,
            data: None,
        }
    }

    pub fn with_data(kind: CallbackType, data: Value) -> Self {
        Self {
            response_type: kind as u8,
            data: Some(data),
        }
    }
}

// Discord API error response
#[derive(Debug, Deserialize)]
pub struct DiscordErrorResponse {
    pub message: String,
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub retry_after: Option<f64>,
    #[serde(default)]
    pub global: Option<bool>,
    #[serde(default)]
    pub errors: Option<Value>,
}

impl DiscordErrorResponse {
    pub const UNKNOWN_MEMBER: i32 = 10007;
}

impl std::fmt::Display for DiscordErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.unwrap_or(0), self.message)?;

        if let Some(retry) = self.retry_after {
            write!(f, " (retry after {:.3}s)", retry)?;
        }

        if self.global == Some(true) {
            write!(f, " [GLOBAL]")?;
        }

        if let Some(errors) = &self.errors {
            write!(f, "\nDetails: {}", serde_json::to_string_pretty(errors).unwrap_or_default())?;
        }

        Ok(())
    }
}

/// https://discord.com/developers/docs/interactions/application-commands#application-command-object
#[derive(Debug, Clone, Serialize)]
pub struct SlashCommand {
    pub name: String,
    #[serde(rename = "type")]
    pub command_type: u8,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SlashCommandOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlashCommandOption {
    #[serde(rename = "type")]
    pub kind: OptionType,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SlashCommandOption>,
}

impl SlashCommandOption {
    pub fn new(kind: OptionType, name: &str, description: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            description: description.to_string(),
            required: false,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_option(mut self, option: SlashCommandOption) -> Self {
        self.options.push(option);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_detection() {
        assert!(MessageBody::default().is_empty());
        assert!(MessageBody::text("   ").is_empty());
        assert!(MessageBody::embed(Embed::default()).is_empty());
        assert!(!MessageBody::text("hi").is_empty());

        let colored_only = Embed {
            color: Some(0xf04747),
            ..Embed::default()
        };
        assert!(MessageBody::embed(colored_only).is_empty());
    }

    #[test]
    fn body_serializes_without_empty_fields() {
        let json = serde_json::to_value(MessageBody::text("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "content": "hi" }));
    }

    #[test]
    fn option_type_tags_are_stable() {
        for tag in 1..=11u8 {
            assert_eq!(OptionType::from_u8(tag).as_u8(), tag);
        }
        assert_eq!(OptionType::from_u8(42), OptionType::Unknown(42));
        assert!(OptionType::SubCommandGroup.is_group());
        assert!(!OptionType::User.is_group());
    }

    #[test]
    fn slash_command_definition_shape() {
        let def = SlashCommand {
            name: "announce".into(),
            command_type: 1,
            description: "d".into(),
            options: vec![SlashCommandOption::new(OptionType::SubCommandGroup, "message", "g")
                .with_option(SlashCommandOption::new(OptionType::SubCommand, "send", "s"))],
        };
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["options"][0]["type"], 2);
        assert_eq!(json["options"][0]["options"][0]["type"], 1);
        assert!(json["options"][0].get("required").is_none());
    }
}
