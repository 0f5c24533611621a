use chrono::Utc;

use crate::types::discord::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedImage};

pub const DEFAULT_COLOR: u32 = 0x5865f2;
pub const ERROR_COLOR: u32 = 0xf04747;
pub const FOOTER_TEXT: &str = "interaction-bot";

/// Embed pre-filled with the bot's colour, footer and a timestamp.
pub struct EmbedBuilder {
    embed: Embed,
}

impl Default for EmbedBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbedBuilder {
    pub fn new() -> Self {
        Self {
            embed: Embed {
                color: Some(DEFAULT_COLOR),
                timestamp: Some(Utc::now().to_rfc3339()),
                footer: Some(EmbedFooter {
                    text: FOOTER_TEXT.to_string(),
                }),
                ..Embed::default()
            },
        }
    }

    pub fn color(mut self, color: u32) -> Self {
        self.embed.color = Some(color);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.embed.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.embed.description = Some(description.into());
        self
    }

    pub fn author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.embed.author = Some(EmbedAuthor {
            name: name.into(),
            url: None,
            icon_url,
        });
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.embed.thumbnail = Some(EmbedImage { url: url.into() });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.embed.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn build(self) -> Embed {
        self.embed
    }
}
