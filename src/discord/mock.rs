//! In-memory platform used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::discord::api::PlatformApi;
use crate::error::{BotError, Result};
use crate::types::discord::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Channel(String),
    Guild(String),
    User(String),
    Member(String, String),
    Message(String, MessageBody),
    Followup(String, MessageBody),
    EditOriginal(String, MessageBody),
}

#[derive(Default)]
pub struct MockApi {
    pub channels: HashMap<String, Channel>,
    pub guilds: HashMap<String, Guild>,
    pub users: HashMap<String, User>,
    /// `(guild_id, user_id)` pairs that are guild members.
    pub members: HashSet<(String, String)>,
    /// Ids (of any kind) whose lookup or delivery fails.
    pub failing: HashSet<String>,
    pub calls: Mutex<Vec<Call>>,
}

impl MockApi {
    /// Guild `g1` (owned by `owner`) with channel `c1`, users `u1`..`u3`;
    /// `u1` and `u2` are members of `g1`.
    pub fn populated() -> Self {
        let mut api = Self::default();
        api.channels.insert(
            "c1".into(),
            Channel {
                id: "c1".into(),
                name: Some("general".into()),
                guild_id: Some("g1".into()),
                ..Channel::default()
            },
        );
        api.guilds.insert(
            "g1".into(),
            Guild {
                id: "g1".into(),
                name: "Krook".into(),
                owner_id: "owner".into(),
            },
        );
        for id in ["u1", "u2", "u3", "owner"] {
            api.users.insert(
                id.into(),
                User {
                    id: id.into(),
                    username: format!("user-{}", id),
                    ..User::default()
                },
            );
        }
        api.members.insert(("g1".into(), "u1".into()));
        api.members.insert(("g1".into(), "u2".into()));
        api
    }

    pub fn fail(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, id: &str) -> Result<()> {
        if self.failing.contains(id) {
            return Err(BotError::new("http_error").push_str(format!("scripted failure for {}", id)));
        }
        Ok(())
    }

    fn missing(what: &str, id: &str) -> BotError {
        BotError::new("discord_api_error").push_str(format!("unknown {} {}", what, id))
    }
}

#[async_trait]
impl PlatformApi for MockApi {
    async fn get_channel(&self, channel_id: &str) -> Result<Channel> {
        self.record(Call::Channel(channel_id.into()));
        self.check(channel_id)?;
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| Self::missing("channel", channel_id))
    }

    async fn get_guild(&self, guild_id: &str) -> Result<Guild> {
        self.record(Call::Guild(guild_id.into()));
        self.check(guild_id)?;
        self.guilds
            .get(guild_id)
            .cloned()
            .ok_or_else(|| Self::missing("guild", guild_id))
    }

    async fn get_user(&self, user_id: &str) -> Result<User> {
        self.record(Call::User(user_id.into()));
        self.check(user_id)?;
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| Self::missing("user", user_id))
    }

    async fn get_member(&self, guild_id: &str, user_id: &str) -> Result<Option<GuildMember>> {
        self.record(Call::Member(guild_id.into(), user_id.into()));
        self.check(guild_id)?;
        if !self.members.contains(&(guild_id.to_string(), user_id.to_string())) {
            return Ok(None);
        }
        Ok(Some(GuildMember {
            user: self.users.get(user_id).cloned(),
            nick: Some(format!("nick-{}", user_id)),
            roles: vec!["r1".into()],
            ..GuildMember::default()
        }))
    }

    async fn create_message(&self, channel_id: &str, body: &MessageBody) -> Result<()> {
        self.record(Call::Message(channel_id.into(), body.clone()));
        self.check(channel_id)
    }

    async fn create_followup(&self, interaction_token: &str, body: &MessageBody) -> Result<()> {
        self.record(Call::Followup(interaction_token.into(), body.clone()));
        self.check(interaction_token)
    }

    async fn edit_original(&self, interaction_token: &str, body: &MessageBody) -> Result<()> {
        self.record(Call::EditOriginal(interaction_token.into(), body.clone()));
        self.check(interaction_token)
    }
}
