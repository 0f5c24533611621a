use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;

use url::Url;

use crate::error::{BotError, Result};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_USER_AGENT: &str =
    concat!("DiscordBot (interaction-bot, ", env!("CARGO_PKG_VERSION"), ")");

#[derive(Debug, Clone)]
pub struct Config {
    pub application_id: String,
    pub bot_token: String,
    /// Hex encoded Ed25519 key from the developer portal.
    pub public_key: String,
    pub verify_signatures: bool,
    pub bind_addr: SocketAddr,
    pub api_base: Url,
    pub user_agent: String,
    pub owner_ids: HashSet<String>,
    pub register_commands: bool,
    pub rate_limit: f64,
}

/// Compile-time value first, runtime environment second.
macro_rules! baked_or_env {
    ($name:literal) => {
        option_env!($name)
            .map(String::from)
            .or_else(|| env::var($name).ok())
    };
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let baked = |key: &str| -> Option<String> {
            match key {
                "DISCORD_APPLICATION_ID" => baked_or_env!("DISCORD_APPLICATION_ID"),
                "DISCORD_BOT_TOKEN" => baked_or_env!("DISCORD_BOT_TOKEN"),
                "DISCORD_PUBLIC_KEY" => baked_or_env!("DISCORD_PUBLIC_KEY"),
                other => env::var(other).ok(),
            }
        };
        Self::from_lookup(baked)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| {
            get(key).ok_or_else(|| BotError::new("missing_config").push_str(format!("{} is not set", key)))
        };
        let flag = |key: &str| {
            get(key)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false)
        };

        let production = get("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));
        let verify_signatures = production && !flag("DISABLE_SIGNATURE_VERIFICATION");

        let public_key = if verify_signatures {
            required("DISCORD_PUBLIC_KEY")?
        } else {
            get("DISCORD_PUBLIC_KEY").unwrap_or_default()
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| BotError::new("invalid_config").push_str(format!("BIND_ADDR: {}", e)))?;

        let api_base = Url::parse(&get("DISCORD_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()))?;

        let rate_limit = match get("API_RATE_LIMIT") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| {
                    BotError::new("invalid_config").push_str(format!("API_RATE_LIMIT: {}", raw))
                })?,
            None => 40.0,
        };

        let owner_ids = get("BOT_OWNER_IDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            application_id: required("DISCORD_APPLICATION_ID")?,
            bot_token: required("DISCORD_BOT_TOKEN")?,
            public_key,
            verify_signatures,
            bind_addr,
            api_base,
            user_agent: get("BOT_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            owner_ids,
            register_commands: flag("REGISTER_COMMANDS"),
            rate_limit,
        })
    }
}
