use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{BotError, Result};
use crate::interaction::{ArgumentNode, Arguments, Interaction, Reference};
use crate::types::discord::{InteractionType, OptionType};

#[derive(Debug, Deserialize)]
struct RawInteraction {
    id: Option<String>,
    token: Option<String>,
    #[serde(rename = "type")]
    kind: Option<u64>,
    application_id: Option<String>,
    guild_id: Option<String>,
    channel_id: Option<String>,
    channel: Option<RawId>,
    member: Option<RawMember>,
    user: Option<RawId>,
    data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
struct RawId {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    user: Option<RawId>,
    permissions: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawData {
    name: Option<String>,
    custom_id: Option<String>,
    /// Kept loose; the option tree has its own leniency rules.
    #[serde(default)]
    options: Value,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    kind: Option<u64>,
    value: Option<Value>,
    #[serde(default)]
    options: Value,
}

/// Builds an [`Interaction`] from a decoded payload.
///
/// Only `id` and `token` are mandatory, without them nothing can be delivered.
/// Everything else degrades to "absent". A field of the wrong JSON type is
/// rejected like a missing one.
pub fn parse_interaction(payload: &Value) -> Result<Interaction> {
    let raw = RawInteraction::deserialize(payload)
        .map_err(|e| BotError::new("invalid_interaction").push_std(e))?;

    let id = required(raw.id, "id")?;
    let token = required(raw.token, "token")?;

    let kind = raw
        .kind
        .and_then(|t| u8::try_from(t).ok())
        .map(InteractionType::from_u8)
        .unwrap_or(InteractionType::Unknown(0));

    let data = raw.data.unwrap_or_default();
    let command_name = data.name.or(data.custom_id).unwrap_or_default();
    let arguments = parse_options(&data.options);
    if arguments.is_empty() {
        debug!("parsed `{}` without arguments", command_name);
    } else {
        debug!(
            "parsed `{}` with {} arguments, {} levels deep",
            command_name,
            arguments.len(),
            arguments.depth()
        );
    }

    let in_guild = raw.member.is_some();
    let (invoker_id, invoker_permissions) = match raw.member {
        Some(member) => (
            member.user.and_then(|u| u.id),
            member.permissions.and_then(|p| p.parse::<u64>().ok()),
        ),
        None => (raw.user.and_then(|u| u.id), None),
    };

    Ok(Interaction {
        id,
        token,
        application_id: raw.application_id,
        kind,
        command_name,
        arguments,
        guild: reference(raw.guild_id),
        channel: reference(raw.channel_id.or_else(|| raw.channel.and_then(|c| c.id))),
        invoker: reference(invoker_id),
        invoker_permissions,
        in_guild,
        mentions: Vec::new(),
        resolved: false,
    })
}

fn required(value: Option<String>, key: &'static str) -> Result<String> {
    value
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BotError::new("invalid_interaction").push_str(format!("missing `{}`", key)))
}

fn reference<T>(id: Option<String>) -> Option<Reference<T>> {
    id.filter(|id| !id.is_empty()).map(Reference::Unresolved)
}

/// Anything that is not an array yields an empty mapping. Options that do not
/// have the expected shape are skipped one by one.
pub fn parse_options(options: &Value) -> Arguments {
    let Some(options) = options.as_array() else {
        return Arguments::default();
    };

    let entries = options
        .iter()
        .filter_map(|option| RawOption::deserialize(option).ok())
        .map(|option| {
            let kind = option
                .kind
                .and_then(|t| u8::try_from(t).ok())
                .map(OptionType::from_u8)
                .unwrap_or(OptionType::Unknown(0));

            let node = if kind.is_group() {
                ArgumentNode::Group {
                    kind,
                    children: parse_options(&option.options),
                }
            } else {
                ArgumentNode::Leaf {
                    kind,
                    value: option.value.unwrap_or(Value::Null),
                }
            };
            (option.name, node)
        })
        .collect();

    Arguments::new(entries)
}
