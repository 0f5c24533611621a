use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::discord::api::PlatformApi;
use crate::error::{BotError, Result};
use crate::interaction::{Interaction, Mention, Participant, Reference};
use crate::types::discord::{GuildMember, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupTarget {
    Channel(String),
    Guild(String),
    Participant(String),
    Mention { argument: String, user_id: String },
}

impl fmt::Display for LookupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "channel {}", id),
            Self::Guild(id) => write!(f, "guild {}", id),
            Self::Participant(id) => write!(f, "participant {}", id),
            Self::Mention { argument, user_id } => write!(f, "mention `{}` ({})", argument, user_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LookupFailure {
    pub target: LookupTarget,
    pub error: BotError,
}

/// What happened during one resolution pass.
#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    pub attempted: usize,
    pub failures: Vec<LookupFailure>,
    /// The interaction was already resolved; nothing was looked up.
    pub skipped: bool,
}

impl ResolutionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    #[cfg(test)]
    pub fn failed(&self, target: &LookupTarget) -> bool {
        self.failures.iter().any(|f| &f.target == target)
    }

    fn record(&mut self, target: LookupTarget, error: BotError) {
        warn!("lookup of {} failed: {}", target, error.message());
        self.failures.push(LookupFailure { target, error });
    }
}

/// Fills in the live objects behind an interaction's raw ids.
pub struct EntityResolver {
    api: Arc<dyn PlatformApi>,
}

type UserAndMember = (Result<User>, Option<Result<Option<GuildMember>>>);

impl EntityResolver {
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self { api }
    }

    /// Runs every lookup concurrently and waits for all of them. A failed
    /// lookup leaves its reference unresolved and is recorded in the report,
    /// it never aborts the others.
    pub async fn resolve(&self, interaction: &mut Interaction) -> ResolutionReport {
        if interaction.is_resolved() {
            return ResolutionReport {
                skipped: true,
                ..ResolutionReport::default()
            };
        }

        let api = self.api.as_ref();
        let channel_id = unresolved(&interaction.channel);
        let guild_id = unresolved(&interaction.guild);
        let invoker_id = unresolved(&interaction.invoker);
        let member_guild = guild_id.as_deref().filter(|_| interaction.in_guild);
        let mention_targets = interaction.arguments.user_mentions();

        let channel_lookup = async {
            match channel_id.as_deref() {
                Some(id) => Some(api.get_channel(id).await),
                None => None,
            }
        };
        let guild_lookup = async {
            match guild_id.as_deref() {
                Some(id) => Some(api.get_guild(id).await),
                None => None,
            }
        };
        let participant_lookup = async {
            match invoker_id.as_deref() {
                Some(id) => Some(fetch_user_and_member(api, member_guild, id).await),
                None => None,
            }
        };
        let mention_lookups = join_all(
            mention_targets
                .iter()
                .map(|(_, user_id)| fetch_user_and_member(api, guild_id.as_deref(), user_id)),
        );

        let (channel, guild, participant, mentions) =
            tokio::join!(channel_lookup, guild_lookup, participant_lookup, mention_lookups);

        let mut report = ResolutionReport {
            attempted: channel.is_some() as usize
                + guild.is_some() as usize
                + participant.is_some() as usize
                + mentions.len(),
            ..ResolutionReport::default()
        };

        if let (Some(result), Some(id)) = (channel, channel_id) {
            match result {
                Ok(channel) => interaction.channel = Some(Reference::Resolved(channel)),
                Err(e) => report.record(LookupTarget::Channel(id), e),
            }
        }

        if let (Some(result), Some(id)) = (guild, guild_id) {
            match result {
                Ok(guild) => interaction.guild = Some(Reference::Resolved(guild)),
                Err(e) => report.record(LookupTarget::Guild(id), e),
            }
        }

        let guild_resolved = interaction.guild().is_some();

        if let (Some((user, member)), Some(id)) = (participant, invoker_id) {
            match user {
                Ok(user) => {
                    let participant =
                        participant_view(user, member, guild_resolved, LookupTarget::Participant(id), &mut report);
                    interaction.invoker = Some(Reference::Resolved(participant));
                }
                Err(e) => report.record(LookupTarget::Participant(id), e),
            }
        }

        for ((argument, user_id), (user, member)) in mention_targets.into_iter().zip(mentions) {
            let target = LookupTarget::Mention {
                argument: argument.clone(),
                user_id,
            };
            match user {
                Ok(user) => {
                    let participant = participant_view(user, member, guild_resolved, target, &mut report);
                    interaction.mentions.push(Mention {
                        argument,
                        participant,
                    });
                }
                Err(e) => report.record(target, e),
            }
        }

        interaction.resolved = true;
        debug!(
            "resolved interaction {} ({} lookups, {} failed)",
            interaction.id,
            report.attempted,
            report.failures.len()
        );
        report
    }
}

fn unresolved<T>(reference: &Option<Reference<T>>) -> Option<String> {
    reference
        .as_ref()
        .and_then(Reference::unresolved_id)
        .map(String::from)
}

/// The member view is fetched next to the user so both run in the same
/// fan-out; whether it is used depends on the guild lookup's outcome.
async fn fetch_user_and_member(
    api: &dyn PlatformApi,
    guild_id: Option<&str>,
    user_id: &str,
) -> UserAndMember {
    let member_lookup = async {
        match guild_id {
            Some(guild_id) => Some(api.get_member(guild_id, user_id).await),
            None => None,
        }
    };
    tokio::join!(api.get_user(user_id), member_lookup)
}

fn participant_view(
    user: User,
    member: Option<Result<Option<GuildMember>>>,
    guild_resolved: bool,
    target: LookupTarget,
    report: &mut ResolutionReport,
) -> Participant {
    if !guild_resolved {
        return Participant::User(user);
    }
    match member {
        Some(Ok(Some(mut member))) => {
            member.user.get_or_insert_with(|| user.clone());
            Participant::Member { user, member }
        }
        Some(Err(e)) => {
            report.record(target, e);
            Participant::User(user)
        }
        Some(Ok(None)) | None => Participant::User(user),
    }
}
