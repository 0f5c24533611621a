use std::collections::HashSet;
use std::fmt;

use crate::interaction::Interaction;

/// Ordered permission tier. A command runs iff the invoker's effective level
/// is at least the command's required level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuthorizationLevel(pub u16);

impl AuthorizationLevel {
    pub const EVERYONE: Self = Self(0);
    pub const MEMBER: Self = Self(10);
    pub const MODERATOR: Self = Self(50);
    pub const ADMINISTRATOR: Self = Self(100);
    pub const OWNER: Self = Self(1000);

    pub fn permits(self, required: AuthorizationLevel) -> bool {
        self >= required
    }
}

impl fmt::Display for AuthorizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// https://discord.com/developers/docs/topics/permissions#permissions-bitwise-permission-flags
const ADMINISTRATOR: u64 = 1 << 3;
const MANAGE_GUILD: u64 = 1 << 5;
const MANAGE_MESSAGES: u64 = 1 << 13;

/// Maps an invoker onto an [`AuthorizationLevel`].
#[derive(Debug, Clone, Default)]
pub struct LevelPolicy {
    owner_ids: HashSet<String>,
}

impl LevelPolicy {
    pub fn new(owner_ids: HashSet<String>) -> Self {
        Self { owner_ids }
    }

    pub fn effective_level(&self, interaction: &Interaction) -> AuthorizationLevel {
        let invoker_id = interaction.invoker_id();

        if invoker_id.is_some_and(|id| self.owner_ids.contains(id)) {
            return AuthorizationLevel::OWNER;
        }
        if !interaction.in_guild {
            return AuthorizationLevel::EVERYONE;
        }

        let guild_owner = interaction
            .guild()
            .is_some_and(|g| invoker_id == Some(g.owner_id.as_str()));
        let permissions = interaction.invoker_permissions.unwrap_or(0);

        if guild_owner || permissions & ADMINISTRATOR != 0 {
            AuthorizationLevel::ADMINISTRATOR
        } else if permissions & (MANAGE_GUILD | MANAGE_MESSAGES) != 0 {
            AuthorizationLevel::MODERATOR
        } else {
            AuthorizationLevel::MEMBER
        }
    }
}
