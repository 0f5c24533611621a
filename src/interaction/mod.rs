//! Normalized, in-memory view of one inbound interaction.

pub mod parse;
pub mod resolve;

use serde_json::Value;

use crate::types::discord::{Channel, Guild, GuildMember, InteractionType, OptionType, User};

pub use parse::parse_interaction;
pub use resolve::{EntityResolver, LookupTarget, ResolutionReport};

/// A platform object that is either still a raw id or has been fetched.
///
/// Once a reference is `Resolved` the raw id is gone; read it through the
/// entity instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference<T> {
    Unresolved(String),
    Resolved(T),
}

impl<T> Reference<T> {
    pub fn unresolved_id(&self) -> Option<&str> {
        match self {
            Self::Unresolved(id) => Some(id),
            Self::Resolved(_) => None,
        }
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Self::Unresolved(_) => None,
            Self::Resolved(entity) => Some(entity),
        }
    }
}

/// Who invoked the interaction, or who was mentioned in it.
#[derive(Debug, Clone, PartialEq)]
pub enum Participant {
    Member { user: User, member: GuildMember },
    User(User),
}

impl Participant {
    pub fn user(&self) -> &User {
        match self {
            Self::Member { user, .. } => user,
            Self::User(user) => user,
        }
    }

    pub fn member(&self) -> Option<&GuildMember> {
        match self {
            Self::Member { member, .. } => Some(member),
            Self::User(_) => None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.member()
            .and_then(|m| m.nick.as_deref())
            .unwrap_or_else(|| self.user().display_name())
    }
}

/// A resolved user-mention argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    pub argument: String,
    pub participant: Participant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentNode {
    Leaf { kind: OptionType, value: Value },
    Group { kind: OptionType, children: Arguments },
}

/// Argument tree in the order the platform sent it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments(Vec<(String, ArgumentNode)>);

impl Arguments {
    pub fn new(entries: Vec<(String, ArgumentNode)>) -> Self {
        Self(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgumentNode)> {
        self.0.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn get(&self, name: &str) -> Option<&ArgumentNode> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, node)| node)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            ArgumentNode::Leaf { value, .. } => Some(value),
            ArgumentNode::Group { .. } => None,
        }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name)?.as_str()
    }

    /// The invoked sub-command (or group) and its own arguments.
    pub fn subcommand(&self) -> Option<(&str, &Arguments)> {
        self.iter().find_map(|(name, node)| match node {
            ArgumentNode::Group { children, .. } => Some((name, children)),
            ArgumentNode::Leaf { .. } => None,
        })
    }

    /// Walk down through groups by name.
    pub fn path(&self, names: &[&str]) -> Option<&ArgumentNode> {
        let (first, rest) = names.split_first()?;
        let node = self.get(first)?;
        if rest.is_empty() {
            return Some(node);
        }
        match node {
            ArgumentNode::Group { children, .. } => children.path(rest),
            ArgumentNode::Leaf { .. } => None,
        }
    }

    pub fn depth(&self) -> usize {
        self.0
            .iter()
            .map(|(_, node)| match node {
                ArgumentNode::Leaf { .. } => 1,
                ArgumentNode::Group { children, .. } => 1 + children.depth(),
            })
            .max()
            .unwrap_or(0)
    }

    /// `(argument name, user id)` of every user-typed leaf, depth first.
    pub fn user_mentions(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.collect_user_mentions(&mut out);
        out
    }

    fn collect_user_mentions(&self, out: &mut Vec<(String, String)>) {
        for (name, node) in &self.0 {
            match node {
                ArgumentNode::Leaf {
                    kind: OptionType::User,
                    value,
                } => {
                    if let Some(id) = value.as_str() {
                        out.push((name.clone(), id.to_string()));
                    }
                }
                ArgumentNode::Leaf { .. } => {}
                ArgumentNode::Group { children, .. } => children.collect_user_mentions(out),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub id: String,
    /// Short-lived webhook credential for the followup call.
    pub token: String,
    pub application_id: Option<String>,
    pub kind: InteractionType,
    /// Command name, or `custom_id` for components and modals.
    pub command_name: String,
    pub arguments: Arguments,
    pub guild: Option<Reference<Guild>>,
    pub channel: Option<Reference<Channel>>,
    pub invoker: Option<Reference<Participant>>,
    /// Permission bitfield the platform computed for the invoking member.
    pub invoker_permissions: Option<u64>,
    /// The payload carried a guild member rather than a bare user.
    pub in_guild: bool,
    pub mentions: Vec<Mention>,
    pub(crate) resolved: bool,
}

impl Interaction {
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn invoker_id(&self) -> Option<&str> {
        match self.invoker.as_ref()? {
            Reference::Unresolved(id) => Some(id),
            Reference::Resolved(participant) => Some(&participant.user().id),
        }
    }

    pub fn guild(&self) -> Option<&Guild> {
        self.guild.as_ref()?.resolved()
    }

    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()?.resolved()
    }

    pub fn participant(&self) -> Option<&Participant> {
        self.invoker.as_ref()?.resolved()
    }
}
