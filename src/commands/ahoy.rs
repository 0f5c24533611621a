use async_trait::async_trait;

use crate::commands::{Command, CommandHandler, ResponseMode};
use crate::error::Result;
use crate::interaction::Interaction;
use crate::types::discord::{MessageBody, SlashCommand};

pub const NOTICE: &str = "⚓ Hoisting the colours...";

pub struct Ahoy;

#[async_trait]
impl CommandHandler for Ahoy {
    async fn run(&self, interaction: &Interaction) -> Result<MessageBody> {
        let greeting = match interaction.participant() {
            Some(participant) => format!("Aye aye, {}! Raft's afloat!", participant.display_name()),
            None => "Aye aye, Captain! Raft's afloat!".to_string(),
        };
        Ok(MessageBody::text(greeting))
    }
}

impl Command for Ahoy {
    fn definition() -> SlashCommand {
        SlashCommand {
            name: "ahoy".to_string(),
            command_type: 1,
            description: "A pirate greeting".to_string(),
            options: Vec::new(),
        }
    }

    fn response_mode() -> ResponseMode {
        ResponseMode::Channel { notice: NOTICE }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{Participant, Reference, parse_interaction};
    use crate::types::discord::{GuildMember, User};
    use serde_json::json;

    #[tokio::test]
    async fn greets_by_nickname() {
        let mut interaction = parse_interaction(&json!({
            "id": "i1", "token": "tok", "member": { "user": { "id": "u1" } }, "data": { "name": "ahoy" }
        }))
        .unwrap();
        interaction.invoker = Some(Reference::Resolved(Participant::Member {
            user: User { id: "u1".into(), username: "krook".into(), ..User::default() },
            member: GuildMember { nick: Some("Captain Krook".into()), ..GuildMember::default() },
        }));

        let body = Ahoy.run(&interaction).await.unwrap();
        assert_eq!(body.content.as_deref(), Some("Aye aye, Captain Krook! Raft's afloat!"));
    }

    #[tokio::test]
    async fn unresolved_invoker_still_gets_a_greeting() {
        let interaction = parse_interaction(&json!({
            "id": "i1", "token": "tok", "user": { "id": "u1" }, "data": { "name": "ahoy" }
        }))
        .unwrap();
        let body = Ahoy.run(&interaction).await.unwrap();
        assert!(!body.is_empty());
    }
}
