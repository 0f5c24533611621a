use std::sync::Arc;

use tracing::{debug, info};

use crate::commands::{CommandRegistry, DispatchOutcome, ResponseMode};
use crate::delivery::{DeliveryState, ResponseDelivery};
use crate::discord::api::PlatformApi;
use crate::interaction::{EntityResolver, Interaction, ResolutionReport};

/// Lifecycle of one interaction. The first three stages happen at the HTTP
/// boundary before the pipeline takes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum Stage {
    Received,
    Verified,
    Parsed,
    Resolving,
    Resolved,
    Dispatching,
    Succeeded,
    Forbidden,
    HandlerError,
    UnknownCommand,
    Delivering,
    Delivered,
    DeliveryFailed,
}

impl From<&DispatchOutcome> for Stage {
    fn from(outcome: &DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Succeeded(_) => Self::Succeeded,
            DispatchOutcome::HandlerError(_) => Self::HandlerError,
            DispatchOutcome::Forbidden { .. } => Self::Forbidden,
            DispatchOutcome::UnknownCommand(_) => Self::UnknownCommand,
        }
    }
}

impl From<DeliveryState> for Stage {
    fn from(state: DeliveryState) -> Self {
        match state {
            DeliveryState::Delivered => Self::Delivered,
            DeliveryState::DeliveryFailed => Self::DeliveryFailed,
        }
    }
}

#[derive(Debug)]
pub struct PipelineReport {
    pub stages: Vec<Stage>,
    pub resolution: ResolutionReport,
    pub outcome: DispatchOutcome,
    pub delivery: DeliveryState,
}

impl PipelineReport {
    pub fn dispatch_stage(&self) -> Stage {
        Stage::from(&self.outcome)
    }
}

/// Resolve, dispatch, deliver. Every run ends in a terminal delivery state;
/// nothing is retried.
pub struct Pipeline {
    resolver: EntityResolver,
    registry: Arc<CommandRegistry>,
    delivery: ResponseDelivery,
}

impl Pipeline {
    pub fn new(api: Arc<dyn PlatformApi>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            resolver: EntityResolver::new(api.clone()),
            registry,
            delivery: ResponseDelivery::new(api),
        }
    }

    /// Unknown commands are acknowledged as deferred so the error can be
    /// written into the original response.
    pub fn response_mode(&self, command_name: &str) -> ResponseMode {
        self.registry
            .response_mode(command_name)
            .unwrap_or(ResponseMode::Deferred)
    }

    pub async fn run(&self, mut interaction: Interaction) -> PipelineReport {
        let id = interaction.id.clone();
        let mut stages = vec![Stage::Received, Stage::Verified, Stage::Parsed];
        let mut advance = |stage: Stage| {
            debug!("interaction {} -> {}", id, stage);
            stages.push(stage);
        };

        advance(Stage::Resolving);
        let resolution = self.resolver.resolve(&mut interaction).await;
        advance(Stage::Resolved);

        advance(Stage::Dispatching);
        let outcome = self.registry.dispatch(&interaction).await;
        advance(Stage::from(&outcome));

        advance(Stage::Delivering);
        let mode = self.response_mode(&interaction.command_name);
        let delivery = self.delivery.deliver(&interaction, mode, &outcome).await;
        advance(Stage::from(delivery));

        let report = PipelineReport {
            stages,
            resolution,
            outcome,
            delivery,
        };
        if report.resolution.is_clean() {
            info!(
                "`{}` finished: {} / {}",
                interaction.command_name,
                report.dispatch_stage(),
                report.delivery
            );
        } else {
            info!(
                "`{}` finished degraded: {} / {} ({} of {} lookups failed)",
                interaction.command_name,
                report.dispatch_stage(),
                report.delivery,
                report.resolution.failures.len(),
                report.resolution.attempted
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{AuthorizationLevel, CommandHandler, LevelPolicy};
    use crate::discord::mock::{Call, MockApi};
    use crate::error::{BotError, Result};
    use crate::interaction::parse_interaction;
    use crate::types::discord::MessageBody;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        calls: AtomicUsize,
        saw_member: AtomicUsize,
    }

    #[async_trait]
    impl CommandHandler for Recorder {
        async fn run(&self, interaction: &Interaction) -> Result<MessageBody> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if interaction.participant().and_then(|p| p.member()).is_some() {
                self.saw_member.fetch_add(1, Ordering::SeqCst);
            }
            Ok(MessageBody::text("profile card"))
        }
    }

    struct Boom;

    #[async_trait]
    impl CommandHandler for Boom {
        async fn run(&self, _interaction: &Interaction) -> Result<MessageBody> {
            Err(BotError::from("boom"))
        }
    }

    fn payload(name: &str, permissions: &str) -> Interaction {
        parse_interaction(&json!({
            "id": "i1",
            "token": "tok",
            "type": 2,
            "guild_id": "g1",
            "channel_id": "c1",
            "member": { "user": { "id": "u1" }, "permissions": permissions },
            "data": { "name": name }
        }))
        .unwrap()
    }

    fn pipeline(api: MockApi, register: impl FnOnce(&mut CommandRegistry)) -> (Pipeline, Arc<MockApi>) {
        let api = Arc::new(api);
        let mut registry = CommandRegistry::new(LevelPolicy::default());
        register(&mut registry);
        (Pipeline::new(api.clone(), Arc::new(registry)), api)
    }

    fn last_edit(api: &MockApi) -> MessageBody {
        match api.calls().into_iter().last() {
            Some(Call::EditOriginal(_, body)) => body,
            other => panic!("expected an edit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn happy_path_walks_every_stage() {
        let handler = Arc::new(Recorder::default());
        let h = handler.clone();
        let (pipeline, api) = pipeline(MockApi::populated(), |r| {
            r.register("profile", AuthorizationLevel::EVERYONE, h).unwrap();
        });

        let report = pipeline.run(payload("profile", "0")).await;

        assert_eq!(
            report.stages,
            vec![
                Stage::Received,
                Stage::Verified,
                Stage::Parsed,
                Stage::Resolving,
                Stage::Resolved,
                Stage::Dispatching,
                Stage::Succeeded,
                Stage::Delivering,
                Stage::Delivered,
            ]
        );
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handler.saw_member.load(Ordering::SeqCst), 1);
        assert_eq!(last_edit(&api), MessageBody::text("profile card"));
    }

    #[tokio::test]
    async fn unknown_command_delivers_generic_error() {
        let handler = Arc::new(Recorder::default());
        let h = handler.clone();
        let (pipeline, api) = pipeline(MockApi::populated(), |r| {
            r.register("profile", AuthorizationLevel::EVERYONE, h).unwrap();
        });

        let report = pipeline.run(payload("foo", "0")).await;

        assert_eq!(report.dispatch_stage(), Stage::UnknownCommand);
        assert_eq!(report.delivery, DeliveryState::Delivered);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert!(!last_edit(&api).embeds.is_empty());
    }

    #[tokio::test]
    async fn forbidden_never_invokes_handler() {
        let handler = Arc::new(Recorder::default());
        let h = handler.clone();
        let (pipeline, api) = pipeline(MockApi::populated(), |r| {
            r.register("purge", AuthorizationLevel(100), h).unwrap();
        });

        let report = pipeline.run(payload("purge", "8192")).await;

        assert_eq!(report.dispatch_stage(), Stage::Forbidden);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert_eq!(last_edit(&api).embeds[0].title.as_deref(), Some("Forbidden"));
    }

    #[tokio::test]
    async fn handler_error_is_rendered() {
        let (pipeline, api) = pipeline(MockApi::populated(), |r| {
            r.register("profile", AuthorizationLevel::EVERYONE, Arc::new(Boom)).unwrap();
        });

        let report = pipeline.run(payload("profile", "0")).await;

        assert_eq!(report.dispatch_stage(), Stage::HandlerError);
        let body = last_edit(&api);
        assert!(body.embeds[0].description.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn lookup_failure_degrades_but_completes() {
        let handler = Arc::new(Recorder::default());
        let h = handler.clone();
        let (pipeline, _) = pipeline(MockApi::populated().fail("g1"), |r| {
            r.register("profile", AuthorizationLevel::EVERYONE, h).unwrap();
        });

        let report = pipeline.run(payload("profile", "0")).await;

        assert_eq!(report.resolution.failures.len(), 1);
        assert_eq!(report.dispatch_stage(), Stage::Succeeded);
        assert_eq!(report.delivery, DeliveryState::Delivered);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handler.saw_member.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delivery_failure_is_terminal() {
        let (pipeline, api) = pipeline(MockApi::populated().fail("tok"), |r| {
            r.register("profile", AuthorizationLevel::EVERYONE, Arc::new(Recorder::default()))
                .unwrap();
        });

        let report = pipeline.run(payload("profile", "0")).await;

        assert_eq!(report.delivery, DeliveryState::DeliveryFailed);
        assert_eq!(report.stages.last(), Some(&Stage::DeliveryFailed));
        let edits = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::EditOriginal(..)))
            .count();
        assert_eq!(edits, 1);
    }
}
