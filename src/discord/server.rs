//! Inbound interaction webhook.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{Instrument, debug, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::commands::ResponseMode;
use crate::discord::verify::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::error::Result;
use crate::interaction::{Interaction, parse_interaction};
use crate::state::AppState;
use crate::types::discord::{CallbackType, InteractionResponse, InteractionType};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/interactions", post(handle_interaction))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// How long acknowledged interactions may keep running after shutdown starts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[instrument(skip(state))]
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    serve_until(listener, state, shutdown_signal(), SHUTDOWN_GRACE).await
}

/// Serves until `shutdown` resolves, then lets in-flight pipelines reach a
/// delivery state before returning.
pub async fn serve_until(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
    grace: Duration,
) -> Result<()> {
    info!("listening for interactions on {}", listener.local_addr()?);
    let in_flight = state.in_flight.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    let abandoned = in_flight.drain(grace).await;
    info!("server stopped ({} interactions abandoned)", abandoned);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Verifies, acknowledges, and hands everything else to a background task.
/// The platform expects the acknowledgement within three seconds, so nothing
/// here waits on the pipeline.
pub async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let timestamp = header(&headers, TIMESTAMP_HEADER);
    let signature = header(&headers, SIGNATURE_HEADER);
    if !state.verifier.verify(timestamp, &body, signature) {
        warn!("rejected request with an invalid signature");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!("undecodable interaction body: {}", e);
            return (StatusCode::BAD_REQUEST, "invalid JSON body").into_response();
        }
    };

    let kind = payload["type"]
        .as_u64()
        .and_then(|t| u8::try_from(t).ok())
        .map(InteractionType::from_u8);
    match kind {
        Some(InteractionType::Ping) => {
            return Json(InteractionResponse::new(CallbackType::Pong)).into_response();
        }
        Some(InteractionType::ApplicationCommandAutocomplete) => {
            return Json(InteractionResponse::with_data(
                CallbackType::AutocompleteResult,
                json!({ "choices": [] }),
            ))
            .into_response();
        }
        _ => {}
    }

    let interaction = match parse_interaction(&payload) {
        Ok(interaction) => interaction,
        Err(e) => {
            e.log_tree();
            return (StatusCode::BAD_REQUEST, e.message()).into_response();
        }
    };

    let mode = state.pipeline.response_mode(&interaction.command_name);
    let ack = acknowledgement(&interaction, mode);

    let span = info_span!(
        "interaction",
        id = %interaction.id,
        command = %interaction.command_name,
        request = %Uuid::new_v4(),
    );
    let pipeline = state.pipeline.clone();
    state
        .in_flight
        .spawn(
            async move {
                pipeline.run(interaction).await;
            }
            .instrument(span),
        )
        .await;

    Json(ack).into_response()
}

pub fn acknowledgement(interaction: &Interaction, mode: ResponseMode) -> InteractionResponse {
    match mode {
        ResponseMode::Channel { notice } => InteractionResponse::with_data(
            CallbackType::ChannelMessageWithSource,
            json!({ "content": notice }),
        ),
        ResponseMode::Deferred if interaction.kind == InteractionType::MessageComponent => {
            InteractionResponse::new(CallbackType::DeferredUpdateMessage)
        }
        ResponseMode::Deferred => InteractionResponse::new(CallbackType::DeferredChannelMessageWithSource),
    }
}
