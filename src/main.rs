mod commands;
mod config;
mod delivery;
mod discord;
mod error;
mod interaction;
mod pipeline;
mod state;
mod types;

use std::env;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use discord::api::RestClient;
use discord::verify::SignatureVerifier;
use error::Result;
use pipeline::Pipeline;
use state::AppState;

fn init_logging() {
    let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let json = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialised: {}", e);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    let api = Arc::new(RestClient::new(&config)?);
    let registry = commands::all_commands(&config)?;

    // Bulk overwrite is rate limited on the platform side, so it is opt-in.
    if config.register_commands {
        let definitions = registry.definitions();
        match api.register_commands(&definitions).await {
            Ok(()) => info!("registered {} commands", definitions.len()),
            Err(e) => {
                error!("failed to register commands:");
                e.log_tree();
            }
        }
    }

    let verifier = if config.verify_signatures {
        SignatureVerifier::new(&config.public_key)?
    } else {
        SignatureVerifier::disabled()
    };
    if !verifier.is_enabled() {
        warn!("request signature verification is DISABLED");
    }

    let pipeline = Pipeline::new(api, Arc::new(registry));
    discord::server::serve(config.bind_addr, AppState::new(verifier, pipeline)).await
}

#[tokio::main]
async fn main() {
    init_logging();
    info!("interaction-bot {} (starting)", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        e.log_tree();
        std::process::exit(1);
    }
}
