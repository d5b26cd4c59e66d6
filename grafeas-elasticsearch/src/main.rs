//! Grafeas Elasticsearch Main Entry Point
//!
//! Prepares the Elasticsearch storage backend for Grafeas: ensures the
//! projects index exists and migrates outdated indexes, then exits.

use dotenv::dotenv;
use grafeas_elasticsearch::{AppError, Dependencies, Settings};
use std::env;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("grafeas_elasticsearch=info,grafeas_elasticsearch_repository=info")
    });

    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "grafeas-elasticsearch",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "grafeas-elasticsearch",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

/// Cancel `ctx` on Ctrl-C.
fn cancel_on_ctrl_c(ctx: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received Ctrl-C, cancelling startup");
                ctx.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting Grafeas Elasticsearch storage setup");

    let settings = Settings::from_env().inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;

    let ctx = CancellationToken::new();
    cancel_on_ctrl_c(ctx.clone());

    match Dependencies::new(&ctx, &settings).await {
        Ok(_) => {
            info!("Grafeas Elasticsearch storage is ready");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Grafeas Elasticsearch storage setup failed");
            Err(e)
        }
    }
}
