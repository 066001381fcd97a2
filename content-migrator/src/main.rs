//! Content Migrator Main Entry Point
//!
//! Runs one WordPress to Storyblok migration configured from the environment.

use content_migrator::{Dependencies, MigrationError};
use dotenv::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "content_migrator=info,content_migrator_source=info,content_migrator_repository=info",
        )
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
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();
    }

    info!(
        service_name = "content-migrator",
        service_version = env!("CARGO_PKG_VERSION"),
        json = json,
        "Tracing initialized"
    );
}

#[tokio::main]
async fn main() -> Result<(), MigrationError> {
    dotenv().ok();
    init_tracing();

    info!("Starting content migrator");

    let deps = match Dependencies::new() {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match deps.orchestrator.migrate().await {
        Ok(report) => {
            info!(
                stories_created = report.stories_created,
                assets_uploaded = report.assets_uploaded,
                folders_created = report.folders_created,
                "Content migrator completed successfully"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Content migrator failed");
            Err(e)
        }
    }
}
