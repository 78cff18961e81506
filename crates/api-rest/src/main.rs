//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs a single lab on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging when you only want one lab (with
//! OpenAPI/Swagger UI). The workspace's main `hie-run` binary runs every enabled lab
//! concurrently.
//!
//! ```text
//! hie-api-rest <physics|ehrbase|couchdb|hl7|dicomweb|fhir>
//! ```

use hie_core::{Lab, LabsConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the standalone lab server
///
/// The lab is named by the first argument, or by `HIE_LAB` when no argument is given. Its
/// address and upstream server come from the environment, see `LabsConfig::from_env`.
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the lab name or the configuration is invalid,
/// - the lab cannot be initialised or its address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("hie_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let name = match std::env::args().nth(1) {
        Some(name) => name,
        None => std::env::var("HIE_LAB").map_err(|_| {
            anyhow::anyhow!("usage: hie-api-rest <physics|ehrbase|couchdb|hl7|dicomweb|fhir>")
        })?,
    };
    let lab: Lab = name.parse()?;
    let config = LabsConfig::from_env()?;

    api_rest::serve(lab, &config).await
}
