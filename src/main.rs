use std::sync::Arc;

use hie_core::LabsConfig;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the HIE labs
///
/// Starts every enabled lab concurrently, each on its own address. A lab whose upstream
/// server cannot be initialised stops the whole process, as does any server failure.
///
/// # Environment Variables
/// - `HIE_LABS`: comma-separated labs to start (default: all of them)
/// - `HIE_<LAB>_ADDR`: listening address of each lab (`HIE_PHYSICS_ADDR`, ...)
/// - upstream URLs and credentials (`EHRBASE_URL`, `COUCHDB_URL`, `OPENMRS_URL`,
///   `DICOMWEB_URL`, `FHIR_URL`, ...), see `LabsConfig::from_env`
///
/// # Returns
/// * `Err(anyhow::Error)` - If configuration, startup or a server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hie_run=info".parse()?)
                .add_directive("hie_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(LabsConfig::from_env()?);

    let mut servers = JoinSet::new();
    for &lab in config.enabled_labs() {
        tracing::info!("++ Starting {} lab on {}", lab, config.addr(lab));
        let config = config.clone();
        servers.spawn(async move {
            api_rest::serve(lab, &config)
                .await
                .map_err(|e| e.context(format!("{lab} lab failed")))
        });
    }

    while let Some(result) = servers.join_next().await {
        result??;
    }
    Ok(())
}
