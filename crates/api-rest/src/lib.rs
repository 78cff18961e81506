//! # API REST
//!
//! REST API implementation for the HIE labs.
//!
//! Handles:
//! - one axum router per lab, each with its own OpenAPI/Swagger documentation
//! - lab startup: upstream initialisation, then serving on the lab's address
//! - REST-specific concerns (lenient JSON bodies, CORS)
//! - the static web page of each lab, with `/` redirecting to `/index.html`
//!
//! Uses `api-shared` for common types and utilities and `hie-core` for the lab services.

#![warn(rust_2018_idioms)]

pub mod couchdb;
pub mod dicomweb;
pub mod ehrbase;
pub mod fhir;
pub mod hl7;
pub mod physics;

use std::path::Path;
use std::sync::Arc;

use api_shared::{HealthRes, HealthService};
use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use hie_core::{
    ClinicalNotesService, DocumentChartService, Hl7Gateway, ImagingService, Lab, LabsConfig,
    TemperatureChartService,
};
use tower_http::{cors::CorsLayer, services::ServeDir};
use utoipa_swagger_ui::SwaggerUi;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint shared by every lab.
#[axum::debug_handler]
pub(crate) async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

/// Add the routes and layers common to every lab: `/health`, Swagger UI and CORS.
pub(crate) fn finish(routes: Router, openapi: utoipa::openapi::OpenApi) -> Router {
    routes
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(CorsLayer::permissive())
}

/// `/` sends the browser to the lab's web page.
async fn redirect_to_index() -> impl IntoResponse {
    (StatusCode::FOUND, [(LOCATION, "/index.html")])
}

/// Serve the static web page of a lab (`index.html`, `app.js`) from `dir`.
///
/// Files are looked up only after every API route failed to match, so a file cannot
/// shadow an endpoint.
pub fn with_front_end(router: Router, dir: &Path) -> Router {
    router
        .route("/", get(redirect_to_index))
        .fallback_service(ServeDir::new(dir))
}

/// Build the router of `lab`, initialising its upstream server first.
///
/// # Errors
/// Returns an error if the upstream server cannot be prepared (template upload, database
/// creation, concept lookup).
pub async fn build_router(lab: Lab, config: &LabsConfig) -> anyhow::Result<Router> {
    let router = match lab {
        Lab::Physics => physics::router(),
        Lab::Ehrbase => {
            let service = TemperatureChartService::new(&config.ehrbase);
            service.initialize().await?;
            tracing::info!("EHRbase lab uses composer {}", service.composer());
            ehrbase::router(Arc::new(service))
        }
        Lab::CouchDb => {
            let service = DocumentChartService::new(&config.couchdb);
            service.initialize().await?;
            couchdb::router(Arc::new(service))
        }
        Lab::Hl7 => hl7::router(Arc::new(Hl7Gateway::new(&config.hl7))),
        Lab::DicomWeb => dicomweb::router(Arc::new(ImagingService::new(&config.dicomweb))),
        Lab::Fhir => {
            let service = ClinicalNotesService::new(&config.fhir);
            service.initialize().await?;
            fhir::router(Arc::new(service))
        }
    };
    Ok(with_front_end(router, &config.front_end_dir(lab)))
}

/// Initialise `lab` and serve it on its configured address until the server stops.
///
/// # Errors
/// Returns an error if initialisation fails, the address cannot be bound, or the HTTP
/// server fails while running.
pub async fn serve(lab: Lab, config: &LabsConfig) -> anyhow::Result<()> {
    let app = build_router(lab, config).await?;
    let addr = config.addr(lab);

    tracing::info!("-- Starting {} lab on {}", lab, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
