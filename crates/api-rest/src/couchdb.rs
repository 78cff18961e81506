//! CouchDB lab: a temperature chart stored as JSON documents.

use std::sync::Arc;

use api_shared::{non_blank, ApiError, HealthRes, JsonBody};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use hie_core::document_chart::{PatientSummary, TemperatureRecord};
use hie_core::DocumentChartService;
use hie_types::NonEmptyText;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::{IntoParams, OpenApi, ToSchema};

#[derive(Clone)]
struct AppState {
    service: Arc<DocumentChartService>,
}

#[derive(Deserialize, ToSchema)]
struct CreatePatientReq {
    name: String,
}

/// The measurement time is set by the server.
#[derive(Deserialize, ToSchema)]
struct RecordTemperatureReq {
    patient_id: String,
    temperature: f64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct TemperaturesQuery {
    /// Identifier of the patient document.
    id: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health,
        create_patient,
        record_temperature,
        list_patients,
        list_temperatures,
    ),
    components(schemas(HealthRes, CreatePatientReq, RecordTemperatureReq))
)]
struct ApiDoc;

pub fn router(service: Arc<DocumentChartService>) -> Router {
    let routes = Router::new()
        .route("/create-patient", post(create_patient))
        .route("/record-temperature", post(record_temperature))
        .route("/patients", get(list_patients))
        .route("/temperatures", get(list_temperatures))
        .with_state(AppState { service });
    crate::finish(routes, ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/create-patient",
    request_body = CreatePatientReq,
    responses(
        (status = 200, description = "Identifier of the patient document"),
        (status = 400, description = "Missing or empty name"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreatePatientReq>,
) -> Result<Json<Value>, ApiError> {
    let name = NonEmptyText::new(req.name)
        .map_err(|_| ApiError::BadRequest("name cannot be empty".into()))?;
    let id = state.service.create_patient(&name).await?;
    Ok(Json(json!({ "id": id })))
}

#[utoipa::path(
    post,
    path = "/record-temperature",
    request_body = RecordTemperatureReq,
    responses(
        (status = 200, description = "Identifier of the temperature document"),
        (status = 400, description = "Missing patient or non-numeric temperature"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn record_temperature(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RecordTemperatureReq>,
) -> Result<Json<Value>, ApiError> {
    let patient_id = non_blank("patient_id", &req.patient_id)?;
    let id = state
        .service
        .record_temperature(patient_id, req.temperature)
        .await?;
    Ok(Json(json!({ "id": id })))
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "All the patients of the collection"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
) -> Result<Json<Vec<PatientSummary>>, ApiError> {
    Ok(Json(state.service.list_patients().await?))
}

#[utoipa::path(
    get,
    path = "/temperatures",
    params(TemperaturesQuery),
    responses(
        (status = 200, description = "Measurements sorted by time"),
        (status = 400, description = "Missing patient identifier"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn list_temperatures(
    State(state): State<AppState>,
    Query(query): Query<TemperaturesQuery>,
) -> Result<Json<Vec<TemperatureRecord>>, ApiError> {
    let id = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing parameter id".into()))?;
    Ok(Json(state.service.list_temperatures(&id).await?))
}
