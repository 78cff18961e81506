//! EHRbase lab: a temperature chart stored as openEHR compositions.

use std::sync::Arc;

use api_shared::{non_blank, ApiError, HealthRes, JsonBody};
use axum::{extract::State, response::Json, routing::post, Router};
use hie_core::temperature_chart::{MonitoredPatient, TemperatureRecord};
use hie_core::TemperatureChartService;
use hie_types::NonEmptyText;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::{OpenApi, ToSchema};

#[derive(Clone)]
struct AppState {
    service: Arc<TemperatureChartService>,
}

#[derive(Deserialize, ToSchema)]
struct CreatePatientReq {
    #[serde(rename = "patient-name")]
    patient_name: String,
}

#[derive(Deserialize, ToSchema)]
struct RecordTemperatureReq {
    #[serde(rename = "ehr-id")]
    ehr_id: String,
    temperature: f64,
    /// ISO 8601 date and time of the measurement.
    time: String,
}

#[derive(Deserialize, ToSchema)]
struct ListTemperaturesReq {
    #[serde(rename = "ehr-id")]
    ehr_id: String,
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
    components(schemas(HealthRes, CreatePatientReq, RecordTemperatureReq, ListTemperaturesReq))
)]
struct ApiDoc;

pub fn router(service: Arc<TemperatureChartService>) -> Router {
    let routes = Router::new()
        .route("/create-patient", post(create_patient))
        .route("/record-temperature", post(record_temperature))
        .route("/list-patients", post(list_patients))
        .route("/list-temperatures", post(list_temperatures))
        .with_state(AppState { service });
    crate::finish(routes, ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/create-patient",
    request_body = CreatePatientReq,
    responses(
        (status = 200, description = "Identifier of the new EHR"),
        (status = 400, description = "Missing or empty patient name"),
        (status = 500, description = "Internal server error")
    )
)]
/// Create an EHR holding a `MonitoredPatient.v0` composition with the patient's name.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreatePatientReq>,
) -> Result<Json<Value>, ApiError> {
    let name = NonEmptyText::new(req.patient_name)
        .map_err(|_| ApiError::BadRequest("patient-name cannot be empty".into()))?;
    let ehr_id = state.service.create_patient(&name).await?;
    Ok(Json(json!({ "ehr-id": ehr_id })))
}

#[utoipa::path(
    post,
    path = "/record-temperature",
    request_body = RecordTemperatureReq,
    responses(
        (status = 200, description = "Identifier of the new composition"),
        (status = 400, description = "Missing field or non-numeric temperature"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn record_temperature(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RecordTemperatureReq>,
) -> Result<Json<Value>, ApiError> {
    let ehr_id = non_blank("ehr-id", &req.ehr_id)?;
    let time = non_blank("time", &req.time)?;
    let uid = state
        .service
        .record_temperature(ehr_id, req.temperature, time)
        .await?;
    Ok(Json(json!({ "composition-uid": uid })))
}

#[utoipa::path(
    post,
    path = "/list-patients",
    responses(
        (status = 200, description = "Patients registered by this server"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonitoredPatient>>, ApiError> {
    Ok(Json(state.service.list_patients().await?))
}

#[utoipa::path(
    post,
    path = "/list-temperatures",
    request_body = ListTemperaturesReq,
    responses(
        (status = 200, description = "Measurements sorted by increasing time"),
        (status = 400, description = "Missing EHR identifier"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn list_temperatures(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ListTemperaturesReq>,
) -> Result<Json<Vec<TemperatureRecord>>, ApiError> {
    let ehr_id = non_blank("ehr-id", &req.ehr_id)?;
    Ok(Json(state.service.list_temperatures(ehr_id).await?))
}
