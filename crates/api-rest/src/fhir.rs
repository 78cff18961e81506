//! FHIR lab: clinical notes on top of the OpenMRS FHIR API.

use std::sync::Arc;

use api_shared::{non_blank, ApiError, HealthRes, JsonBody};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use hie_core::clinical_notes::{
    CreatedPatient, NewPatient, PatientNotes, PatientSummary, RecordedNote,
};
use hie_core::ClinicalNotesService;
use hie_types::NonEmptyText;
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi, ToSchema};

#[derive(Clone)]
struct AppState {
    service: Arc<ClinicalNotesService>,
}

#[derive(Deserialize, ToSchema)]
struct CreatePatientReq {
    #[serde(rename = "given-name")]
    given_name: String,
    #[serde(rename = "family-name")]
    family_name: String,
    /// `F`, `M` or `X`.
    gender: String,
    /// `YYYY-MM-DD`.
    #[serde(rename = "birth-date")]
    birth_date: String,
}

#[derive(Deserialize, ToSchema)]
struct FindPatientsReq {
    /// At least two characters of the patient's name.
    query: String,
}

#[derive(Deserialize, ToSchema)]
struct RecordNoteReq {
    #[serde(rename = "patient-uuid")]
    patient_uuid: String,
    text: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct NotesQuery {
    #[serde(rename = "patient-uuid")]
    patient_uuid: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(crate::health, create_patient, find_patients, notes, record_note),
    components(schemas(HealthRes, CreatePatientReq, FindPatientsReq, RecordNoteReq))
)]
struct ApiDoc;

pub fn router(service: Arc<ClinicalNotesService>) -> Router {
    let routes = Router::new()
        .route("/create-patient", post(create_patient))
        .route("/find-patients", post(find_patients))
        .route("/notes", get(notes))
        .route("/record-note", post(record_note))
        .with_state(AppState { service });
    crate::finish(routes, ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/create-patient",
    request_body = CreatePatientReq,
    responses(
        (status = 200, description = "New patient and its visit"),
        (status = 400, description = "Missing or invalid field"),
        (status = 500, description = "Internal server error")
    )
)]
/// Upload a FHIR Patient, then the Encounter of its first visit.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreatePatientReq>,
) -> Result<Json<CreatedPatient>, ApiError> {
    let patient = NewPatient::parse(
        &req.given_name,
        &req.family_name,
        &req.gender,
        &req.birth_date,
    )?;
    Ok(Json(state.service.create_patient(&patient).await?))
}

#[utoipa::path(
    post,
    path = "/find-patients",
    request_body = FindPatientsReq,
    responses(
        (status = 200, description = "Patients whose name matches"),
        (status = 400, description = "Query missing or too short"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn find_patients(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<FindPatientsReq>,
) -> Result<Json<Vec<PatientSummary>>, ApiError> {
    Ok(Json(state.service.find_patients(&req.query).await?))
}

#[utoipa::path(
    get,
    path = "/notes",
    params(NotesQuery),
    responses(
        (status = 200, description = "Patient header and notes, most recent first"),
        (status = 400, description = "Missing patient-uuid"),
        (status = 404, description = "Unknown patient"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn notes(
    State(state): State<AppState>,
    Query(query): Query<NotesQuery>,
) -> Result<Json<PatientNotes>, ApiError> {
    let patient_uuid = query
        .patient_uuid
        .filter(|uuid| !uuid.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing parameter patient-uuid".into()))?;
    Ok(Json(state.service.notes(&patient_uuid).await?))
}

#[utoipa::path(
    post,
    path = "/record-note",
    request_body = RecordNoteReq,
    responses(
        (status = 200, description = "Encounter and observation holding the note"),
        (status = 400, description = "Missing patient or empty text"),
        (status = 500, description = "No visit found for the patient (unknown patients included)")
    )
)]
#[axum::debug_handler]
async fn record_note(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RecordNoteReq>,
) -> Result<Json<RecordedNote>, ApiError> {
    let patient_uuid = non_blank("patient-uuid", &req.patient_uuid)?;
    let text = NonEmptyText::new(req.text)
        .map_err(|_| ApiError::BadRequest("text cannot be empty".into()))?;
    Ok(Json(state.service.record_note(patient_uuid, &text).await?))
}
