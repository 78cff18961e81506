//! HL7 lab: a gateway turning HL7v2 messages into OpenMRS records.

use std::sync::Arc;

use api_shared::{ApiError, HealthRes};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use hie_core::hl7_gateway::PatientVisit;
use hie_core::Hl7Gateway;
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi};

/// Media type of the acknowledgments.
pub const HL7_CONTENT_TYPE: &str = "text/hl7v2";

#[derive(Clone)]
struct AppState {
    gateway: Arc<Hl7Gateway>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct FindPatientQuery {
    /// External identifier sent in PID-3.
    #[serde(rename = "custom-id")]
    custom_id: Option<String>,
}

#[derive(OpenApi)]
#[openapi(paths(crate::health, receive_message, find_patient), components(schemas(HealthRes)))]
struct ApiDoc;

pub fn router(gateway: Arc<Hl7Gateway>) -> Router {
    let routes = Router::new()
        .route("/hl7", post(receive_message))
        .route("/find-patient", get(find_patient))
        .with_state(AppState { gateway });
    crate::finish(routes, ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/hl7",
    request_body(content = String, content_type = "text/hl7v2", description = "ADT^A04 or ORU^R01 message"),
    responses(
        (status = 200, description = "ACK with code AA or AE", content_type = "text/hl7v2"),
        (status = 400, description = "Body is not an HL7v2 message")
    )
)]
/// Process one HL7v2 message and answer with its acknowledgment.
///
/// Processing failures are reported in the ACK (`AE`), not through the HTTP status.
#[axum::debug_handler]
async fn receive_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let ack = state.gateway.handle(&body).await?;
    Ok(([(header::CONTENT_TYPE, HL7_CONTENT_TYPE)], ack))
}

#[utoipa::path(
    get,
    path = "/find-patient",
    params(FindPatientQuery),
    responses(
        (status = 200, description = "OpenMRS patient and visit"),
        (status = 400, description = "Missing custom-id"),
        (status = 404, description = "No such patient, or the patient has no visit")
    )
)]
#[axum::debug_handler]
async fn find_patient(
    State(state): State<AppState>,
    Query(query): Query<FindPatientQuery>,
) -> Result<Json<PatientVisit>, ApiError> {
    let custom_id = query
        .custom_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing parameter custom-id".into()))?;
    Ok(Json(state.gateway.find_patient(&custom_id).await?))
}
