//! DICOMweb lab: back end of a web viewer for a PACS.

use std::sync::Arc;

use api_shared::{non_blank, ApiError, HealthRes, JsonBody};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use hie_core::imaging::{SeriesSummary, StudyQuery, StudySummary};
use hie_core::ImagingService;
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};

#[derive(Clone)]
struct AppState {
    service: Arc<ImagingService>,
}

/// All three keys are required; empty values do not filter.
#[derive(Deserialize, ToSchema)]
struct LookupStudiesReq {
    #[serde(rename = "patient-id")]
    patient_id: String,
    #[serde(rename = "patient-name")]
    patient_name: String,
    #[serde(rename = "study-description")]
    study_description: String,
}

#[derive(Deserialize, ToSchema)]
struct LookupSeriesReq {
    #[serde(rename = "study-instance-uid")]
    study_instance_uid: String,
}

#[derive(Deserialize, ToSchema)]
struct LookupInstancesReq {
    #[serde(rename = "study-instance-uid")]
    study_instance_uid: String,
    #[serde(rename = "series-instance-uid")]
    series_instance_uid: String,
}

#[derive(Deserialize, ToSchema)]
struct RenderInstanceReq {
    #[serde(rename = "study-instance-uid")]
    study_instance_uid: String,
    #[serde(rename = "series-instance-uid")]
    series_instance_uid: String,
    #[serde(rename = "sop-instance-uid")]
    sop_instance_uid: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health,
        lookup_studies,
        lookup_series,
        lookup_instances,
        render_instance,
    ),
    components(schemas(
        HealthRes,
        LookupStudiesReq,
        LookupSeriesReq,
        LookupInstancesReq,
        RenderInstanceReq,
    ))
)]
struct ApiDoc;

pub fn router(service: Arc<ImagingService>) -> Router {
    let routes = Router::new()
        .route("/lookup-studies", post(lookup_studies))
        .route("/lookup-series", post(lookup_series))
        .route("/lookup-instances", post(lookup_instances))
        .route("/render-instance", post(render_instance))
        .with_state(AppState { service });
    crate::finish(routes, ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/lookup-studies",
    request_body = LookupStudiesReq,
    responses(
        (status = 200, description = "Matching studies, possibly none"),
        (status = 400, description = "Missing key"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn lookup_studies(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LookupStudiesReq>,
) -> Result<Json<Vec<StudySummary>>, ApiError> {
    let query = StudyQuery {
        patient_id: req.patient_id,
        patient_name: req.patient_name,
        study_description: req.study_description,
    };
    Ok(Json(state.service.lookup_studies(&query).await?))
}

#[utoipa::path(
    post,
    path = "/lookup-series",
    request_body = LookupSeriesReq,
    responses(
        (status = 200, description = "Series of the study"),
        (status = 400, description = "Missing or empty study UID"),
        (status = 404, description = "The study has no series"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn lookup_series(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LookupSeriesReq>,
) -> Result<Json<Vec<SeriesSummary>>, ApiError> {
    let study = non_blank("study-instance-uid", &req.study_instance_uid)?;
    Ok(Json(state.service.lookup_series(study).await?))
}

#[utoipa::path(
    post,
    path = "/lookup-instances",
    request_body = LookupInstancesReq,
    responses(
        (status = 200, description = "SOP Instance UIDs sorted by instance number"),
        (status = 400, description = "Missing or empty UID"),
        (status = 404, description = "The series has no instance"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn lookup_instances(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LookupInstancesReq>,
) -> Result<Json<Vec<String>>, ApiError> {
    let study = non_blank("study-instance-uid", &req.study_instance_uid)?;
    let series = non_blank("series-instance-uid", &req.series_instance_uid)?;
    Ok(Json(state.service.lookup_instances(study, series).await?))
}

#[utoipa::path(
    post,
    path = "/render-instance",
    request_body = RenderInstanceReq,
    responses(
        (status = 200, description = "PNG rendering of the instance", content_type = "image/png"),
        (status = 400, description = "Missing or empty UID"),
        (status = 404, description = "Unknown instance"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn render_instance(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RenderInstanceReq>,
) -> Result<impl IntoResponse, ApiError> {
    let study = non_blank("study-instance-uid", &req.study_instance_uid)?;
    let series = non_blank("series-instance-uid", &req.series_instance_uid)?;
    let sop = non_blank("sop-instance-uid", &req.sop_instance_uid)?;
    let png = state.service.render_instance(study, series, sop).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
