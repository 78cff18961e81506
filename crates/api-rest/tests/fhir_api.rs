mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use common::{config, get_json, post_json, spawn_upstream};
use hie_core::ClinicalNotesService;
use serde_json::{json, Value};

fn patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "p-1",
        "name": [{ "given": ["John"], "family": "Doe" }],
        "gender": "male",
        "birthDate": "1980-01-01",
        "identifier": [{ "value": "100HV", "type": { "text": "OpenMRS ID" } }]
    })
}

fn bundle(resources: Vec<Value>) -> Value {
    let entry: Vec<Value> = resources.into_iter().map(|r| json!({ "resource": r })).collect();
    json!({ "resourceType": "Bundle", "type": "searchset", "entry": entry })
}

async fn search_patients(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let matches = query.get("name").is_some_and(|name| name == "Doe");
    Json(bundle(if matches { vec![patient()] } else { Vec::new() }))
}

async fn read_patient(Path(id): Path<String>) -> Response {
    if id == "p-1" {
        Json(patient()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn search_encounters() -> Json<Value> {
    Json(bundle(Vec::new()))
}

async fn app() -> Router {
    let upstream = Router::new()
        .route("/Patient", get(search_patients))
        .route("/Patient/:id", get(read_patient))
        .route("/Encounter", get(search_encounters));
    let url = spawn_upstream(upstream).await;
    let config = config(&[("FHIR_URL", url.as_str())]);
    api_rest::fhir::router(Arc::new(ClinicalNotesService::new(&config.fhir)))
}

#[tokio::test]
async fn finds_patients_by_name() {
    let app = app().await;
    let (status, body) = post_json(&app, "/find-patients", json!({ "query": "Doe" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "patient-uuid": "p-1",
            "patient-id": "100HV",
            "name": "John Doe",
            "gender": "M",
            "birth-date": "1980-01-01"
        }])
    );

    let (status, body) = post_json(&app, "/find-patients", json!({ "query": "Smith" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn find_patients_needs_two_characters() {
    let app = app().await;
    for body in [json!({}), json!({ "query": "" }), json!({ "query": "D" })] {
        let (status, _) = post_json(&app, "/find-patients", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn notes_of_unknown_or_visitless_patients() {
    let app = app().await;

    let (status, _) = get_json(&app, "/notes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/notes?patient-uuid=nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&app, "/notes?patient-uuid=p-1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn rejects_invalid_patients_and_notes() {
    let app = app().await;
    let valid = json!({
        "given-name": "John",
        "family-name": "Doe",
        "gender": "M",
        "birth-date": "1980-01-01"
    });
    let overrides = [
        ("given-name", json!("")),
        ("family-name", json!(" ")),
        ("gender", json!("Q")),
        ("birth-date", json!("01/01/1980")),
        ("birth-date", json!(19800101)),
    ];
    for (key, value) in overrides {
        let mut body = valid.clone();
        body[key] = value;
        let (status, _) = post_json(&app, "/create-patient", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{key}");
    }

    let (status, _) = post_json(&app, "/record-note", json!({ "patient-uuid": "p-1", "text": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post_json(&app, "/record-note", json!({ "text": "Feeling better" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notes_cannot_be_recorded_without_a_visit() {
    let app = app().await;
    for patient_uuid in ["p-1", "nope"] {
        let (status, _) = post_json(
            &app,
            "/record-note",
            json!({ "patient-uuid": patient_uuid, "text": "Feeling better" }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{patient_uuid}");
    }
}

#[tokio::test]
async fn openapi_document_matches_record_note_statuses() {
    let app = app().await;
    let (status, body) = get_json(&app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    let responses = &body["paths"]["/record-note"]["post"]["responses"];
    assert!(responses["200"].is_object());
    assert!(responses["400"].is_object());
    assert!(responses["500"].is_object());
    assert!(responses["404"].is_null());
    assert!(body["components"]["schemas"]["RecordNoteReq"]["properties"]["patient-uuid"].is_object());
}
