mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::Query,
    http::{header, Request, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use common::{config, get_json, send, spawn_upstream, UNREACHABLE};
use hie_core::Hl7Gateway;
use serde_json::{json, Value};

const CUSTOM_TYPE_UUID: &str = "type-custom";

async fn identifier_types() -> Json<Value> {
    Json(json!({ "results": [
        { "display": "OpenMRS ID", "uuid": "type-openmrs" },
        { "display": "Old Identification Number", "uuid": CUSTOM_TYPE_UUID }
    ]}))
}

async fn patients(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let patient = |uuid: &str, custom_id: &str| {
        json!({
            "uuid": uuid,
            "identifiers": [{ "identifier": custom_id, "identifierType": { "uuid": CUSTOM_TYPE_UUID } }]
        })
    };
    let results = match query.get("q").map(String::as_str) {
        Some("C-1") => vec![patient("patient-1", "C-1")],
        Some("C-2") => vec![patient("patient-2", "C-2")],
        _ => Vec::new(),
    };
    Json(json!({ "results": results }))
}

async fn visits(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let results = match query.get("patient").map(String::as_str) {
        Some("patient-1") => vec![json!({ "uuid": "visit-1" }), json!({ "uuid": "visit-0" })],
        _ => Vec::new(),
    };
    Json(json!({ "results": results }))
}

async fn gateway_with_fake_openmrs() -> Router {
    let upstream = Router::new()
        .route("/v1/patientidentifiertype", get(identifier_types))
        .route("/v1/patient", get(patients))
        .route("/v1/visit", get(visits));
    let url = spawn_upstream(upstream).await;
    let config = config(&[("OPENMRS_URL", url.as_str())]);
    api_rest::hl7::router(Arc::new(Hl7Gateway::new(&config.hl7)))
}

fn offline_gateway() -> Router {
    let config = config(&[("OPENMRS_URL", UNREACHABLE), ("HL7_MESSAGE_ID_PREFIX", "ACK_")]);
    api_rest::hl7::router(Arc::new(Hl7Gateway::new(&config.hl7)))
}

async fn post_hl7(app: &Router, message: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/hl7")
        .header(header::CONTENT_TYPE, "text/hl7v2")
        .body(Body::from(message.to_string()))
        .expect("request");
    let response = tower::ServiceExt::oneshot(app.clone(), request)
        .await
        .expect("response");
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .expect("body")
        .to_bytes();
    (status, content_type, String::from_utf8_lossy(&bytes).into_owned())
}

fn segment<'a>(ack: &'a str, name: &str) -> Vec<&'a str> {
    ack.split('\r')
        .find(|s| s.starts_with(name))
        .map(|s| s.split('|').collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn unsupported_message_type_is_acknowledged_with_error() {
    let app = offline_gateway();
    let message = "MSH|^~\\&|SENDER|HOSP|STUDENT|LAB|20180301110000||ADT^A01|CTRL-7|P|2.5\r\
                   PID|||C-1||Doe^John||19800101|M";
    let (status, content_type, ack) = post_hl7(&app, message).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/hl7v2"));

    let msh = segment(&ack, "MSH");
    assert_eq!(&msh[2..6], ["STUDENT", "LAB", "SENDER", "HOSP"]);
    assert_eq!(msh[8], "ADT^A01");
    assert_eq!(msh[9], "ACK_1");
    assert_eq!(segment(&ack, "MSA"), ["MSA", "AE", "CTRL-7"]);
}

#[tokio::test]
async fn upstream_failure_is_acknowledged_with_error() {
    let app = offline_gateway();
    let message = "MSH|^~\\&|SENDER|HOSP|STUDENT|LAB|20180301110000||ADT^A04|CTRL-8|P|2.5\n\
                   PID|||C-1||Doe^John||19800101|M";
    let (status, _, ack) = post_hl7(&app, message).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(segment(&ack, "MSA"), ["MSA", "AE", "CTRL-8"]);
}

#[tokio::test]
async fn body_without_header_is_a_bad_request() {
    let app = offline_gateway();
    let (status, _, _) = post_hl7(&app, "PID|||C-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/hl7")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn finds_patient_and_first_visit() {
    let app = gateway_with_fake_openmrs().await;
    let (status, body) = get_json(&app, "/find-patient?custom-id=C-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "patient-uuid": "patient-1", "visit-uuid": "visit-1" }));
}

#[tokio::test]
async fn find_patient_reports_missing_records() {
    let app = gateway_with_fake_openmrs().await;

    let (status, _) = get_json(&app, "/find-patient?custom-id=C-2").await;
    assert_eq!(status, StatusCode::NOT_FOUND, "patient without visit");

    let (status, _) = get_json(&app, "/find-patient?custom-id=C-9").await;
    assert_eq!(status, StatusCode::NOT_FOUND, "unknown patient");

    let (status, _) = get_json(&app, "/find-patient").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
