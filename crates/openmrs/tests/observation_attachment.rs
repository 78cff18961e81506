use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use hie_types::{BaseUrl, BasicCredentials};
use openmrs::OpenMrsClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Captured {
    uploads: Arc<Mutex<Vec<(String, String)>>>,
}

async fn encounter(Path(uuid): Path<String>) -> Json<Value> {
    Json(json!({
        "uuid": uuid,
        "patient": { "uuid": "patient-1" },
        "encounterDatetime": "2024-03-01T10:00:00.000+0000",
    }))
}

async fn patient(Path(uuid): Path<String>) -> Json<Value> {
    Json(json!({ "uuid": uuid, "person": { "uuid": "person-1" } }))
}

async fn concept(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    match query.get("name").map(String::as_str) {
        Some("Attachment Upload") => Json(json!({ "results": [{ "uuid": "concept-1" }] })),
        _ => Json(json!({ "results": [] })),
    }
}

async fn create_obs(State(captured): State<Captured>, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = String::from_utf8_lossy(&body).to_string();
    captured.uploads.lock().expect("lock").push((content_type, body));
    Json(json!({ "uuid": "obs-1" }))
}

async fn client_with_fake_server() -> (OpenMrsClient, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/v1/encounter/:uuid", get(encounter))
        .route("/v1/patient/:uuid", get(patient))
        .route("/v1/concept", get(concept))
        .route("/v1/obs", post(create_obs))
        .with_state(captured.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let base = BaseUrl::parse(format!("http://{addr}")).expect("base url");
    let client = OpenMrsClient::new(base, BasicCredentials::new("admin", "Admin123"));
    (client, captured)
}

#[tokio::test]
async fn attachment_is_uploaded_as_multipart_observation() {
    let (client, captured) = client_with_fake_server().await;

    let uuid = client
        .create_observation_attachment(
            "enc-1",
            "Attachment Upload",
            "Chest X-ray",
            b"\x89PNG",
            "image/png",
        )
        .await
        .expect("attachment");
    assert_eq!(uuid, "obs-1");

    let uploads = captured.uploads.lock().expect("lock");
    assert_eq!(uploads.len(), 1);
    let (content_type, body) = &uploads[0];
    assert!(content_type.starts_with("multipart/form-data; boundary="));

    let body = body.to_lowercase();
    assert!(body.contains("name=\"json\""));
    assert!(body.contains("name=\"file\"; filename=\"upload\""));
    assert!(body.contains("content-type: image/png"));
    assert!(body.contains("ivborw=="));

    let metadata = uploads[0]
        .1
        .lines()
        .find(|line| line.starts_with('{'))
        .expect("json part");
    let metadata: Value = serde_json::from_str(metadata).expect("metadata");
    assert_eq!(
        metadata,
        json!({
            "comment": "Chest X-ray",
            "concept": "concept-1",
            "encounter": "enc-1",
            "obsDatetime": "2024-03-01T10:00:00.000+0000",
            "person": "person-1",
        })
    );
}

#[tokio::test]
async fn attachment_requires_a_known_concept() {
    let (client, captured) = client_with_fake_server().await;

    let result = client
        .create_observation_attachment("enc-1", "Nonexistent", "Scan", b"data", "image/png")
        .await;
    assert!(matches!(result, Err(openmrs::OpenMrsError::UnknownConcept(_))));
    assert!(captured.uploads.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn invalid_media_type_is_rejected_before_upload() {
    let (client, captured) = client_with_fake_server().await;

    let result = client
        .create_observation_attachment("enc-1", "Attachment Upload", "Scan", b"data", "not a mime")
        .await;
    assert!(result.is_err());
    assert!(captured.uploads.lock().expect("lock").is_empty());
}
