mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use common::{config, post, post_json, spawn_upstream};
use hie_core::ImagingService;
use serde_json::{json, Value};

const STUDY: &str = "1.2.3";
const SERIES: &str = "1.2.3.4";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

type Queries = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn studies(
    State(queries): State<Queries>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    queries.lock().expect("lock").push(query);
    Json(json!([{
        "00100020": { "vr": "LO", "Value": ["P-001"] },
        "00100010": { "vr": "PN", "Value": [{ "Alphabetic": "DOE^JOHN" }] },
        "00081030": { "vr": "LO", "Value": ["CT HEAD"] },
        "0020000D": { "vr": "UI", "Value": [STUDY] }
    }]))
}

async fn series(Path(study): Path<String>) -> Response {
    if study != STUDY {
        return StatusCode::NO_CONTENT.into_response();
    }
    Json(json!([{
        "00080060": { "vr": "CS", "Value": ["CT"] },
        "0008103E": { "vr": "LO", "Value": ["Axial"] },
        "0020000E": { "vr": "UI", "Value": [SERIES] }
    }]))
    .into_response()
}

async fn instances(Path((study, series)): Path<(String, String)>) -> Response {
    if study != STUDY || series != SERIES {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!([
        { "00080018": { "vr": "UI", "Value": ["sop-3"] }, "00200013": { "vr": "IS", "Value": [3] } },
        { "00080018": { "vr": "UI", "Value": ["sop-none"] } },
        { "00080018": { "vr": "UI", "Value": ["sop-2"] }, "00200013": { "vr": "IS", "Value": ["2"] } },
        { "00080018": { "vr": "UI", "Value": ["sop-0"] }, "00200013": { "vr": "IS", "Value": [0] } }
    ]))
    .into_response()
}

async fn rendered(Path((study, series, sop)): Path<(String, String, String)>) -> Response {
    if study == STUDY && series == SERIES && sop == "sop-2" {
        ([(header::CONTENT_TYPE, "image/png")], PNG).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn app() -> (Router, Queries) {
    let queries = Queries::default();
    let upstream = Router::new()
        .route("/studies", get(studies))
        .route("/studies/:study/series", get(series))
        .route("/studies/:study/series/:series/instances", get(instances))
        .route(
            "/studies/:study/series/:series/instances/:sop/rendered",
            get(rendered),
        )
        .with_state(queries.clone());
    let url = spawn_upstream(upstream).await;
    let config = config(&[("DICOMWEB_URL", url.as_str())]);
    let app = api_rest::dicomweb::router(Arc::new(ImagingService::new(&config.dicomweb)));
    (app, queries)
}

#[tokio::test]
async fn looks_up_studies_with_non_empty_filters_only() {
    let (app, queries) = app().await;
    let (status, body) = post_json(
        &app,
        "/lookup-studies",
        json!({ "patient-id": "P-001", "patient-name": "", "study-description": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "patient-id": "P-001",
            "patient-name": "DOE^JOHN",
            "study-description": "CT HEAD",
            "study-instance-uid": STUDY
        }])
    );

    let queries = queries.lock().expect("lock");
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].get("PatientID").map(String::as_str), Some("P-001"));
    assert!(!queries[0].contains_key("PatientName"));
    assert!(!queries[0].contains_key("StudyDescription"));
}

#[tokio::test]
async fn lookup_studies_requires_every_key() {
    let (app, _) = app().await;
    let incomplete = [
        json!({}),
        json!({ "patient-id": "", "patient-name": "" }),
        json!({ "patient-id": "", "study-description": "" }),
        json!({ "patient-name": "", "study-description": "" }),
    ];
    for body in incomplete {
        let (status, _) = post_json(&app, "/lookup-studies", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn looks_up_series() {
    let (app, _) = app().await;
    let (status, body) =
        post_json(&app, "/lookup-series", json!({ "study-instance-uid": STUDY })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{ "modality": "CT", "series-description": "Axial", "series-instance-uid": SERIES }])
    );

    let (status, _) = post_json(&app, "/lookup-series", json!({ "study-instance-uid": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) =
        post_json(&app, "/lookup-series", json!({ "study-instance-uid": "nope" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn instances_are_sorted_by_instance_number() {
    let (app, _) = app().await;
    let (status, body) = post_json(
        &app,
        "/lookup-instances",
        json!({ "study-instance-uid": STUDY, "series-instance-uid": SERIES }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["sop-0", "sop-none", "sop-2", "sop-3"]));

    let (status, _) = post_json(
        &app,
        "/lookup-instances",
        json!({ "study-instance-uid": STUDY, "series-instance-uid": "nope" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) =
        post_json(&app, "/lookup-instances", json!({ "series-instance-uid": SERIES })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn renders_instances_as_png() {
    let (app, _) = app().await;
    let body = json!({
        "study-instance-uid": STUDY,
        "series-instance-uid": SERIES,
        "sop-instance-uid": "sop-2"
    });
    let (status, bytes) = post(&app, "/render-instance", &body.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, PNG);

    let unknown = json!({
        "study-instance-uid": STUDY,
        "series-instance-uid": SERIES,
        "sop-instance-uid": "nope"
    });
    let (status, _) = post_json(&app, "/render-instance", unknown).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing = json!({ "study-instance-uid": STUDY, "series-instance-uid": SERIES });
    let (status, _) = post_json(&app, "/render-instance", missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
