use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use hie_types::{BaseUrl, BasicCredentials};
use openehr::{CompositionFormat, OpenEhrClient};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Queries = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn add_composition(
    State(queries): State<Queries>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    queries.lock().expect("lock").push(query);
    Json(json!({ "compositionUid": "comp-1::local::1" }))
}

async fn sample(
    State(queries): State<Queries>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    queries.lock().expect("lock").push(query);
    Json(json!({ "ctx/language": "en" }))
}

async fn client_with_fake_server() -> (OpenEhrClient, Queries) {
    let queries = Queries::default();
    let app = Router::new()
        .route("/ecis/v1/composition", post(add_composition))
        .route("/ecis/v1/template/:id/example", get(sample))
        .with_state(queries.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let base = BaseUrl::parse(format!("http://{addr}")).expect("base url");
    let client = OpenEhrClient::new(base, BasicCredentials::new("user", "secret"));
    (client, queries)
}

#[tokio::test]
async fn composition_parameters_are_query_encoded() {
    let (client, queries) = client_with_fake_server().await;

    let uid = client
        .add_composition(
            "ehr 1&x=y",
            "Vitals#v0",
            &json!({ "ctx/language": "en" }),
            CompositionFormat::SimplifiedJsonFlat,
        )
        .await
        .expect("composition");
    assert_eq!(uid, "comp-1::local::1");

    let queries = queries.lock().expect("lock");
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].get("ehrId").map(String::as_str), Some("ehr 1&x=y"));
    assert_eq!(queries[0].get("templateId").map(String::as_str), Some("Vitals#v0"));
    assert_eq!(queries[0].get("format").map(String::as_str), Some("FLAT"));
    assert!(!queries[0].contains_key("x"));
}

#[tokio::test]
async fn sample_composition_format_is_a_query_parameter() {
    let (client, queries) = client_with_fake_server().await;

    let sample = client
        .get_sample_composition("Basic.v0", CompositionFormat::SimplifiedJsonStructured)
        .await
        .expect("sample");
    assert_eq!(sample["ctx/language"], json!("en"));

    let queries = queries.lock().expect("lock");
    assert_eq!(queries[0].get("format").map(String::as_str), Some("STRUCTURED"));
}
