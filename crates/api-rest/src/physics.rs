//! Physics lab: stateless unit conversions.

use api_shared::{ApiError, HealthRes, JsonBody};
use axum::{response::Json, routing::post, Router};
use hie_core::physics::{self, Conversion};
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::{OpenApi, ToSchema};

#[derive(Deserialize, ToSchema)]
struct ConvertCelsiusReq {
    celsius: f64,
}

/// Exactly two of the four quantities.
#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
struct ComputeElectricityReq {
    voltage: Option<f64>,
    resistance: Option<f64>,
    current: Option<f64>,
    power: Option<f64>,
}

impl ComputeElectricityReq {
    /// The quantities that were given, by name.
    fn known(&self) -> Map<String, Value> {
        [
            ("voltage", self.voltage),
            ("resistance", self.resistance),
            ("current", self.current),
            ("power", self.power),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), Value::from(v))))
        .collect()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(crate::health, convert_celsius, compute_electricity),
    components(schemas(HealthRes, ConvertCelsiusReq, ComputeElectricityReq))
)]
struct ApiDoc;

pub fn router() -> Router {
    let routes = Router::new()
        .route("/convert-celsius", post(convert_celsius))
        .route("/compute-electricity", post(compute_electricity));
    crate::finish(routes, ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/convert-celsius",
    request_body = ConvertCelsiusReq,
    responses(
        (status = 200, description = "Temperature in Fahrenheit and Kelvin"),
        (status = 400, description = "Missing or non-numeric celsius")
    )
)]
#[axum::debug_handler]
async fn convert_celsius(
    JsonBody(req): JsonBody<ConvertCelsiusReq>,
) -> Result<Json<Conversion>, ApiError> {
    Ok(Json(physics::convert_celsius(req.celsius)))
}

#[utoipa::path(
    post,
    path = "/compute-electricity",
    request_body = ComputeElectricityReq,
    responses(
        (status = 200, description = "The two missing quantities"),
        (status = 400, description = "Not exactly two known numeric quantities")
    )
)]
#[axum::debug_handler]
async fn compute_electricity(
    JsonBody(req): JsonBody<ComputeElectricityReq>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let computed = physics::compute_electricity(&req.known())?;
    Ok(Json(computed))
}
