//! Lenient JSON request bodies.
//!
//! The lab clients do not always send a `Content-Type` header, and some routes are called
//! without a body at all. [`JsonBody`] reads any body that is empty or a JSON object into the
//! request type of the route and answers 400 otherwise, whereas `axum::Json` would answer
//! 415 or 422.

use crate::ApiError;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Request body deserialized into `T`; an empty body is read as `{}`.
#[derive(Clone, Debug, PartialEq)]
pub struct JsonBody<T>(pub T);

impl<T: DeserializeOwned> JsonBody<T> {
    /// Parse a request body.
    pub fn from_bytes(body: &[u8]) -> Result<Self, ApiError> {
        let object = object_from_bytes(body)?;
        serde_json::from_value(Value::Object(object))
            .map(JsonBody)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))
    }
}

fn object_from_bytes(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::BadRequest(
            "request body must be a JSON object".into(),
        )),
        Err(e) => Err(ApiError::BadRequest(format!("invalid JSON body: {e}"))),
    }
}

/// Reject a string field that is empty or only whitespace.
pub fn non_blank<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("field {field} cannot be empty")));
    }
    Ok(value)
}

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("unreadable body: {}", e.body_text())))?;
        Self::from_bytes(&body)
    }
}
