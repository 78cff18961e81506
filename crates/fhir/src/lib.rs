//! FHIR R4 REST boundary support.
//!
//! This crate provides:
//! - [`FhirClient`], covering the instance read, type search (with paging) and create
//!   interactions
//! - read-only typed views over `Patient`, `Encounter` and `Observation` resources
//!
//! Views are lenient about extra fields (servers add plenty) but strict about the types
//! of the fields they read; mismatches are reported with the path of the failing field.

pub mod client;
pub mod datatypes;
pub mod encounter;
pub mod observation;
pub mod patient;

pub use client::FhirClient;
pub use encounter::EncounterView;
pub use observation::ObservationView;
pub use patient::{display_name, Gender, PatientView};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("FHIR server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid FHIR response: {0}")]
    InvalidResponse(String),

    #[error("translation error: {0}")]
    Translation(String),
}

impl FhirError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FhirError::Status { status, .. } if *status == reqwest::StatusCode::NOT_FOUND)
    }
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Deserialize a resource of the expected `resourceType` into a typed view.
pub(crate) fn parse_resource<T: DeserializeOwned>(value: &Value, expected: &str) -> FhirResult<T> {
    let actual = value.get("resourceType").and_then(Value::as_str);
    if actual != Some(expected) {
        return Err(FhirError::InvalidInput(format!(
            "Expected resourceType '{expected}', got '{}'",
            actual.unwrap_or("<none>")
        )));
    }

    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        FhirError::Translation(format!(
            "{expected} schema mismatch at {path}: {}",
            err.into_inner()
        ))
    })
}
