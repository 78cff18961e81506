//! OpenMRS REST boundary support.
//!
//! This crate provides:
//! - [`OpenMrsClient`], a client for the OpenMRS REST web services (`/ws/rest/v1`)
//! - date/time helpers matching the formats accepted by OpenMRS
//! - skeletons of the FHIR resources understood by the OpenMRS `fhir2` module
//!
//! The default names below match the OpenMRS Reference Application 2.13.

pub mod client;
pub mod datetime;
pub mod fhir_json;

pub use client::{EncounterOptions, OpenMrsClient};
pub use datetime::{format_date_time, format_now, keep_only_date, parse_date_time};

use thiserror::Error;

/// Display name of the identifier type generated by OpenMRS for every patient.
pub const OPENMRS_ID: &str = "OpenMRS ID";
/// Identifier type used to store identifiers coming from external systems.
pub const CUSTOM_IDENTIFIER_TYPE: &str = "Old Identification Number";
pub const DEFAULT_LOCATION: &str = "Unknown Location";
pub const DEFAULT_PROVIDER: &str = "UNKNOWN - Super User";
pub const DEFAULT_ROLE: &str = "Unknown";
pub const DEFAULT_VISIT_TYPE: &str = "Facility Visit";

/// Encounter type → form used when no form is given explicitly.
pub const DEFAULT_FORMS: &[(&str, &str)] = &[("Vitals", "Vitals"), ("Visit Note", "Visit Note")];

pub const VISIT_TYPE_SYSTEM: &str = "http://fhir.openmrs.org/code-system/visit-type";
pub const ENCOUNTER_TYPE_SYSTEM: &str = "http://fhir.openmrs.org/code-system/encounter-type";
pub const IDENTIFIER_LOCATION_EXTENSION: &str =
    "http://fhir.openmrs.org/ext/patient/identifier#location";

/// Return the default form associated with an encounter type, if any.
pub fn default_form(encounter_type: &str) -> Option<&'static str> {
    DEFAULT_FORMS
        .iter()
        .find(|(kind, _)| *kind == encounter_type)
        .map(|(_, form)| *form)
}

/// Errors returned by the `openmrs` boundary crate.
#[derive(Debug, Error)]
pub enum OpenMrsError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenMRS returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("invalid OpenMRS response: {0}")]
    InvalidResponse(String),

    #[error("no entity with display name \"{display}\" in table \"{table}\"")]
    UnknownEntity { table: String, display: String },

    #[error("unknown concept: {0}")]
    UnknownConcept(String),

    #[error("patient identifier should be unique: {0}")]
    DuplicateIdentifier(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),
}

impl OpenMrsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, OpenMrsError::Status { status, .. } if *status == reqwest::StatusCode::NOT_FOUND)
    }
}

/// Type alias for Results that can fail with an [`OpenMrsError`].
pub type OpenMrsResult<T> = Result<T, OpenMrsError>;
