//! Patient resources.
//!
//! Responsibilities:
//! - Parse the elements of a FHIR `Patient` used by the labs
//! - Map administrative gender between FHIR codes and the one-letter codes of the labs
//! - Render a display name

use crate::datatypes::{HumanName, Identifier};
use crate::{parse_resource, FhirError, FhirResult};
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Gender
// ============================================================================

/// FHIR administrative gender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    /// Parse the one-letter code accepted on input by the labs (`F`, `M` or `X`).
    ///
    /// `X` stands for an unspecified gender and maps to `unknown`.
    pub fn from_lab_code(code: &str) -> FhirResult<Self> {
        match code {
            "F" => Ok(Gender::Female),
            "M" => Ok(Gender::Male),
            "X" => Ok(Gender::Unknown),
            other => Err(FhirError::InvalidInput(format!("invalid gender: {other}"))),
        }
    }

    /// One-letter code returned by the labs, as used by OpenMRS (`F`, `M`, `O`, `U`).
    pub fn to_lab_code(self) -> &'static str {
        match self {
            Gender::Female => "F",
            Gender::Male => "M",
            Gender::Other => "O",
            Gender::Unknown => "U",
        }
    }

    /// Convert to FHIR wire format string.
    pub fn to_fhir(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }

    /// Parse from FHIR wire format string.
    pub fn from_fhir(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            "unknown" => Some(Gender::Unknown),
            _ => None,
        }
    }
}

// ============================================================================
// Patient view
// ============================================================================

/// Elements of a FHIR `Patient` resource read by the labs.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PatientView {
    pub id: String,

    #[serde(default)]
    pub name: Vec<HumanName>,

    pub gender: Option<String>,

    #[serde(rename = "birthDate")]
    pub birth_date: Option<String>,

    #[serde(default)]
    pub identifier: Vec<Identifier>,
}

impl PatientView {
    /// Parse a patient resource from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - resourceType is not "Patient",
    /// - any read field has an unexpected type (the error names its path).
    pub fn parse(value: &Value) -> FhirResult<Self> {
        parse_resource(value, "Patient")
    }

    /// Gender of the patient; `Unknown` when absent or unrecognised.
    pub fn gender(&self) -> Gender {
        self.gender
            .as_deref()
            .and_then(Gender::from_fhir)
            .unwrap_or(Gender::Unknown)
    }

    /// Value of the first identifier whose type is labelled `type_label` (e.g. `OpenMRS ID`).
    pub fn identifier_of_type(&self, type_label: &str) -> Option<&str> {
        self.identifier
            .iter()
            .find(|i| i.type_.as_ref().is_some_and(|t| t.is_labelled(type_label)))
            .and_then(|i| i.value.as_deref())
    }
}

/// Display name of a patient: the given names then the family name of the first name entry.
pub fn display_name(patient: &PatientView) -> String {
    let Some(name) = patient.name.first() else {
        return String::new();
    };
    name.given
        .iter()
        .map(String::as_str)
        .chain(name.family.as_deref())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
