//! Constants shared by the lab services.
//!
//! Template identifiers, FLAT paths and concept names are fixed by the clinical models
//! installed on the upstream servers; keeping them here avoids typos drifting between
//! writers and readers of the same compositions.

// ============================================================================
// openEHR
// ============================================================================

/// Template of the compositions holding one temperature measurement.
pub const BASIC_TEMPLATE_ID: &str = "Basic.v0";

/// Template of the compositions holding the demographics of a monitored patient.
pub const MONITORED_PATIENT_TEMPLATE_ID: &str = "MonitoredPatient.v0";

/// Templates installed on EHRbase at startup (`<id>.opt` in the template directory).
pub const OPENEHR_TEMPLATES: &[&str] = &[BASIC_TEMPLATE_ID, MONITORED_PATIENT_TEMPLATE_ID];

pub const TERRITORY_CODE: &str = "BE";
pub const TERRITORY_TERMINOLOGY: &str = "ISO_3166-1";
pub const TEMPERATURE_UNIT: &str = "Cel";

pub const PATIENT_TERRITORY_CODE: &str = "monitoredpatient.v0/territory|code";
pub const PATIENT_TERRITORY_TERMINOLOGY: &str = "monitoredpatient.v0/territory|terminology";
pub const PATIENT_COMPOSER: &str = "monitoredpatient.v0/composer|name";
pub const PATIENT_NAME: &str = "monitoredpatient.v0/demographics_container/person/name";

pub const BASIC_TERRITORY_CODE: &str = "basic/territory|code";
pub const BASIC_TERRITORY_TERMINOLOGY: &str = "basic/territory|terminology";
pub const BASIC_COMPOSER: &str = "basic/composer|name";
pub const BASIC_TEMPERATURE_MAGNITUDE: &str = "basic/temperature/temperature|magnitude";
pub const BASIC_TEMPERATURE_UNIT: &str = "basic/temperature/temperature|unit";
pub const BASIC_TEMPERATURE_TIME: &str = "basic/temperature/time";

// ============================================================================
// CouchDB
// ============================================================================

pub const DOCUMENT_TYPE_PATIENT: &str = "patient";
pub const DOCUMENT_TYPE_TEMPERATURE: &str = "temperature";

// ============================================================================
// OpenMRS
// ============================================================================

pub const CONCEPT_TEMPERATURE: &str = "Temperature (c)";
pub const CONCEPT_WEIGHT: &str = "Weight (kg)";
pub const CONCEPT_ENCOUNTER_NOTE: &str = "Text of encounter note";

pub const ENCOUNTER_TYPE_VISIT_NOTE: &str = "Visit Note";

/// LOINC code → OpenMRS concept name, for the observations accepted in `ORU^R01`.
pub const LOINC_CONCEPTS: &[(&str, &str)] = &[
    ("8310-5", CONCEPT_TEMPERATURE),
    ("3141-9", CONCEPT_WEIGHT),
    ("11488-4", CONCEPT_ENCOUNTER_NOTE),
];

/// Concept name associated with a LOINC code, if the code is supported.
pub fn concept_for_loinc(code: &str) -> Option<&'static str> {
    LOINC_CONCEPTS
        .iter()
        .find(|(loinc, _)| *loinc == code)
        .map(|(_, concept)| *concept)
}
