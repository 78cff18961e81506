//! Skeletons of FHIR resources accepted by the OpenMRS `fhir2` module.
//!
//! These builders take already-resolved OpenMRS UUIDs; see the `create_fhir_*` methods of
//! [`crate::OpenMrsClient`] for variants that resolve names first.

use crate::{
    OpenMrsError, OpenMrsResult, ENCOUNTER_TYPE_SYSTEM, IDENTIFIER_LOCATION_EXTENSION, OPENMRS_ID,
    VISIT_TYPE_SYSTEM,
};
use serde_json::{json, Value};

/// FHIR administrative genders accepted by OpenMRS.
pub const FHIR_GENDERS: &[&str] = &["male", "female", "unknown"];

/// Check whether an `Encounter` resource corresponds to an OpenMRS visit.
///
/// OpenMRS exposes both visits and encounters as FHIR `Encounter` resources; visits carry
/// a coding from the visit-type code system.
pub fn is_fhir_encounter_a_visit(resource: &Value) -> OpenMrsResult<bool> {
    if resource.get("resourceType").and_then(Value::as_str) != Some("Encounter") {
        return Err(OpenMrsError::InvalidInput(
            "only Encounter resources can be visits".into(),
        ));
    }

    let codings = resource
        .get("type")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|t| t.get("coding").and_then(Value::as_array))
        .flatten();

    for coding in codings {
        if coding.get("system").and_then(Value::as_str) == Some(VISIT_TYPE_SYSTEM) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Minimal `Patient` resource with an OpenMRS ID bound to a location.
pub fn patient_json(
    given_name: &str,
    family_name: &str,
    gender: &str,
    birth_date: &str,
    location_uuid: &str,
    location_name: &str,
    openmrs_id: &str,
) -> OpenMrsResult<Value> {
    if !FHIR_GENDERS.contains(&gender) {
        return Err(OpenMrsError::InvalidInput(format!(
            "invalid patient gender: {gender}"
        )));
    }

    Ok(json!({
        "resourceType": "Patient",
        "gender": gender,
        "name": [{
            "family": family_name,
            "given": [given_name],
        }],
        "birthDate": birth_date,
        "identifier": [{
            "extension": [{
                "url": IDENTIFIER_LOCATION_EXTENSION,
                "valueReference": {
                    "reference": format!("Location/{location_uuid}"),
                    "type": "Location",
                    "display": location_name,
                },
            }],
            "use": "official",
            "type": { "text": OPENMRS_ID },
            "value": openmrs_id,
        }],
    }))
}

/// `Encounter` resource standing for a visit of the given patient.
pub fn visit_json(
    patient_uuid: &str,
    visit_type_uuid: &str,
    visit_type: &str,
    start_date_time: &str,
) -> Value {
    json!({
        "resourceType": "Encounter",
        "subject": { "reference": format!("Patient/{patient_uuid}") },
        "period": { "start": start_date_time },
        "type": [{
            "coding": [{
                "code": visit_type_uuid,
                "display": visit_type,
                "system": VISIT_TYPE_SYSTEM,
            }],
        }],
    })
}

/// `Encounter` resource nested (`partOf`) in a visit.
pub fn encounter_json(
    patient_uuid: &str,
    visit_uuid: &str,
    encounter_type_uuid: &str,
    encounter_type: &str,
    date_time: &str,
) -> Value {
    json!({
        "resourceType": "Encounter",
        "partOf": { "reference": format!("Encounter/{visit_uuid}") },
        "subject": { "reference": format!("Patient/{patient_uuid}") },
        "period": { "start": date_time },
        "type": [{
            "coding": [{
                "code": encounter_type_uuid,
                "display": encounter_type,
                "system": ENCOUNTER_TYPE_SYSTEM,
            }],
        }],
    })
}

/// `Observation` resource without its `value[x]` field, which the caller fills.
pub fn observation_json(
    patient_uuid: &str,
    encounter_uuid: &str,
    concept_uuid: &str,
    date_time: &str,
) -> Value {
    json!({
        "resourceType": "Observation",
        "code": { "coding": [{ "code": concept_uuid }] },
        "effectiveDateTime": date_time,
        "encounter": { "reference": format!("Encounter/{encounter_uuid}") },
        "status": "final",
        "subject": { "reference": format!("Patient/{patient_uuid}") },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_encounters_are_detected_by_coding_system() {
        let visit = visit_json("p", "vt", "Facility Visit", "2018-03-01T00:00:00");
        assert!(is_fhir_encounter_a_visit(&visit).expect("encounter"));

        let encounter = encounter_json("p", "v", "et", "Vitals", "2018-03-01T00:00:00");
        assert!(!is_fhir_encounter_a_visit(&encounter).expect("encounter"));
    }

    #[test]
    fn visit_check_rejects_other_resources() {
        let patient = json!({ "resourceType": "Patient" });
        assert!(is_fhir_encounter_a_visit(&patient).is_err());
    }

    #[test]
    fn encounter_without_type_is_not_a_visit() {
        let bare = json!({ "resourceType": "Encounter" });
        assert!(!is_fhir_encounter_a_visit(&bare).expect("encounter"));
    }

    #[test]
    fn patient_json_validates_gender() {
        let err = patient_json("A", "B", "F", "2001-01-03", "loc", "Unknown Location", "100J")
            .expect_err("lab code is not a FHIR gender");
        assert!(matches!(err, OpenMrsError::InvalidInput(_)));

        let ok = patient_json("A", "B", "unknown", "2001-01-03", "loc", "Unknown Location", "100J")
            .expect("valid");
        assert_eq!(ok["identifier"][0]["value"], json!("100J"));
        assert_eq!(
            ok["identifier"][0]["extension"][0]["valueReference"]["reference"],
            json!("Location/loc")
        );
        assert_eq!(ok["name"][0]["given"], json!(["A"]));
    }

    #[test]
    fn observation_leaves_value_to_caller() {
        let obs = observation_json("p", "e", "c", "2018-03-01T00:00:00");
        assert_eq!(obs["encounter"]["reference"], json!("Encounter/e"));
        assert!(obs.get("valueString").is_none());
    }
}
