use crate::datatypes::{CodeableConcept, Quantity, Reference};
use crate::{parse_resource, FhirResult};
use serde::Deserialize;
use serde_json::Value;

/// Elements of a FHIR `Observation` resource.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ObservationView {
    pub id: String,

    #[serde(default)]
    pub code: CodeableConcept,

    pub encounter: Option<Reference>,

    #[serde(rename = "effectiveDateTime")]
    pub effective_date_time: Option<String>,

    #[serde(rename = "valueString")]
    pub value_string: Option<String>,

    #[serde(rename = "valueQuantity")]
    pub value_quantity: Option<Quantity>,
}

impl ObservationView {
    pub fn parse(value: &Value) -> FhirResult<Self> {
        parse_resource(value, "Observation")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FhirError;
    use serde_json::json;

    #[test]
    fn reads_text_and_quantity_values() {
        let note = ObservationView::parse(&json!({
            "resourceType": "Observation",
            "id": "o-1",
            "code": { "coding": [{ "code": "162169AAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", "display": "Text of encounter note" }] },
            "encounter": { "reference": "Encounter/e-1" },
            "effectiveDateTime": "2025-01-02T10:00:00+00:00",
            "valueString": "Hello 1"
        }))
        .expect("parse");
        assert_eq!(note.value_string.as_deref(), Some("Hello 1"));
        assert!(note.code.is_labelled("Text of encounter note"));

        let vital = ObservationView::parse(&json!({
            "resourceType": "Observation",
            "id": "o-2",
            "valueQuantity": { "value": 37.0, "unit": "DEG C" }
        }))
        .expect("parse");
        assert_eq!(vital.value_quantity.and_then(|q| q.value), Some(37.0));
    }

    #[test]
    fn value_string_must_be_text() {
        let err = ObservationView::parse(&json!({
            "resourceType": "Observation",
            "id": "o-3",
            "valueString": 12
        }))
        .expect_err("number is not a string");
        assert!(matches!(err, FhirError::Translation(_)));
    }
}
