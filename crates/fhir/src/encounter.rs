use crate::datatypes::{CodeableConcept, Period, Reference};
use crate::{parse_resource, FhirResult};
use serde::Deserialize;
use serde_json::Value;

/// Elements of a FHIR `Encounter` resource.
///
/// OpenMRS maps both its visits and its encounters to `Encounter`; encounters point to
/// their visit through `partOf`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EncounterView {
    pub id: String,

    #[serde(rename = "partOf")]
    pub part_of: Option<Reference>,

    pub subject: Option<Reference>,

    pub period: Option<Period>,

    #[serde(rename = "type", default)]
    pub type_: Vec<CodeableConcept>,
}

impl EncounterView {
    pub fn parse(value: &Value) -> FhirResult<Self> {
        parse_resource(value, "Encounter")
    }

    pub fn start(&self) -> Option<&str> {
        self.period.as_ref()?.start.as_deref()
    }

    /// True when one of the type codings comes from `system`.
    pub fn has_type_system(&self, system: &str) -> bool {
        self.type_
            .iter()
            .flat_map(|t| t.coding.iter())
            .any(|c| c.system.as_deref() == Some(system))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_visit_link_and_period() {
        let value = json!({
            "resourceType": "Encounter",
            "id": "enc-1",
            "partOf": { "reference": "Encounter/visit-1" },
            "subject": { "reference": "Patient/p-1" },
            "period": { "start": "2018-03-01T00:00:00+00:00" },
            "type": [{ "coding": [{ "system": "http://fhir.openmrs.org/code-system/encounter-type", "display": "Visit Note" }] }]
        });
        let encounter = EncounterView::parse(&value).expect("parse");
        assert_eq!(encounter.part_of.as_ref().and_then(Reference::id), Some("visit-1"));
        assert_eq!(encounter.start(), Some("2018-03-01T00:00:00+00:00"));
        assert!(encounter.has_type_system("http://fhir.openmrs.org/code-system/encounter-type"));
        assert!(!encounter.has_type_system("http://fhir.openmrs.org/code-system/visit-type"));
    }
}
