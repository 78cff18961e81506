//! FHIR general-purpose data types, limited to the elements read by the views.

use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Coding {
    pub system: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    pub text: Option<String>,
}

impl CodeableConcept {
    /// True when `text` or the display of one coding equals `label`.
    pub fn is_labelled(&self, label: &str) -> bool {
        self.text.as_deref() == Some(label)
            || self.coding.iter().any(|c| c.display.as_deref() == Some(label))
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Reference {
    pub reference: Option<String>,
    pub display: Option<String>,
}

impl Reference {
    /// Logical id of the target, e.g. `abc` for `Encounter/abc`.
    pub fn id(&self) -> Option<&str> {
        let reference = self.reference.as_deref()?;
        Some(reference.rsplit('/').next().unwrap_or(reference))
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Period {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct HumanName {
    pub family: Option<String>,
    #[serde(default)]
    pub given: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub type_: Option<CodeableConcept>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Quantity {
    pub value: Option<f64>,
    pub unit: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_id_strips_resource_type() {
        let r = Reference {
            reference: Some("Encounter/7c1b".into()),
            display: None,
        };
        assert_eq!(r.id(), Some("7c1b"));
        assert_eq!(Reference::default().id(), None);
    }

    #[test]
    fn concept_label_matches_text_or_display() {
        let by_text = CodeableConcept {
            coding: vec![],
            text: Some("OpenMRS ID".into()),
        };
        let by_display = CodeableConcept {
            coding: vec![Coding {
                display: Some("OpenMRS ID".into()),
                ..Coding::default()
            }],
            text: None,
        };
        assert!(by_text.is_labelled("OpenMRS ID"));
        assert!(by_display.is_labelled("OpenMRS ID"));
        assert!(!CodeableConcept::default().is_labelled("OpenMRS ID"));
    }
}
