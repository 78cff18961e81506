//! Back end of a minimal DICOMweb viewer: study, series and instance lookups, and rendering.

use crate::config::DicomWebConfig;
use crate::{LabError, LabResult};
use dicomweb::{integer_value, string_value, tags, DicomWebClient, DicomWebError};
use serde::Serialize;
use serde_json::Value;

/// Criteria of a study search; empty criteria are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StudyQuery {
    pub patient_id: String,
    pub patient_name: String,
    pub study_description: String,
}

impl StudyQuery {
    fn filters(&self) -> Vec<(&'static str, &str)> {
        [
            ("PatientID", self.patient_id.as_str()),
            ("PatientName", self.patient_name.as_str()),
            ("StudyDescription", self.study_description.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudySummary {
    #[serde(rename = "patient-id")]
    pub patient_id: String,
    #[serde(rename = "patient-name")]
    pub patient_name: String,
    #[serde(rename = "study-description")]
    pub study_description: String,
    #[serde(rename = "study-instance-uid")]
    pub study_instance_uid: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub modality: String,
    #[serde(rename = "series-description")]
    pub series_description: String,
    #[serde(rename = "series-instance-uid")]
    pub series_instance_uid: String,
}

/// Service behind the DICOMweb lab.
#[derive(Clone, Debug)]
pub struct ImagingService {
    client: DicomWebClient,
}

impl ImagingService {
    pub fn new(config: &DicomWebConfig) -> Self {
        Self {
            client: config.client(),
        }
    }

    pub async fn lookup_studies(&self, query: &StudyQuery) -> LabResult<Vec<StudySummary>> {
        let studies = self.client.search_studies(&query.filters()).await?;
        Ok(studies.iter().map(study_summary).collect())
    }

    /// # Errors
    ///
    /// Returns [`LabError::NotFound`] if the study has no series.
    pub async fn lookup_series(&self, study_uid: &str) -> LabResult<Vec<SeriesSummary>> {
        let series = self.client.search_series(study_uid).await?;
        if series.is_empty() {
            return Err(LabError::NotFound(format!("no series in study {study_uid}")));
        }
        Ok(series.iter().map(series_summary).collect())
    }

    /// SOP instance UIDs of a series, in increasing instance number.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::NotFound`] if the series has no instance.
    pub async fn lookup_instances(&self, study_uid: &str, series_uid: &str) -> LabResult<Vec<String>> {
        let instances = self.client.search_instances(study_uid, series_uid).await?;
        if instances.is_empty() {
            return Err(LabError::NotFound(format!(
                "no instance in series {series_uid}"
            )));
        }
        Ok(sorted_sop_instance_uids(&instances))
    }

    /// PNG rendering of one instance.
    pub async fn render_instance(
        &self,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
    ) -> LabResult<Vec<u8>> {
        self.client
            .render_instance(study_uid, series_uid, sop_uid)
            .await
            .map_err(|e| match e {
                DicomWebError::NotFound(what) => LabError::NotFound(what),
                other => LabError::DicomWeb(other),
            })
    }
}

fn study_summary(dataset: &Value) -> StudySummary {
    StudySummary {
        patient_id: string_value(dataset, tags::PATIENT_ID),
        patient_name: string_value(dataset, tags::PATIENT_NAME),
        study_description: string_value(dataset, tags::STUDY_DESCRIPTION),
        study_instance_uid: string_value(dataset, tags::STUDY_INSTANCE_UID),
    }
}

fn series_summary(dataset: &Value) -> SeriesSummary {
    SeriesSummary {
        modality: string_value(dataset, tags::MODALITY),
        series_description: string_value(dataset, tags::SERIES_DESCRIPTION),
        series_instance_uid: string_value(dataset, tags::SERIES_INSTANCE_UID),
    }
}

/// Instances without an instance number sort as number 1; equal numbers keep the server
/// order.
fn sorted_sop_instance_uids(instances: &[Value]) -> Vec<String> {
    let mut numbered: Vec<(i64, String)> = instances
        .iter()
        .map(|dataset| {
            (
                integer_value(dataset, tags::INSTANCE_NUMBER).unwrap_or(1),
                string_value(dataset, tags::SOP_INSTANCE_UID),
            )
        })
        .collect();
    numbered.sort_by_key(|(number, _)| *number);
    numbered.into_iter().map(|(_, uid)| uid).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instance(sop: &str, number: Option<Value>) -> Value {
        let mut dataset = json!({
            (tags::SOP_INSTANCE_UID): { "vr": "UI", "Value": [sop] }
        });
        if let Some(number) = number {
            dataset[tags::INSTANCE_NUMBER] = json!({ "vr": "IS", "Value": [number] });
        }
        dataset
    }

    #[test]
    fn empty_criteria_are_not_sent() {
        let query = StudyQuery {
            patient_id: String::new(),
            patient_name: "BRAINIX".into(),
            study_description: String::new(),
        };
        assert_eq!(query.filters(), vec![("PatientName", "BRAINIX")]);
        assert!(StudyQuery::default().filters().is_empty());
    }

    #[test]
    fn summarises_study() {
        let dataset = json!({
            (tags::PATIENT_ID): { "vr": "LO", "Value": ["5Yp0E"] },
            (tags::PATIENT_NAME): { "vr": "PN", "Value": [{ "Alphabetic": "BRAINIX" }] },
            (tags::STUDY_INSTANCE_UID): { "vr": "UI", "Value": ["2.16.840.1.113669"] }
        });
        assert_eq!(
            study_summary(&dataset),
            StudySummary {
                patient_id: "5Yp0E".into(),
                patient_name: "BRAINIX".into(),
                study_description: String::new(),
                study_instance_uid: "2.16.840.1.113669".into(),
            }
        );
    }

    #[test]
    fn summarises_series() {
        let dataset = json!({
            (tags::MODALITY): { "vr": "CS", "Value": ["CT"] },
            (tags::SERIES_DESCRIPTION): { "vr": "LO", "Value": ["Abdomen"] },
            (tags::SERIES_INSTANCE_UID): { "vr": "UI", "Value": ["1.2.3"] }
        });
        let summary = series_summary(&dataset);
        assert_eq!(summary.modality, "CT");
        assert_eq!(summary.series_description, "Abdomen");
        assert_eq!(summary.series_instance_uid, "1.2.3");
    }

    #[test]
    fn instances_sort_by_number_with_missing_as_one() {
        let instances = vec![
            instance("c", Some(json!(3))),
            instance("a", None),
            instance("b", Some(json!("2"))),
            instance("z", Some(json!(1))),
            instance("d", Some(json!(-1))),
        ];
        assert_eq!(sorted_sop_instance_uids(&instances), vec!["d", "a", "z", "b", "c"]);
    }
}
