//! Temperature chart stored as openEHR compositions in EHRbase.
//!
//! Each patient owns one EHR holding a `MonitoredPatient.v0` composition with the patient
//! name; every measurement is a `Basic.v0` composition of the same EHR. Listings only
//! consider compositions whose composer is the one configured for this process, so that
//! several deployments can share one EHRbase server.

use crate::config::EhrbaseConfig;
use crate::constants::*;
use crate::{LabError, LabResult};
use hie_types::NonEmptyText;
use openehr::{CompositionFormat, FlatComposition, OpenEhrClient};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

const COMPOSITIONS_BY_COMPOSER: &str = "SELECT e/ehr_id/value, c/uid/value \
     FROM EHR e CONTAINS COMPOSITION c \
     WHERE c/archetype_details/template_id/value = $templateId \
     AND c/composer/name = $composer";

const COMPOSITIONS_OF_EHR_BY_COMPOSER: &str = "SELECT e/ehr_id/value, c/uid/value \
     FROM EHR e CONTAINS COMPOSITION c \
     WHERE e/ehr_id/value = $ehrId \
     AND c/archetype_details/template_id/value = $templateId \
     AND c/composer/name = $composer";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonitoredPatient {
    #[serde(rename = "ehr-id")]
    pub ehr_id: String,
    #[serde(rename = "patient-name")]
    pub patient_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TemperatureRecord {
    pub time: String,
    pub temperature: f64,
}

/// Service behind the EHRbase lab.
#[derive(Clone, Debug)]
pub struct TemperatureChartService {
    client: OpenEhrClient,
    composer: String,
    template_dir: PathBuf,
}

impl TemperatureChartService {
    pub fn new(config: &EhrbaseConfig) -> Self {
        Self {
            client: config.server.client(),
            composer: config.composer.clone(),
            template_dir: config.template_dir.clone(),
        }
    }

    pub fn composer(&self) -> &str {
        &self.composer
    }

    /// Install the templates used by the lab. Templates already known to EHRbase are left
    /// untouched, so calling this twice is harmless.
    pub async fn initialize(&self) -> LabResult<()> {
        let installed = self.client.list_templates().await?;
        for template_id in OPENEHR_TEMPLATES {
            if installed.iter().any(|t| t == template_id) {
                tracing::debug!("openEHR template {} already installed", template_id);
                continue;
            }
            let path = self.template_dir.join(format!("{template_id}.opt"));
            tracing::info!("installing openEHR template {}", path.display());
            self.client.add_template(&path).await?;
        }
        Ok(())
    }

    /// Create an EHR for a new patient and return its identifier.
    pub async fn create_patient(&self, patient_name: &NonEmptyText) -> LabResult<String> {
        let ehr_id = self.client.create_ehr().await?;
        let composition = patient_composition(&self.composer, patient_name.as_str());
        self.client
            .add_composition(
                &ehr_id,
                MONITORED_PATIENT_TEMPLATE_ID,
                &Value::Object(composition),
                CompositionFormat::SimplifiedJsonFlat,
            )
            .await?;
        tracing::info!("created EHR {}", ehr_id);
        Ok(ehr_id)
    }

    /// Store one measurement and return the identifier of the new composition.
    pub async fn record_temperature(
        &self,
        ehr_id: &str,
        temperature: f64,
        time: &str,
    ) -> LabResult<String> {
        let composition = temperature_composition(&self.composer, temperature, time)?;
        let uid = self
            .client
            .add_composition(
                ehr_id,
                BASIC_TEMPLATE_ID,
                &Value::Object(composition),
                CompositionFormat::SimplifiedJsonFlat,
            )
            .await?;
        Ok(uid)
    }

    pub async fn list_patients(&self) -> LabResult<Vec<MonitoredPatient>> {
        let rows = self
            .client
            .query_rows(
                COMPOSITIONS_BY_COMPOSER,
                self.params(MONITORED_PATIENT_TEMPLATE_ID, None),
            )
            .await?;

        let mut patients = Vec::with_capacity(rows.len());
        for (ehr_id, uid) in ehr_and_composition_ids(rows)? {
            let stored = self.client.get_flat_composition(&ehr_id, &uid).await?;
            match stored.str_field(PATIENT_NAME) {
                Some(name) => patients.push(MonitoredPatient {
                    ehr_id,
                    patient_name: name.to_string(),
                }),
                None => tracing::warn!("composition {} has no patient name", uid),
            }
        }
        Ok(patients)
    }

    /// Temperatures recorded in one EHR, sorted by increasing time.
    pub async fn list_temperatures(&self, ehr_id: &str) -> LabResult<Vec<TemperatureRecord>> {
        let rows = self
            .client
            .query_rows(
                COMPOSITIONS_OF_EHR_BY_COMPOSER,
                self.params(BASIC_TEMPLATE_ID, Some(ehr_id)),
            )
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for (ehr_id, uid) in ehr_and_composition_ids(rows)? {
            let stored = self.client.get_flat_composition(&ehr_id, &uid).await?;
            match (
                stored.f64_field(BASIC_TEMPERATURE_MAGNITUDE),
                stored.str_field(BASIC_TEMPERATURE_TIME),
            ) {
                (Some(temperature), Some(time)) => records.push(TemperatureRecord {
                    time: time.to_string(),
                    temperature,
                }),
                _ => tracing::warn!("composition {} has no temperature", uid),
            }
        }
        sort_by_time(&mut records);
        Ok(records)
    }

    fn params(&self, template_id: &str, ehr_id: Option<&str>) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("templateId".into(), Value::from(template_id));
        params.insert("composer".into(), Value::from(self.composer.as_str()));
        if let Some(ehr_id) = ehr_id {
            params.insert("ehrId".into(), Value::from(ehr_id));
        }
        params
    }
}

pub(crate) fn patient_composition(composer: &str, patient_name: &str) -> FlatComposition {
    let mut composition = Map::new();
    composition.insert(PATIENT_TERRITORY_CODE.into(), Value::from(TERRITORY_CODE));
    composition.insert(
        PATIENT_TERRITORY_TERMINOLOGY.into(),
        Value::from(TERRITORY_TERMINOLOGY),
    );
    composition.insert(PATIENT_COMPOSER.into(), Value::from(composer));
    composition.insert(PATIENT_NAME.into(), Value::from(patient_name));
    composition
}

pub(crate) fn temperature_composition(
    composer: &str,
    temperature: f64,
    time: &str,
) -> LabResult<FlatComposition> {
    let magnitude = serde_json::Number::from_f64(temperature)
        .ok_or_else(|| LabError::InvalidInput("temperature must be a finite number".into()))?;

    let mut composition = Map::new();
    composition.insert(BASIC_COMPOSER.into(), Value::from(composer));
    composition.insert(BASIC_TEMPERATURE_MAGNITUDE.into(), Value::Number(magnitude));
    composition.insert(BASIC_TEMPERATURE_TIME.into(), Value::from(time));
    composition.insert(BASIC_TEMPERATURE_UNIT.into(), Value::from(TEMPERATURE_UNIT));
    composition.insert(BASIC_TERRITORY_CODE.into(), Value::from(TERRITORY_CODE));
    composition.insert(
        BASIC_TERRITORY_TERMINOLOGY.into(),
        Value::from(TERRITORY_TERMINOLOGY),
    );
    Ok(composition)
}

/// Read `(ehr id, composition uid)` pairs from the rows of the listing queries.
fn ehr_and_composition_ids(rows: Vec<Vec<Value>>) -> LabResult<Vec<(String, String)>> {
    rows.into_iter()
        .map(|row| match row.as_slice() {
            [Value::String(ehr_id), Value::String(uid), ..] => Ok((ehr_id.clone(), uid.clone())),
            other => Err(LabError::OpenEhr(openehr::OpenEhrError::InvalidResponse(
                format!("unexpected AQL row: {other:?}"),
            ))),
        })
        .collect()
}

fn sort_by_time(records: &mut [TemperatureRecord]) {
    records.sort_by(|a, b| a.time.cmp(&b.time));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patient_composition_has_the_flat_fields() {
        let composition = patient_composition("nurse", "John Doe");
        assert_eq!(
            Value::Object(composition),
            json!({
                "monitoredpatient.v0/territory|code": "BE",
                "monitoredpatient.v0/territory|terminology": "ISO_3166-1",
                "monitoredpatient.v0/composer|name": "nurse",
                "monitoredpatient.v0/demographics_container/person/name": "John Doe"
            })
        );
    }

    #[test]
    fn temperature_composition_has_the_flat_fields() {
        let composition =
            temperature_composition("nurse", 37.5, "2025-01-02T10:00:00").expect("finite");
        assert_eq!(composition["basic/composer|name"], json!("nurse"));
        assert_eq!(composition["basic/temperature/temperature|magnitude"], json!(37.5));
        assert_eq!(composition["basic/temperature/temperature|unit"], json!("Cel"));
        assert_eq!(composition["basic/temperature/time"], json!("2025-01-02T10:00:00"));
        assert_eq!(composition["basic/territory|code"], json!("BE"));
        assert_eq!(composition["basic/territory|terminology"], json!("ISO_3166-1"));
        assert_eq!(composition.len(), 6);
    }

    #[test]
    fn non_finite_temperature_is_rejected() {
        assert!(matches!(
            temperature_composition("nurse", f64::NAN, "2025-01-02T10:00:00"),
            Err(LabError::InvalidInput(_))
        ));
    }

    #[test]
    fn rows_are_read_as_pairs() {
        let rows = vec![vec![json!("ehr-1"), json!("uid-1::local::1")]];
        assert_eq!(
            ehr_and_composition_ids(rows).expect("valid"),
            vec![("ehr-1".to_string(), "uid-1::local::1".to_string())]
        );
        assert!(ehr_and_composition_ids(vec![vec![json!(1)]]).is_err());
    }

    #[test]
    fn temperatures_sort_by_time() {
        let mut records = vec![
            TemperatureRecord { time: "2025-01-03T08:00:00".into(), temperature: 37.0 },
            TemperatureRecord { time: "2025-01-01T08:00:00".into(), temperature: 38.0 },
            TemperatureRecord { time: "2025-01-02T08:00:00".into(), temperature: 39.0 },
        ];
        sort_by_time(&mut records);
        let temperatures: Vec<f64> = records.iter().map(|r| r.temperature).collect();
        assert_eq!(temperatures, vec![38.0, 39.0, 37.0]);
    }
}
