//! Temperature chart stored as JSON documents in CouchDB.

use crate::config::CouchDbCredentials;
use crate::constants::{DOCUMENT_TYPE_PATIENT, DOCUMENT_TYPE_TEMPERATURE};
use crate::{LabError, LabResult};
use chrono::NaiveDateTime;
use couchdb::{CouchDbClient, Document};
use hie_types::NonEmptyText;
use serde::Serialize;
use serde_json::{json, Value};

/// Format of the `time` field of the temperature documents.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TemperatureRecord {
    pub time: String,
    pub temperature: f64,
}

/// Service behind the CouchDB lab.
#[derive(Clone, Debug)]
pub struct DocumentChartService {
    client: CouchDbClient,
    collection: String,
}

impl DocumentChartService {
    pub fn new(config: &CouchDbCredentials) -> Self {
        Self {
            client: config.client(),
            collection: config.collection.clone(),
        }
    }

    /// Create the database of the lab if it does not exist yet.
    pub async fn initialize(&self) -> LabResult<()> {
        let databases = self.client.list_databases().await?;
        if databases.iter().any(|db| *db == self.collection) {
            tracing::debug!("CouchDB database {} already exists", self.collection);
        } else {
            tracing::info!("creating CouchDB database {}", self.collection);
            self.client.create_database(&self.collection).await?;
        }
        Ok(())
    }

    pub async fn create_patient(&self, name: &NonEmptyText) -> LabResult<String> {
        let document = json!({
            "type": DOCUMENT_TYPE_PATIENT,
            "name": name.as_str(),
        });
        Ok(self.client.add_document(&self.collection, &document).await?)
    }

    /// Store one measurement, timestamped with the current local time of the server.
    pub async fn record_temperature(&self, patient_id: &str, temperature: f64) -> LabResult<String> {
        let now = chrono::Local::now().naive_local();
        let document = temperature_document(patient_id, temperature, &now)?;
        Ok(self.client.add_document(&self.collection, &document).await?)
    }

    pub async fn list_patients(&self) -> LabResult<Vec<PatientSummary>> {
        let documents = self
            .client
            .find(&self.collection, json!({ "type": DOCUMENT_TYPE_PATIENT }))
            .await?;
        Ok(documents.iter().filter_map(patient_summary).collect())
    }

    /// Temperatures of one patient, sorted by increasing time.
    pub async fn list_temperatures(&self, patient_id: &str) -> LabResult<Vec<TemperatureRecord>> {
        let documents = self
            .client
            .find(
                &self.collection,
                json!({
                    "type": DOCUMENT_TYPE_TEMPERATURE,
                    "patient_id": patient_id,
                }),
            )
            .await?;
        let mut records: Vec<TemperatureRecord> =
            documents.iter().filter_map(temperature_record).collect();
        records.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(records)
    }
}

pub(crate) fn temperature_document(
    patient_id: &str,
    temperature: f64,
    time: &NaiveDateTime,
) -> LabResult<Value> {
    if !temperature.is_finite() {
        return Err(LabError::InvalidInput(
            "temperature must be a finite number".into(),
        ));
    }
    Ok(json!({
        "type": DOCUMENT_TYPE_TEMPERATURE,
        "patient_id": patient_id,
        "temperature": temperature,
        "time": time.format(TIME_FORMAT).to_string(),
    }))
}

fn patient_summary(document: &Document) -> Option<PatientSummary> {
    let summary = PatientSummary {
        id: document.get("_id")?.as_str()?.to_string(),
        name: document.get("name")?.as_str()?.to_string(),
    };
    Some(summary)
}

fn temperature_record(document: &Document) -> Option<TemperatureRecord> {
    let record = TemperatureRecord {
        time: document.get("time")?.as_str()?.to_string(),
        temperature: document.get("temperature")?.as_f64()?,
    };
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn document(value: Value) -> Document {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn temperature_document_has_microsecond_time() {
        let time = NaiveDate::from_ymd_opt(2025, 3, 1)
            .and_then(|d| d.and_hms_micro_opt(14, 15, 16, 42))
            .expect("valid date");
        let doc = temperature_document("p-1", 37.2, &time).expect("finite");
        assert_eq!(
            doc,
            json!({
                "type": "temperature",
                "patient_id": "p-1",
                "temperature": 37.2,
                "time": "2025-03-01T14:15:16.000042"
            })
        );
        assert!(NaiveDateTime::parse_from_str(
            doc["time"].as_str().expect("time"),
            TIME_FORMAT
        )
        .is_ok());
    }

    #[test]
    fn infinite_temperature_is_rejected() {
        let now = chrono::Local::now().naive_local();
        assert!(matches!(
            temperature_document("p-1", f64::INFINITY, &now),
            Err(LabError::InvalidInput(_))
        ));
    }

    #[test]
    fn documents_are_summarised() {
        let patient = document(json!({ "_id": "a1", "_rev": "1-x", "type": "patient", "name": "Alice" }));
        assert_eq!(
            patient_summary(&patient),
            Some(PatientSummary { id: "a1".into(), name: "Alice".into() })
        );
        assert_eq!(patient_summary(&document(json!({ "_id": "a2" }))), None);

        let temperature = document(json!({ "time": "2025-03-01T14:15:16.000000", "temperature": 37 }));
        assert_eq!(
            temperature_record(&temperature),
            Some(TemperatureRecord { time: "2025-03-01T14:15:16.000000".into(), temperature: 37.0 })
        );
    }
}
