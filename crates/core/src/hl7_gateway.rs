//! HL7v2 gateway to OpenMRS.
//!
//! Supported messages:
//! - `ADT^A04` (register a patient): the patient is created when unknown, then a visit is
//!   started when the patient has none
//! - `ORU^R01` (unsolicited observations): one encounter is added to the first visit of the
//!   patient, with one observation per `OBX` segment
//!
//! Every parseable message is acknowledged; failures are reported with an `AE` code rather
//! than an HTTP error.

use crate::config::Hl7Config;
use crate::constants::concept_for_loinc;
use crate::{LabError, LabResult};
use hl7::{AckCode, LocalEndpoint, Message, MessageIdGenerator};
use openmrs::{EncounterOptions, OpenMrsClient, DEFAULT_LOCATION, DEFAULT_VISIT_TYPE};
use serde::Serialize;
use serde_json::Value;

/// Patient and visit known to OpenMRS for an external identifier.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientVisit {
    #[serde(rename = "patient-uuid")]
    pub patient_uuid: String,
    #[serde(rename = "visit-uuid")]
    pub visit_uuid: String,
}

// ============================================================================
// Message content
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Registration {
    pub custom_id: String,
    pub family_name: String,
    pub given_name: String,
    /// Birth date in the OpenMRS date/time format.
    pub birth_date: String,
    pub gender: String,
    /// Admission time in the OpenMRS date/time format.
    pub admit_time: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ObservationReport {
    pub custom_id: String,
    pub encounter_type: String,
    /// Concept name → value.
    pub observations: Vec<(String, Value)>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Request {
    Register(Registration),
    Observe(ObservationReport),
}

pub(crate) fn read_request(message: &Message) -> LabResult<Request> {
    let msh = message.header();
    match (msh.component(9, 1), msh.component(9, 2)) {
        ("ADT", "A04") => read_registration(message).map(Request::Register),
        ("ORU", "R01") => read_observation_report(message).map(Request::Observe),
        _ => Err(LabError::InvalidInput(format!(
            "unsupported message type: {}",
            message.message_type()
        ))),
    }
}

fn custom_id(message: &Message) -> LabResult<String> {
    let pid = message
        .segment("PID")
        .ok_or_else(|| LabError::InvalidInput("missing PID segment".into()))?;
    let id = pid.component(3, 1);
    if id.is_empty() {
        return Err(LabError::InvalidInput("missing patient identifier (PID-3)".into()));
    }
    Ok(id.to_string())
}

fn openmrs_date_time(value: &str) -> LabResult<String> {
    let parsed = hl7::dtm::parse_date_time(value)?;
    Ok(openmrs::format_date_time(&parsed))
}

pub(crate) fn read_registration(message: &Message) -> LabResult<Registration> {
    let custom_id = custom_id(message)?;
    let pid = message
        .segment("PID")
        .ok_or_else(|| LabError::InvalidInput("missing PID segment".into()))?;

    let gender = match pid.field(8) {
        "" => "U".to_string(),
        other => other.to_string(),
    };
    let admit_time = match message.segment("PV1").map(|pv1| pv1.field(44)) {
        None | Some("") => None,
        Some(value) => Some(openmrs_date_time(value)?),
    };

    Ok(Registration {
        custom_id,
        family_name: pid.component(5, 1).to_string(),
        given_name: pid.component(5, 2).to_string(),
        birth_date: openmrs_date_time(pid.field(7))?,
        gender,
        admit_time,
    })
}

pub(crate) fn read_observation_report(message: &Message) -> LabResult<ObservationReport> {
    let custom_id = custom_id(message)?;
    let encounter_type = message
        .segment("OBR")
        .map(|obr| obr.component(4, 1))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LabError::InvalidInput("missing encounter type (OBR-4)".into()))?
        .to_string();

    let mut observations = Vec::new();
    for obx in message.segments("OBX") {
        let code = obx.component(3, 1);
        let Some(concept) = concept_for_loinc(code) else {
            tracing::warn!("skipping observation with unsupported code {:?}", code);
            continue;
        };
        let raw = obx.field(5);
        let value = match obx.field(2) {
            "NM" => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| LabError::InvalidInput(format!("invalid numeric value: {raw}")))?,
            _ => Value::from(raw),
        };
        observations.push((concept.to_string(), value));
    }

    Ok(ObservationReport {
        custom_id,
        encounter_type,
        observations,
    })
}

// ============================================================================
// Gateway
// ============================================================================

/// Service behind the HL7 lab.
#[derive(Debug)]
pub struct Hl7Gateway {
    openmrs: OpenMrsClient,
    ids: MessageIdGenerator,
    local: LocalEndpoint,
}

impl Hl7Gateway {
    pub fn new(config: &Hl7Config) -> Self {
        Self {
            openmrs: config.openmrs.client(),
            ids: MessageIdGenerator::new(config.message_id_prefix.clone()),
            local: config.local.clone(),
        }
    }

    /// Process one message and return the encoded acknowledgment.
    ///
    /// # Errors
    ///
    /// Only fails when `body` is not an HL7v2 message ([`LabError::InvalidInput`]); any
    /// processing failure is reported inside the acknowledgment.
    pub async fn handle(&self, body: &[u8]) -> LabResult<String> {
        let message = hl7::parse_message(body)
            .map_err(|e| LabError::InvalidInput(format!("invalid HL7 message: {e}")))?;

        let code = match self.process(&message).await {
            Ok(()) => AckCode::Accept,
            Err(e) => {
                tracing::warn!("HL7 message {} not processed: {}", message.control_id(), e);
                AckCode::Error
            }
        };

        let ack = hl7::build_ack(
            &message,
            code,
            &self.ids.next(),
            &hl7::dtm::format_now(),
            &self.local,
        )?;
        Ok(ack.to_string())
    }

    async fn process(&self, message: &Message) -> LabResult<()> {
        match read_request(message)? {
            Request::Register(registration) => self.register(&registration).await,
            Request::Observe(report) => self.observe(&report).await,
        }
    }

    async fn register(&self, registration: &Registration) -> LabResult<()> {
        let patient_uuid = match self
            .openmrs
            .find_patient_by_custom_id(&registration.custom_id)
            .await?
        {
            Some(uuid) => uuid,
            None => {
                let uuid = self
                    .openmrs
                    .create_patient(
                        &registration.given_name,
                        &registration.family_name,
                        &registration.gender,
                        &registration.birth_date,
                        DEFAULT_LOCATION,
                        std::slice::from_ref(&registration.custom_id),
                    )
                    .await?;
                tracing::info!("registered patient {} as {}", registration.custom_id, uuid);
                uuid
            }
        };

        if self.openmrs.list_visits(&patient_uuid).await?.is_empty() {
            let visit_uuid = self
                .openmrs
                .create_visit(
                    &patient_uuid,
                    DEFAULT_VISIT_TYPE,
                    registration.admit_time.as_deref(),
                )
                .await?;
            tracing::info!("started visit {} for patient {}", visit_uuid, patient_uuid);
        }
        Ok(())
    }

    async fn observe(&self, report: &ObservationReport) -> LabResult<()> {
        let visit = self.find_patient(&report.custom_id).await?;
        let encounter_uuid = self
            .openmrs
            .create_encounter(
                &visit.visit_uuid,
                &report.encounter_type,
                &EncounterOptions::default(),
            )
            .await?;

        for (concept, value) in &report.observations {
            self.openmrs
                .create_observation(&encounter_uuid, concept, value.clone(), None)
                .await?;
        }
        tracing::info!(
            "recorded {} observations in encounter {}",
            report.observations.len(),
            encounter_uuid
        );
        Ok(())
    }

    /// Patient with the given external identifier, together with its first visit.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::NotFound`] if no patient has this identifier or the patient has no
    /// visit.
    pub async fn find_patient(&self, custom_id: &str) -> LabResult<PatientVisit> {
        let patient_uuid = self
            .openmrs
            .find_patient_by_custom_id(custom_id)
            .await?
            .ok_or_else(|| LabError::NotFound(format!("no patient with identifier {custom_id}")))?;
        let visit_uuid = self
            .openmrs
            .list_visits(&patient_uuid)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LabError::NotFound(format!("patient {patient_uuid} has no visit")))?;
        Ok(PatientVisit {
            patient_uuid,
            visit_uuid,
        })
    }
}
