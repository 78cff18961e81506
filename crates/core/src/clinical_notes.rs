//! Clinical notes written and read through the FHIR API of OpenMRS.
//!
//! Patients are created as FHIR `Patient` resources together with a visit. Each note is a
//! `Visit Note` encounter, part of the visit, holding one `Text of encounter note`
//! observation. The OpenMRS REST API is only used to resolve metadata names into UUIDs.

use crate::config::FhirCredentials;
use crate::constants::{CONCEPT_ENCOUNTER_NOTE, ENCOUNTER_TYPE_VISIT_NOTE};
use crate::{LabError, LabResult};
use chrono::NaiveDate;
use fhir::{display_name, EncounterView, FhirClient, FhirError, Gender, ObservationView, PatientView};
use hie_types::NonEmptyText;
use openmrs::fhir_json::is_fhir_encounter_a_visit;
use openmrs::{OpenMrsClient, DEFAULT_LOCATION, DEFAULT_VISIT_TYPE, OPENMRS_ID};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Validated content of a patient creation request.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPatient {
    pub given_name: NonEmptyText,
    pub family_name: NonEmptyText,
    pub gender: Gender,
    pub birth_date: NaiveDate,
}

impl NewPatient {
    /// Validate the raw fields of a creation request.
    ///
    /// `gender` is `F`, `M` or `X`; `birth_date` is `YYYY-MM-DD`.
    pub fn parse(
        given_name: &str,
        family_name: &str,
        gender: &str,
        birth_date: &str,
    ) -> LabResult<Self> {
        let invalid = |what: &str| LabError::InvalidInput(what.to_string());
        Ok(Self {
            given_name: NonEmptyText::new(given_name).map_err(|_| invalid("empty given name"))?,
            family_name: NonEmptyText::new(family_name)
                .map_err(|_| invalid("empty family name"))?,
            gender: Gender::from_lab_code(gender)
                .map_err(|_| invalid(&format!("invalid gender: {gender}")))?,
            birth_date: NaiveDate::parse_from_str(birth_date, "%Y-%m-%d")
                .map_err(|_| invalid(&format!("invalid birth date: {birth_date}")))?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreatedPatient {
    #[serde(rename = "patient-uuid")]
    pub patient_uuid: String,
    #[serde(rename = "visit-uuid")]
    pub visit_uuid: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientSummary {
    #[serde(rename = "patient-uuid")]
    pub patient_uuid: String,
    #[serde(rename = "patient-id")]
    pub patient_id: String,
    pub name: String,
    pub gender: String,
    #[serde(rename = "birth-date")]
    pub birth_date: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientHeader {
    pub id: String,
    pub name: String,
    pub gender: String,
    #[serde(rename = "birth-date")]
    pub birth_date: String,
    #[serde(rename = "visit-uuid")]
    pub visit_uuid: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Note {
    pub time: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientNotes {
    pub patient: PatientHeader,
    pub notes: Vec<Note>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordedNote {
    #[serde(rename = "encounter-uuid")]
    pub encounter_uuid: String,
    #[serde(rename = "observation-uuid")]
    pub observation_uuid: String,
}

/// Service behind the FHIR lab.
#[derive(Debug)]
pub struct ClinicalNotesService {
    fhir: FhirClient,
    openmrs: OpenMrsClient,
    note_concept: OnceLock<String>,
}

impl ClinicalNotesService {
    pub fn new(config: &FhirCredentials) -> Self {
        Self {
            fhir: config.client(),
            openmrs: config.openmrs.client(),
            note_concept: OnceLock::new(),
        }
    }

    /// Resolve the metadata used by the lab, failing early when OpenMRS lacks it.
    pub async fn initialize(&self) -> LabResult<()> {
        self.openmrs.lookup_entity("location", DEFAULT_LOCATION).await?;
        self.openmrs
            .lookup_entity("visittype", DEFAULT_VISIT_TYPE)
            .await?;
        self.openmrs
            .lookup_entity("encountertype", ENCOUNTER_TYPE_VISIT_NOTE)
            .await?;
        let concept = self.note_concept().await?;
        tracing::debug!("encounter notes use concept {}", concept);
        Ok(())
    }

    async fn note_concept(&self) -> LabResult<String> {
        if let Some(uuid) = self.note_concept.get() {
            return Ok(uuid.clone());
        }
        let uuid = self.openmrs.lookup_concept(CONCEPT_ENCOUNTER_NOTE).await?;
        Ok(self.note_concept.get_or_init(|| uuid).clone())
    }

    /// Create a patient and start a visit for it.
    pub async fn create_patient(&self, patient: &NewPatient) -> LabResult<CreatedPatient> {
        let resource = self
            .openmrs
            .create_fhir_patient_json(
                patient.given_name.as_str(),
                patient.family_name.as_str(),
                patient.gender.to_fhir(),
                &patient.birth_date.format("%Y-%m-%d").to_string(),
                DEFAULT_LOCATION,
            )
            .await?;
        let patient_uuid = created_id(&self.fhir.upload_resource(&resource).await?)?;

        let visit = self
            .openmrs
            .create_fhir_visit_json(&patient_uuid, DEFAULT_VISIT_TYPE, None)
            .await?;
        let visit_uuid = created_id(&self.fhir.upload_resource(&visit).await?)?;

        tracing::info!("created patient {} with visit {}", patient_uuid, visit_uuid);
        Ok(CreatedPatient {
            patient_uuid,
            visit_uuid,
        })
    }

    /// Search patients by name.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::InvalidInput`] if the query has fewer than 2 characters.
    pub async fn find_patients(&self, query: &str) -> LabResult<Vec<PatientSummary>> {
        let query = query.trim();
        if query.chars().count() < 2 {
            return Err(LabError::InvalidInput(
                "the query must have at least 2 characters".into(),
            ));
        }

        let found = self
            .fhir
            .list_resources("Patient", &[("name", query)], 0)
            .await?;
        found
            .iter()
            .map(|resource| -> LabResult<PatientSummary> {
                let patient = PatientView::parse(resource)?;
                Ok(PatientSummary {
                    patient_uuid: patient.id.clone(),
                    patient_id: patient
                        .identifier_of_type(OPENMRS_ID)
                        .unwrap_or_default()
                        .to_string(),
                    name: display_name(&patient),
                    gender: patient.gender().to_lab_code().to_string(),
                    birth_date: patient.birth_date.clone().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Patient header and notes of the patient's visit, most recent note first.
    pub async fn notes(&self, patient_uuid: &str) -> LabResult<PatientNotes> {
        let patient = self.get_patient(patient_uuid).await?;
        let encounters = self.encounters(patient_uuid).await?;
        let visit_uuid = visit_of(&encounters, patient_uuid)?;

        let visit_encounters: HashSet<&str> = encounters
            .iter()
            .filter_map(|(_, view)| {
                let parent = view.part_of.as_ref()?.id()?;
                (parent == visit_uuid).then_some(view.id.as_str())
            })
            .collect();

        let concept = self.note_concept().await?;
        let observations = self
            .fhir
            .list_resources("Observation", &[("subject", patient_uuid)], 0)
            .await?;
        let mut notes = Vec::new();
        for resource in &observations {
            let observation = ObservationView::parse(resource)?;
            if !is_note(&observation, &concept) {
                continue;
            }
            let in_visit = observation
                .encounter
                .as_ref()
                .and_then(|e| e.id())
                .is_some_and(|id| visit_encounters.contains(id));
            if !in_visit {
                continue;
            }
            notes.push(Note {
                time: observation.effective_date_time.clone().unwrap_or_default(),
                text: observation.value_string.clone().unwrap_or_default(),
            });
        }
        sort_most_recent_first(&mut notes);

        Ok(PatientNotes {
            patient: PatientHeader {
                id: patient
                    .identifier_of_type(OPENMRS_ID)
                    .unwrap_or_default()
                    .to_string(),
                name: display_name(&patient),
                gender: patient.gender().to_lab_code().to_string(),
                birth_date: patient.birth_date.clone().unwrap_or_default(),
                visit_uuid: visit_uuid.to_string(),
            },
            notes,
        })
    }

    /// Add a note to the visit of a patient.
    pub async fn record_note(&self, patient_uuid: &str, text: &NonEmptyText) -> LabResult<RecordedNote> {
        let encounters = self.encounters(patient_uuid).await?;
        let visit_uuid = visit_of(&encounters, patient_uuid)?;

        let encounter = self
            .openmrs
            .create_fhir_encounter_json(patient_uuid, visit_uuid, ENCOUNTER_TYPE_VISIT_NOTE, None)
            .await?;
        let encounter_uuid = created_id(&self.fhir.upload_resource(&encounter).await?)?;

        let mut observation = self
            .openmrs
            .create_fhir_observation_json(patient_uuid, &encounter_uuid, CONCEPT_ENCOUNTER_NOTE, None)
            .await?;
        observation["valueString"] = Value::from(text.as_str());
        let observation_uuid = created_id(&self.fhir.upload_resource(&observation).await?)?;

        Ok(RecordedNote {
            encounter_uuid,
            observation_uuid,
        })
    }

    async fn get_patient(&self, patient_uuid: &str) -> LabResult<PatientView> {
        let resource = self
            .fhir
            .get_resource("Patient", patient_uuid)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    LabError::NotFound(format!("patient {patient_uuid}"))
                } else {
                    LabError::Fhir(e)
                }
            })?;
        Ok(PatientView::parse(&resource)?)
    }

    /// `Encounter` resources of a patient, each flagged as visit or not.
    async fn encounters(&self, patient_uuid: &str) -> LabResult<Vec<(bool, EncounterView)>> {
        let found = self
            .fhir
            .list_resources("Encounter", &[("subject", patient_uuid)], 0)
            .await?;
        found
            .iter()
            .map(|resource| -> LabResult<(bool, EncounterView)> {
                let is_visit = is_fhir_encounter_a_visit(resource)?;
                Ok((is_visit, EncounterView::parse(resource)?))
            })
            .collect()
    }
}

/// First visit among the encounters of a patient.
fn visit_of<'a>(encounters: &'a [(bool, EncounterView)], patient_uuid: &str) -> LabResult<&'a str> {
    encounters
        .iter()
        .find(|(is_visit, _)| *is_visit)
        .map(|(_, view)| view.id.as_str())
        .ok_or_else(|| LabError::Precondition(format!("patient {patient_uuid} has no visit")))
}

fn is_note(observation: &ObservationView, concept_uuid: &str) -> bool {
    observation.code.is_labelled(CONCEPT_ENCOUNTER_NOTE)
        || observation
            .code
            .coding
            .iter()
            .any(|c| c.code.as_deref() == Some(concept_uuid))
}

fn sort_most_recent_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.time.cmp(&a.time));
}

fn created_id(resource: &Value) -> LabResult<String> {
    resource
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            LabError::Fhir(FhirError::InvalidResponse(
                "created resource has no id".into(),
            ))
        })
}
