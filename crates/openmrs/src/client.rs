//! Connection to an OpenMRS server.

use crate::datetime::format_now;
use crate::{
    default_form, fhir_json, OpenMrsError, OpenMrsResult, CUSTOM_IDENTIFIER_TYPE,
    DEFAULT_LOCATION, DEFAULT_PROVIDER, DEFAULT_ROLE, OPENMRS_ID,
};
use hie_types::{BaseUrl, BasicCredentials};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::{json, Map, Value};

/// File name sent with attachment uploads.
const ATTACHMENT_FILE_NAME: &str = "upload";

/// Optional parts of a new encounter.
///
/// `Default` gives the values of the Reference Application: the default form of the
/// encounter type, `Unknown Location`, and `UNKNOWN - Super User` as `Unknown` provider.
#[derive(Clone, Debug)]
pub struct EncounterOptions {
    pub form: Option<String>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub role: String,
    /// Encounter date/time; now when `None`.
    pub date_time: Option<String>,
}

impl Default for EncounterOptions {
    fn default() -> Self {
        Self {
            form: None,
            location: Some(DEFAULT_LOCATION.to_string()),
            provider: Some(DEFAULT_PROVIDER.to_string()),
            role: DEFAULT_ROLE.to_string(),
            date_time: None,
        }
    }
}

/// Client for the OpenMRS REST web services.
#[derive(Clone, Debug)]
pub struct OpenMrsClient {
    base: BaseUrl,
    credentials: BasicCredentials,
    http: reqwest::Client,
}

impl OpenMrsClient {
    /// `base` is the REST root, e.g. `http://localhost:8003/openmrs/ws/rest`.
    pub fn new(base: BaseUrl, credentials: BasicCredentials) -> Self {
        Self {
            base,
            credentials,
            http: reqwest::Client::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> OpenMrsResult<Value> {
        let response = self
            .http
            .get(self.base.join(path))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .query(query)
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    async fn post_json(&self, path: &str, body: &Value) -> OpenMrsResult<Value> {
        tracing::debug!("POST {}", path);
        let response = self
            .http
            .post(self.base.join(path))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(body)
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    async fn delete(&self, path: &str) -> OpenMrsResult<()> {
        let response = self
            .http
            .delete(self.base.join(path))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;
        ensure_success(response)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Find the UUID of an entity of the OpenMRS data model given its display name.
    ///
    /// `table` is a REST resource such as `location`, `visittype` or `encountertype`.
    pub async fn lookup_entity(&self, table: &str, display: &str) -> OpenMrsResult<String> {
        let listing = self.get_json(&format!("/v1/{table}"), &[]).await?;
        results(&listing)?
            .iter()
            .find(|r| r.get("display").and_then(Value::as_str) == Some(display))
            .map(|r| str_at(r, "/uuid").map(str::to_owned))
            .transpose()?
            .ok_or_else(|| OpenMrsError::UnknownEntity {
                table: table.to_string(),
                display: display.to_string(),
            })
    }

    /// Ask the first identifier source of the `idgen` module for a new OpenMRS ID.
    ///
    /// Returns the UUID of the identifier type and the generated identifier.
    pub async fn generate_patient_identifier(&self) -> OpenMrsResult<(String, String)> {
        let sources = self.get_json("/v1/idgen/identifiersource", &[]).await?;
        let generator = results(&sources)?
            .first()
            .ok_or_else(|| OpenMrsError::InvalidResponse("no identifier source".into()))?;
        let identifier_type = str_at(generator, "/identifierType/uuid")?.to_string();

        let generated = self
            .post_json(
                "/v1/idgen/identifiersource",
                &json!({
                    "generateIdentifiers": true,
                    "sourceUuid": str_at(generator, "/uuid")?,
                    "numberToGenerate": 1,
                }),
            )
            .await?;
        let identifier = str_at(&generated, "/identifiers/0")?.to_string();
        Ok((identifier_type, identifier))
    }

    /// Ask OpenMRS to rebuild its search indexes.
    pub async fn update_indexes(&self) -> OpenMrsResult<()> {
        let response = self
            .http
            .post(self.base.join("/v1/searchindexupdate"))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;
        ensure_success(response)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------------

    /// Create a patient and return its UUID.
    ///
    /// An OpenMRS ID is generated automatically. `custom_identifiers` are stored with the
    /// `Old Identification Number` type, which links the patient to external systems.
    pub async fn create_patient(
        &self,
        given_name: &str,
        family_name: &str,
        gender: &str,
        birth_date: &str,
        location: &str,
        custom_identifiers: &[String],
    ) -> OpenMrsResult<String> {
        let location_uuid = self.lookup_entity("location", location).await?;
        let (identifier_type, identifier) = self.generate_patient_identifier().await?;

        let mut identifiers = vec![json!({
            "identifierType": identifier_type,
            "identifier": identifier,
            "location": location_uuid,
        })];

        if !custom_identifiers.is_empty() {
            let custom_type = self
                .lookup_entity("patientidentifiertype", CUSTOM_IDENTIFIER_TYPE)
                .await?;
            identifiers.extend(custom_identifiers.iter().map(|custom| {
                json!({
                    "identifierType": custom_type,
                    "identifier": custom,
                    "location": location_uuid,
                })
            }));
        }

        let created = self
            .post_json(
                "/v1/patient",
                &json!({
                    "person": {
                        "names": [{ "givenName": given_name, "familyName": family_name }],
                        "gender": gender,
                        "birthdate": birth_date,
                        "addresses": [{}],
                    },
                    "identifiers": identifiers,
                }),
            )
            .await?;
        Ok(str_at(&created, "/uuid")?.to_string())
    }

    /// Search patients by name or identifier (at least 2 characters) and return their UUIDs.
    pub async fn find_patients(&self, query: &str) -> OpenMrsResult<Vec<String>> {
        let found = self.get_json("/v1/patient", &[("q", query)]).await?;
        uuids(&found)
    }

    pub async fn get_patient(&self, patient_uuid: &str) -> OpenMrsResult<Value> {
        self.get_json(&format!("/v1/patient/{patient_uuid}"), &[])
            .await
    }

    /// Return the identifier of the given type (e.g. `OpenMRS ID`) of a patient.
    pub async fn get_patient_identifier(
        &self,
        patient_uuid: &str,
        identifier_type: &str,
    ) -> OpenMrsResult<String> {
        let patient = self.get_patient(patient_uuid).await?;
        let entries = patient
            .get("identifiers")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut matches = Vec::new();
        for entry in entries {
            let identifier_uuid = str_at(&entry, "/uuid")?;
            let details = self
                .get_json(
                    &format!("/v1/patient/{patient_uuid}/identifier/{identifier_uuid}"),
                    &[],
                )
                .await?;
            if details.pointer("/identifierType/display").and_then(Value::as_str)
                == Some(identifier_type)
            {
                matches.push(str_at(&details, "/identifier")?.to_string());
            }
        }

        match matches.len() {
            1 => Ok(matches.remove(0)),
            _ => Err(OpenMrsError::InvalidResponse(format!(
                "unable to get identifier of patient {patient_uuid}"
            ))),
        }
    }

    pub async fn update_patient(&self, patient_uuid: &str, content: &Value) -> OpenMrsResult<()> {
        self.post_json(&format!("/v1/patient/{patient_uuid}"), content)
            .await?;
        Ok(())
    }

    pub async fn delete_patient(&self, patient_uuid: &str) -> OpenMrsResult<()> {
        self.delete(&format!("/v1/patient/{patient_uuid}")).await
    }

    pub async fn find_patient_by_openmrs_id(&self, identifier: &str) -> OpenMrsResult<Option<String>> {
        self.find_patient_by_identifier(identifier, OPENMRS_ID).await
    }

    /// Look up a patient by an identifier from an external system.
    pub async fn find_patient_by_custom_id(&self, identifier: &str) -> OpenMrsResult<Option<String>> {
        self.find_patient_by_identifier(identifier, CUSTOM_IDENTIFIER_TYPE)
            .await
    }

    async fn find_patient_by_identifier(
        &self,
        identifier: &str,
        identifier_type: &str,
    ) -> OpenMrsResult<Option<String>> {
        let type_uuid = self
            .lookup_entity("patientidentifiertype", identifier_type)
            .await?;
        let found = self
            .get_json("/v1/patient", &[("q", identifier), ("v", "full")])
            .await?;
        match_identifier(results(&found)?, &type_uuid, identifier)
    }

    // ------------------------------------------------------------------------
    // Visits
    // ------------------------------------------------------------------------

    pub async fn list_visits(&self, patient_uuid: &str) -> OpenMrsResult<Vec<String>> {
        let found = self
            .get_json("/v1/visit", &[("patient", patient_uuid)])
            .await?;
        uuids(&found)
    }

    pub async fn get_visit(&self, visit_uuid: &str) -> OpenMrsResult<Value> {
        self.get_json(&format!("/v1/visit/{visit_uuid}"), &[]).await
    }

    /// Start a new visit for a patient and return its UUID.
    pub async fn create_visit(
        &self,
        patient_uuid: &str,
        visit_type: &str,
        start_date_time: Option<&str>,
    ) -> OpenMrsResult<String> {
        let mut content = Map::new();
        content.insert("patient".into(), Value::from(patient_uuid));
        content.insert(
            "visitType".into(),
            Value::from(self.lookup_entity("visittype", visit_type).await?),
        );
        if let Some(start) = start_date_time {
            content.insert("startDatetime".into(), Value::from(start));
        }

        let created = self.post_json("/v1/visit", &Value::Object(content)).await?;
        Ok(str_at(&created, "/uuid")?.to_string())
    }

    pub async fn end_visit(&self, visit_uuid: &str, stop_date_time: Option<&str>) -> OpenMrsResult<()> {
        let stop = stop_date_time.map_or_else(format_now, str::to_owned);
        self.post_json(
            &format!("/v1/visit/{visit_uuid}"),
            &json!({ "stopDatetime": stop }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_visit(&self, visit_uuid: &str) -> OpenMrsResult<()> {
        self.delete(&format!("/v1/visit/{visit_uuid}")).await
    }

    // ------------------------------------------------------------------------
    // Encounters and observations
    // ------------------------------------------------------------------------

    /// Create an encounter (e.g. `Vitals` or `Visit Note`) in a visit and return its UUID.
    pub async fn create_encounter(
        &self,
        visit_uuid: &str,
        encounter_type: &str,
        options: &EncounterOptions,
    ) -> OpenMrsResult<String> {
        let visit = self.get_visit(visit_uuid).await?;

        let mut content = Map::new();
        content.insert("patient".into(), Value::from(str_at(&visit, "/patient/uuid")?));
        content.insert(
            "encounterType".into(),
            Value::from(self.lookup_entity("encountertype", encounter_type).await?),
        );
        content.insert("visit".into(), Value::from(visit_uuid));
        content.insert(
            "encounterDatetime".into(),
            Value::from(options.date_time.clone().unwrap_or_else(format_now)),
        );

        let form = options.form.as_deref().or_else(|| default_form(encounter_type));
        if let Some(form) = form {
            content.insert("form".into(), Value::from(self.lookup_entity("form", form).await?));
        }
        if let Some(location) = &options.location {
            content.insert(
                "location".into(),
                Value::from(self.lookup_entity("location", location).await?),
            );
        }
        if let Some(provider) = &options.provider {
            content.insert(
                "encounterProviders".into(),
                json!([{
                    "provider": self.lookup_entity("provider", provider).await?,
                    "encounterRole": self.lookup_entity("encounterrole", &options.role).await?,
                }]),
            );
        }

        let created = self.post_json("/v1/encounter", &Value::Object(content)).await?;
        Ok(str_at(&created, "/uuid")?.to_string())
    }

    pub async fn list_encounters(&self, visit_uuid: &str) -> OpenMrsResult<Vec<String>> {
        let visit = self.get_visit(visit_uuid).await?;
        uuids_in(&visit, "encounters")
    }

    pub async fn get_encounter(&self, encounter_uuid: &str) -> OpenMrsResult<Value> {
        self.get_json(&format!("/v1/encounter/{encounter_uuid}"), &[])
            .await
    }

    pub async fn list_observations(&self, encounter_uuid: &str) -> OpenMrsResult<Vec<String>> {
        let encounter = self.get_encounter(encounter_uuid).await?;
        uuids_in(&encounter, "obs")
    }

    pub async fn get_observation(&self, observation_uuid: &str) -> OpenMrsResult<Value> {
        self.get_json(&format!("/v1/obs/{observation_uuid}"), &[])
            .await
    }

    /// Find the UUID of a concept given its name; exactly one concept must match.
    pub async fn lookup_concept(&self, concept_name: &str) -> OpenMrsResult<String> {
        let found = self
            .get_json("/v1/concept", &[("name", concept_name)])
            .await?;
        match results(&found)?.as_slice() {
            [single] => Ok(str_at(single, "/uuid")?.to_string()),
            _ => Err(OpenMrsError::UnknownConcept(concept_name.to_string())),
        }
    }

    /// Attach an observation (concept → value) to an encounter and return its UUID.
    ///
    /// Notable concepts are `Temperature (c)` and `Weight (kg)` for `Vitals`, and
    /// `Text of encounter note` for `Visit Note`.
    pub async fn create_observation(
        &self,
        encounter_uuid: &str,
        concept_name: &str,
        value: Value,
        comment: Option<&str>,
    ) -> OpenMrsResult<String> {
        let encounter = self.get_encounter(encounter_uuid).await?;
        let patient = self
            .get_patient(str_at(&encounter, "/patient/uuid")?)
            .await?;

        let mut content = Map::new();
        content.insert(
            "concept".into(),
            Value::from(self.lookup_concept(concept_name).await?),
        );
        content.insert("encounter".into(), Value::from(encounter_uuid));
        content.insert(
            "obsDatetime".into(),
            Value::from(str_at(&encounter, "/encounterDatetime")?),
        );
        content.insert("person".into(), Value::from(str_at(&patient, "/person/uuid")?));
        content.insert("value".into(), value);
        if let Some(comment) = comment {
            content.insert("comment".into(), Value::from(comment));
        }

        let created = self.post_json("/v1/obs", &Value::Object(content)).await?;
        Ok(str_at(&created, "/uuid")?.to_string())
    }

    /// Attach a file to an encounter as a complex observation and return its UUID.
    ///
    /// OpenMRS reads the observation metadata from the `json` part and the base64 encoded
    /// content from the `file` part; `title` becomes the display name of the attachment.
    /// The Reference Application uses the `Attachment Upload` concept.
    pub async fn create_observation_attachment(
        &self,
        encounter_uuid: &str,
        concept_name: &str,
        title: &str,
        data: &[u8],
        mime: &str,
    ) -> OpenMrsResult<String> {
        let encounter = self.get_encounter(encounter_uuid).await?;
        let patient = self
            .get_patient(str_at(&encounter, "/patient/uuid")?)
            .await?;

        let metadata = json!({
            "comment": title,
            "concept": self.lookup_concept(concept_name).await?,
            "encounter": encounter_uuid,
            "obsDatetime": str_at(&encounter, "/encounterDatetime")?,
            "person": str_at(&patient, "/person/uuid")?,
        });
        let file = Part::text(BASE64.encode(data))
            .file_name(ATTACHMENT_FILE_NAME)
            .mime_str(mime)?;
        let form = Form::new()
            .text("json", metadata.to_string())
            .part("file", file);

        tracing::debug!("POST /v1/obs (attachment of {} bytes)", data.len());
        let response = self
            .http
            .post(self.base.join("/v1/obs"))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .multipart(form)
            .send()
            .await?;
        let created: Value = ensure_success(response)?.json().await?;
        Ok(str_at(&created, "/uuid")?.to_string())
    }

    // ------------------------------------------------------------------------
    // FHIR skeletons with name resolution
    // ------------------------------------------------------------------------

    /// `Patient` resource with a freshly generated OpenMRS ID.
    pub async fn create_fhir_patient_json(
        &self,
        given_name: &str,
        family_name: &str,
        gender: &str,
        birth_date: &str,
        location: &str,
    ) -> OpenMrsResult<Value> {
        if !fhir_json::FHIR_GENDERS.contains(&gender) {
            return Err(OpenMrsError::InvalidInput(format!(
                "invalid patient gender: {gender}"
            )));
        }
        let location_uuid = self.lookup_entity("location", location).await?;
        let (_, identifier) = self.generate_patient_identifier().await?;
        fhir_json::patient_json(
            given_name,
            family_name,
            gender,
            birth_date,
            &location_uuid,
            location,
            &identifier,
        )
    }

    pub async fn create_fhir_visit_json(
        &self,
        patient_uuid: &str,
        visit_type: &str,
        start_date_time: Option<&str>,
    ) -> OpenMrsResult<Value> {
        let visit_type_uuid = self.lookup_entity("visittype", visit_type).await?;
        let start = start_date_time.map_or_else(format_now, str::to_owned);
        Ok(fhir_json::visit_json(
            patient_uuid,
            &visit_type_uuid,
            visit_type,
            &start,
        ))
    }

    pub async fn create_fhir_encounter_json(
        &self,
        patient_uuid: &str,
        visit_uuid: &str,
        encounter_type: &str,
        date_time: Option<&str>,
    ) -> OpenMrsResult<Value> {
        let type_uuid = self.lookup_entity("encountertype", encounter_type).await?;
        let when = date_time.map_or_else(format_now, str::to_owned);
        Ok(fhir_json::encounter_json(
            patient_uuid,
            visit_uuid,
            &type_uuid,
            encounter_type,
            &when,
        ))
    }

    pub async fn create_fhir_observation_json(
        &self,
        patient_uuid: &str,
        encounter_uuid: &str,
        concept_name: &str,
        date_time: Option<&str>,
    ) -> OpenMrsResult<Value> {
        let concept_uuid = self.lookup_concept(concept_name).await?;
        let when = date_time.map_or_else(format_now, str::to_owned);
        Ok(fhir_json::observation_json(
            patient_uuid,
            encounter_uuid,
            &concept_uuid,
            &when,
        ))
    }
}

fn ensure_success(response: Response) -> OpenMrsResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(OpenMrsError::Status {
            status: response.status(),
            url: response.url().to_string(),
        })
    }
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> OpenMrsResult<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| OpenMrsError::InvalidResponse(format!("missing string at {pointer}")))
}

fn results(listing: &Value) -> OpenMrsResult<&Vec<Value>> {
    listing
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| OpenMrsError::InvalidResponse("missing results array".into()))
}

fn uuids(listing: &Value) -> OpenMrsResult<Vec<String>> {
    results(listing)?
        .iter()
        .map(|r| str_at(r, "/uuid").map(str::to_owned))
        .collect()
}

fn uuids_in(value: &Value, key: &str) -> OpenMrsResult<Vec<String>> {
    value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| OpenMrsError::InvalidResponse(format!("missing {key} array")))?
        .iter()
        .map(|r| str_at(r, "/uuid").map(str::to_owned))
        .collect()
}

/// Return the single patient holding `identifier` with the given identifier type.
fn match_identifier(
    patients: &[Value],
    type_uuid: &str,
    identifier: &str,
) -> OpenMrsResult<Option<String>> {
    let mut found: Option<String> = None;
    for patient in patients {
        let entries = patient
            .get("identifiers")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for entry in entries {
            let same_type =
                entry.pointer("/identifierType/uuid").and_then(Value::as_str) == Some(type_uuid);
            let same_value = entry.get("identifier").and_then(Value::as_str) == Some(identifier);
            if same_type && same_value {
                if found.is_some() {
                    return Err(OpenMrsError::DuplicateIdentifier(identifier.to_string()));
                }
                found = Some(str_at(patient, "/uuid")?.to_string());
            }
        }
    }
    Ok(found)
}
