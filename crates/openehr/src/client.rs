//! Connection to an openEHR clinical data repository.

use crate::composition::{CompositionFormat, StoredComposition};
use crate::{OpenEhrError, OpenEhrResult};
use hie_types::{BaseUrl, BasicCredentials};
use reqwest::header::{ACCEPT, CONTENT_TYPE, ETAG};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;

/// Client for the openEHR REST API of a CDR such as EHRbase.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct OpenEhrClient {
    base: BaseUrl,
    credentials: BasicCredentials,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TemplateSummary {
    template_id: String,
}

#[derive(Deserialize)]
struct AqlResult {
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddedComposition {
    composition_uid: String,
}

impl OpenEhrClient {
    pub fn new(base: BaseUrl, credentials: BasicCredentials) -> Self {
        Self {
            base,
            credentials,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authed(self.http.get(self.base.join(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authed(self.http.post(self.base.join(path)))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.authed(self.http.delete(self.base.join(path)))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    /// List the identifiers of all the templates defined in the CDR.
    pub async fn list_templates(&self) -> OpenEhrResult<Vec<String>> {
        let response = self
            .get("/openehr/v1/definition/template/adl1.4")
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let templates: Vec<TemplateSummary> = ensure_success(response)?.json().await?;
        Ok(templates.into_iter().map(|t| t.template_id).collect())
    }

    /// Upload an operational template (`.opt` XML exported by the Archetype Designer).
    ///
    /// Returns the identifier of the newly created template.
    pub async fn add_template(&self, path: &Path) -> OpenEhrResult<String> {
        let body = tokio::fs::read(path).await?;
        tracing::debug!("uploading openEHR template {}", path.display());
        let response = self
            .post("/openehr/v1/definition/template/adl1.4")
            .header(CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .await?;
        let response = expect_status(response, StatusCode::NO_CONTENT)?;
        identifier_from_etag(&response)
    }

    /// Return the web template of a template, useful to discover AQL paths.
    pub async fn get_template(&self, template_id: &str) -> OpenEhrResult<Value> {
        let response = self
            .get(&format!("/ecis/v1/template/{template_id}"))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    /// Return an example composition for the given template.
    pub async fn get_sample_composition(
        &self,
        template_id: &str,
        format: CompositionFormat,
    ) -> OpenEhrResult<Value> {
        let request = match format.ecis_name() {
            None => self.get(&format!(
                "/openehr/v1/definition/template/adl1.4/{template_id}/example"
            )),
            Some(name) => self
                .get(&format!("/ecis/v1/template/{template_id}/example"))
                .query(&[("format", name)]),
        };
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    /// Create a new, empty EHR and return its identifier.
    pub async fn create_ehr(&self) -> OpenEhrResult<String> {
        let response = self
            .post("/openehr/v1/ehr")
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let response = expect_status(response, StatusCode::NO_CONTENT)?;
        identifier_from_etag(&response)
    }

    pub async fn get_ehr(&self, ehr_id: &str) -> OpenEhrResult<Value> {
        let response = self
            .get(&format!("/openehr/v1/ehr/{ehr_id}"))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    /// Execute an AQL query. The matching rows are in the `rows` field of the result.
    pub async fn execute_aql(&self, query: &str, params: Map<String, Value>) -> OpenEhrResult<Value> {
        tracing::debug!("executing AQL: {}", query);
        let response = self
            .post("/openehr/v1/query/aql")
            .header(ACCEPT, "application/json")
            .json(&json!({
                "q": query,
                "query_parameters": params,
            }))
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    /// Execute an AQL query and return its rows.
    pub async fn query_rows(
        &self,
        query: &str,
        params: Map<String, Value>,
    ) -> OpenEhrResult<Vec<Vec<Value>>> {
        let result = self.execute_aql(query, params).await?;
        let parsed: AqlResult = serde_json::from_value(result)
            .map_err(|e| OpenEhrError::InvalidResponse(format!("AQL result: {e}")))?;
        Ok(parsed.rows)
    }

    /// List the identifiers of all the EHRs stored in the CDR.
    pub async fn list_ehrs(&self) -> OpenEhrResult<Vec<String>> {
        let rows = self
            .query_rows("SELECT e/ehr_id/value FROM EHR e", Map::new())
            .await?;
        first_column(rows)
    }

    /// List the identifiers of all the compositions stored in one EHR.
    pub async fn list_compositions(&self, ehr_id: &str) -> OpenEhrResult<Vec<String>> {
        let mut params = Map::new();
        params.insert("ehrId".into(), Value::from(ehr_id));
        let rows = self
            .query_rows(
                "SELECT c/uid/value FROM EHR e CONTAINS COMPOSITION c WHERE e/ehr_id/value=$ehrId",
                params,
            )
            .await?;
        first_column(rows)
    }

    /// Return the content of one composition in the requested format.
    pub async fn get_composition(
        &self,
        ehr_id: &str,
        composition_uid: &str,
        format: CompositionFormat,
    ) -> OpenEhrResult<Value> {
        let request = match format.ecis_name() {
            None => self.get(&format!(
                "/openehr/v1/ehr/{ehr_id}/composition/{composition_uid}"
            )),
            Some(name) => self
                .get(&format!("/ecis/v1/composition/{composition_uid}"))
                .query(&[("format", name)]),
        };
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    /// Return one composition in simplified flat JSON, parsed into its envelope.
    pub async fn get_flat_composition(
        &self,
        ehr_id: &str,
        composition_uid: &str,
    ) -> OpenEhrResult<StoredComposition> {
        let value = self
            .get_composition(ehr_id, composition_uid, CompositionFormat::SimplifiedJsonFlat)
            .await?;
        StoredComposition::from_value(value)
    }

    /// Add one composition to an EHR and return the identifier of the new composition.
    ///
    /// The template identifier is only used by the simplified formats.
    pub async fn add_composition(
        &self,
        ehr_id: &str,
        template_id: &str,
        composition: &Value,
        format: CompositionFormat,
    ) -> OpenEhrResult<String> {
        let request = match format.ecis_name() {
            None => self.post(&format!("/openehr/v1/ehr/{ehr_id}/composition")),
            Some(name) => self.post("/ecis/v1/composition").query(&[
                ("ehrId", ehr_id),
                ("templateId", template_id),
                ("format", name),
            ]),
        };
        let response = request
            .header(ACCEPT, "application/json")
            .json(composition)
            .send()
            .await?;
        let response = ensure_success(response)?;

        match format {
            CompositionFormat::CanonicalJson => identifier_from_etag(&response),
            _ => {
                let added: AddedComposition = response.json().await?;
                Ok(added.composition_uid)
            }
        }
    }

    /// Delete an EHR (EHRbase admin API, requires admin credentials).
    pub async fn delete_ehr(&self, ehr_id: &str) -> OpenEhrResult<()> {
        let response = self.delete(&format!("/admin/ehr/{ehr_id}")).send().await?;
        ensure_success(response)?;
        Ok(())
    }

    /// Delete a template (EHRbase admin API, requires admin credentials).
    pub async fn delete_template(&self, template_id: &str) -> OpenEhrResult<()> {
        let response = self
            .delete(&format!("/admin/template/{template_id}"))
            .send()
            .await?;
        ensure_success(response)?;
        Ok(())
    }

    /// Remove every EHR and then every template stored in an EHRbase server.
    pub async fn reset(&self) -> OpenEhrResult<()> {
        let ehrs = self.list_ehrs().await?;
        tracing::info!("deleting {} EHRs", ehrs.len());
        for ehr_id in ehrs {
            self.delete_ehr(&ehr_id).await?;
        }

        let templates = self.list_templates().await?;
        tracing::info!("deleting {} templates", templates.len());
        for template_id in templates {
            self.delete_template(&template_id).await?;
        }
        Ok(())
    }
}

fn ensure_success(response: Response) -> OpenEhrResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(OpenEhrError::Status {
            status: response.status(),
            url: response.url().to_string(),
        })
    }
}

fn expect_status(response: Response, expected: StatusCode) -> OpenEhrResult<Response> {
    if response.status() == expected {
        Ok(response)
    } else {
        Err(OpenEhrError::Status {
            status: response.status(),
            url: response.url().to_string(),
        })
    }
}

fn identifier_from_etag(response: &Response) -> OpenEhrResult<String> {
    let etag = response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .ok_or(OpenEhrError::MissingEtag)?;
    strip_etag_quotes(etag)
}

/// Remove the surrounding double quotes of an ETag value, if any.
pub(crate) fn strip_etag_quotes(etag: &str) -> OpenEhrResult<String> {
    if etag.is_empty() {
        return Err(OpenEhrError::MissingEtag);
    }
    let unquoted = etag
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(etag);
    Ok(unquoted.to_string())
}

fn first_column(rows: Vec<Vec<Value>>) -> OpenEhrResult<Vec<String>> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .next()
                .and_then(|v| v.as_str().map(str::to_owned))
                .ok_or_else(|| OpenEhrError::InvalidResponse("AQL row without string column".into()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_quotes_from_etag() {
        assert_eq!(strip_etag_quotes("\"abc\"").unwrap(), "abc");
        assert_eq!(strip_etag_quotes("abc").unwrap(), "abc");
        assert!(matches!(strip_etag_quotes(""), Err(OpenEhrError::MissingEtag)));
    }

    #[test]
    fn first_column_extracts_identifiers() {
        let rows = vec![
            vec![Value::from("a"), Value::from(1)],
            vec![Value::from("b")],
        ];
        assert_eq!(first_column(rows).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn first_column_rejects_non_string_cells() {
        let rows = vec![vec![Value::from(3)]];
        assert!(matches!(
            first_column(rows),
            Err(OpenEhrError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn add_template_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = OpenEhrClient::new(
            BaseUrl::parse("http://127.0.0.1:9").unwrap(),
            BasicCredentials::new("u", "p"),
        );
        let err = client
            .add_template(&dir.path().join("Missing.v0.opt"))
            .await
            .expect_err("file does not exist");
        assert!(matches!(err, OpenEhrError::TemplateRead(_)));
    }
}
