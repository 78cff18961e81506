//! Connection to a FHIR R4 server.

use crate::{FhirError, FhirResult};
use hie_types::{BaseUrl, BasicCredentials};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::collections::HashSet;

const FHIR_JSON: &str = "application/fhir+json";

/// Client for the RESTful API of a FHIR server.
#[derive(Clone, Debug)]
pub struct FhirClient {
    base: BaseUrl,
    credentials: BasicCredentials,
    http: reqwest::Client,
}

impl FhirClient {
    /// `base` is the FHIR service root, e.g. `http://localhost:8003/openmrs/ws/fhir2/R4`.
    pub fn new(base: BaseUrl, credentials: BasicCredentials) -> Self {
        Self {
            base,
            credentials,
            http: reqwest::Client::new(),
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(ACCEPT, FHIR_JSON)
    }

    /// Read one resource given its type (e.g. `Patient`) and logical id.
    pub async fn get_resource(&self, resource_type: &str, id: &str) -> FhirResult<Value> {
        let url = self.base.join(&format!("/{resource_type}/{id}"));
        let response = self.authed(self.http.get(url)).send().await?;
        Ok(ensure_success(response)?.json().await?)
    }

    /// Search resources of one type, following `next` links of the result bundles.
    ///
    /// At most `max_results` resources are returned; `0` means no limit.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidResponse`] if a bundle has more than one `next` link, or
    /// if a `next` link leads back to a page that was already read.
    pub async fn list_resources(
        &self,
        resource_type: &str,
        criteria: &[(&str, &str)],
        max_results: usize,
    ) -> FhirResult<Vec<Value>> {
        let mut resources = Vec::new();
        let mut visited = HashSet::new();
        let mut request = self
            .authed(self.http.get(self.base.join(&format!("/{resource_type}"))))
            .query(criteria);

        loop {
            let response = request.send().await?;
            if !visited.insert(response.url().to_string()) {
                return Err(FhirError::InvalidResponse(format!(
                    "paging loop at {}",
                    response.url()
                )));
            }
            let bundle: Value = ensure_success(response)?.json().await?;

            for resource in bundle_resources(&bundle) {
                resources.push(resource.clone());
                if max_results != 0 && resources.len() >= max_results {
                    return Ok(resources);
                }
            }

            match next_link(&bundle)? {
                None => return Ok(resources),
                Some(next) => {
                    tracing::debug!("following FHIR paging link {}", next);
                    request = self.authed(self.http.get(next));
                }
            }
        }
    }

    /// Create a resource and return the version completed by the server (with its `id`).
    pub async fn upload_resource(&self, resource: &Value) -> FhirResult<Value> {
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FhirError::InvalidInput("missing field \"resourceType\" in FHIR resource".into())
            })?;

        let response = self
            .authed(self.http.post(self.base.join(&format!("/{resource_type}"))))
            .json(resource)
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }
}

fn ensure_success(response: Response) -> FhirResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(FhirError::Status {
            status: response.status(),
            url: response.url().to_string(),
        })
    }
}

fn bundle_resources(bundle: &Value) -> impl Iterator<Item = &Value> {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("resource"))
}

/// URL of the `next` page of a search bundle, if any.
fn next_link(bundle: &Value) -> FhirResult<Option<String>> {
    let next: Vec<&str> = bundle
        .get("link")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|link| link.get("relation").and_then(Value::as_str) == Some("next"))
        .filter_map(|link| link.get("url").and_then(Value::as_str))
        .collect();

    match next.as_slice() {
        [] => Ok(None),
        [url] => Ok(Some((*url).to_string())),
        _ => Err(FhirError::InvalidResponse(
            "search bundle has several next links".into(),
        )),
    }
}
