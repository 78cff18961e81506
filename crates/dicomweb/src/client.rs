use crate::{DicomWebError, DicomWebResult};
use hie_types::{BaseUrl, BasicCredentials};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

/// Client for the QIDO-RS and WADO-RS services of a DICOMweb server.
#[derive(Clone, Debug)]
pub struct DicomWebClient {
    base: BaseUrl,
    credentials: Option<BasicCredentials>,
    http: reqwest::Client,
}

impl DicomWebClient {
    pub fn new(base: BaseUrl, credentials: Option<BasicCredentials>) -> Self {
        Self {
            base,
            credentials,
            http: reqwest::Client::new(),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let builder = self.http.get(self.base.join(path));
        match &self.credentials {
            Some(c) => builder.basic_auth(&c.username, Some(&c.password)),
            None => builder,
        }
    }

    /// QIDO-RS search for studies; each filter is an attribute keyword or tag and a value.
    pub async fn search_studies(&self, filters: &[(&str, &str)]) -> DicomWebResult<Vec<Value>> {
        self.search(self.get("/studies").query(filters)).await
    }

    pub async fn search_series(&self, study_uid: &str) -> DicomWebResult<Vec<Value>> {
        self.search(self.get(&format!("/studies/{study_uid}/series")))
            .await
    }

    pub async fn search_instances(
        &self,
        study_uid: &str,
        series_uid: &str,
    ) -> DicomWebResult<Vec<Value>> {
        self.search(self.get(&format!(
            "/studies/{study_uid}/series/{series_uid}/instances"
        )))
        .await
    }

    /// Run a QIDO-RS query. No content and unknown parent resources both mean no match.
    async fn search(&self, request: RequestBuilder) -> DicomWebResult<Vec<Value>> {
        let response = request
            .header(ACCEPT, "application/dicom+json")
            .send()
            .await?;
        let status = response.status();
        let url = response.url().to_string();
        tracing::debug!("QIDO-RS {} -> {}", url, status);

        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(DicomWebError::Status { status, url });
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&body)
            .map_err(|e| DicomWebError::InvalidResponse(format!("{url}: {e}")))
    }

    /// Render one instance as a PNG image (WADO-RS "rendered" resource).
    pub async fn render_instance(
        &self,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
    ) -> DicomWebResult<Vec<u8>> {
        let path = format!("/studies/{study_uid}/series/{series_uid}/instances/{sop_uid}/rendered");
        let response = self.get(&path).header(ACCEPT, "image/png").send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DicomWebError::NotFound(format!("instance {sop_uid}")));
        }
        if !status.is_success() {
            return Err(DicomWebError::Status {
                status,
                url: response.url().to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
