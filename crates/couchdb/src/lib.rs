//! CouchDB REST boundary support.
//!
//! A thin client over the CouchDB HTTP document API: databases, documents, and Mango
//! queries. Documents are plain JSON objects; interpretation of their content belongs to
//! the caller.

use hie_types::{BaseUrl, BasicCredentials};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Upper bound for the number of documents returned by a single Mango query.
///
/// CouchDB answers at most 25 documents when no limit is given.
pub const FIND_LIMIT: u64 = 100_000;

/// Errors returned by the `couchdb` boundary crate.
#[derive(Debug, Error)]
pub enum CouchDbError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CouchDB returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("invalid CouchDB response: {0}")]
    InvalidResponse(String),
}

impl CouchDbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CouchDbError::Status { status, .. } if *status == reqwest::StatusCode::NOT_FOUND)
    }
}

/// Type alias for Results that can fail with a [`CouchDbError`].
pub type CouchDbResult<T> = Result<T, CouchDbError>;

/// A JSON document stored in CouchDB.
pub type Document = Map<String, Value>;

#[derive(Deserialize)]
struct DocumentCreated {
    id: String,
}

#[derive(Deserialize)]
struct FindResult {
    docs: Vec<Document>,
}

/// Client for the CouchDB HTTP API.
#[derive(Clone, Debug)]
pub struct CouchDbClient {
    base: BaseUrl,
    credentials: BasicCredentials,
    http: reqwest::Client,
}

impl CouchDbClient {
    pub fn new(base: BaseUrl, credentials: BasicCredentials) -> Self {
        Self {
            base,
            credentials,
            http: reqwest::Client::new(),
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    pub async fn list_databases(&self) -> CouchDbResult<Vec<String>> {
        let response = self
            .authed(self.http.get(self.base.join("/_all_dbs")))
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    pub async fn create_database(&self, name: &str) -> CouchDbResult<()> {
        tracing::debug!("creating CouchDB database {}", name);
        let response = self
            .authed(self.http.put(self.base.join(&database_path(name))))
            .send()
            .await?;
        ensure_success(response)?;
        Ok(())
    }

    pub async fn delete_database(&self, name: &str) -> CouchDbResult<()> {
        let response = self
            .authed(self.http.delete(self.base.join(&database_path(name))))
            .send()
            .await?;
        ensure_success(response)?;
        Ok(())
    }

    /// Store a new document and return the identifier CouchDB assigned to it.
    pub async fn add_document(&self, db: &str, document: &Value) -> CouchDbResult<String> {
        let response = self
            .authed(self.http.post(self.base.join(&database_path(db))))
            .json(document)
            .send()
            .await?;
        let created: DocumentCreated = ensure_success(response)?.json().await?;
        Ok(created.id)
    }

    pub async fn get_document(&self, db: &str, id: &str) -> CouchDbResult<Document> {
        let response = self
            .authed(self.http.get(self.base.join(&document_path(db, id))))
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    /// Run a Mango query and return every matching document.
    pub async fn find(&self, db: &str, selector: Value) -> CouchDbResult<Vec<Document>> {
        let response = self
            .authed(
                self.http
                    .post(self.base.join(&format!("{}/_find", database_path(db)))),
            )
            .json(&json!({
                "selector": selector,
                "limit": FIND_LIMIT,
            }))
            .send()
            .await?;
        let result: FindResult = ensure_success(response)?
            .json()
            .await
            .map_err(|e| CouchDbError::InvalidResponse(format!("_find result: {e}")))?;
        Ok(result.docs)
    }

    pub async fn delete_document(&self, db: &str, id: &str, rev: &str) -> CouchDbResult<()> {
        let response = self
            .authed(self.http.delete(self.base.join(&document_path(db, id))))
            .query(&[("rev", rev)])
            .send()
            .await?;
        ensure_success(response)?;
        Ok(())
    }
}

fn database_path(db: &str) -> String {
    format!("/{}", urlencoding::encode(db))
}

/// Document ids may contain `/`, which CouchDB only accepts encoded.
fn document_path(db: &str, id: &str) -> String {
    format!("{}/{}", database_path(db), urlencoding::encode(id))
}

fn ensure_success(response: Response) -> CouchDbResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(CouchDbError::Status {
            status: response.status(),
            url: response.url().to_string(),
        })
    }
}
