//! openEHR REST boundary support.
//!
//! This crate talks to an openEHR clinical data repository (EHRbase in the labs) over the
//! standard openEHR REST API, plus the EHRbase-specific `ecis` and `admin` endpoints.
//!
//! It is responsible for transport and wire formats only: which compositions a lab creates,
//! and how they are filtered, lives in `hie-core`.

pub mod client;
pub mod composition;

pub use client::OpenEhrClient;
pub use composition::{CompositionFormat, FlatComposition, StoredComposition};

use thiserror::Error;

/// Errors returned by the `openehr` boundary crate.
#[derive(Debug, Error)]
pub enum OpenEhrError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("openEHR server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("missing ETag header in openEHR response")]
    MissingEtag,

    #[error("invalid openEHR response: {0}")]
    InvalidResponse(String),

    #[error("failed to read template file: {0}")]
    TemplateRead(#[from] std::io::Error),

    #[error("invalid multimedia content: {0}")]
    Multimedia(String),
}

impl OpenEhrError {
    /// True when the server answered 404 Not Found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OpenEhrError::Status { status, .. } if *status == reqwest::StatusCode::NOT_FOUND)
    }
}

/// Type alias for Results that can fail with an [`OpenEhrError`].
pub type OpenEhrResult<T> = Result<T, OpenEhrError>;
