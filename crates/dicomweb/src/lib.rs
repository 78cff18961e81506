//! DICOMweb boundary support.
//!
//! - [`DicomWebClient`] issues QIDO-RS searches and WADO-RS rendering requests
//! - [`tags`] and the `*_value` helpers read datasets in the DICOM JSON model
//!   (PS3.18 F.2), where each attribute is keyed by its 8-digit hexadecimal tag

pub mod client;
pub mod json;
pub mod tags;

pub use client::DicomWebClient;
pub use json::{integer_value, string_value};

use thiserror::Error;

/// Errors returned by the `dicomweb` boundary crate.
#[derive(Debug, Error)]
pub enum DicomWebError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DICOMweb server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid DICOMweb response: {0}")]
    InvalidResponse(String),
}

/// Type alias for Results that can fail with a [`DicomWebError`].
pub type DicomWebResult<T> = Result<T, DicomWebError>;
