use thiserror::Error;

/// Errors returned by the lab services.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The upstream data does not allow the operation (e.g. a patient without any visit).
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("openEHR error: {0}")]
    OpenEhr(#[from] openehr::OpenEhrError),

    #[error("CouchDB error: {0}")]
    CouchDb(#[from] couchdb::CouchDbError),

    #[error("OpenMRS error: {0}")]
    OpenMrs(#[from] openmrs::OpenMrsError),

    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),

    #[error("DICOMweb error: {0}")]
    DicomWeb(#[from] dicomweb::DicomWebError),

    #[error("HL7 error: {0}")]
    Hl7(#[from] hl7::Hl7Error),
}

/// Type alias for Results that can fail with a [`LabError`].
pub type LabResult<T> = Result<T, LabError>;
