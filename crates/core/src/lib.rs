//! # HIE Core
//!
//! Business services of the health-information-exchange labs.
//!
//! Each service validates its input, talks to one upstream system through the boundary
//! crates (`openehr`, `couchdb`, `openmrs`, `fhir`, `dicomweb`) and reshapes the answers:
//! - [`physics`]: unit conversions, no upstream
//! - [`temperature_chart`]: temperature chart in EHRbase
//! - [`document_chart`]: temperature chart in CouchDB
//! - [`hl7_gateway`]: HL7v2 messages applied to OpenMRS
//! - [`imaging`]: DICOMweb study browsing
//! - [`clinical_notes`]: clinical notes through FHIR
//!
//! **No API concerns**: HTTP routing and status codes belong in `api-rest` and `api-shared`.

pub mod clinical_notes;
pub mod config;
pub mod constants;
pub mod document_chart;
pub mod error;
pub mod hl7_gateway;
pub mod imaging;
pub mod physics;
pub mod temperature_chart;

pub use clinical_notes::ClinicalNotesService;
pub use config::{Lab, LabsConfig};
pub use document_chart::DocumentChartService;
pub use error::{LabError, LabResult};
pub use hl7_gateway::Hl7Gateway;
pub use imaging::ImagingService;
pub use temperature_chart::TemperatureChartService;
