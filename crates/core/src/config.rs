//! Lab runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the lab services.
//! Nothing in this crate reads process-wide environment variables during request handling;
//! binaries call [`LabsConfig::from_env`], tests call [`LabsConfig::from_lookup`] with a map.

use crate::{LabError, LabResult};
use hie_types::{BaseUrl, BasicCredentials};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Labs
// ============================================================================

/// One of the exercises that can be served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lab {
    Physics,
    Ehrbase,
    CouchDb,
    Hl7,
    DicomWeb,
    Fhir,
}

impl Lab {
    pub const ALL: [Lab; 6] = [
        Lab::Physics,
        Lab::Ehrbase,
        Lab::CouchDb,
        Lab::Hl7,
        Lab::DicomWeb,
        Lab::Fhir,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Lab::Physics => "physics",
            Lab::Ehrbase => "ehrbase",
            Lab::CouchDb => "couchdb",
            Lab::Hl7 => "hl7",
            Lab::DicomWeb => "dicomweb",
            Lab::Fhir => "fhir",
        }
    }

    fn addr_variable(self) -> &'static str {
        match self {
            Lab::Physics => "HIE_PHYSICS_ADDR",
            Lab::Ehrbase => "HIE_EHRBASE_ADDR",
            Lab::CouchDb => "HIE_COUCHDB_ADDR",
            Lab::Hl7 => "HIE_HL7_ADDR",
            Lab::DicomWeb => "HIE_DICOMWEB_ADDR",
            Lab::Fhir => "HIE_FHIR_ADDR",
        }
    }

    fn default_addr(self) -> &'static str {
        match self {
            Lab::Physics => "0.0.0.0:5000",
            Lab::Ehrbase => "0.0.0.0:5003",
            Lab::CouchDb => "0.0.0.0:5004",
            Lab::Hl7 => "0.0.0.0:5006",
            Lab::DicomWeb => "0.0.0.0:5007",
            Lab::Fhir => "0.0.0.0:5008",
        }
    }
}

impl fmt::Display for Lab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Lab {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lab::ALL
            .into_iter()
            .find(|lab| lab.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LabError::Configuration(format!("unknown lab: {s}")))
    }
}

// ============================================================================
// Upstream credentials
// ============================================================================

/// Connection settings of an EHRbase server.
#[derive(Clone, Debug)]
pub struct OpenEhrCredentials {
    pub url: BaseUrl,
    pub credentials: BasicCredentials,
}

impl OpenEhrCredentials {
    pub fn client(&self) -> openehr::OpenEhrClient {
        openehr::OpenEhrClient::new(self.url.clone(), self.credentials.clone())
    }
}

/// Settings of the EHRbase lab.
#[derive(Clone, Debug)]
pub struct EhrbaseConfig {
    pub server: OpenEhrCredentials,
    /// Name written as composer of every composition; listings only show compositions
    /// authored under this name.
    pub composer: String,
    /// Directory containing `<template id>.opt`.
    pub template_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct CouchDbCredentials {
    pub url: BaseUrl,
    pub credentials: BasicCredentials,
    /// Database holding the patients and temperatures.
    pub collection: String,
}

impl CouchDbCredentials {
    pub fn client(&self) -> couchdb::CouchDbClient {
        couchdb::CouchDbClient::new(self.url.clone(), self.credentials.clone())
    }
}

#[derive(Clone, Debug)]
pub struct OpenMrsCredentials {
    pub url: BaseUrl,
    pub credentials: BasicCredentials,
}

impl OpenMrsCredentials {
    pub fn client(&self) -> openmrs::OpenMrsClient {
        openmrs::OpenMrsClient::new(self.url.clone(), self.credentials.clone())
    }
}

/// Settings of the FHIR lab, which writes through FHIR and looks up metadata through the
/// OpenMRS REST API of the same server.
#[derive(Clone, Debug)]
pub struct FhirCredentials {
    pub url: BaseUrl,
    pub credentials: BasicCredentials,
    pub openmrs: OpenMrsCredentials,
}

impl FhirCredentials {
    pub fn client(&self) -> fhir::FhirClient {
        fhir::FhirClient::new(self.url.clone(), self.credentials.clone())
    }
}

#[derive(Clone, Debug)]
pub struct DicomWebConfig {
    pub url: BaseUrl,
    pub credentials: Option<BasicCredentials>,
}

impl DicomWebConfig {
    pub fn client(&self) -> dicomweb::DicomWebClient {
        dicomweb::DicomWebClient::new(self.url.clone(), self.credentials.clone())
    }
}

#[derive(Clone, Debug)]
pub struct Hl7Config {
    pub openmrs: OpenMrsCredentials,
    pub local: hl7::LocalEndpoint,
    pub message_id_prefix: String,
}

// ============================================================================
// Whole configuration
// ============================================================================

/// Configuration of every lab, resolved at startup.
#[derive(Clone, Debug)]
pub struct LabsConfig {
    enabled: Vec<Lab>,
    addrs: Vec<(Lab, SocketAddr)>,
    front_end_root: PathBuf,
    pub ehrbase: EhrbaseConfig,
    pub couchdb: CouchDbCredentials,
    pub hl7: Hl7Config,
    pub dicomweb: DicomWebConfig,
    pub fhir: FhirCredentials,
}

impl LabsConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> LabResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from `lookup`, which returns the value of a variable if set.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::Configuration`] if:
    /// - an address or a URL cannot be parsed,
    /// - `HIE_LABS` names an unknown lab.
    pub fn from_lookup<F>(lookup: F) -> LabResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let url = |key: &str, default: &str| {
            let raw = var(key, default);
            BaseUrl::parse(&raw)
                .map_err(|e| LabError::Configuration(format!("{key}={raw}: {e}")))
        };

        let enabled = match lookup("HIE_LABS").filter(|v| !v.trim().is_empty()) {
            None => Lab::ALL.to_vec(),
            Some(list) => list
                .split(',')
                .filter(|name| !name.trim().is_empty())
                .map(Lab::from_str)
                .collect::<LabResult<Vec<_>>>()?,
        };

        let mut addrs = Vec::with_capacity(Lab::ALL.len());
        for lab in Lab::ALL {
            let raw = var(lab.addr_variable(), lab.default_addr());
            let addr = raw.parse::<SocketAddr>().map_err(|e| {
                LabError::Configuration(format!("{}={raw}: {e}", lab.addr_variable()))
            })?;
            addrs.push((lab, addr));
        }

        let front_end_root = PathBuf::from(var("HIE_FRONT_END_DIR", "front-end"));

        let ehrbase = EhrbaseConfig {
            server: OpenEhrCredentials {
                url: url("EHRBASE_URL", "http://localhost:8001/ehrbase/rest")?,
                credentials: BasicCredentials::new(
                    var("EHRBASE_USERNAME", "ehrbase-user"),
                    var("EHRBASE_PASSWORD", "SuperSecretPassword"),
                ),
            },
            composer: var("OPENEHR_COMPOSER", &uuid::Uuid::new_v4().to_string()),
            template_dir: PathBuf::from(var("OPENEHR_TEMPLATE_DIR", "resources")),
        };

        let couchdb = CouchDbCredentials {
            url: url("COUCHDB_URL", "http://localhost:8002")?,
            credentials: BasicCredentials::new(
                var("COUCHDB_USERNAME", "admin"),
                var("COUCHDB_PASSWORD", "password"),
            ),
            collection: var("COUCHDB_COLLECTION", "ehr"),
        };

        let openmrs = OpenMrsCredentials {
            url: url("OPENMRS_URL", "http://localhost:8003/openmrs/ws/rest")?,
            credentials: BasicCredentials::new(
                var("OPENMRS_USERNAME", "admin"),
                var("OPENMRS_PASSWORD", "Admin123"),
            ),
        };

        let hl7 = Hl7Config {
            openmrs: openmrs.clone(),
            local: hl7::LocalEndpoint {
                application: var("HL7_APPLICATION", "HIE"),
                facility: var("HL7_FACILITY", "HIE"),
            },
            message_id_prefix: var("HL7_MESSAGE_ID_PREFIX", "MSG_ID_"),
        };

        let dicomweb = DicomWebConfig {
            url: url("DICOMWEB_URL", "https://orthanc.uclouvain.be/demo/dicom-web")?,
            credentials: match (lookup("DICOMWEB_USERNAME"), lookup("DICOMWEB_PASSWORD")) {
                (Some(username), Some(password)) if !username.is_empty() => {
                    Some(BasicCredentials::new(username, password))
                }
                _ => None,
            },
        };

        let fhir = FhirCredentials {
            url: url("FHIR_URL", "http://localhost:8003/openmrs/ws/fhir2/R4")?,
            credentials: openmrs.credentials.clone(),
            openmrs,
        };

        Ok(Self {
            enabled,
            addrs,
            front_end_root,
            ehrbase,
            couchdb,
            hl7,
            dicomweb,
            fhir,
        })
    }

    /// Labs to serve, in declaration order of `HIE_LABS` (all labs by default).
    pub fn enabled_labs(&self) -> &[Lab] {
        &self.enabled
    }

    /// Listening address of `lab`.
    pub fn addr(&self, lab: Lab) -> SocketAddr {
        self.addrs
            .iter()
            .find(|(l, _)| *l == lab)
            .map(|(_, addr)| *addr)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)))
    }

    /// Directory holding the `index.html` and `app.js` of `lab`.
    pub fn front_end_dir(&self, lab: Lab) -> PathBuf {
        self.front_end_root.join(lab.name())
    }
}
