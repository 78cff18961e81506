use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of the `/health` endpoint of every lab.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Liveness of a lab server. The upstream systems are not contacted.
#[derive(Clone, Copy, Debug)]
pub struct HealthService;

impl HealthService {
    /// Answer of `/health`: the lab is up as soon as it can route requests.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "HIE labs are alive".into(),
        }
    }
}
