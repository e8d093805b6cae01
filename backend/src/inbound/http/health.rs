//! Liveness endpoint shared by both tiers.
//!
//! Reports only that the process is up; it never depends on downstream
//! tiers, the database, or the hardware.

use actix_web::{get, web};
use serde::{Deserialize, Serialize};

/// Liveness payload: `{"status": "ok"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
}

impl HealthBody {
    /// The healthy payload.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_owned(),
        }
    }
}

/// Liveness probe. Healthy whenever the process can answer at all.
#[get("/health")]
pub async fn health() -> web::Json<HealthBody> {
    web::Json(HealthBody::ok())
}
