//! Process bootstrap shared by both binaries: tracing, migrations, and
//! route registration.

pub mod config;

use actix_web::web::ServiceConfig;
use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::inbound::http::{gateway, health, pumps};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Initialise JSON tracing output filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls log a warning and keep the
/// first subscriber.
pub fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

/// Migration failures surfaced at startup.
#[derive(Debug, thiserror::Error)]
#[error("database migration failed: {message}")]
pub struct MigrationError {
    message: String,
}

/// Apply pending migrations over a dedicated synchronous connection.
///
/// Runs before the async pool exists, so blocking here is fine.
pub fn run_migrations(database_url: &str) -> Result<(), MigrationError> {
    let mut conn = PgConnection::establish(database_url).map_err(|err| MigrationError {
        message: err.to_string(),
    })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| MigrationError {
            message: err.to_string(),
        })?;
    for migration in &applied {
        info!(migration = %migration, "applied migration");
    }
    Ok(())
}

/// Register the hardware tier's routes.
pub fn pumpd_routes(cfg: &mut ServiceConfig) {
    cfg.service(health::health)
        .service(pumps::pump_on)
        .service(pumps::pump_off)
        .service(pumps::list_pumps)
        .service(pumps::list_activities);
}

/// Register the front tier's routes.
pub fn gateway_routes(cfg: &mut ServiceConfig) {
    cfg.service(health::health)
        .service(gateway::health_check)
        .service(gateway::pump_on)
        .service(gateway::pump_off);
}
