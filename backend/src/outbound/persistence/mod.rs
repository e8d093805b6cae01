//! PostgreSQL persistence adapter for the activity ledger.
//!
//! Thin translation layer between Diesel rows and domain types. Row structs
//! (`models.rs`) and table definitions (`schema.rs`) never leave this module;
//! connections come from a `bb8` pool over `diesel-async`.

mod diesel_pump_repository;
mod models;
mod pool;
mod schema;

pub use diesel_pump_repository::DieselPumpRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
