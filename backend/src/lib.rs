//! Pump control and activity ledger for a hydroponic rig.
//!
//! Two binaries share this library: `pumpd` owns the relay hardware and the
//! ledger database, and `gateway` forwards pump commands to it over HTTP.
//! The crate follows a hexagonal layout: `domain` holds the model, ports,
//! and services; `inbound` and `outbound` hold the adapters; `server` wires
//! processes together.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;
