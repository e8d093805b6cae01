//! Inbound adapters: the HTTP surfaces of both tiers.

pub mod http;
