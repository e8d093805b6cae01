//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. When a
//! migration changes the schema, regenerate or update this file to match
//! (`diesel print-schema` against a migrated database).

diesel::table! {
    /// Provisioned pumps keyed by expander pin.
    pumps (id) {
        /// Primary key.
        id -> Int4,
        /// Wire-level pump name, unique across the rig.
        name -> Varchar,
        /// MCP23017 pin driving this pump's relay (0..=15).
        pin -> Int2,
        /// Pump class: `nutrient` or `high_volume`.
        pump_type -> Varchar,
        /// Optional operator note.
        description -> Nullable<Text>,
        /// Last ledgered relay state.
        is_active -> Bool,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only activity ledger.
    pump_activities (id) {
        /// Primary key.
        id -> Int8,
        /// Pump the activity belongs to.
        pump_id -> Int4,
        /// Recorded action: `on` or `off`.
        action -> Varchar,
        /// When the action was ledgered.
        timestamp -> Timestamptz,
        /// Seconds the pump ran, set on OFF rows that close an open ON.
        duration -> Nullable<Float8>,
    }
}

diesel::joinable!(pump_activities -> pumps (pump_id));

diesel::allow_tables_to_appear_in_same_query!(pumps, pump_activities);
