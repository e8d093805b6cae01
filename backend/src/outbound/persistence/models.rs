//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and are
//! never exposed to the domain. Conversions validate what the database
//! cannot express: pin range, action text, and pump type text.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{Pump, PumpActivity, PumpAction, PumpName, PumpType};

use super::schema::{pump_activities, pumps};

/// Row struct for reading from the pumps table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pumps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PumpRow {
    pub id: i32,
    pub name: String,
    pub pin: i16,
    pub pump_type: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for provisioning pumps from the pin map.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pumps)]
pub(crate) struct NewPumpRow<'a> {
    pub name: &'a str,
    pub pin: i16,
    pub pump_type: &'a str,
    pub description: Option<&'a str>,
}

/// Row struct for reading from the pump_activities table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pump_activities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PumpActivityRow {
    pub id: i64,
    pub pump_id: i32,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub duration: Option<f64>,
}

/// Insertable struct for appending ledger entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pump_activities)]
pub(crate) struct NewPumpActivityRow<'a> {
    pub pump_id: i32,
    pub action: &'a str,
    pub duration: Option<f64>,
}

impl TryFrom<PumpRow> for Pump {
    type Error = String;

    fn try_from(row: PumpRow) -> Result<Self, Self::Error> {
        let name = PumpName::new(row.name)
            .map_err(|err| format!("stored pump name is invalid: {err}"))?;
        let pin = u8::try_from(row.pin)
            .ok()
            .filter(|pin| *pin < crate::domain::EXPANDER_PIN_COUNT)
            .ok_or_else(|| format!("stored pin {} is out of range", row.pin))?;
        let pump_type: PumpType = row
            .pump_type
            .parse()
            .map_err(|err| format!("stored pump type is invalid: {err}"))?;
        Ok(Self {
            id: row.id,
            name,
            pin,
            pump_type,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<PumpActivityRow> for PumpActivity {
    type Error = String;

    fn try_from(row: PumpActivityRow) -> Result<Self, Self::Error> {
        let action: PumpAction = row
            .action
            .parse()
            .map_err(|err| format!("stored action is invalid: {err}"))?;
        Ok(Self {
            id: row.id,
            pump_id: row.pump_id,
            action,
            timestamp: row.timestamp,
            duration: row.duration,
        })
    }
}
