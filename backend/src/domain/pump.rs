//! Pump model: identity, hardware binding, and the activity record.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of addressable pins on the MCP23017 expander (GPA0-GPA7, GPB0-GPB7).
pub const EXPANDER_PIN_COUNT: u8 = 16;

/// Validated pump name used as the wire-level identifier.
///
/// ## Invariants
/// - non-empty, at most 64 characters
/// - ASCII alphanumerics plus `_` and `-`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PumpName(String);

/// Validation errors for [`PumpName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PumpNameError {
    #[error("pump name must not be empty")]
    Empty,
    #[error("pump name must be at most 64 characters")]
    TooLong,
    #[error("pump name must contain only ASCII alphanumerics, '_' or '-'")]
    InvalidCharacter,
}

impl PumpName {
    /// Parse and validate a pump name.
    pub fn new(raw: impl Into<String>) -> Result<Self, PumpNameError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(PumpNameError::Empty);
        }
        if raw.len() > 64 {
            return Err(PumpNameError::TooLong);
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(PumpNameError::InvalidCharacter);
        }
        Ok(Self(raw))
    }

    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for PumpName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PumpName {
    type Err = PumpNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PumpName {
    type Error = PumpNameError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<PumpName> for String {
    fn from(name: PumpName) -> Self {
        name.0
    }
}

/// Pump category, inferred from the name at provisioning time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpType {
    /// Peristaltic nutrient or pH dosing pump.
    Nutrient,
    /// Flush/fill pump moving bulk water.
    HighVolume,
}

impl PumpType {
    /// Infer the type from the configured name: `flush*` and `fill*` pumps
    /// move bulk water, everything else doses nutrients.
    pub fn infer_from_name(name: &PumpName) -> Self {
        let raw = name.as_str();
        if raw.starts_with("flush") || raw.starts_with("fill") {
            Self::HighVolume
        } else {
            Self::Nutrient
        }
    }

    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nutrient => "nutrient",
            Self::HighVolume => "high_volume",
        }
    }
}

impl FromStr for PumpType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nutrient" => Ok(Self::Nutrient),
            "high_volume" => Ok(Self::HighVolume),
            other => Err(format!("unknown pump type '{other}'")),
        }
    }
}

/// Recorded transition direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpAction {
    On,
    Off,
}

impl PumpAction {
    /// Stable storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl FromStr for PumpAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(format!("unknown pump action '{other}'")),
        }
    }
}

impl std::fmt::Display for PumpAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisioned pump and its last known relay state.
#[derive(Debug, Clone, PartialEq)]
pub struct Pump {
    pub id: i32,
    pub name: PumpName,
    pub pin: u8,
    pub pump_type: PumpType,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One on/off event. `duration` is only present on OFF records that close
/// a prior ON; it is the elapsed on-time in seconds, never negative.
#[derive(Debug, Clone, PartialEq)]
pub struct PumpActivity {
    pub id: i64,
    pub pump_id: i32,
    pub action: PumpAction,
    pub timestamp: DateTime<Utc>,
    pub duration: Option<f64>,
}

/// Immutable name-to-pin mapping built once at startup.
///
/// Used both as the relay routing table and as the provisioning source for
/// the ledger's config sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMap {
    entries: HashMap<PumpName, u8>,
}

/// Validation errors for [`PinMap`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinMapError {
    #[error("invalid pump name '{name}': {source}")]
    InvalidName {
        name: String,
        #[source]
        source: PumpNameError,
    },
    #[error("pin {pin} for pump '{name}' is outside the expander range 0-{max}", max = EXPANDER_PIN_COUNT - 1)]
    PinOutOfRange { name: String, pin: u16 },
    #[error("pin {pin} is mapped to both '{first}' and '{second}'")]
    DuplicatePin {
        pin: u8,
        first: String,
        second: String,
    },
}

impl PinMap {
    /// Build a validated map from raw `name -> pin` pairs.
    pub fn new<I>(raw: I) -> Result<Self, PinMapError>
    where
        I: IntoIterator<Item = (String, u16)>,
    {
        let mut entries: HashMap<PumpName, u8> = HashMap::new();
        let mut by_pin: HashMap<u8, PumpName> = HashMap::new();
        for (name, pin) in raw {
            let pump_name = PumpName::new(name.as_str()).map_err(|source| {
                PinMapError::InvalidName {
                    name: name.clone(),
                    source,
                }
            })?;
            if pin >= u16::from(EXPANDER_PIN_COUNT) {
                return Err(PinMapError::PinOutOfRange { name, pin });
            }
            let pin = pin as u8;
            if let Some(existing) = by_pin.get(&pin) {
                return Err(PinMapError::DuplicatePin {
                    pin,
                    first: existing.to_string(),
                    second: name,
                });
            }
            by_pin.insert(pin, pump_name.clone());
            entries.insert(pump_name, pin);
        }
        Ok(Self { entries })
    }

    /// Look up the pin for a pump name.
    pub fn pin_for(&self, name: &PumpName) -> Option<u8> {
        self.entries.get(name).copied()
    }

    /// Iterate over the mapped pumps.
    pub fn iter(&self) -> impl Iterator<Item = (&PumpName, u8)> {
        self.entries.iter().map(|(name, pin)| (name, *pin))
    }

    /// Number of mapped pumps.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no pumps.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for name validation, type inference, and pin maps.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::nutrient("ph_down", PumpType::Nutrient)]
    #[case::nutrient_salt("calcium_nitrate", PumpType::Nutrient)]
    #[case::flush("flush_1", PumpType::HighVolume)]
    #[case::fill("fill_2", PumpType::HighVolume)]
    fn pump_type_is_inferred_from_the_name_prefix(
        #[case] name: &str,
        #[case] expected: PumpType,
    ) {
        let name = PumpName::new(name).expect("valid name");
        assert_eq!(PumpType::infer_from_name(&name), expected);
    }

    #[rstest]
    #[case::empty("", PumpNameError::Empty)]
    #[case::space("ph up", PumpNameError::InvalidCharacter)]
    #[case::slash("ph/up", PumpNameError::InvalidCharacter)]
    fn invalid_names_are_rejected(#[case] raw: &str, #[case] expected: PumpNameError) {
        assert_eq!(PumpName::new(raw).expect_err("must fail"), expected);
    }

    #[rstest]
    fn overlong_names_are_rejected() {
        let raw = "p".repeat(65);
        assert_eq!(
            PumpName::new(raw).expect_err("must fail"),
            PumpNameError::TooLong
        );
    }

    #[rstest]
    fn pin_map_accepts_the_full_expander_range() {
        let map = PinMap::new([
            ("calcium_nitrate".to_owned(), 0),
            ("fill_2".to_owned(), 15),
        ])
        .expect("valid map");
        let name = PumpName::new("fill_2").expect("valid name");
        assert_eq!(map.pin_for(&name), Some(15));
        assert_eq!(map.len(), 2);
    }

    #[rstest]
    fn pin_map_rejects_out_of_range_pins() {
        let error =
            PinMap::new([("ph_up".to_owned(), 16)]).expect_err("pin 16 is out of range");
        assert!(matches!(error, PinMapError::PinOutOfRange { pin: 16, .. }));
    }

    #[rstest]
    fn pin_map_rejects_duplicate_pins() {
        let error = PinMap::new([("ph_up".to_owned(), 3), ("ph_down".to_owned(), 3)])
            .expect_err("duplicate pin");
        assert!(matches!(error, PinMapError::DuplicatePin { pin: 3, .. }));
    }

    #[rstest]
    fn action_round_trips_through_storage_text() {
        for action in [PumpAction::On, PumpAction::Off] {
            assert_eq!(
                action.as_str().parse::<PumpAction>().expect("parses"),
                action
            );
        }
    }
}
