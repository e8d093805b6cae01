//! Process configuration loaded via OrthoConfig.
//!
//! Each binary has its own settings struct with its own environment prefix,
//! so a host running both tiers can configure them independently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::domain::{PinMap, PinMapError};

const DEFAULT_PUMPD_BIND_ADDR: &str = "0.0.0.0:8001";
const DEFAULT_GATEWAY_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_UPSTREAM_URL: &str = "http://pump-master:8001";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const DEFAULT_I2C_ADDRESS: u16 = 0x20;

fn default_pump_map_path() -> PathBuf {
    PathBuf::from("config").join("pump_map.json")
}

/// Settings for the hardware tier daemon.
#[derive(Debug, Clone, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PUMPD")]
pub struct PumpdSettings {
    /// Listen address for the HTTP server.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL for the activity ledger. Required.
    pub database_url: Option<String>,
    /// Path to the pump name to expander pin map.
    pub pump_map_path: Option<PathBuf>,
    /// Run pending migrations at startup.
    ///
    /// Bool CLI flags parse via `SetTrue`, so an absent flag surfaces as
    /// `false`; treat that default as absent so it stays `None` here.
    #[ortho_config(cli_default_as_absent)]
    pub run_migrations: Option<bool>,
    /// I2C address of the MCP23017 expander.
    #[ortho_config(default = DEFAULT_I2C_ADDRESS)]
    pub i2c_address: u16,
}

impl PumpdSettings {
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_PUMPD_BIND_ADDR)
    }

    /// The ledger database URL.
    ///
    /// # Errors
    ///
    /// Fails when `PUMPD_DATABASE_URL` is unset; there is no usable default
    /// for a database holding real run history.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    pub fn pump_map_path(&self) -> PathBuf {
        self.pump_map_path
            .clone()
            .unwrap_or_else(default_pump_map_path)
    }

    /// Whether to run pending migrations at startup; on unless disabled.
    pub fn run_migrations(&self) -> bool {
        self.run_migrations.unwrap_or(true)
    }
}

/// Settings for the front tier gateway.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GATEWAY")]
pub struct GatewaySettings {
    /// Listen address for the HTTP server.
    pub bind_addr: Option<String>,
    /// Base URL of the hardware tier.
    pub upstream_url: Option<String>,
    /// Per-request timeout for forwarded calls, in seconds.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,
}

impl GatewaySettings {
    pub fn bind_addr(&self) -> &str {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_GATEWAY_BIND_ADDR)
    }

    pub fn upstream_url(&self) -> &str {
        self.upstream_url.as_deref().unwrap_or(DEFAULT_UPSTREAM_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration failures surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("PUMPD_DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("failed to read pump map at {path}: {source}")]
    PumpMapRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse pump map at {path}: {source}")]
    PumpMapParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid pump map at {path}: {source}")]
    PumpMapInvalid { path: PathBuf, source: PinMapError },
}

/// Load and validate the pump map file (`{"name": pin, ...}`).
pub fn load_pin_map(path: &Path) -> Result<PinMap, SettingsError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::PumpMapRead {
        path: path.to_owned(),
        source,
    })?;
    let entries: HashMap<String, u16> =
        serde_json::from_str(&raw).map_err(|source| SettingsError::PumpMapParse {
            path: path.to_owned(),
            source,
        })?;
    PinMap::new(entries).map_err(|source| SettingsError::PumpMapInvalid {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    //! Configuration parsing and pump map loading.

    use std::ffi::OsString;
    use std::io::Write;

    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    fn load_pumpd_from_empty_args() -> PumpdSettings {
        PumpdSettings::load_from_iter([OsString::from("pumpd")]).expect("config should load")
    }

    fn load_gateway_from_empty_args() -> GatewaySettings {
        GatewaySettings::load_from_iter([OsString::from("gateway")]).expect("config should load")
    }

    #[rstest]
    fn pumpd_defaults_are_used_when_missing() {
        let _guard = lock_env([
            ("PUMPD_BIND_ADDR", None::<String>),
            ("PUMPD_DATABASE_URL", None::<String>),
            ("PUMPD_PUMP_MAP_PATH", None::<String>),
            ("PUMPD_RUN_MIGRATIONS", None::<String>),
            ("PUMPD_I2C_ADDRESS", None::<String>),
        ]);

        let settings = load_pumpd_from_empty_args();
        assert_eq!(settings.bind_addr(), DEFAULT_PUMPD_BIND_ADDR);
        assert_eq!(settings.pump_map_path(), default_pump_map_path());
        assert!(settings.run_migrations());
        assert_eq!(settings.i2c_address, DEFAULT_I2C_ADDRESS);
        assert!(matches!(
            settings.database_url(),
            Err(SettingsError::MissingDatabaseUrl)
        ));
    }

    #[rstest]
    fn pumpd_environment_overrides_are_respected() {
        let _guard = lock_env([
            ("PUMPD_BIND_ADDR", Some("127.0.0.1:9001".to_owned())),
            (
                "PUMPD_DATABASE_URL",
                Some("postgres://localhost/hydro".to_owned()),
            ),
            (
                "PUMPD_PUMP_MAP_PATH",
                Some("/etc/hydro/pumps.json".to_owned()),
            ),
            ("PUMPD_RUN_MIGRATIONS", Some("false".to_owned())),
            ("PUMPD_I2C_ADDRESS", Some("33".to_owned())),
        ]);

        let settings = load_pumpd_from_empty_args();
        assert_eq!(settings.bind_addr(), "127.0.0.1:9001");
        assert_eq!(
            settings.database_url().expect("url set"),
            "postgres://localhost/hydro"
        );
        assert_eq!(
            settings.pump_map_path(),
            PathBuf::from("/etc/hydro/pumps.json")
        );
        assert!(!settings.run_migrations());
        assert_eq!(settings.i2c_address, 33);
    }

    #[rstest]
    fn gateway_defaults_are_used_when_missing() {
        let _guard = lock_env([
            ("GATEWAY_BIND_ADDR", None::<String>),
            ("GATEWAY_UPSTREAM_URL", None::<String>),
            ("GATEWAY_REQUEST_TIMEOUT_SECS", None::<String>),
        ]);

        let settings = load_gateway_from_empty_args();
        assert_eq!(settings.bind_addr(), DEFAULT_GATEWAY_BIND_ADDR);
        assert_eq!(settings.upstream_url(), DEFAULT_UPSTREAM_URL);
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
    }

    #[rstest]
    fn gateway_environment_overrides_are_respected() {
        let _guard = lock_env([
            ("GATEWAY_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            (
                "GATEWAY_UPSTREAM_URL",
                Some("http://127.0.0.1:9001".to_owned()),
            ),
            ("GATEWAY_REQUEST_TIMEOUT_SECS", Some("2".to_owned())),
        ]);

        let settings = load_gateway_from_empty_args();
        assert_eq!(settings.bind_addr(), "127.0.0.1:9000");
        assert_eq!(settings.upstream_url(), "http://127.0.0.1:9001");
        assert_eq!(settings.request_timeout(), Duration::from_secs(2));
    }

    #[rstest]
    fn pump_maps_load_and_validate() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"ph_up": 0, "flush_1": 6}}"#).expect("write map");

        let map = load_pin_map(file.path()).expect("valid map");
        assert_eq!(map.len(), 2);
        assert_eq!(map.pin_for(&"flush_1".parse().expect("valid name")), Some(6));
    }

    #[rstest]
    #[case::out_of_range(r#"{"ph_up": 16}"#)]
    #[case::duplicate_pin(r#"{"ph_up": 3, "ph_down": 3}"#)]
    #[case::bad_name(r#"{"ph up": 3}"#)]
    fn invalid_pump_maps_are_rejected(#[case] contents: &str) {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{contents}").expect("write map");

        assert!(matches!(
            load_pin_map(file.path()),
            Err(SettingsError::PumpMapInvalid { .. })
        ));
    }

    #[rstest]
    fn missing_pump_map_files_are_reported() {
        assert!(matches!(
            load_pin_map(Path::new("/nonexistent/pumps.json")),
            Err(SettingsError::PumpMapRead { .. })
        ));
    }

    #[rstest]
    fn malformed_pump_map_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write map");

        assert!(matches!(
            load_pin_map(file.path()),
            Err(SettingsError::PumpMapParse { .. })
        ));
    }
}
