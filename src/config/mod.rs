//! # Configuration Management Module
//!
//! Station, auto-send and logging settings, loaded from a TOML file.
//!
//! ## Configuration File Format
//!
//! ```toml
//! demo_mode = false
//!
//! [station]
//! callsign = "N0CALL-10"
//! latitude = 41.0115
//! longitude = 29.1255
//! comment = "APRS Position Sender"
//! symbol = "/>"
//! path = "APRS"
//! server = "euro.aprs2.net"
//! port = 14580
//! passcode = "-1"
//! status = "On the air"
//!
//! [auto_send]
//! enabled = false
//! interval_seconds = 600
//! count = 10
//!
//! [logging]
//! level = "info"
//! file = "aprsbeacon.log"
//! ```
//!
//! Every key also accepts its upper-case environment-style name (`CALLSIGN`,
//! `LATITUDE`, `APRS_IS_SERVER`, `AUTO_SEND_INTERVAL`, ...), so an existing
//! `.env`-style key set can be pasted into the matching section.
//!
//! ## Overrides
//!
//! [`Config::apply_overrides`] layers values from a key lookup (the binary passes the
//! process environment) over the file: Environment > Config file > Defaults.
//! Nothing in the library reads the environment on its own.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::fs;

use crate::beacon::scheduler::StationSource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Build and log packets without connecting to APRS-IS.
    #[serde(default, alias = "DEMO_MODE")]
    pub demo_mode: bool,
    pub station: StationConfig,
    #[serde(default)]
    pub auto_send: AutoSendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Everything needed to build and deliver one report.
///
/// Coordinates and passcode are kept as text and parsed during validation, so a bad
/// value is reported before any network I/O instead of failing the file load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(alias = "CALLSIGN")]
    pub callsign: String,
    #[serde(alias = "LATITUDE", deserialize_with = "number_or_string")]
    pub latitude: String,
    #[serde(alias = "LONGITUDE", deserialize_with = "number_or_string")]
    pub longitude: String,
    #[serde(default, alias = "COMMENT")]
    pub comment: String,
    /// Symbol table character followed by symbol code.
    #[serde(default = "default_symbol", alias = "SYMBOL")]
    pub symbol: String,
    #[serde(default = "default_path", alias = "APRS_PATH")]
    pub path: String,
    #[serde(default = "default_server", alias = "APRS_IS_SERVER")]
    pub server: String,
    #[serde(default = "default_port", alias = "APRS_IS_PORT")]
    pub port: u16,
    /// `-1` logs in read-only and never transmits.
    #[serde(
        default = "default_passcode",
        alias = "APRS_IS_PASSCODE",
        deserialize_with = "number_or_string"
    )]
    pub passcode: String,
    #[serde(default, alias = "APRS_STATUS", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoSendConfig {
    #[serde(default, alias = "AUTO_SEND_ENABLED")]
    pub enabled: bool,
    /// Seconds between ticks; outside 60..=86400 is rejected at start.
    #[serde(default = "default_interval", alias = "AUTO_SEND_INTERVAL")]
    pub interval_seconds: u64,
    /// Number of ticks before the run ends.
    #[serde(default = "default_count", alias = "AUTO_SEND_COUNT")]
    pub count: u32,
}

impl Default for AutoSendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: default_interval(),
            count: default_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_symbol() -> String {
    "/>".to_string()
}

fn default_path() -> String {
    "APRS".to_string()
}

fn default_server() -> String {
    "euro.aprs2.net".to_string()
}

fn default_port() -> u16 {
    14580
}

fn default_passcode() -> String {
    crate::aprs::passcode::READ_ONLY_PASSCODE.to_string()
}

fn default_interval() -> u64 {
    600
}

fn default_count() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Accept `41.01`, `-1` or `"41.01"` and keep the textual form.
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
        Raw::Text(s) => s,
    })
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            callsign: "N0CALL".to_string(),
            latitude: "0.0".to_string(),
            longitude: "0.0".to_string(),
            comment: "APRS Position Sender".to_string(),
            symbol: default_symbol(),
            path: default_path(),
            server: default_server(),
            port: default_port(),
            passcode: default_passcode(),
            status: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Overlay values found through `lookup`, keyed by the upper-case names
    /// (`CALLSIGN`, `LATITUDE`, ..., `AUTO_SEND_COUNT`, `DEMO_MODE`).
    ///
    /// Numeric and boolean keys that do not parse are ignored with an error returned
    /// listing the offending keys; string keys always apply.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut bad = Vec::new();
        let station = &mut self.station;
        for (key, slot) in [
            ("CALLSIGN", &mut station.callsign),
            ("LATITUDE", &mut station.latitude),
            ("LONGITUDE", &mut station.longitude),
            ("COMMENT", &mut station.comment),
            ("SYMBOL", &mut station.symbol),
            ("APRS_PATH", &mut station.path),
            ("APRS_IS_SERVER", &mut station.server),
            ("APRS_IS_PASSCODE", &mut station.passcode),
        ] {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
        if let Some(value) = lookup("APRS_STATUS") {
            station.status = Some(value);
        }
        if let Some(value) = lookup("APRS_IS_PORT") {
            match value.trim().parse() {
                Ok(port) => station.port = port,
                Err(_) => bad.push("APRS_IS_PORT"),
            }
        }
        if let Some(value) = lookup("AUTO_SEND_ENABLED") {
            match parse_flag(&value) {
                Some(flag) => self.auto_send.enabled = flag,
                None => bad.push("AUTO_SEND_ENABLED"),
            }
        }
        if let Some(value) = lookup("AUTO_SEND_INTERVAL") {
            match value.trim().parse() {
                Ok(secs) => self.auto_send.interval_seconds = secs,
                Err(_) => bad.push("AUTO_SEND_INTERVAL"),
            }
        }
        if let Some(value) = lookup("AUTO_SEND_COUNT") {
            match value.trim().parse() {
                Ok(count) => self.auto_send.count = count,
                Err(_) => bad.push("AUTO_SEND_COUNT"),
            }
        }
        if let Some(value) = lookup("DEMO_MODE") {
            match parse_flag(&value) {
                Some(flag) => self.demo_mode = flag,
                None => bad.push("DEMO_MODE"),
            }
        }

        if bad.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Ignored malformed override(s): {}", bad.join(", ")))
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Station source that re-reads a config file on every scheduler tick, so position
/// and comment edits take effect without restarting a periodic run.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: String,
    env_overrides: bool,
}

impl ConfigFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            env_overrides: false,
        }
    }

    /// Also apply process environment overrides after each reload.
    pub fn with_env_overrides(mut self) -> Self {
        self.env_overrides = true;
        self
    }
}

impl StationSource for ConfigFile {
    async fn current(&mut self) -> Result<StationConfig> {
        let mut config = Config::load(&self.path).await?;
        if self.env_overrides {
            if let Err(e) = config.apply_overrides(|key| std::env::var(key).ok()) {
                log::warn!("{}", e);
            }
        }
        Ok(config.station)
    }
}
