//! Station configuration validation.
//!
//! Everything here runs before a session is opened: a report that fails validation
//! never touches the network.

use crate::aprs::passcode::{calculate_passcode, is_read_only};
use crate::config::StationConfig;

/// Configuration problems detected before any network I/O.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("CALLSIGN is missing")]
    MissingCallsign,

    #[error("CALLSIGN must be ASCII without spaces or '>', ':', ',': {0:?}")]
    InvalidCallsign(String),

    #[error("{field} is not a number: {value:?}")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field} {value} is outside -{limit}..={limit}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        limit: f64,
    },

    #[error("SYMBOL must be exactly two characters (table + code), got {0:?}")]
    InvalidSymbol(String),

    #[error("APRS_IS_PASSCODE must be -1 or an integer, got {0:?}")]
    InvalidPasscode(String),

    #[error("APRS_STATUS text is missing")]
    MissingStatus,
}

/// A station whose position fields have been checked and parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPosition {
    pub callsign: String,
    pub latitude: f64,
    pub longitude: f64,
    pub comment: String,
    pub symbol: String,
    pub path: String,
}

/// Check the fields a position report needs.
pub fn validate_position(station: &StationConfig) -> Result<ValidPosition, ConfigError> {
    let callsign = validate_callsign(&station.callsign)?;
    let latitude = parse_coordinate("LATITUDE", &station.latitude, 90.0)?;
    let longitude = parse_coordinate("LONGITUDE", &station.longitude, 180.0)?;
    if station.symbol.chars().count() != 2 {
        return Err(ConfigError::InvalidSymbol(station.symbol.clone()));
    }
    validate_passcode(&station.passcode)?;
    Ok(ValidPosition {
        callsign,
        latitude,
        longitude,
        comment: station.comment.clone(),
        symbol: station.symbol.clone(),
        path: station.path.clone(),
    })
}

/// Check the fields a status report needs and return the status text.
pub fn validate_status(station: &StationConfig) -> Result<String, ConfigError> {
    validate_callsign(&station.callsign)?;
    validate_passcode(&station.passcode)?;
    match station.status.as_deref() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(ConfigError::MissingStatus),
    }
}

fn validate_callsign(callsign: &str) -> Result<String, ConfigError> {
    let trimmed = callsign.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingCallsign);
    }
    // Header separators and non-ASCII would corrupt the packet.
    if trimmed
        .chars()
        .any(|c| !c.is_ascii_graphic() || matches!(c, '>' | ':' | ','))
    {
        return Err(ConfigError::InvalidCallsign(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_coordinate(field: &'static str, raw: &str, limit: f64) -> Result<f64, ConfigError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::NotNumeric {
            field,
            value: raw.to_string(),
        })?;
    if !value.is_finite() {
        return Err(ConfigError::NotNumeric {
            field,
            value: raw.to_string(),
        });
    }
    if value.abs() > limit {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            limit,
        });
    }
    Ok(value)
}

fn validate_passcode(passcode: &str) -> Result<(), ConfigError> {
    if is_read_only(passcode) || passcode.trim().parse::<u16>().is_ok() {
        Ok(())
    } else {
        Err(ConfigError::InvalidPasscode(passcode.to_string()))
    }
}

/// Passcode the server would expect, when it differs from the configured one.
pub fn passcode_mismatch(station: &StationConfig) -> Option<u16> {
    if is_read_only(&station.passcode) {
        return None;
    }
    let expected = calculate_passcode(station.callsign.trim());
    match station.passcode.trim().parse::<u16>() {
        Ok(configured) if configured == expected => None,
        _ => Some(expected),
    }
}
