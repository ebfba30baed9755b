//! Observation line formats emitted by the scanner firmware.
//!
//! Two text shapes exist in saved logs:
//!
//! * **Dashed** – one line per router: `AA:BB:CC:DD:EE:FF - -61 - eduroam`.
//! * **Labeled** – three lines per router, one field each, shaped
//!   `<label>\t\t<value>\x1b[0m` (the firmware colours its output).
//!
//! Both are parsed by explicit delimiter splitting followed by a field-count
//! check; lines that do not fit are reported as [`LineError`] and skipped by
//! the caller.

use fingerprint_core::models::Observation;
use thiserror::Error;

/// Separator between the fields of a dashed line.
pub const DASHED_SEPARATOR: &str = " - ";

/// Default separator between label and value on a labeled line.
pub const LABELED_DELIMITER: &str = "\t\t";

/// ANSI colour reset appended to every labeled value.
pub const LABELED_SUFFIX: &str = "\x1b[0m";

/// A per-observation parse failure. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("delimiter {delimiter:?} missing in line {line:?}")]
    MissingDelimiter { delimiter: String, line: String },

    #[error("empty router id")]
    EmptyBssid,

    #[error("signal strength {0:?} is not an integer")]
    InvalidRssi(String),
}

/// One of the three fields every observation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Bssid,
    Rssi,
    Ssid,
}

/// A declared per-observation line format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LineFormat {
    /// One line per router, fields joined by `" - "` in router-id/strength/name order.
    #[default]
    Dashed,
    /// One line per field, value after the last `delimiter`, `suffix` stripped.
    Labeled {
        delimiter: String,
        suffix: String,
        order: [Field; 3],
    },
}

impl LineFormat {
    /// Labeled format with router-id/strength/name line order.
    pub fn labeled() -> Self {
        LineFormat::Labeled {
            delimiter: LABELED_DELIMITER.to_string(),
            suffix: LABELED_SUFFIX.to_string(),
            order: [Field::Bssid, Field::Rssi, Field::Ssid],
        }
    }

    /// Labeled format as printed by the first firmware revision, which lists
    /// the name before the router id.
    pub fn legacy_labeled() -> Self {
        LineFormat::Labeled {
            delimiter: LABELED_DELIMITER.to_string(),
            suffix: LABELED_SUFFIX.to_string(),
            order: [Field::Ssid, Field::Bssid, Field::Rssi],
        }
    }

    /// Resolve a format flag value (`dashed`, `labeled`, `legacy`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "dashed" => Some(LineFormat::Dashed),
            "labeled" => Some(LineFormat::labeled()),
            "legacy" => Some(LineFormat::legacy_labeled()),
            _ => None,
        }
    }

    /// Number of physical lines that make up one observation.
    pub fn lines_per_observation(&self) -> usize {
        match self {
            LineFormat::Dashed => 1,
            LineFormat::Labeled { .. } => 3,
        }
    }

    /// Parse one observation from exactly [`lines_per_observation`] lines.
    ///
    /// [`lines_per_observation`]: LineFormat::lines_per_observation
    pub fn parse_observation<S: AsRef<str>>(
        &self,
        lines: &[S],
        scan_index: u32,
    ) -> Result<Observation, LineError> {
        let expected = self.lines_per_observation();
        if lines.len() != expected {
            return Err(LineError::FieldCount {
                expected,
                found: lines.len(),
            });
        }

        match self {
            LineFormat::Dashed => parse_dashed(lines[0].as_ref(), scan_index),
            LineFormat::Labeled {
                delimiter,
                suffix,
                order,
            } => {
                let mut bssid = "";
                let mut rssi = "";
                let mut ssid = "";
                for (line, field) in lines.iter().zip(order.iter()) {
                    let value = labeled_value(line.as_ref(), delimiter, suffix)?;
                    match field {
                        Field::Bssid => bssid = value,
                        Field::Rssi => rssi = value,
                        Field::Ssid => ssid = value,
                    }
                }
                build_observation(bssid, rssi, ssid, scan_index)
            }
        }
    }
}

fn parse_dashed(line: &str, scan_index: u32) -> Result<Observation, LineError> {
    let parts: Vec<&str> = line.splitn(3, DASHED_SEPARATOR).collect();
    if parts.len() != 3 {
        return Err(LineError::FieldCount {
            expected: 3,
            found: parts.len(),
        });
    }
    build_observation(parts[0], parts[1], parts[2], scan_index)
}

/// Text after the last `delimiter`, without `suffix` and surrounding whitespace.
fn labeled_value<'a>(line: &'a str, delimiter: &str, suffix: &str) -> Result<&'a str, LineError> {
    let Some((_, value)) = line.rsplit_once(delimiter) else {
        return Err(LineError::MissingDelimiter {
            delimiter: delimiter.to_string(),
            line: line.to_string(),
        });
    };
    let value = value.trim_end_matches(['\r', '\n']);
    let value = if suffix.is_empty() {
        value
    } else {
        value.strip_suffix(suffix).unwrap_or(value)
    };
    Ok(value.trim())
}

fn build_observation(
    bssid: &str,
    rssi: &str,
    ssid: &str,
    scan_index: u32,
) -> Result<Observation, LineError> {
    let bssid = bssid.trim();
    if bssid.is_empty() {
        return Err(LineError::EmptyBssid);
    }
    let rssi_text = rssi.trim();
    let rssi = rssi_text
        .parse::<i32>()
        .map_err(|_| LineError::InvalidRssi(rssi_text.to_string()))?;

    Ok(Observation {
        bssid: bssid.to_string(),
        ssid: ssid.trim_end_matches('\r').to_string(),
        rssi,
        scan_index,
    })
}
