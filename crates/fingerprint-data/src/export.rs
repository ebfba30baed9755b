//! Projections of the fingerprint store for persistence.
//!
//! Two shapes are produced, both pure views of already computed data:
//!
//! * keyed JSON – `{ name: { "location": ..., "networks": { bssid: avg } } }`
//! * a three-row CSV table per session – SSIDs, averages and raw samples, one
//!   column per BSSID.
//!
//! Files are written to a temporary sibling and renamed into place so a failed
//! run never leaves a half-written artifact.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use fingerprint_core::error::{FingerprintError, Result};
use fingerprint_core::formatting::{format_samples, round_to};
use fingerprint_core::models::Fingerprint;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::FingerprintStore;

// ── Keyed JSON ────────────────────────────────────────────────────────────────

/// One session in the keyed JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedEntry {
    pub location: String,
    /// BSSID → average RSSI.
    pub networks: BTreeMap<String, f64>,
}

/// Session name → entry.
pub type KeyedFingerprints = BTreeMap<String, KeyedEntry>;

/// Project the store into the keyed shape, rounding only when `decimals` is set.
pub fn to_keyed(store: &FingerprintStore, decimals: Option<u32>) -> KeyedFingerprints {
    store
        .iter()
        .map(|(name, session)| {
            let networks = session
                .fingerprint()
                .map(|fp| {
                    fp.iter()
                        .map(|(bssid, stats)| (bssid.clone(), apply_decimals(stats.avg_rssi, decimals)))
                        .collect()
                })
                .unwrap_or_default();
            (
                name.clone(),
                KeyedEntry {
                    location: session.location.clone(),
                    networks,
                },
            )
        })
        .collect()
}

/// Overlay `update` on `base`; sessions present in both take `update`'s entry.
pub fn merge_keyed(base: &mut KeyedFingerprints, update: KeyedFingerprints) {
    for (name, entry) in update {
        base.insert(name, entry);
    }
}

/// Write the keyed document as pretty JSON.
pub fn write_keyed_json(path: &Path, keyed: &KeyedFingerprints) -> Result<()> {
    let json = serde_json::to_string_pretty(keyed)?;
    write_atomic(path, json.as_bytes())?;
    debug!("Wrote {} sessions to {}", keyed.len(), path.display());
    Ok(())
}

/// Read a keyed document back. A missing or unparseable file is fatal.
pub fn read_keyed_json(path: &Path) -> Result<KeyedFingerprints> {
    let content = std::fs::read_to_string(path).map_err(|source| FingerprintError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

// ── CSV table ─────────────────────────────────────────────────────────────────

/// Write one fingerprint as a table: header of BSSIDs, then SSID, average and
/// sample rows. An empty fingerprint writes nothing.
pub fn write_csv<W: Write>(writer: W, fingerprint: &Fingerprint, decimals: Option<u32>) -> Result<()> {
    if fingerprint.is_empty() {
        return Ok(());
    }
    let mut csv = csv::Writer::from_writer(writer);

    let header: Vec<&str> = fingerprint.keys().map(String::as_str).collect();
    let ssids: Vec<&str> = fingerprint.values().map(|s| s.ssid.as_str()).collect();
    let averages: Vec<String> = fingerprint
        .values()
        .map(|s| format_average(s.avg_rssi, decimals))
        .collect();
    let samples: Vec<String> = fingerprint
        .values()
        .map(|s| format_samples(&s.samples))
        .collect();

    csv.write_record(&header)?;
    csv.write_record(&ssids)?;
    csv.write_record(&averages)?;
    csv.write_record(&samples)?;
    csv.flush()?;
    Ok(())
}

/// Write one fingerprint's table to `path`.
pub fn write_csv_file(path: &Path, fingerprint: &Fingerprint, decimals: Option<u32>) -> Result<()> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, fingerprint, decimals)?;
    write_atomic(path, &buffer)?;
    debug!("Wrote {} routers to {}", fingerprint.len(), path.display());
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn apply_decimals(value: f64, decimals: Option<u32>) -> f64 {
    match decimals {
        Some(d) => round_to(value, d),
        None => value,
    }
}

/// `-50.0` style without rounding, fixed decimals when requested.
fn format_average(value: f64, decimals: Option<u32>) -> String {
    match decimals {
        Some(d) => format!("{:.prec$}", value, prec = d as usize),
        None => format!("{:?}", value),
    }
}

/// Write to `<path>.tmp` and rename over `path`, creating parent directories.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp_name);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
