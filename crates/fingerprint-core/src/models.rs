use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FingerprintError, Result};

/// One router's reading in one scan.
///
/// Created only by parsing a raw observation; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Hardware identifier of the access point radio.
    pub bssid: String,
    /// Broadcast network name. Not unique across routers.
    pub ssid: String,
    /// Received signal strength in dBm.
    pub rssi: i32,
    /// Index of the scan this reading came from.
    pub scan_index: u32,
}

/// A single scan: its device-reported index and the observations it carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    pub index: u32,
    pub observations: Vec<Observation>,
}

/// All scans performed under one user-supplied name/location pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    name: String,
    location: String,
    scans: Vec<Scan>,
}

impl Session {
    /// Start a new session. Empty or whitespace-only names are rejected.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FingerprintError::InvalidSessionName(name));
        }
        Ok(Self {
            name,
            location: location.into(),
            scans: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    /// Append one scan, keeping collection order.
    pub fn push_scan(&mut self, index: u32, observations: Vec<Observation>) {
        self.scans.push(Scan {
            index,
            observations,
        });
    }

    /// Every observation of the session in scan order.
    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.scans.iter().flat_map(|s| s.observations.iter())
    }
}

/// Per-router statistics within one fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterStats {
    /// SSID seen the first time this BSSID was observed.
    pub ssid: String,
    /// Arithmetic mean of `samples`.
    pub avg_rssi: f64,
    /// Raw RSSI samples in observation order.
    pub samples: Vec<i32>,
}

/// BSSID → statistics for one epoch or one session.
pub type Fingerprint = BTreeMap<String, RouterStats>;

/// One network as reported by the JSON firmware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkReading {
    pub bssid: String,
    #[serde(default)]
    pub ssid: String,
    pub rssi: i32,
}

/// One scan as stored in `networks_raw.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScanRecord {
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub networks: Vec<NetworkReading>,
    /// When the scan was received. Older files do not carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<DateTime<Utc>>,
}

impl RawScanRecord {
    /// Convert the readings into observations tagged with `scan_index`.
    pub fn observations(&self, scan_index: u32) -> impl Iterator<Item = Observation> + '_ {
        self.networks.iter().map(move |n| Observation {
            bssid: n.bssid.clone(),
            ssid: n.ssid.clone(),
            rssi: n.rssi,
            scan_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(bssid: &str, rssi: i32, scan_index: u32) -> Observation {
        Observation {
            bssid: bssid.to_string(),
            ssid: "eduroam".to_string(),
            rssi,
            scan_index,
        }
    }

    #[test]
    fn test_session_rejects_empty_name() {
        assert!(matches!(
            Session::new("", "hall"),
            Err(FingerprintError::InvalidSessionName(_))
        ));
        assert!(matches!(
            Session::new("   ", "hall"),
            Err(FingerprintError::InvalidSessionName(_))
        ));
    }

    #[test]
    fn test_session_keeps_scan_order() {
        let mut session = Session::new("kitchen", "placeholder").unwrap();
        session.push_scan(4, vec![obs("AA", -40, 4)]);
        session.push_scan(2, vec![obs("BB", -70, 2), obs("AA", -42, 2)]);

        let indices: Vec<u32> = session.scans().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![4, 2]);

        let rssi: Vec<i32> = session.observations().map(|o| o.rssi).collect();
        assert_eq!(rssi, vec![-40, -70, -42]);
        assert_eq!(session.name(), "kitchen");
        assert_eq!(session.location(), "placeholder");
    }

    #[test]
    fn test_raw_record_parses_firmware_json() {
        let json = r#"{"name":"lab","location":"test","networks":[
            {"bssid":"AA:BB","ssid":"eduroam","rssi":-51}
        ]}"#;
        let record: RawScanRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.networks.len(), 1);
        assert!(record.collected_at.is_none());

        let observations: Vec<Observation> = record.observations(7).collect();
        assert_eq!(observations[0].bssid, "AA:BB");
        assert_eq!(observations[0].rssi, -51);
        assert_eq!(observations[0].scan_index, 7);
    }

    #[test]
    fn test_raw_record_omits_missing_timestamp() {
        let record = RawScanRecord {
            name: "lab".to_string(),
            location: "test".to_string(),
            networks: vec![],
            collected_at: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("collected_at"));
    }
}
