//! Persistent list of raw JSON scans (`networks_raw.json`).

use std::path::{Path, PathBuf};

use fingerprint_core::error::Result;
use fingerprint_core::models::RawScanRecord;
use fingerprint_data::export::write_atomic;
use fingerprint_data::reader::load_raw_records;
use tracing::debug;

/// File name of the raw scan list inside the scan-data directory.
pub const RAW_SCANS_FILE: &str = "networks_raw.json";

/// Raw scan records backed by a JSON file.
#[derive(Debug)]
pub struct RawRecordStore {
    path: PathBuf,
    records: Vec<RawScanRecord>,
}

impl RawRecordStore {
    /// Load the store. A missing file is fatal unless `create_if_missing`.
    pub fn load(path: impl Into<PathBuf>, create_if_missing: bool) -> Result<Self> {
        let path = path.into();
        let records = load_raw_records(&path, create_if_missing)?;
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[RawScanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn append(&mut self, records: impl IntoIterator<Item = RawScanRecord>) {
        self.records.extend(records);
    }

    /// Rewrite the whole file via a temporary sibling.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!("Saved {} raw scans to {}", self.records.len(), self.path.display());
        Ok(())
    }
}
