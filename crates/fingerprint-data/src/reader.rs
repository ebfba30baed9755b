//! Discovery and loading of saved scan logs and raw JSON scan files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use fingerprint_core::error::{FingerprintError, Result};
use fingerprint_core::models::RawScanRecord;
use regex::Regex;
use tracing::{debug, warn};

/// Extensions recognised as scan logs.
const LOG_EXTENSIONS: [&str; 2] = ["log", "txt"];

// ── Logs ──────────────────────────────────────────────────────────────────────

/// Read a complete log into memory.
///
/// A missing file is reported as [`FingerprintError::LogNotFound`], any other
/// read failure as [`FingerprintError::FileRead`].
pub fn read_log(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(FingerprintError::LogNotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| FingerprintError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Find all log files recursively under `dir`, sorted by path.
pub fn find_log_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Log directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), &LOG_EXTENSIONS))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Pick the newest `log.scan.<timestamp>.txt` in `dir` by its numeric stamp.
pub fn latest_scan_log(dir: &Path) -> Result<PathBuf> {
    static STAMP_RE: OnceLock<Regex> = OnceLock::new();
    let re = STAMP_RE.get_or_init(|| Regex::new(r"^log\.scan\.(\d+)\.txt$").expect("regex is valid"));

    let latest = find_log_files(dir)
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let stamp: u64 = re.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((stamp, path))
        })
        .max_by_key(|(stamp, _)| *stamp);

    match latest {
        Some((stamp, path)) => {
            debug!("Latest scan log is {} (stamp {})", path.display(), stamp);
            Ok(path)
        }
        None => Err(FingerprintError::NoLogFiles(dir.to_path_buf())),
    }
}

/// Logs under `logs_dir` that have no `<stem>.csv` in `places_dir` yet.
pub fn pending_logs(logs_dir: &Path, places_dir: &Path) -> Vec<PathBuf> {
    let done: HashSet<String> = std::fs::read_dir(places_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| has_extension(p, &["csv"]))
                .filter_map(|p| file_stem(&p))
                .collect()
        })
        .unwrap_or_default();

    find_log_files(logs_dir)
        .into_iter()
        .filter(|log| file_stem(log).map(|s| !done.contains(&s)).unwrap_or(false))
        .collect()
}

/// File name without its final extension: `log.scan.1700.txt` → `log.scan.1700`.
///
/// Hidden files have no usable session name.
pub fn file_stem(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || stem.starts_with('.') {
        None
    } else {
        Some(stem.to_string())
    }
}

// ── Raw JSON scans ────────────────────────────────────────────────────────────

/// Load the raw scan records file.
///
/// A missing file is fatal unless `create_if_missing`, in which case an empty
/// list is returned. Unparseable JSON is always fatal.
pub fn load_raw_records(path: &Path, create_if_missing: bool) -> Result<Vec<RawScanRecord>> {
    if !path.exists() {
        if create_if_missing {
            warn!("{} not found; starting with an empty scan list", path.display());
            return Ok(Vec::new());
        }
        return Err(FingerprintError::FileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| FingerprintError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<RawScanRecord> = serde_json::from_str(&content)?;
    debug!("Loaded {} raw scans from {}", records.len(), path.display());
    Ok(records)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext))
        .unwrap_or(false)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    // ── read_log ──────────────────────────────────────────────────────────────

    #[test]
    fn test_read_log() {
        let dir = TempDir::new().unwrap();
        let path = touch(dir.path(), "hall.log", "scan number: 0\n");
        assert_eq!(read_log(&path).unwrap(), "scan number: 0\n");
    }

    #[test]
    fn test_read_log_missing_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = read_log(&dir.path().join("gone.log")).unwrap_err();
        assert!(matches!(err, FingerprintError::LogNotFound(_)));
    }

    // ── find_log_files ────────────────────────────────────────────────────────

    #[test]
    fn test_find_log_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "c.log", "");
        touch(dir.path(), "a.txt", "");
        touch(dir.path(), "notes.md", "");
        touch(dir.path(), "sub/b.log", "");

        let files = find_log_files(dir.path());
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt", "c.log", "b.log"]);
    }

    #[test]
    fn test_find_log_files_nonexistent_path() {
        assert!(find_log_files(Path::new("/tmp/does-not-exist-fingerprint-xyz")).is_empty());
    }

    // ── latest_scan_log ───────────────────────────────────────────────────────

    #[test]
    fn test_latest_scan_log_compares_numerically() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "log.scan.900.txt", "");
        touch(dir.path(), "log.scan.1200.txt", "");
        touch(dir.path(), "other.txt", "");

        let latest = latest_scan_log(dir.path()).unwrap();
        assert!(latest.ends_with("log.scan.1200.txt"));
    }

    #[test]
    fn test_latest_scan_log_none() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "other.txt", "");
        assert!(matches!(
            latest_scan_log(dir.path()).unwrap_err(),
            FingerprintError::NoLogFiles(_)
        ));
    }

    // ── pending_logs ──────────────────────────────────────────────────────────

    #[test]
    fn test_pending_logs_skips_processed() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        let places = dir.path().join("places");
        touch(&logs, "kitchen.log", "");
        touch(&logs, "hall.log", "");
        touch(&places, "kitchen.csv", "");

        let pending = pending_logs(&logs, &places);
        assert_eq!(pending.len(), 1);
        assert!(pending[0].ends_with("hall.log"));
    }

    #[test]
    fn test_pending_logs_keeps_timestamped_logs_apart() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        let places = dir.path().join("places");
        touch(&logs, "log.scan.100.txt", "");
        touch(&logs, "log.scan.200.txt", "");
        touch(&places, "log.scan.100.csv", "");

        let pending = pending_logs(&logs, &places);
        assert_eq!(pending.len(), 1);
        assert!(pending[0].ends_with("log.scan.200.txt"));
    }

    #[test]
    fn test_pending_logs_without_places_dir() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        touch(&logs, "kitchen.log", "");
        assert_eq!(pending_logs(&logs, &dir.path().join("places")).len(), 1);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("/x/kitchen.log")), Some("kitchen".to_string()));
        assert_eq!(
            file_stem(Path::new("/x/log.scan.12.txt")),
            Some("log.scan.12".to_string())
        );
        assert_eq!(file_stem(Path::new("/x/.hidden")), None);
    }

    // ── load_raw_records ──────────────────────────────────────────────────────

    #[test]
    fn test_load_raw_records() {
        let dir = TempDir::new().unwrap();
        let path = touch(
            dir.path(),
            "networks_raw.json",
            r#"[{"location":"test","name":"lab","networks":[{"bssid":"AA","ssid":"eduroam","rssi":-40}]}]"#,
        );
        let records = load_raw_records(&path, false).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].networks[0].rssi, -40);
    }

    #[test]
    fn test_load_raw_records_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("networks_raw.json");
        assert!(matches!(
            load_raw_records(&path, false).unwrap_err(),
            FingerprintError::FileRead { .. }
        ));
        assert!(load_raw_records(&path, true).unwrap().is_empty());
    }

    #[test]
    fn test_load_raw_records_invalid_json_is_fatal_even_with_create() {
        let dir = TempDir::new().unwrap();
        let path = touch(dir.path(), "networks_raw.json", "[{");
        assert!(matches!(
            load_raw_records(&path, true).unwrap_err(),
            FingerprintError::JsonParse(_)
        ));
    }
}
