use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fingerprint_core::settings::APP_DIR_NAME;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Standard data directories under `~/.wifi-fingerprint/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    pub root: PathBuf,
    /// Saved text scan logs.
    pub logs: PathBuf,
    /// One CSV table per processed log.
    pub places: PathBuf,
    /// Raw and keyed JSON scan files.
    pub scan_data: PathBuf,
}

impl AppDirs {
    pub fn under(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            logs: root.join("logs"),
            places: root.join("places"),
            scan_data: root.join("scan-data"),
        }
    }
}

/// Ensure the standard `~/.wifi-fingerprint/` directory hierarchy exists.
///
/// Creates the following directories if absent (including any missing parents):
/// - `~/.wifi-fingerprint/`
/// - `~/.wifi-fingerprint/logs/`
/// - `~/.wifi-fingerprint/places/`
/// - `~/.wifi-fingerprint/scan-data/`
pub fn ensure_directories() -> anyhow::Result<AppDirs> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let dirs = AppDirs::under(&home.join(APP_DIR_NAME));
    for dir in [&dirs.root, &dirs.logs, &dirs.places, &dirs.scan_data] {
        std::fs::create_dir_all(dir)?;
    }
    Ok(dirs)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// `log_level` is mapped to a [`tracing_subscriber::EnvFilter`] directive.
/// Falls back to `"info"` if the level string is not recognised. Output goes
/// to stderr, and additionally to `log_file` when one is given.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(normalise_level(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let handle = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(handle)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .init();

    Ok(())
}

/// Map upper-case level names (`WARNING`, `CRITICAL`) to tracing directives.
fn normalise_level(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
