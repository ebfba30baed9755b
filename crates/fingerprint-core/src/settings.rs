use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Directory under the home directory holding persisted state and default data.
pub const APP_DIR_NAME: &str = ".wifi-fingerprint";

/// Serial line speed of the scanning firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Seconds to wait for the next line from the device before ending a batch.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Wi-Fi fingerprint collection and log aggregation
#[derive(Parser, Debug, Clone)]
#[command(
    name = "wifi-fingerprint",
    about = "Wi-Fi fingerprint collection and log aggregation",
    version
)]
pub struct Settings {
    /// What to do: parse one log, process pending logs, format raw JSON scans,
    /// collect JSON scans from the device, or capture a text log from the device
    #[arg(long, default_value = "parse", value_parser = ["parse", "logs", "format", "collect", "capture"])]
    pub mode: String,

    /// Input file or directory (log file, logs directory, or raw JSON file)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output file or directory
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Session name (defaults to the log file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Location recorded with the session
    #[arg(long, default_value = "placeholder")]
    pub location: String,

    /// Observation line format of the scan log
    #[arg(long, default_value = "dashed", value_parser = ["dashed", "labeled", "legacy"])]
    pub format: String,

    /// Allowed SSIDs, comma separated (empty accepts every network)
    #[arg(long = "allow", value_delimiter = ',')]
    pub allowed_ssids: Vec<String>,

    /// Scan index the device reports first after booting
    #[arg(long, default_value = "0")]
    pub reset_index: u32,

    /// Fingerprint scope: restart on every device reset, or fold the whole session
    #[arg(long, default_value = "epoch", value_parser = ["epoch", "session"])]
    pub scope: String,

    /// Text that precedes every scan index in a log
    #[arg(long, default_value = "scan number: ")]
    pub scan_marker: String,

    /// Line that marks a device boot message (empty disables the check)
    #[arg(long, default_value = "Setup done")]
    pub boot_sentinel: String,

    /// Serial device of the scanner
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub port: String,

    /// Serial baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    /// Scans performed per location (1-100)
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub scans: u32,

    /// Seconds to wait for one scan response
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Round exported averages to this many decimals
    #[arg(long)]
    pub decimals: Option<u32>,

    /// Start an empty raw scan file when none exists
    #[arg(long)]
    pub create: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.wifi-fingerprint/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_ssids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scans: Option<u32>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to the default path, creating parent directories
    /// if needed.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_derived_values(settings, &matches);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. 'mode' and paths are never loaded from last-used.
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        // NOTE: clap stores the arg id using the *field name*, not the flag.
        if !is_arg_explicitly_set(&matches, "allowed_ssids") {
            if let Some(v) = last.allowed_ssids {
                settings.allowed_ssids = v;
            }
        }
        // A persisted reset index belongs to the firmware it was typed for;
        // the legacy default is applied in `resolve_derived_values` instead.
        let reset_explicit = is_arg_explicitly_set(&matches, "reset_index");
        if !reset_explicit && settings.format != "legacy" {
            if let Some(v) = last.reset_index {
                settings.reset_index = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "scope") {
            if let Some(v) = last.scope {
                settings.scope = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "port") {
            if let Some(v) = last.port {
                settings.port = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "baud_rate") {
            if let Some(v) = last.baud_rate {
                settings.baud_rate = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "scans") {
            if let Some(v) = last.scans {
                settings.scans = v;
            }
        }

        settings = Self::resolve_derived_values(settings, &matches);

        let mut params = LastUsedParams::from(&settings);
        // Only a reset index typed on the command line is remembered.
        params.reset_index = if reset_explicit {
            Some(settings.reset_index)
        } else {
            last.reset_index
        };
        if let Err(e) = params.save_to(config_path) {
            warn!("Could not persist settings to {}: {}", config_path.display(), e);
        }

        settings
    }

    /// Apply values that depend on other settings.
    ///
    /// The legacy labeled firmware counts scans from 1, so its reset index is
    /// 1 unless given explicitly. `--debug` overrides the log level.
    fn resolve_derived_values(mut settings: Settings, matches: &clap::ArgMatches) -> Settings {
        if settings.format == "legacy" && !is_arg_explicitly_set(matches, "reset_index") {
            settings.reset_index = 1;
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// The boot sentinel, or `None` when the check is disabled.
    pub fn boot_sentinel(&self) -> Option<&str> {
        if self.boot_sentinel.is_empty() {
            None
        } else {
            Some(self.boot_sentinel.as_str())
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            format: Some(s.format.clone()),
            allowed_ssids: Some(s.allowed_ssids.clone()),
            reset_index: Some(s.reset_index),
            scope: Some(s.scope.clone()),
            port: Some(s.port.clone()),
            baud_rate: Some(s.baud_rate),
            scans: Some(s.scans),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
