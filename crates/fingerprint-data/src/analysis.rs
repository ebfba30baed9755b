//! Top-level fingerprint pipeline.
//!
//! Raw text → [`LogTokenizer`] → [`split_epochs`] → [`FingerprintAggregator`]
//! → [`SessionFingerprint`]. Every call builds its own state, so runs over
//! different logs never influence each other.

use std::path::Path;

use chrono::Utc;
use fingerprint_core::error::{FingerprintError, Result};
use fingerprint_core::models::{Fingerprint, RawScanRecord, Session};
use fingerprint_core::settings::Settings;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregator::{AggregationStats, AllowList, FingerprintAggregator};
use crate::export::write_csv_file;
use crate::line_format::LineFormat;
use crate::reader::{file_stem, pending_logs, read_log};
use crate::reset::split_epochs;
use crate::store::{FingerprintStore, ScopePolicy, SessionFingerprint};
use crate::tokenizer::{LogTokenizer, TokenizeStats, TokenizerConfig};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Everything the pipeline needs to know about a log's shape and filtering.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub tokenizer: TokenizerConfig,
    /// Scan index the device reports first after booting.
    pub reset_index: u32,
    pub scope: ScopePolicy,
    pub allow_list: AllowList,
}

impl PipelineConfig {
    /// Build the pipeline configuration from resolved CLI settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let format = LineFormat::from_name(&settings.format).ok_or_else(|| {
            FingerprintError::Config(format!("unknown line format: {}", settings.format))
        })?;
        let scope = ScopePolicy::from_name(&settings.scope)
            .ok_or_else(|| FingerprintError::Config(format!("unknown scope: {}", settings.scope)))?;
        if settings.scan_marker.is_empty() {
            return Err(FingerprintError::Config(
                "scan marker must not be empty".to_string(),
            ));
        }

        Ok(Self {
            tokenizer: TokenizerConfig {
                scan_marker: settings.scan_marker.clone(),
                boot_sentinel: settings.boot_sentinel().map(str::to_string),
                format,
            },
            reset_index: settings.reset_index,
            scope,
            allow_list: AllowList::new(settings.allowed_ssids.iter().cloned()),
        })
    }
}

// ── Result types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub tokenize: TokenizeStats,
    /// Number of epochs the reset detector found.
    pub epochs_detected: usize,
    pub observations: AggregationStats,
    /// Routers in the effective fingerprint.
    pub routers: usize,
    /// Wall-clock seconds spent tokenizing and aggregating.
    pub process_time_seconds: f64,
}

/// The complete output of one log analysis.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub name: String,
    pub session: SessionFingerprint,
    pub metadata: AnalysisMetadata,
}

// ── Log pipeline ──────────────────────────────────────────────────────────────

/// Run the pipeline over a log held in memory.
pub fn analyze_log(name: &str, location: &str, text: &str, config: &PipelineConfig) -> AnalysisResult {
    analyze_lines(name, location, text.lines(), config)
}

/// Run the pipeline over a sequence of lines, e.g. lines captured from the
/// device.
///
/// 1. Tokenize into scan fragments.
/// 2. Partition the fragments into epochs at device resets.
/// 3. Aggregate per epoch, or the whole session under [`ScopePolicy::Session`].
pub fn analyze_lines<I, S>(name: &str, location: &str, lines: I, config: &PipelineConfig) -> AnalysisResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let start = std::time::Instant::now();

    let tokenizer = LogTokenizer::new(config.tokenizer.clone());
    let tokenized = tokenizer.tokenize_lines(lines);
    let format = &config.tokenizer.format;

    let epochs = split_epochs(tokenized.fragments, config.reset_index);
    let epochs_detected = epochs.len();
    let aggregator = FingerprintAggregator::new(config.allow_list.clone());

    let mut totals = AggregationStats::default();
    let fingerprints = match config.scope {
        ScopePolicy::Epoch => epochs
            .iter()
            .map(|epoch| {
                let aggregation = aggregator.aggregate(epoch, format);
                totals.merge(&aggregation.stats);
                aggregation.fingerprint
            })
            .collect(),
        ScopePolicy::Session => {
            let aggregation =
                aggregator.aggregate_fragments(epochs.iter().flat_map(|e| e.fragments.iter()), format);
            totals.merge(&aggregation.stats);
            vec![aggregation.fingerprint]
        }
    };

    let session = SessionFingerprint::new(location, config.scope, fingerprints);
    let routers = session.fingerprint().map(|fp| fp.len()).unwrap_or(0);

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        tokenize: tokenized.stats,
        epochs_detected,
        observations: totals,
        routers,
        process_time_seconds: start.elapsed().as_secs_f64(),
    };

    info!(
        "{}: {} scans kept of {}, {} epochs, {} routers ({} malformed, {} filtered)",
        name,
        metadata.tokenize.fragments_kept,
        metadata.tokenize.fragments_seen,
        epochs_detected,
        routers,
        totals.malformed,
        totals.filtered
    );

    AnalysisResult {
        name: name.to_string(),
        session,
        metadata,
    }
}

/// Read and analyze one saved log. The session name defaults to the file stem.
pub fn analyze_log_file(
    path: &Path,
    name: Option<&str>,
    location: &str,
    config: &PipelineConfig,
) -> Result<AnalysisResult> {
    let text = read_log(path)?;
    let name = match name {
        Some(n) => n.to_string(),
        None => file_stem(path).ok_or_else(|| FingerprintError::InvalidSessionName(path.display().to_string()))?,
    };
    // Validates the name the same way interactive collection does.
    let session = Session::new(name, location)?;
    Ok(analyze_log(session.name(), session.location(), &text, config))
}

/// Analyze every log in `logs_dir` without a CSV in `places_dir` and write
/// `<places_dir>/<name>.csv` for each. Returns the processed session names.
pub fn process_pending_logs(
    logs_dir: &Path,
    places_dir: &Path,
    location: &str,
    config: &PipelineConfig,
    decimals: Option<u32>,
) -> Result<Vec<String>> {
    let pending = pending_logs(logs_dir, places_dir);
    info!("{} logs without a places table", pending.len());

    let mut processed = Vec::with_capacity(pending.len());
    for log in pending {
        let result = analyze_log_file(&log, None, location, config)?;
        let empty = Fingerprint::new();
        let fingerprint = result.session.fingerprint().unwrap_or(&empty);
        let out = places_dir.join(format!("{}.csv", result.name));
        write_csv_file(&out, fingerprint, decimals)?;
        processed.push(result.name);
    }
    Ok(processed)
}

// ── Raw JSON scans ────────────────────────────────────────────────────────────

/// Group raw JSON scan records by session name and average each router.
///
/// JSON scans carry no reset markers, so sessions are always folded whole.
/// The first location seen for a name is kept; records with an empty name are
/// skipped.
pub fn group_raw_records(records: &[RawScanRecord], allow_list: &AllowList) -> FingerprintStore {
    let mut sessions: Vec<Session> = Vec::new();

    for record in records {
        let position = sessions.iter().position(|s| s.name() == record.name);
        let session = match position {
            Some(i) => &mut sessions[i],
            None => match Session::new(record.name.clone(), record.location.clone()) {
                Ok(session) => {
                    sessions.push(session);
                    let last = sessions.len() - 1;
                    &mut sessions[last]
                }
                Err(e) => {
                    warn!("Skipping raw scan: {}", e);
                    continue;
                }
            },
        };
        let index = session.scans().len() as u32;
        session.push_scan(index, record.observations(index).collect());
    }

    let aggregator = FingerprintAggregator::new(allow_list.clone());
    let mut store = FingerprintStore::new();
    for session in &sessions {
        let aggregation = aggregator.aggregate_observations(session.observations());
        store.insert(
            session.name(),
            SessionFingerprint::new(
                session.location(),
                ScopePolicy::Session,
                vec![aggregation.fingerprint],
            ),
        );
    }
    store
}

// ── Tests ─────────────────────────────────────────────────────────────────────
