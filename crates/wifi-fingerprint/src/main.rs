mod bootstrap;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use fingerprint_core::calculations::RssiCalculator;
use fingerprint_core::formatting::{format_rssi, percentage};
use fingerprint_core::models::Fingerprint;
use fingerprint_core::settings::Settings;
use fingerprint_data::analysis::{
    analyze_log_file, group_raw_records, process_pending_logs, AnalysisResult, PipelineConfig,
};
use fingerprint_data::export::{
    merge_keyed, read_keyed_json, to_keyed, write_csv_file, write_keyed_json, KeyedFingerprints,
};
use fingerprint_data::reader::{latest_scan_log, load_raw_records};
use fingerprint_data::store::FingerprintStore;
use fingerprint_runtime::collector::Collector;
use fingerprint_runtime::raw_store::{RawRecordStore, RAW_SCANS_FILE};
use fingerprint_runtime::scan_driver::ScanDriver;
use fingerprint_runtime::transport::SerialPortLink;
use tokio::io::BufReader;

use bootstrap::AppDirs;

/// Keyed JSON written by `--mode format`.
const KEYED_FILE: &str = "networks.json";

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    let dirs = bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("wifi-fingerprint v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Mode: {}, format: {}, scope: {}, reset index: {}",
        settings.mode,
        settings.format,
        settings.scope,
        settings.reset_index
    );

    let config = PipelineConfig::from_settings(&settings)?;

    match settings.mode.as_str() {
        "parse" => run_parse(&settings, &config, &dirs)?,
        "logs" => run_logs(&settings, &config, &dirs)?,
        "format" => run_format(&settings, &config, &dirs)?,

        "collect" | "capture" => {
            let work = async {
                if settings.mode == "collect" {
                    run_collect(&settings, &dirs).await
                } else {
                    run_capture(&settings, &config, &dirs).await
                }
            };
            tokio::select! {
                result = work => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received; stopping {}", settings.mode);
                }
            }
        }

        unknown => {
            eprintln!("Unknown mode: {}", unknown);
        }
    }

    Ok(())
}

// ── Offline modes ──────────────────────────────────────────────────────────────

fn run_parse(settings: &Settings, config: &PipelineConfig, dirs: &AppDirs) -> Result<()> {
    let input = match &settings.input {
        Some(path) => path.clone(),
        None => latest_scan_log(&dirs.logs)?,
    };
    let result = analyze_log_file(&input, settings.name.as_deref(), &settings.location, config)
        .with_context(|| format!("failed to analyze {}", input.display()))?;

    let output = settings
        .output
        .clone()
        .unwrap_or_else(|| dirs.places.join(format!("{}.csv", result.name)));
    write_result(&result, &output, settings.decimals)?;

    print_run_stats(&result);
    print_fingerprint(&result.name, result.session.fingerprint(), settings.decimals);
    Ok(())
}

fn run_logs(settings: &Settings, config: &PipelineConfig, dirs: &AppDirs) -> Result<()> {
    let logs = settings.input.clone().unwrap_or_else(|| dirs.logs.clone());
    let places = settings.output.clone().unwrap_or_else(|| dirs.places.clone());

    let processed = process_pending_logs(&logs, &places, &settings.location, config, settings.decimals)?;
    if processed.is_empty() {
        println!("No new logs in {}", logs.display());
    }
    for name in processed {
        println!("{} -> {}", name, places.join(format!("{}.csv", name)).display());
    }
    Ok(())
}

fn run_format(settings: &Settings, config: &PipelineConfig, dirs: &AppDirs) -> Result<()> {
    let input = settings
        .input
        .clone()
        .unwrap_or_else(|| dirs.scan_data.join(RAW_SCANS_FILE));
    let output = settings
        .output
        .clone()
        .unwrap_or_else(|| dirs.scan_data.join(KEYED_FILE));

    let records = load_raw_records(&input, settings.create)
        .with_context(|| format!("failed to load raw scans from {}", input.display()))?;
    let store = group_raw_records(&records, &config.allow_list);
    write_keyed_json(&output, &to_keyed(&store, settings.decimals))?;

    for (name, session) in store.iter() {
        print_fingerprint(name, session.fingerprint(), settings.decimals);
    }
    println!("{} sessions -> {}", store.len(), output.display());
    Ok(())
}

/// Write one analysis as a CSV table, or merge it into a keyed JSON file when
/// `output` ends in `.json`.
fn write_result(result: &AnalysisResult, output: &Path, decimals: Option<u32>) -> Result<()> {
    let is_json = output
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let mut keyed = if output.exists() {
            read_keyed_json(output)?
        } else {
            KeyedFingerprints::new()
        };
        let mut store = FingerprintStore::new();
        store.insert(result.name.clone(), result.session.clone());
        merge_keyed(&mut keyed, to_keyed(&store, decimals));
        write_keyed_json(output, &keyed)?;
    } else {
        let empty = Fingerprint::new();
        write_csv_file(output, result.session.fingerprint().unwrap_or(&empty), decimals)?;
    }
    tracing::info!("Wrote {}", output.display());
    Ok(())
}

// ── Device modes ───────────────────────────────────────────────────────────────

fn open_driver(settings: &Settings) -> Result<ScanDriver<SerialPortLink>> {
    let link = SerialPortLink::open(&settings.port, settings.baud_rate)?;
    Ok(ScanDriver::new(link, Duration::from_secs(settings.timeout)))
}

async fn run_collect(settings: &Settings, dirs: &AppDirs) -> Result<()> {
    let path = settings
        .input
        .clone()
        .unwrap_or_else(|| dirs.scan_data.join(RAW_SCANS_FILE));
    let store = RawRecordStore::load(&path, settings.create)
        .with_context(|| format!("{} is required; pass --create to start a new one", path.display()))?;
    let driver = open_driver(settings)?;

    let mut collector = Collector::new(
        driver,
        store,
        settings.location.clone(),
        settings.scans,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    let summary = collector.run().await?;
    println!(
        "{} scans over {} sessions saved to {}",
        summary.scans,
        summary.sessions.len(),
        collector.store().path().display()
    );
    Ok(())
}

async fn run_capture(settings: &Settings, config: &PipelineConfig, dirs: &AppDirs) -> Result<()> {
    let mut driver = open_driver(settings)?;
    let lines = driver.capture_log(settings.scans).await?;

    let log_path: PathBuf = dirs
        .logs
        .join(format!("log.scan.{}.txt", Utc::now().timestamp()));
    let mut text = lines.join("\n");
    text.push('\n');
    std::fs::write(&log_path, text)
        .with_context(|| format!("failed to save log to {}", log_path.display()))?;

    let result = analyze_log_file(&log_path, settings.name.as_deref(), &settings.location, config)?;
    let output = settings
        .output
        .clone()
        .unwrap_or_else(|| dirs.places.join(format!("{}.csv", result.name)));
    write_result(&result, &output, settings.decimals)?;

    print_run_stats(&result);
    print_fingerprint(&result.name, result.session.fingerprint(), settings.decimals);
    Ok(())
}

// ── Output ─────────────────────────────────────────────────────────────────────

fn print_run_stats(result: &AnalysisResult) {
    let meta = &result.metadata;
    println!(
        "{}: kept {} of {} scans ({}%), {} epochs, {} malformed lines, {} filtered",
        result.name,
        meta.tokenize.fragments_kept,
        meta.tokenize.fragments_seen,
        percentage(
            meta.tokenize.fragments_kept as f64,
            meta.tokenize.fragments_seen as f64,
            1
        ),
        meta.epochs_detected,
        meta.observations.malformed,
        meta.observations.filtered
    );
}

fn print_fingerprint(name: &str, fingerprint: Option<&Fingerprint>, decimals: Option<u32>) {
    let Some(fingerprint) = fingerprint.filter(|fp| !fp.is_empty()) else {
        println!("{}: no routers", name);
        return;
    };

    println!("{} ({} routers)", name, fingerprint.len());
    for (bssid, stats) in fingerprint {
        let spread = RssiCalculator::summarize(&stats.samples)
            .map(|s| s.spread())
            .unwrap_or(0);
        println!(
            "  {:<18} {:<24} {:>12}  n={:<3} spread={}",
            bssid,
            stats.ssid,
            format_rssi(stats.avg_rssi, decimals.unwrap_or(1)),
            stats.samples.len(),
            spread
        );
    }
}
