//! Splits raw scan logs into scan fragments.
//!
//! A log is a stream of lines in which every scan is introduced by a boundary
//! marker followed by the scan index:
//!
//! ```text
//! scan number: 0
//! AA:BB:CC:DD:EE:FF - -61 - eduroam
//! 11:22:33:44:55:66 - -80 - pf-gosl
//! scan number: 1
//! ...
//! ```
//!
//! Text before the first marker is preamble. Fragments that end in the device
//! boot message, lack an index, or carry a line count that does not divide
//! into whole observations are dropped and counted, never fatal.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::line_format::LineFormat;

/// Marker the firmware prints before every scan index.
pub const DEFAULT_SCAN_MARKER: &str = "scan number: ";

/// Last line the firmware prints after booting.
pub const DEFAULT_BOOT_SENTINEL: &str = "Setup done";

// ── Types ─────────────────────────────────────────────────────────────────────

/// One retained scan: its index and the raw observation lines it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFragment {
    pub index: u32,
    pub lines: Vec<String>,
}

/// Counters describing what the tokenizer kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeStats {
    /// Fragments found after the preamble.
    pub fragments_seen: usize,
    /// Fragments returned to the caller.
    pub fragments_kept: usize,
    /// Fragments dropped because they carried the boot message.
    pub boot_fragments: usize,
    /// Fragments dropped because their index or line count was unusable.
    pub malformed_fragments: usize,
}

/// Result of tokenizing one log.
#[derive(Debug, Clone, Default)]
pub struct Tokenized {
    pub fragments: Vec<ScanFragment>,
    pub stats: TokenizeStats,
}

/// How a log is cut into fragments.
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    /// Literal text preceding every scan index.
    pub scan_marker: String,
    /// Boot message; a fragment ending with it is discarded. `None` disables.
    pub boot_sentinel: Option<String>,
    /// Observation line format, used for the line-count check.
    pub format: LineFormat,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            scan_marker: DEFAULT_SCAN_MARKER.to_string(),
            boot_sentinel: Some(DEFAULT_BOOT_SENTINEL.to_string()),
            format: LineFormat::Dashed,
        }
    }
}

// ── LogTokenizer ──────────────────────────────────────────────────────────────

/// Stateless splitter configured with a marker, sentinel and line format.
#[derive(Debug, Clone, Default)]
pub struct LogTokenizer {
    config: TokenizerConfig,
}

impl LogTokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Tokenize a complete log held in memory.
    pub fn tokenize(&self, text: &str) -> Tokenized {
        self.tokenize_lines(text.lines())
    }

    /// Tokenize any sequence of lines, e.g. lines received from the device.
    ///
    /// Produces the same result as [`tokenize`](Self::tokenize) on the joined
    /// text. The marker may appear in the middle of a line; text before it
    /// belongs to the previous fragment.
    pub fn tokenize_lines<I, S>(&self, lines: I) -> Tokenized
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let marker = self.config.scan_marker.as_str();
        let mut out = Tokenized::default();
        // First element of a pending fragment is the text right after the marker.
        let mut pending: Option<Vec<String>> = None;

        for line in lines {
            let mut rest = line.as_ref().trim_end_matches(['\r', '\n']);

            if !marker.is_empty() {
                while let Some(pos) = rest.find(marker) {
                    push_piece(&mut pending, &rest[..pos]);
                    if let Some(raw) = pending.take() {
                        self.finish_fragment(raw, &mut out);
                    }
                    pending = Some(Vec::new());
                    rest = &rest[pos + marker.len()..];
                }
            }

            push_piece(&mut pending, rest);
        }

        if let Some(raw) = pending.take() {
            self.finish_fragment(raw, &mut out);
        }

        out
    }

    /// Returns `true` when a fragment's last non-blank line is the boot message.
    pub fn is_boot_fragment<S: AsRef<str>>(&self, lines: &[S]) -> bool {
        let Some(sentinel) = self.config.boot_sentinel.as_deref() else {
            return false;
        };
        lines
            .iter()
            .rev()
            .map(|l| l.as_ref().trim())
            .find(|l| !l.is_empty())
            .map(|l| l.ends_with(sentinel))
            .unwrap_or(false)
    }

    fn finish_fragment(&self, raw: Vec<String>, out: &mut Tokenized) {
        out.stats.fragments_seen += 1;

        if self.is_boot_fragment(&raw) {
            debug!("Dropping boot message fragment");
            out.stats.boot_fragments += 1;
            return;
        }

        let mut raw = raw.into_iter();
        let header = raw.next().unwrap_or_default();
        let Some(index) = parse_scan_index(&header) else {
            warn!("Dropping scan fragment without an index: {:?}", header);
            out.stats.malformed_fragments += 1;
            return;
        };

        let lines: Vec<String> = raw.collect();
        let per_observation = self.config.format.lines_per_observation();
        if lines.len() % per_observation != 0 {
            warn!(
                "Dropping scan {}: {} lines do not form whole observations of {} lines",
                index,
                lines.len(),
                per_observation
            );
            out.stats.malformed_fragments += 1;
            return;
        }

        out.stats.fragments_kept += 1;
        out.fragments.push(ScanFragment { index, lines });
    }
}

/// Append a piece of text to the pending fragment. Blank pieces are dropped,
/// except the header, which is kept so a missing index is detectable.
fn push_piece(pending: &mut Option<Vec<String>>, piece: &str) {
    if let Some(lines) = pending.as_mut() {
        if lines.is_empty() || !piece.trim().is_empty() {
            lines.push(piece.to_string());
        }
    }
}

/// Leading decimal digits of a fragment header, e.g. `"12\x1b[0m"` → 12.
pub fn parse_scan_index(header: &str) -> Option<u32> {
    static INDEX_RE: OnceLock<Regex> = OnceLock::new();
    let re = INDEX_RE.get_or_init(|| Regex::new(r"^\s*(\d+)").expect("regex is valid"));
    re.captures(header)?.get(1)?.as_str().parse().ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
