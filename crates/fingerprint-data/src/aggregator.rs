//! Folds observations into per-router fingerprints.
//!
//! Every aggregation run owns a fresh [`EpochAccumulator`]; nothing is carried
//! between runs, so re-aggregating the same input always gives the same
//! fingerprint.

use std::collections::{BTreeMap, BTreeSet};

use fingerprint_core::calculations::RssiCalculator;
use fingerprint_core::models::{Fingerprint, Observation, RouterStats};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::line_format::LineFormat;
use crate::reset::Epoch;
use crate::tokenizer::ScanFragment;

// ── AllowList ─────────────────────────────────────────────────────────────────

/// SSIDs eligible for a fingerprint. Empty accepts every network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    ssids: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(ssids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ssids: ssids
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    /// An allow-list that accepts everything.
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn allows(&self, ssid: &str) -> bool {
        self.ssids.is_empty() || self.ssids.contains(ssid)
    }

    pub fn is_empty(&self) -> bool {
        self.ssids.is_empty()
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Counters for one aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationStats {
    /// Observations that parsed and passed the allow-list.
    pub accepted: usize,
    /// Observations skipped because they could not be parsed.
    pub malformed: usize,
    /// Observations skipped because their SSID is not allowed.
    pub filtered: usize,
}

impl AggregationStats {
    pub fn merge(&mut self, other: &AggregationStats) {
        self.accepted += other.accepted;
        self.malformed += other.malformed;
        self.filtered += other.filtered;
    }
}

/// A fingerprint together with the counters of the run that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub fingerprint: Fingerprint,
    pub stats: AggregationStats,
}

// ── EpochAccumulator ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RouterAccumulator {
    ssid: String,
    samples: Vec<i32>,
}

/// In-flight state of one aggregation run.
#[derive(Debug)]
pub struct EpochAccumulator<'a> {
    allow_list: &'a AllowList,
    routers: BTreeMap<String, RouterAccumulator>,
    stats: AggregationStats,
}

impl<'a> EpochAccumulator<'a> {
    pub fn new(allow_list: &'a AllowList) -> Self {
        Self {
            allow_list,
            routers: BTreeMap::new(),
            stats: AggregationStats::default(),
        }
    }

    /// Fold one parsed observation.
    pub fn add(&mut self, observation: &Observation) {
        if !self.allow_list.allows(&observation.ssid) {
            self.stats.filtered += 1;
            return;
        }

        self.stats.accepted += 1;
        self.routers
            .entry(observation.bssid.clone())
            .or_insert_with(|| RouterAccumulator {
                ssid: observation.ssid.clone(),
                samples: Vec::new(),
            })
            .samples
            .push(observation.rssi);
    }

    /// Parse and fold every observation of a fragment, skipping bad lines.
    pub fn add_fragment(&mut self, fragment: &ScanFragment, format: &LineFormat) {
        for chunk in fragment.lines.chunks(format.lines_per_observation()) {
            match format.parse_observation(chunk, fragment.index) {
                Ok(observation) => self.add(&observation),
                Err(e) => {
                    debug!("Skipping observation in scan {}: {}", fragment.index, e);
                    self.stats.malformed += 1;
                }
            }
        }
    }

    /// Compute averages and hand back the fingerprint.
    pub fn finish(self) -> Aggregation {
        let fingerprint = self
            .routers
            .into_iter()
            .filter_map(|(bssid, router)| {
                let avg_rssi = RssiCalculator::mean(&router.samples)?;
                Some((
                    bssid,
                    RouterStats {
                        ssid: router.ssid,
                        avg_rssi,
                        samples: router.samples,
                    },
                ))
            })
            .collect();

        Aggregation {
            fingerprint,
            stats: self.stats,
        }
    }
}

// ── FingerprintAggregator ─────────────────────────────────────────────────────

/// Builds fingerprints from epochs, fragments or parsed observations.
#[derive(Debug, Clone, Default)]
pub struct FingerprintAggregator {
    allow_list: AllowList,
}

impl FingerprintAggregator {
    pub fn new(allow_list: AllowList) -> Self {
        Self { allow_list }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Aggregate one epoch's raw observation lines.
    pub fn aggregate(&self, epoch: &Epoch, format: &LineFormat) -> Aggregation {
        self.aggregate_fragments(epoch.fragments.iter(), format)
    }

    /// Aggregate any run of fragments as a single unit.
    pub fn aggregate_fragments<'f>(
        &self,
        fragments: impl IntoIterator<Item = &'f ScanFragment>,
        format: &LineFormat,
    ) -> Aggregation {
        let mut acc = EpochAccumulator::new(&self.allow_list);
        for fragment in fragments {
            acc.add_fragment(fragment, format);
        }
        acc.finish()
    }

    /// Aggregate observations that were already parsed (JSON scans, sessions).
    pub fn aggregate_observations<'o>(
        &self,
        observations: impl IntoIterator<Item = &'o Observation>,
    ) -> Aggregation {
        let mut acc = EpochAccumulator::new(&self.allow_list);
        for observation in observations {
            acc.add(observation);
        }
        acc.finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
