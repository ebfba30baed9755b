//! Data layer for the Wi-Fi fingerprint pipeline.
//!
//! Turns raw scan logs into per-router fingerprints: tokenizing logs into
//! scan fragments, splitting them at device resets, aggregating RSSI samples
//! and exporting the results as keyed JSON or CSV tables.

pub mod aggregator;
pub mod analysis;
pub mod export;
pub mod line_format;
pub mod reader;
pub mod reset;
pub mod store;
pub mod tokenizer;

pub use fingerprint_core as core;
