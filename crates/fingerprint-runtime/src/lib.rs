//! Device-facing runtime for the Wi-Fi fingerprint pipeline.
//!
//! Talks to the scanning firmware over a line transport, collects raw JSON
//! scans into `networks_raw.json` and captures text logs for the tokenizer.

pub mod collector;
pub mod raw_store;
pub mod scan_driver;
pub mod transport;

pub use fingerprint_core as core;
pub use fingerprint_data as data;
