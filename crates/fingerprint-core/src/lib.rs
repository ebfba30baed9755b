//! Shared model, error type, settings and numeric helpers for the Wi-Fi
//! fingerprint tools.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{FingerprintError, Result};
