/// Round `value` to `decimals` places.
///
/// Only used at export and display time; stored averages keep full precision.
///
/// # Examples
///
/// ```
/// use fingerprint_core::formatting::round_to;
///
/// assert_eq!(round_to(-50.333, 1), -50.3);
/// assert_eq!(round_to(-49.5, 0), -50.0);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Format a signal strength with a fixed number of decimals and a unit.
///
/// # Examples
///
/// ```
/// use fingerprint_core::formatting::format_rssi;
///
/// assert_eq!(format_rssi(-50.0, 1), "-50.0 dBm");
/// assert_eq!(format_rssi(-61.666, 2), "-61.67 dBm");
/// assert_eq!(format_rssi(-42.4, 0), "-42 dBm");
/// ```
pub fn format_rssi(value: f64, decimals: u32) -> String {
    format!("{:.prec$} dBm", value, prec = decimals as usize)
}

/// Render raw samples the way the places tables store them: `[-40, -60]`.
///
/// # Examples
///
/// ```
/// use fingerprint_core::formatting::format_samples;
///
/// assert_eq!(format_samples(&[-40, -60]), "[-40, -60]");
/// assert_eq!(format_samples(&[]), "[]");
/// ```
pub fn format_samples(samples: &[i32]) -> String {
    let joined: Vec<String> = samples.iter().map(|s| s.to_string()).collect();
    format!("[{}]", joined.join(", "))
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use fingerprint_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    round_to((part / whole) * 100.0, decimal_places)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── round_to ─────────────────────────────────────────────────────────────

    #[test]
    fn test_round_to_keeps_sign() {
        assert_eq!(round_to(-61.666, 2), -61.67);
        assert_eq!(round_to(-0.04, 1), -0.0);
    }

    #[test]
    fn test_round_to_zero_decimals() {
        assert_eq!(round_to(-55.4, 0), -55.0);
    }

    // ── format_rssi ──────────────────────────────────────────────────────────

    #[test]
    fn test_format_rssi_fraction() {
        assert_eq!(format_rssi(-55.25, 1), "-55.2 dBm");
    }

    #[test]
    fn test_format_rssi_whole() {
        assert_eq!(format_rssi(-70.0, 0), "-70 dBm");
    }

    // ── format_samples ───────────────────────────────────────────────────────

    #[test]
    fn test_format_samples_single() {
        assert_eq!(format_samples(&[-71]), "[-71]");
    }

    #[test]
    fn test_format_samples_many() {
        assert_eq!(format_samples(&[-40, -41, -39]), "[-40, -41, -39]");
    }

    // ── percentage ───────────────────────────────────────────────────────────

    #[test]
    fn test_percentage_zero_whole() {
        assert_eq!(percentage(10.0, 0.0, 2), 0.0);
    }

    #[test]
    fn test_percentage_rounding() {
        let p = percentage(1.0, 3.0, 2);
        assert!((p - 33.33).abs() < 1e-2, "percentage = {p}");
    }
}
