//! Signal-strength statistics over raw RSSI samples.

/// Summary figures for one router's samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSummary {
    pub count: usize,
    pub min: i32,
    pub max: i32,
    pub mean: f64,
}

impl SampleSummary {
    /// Difference between the strongest and weakest sample.
    pub fn spread(&self) -> i32 {
        self.max - self.min
    }
}

/// Stateless collection of RSSI calculations.
pub struct RssiCalculator;

impl RssiCalculator {
    /// Arithmetic mean of `samples` using real division.
    ///
    /// Returns `None` for an empty slice. The sum is taken in `i64` so long
    /// sessions cannot overflow.
    pub fn mean(samples: &[i32]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        let sum: i64 = samples.iter().map(|&s| i64::from(s)).sum();
        Some(sum as f64 / samples.len() as f64)
    }

    /// Count, extremes and mean of `samples`, or `None` when empty.
    pub fn summarize(samples: &[i32]) -> Option<SampleSummary> {
        let mean = Self::mean(samples)?;
        let min = samples.iter().copied().min()?;
        let max = samples.iter().copied().max()?;
        Some(SampleSummary {
            count: samples.len(),
            min,
            max,
            mean,
        })
    }
}
