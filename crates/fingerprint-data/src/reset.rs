//! Device-restart detection over the scan-index stream.
//!
//! After power-on the firmware restarts its scan counter at a fixed index
//! (0 on current firmware, 1 on the first revision). Seeing that index again
//! anywhere but at the start of a log means the device rebooted, so the scans
//! before and after belong to different epochs.

use tracing::debug;

use crate::tokenizer::ScanFragment;

/// Recognises reset markers in a sequence of scan indices.
///
/// The only state is whether the first fragment has been observed.
#[derive(Debug, Clone)]
pub struct ResetDetector {
    sentinel_index: u32,
    seen_first: bool,
}

impl ResetDetector {
    pub fn new(sentinel_index: u32) -> Self {
        Self {
            sentinel_index,
            seen_first: false,
        }
    }

    /// Feed the next scan index; returns `true` when it marks a reset.
    ///
    /// The very first index is the natural epoch start and never a reset.
    pub fn observe(&mut self, index: u32) -> bool {
        let first = !self.seen_first;
        self.seen_first = true;
        !first && index == self.sentinel_index
    }
}

/// A contiguous run of scans between two resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epoch {
    /// Position of this epoch in the log, starting at 0.
    pub ordinal: usize,
    pub fragments: Vec<ScanFragment>,
}

impl Epoch {
    fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            fragments: Vec::new(),
        }
    }
}

/// Partition fragments into epochs, opening a new one at every reset.
///
/// Always returns at least one epoch; an empty log yields one empty epoch.
pub fn split_epochs(fragments: Vec<ScanFragment>, sentinel_index: u32) -> Vec<Epoch> {
    let mut detector = ResetDetector::new(sentinel_index);
    let mut epochs = vec![Epoch::new(0)];

    for fragment in fragments {
        if detector.observe(fragment.index) {
            debug!(
                "Device reset at scan {}; starting epoch {}",
                fragment.index,
                epochs.len()
            );
            epochs.push(Epoch::new(epochs.len()));
        }
        if let Some(current) = epochs.last_mut() {
            current.fragments.push(fragment);
        }
    }

    epochs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(index: u32) -> ScanFragment {
        ScanFragment {
            index,
            lines: vec![format!("AA - -{} - x", 40 + index)],
        }
    }

    #[test]
    fn test_first_fragment_is_never_a_reset() {
        let mut detector = ResetDetector::new(0);
        assert!(!detector.observe(0));
        assert!(!detector.observe(1));
        assert!(detector.observe(0));
    }

    #[test]
    fn test_sentinel_one() {
        let mut detector = ResetDetector::new(1);
        assert!(!detector.observe(1));
        assert!(!detector.observe(2));
        assert!(!detector.observe(0));
        assert!(detector.observe(1));
    }

    #[test]
    fn test_split_without_reset() {
        let epochs = split_epochs(vec![fragment(0), fragment(1), fragment(2)], 0);
        assert_eq!(epochs.len(), 1);
        assert_eq!(epochs[0].fragments.len(), 3);
    }

    #[test]
    fn test_split_at_each_reset() {
        let epochs = split_epochs(
            vec![fragment(0), fragment(1), fragment(0), fragment(1), fragment(0)],
            0,
        );
        let sizes: Vec<usize> = epochs.iter().map(|e| e.fragments.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        let ordinals: Vec<usize> = epochs.iter().map(|e| e.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_reset_fragment_opens_new_epoch() {
        let epochs = split_epochs(vec![fragment(0), fragment(1)], 1);
        assert_eq!(epochs.len(), 2);
        assert_eq!(epochs[1].fragments[0].index, 1);
    }

    #[test]
    fn test_empty_input_yields_one_empty_epoch() {
        let epochs = split_epochs(Vec::new(), 0);
        assert_eq!(epochs.len(), 1);
        assert!(epochs[0].fragments.is_empty());
    }
}
