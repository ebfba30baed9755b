//! In-memory fingerprint table keyed by session name.

use std::collections::BTreeMap;

use fingerprint_core::models::Fingerprint;
use serde::{Deserialize, Serialize};

/// Whether device resets split a session into separate fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopePolicy {
    /// One fingerprint per epoch; the last epoch is the session's fingerprint.
    #[default]
    Epoch,
    /// Resets are ignored and the whole session folds into one fingerprint.
    Session,
}

impl ScopePolicy {
    /// Resolve a scope flag value (`epoch`, `session`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "epoch" => Some(ScopePolicy::Epoch),
            "session" => Some(ScopePolicy::Session),
            _ => None,
        }
    }
}

/// Everything computed for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFingerprint {
    pub location: String,
    pub policy: ScopePolicy,
    /// One entry per epoch under [`ScopePolicy::Epoch`], a single entry otherwise.
    pub epochs: Vec<Fingerprint>,
}

impl SessionFingerprint {
    pub fn new(location: impl Into<String>, policy: ScopePolicy, epochs: Vec<Fingerprint>) -> Self {
        Self {
            location: location.into(),
            policy,
            epochs,
        }
    }

    /// The fingerprint that represents the session.
    ///
    /// Under both policies this is the last computed fingerprint: the state
    /// after the most recent reset, or the single whole-session fold.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.epochs.last()
    }

    pub fn epoch_count(&self) -> usize {
        self.epochs.len()
    }
}

/// Session name → computed fingerprints.
///
/// Entries are replaced wholesale on insert, never merged, so recomputing a
/// session cannot leave stale routers behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FingerprintStore {
    sessions: BTreeMap<String, SessionFingerprint>,
}

impl FingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `session` under `name`, returning the entry it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        session: SessionFingerprint,
    ) -> Option<SessionFingerprint> {
        self.sessions.insert(name.into(), session)
    }

    pub fn get(&self, name: &str) -> Option<&SessionFingerprint> {
        self.sessions.get(name)
    }

    /// Effective fingerprint of session `name`.
    pub fn fingerprint(&self, name: &str) -> Option<&Fingerprint> {
        self.get(name).and_then(SessionFingerprint::fingerprint)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SessionFingerprint)> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerprint_core::models::RouterStats;

    fn fingerprint(bssid: &str, samples: &[i32]) -> Fingerprint {
        let avg = samples.iter().sum::<i32>() as f64 / samples.len() as f64;
        let mut fp = Fingerprint::new();
        fp.insert(
            bssid.to_string(),
            RouterStats {
                ssid: "eduroam".to_string(),
                avg_rssi: avg,
                samples: samples.to_vec(),
            },
        );
        fp
    }

    #[test]
    fn test_scope_from_name() {
        assert_eq!(ScopePolicy::from_name("epoch"), Some(ScopePolicy::Epoch));
        assert_eq!(ScopePolicy::from_name("session"), Some(ScopePolicy::Session));
        assert_eq!(ScopePolicy::from_name("day"), None);
        assert_eq!(ScopePolicy::default(), ScopePolicy::Epoch);
    }

    #[test]
    fn test_effective_fingerprint_is_last_epoch() {
        let session = SessionFingerprint::new(
            "hall",
            ScopePolicy::Epoch,
            vec![fingerprint("A", &[-50]), fingerprint("A", &[-60])],
        );
        assert_eq!(session.epoch_count(), 2);
        assert_eq!(session.fingerprint().unwrap()["A"].samples, vec![-60]);
    }

    #[test]
    fn test_insert_replaces_session() {
        let mut store = FingerprintStore::new();
        store.insert(
            "hall",
            SessionFingerprint::new("x", ScopePolicy::Session, vec![fingerprint("A", &[-50])]),
        );
        let replaced = store.insert(
            "hall",
            SessionFingerprint::new("x", ScopePolicy::Session, vec![fingerprint("B", &[-70])]),
        );

        assert!(replaced.is_some());
        assert_eq!(store.len(), 1);
        let fp = store.fingerprint("hall").unwrap();
        assert!(fp.contains_key("B"));
        assert!(!fp.contains_key("A"));
    }

    #[test]
    fn test_missing_session() {
        let store = FingerprintStore::new();
        assert!(store.is_empty());
        assert!(store.fingerprint("nowhere").is_none());
    }

    #[test]
    fn test_empty_session_has_no_fingerprint() {
        let session = SessionFingerprint::new("x", ScopePolicy::Epoch, vec![]);
        assert!(session.fingerprint().is_none());
    }
}
