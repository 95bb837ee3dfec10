//! Quota tracking from response headers
//!
//! After a successful response the client copies the configured rate-limit
//! headers into a [`QuotaSink`]. [`QuotaState`] is the shared, thread-safe
//! sink other components read from; a process-wide instance is available
//! through [`QuotaState::global`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock, RwLock};
use reqwest::header::HeaderMap;

/// Receiver of quota values observed on successful responses
pub trait QuotaSink: Send + Sync {
    /// Store `value` under the logical variable `name`, replacing any previous value
    fn record(&self, name: &str, value: &str);
}

/// Shared map from quota variable name to last observed value
#[derive(Debug, Clone, Default)]
pub struct QuotaState {
    values: Arc<RwLock<HashMap<String, String>>>,
}

static GLOBAL_QUOTA: OnceLock<QuotaState> = OnceLock::new();

impl QuotaState {
    /// Create an empty, independent quota state
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide quota state
    pub fn global() -> QuotaState {
        GLOBAL_QUOTA.get_or_init(QuotaState::new).clone()
    }

    /// Last observed value for `name`
    pub fn get(&self, name: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    /// All values, sorted by name
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }
}

impl QuotaSink for QuotaState {
    fn record(&self, name: &str, value: &str) {
        self.values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string(), value.to_string());
    }
}

/// Copy the headers named in `env_vars` from `headers` into `sink`
///
/// Headers missing from the response, or not valid UTF-8, are skipped.
/// Returns the number of values written.
pub fn propagate_quota(
    env_vars: &BTreeMap<String, String>,
    headers: &HeaderMap,
    sink: &dyn QuotaSink,
) -> usize {
    let mut written = 0;
    for (name, header) in env_vars {
        let Some(value) = headers.get(header.as_str()).and_then(|v| v.to_str().ok()) else {
            tracing::debug!(quota = %name, header = %header, "Quota header missing from response");
            continue;
        };
        sink.record(name, value);
        written += 1;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn ors_env_vars() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("ORS_QUOTA".to_string(), "X-Ratelimit-Limit".to_string()),
            ("ORS_REMAINING".to_string(), "X-Ratelimit-Remaining".to_string()),
        ])
    }

    fn headers(limit: &'static str, remaining: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static(limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static(remaining));
        headers.insert("x-other", HeaderValue::from_static("ignored"));
        headers
    }

    #[test]
    fn test_propagation_writes_configured_keys_only() {
        let state = QuotaState::new();
        let written = propagate_quota(&ors_env_vars(), &headers("2000", "1999"), &state);

        assert_eq!(written, 2);
        assert_eq!(
            state.snapshot(),
            BTreeMap::from([
                ("ORS_QUOTA".to_string(), "2000".to_string()),
                ("ORS_REMAINING".to_string(), "1999".to_string()),
            ])
        );
    }

    #[test]
    fn test_later_response_overwrites() {
        let state = QuotaState::new();
        propagate_quota(&ors_env_vars(), &headers("2000", "1999"), &state);
        propagate_quota(&ors_env_vars(), &headers("2000", "1998"), &state);

        assert_eq!(state.snapshot().len(), 2);
        assert_eq!(state.get("ORS_REMAINING").as_deref(), Some("1998"));
    }

    #[test]
    fn test_missing_header_is_skipped() {
        let state = QuotaState::new();
        let mut partial = HeaderMap::new();
        partial.insert("x-ratelimit-remaining", HeaderValue::from_static("12"));

        assert_eq!(propagate_quota(&ors_env_vars(), &partial, &state), 1);
        assert_eq!(state.get("ORS_QUOTA"), None);
        assert_eq!(state.get("ORS_REMAINING").as_deref(), Some("12"));
    }

    #[test]
    fn test_clones_share_values() {
        let state = QuotaState::new();
        let other = state.clone();
        state.record("ORS_QUOTA", "500");
        assert_eq!(other.get("ORS_QUOTA").as_deref(), Some("500"));
        assert!(QuotaState::new().is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let state = QuotaState::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = state.clone();
                std::thread::spawn(move || state.record(&format!("Q{}", i), &i.to_string()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(state.snapshot().len(), 8);
    }
}
