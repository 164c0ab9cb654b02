use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for a [`TransferRegistry`](crate::TransferRegistry).
///
/// The dwell window is the artificial minimum time a status stays visible
/// before the next transition is shown. A target is drawn uniformly from
/// `[min_dwell_ms, max_dwell_ms)` for every deferred transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub min_dwell_ms: u64,
    pub max_dwell_ms: u64,
    /// Do not send a `download-keys` request when a `register` call
    /// added no new file.
    pub skip_empty_key_requests: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_dwell_ms: 250,
            max_dwell_ms: 750,
            skip_empty_key_requests: false,
        }
    }
}

impl RegistryConfig {
    /// Transitions become visible as soon as the runtime gets to them.
    pub fn immediate() -> Self {
        Self {
            min_dwell_ms: 0,
            max_dwell_ms: 0,
            ..Self::default()
        }
    }

    pub fn min_dwell(&self) -> Duration {
        Duration::from_millis(self.min_dwell_ms)
    }

    pub fn max_dwell(&self) -> Duration {
        Duration::from_millis(self.max_dwell_ms)
    }
}
