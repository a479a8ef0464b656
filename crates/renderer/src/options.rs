use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_diff::DiffOptions;

/// Renderer settings. Every field has a default, so a partial JSON object is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Timeout for `wait`, `wait_for_state` and `wait_for_assertion` calls
    /// that do not pass their own.
    pub default_timeout_ms: u64,
    /// Upper bound on batches applied by one pump. Remaining messages stay
    /// queued for the next entry point.
    pub max_batches_per_pump: usize,
    /// Options for `markup_matches` and `compare_to`.
    pub diff: DiffOptions,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererOptions {
    pub fn new() -> Self {
        RendererOptions {
            default_timeout_ms: 1000,
            max_batches_per_pump: 1000,
            diff: DiffOptions::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_diff(mut self, diff: DiffOptions) -> Self {
        self.diff = diff;
        self
    }
}
