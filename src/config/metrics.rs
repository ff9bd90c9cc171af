//! Metrics configuration.

use super::defaults::default_metrics_enabled;
use serde::{Deserialize, Serialize};

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose the `/metrics` Prometheus-text endpoint.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}
