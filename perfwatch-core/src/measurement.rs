use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_confidence() -> f64 {
    1.0
}

/// One observation of a metric for a subject (e.g. a serialization framework).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMeasurement {
    pub timestamp: DateTime<Utc>,
    /// What was measured, e.g. `"protobuf"`.
    pub subject: String,
    /// Metric name, e.g. `"serialize_latency_ms"`.
    pub metric: String,
    pub value: f64,
    /// Caller-supplied confidence score; not computed here.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl PerformanceMeasurement {
    /// Create a measurement with no metadata.
    pub fn new(
        timestamp: DateTime<Utc>,
        subject: impl Into<String>,
        metric: impl Into<String>,
        value: f64,
        confidence: f64,
    ) -> Self {
        Self {
            timestamp,
            subject: subject.into(),
            metric: metric.into(),
            value,
            confidence,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach one metadata entry.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for PerformanceMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {}={:.6} (confidence={:.3}) at {}",
            self.subject,
            self.metric,
            self.metric,
            self.value,
            self.confidence,
            self.timestamp.to_rfc3339()
        )
    }
}
