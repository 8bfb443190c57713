//! Fire-and-forget counters emitted by the scaling engines

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Emitted when a cluster scaling pass runs to completion
pub const SCALE_OUT_SUCCESS: &str = "cluster.scale_out_success";
/// Emitted for every new worker node that fails to join the cluster
pub const SCALE_OUT_FAILED: &str = "cluster.scale_out_failed";

/// Sink for counter metrics
///
/// Implementations must not block and must not fail; a lost increment is
/// preferable to stalling a scaling pass.
pub trait MetricsSink: Send + Sync {
    fn incr_counter(&self, name: &str, value: u64);
}

/// Discards every increment
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr_counter(&self, _name: &str, _value: u64) {}
}

/// Keeps counters in process memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryMetrics {
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, zero if it was never incremented
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .map(|counters| counters.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counters
            .lock()
            .map(|counters| counters.clone())
            .unwrap_or_default()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn incr_counter(&self, name: &str, value: u64) {
        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(name.to_string()).or_insert(0) += value;
        }
    }
}

#[cfg(feature = "prometheus-metrics")]
pub use self::prometheus_sink::PrometheusMetrics;

#[cfg(feature = "prometheus-metrics")]
mod prometheus_sink {
    use prometheus::{IntCounterVec, Opts, Registry};

    use super::MetricsSink;

    /// Exposes replicator counters as a single Prometheus counter vector
    ///
    /// `cluster.scale_out_failed` becomes
    /// `replicator_events_total{event="cluster_scale_out_failed"}`.
    #[derive(Debug, Clone)]
    pub struct PrometheusMetrics {
        events: IntCounterVec,
        registry: Registry,
    }

    impl PrometheusMetrics {
        pub fn new() -> Result<Self, prometheus::Error> {
            let events = IntCounterVec::new(
                Opts::new("replicator_events_total", "Replicator scaling events"),
                &["event"],
            )?;

            let registry = Registry::new();
            registry.register(Box::new(events.clone()))?;

            Ok(Self { events, registry })
        }

        /// Registry to hand to an exposition endpoint
        pub fn registry(&self) -> &Registry {
            &self.registry
        }

        pub fn value(&self, name: &str) -> u64 {
            let label = label_for(name);
            self.events.with_label_values(&[label.as_str()]).get()
        }
    }

    impl MetricsSink for PrometheusMetrics {
        fn incr_counter(&self, name: &str, value: u64) {
            let label = label_for(name);
            self.events.with_label_values(&[label.as_str()]).inc_by(value);
        }
    }

    fn label_for(name: &str) -> String {
        name.replace('.', "_")
    }
}
