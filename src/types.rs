// src/types.rs

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{ReplicatorError, ReplicatorResult};

/// Identifier of a cloud instance group (e.g. an AWS autoscaling group name)
pub type GroupId = String;

/// Direction a cluster or a job group should be scaled in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ScalingDirection {
    /// Add capacity
    Out,
    /// Remove capacity
    In,
    /// Keep current capacity
    #[default]
    None,
}

impl std::fmt::Display for ScalingDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalingDirection::Out => write!(f, "scale-out"),
            ScalingDirection::In => write!(f, "scale-in"),
            ScalingDirection::None => write!(f, "none"),
        }
    }
}

/// Snapshot of cluster utilization, created fresh for every cluster scaling pass
///
/// The orchestrator fills this in during capacity evaluation; the engine only
/// reads `scaling_direction` and hands the snapshot back for node selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterCapacity {
    /// Number of worker nodes currently eligible for allocations
    pub node_count: u32,
    /// Total allocatable resources keyed by resource name ("cpu", "memory_mb", ...)
    pub total_capacity: HashMap<String, u64>,
    /// Resources currently consumed by running allocations
    pub used_capacity: HashMap<String, u64>,
    /// Utilization percentage per resource
    pub utilization: HashMap<String, f64>,
    /// The directive derived from the snapshot
    pub scaling_direction: ScalingDirection,
}

/// A worker node selected for removal during scale-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCandidate {
    /// Orchestrator node identifier
    pub node_id: String,
    /// Private address used to locate the backing cloud instance
    pub address: String,
}

/// In-memory record of scale-out failures and the last successful scaling event
///
/// Owned by the runner for the lifetime of the process and moved into each
/// cluster scaling pass. Nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct ScalingState {
    /// Consecutive failed node provisioning attempts since the last success
    pub node_failure_count: u32,
    /// When the last scale-out or scale-in completed; `None` means never
    pub last_scaling_event: Option<Instant>,
}

impl ScalingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the instant at which the cooldown window ends, if one is active
    pub fn cooldown_deadline(&self, cool_down: Duration) -> Option<Instant> {
        self.last_scaling_event.map(|last| last + cool_down)
    }

    pub(crate) fn record_scaling_event(&mut self) {
        self.last_scaling_event = Some(Instant::now());
    }
}

/// Whether the cluster scaling engine is permitted to act, and if not, why
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterScalingStatus {
    Enabled,
    /// Turned off in configuration
    DisabledByOperator,
    /// Turned off by the engine after repeated node provisioning failures
    DisabledByFailureThreshold,
}

impl ClusterScalingStatus {
    pub fn is_enabled(&self) -> bool {
        matches!(self, ClusterScalingStatus::Enabled)
    }
}

/// Cluster (worker pool) scaling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterScalingConfig {
    /// Whether cluster scaling actions may be taken
    pub enabled: bool,
    /// Minimum time between two scaling events (seconds)
    pub cool_down_seconds: u64,
    /// Failed node launches tolerated before cluster scaling disables itself
    pub retry_threshold: u32,
    /// Instance group backing the worker pool
    pub autoscaling_group: GroupId,
    /// Number of node failures the cluster should absorb; consumed by capacity evaluation
    pub node_fault_tolerance: u32,
}

impl Default for ClusterScalingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cool_down_seconds: 600,
            retry_threshold: 3,
            autoscaling_group: String::new(),
            node_fault_tolerance: 1,
        }
    }
}

impl ClusterScalingConfig {
    pub fn cool_down(&self) -> Duration {
        Duration::from_secs(self.cool_down_seconds)
    }
}

/// Per-job scaling settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobScalingConfig {
    /// Global switch for job scaling submissions
    pub enabled: bool,
    /// Key prefix under which job policy documents live in the discovery store
    pub policy_key_location: Option<String>,
}

/// Main configuration for the replicator runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicatorConfig {
    /// How often to run a scaling tick (seconds)
    pub scaling_interval_seconds: u64,
    /// Cloud region; discovered from instance metadata when unset
    pub region: Option<String>,
    pub cluster_scaling: ClusterScalingConfig,
    pub job_scaling: JobScalingConfig,
    /// Collaborator-specific settings (addresses, tokens, ...)
    pub settings: HashMap<String, String>,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            scaling_interval_seconds: 10,
            region: None,
            cluster_scaling: ClusterScalingConfig::default(),
            job_scaling: JobScalingConfig::default(),
            settings: HashMap::new(),
        }
    }
}

/// Builder pattern for easy configuration creation
impl ReplicatorConfig {
    pub fn builder() -> ReplicatorConfigBuilder {
        ReplicatorConfigBuilder::new()
    }

    pub fn scaling_interval(&self) -> Duration {
        Duration::from_secs(self.scaling_interval_seconds)
    }

    /// Reject configurations the control loop cannot run with
    pub fn validate(&self) -> ReplicatorResult<()> {
        if self.scaling_interval_seconds == 0 {
            return Err(ReplicatorError::config(
                "scaling_interval_seconds must be greater than zero",
            ));
        }

        if self.cluster_scaling.enabled && self.cluster_scaling.autoscaling_group.is_empty() {
            return Err(ReplicatorError::config(
                "cluster scaling is enabled but no autoscaling_group is configured",
            ));
        }

        // With a threshold of zero the failure count never equals it inside the
        // retry loop, so the self-disable latch could never fire.
        if self.cluster_scaling.retry_threshold == 0 {
            return Err(ReplicatorError::config(
                "cluster_scaling.retry_threshold must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Builder for creating replicator configurations easily
#[derive(Debug, Default)]
pub struct ReplicatorConfigBuilder {
    config: ReplicatorConfig,
}

impl ReplicatorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ReplicatorConfig::default(),
        }
    }

    pub fn scaling_interval(mut self, seconds: u64) -> Self {
        self.config.scaling_interval_seconds = seconds;
        self
    }

    pub fn region(mut self, region: &str) -> Self {
        self.config.region = Some(region.to_string());
        self
    }

    pub fn cluster_scaling_enabled(mut self, enabled: bool) -> Self {
        self.config.cluster_scaling.enabled = enabled;
        self
    }

    pub fn autoscaling_group(mut self, group: &str) -> Self {
        self.config.cluster_scaling.autoscaling_group = group.to_string();
        self
    }

    pub fn cool_down(mut self, seconds: u64) -> Self {
        self.config.cluster_scaling.cool_down_seconds = seconds;
        self
    }

    pub fn retry_threshold(mut self, threshold: u32) -> Self {
        self.config.cluster_scaling.retry_threshold = threshold;
        self
    }

    pub fn node_fault_tolerance(mut self, nodes: u32) -> Self {
        self.config.cluster_scaling.node_fault_tolerance = nodes;
        self
    }

    pub fn job_scaling_enabled(mut self, enabled: bool) -> Self {
        self.config.job_scaling.enabled = enabled;
        self
    }

    pub fn policy_key_location(mut self, location: &str) -> Self {
        self.config.job_scaling.policy_key_location = Some(location.to_string());
        self
    }

    pub fn setting(mut self, key: &str, value: &str) -> Self {
        self.config.settings.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> ReplicatorConfig {
        self.config
    }
}
