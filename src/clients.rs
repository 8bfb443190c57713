// src/clients.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ReplicatorResult;
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::policies::JobScalingPolicy;
use crate::types::{ClusterCapacity, NodeCandidate, ReplicatorConfig};

/// Client for the cluster orchestrator (scheduler)
///
/// Implement this to connect the replicator to your scheduler's API. Every
/// method is consumed by the scaling engines; none of them is retried by the
/// engines, so implementations own their own timeout policy.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Whether this process currently holds cluster leadership
    async fn leader_check(&self) -> bool;

    /// Fill `capacity` with current utilization and a scaling direction
    ///
    /// # Returns
    /// * `Ok(true)` - A scaling action is warranted
    /// * `Ok(false)` - The cluster is sized correctly
    /// * `Err(error)` - Capacity could not be determined
    async fn evaluate_cluster_capacity(
        &self,
        capacity: &mut ClusterCapacity,
        config: &ReplicatorConfig,
    ) -> ReplicatorResult<bool>;

    /// Whether the node at `address` has finished bootstrapping and joined the cluster
    async fn verify_node_health(&self, address: &str) -> bool;

    /// The node with the fewest allocations, or `None` if no node may be removed
    async fn least_allocated_node(&self, capacity: &ClusterCapacity) -> Option<NodeCandidate>;

    /// Evacuate all allocations from a node
    async fn drain_node(&self, node_id: &str) -> ReplicatorResult<()>;

    /// Annotate each group's scale direction across the whole batch
    async fn evaluate_job_scaling(&self, policies: &mut [JobScalingPolicy]);

    /// Submit a whole job definition for scaling
    ///
    /// The orchestrator decides per group what changes; callers never submit
    /// individual groups.
    async fn job_scale(&self, policy: &JobScalingPolicy) -> ReplicatorResult<()>;
}

/// Service-discovery / configuration store holding job scaling policies
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// Fetch every running job that carries a scaling policy
    ///
    /// The orchestrator is passed so implementations can drop policies for
    /// jobs that are no longer running.
    async fn get_job_scaling_policies(
        &self,
        config: &ReplicatorConfig,
        orchestrator: &dyn Orchestrator,
    ) -> ReplicatorResult<Vec<JobScalingPolicy>>;
}

/// Cloud instance-group API backing the worker pool
#[async_trait]
pub trait InstanceGroupClient: Send + Sync {
    /// Increment the group's desired capacity by one
    ///
    /// `region` is the configured or discovered region; `None` means the
    /// client's default.
    async fn scale_out_cluster(&self, group: &str, region: Option<&str>) -> ReplicatorResult<()>;

    /// Terminate the instance at `address` and decrement the desired capacity
    async fn scale_in_cluster(
        &self,
        group: &str,
        address: &str,
        region: Option<&str>,
    ) -> ReplicatorResult<()>;

    /// Address of the most recently launched instance in the group
    async fn most_recent_instance(&self, group: &str, region: Option<&str>)
        -> ReplicatorResult<String>;

    /// Resolve an instance address to the cloud's instance identifier
    async fn translate_address_to_id(
        &self,
        address: &str,
        region: Option<&str>,
    ) -> ReplicatorResult<String>;

    async fn terminate_instance(&self, instance_id: &str, region: Option<&str>)
        -> ReplicatorResult<()>;

    /// Remove an instance from the group without terminating it
    async fn detach_instance(
        &self,
        group: &str,
        instance_id: &str,
        region: Option<&str>,
    ) -> ReplicatorResult<()>;
}

/// Best-effort detection of the region this process runs in
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegionDiscovery: Send + Sync {
    async fn describe_region(&self) -> ReplicatorResult<String>;
}

/// All collaborator handles needed by the scaling engines
#[derive(Clone)]
pub struct ReplicatorClients {
    pub orchestrator: Arc<dyn Orchestrator>,
    pub discovery: Arc<dyn DiscoveryStore>,
    pub instance_group: Arc<dyn InstanceGroupClient>,
    pub region_discovery: Option<Arc<dyn RegionDiscovery>>,
    pub metrics: Arc<dyn MetricsSink>,
}

impl ReplicatorClients {
    /// Create a client bundle with no region discovery and a no-op metrics sink
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        discovery: Arc<dyn DiscoveryStore>,
        instance_group: Arc<dyn InstanceGroupClient>,
    ) -> Self {
        Self {
            orchestrator,
            discovery,
            instance_group,
            region_discovery: None,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_region_discovery(mut self, region_discovery: Arc<dyn RegionDiscovery>) -> Self {
        self.region_discovery = Some(region_discovery);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }
}
