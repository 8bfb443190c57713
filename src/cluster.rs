//! Cluster (worker pool) scaling
//!
//! One call to [`ClusterScalingEngine::run_pass`] performs a complete
//! evaluate-and-act cycle:
//!
//! ```text
//! leader? ──no──► NotLeader
//!    │
//! region resolved (best effort)
//!    │
//! capacity evaluation ──err/no──► EvaluationFailed / NotRequired
//!    │
//! cooldown elapsed? ──no──► CoolingDown
//!    │
//!    ├── Out: increment desired capacity, then verify newest instance,
//!    │        retrying while failures <= retry_threshold; disable at the threshold
//!    └── In:  least allocated node ─► drain ─► terminate
//! ```
//!
//! Leadership and cooldown are checked before any mutating call, so a
//! follower or a cooling-down replica never touches the cloud API.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::clients::ReplicatorClients;
use crate::metrics::{SCALE_OUT_FAILED, SCALE_OUT_SUCCESS};
use crate::types::{
    ClusterCapacity, ClusterScalingStatus, NodeCandidate, ReplicatorConfig, ScalingDirection,
    ScalingState,
};

/// How a cluster scaling pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterScalingOutcome {
    /// Another replica holds leadership
    NotLeader,
    /// The orchestrator could not evaluate capacity
    EvaluationFailed,
    /// Capacity evaluation asked for no change
    NotRequired,
    /// A previous scaling event is still inside the cooldown window
    CoolingDown { remaining: Duration },
    /// A directive was observed but cluster scaling is disabled
    Suppressed {
        direction: ScalingDirection,
        status: ClusterScalingStatus,
    },
    /// The instance group's desired capacity could not be incremented
    ScaleOutRequestFailed,
    /// A new node joined the cluster and passed its health check
    ScaledOut { instance: String },
    /// Node launches kept failing; cluster scaling is now disabled and the
    /// last failed instance (if it could be identified) was detached
    FailureThresholdReached { instance_id: Option<String> },
    /// The retry loop ran out without a healthy node or a threshold hit
    ScaleOutAttemptsExhausted,
    /// Scale-in was requested but no node may be removed
    NoEligibleNode,
    DrainFailed { node_id: String },
    /// The node was drained but its instance could not be terminated
    ///
    /// No rollback happens; the node stays drained until an operator or a
    /// later pass deals with it.
    DrainedNotTerminated { node_id: String, address: String },
    ScaledIn { node_id: String, address: String },
    /// Scaling was requested without a direction
    NoAction,
}

/// The cluster-level decision and action state machine
pub struct ClusterScalingEngine {
    config: Arc<ReplicatorConfig>,
    clients: ReplicatorClients,
    status: ClusterScalingStatus,
    region: Option<String>,
}

impl ClusterScalingEngine {
    pub fn new(config: Arc<ReplicatorConfig>, clients: ReplicatorClients) -> Self {
        let status = if config.cluster_scaling.enabled {
            ClusterScalingStatus::Enabled
        } else {
            ClusterScalingStatus::DisabledByOperator
        };
        let region = config.region.clone();

        Self {
            config,
            clients,
            status,
            region,
        }
    }

    pub fn status(&self) -> ClusterScalingStatus {
        self.status
    }

    /// Region used for cloud calls, configured or discovered
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Operator action: allow cluster scaling again and forget past failures
    pub fn enable(&mut self, state: &mut ScalingState) {
        if self.status != ClusterScalingStatus::Enabled {
            info!(
                "cluster scaling re-enabled (previous status: {:?})",
                self.status
            );
        }
        self.status = ClusterScalingStatus::Enabled;
        state.node_failure_count = 0;
    }

    /// Run one complete cluster scaling cycle
    pub async fn run_pass(&mut self, state: &mut ScalingState) -> ClusterScalingOutcome {
        let orchestrator = self.clients.orchestrator.clone();

        if !orchestrator.leader_check().await {
            debug!(
                "cluster scaling: not running on the known leader, \
                 no cluster scaling actions will be taken"
            );
            return ClusterScalingOutcome::NotLeader;
        }

        self.resolve_region().await;

        let mut capacity = ClusterCapacity::default();
        match orchestrator
            .evaluate_cluster_capacity(&mut capacity, &self.config)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!("cluster scaling: scaling operation not required");
                return ClusterScalingOutcome::NotRequired;
            }
            Err(e) => {
                error!("cluster scaling: failed to evaluate cluster capacity: {}", e);
                return ClusterScalingOutcome::EvaluationFailed;
            }
        }

        if let ControlFlow::Break(outcome) = self.check_cooldown(state) {
            return outcome;
        }

        let flow = match capacity.scaling_direction {
            ScalingDirection::Out => self.scale_out(state).await,
            ScalingDirection::In => self.scale_in(&capacity, state).await,
            ScalingDirection::None => ControlFlow::Continue(ClusterScalingOutcome::NoAction),
        };

        match flow {
            ControlFlow::Break(outcome) => outcome,
            ControlFlow::Continue(outcome) => {
                self.clients.metrics.incr_counter(SCALE_OUT_SUCCESS, 1);
                outcome
            }
        }
    }

    async fn resolve_region(&mut self) {
        if self.region.is_some() {
            return;
        }

        let Some(discovery) = self.clients.region_discovery.clone() else {
            return;
        };

        match discovery.describe_region().await {
            Ok(region) => {
                info!(region = %region, "cluster scaling: discovered cloud region");
                self.region = Some(region);
            }
            Err(e) => {
                debug!(
                    "cluster scaling: unable to discover cloud region, using client default: {}",
                    e
                );
            }
        }
    }

    fn check_cooldown(&self, state: &ScalingState) -> ControlFlow<ClusterScalingOutcome> {
        let cool_down = self.config.cluster_scaling.cool_down();

        match state.cooldown_deadline(cool_down) {
            Some(deadline) => {
                let now = Instant::now();
                if now < deadline {
                    let remaining = deadline - now;
                    info!(
                        remaining_secs = remaining.as_secs(),
                        "cluster scaling: cooldown threshold has not been reached, \
                         scaling operations will not be permitted"
                    );
                    return ControlFlow::Break(ClusterScalingOutcome::CoolingDown { remaining });
                }
                debug!("cluster scaling: cooldown threshold has been reached, scaling permitted");
            }
            None => {
                info!(
                    "cluster scaling: no previous scaling operations have occurred, \
                     scaling operations will be permitted"
                );
            }
        }

        ControlFlow::Continue(())
    }

    fn suppressed(&self, direction: ScalingDirection) -> ClusterScalingOutcome {
        match self.status {
            ClusterScalingStatus::DisabledByFailureThreshold => debug!(
                "cluster scaling: disabled after repeated node failures, \
                 not initiating scaling operation ({})",
                direction
            ),
            _ => debug!(
                "cluster scaling: disabled, not initiating scaling operation ({})",
                direction
            ),
        }

        ClusterScalingOutcome::Suppressed {
            direction,
            status: self.status,
        }
    }

    async fn scale_out(
        &mut self,
        state: &mut ScalingState,
    ) -> ControlFlow<ClusterScalingOutcome, ClusterScalingOutcome> {
        if !self.status.is_enabled() {
            return ControlFlow::Break(self.suppressed(ScalingDirection::Out));
        }

        let group = self.config.cluster_scaling.autoscaling_group.clone();
        let threshold = self.config.cluster_scaling.retry_threshold;
        let instance_group = self.clients.instance_group.clone();
        let orchestrator = self.clients.orchestrator.clone();

        if let Err(e) = instance_group
            .scale_out_cluster(&group, self.region.as_deref())
            .await
        {
            error!(
                autoscaling_group = %group,
                "cluster scaling: unable to initiate a scaling operation: {}", e
            );
            return ControlFlow::Break(ClusterScalingOutcome::ScaleOutRequestFailed);
        }

        // Fresh cycle: failures from earlier passes do not count against this one.
        state.node_failure_count = 0;

        // Inclusive bound: threshold + 1 launch attempts fit in the loop.
        while state.node_failure_count <= threshold {
            if state.node_failure_count > 0 {
                info!(
                    node_failure_count = state.node_failure_count,
                    "cluster scaling: attempting to launch a new worker node"
                );
            }

            let newest = match instance_group
                .most_recent_instance(&group, self.region.as_deref())
                .await
            {
                Ok(address) => address,
                Err(e) => {
                    error!(
                        autoscaling_group = %group,
                        "cluster scaling: failed to identify the most recently launched instance: {}",
                        e
                    );
                    state.node_failure_count += 1;
                    continue;
                }
            };

            if orchestrator.verify_node_health(&newest).await {
                state.node_failure_count = 0;
                state.record_scaling_event();
                info!(instance = %newest, "cluster scaling: new worker node joined the cluster");
                return ControlFlow::Break(ClusterScalingOutcome::ScaledOut { instance: newest });
            }

            state.node_failure_count += 1;
            error!(
                instance = %newest,
                node_failure_count = state.node_failure_count,
                "cluster scaling: new node failed to join the worker pool"
            );
            self.clients.metrics.incr_counter(SCALE_OUT_FAILED, 1);

            let instance_id = match instance_group
                .translate_address_to_id(&newest, self.region.as_deref())
                .await
            {
                Ok(id) => Some(id),
                Err(e) => {
                    error!(
                        instance = %newest,
                        "cluster scaling: unable to resolve instance id, skipping cleanup: {}", e
                    );
                    None
                }
            };

            if self.disable_on_threshold(state) {
                if let Some(id) = instance_id.as_deref() {
                    // Detached rather than terminated so the node can be inspected.
                    if let Err(e) = instance_group
                        .detach_instance(&group, id, self.region.as_deref())
                        .await
                    {
                        error!(
                            instance_id = %id,
                            "cluster scaling: failed to detach the failed instance from the group: {}",
                            e
                        );
                    }
                }
                return ControlFlow::Break(ClusterScalingOutcome::FailureThresholdReached {
                    instance_id,
                });
            }

            if let Some(id) = instance_id.as_deref() {
                if let Err(e) = instance_group
                    .terminate_instance(id, self.region.as_deref())
                    .await
                {
                    error!(
                        instance_id = %id,
                        "cluster scaling: failed to terminate instance: {}", e
                    );
                }
            }
        }

        ControlFlow::Continue(ClusterScalingOutcome::ScaleOutAttemptsExhausted)
    }

    /// Latch cluster scaling off once the failure count reaches the threshold
    fn disable_on_threshold(&mut self, state: &ScalingState) -> bool {
        let threshold = self.config.cluster_scaling.retry_threshold;
        if state.node_failure_count != threshold {
            return false;
        }

        self.status = ClusterScalingStatus::DisabledByFailureThreshold;
        error!(
            retry_threshold = threshold,
            "cluster scaling: attempts to add new nodes to the worker pool have failed \
             {} times, cluster scaling will be disabled",
            threshold
        );
        true
    }

    async fn scale_in(
        &self,
        capacity: &ClusterCapacity,
        state: &mut ScalingState,
    ) -> ControlFlow<ClusterScalingOutcome, ClusterScalingOutcome> {
        let orchestrator = self.clients.orchestrator.clone();

        let Some(NodeCandidate { node_id, address }) =
            orchestrator.least_allocated_node(capacity).await
        else {
            debug!("cluster scaling: no node is eligible for removal");
            return ControlFlow::Continue(ClusterScalingOutcome::NoEligibleNode);
        };

        if !self.status.is_enabled() {
            return ControlFlow::Break(self.suppressed(ScalingDirection::In));
        }

        if let Err(e) = orchestrator.drain_node(&node_id).await {
            error!(node_id = %node_id, "cluster scaling: failed to drain node: {}", e);
            return ControlFlow::Continue(ClusterScalingOutcome::DrainFailed { node_id });
        }

        info!(node_id = %node_id, address = %address, "cluster scaling: terminating instance");
        let group = &self.config.cluster_scaling.autoscaling_group;
        if let Err(e) = self
            .clients
            .instance_group
            .scale_in_cluster(group, &address, self.region.as_deref())
            .await
        {
            error!(
                node_id = %node_id,
                address = %address,
                "cluster scaling: node drained but its instance could not be terminated: {}",
                e
            );
            return ControlFlow::Continue(ClusterScalingOutcome::DrainedNotTerminated {
                node_id,
                address,
            });
        }

        state.record_scaling_event();
        ControlFlow::Continue(ClusterScalingOutcome::ScaledIn { node_id, address })
    }
}
