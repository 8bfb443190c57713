// demos/simulated_cluster.rs
//! Runs the replicator against an in-memory cluster
//!
//! The simulated orchestrator asks for one scale-out, rejects the first new
//! node and accepts the second, then asks for a scale-in once the cooldown has
//! passed. A single job with one hot group is submitted on every tick.
//!
//! ```text
//! RUST_LOG=replicator=debug cargo run --example simulated_cluster
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use replicator::policies::{scale_out_group, steady_group};
use replicator::{
    ClusterCapacity, DiscoveryStore, InMemoryMetrics, InstanceGroupClient, JobScalingPolicy,
    NodeCandidate, Orchestrator, ReplicatorClients, ReplicatorConfig, ReplicatorError,
    ReplicatorResult, Runner, ScalingDirection,
};
use tokio::time::{sleep, Duration};
use tracing::info;

/// Simulated scheduler: scales out on the first tick, in on later ones
struct SimulatedNomad {
    ticks: AtomicU32,
    node_health: Mutex<VecDeque<bool>>,
}

#[async_trait]
impl Orchestrator for SimulatedNomad {
    async fn leader_check(&self) -> bool {
        true
    }

    async fn evaluate_cluster_capacity(
        &self,
        capacity: &mut ClusterCapacity,
        _config: &ReplicatorConfig,
    ) -> ReplicatorResult<bool> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        capacity.node_count = 3;
        capacity.utilization.insert("cpu".to_string(), if tick == 0 { 91.0 } else { 12.0 });
        capacity.scaling_direction = if tick == 0 {
            ScalingDirection::Out
        } else {
            ScalingDirection::In
        };
        Ok(true)
    }

    async fn verify_node_health(&self, address: &str) -> bool {
        let healthy = self
            .node_health
            .lock()
            .map(|mut queue| queue.pop_front().unwrap_or(true))
            .unwrap_or(false);
        info!(address, healthy, "simulated health check");
        healthy
    }

    async fn least_allocated_node(&self, _capacity: &ClusterCapacity) -> Option<NodeCandidate> {
        Some(NodeCandidate {
            node_id: "node-3".to_string(),
            address: "10.0.1.3".to_string(),
        })
    }

    async fn drain_node(&self, node_id: &str) -> ReplicatorResult<()> {
        info!(node_id, "simulated drain");
        Ok(())
    }

    async fn evaluate_job_scaling(&self, _policies: &mut [JobScalingPolicy]) {}

    async fn job_scale(&self, policy: &JobScalingPolicy) -> ReplicatorResult<()> {
        info!(job = %policy.job_name, "simulated job submission");
        Ok(())
    }
}

struct SimulatedConsul;

#[async_trait]
impl DiscoveryStore for SimulatedConsul {
    async fn get_job_scaling_policies(
        &self,
        _config: &ReplicatorConfig,
        _orchestrator: &dyn Orchestrator,
    ) -> ReplicatorResult<Vec<JobScalingPolicy>> {
        Ok(vec![JobScalingPolicy::new("web", true)
            .with_group(scale_out_group("frontend"))
            .with_group(steady_group("cache"))])
    }
}

/// Simulated autoscaling group that hands out sequential addresses
struct SimulatedAsg {
    launched: AtomicU32,
}

#[async_trait]
impl InstanceGroupClient for SimulatedAsg {
    async fn scale_out_cluster(&self, group: &str, region: Option<&str>) -> ReplicatorResult<()> {
        info!(group, region, "simulated desired capacity increment");
        Ok(())
    }

    async fn scale_in_cluster(
        &self,
        group: &str,
        address: &str,
        _region: Option<&str>,
    ) -> ReplicatorResult<()> {
        info!(group, address, "simulated instance termination");
        Ok(())
    }

    async fn most_recent_instance(
        &self,
        _group: &str,
        _region: Option<&str>,
    ) -> ReplicatorResult<String> {
        let n = self.launched.fetch_add(1, Ordering::SeqCst) + 10;
        Ok(format!("10.0.1.{}", n))
    }

    async fn translate_address_to_id(
        &self,
        address: &str,
        _region: Option<&str>,
    ) -> ReplicatorResult<String> {
        address
            .rsplit('.')
            .next()
            .map(|suffix| format!("i-0000{}", suffix))
            .ok_or_else(|| ReplicatorError::collaborator("translate_address_to_id", address))
    }

    async fn terminate_instance(
        &self,
        instance_id: &str,
        _region: Option<&str>,
    ) -> ReplicatorResult<()> {
        info!(instance_id, "simulated terminate");
        Ok(())
    }

    async fn detach_instance(
        &self,
        group: &str,
        instance_id: &str,
        _region: Option<&str>,
    ) -> ReplicatorResult<()> {
        info!(group, instance_id, "simulated detach");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,replicator=debug")),
        )
        .init();

    let config = ReplicatorConfig::builder()
        .scaling_interval(1)
        .region("us-east-1")
        .cluster_scaling_enabled(true)
        .autoscaling_group("simulated-workers")
        .cool_down(2)
        .retry_threshold(3)
        .job_scaling_enabled(true)
        .build();

    let metrics = InMemoryMetrics::new();
    let clients = ReplicatorClients::new(
        Arc::new(SimulatedNomad {
            ticks: AtomicU32::new(0),
            node_health: Mutex::new(VecDeque::from([false, true])),
        }),
        Arc::new(SimulatedConsul),
        Arc::new(SimulatedAsg {
            launched: AtomicU32::new(0),
        }),
    )
    .with_metrics(Arc::new(metrics.clone()));

    let runner = Runner::new(config, clients)?;
    let handle = runner.handle();
    let task = tokio::spawn(runner.start());

    sleep(Duration::from_millis(5500)).await;

    let status = handle.status().await;
    info!(
        ticks = status.ticks_completed,
        cluster_scaling = ?status.cluster_scaling_status,
        last_cluster_outcome = ?status.last_cluster_outcome,
        "runner status"
    );
    info!(counters = ?metrics.snapshot(), "metrics");

    handle.stop()?;
    task.await??;
    Ok(())
}
