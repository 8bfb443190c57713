//! # Replicator - Cluster and Job Autoscaling Control Loop
//!
//! Replicator periodically decides whether a cluster's worker pool (a
//! cloud-managed instance group) or any individual job needs more or fewer
//! resources, and drives the orchestrator, discovery store and cloud APIs to
//! make that change safely.
//!
//! ## 🎯 Safety Properties
//!
//! - **Leader only**: every pass starts with a leadership check; followers issue no calls
//! - **Cooldown gated**: at most one cluster scaling event per cooldown window
//! - **Bounded retries**: failed node launches are retried up to a threshold, then
//!   cluster scaling disables itself and the last failed node is kept for inspection
//! - **No overlap**: the cluster pass always finishes before the job pass starts
//!
//! ## 📊 Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                            Runner                             │
//! │        interval tick ─► cluster pass (own task) ─► job pass   │
//! ├───────────────────────────────┬───────────────────────────────┤
//! │     ClusterScalingEngine      │       JobScalingEngine        │
//! │                               │                               │
//! │ • Leadership + cooldown gates │ • Leadership gate             │
//! │ • Scale-out retry loop        │ • Policy fetch + evaluation   │
//! │ • Self-disable latch          │ • Whole-job submission        │
//! │ • Drain-then-terminate        │                               │
//! └───────────────────────────────┴───────────────────────────────┘
//!                                 │
//!                       ┌─────────▼─────────┐
//!                       │    Your Clients   │
//!                       │                   │
//!                       │ • Orchestrator    │
//!                       │ • DiscoveryStore  │
//!                       │ • InstanceGroup   │
//!                       │ • RegionDiscovery │
//!                       │ • MetricsSink     │
//!                       └───────────────────┘
//! ```
//!
//! ## 🚀 Usage
//!
//! ```rust,ignore
//! use replicator::{ReplicatorClients, ReplicatorConfig, Runner};
//! use std::sync::Arc;
//!
//! let config = ReplicatorConfig::builder()
//!     .scaling_interval(10)
//!     .cluster_scaling_enabled(true)
//!     .autoscaling_group("worker-pool")
//!     .cool_down(600)
//!     .retry_threshold(3)
//!     .job_scaling_enabled(true)
//!     .build();
//!
//! let clients = ReplicatorClients::new(
//!     Arc::new(MyNomadClient::new()),
//!     Arc::new(MyConsulClient::new()),
//!     Arc::new(MyAsgClient::new()),
//! );
//!
//! let runner = Runner::new(config, clients)?;
//! let handle = runner.handle();
//! tokio::spawn(runner.start());
//!
//! // later
//! handle.stop()?;
//! ```
//!
//! ## Features
//!
//! - `config-toml`: load [`ReplicatorConfig`] from TOML files
//! - `prometheus-metrics`: export counters through a Prometheus registry

pub mod error;
pub mod types;
pub mod policies;
pub mod clients;
pub mod metrics;
pub mod cluster;
pub mod jobs;
pub mod runner;
#[cfg(feature = "config-toml")]
pub mod config;


// Re-export common types for convenience
pub use types::{
    ClusterCapacity, ClusterScalingConfig, ClusterScalingStatus, GroupId, JobScalingConfig,
    NodeCandidate, ReplicatorConfig, ReplicatorConfigBuilder, ScalingDirection, ScalingState,
};

pub use error::{ReplicatorError, ReplicatorResult};

pub use policies::{GroupScalingPolicy, JobScalingPolicy};

pub use clients::{
    DiscoveryStore, InstanceGroupClient, Orchestrator, RegionDiscovery, ReplicatorClients,
};

pub use metrics::{InMemoryMetrics, MetricsSink, NoopMetrics};

#[cfg(feature = "prometheus-metrics")]
pub use metrics::PrometheusMetrics;

pub use cluster::{ClusterScalingEngine, ClusterScalingOutcome};

pub use jobs::{JobScalingEngine, JobScalingOutcome, JobScalingReport};

pub use runner::{Runner, RunnerCommand, RunnerHandle, RunnerStatus};
