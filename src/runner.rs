// src/runner.rs

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::clients::ReplicatorClients;
use crate::cluster::{ClusterScalingEngine, ClusterScalingOutcome};
use crate::error::{ReplicatorError, ReplicatorResult};
use crate::jobs::{JobScalingEngine, JobScalingOutcome};
use crate::types::{ClusterScalingStatus, ReplicatorConfig, ScalingState};

/// Commands that can be sent to a running replicator
#[derive(Debug)]
pub enum RunnerCommand {
    /// Allow cluster scaling again after it was disabled
    EnableClusterScaling,
    /// Stop the control loop after the current tick
    Shutdown,
}

/// Status information about the replicator runner
#[derive(Debug, Clone)]
pub struct RunnerStatus {
    pub is_running: bool,
    pub ticks_completed: u64,
    pub cluster_scaling_status: ClusterScalingStatus,
    pub last_cluster_outcome: Option<ClusterScalingOutcome>,
    pub last_job_outcome: Option<JobScalingOutcome>,
}

/// The periodic scaling control loop
///
/// Every tick runs one cluster scaling pass on its own task and waits for it,
/// then runs one job scaling pass inline. The two passes never overlap.
pub struct Runner {
    config: Arc<ReplicatorConfig>,
    cluster: ClusterScalingEngine,
    jobs: JobScalingEngine,
    command_tx: mpsc::UnboundedSender<RunnerCommand>,
    command_rx: mpsc::UnboundedReceiver<RunnerCommand>,
    status: Arc<RwLock<RunnerStatus>>,
}

impl Runner {
    /// Create a new runner from a validated configuration
    pub fn new(config: ReplicatorConfig, clients: ReplicatorClients) -> ReplicatorResult<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let cluster = ClusterScalingEngine::new(config.clone(), clients.clone());
        let jobs = JobScalingEngine::new(config.clone(), clients);

        let status = RunnerStatus {
            is_running: false,
            ticks_completed: 0,
            cluster_scaling_status: cluster.status(),
            last_cluster_outcome: None,
            last_job_outcome: None,
        };

        Ok(Self {
            config,
            cluster,
            jobs,
            command_tx,
            command_rx,
            status: Arc::new(RwLock::new(status)),
        })
    }

    /// Get a handle to control the runner
    pub fn handle(&self) -> RunnerHandle {
        RunnerHandle {
            command_tx: self.command_tx.clone(),
            status: self.status.clone(),
        }
    }

    /// Run the control loop until a shutdown command arrives (consumes self)
    pub async fn start(self) -> ReplicatorResult<()> {
        // Holding our own sender keeps the loop alive even if every handle is
        // dropped, so `recv` never yields `None` here.
        let Runner {
            config,
            cluster,
            jobs,
            command_tx: _command_tx,
            mut command_rx,
            status,
        } = self;

        let period = config.scaling_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        // A slow tick leaves at most one pending tick behind.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut cluster = Some(cluster);
        let mut scaling_state = Some(ScalingState::new());

        status.write().await.is_running = true;
        info!(
            interval_secs = period.as_secs(),
            "replicator runner starting"
        );

        let result = loop {
            tokio::select! {
                biased;

                Some(command) = command_rx.recv() => {
                    match command {
                        RunnerCommand::Shutdown => {
                            info!("shutdown command received");
                            break Ok(());
                        }
                        RunnerCommand::EnableClusterScaling => {
                            if let (Some(engine), Some(state)) = (cluster.as_mut(), scaling_state.as_mut()) {
                                engine.enable(state);
                                status.write().await.cluster_scaling_status = engine.status();
                            }
                        }
                    }
                }

                _ = ticker.tick() => {
                    let (Some(mut engine), Some(mut state)) = (cluster.take(), scaling_state.take()) else {
                        break Err(ReplicatorError::runner_not_running("cluster scaling engine unavailable"));
                    };

                    // The engine and its state travel into the pass and come
                    // back through the join handle.
                    let pass = tokio::spawn(async move {
                        let outcome = engine.run_pass(&mut state).await;
                        (engine, state, outcome)
                    });

                    let (engine, state, cluster_outcome) = match pass.await {
                        Ok(finished) => finished,
                        Err(e) => {
                            error!("cluster scaling pass failed: {}", e);
                            break Err(e.into());
                        }
                    };
                    debug!(outcome = ?cluster_outcome, "cluster scaling pass complete");

                    let job_outcome = jobs.run_pass().await;
                    debug!(outcome = ?job_outcome, "job scaling pass complete");

                    {
                        let mut status = status.write().await;
                        status.ticks_completed += 1;
                        status.cluster_scaling_status = engine.status();
                        status.last_cluster_outcome = Some(cluster_outcome);
                        status.last_job_outcome = Some(job_outcome);
                    }

                    cluster = Some(engine);
                    scaling_state = Some(state);
                }
            }
        };

        status.write().await.is_running = false;
        info!("replicator runner stopped");
        result
    }
}

/// Handle for controlling a running replicator
#[derive(Clone)]
pub struct RunnerHandle {
    command_tx: mpsc::UnboundedSender<RunnerCommand>,
    status: Arc<RwLock<RunnerStatus>>,
}

impl RunnerHandle {
    /// Ask the runner to stop once the current tick is done
    ///
    /// In-flight passes are not interrupted. Fails if the runner has already
    /// exited.
    pub fn stop(&self) -> ReplicatorResult<()> {
        self.send(RunnerCommand::Shutdown)
    }

    /// Re-enable cluster scaling, e.g. after it disabled itself
    pub fn enable_cluster_scaling(&self) -> ReplicatorResult<()> {
        self.send(RunnerCommand::EnableClusterScaling)
    }

    fn send(&self, command: RunnerCommand) -> ReplicatorResult<()> {
        self.command_tx
            .send(command)
            .map_err(|e| ReplicatorError::runner_not_running(format!("{:?} not delivered", e.0)))
    }

    /// Get current runner status
    pub async fn status(&self) -> RunnerStatus {
        self.status.read().await.clone()
    }
}
