//! Per-job scaling
//!
//! Each pass pulls the jobs carrying a scaling policy, lets the orchestrator
//! evaluate them as one batch, and submits every job that has at least one
//! group to change. Whole jobs are submitted, never single groups. This layer
//! has no retries, cooldowns or failure counters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::clients::ReplicatorClients;
use crate::policies::JobScalingPolicy;
use crate::types::ReplicatorConfig;

/// Summary of a job scaling pass that got past the leadership and fetch steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobScalingReport {
    pub jobs_evaluated: usize,
    /// Groups that required scaling and were allowed to
    pub eligible_groups: usize,
    /// Groups that required scaling but job or global scaling was disabled
    pub suppressed_groups: usize,
    /// Jobs submitted to the orchestrator
    pub submitted: Vec<String>,
    /// Jobs whose submission the orchestrator rejected
    pub failed_submissions: Vec<String>,
}

/// How a job scaling pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobScalingOutcome {
    NotLeader,
    PolicyFetchFailed,
    Completed(JobScalingReport),
}

/// Per-job policy evaluation and submission
pub struct JobScalingEngine {
    config: Arc<ReplicatorConfig>,
    clients: ReplicatorClients,
}

impl JobScalingEngine {
    pub fn new(config: Arc<ReplicatorConfig>, clients: ReplicatorClients) -> Self {
        Self { config, clients }
    }

    /// Run one complete job scaling cycle
    pub async fn run_pass(&self) -> JobScalingOutcome {
        let orchestrator = self.clients.orchestrator.as_ref();

        if !orchestrator.leader_check().await {
            debug!(
                "job scaling: not running on the known leader, \
                 no job scaling actions will be taken"
            );
            return JobScalingOutcome::NotLeader;
        }

        let mut policies = match self
            .clients
            .discovery
            .get_job_scaling_policies(&self.config, orchestrator)
            .await
        {
            Ok(policies) => policies,
            Err(e) => {
                error!(
                    "job scaling: failed to determine if any jobs have scaling policies enabled: {}",
                    e
                );
                return JobScalingOutcome::PolicyFetchFailed;
            }
        };

        orchestrator.evaluate_job_scaling(&mut policies).await;

        let mut report = JobScalingReport {
            jobs_evaluated: policies.len(),
            ..JobScalingReport::default()
        };

        for job in &policies {
            let eligible = self.count_eligible_groups(job, &mut report);
            if eligible == 0 {
                continue;
            }

            match orchestrator.job_scale(job).await {
                Ok(()) => {
                    info!(job = %job.job_name, groups = eligible, "job scaling: submitted job for scaling");
                    report.submitted.push(job.job_name.clone());
                }
                Err(e) => {
                    error!(job = %job.job_name, "job scaling: scaling submission failed: {}", e);
                    report.failed_submissions.push(job.job_name.clone());
                }
            }
        }

        JobScalingOutcome::Completed(report)
    }

    fn count_eligible_groups(&self, job: &JobScalingPolicy, report: &mut JobScalingReport) -> usize {
        let allowed = job.enabled && self.config.job_scaling.enabled;
        let mut eligible = 0;

        for group in job.group_scaling_policies.iter().filter(|g| g.requires_scaling()) {
            if allowed {
                debug!(
                    "job scaling: scaling for job \"{}\" is enabled; a scaling operation ({}) \
                     will be requested for group \"{}\"",
                    job.job_name, group.scale_direction, group.group_name
                );
                eligible += 1;
            } else {
                debug!(
                    "job scaling: job scaling has been disabled; a scaling operation ({}) \
                     would have been requested for \"{}\" and group \"{}\"",
                    group.scale_direction, job.job_name, group.group_name
                );
                report.suppressed_groups += 1;
            }
        }

        report.eligible_groups += eligible;
        eligible
    }
}
