//! Job scaling policy records and convenience builders
//!
//! Policies are fetched fresh from the discovery store on every job scaling
//! pass. The orchestrator annotates each group's `scale_direction` during bulk
//! evaluation; the job scaling engine only reads it.

use serde::{Deserialize, Serialize};

use crate::error::ReplicatorResult;
use crate::types::ScalingDirection;

/// Scaling policy for a single task group within a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupScalingPolicy {
    /// Name of the group inside the job definition
    pub group_name: String,
    /// Lower bound on the group's count
    #[serde(default)]
    pub min: u32,
    /// Upper bound on the group's count
    #[serde(default)]
    pub max: u32,
    /// Add one allocation when CPU utilization (percent) exceeds this
    #[serde(default)]
    pub scale_out_cpu: f64,
    /// Remove one allocation when CPU utilization (percent) falls below this
    #[serde(default)]
    pub scale_in_cpu: f64,
    /// Add one allocation when memory utilization (percent) exceeds this
    #[serde(default)]
    pub scale_out_mem: f64,
    /// Remove one allocation when memory utilization (percent) falls below this
    #[serde(default)]
    pub scale_in_mem: f64,
    /// Set by the orchestrator's bulk evaluation
    #[serde(default)]
    pub scale_direction: ScalingDirection,
}

impl GroupScalingPolicy {
    pub fn new(group_name: &str, min: u32, max: u32) -> Self {
        Self {
            group_name: group_name.to_string(),
            min,
            max,
            scale_out_cpu: 80.0,
            scale_in_cpu: 30.0,
            scale_out_mem: 80.0,
            scale_in_mem: 30.0,
            scale_direction: ScalingDirection::None,
        }
    }

    pub fn with_direction(mut self, direction: ScalingDirection) -> Self {
        self.scale_direction = direction;
        self
    }

    /// Whether the orchestrator asked for this group to change size
    pub fn requires_scaling(&self) -> bool {
        matches!(
            self.scale_direction,
            ScalingDirection::Out | ScalingDirection::In
        )
    }
}

/// A job carrying a scaling policy, as stored in the discovery store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobScalingPolicy {
    pub job_name: String,
    /// Per-job switch; combined with the global job scaling flag
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, rename = "groups")]
    pub group_scaling_policies: Vec<GroupScalingPolicy>,
}

fn default_enabled() -> bool {
    true
}

impl JobScalingPolicy {
    pub fn new(job_name: &str, enabled: bool) -> Self {
        Self {
            job_name: job_name.to_string(),
            enabled,
            group_scaling_policies: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: GroupScalingPolicy) -> Self {
        self.group_scaling_policies.push(group);
        self
    }
}

/// Decode a policy document read from the discovery store
///
/// Documents do not repeat the job name; it comes from the key they are stored
/// under, so it overrides anything present in the body.
pub fn parse_policy_document(job_name: &str, document: &str) -> ReplicatorResult<JobScalingPolicy> {
    #[derive(Deserialize)]
    struct Document {
        #[serde(default = "default_enabled")]
        enabled: bool,
        #[serde(default)]
        groups: Vec<GroupScalingPolicy>,
    }

    let doc: Document = serde_json::from_str(document)?;
    Ok(JobScalingPolicy {
        job_name: job_name.to_string(),
        enabled: doc.enabled,
        group_scaling_policies: doc.groups,
    })
}

/// A group the orchestrator wants scaled out
pub fn scale_out_group(group_name: &str) -> GroupScalingPolicy {
    GroupScalingPolicy::new(group_name, 1, 10).with_direction(ScalingDirection::Out)
}

/// A group the orchestrator wants scaled in
pub fn scale_in_group(group_name: &str) -> GroupScalingPolicy {
    GroupScalingPolicy::new(group_name, 1, 10).with_direction(ScalingDirection::In)
}

/// A group that needs no change
pub fn steady_group(group_name: &str) -> GroupScalingPolicy {
    GroupScalingPolicy::new(group_name, 1, 10)
}
