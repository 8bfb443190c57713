//! Loading [`ReplicatorConfig`] from TOML
//!
//! ```toml
//! scaling_interval_seconds = 10
//! region = "us-east-1"
//!
//! [cluster_scaling]
//! enabled = true
//! autoscaling_group = "worker-pool"
//! cool_down_seconds = 600
//! retry_threshold = 3
//!
//! [job_scaling]
//! enabled = true
//! policy_key_location = "replicator/config/jobs"
//! ```
//!
//! Missing keys fall back to their defaults. The result is validated.

use std::path::Path;

use crate::error::{ReplicatorError, ReplicatorResult};
use crate::types::ReplicatorConfig;

impl ReplicatorConfig {
    pub fn from_toml_str(input: &str) -> ReplicatorResult<Self> {
        let config: ReplicatorConfig = toml::from_str(input)
            .map_err(|e| ReplicatorError::config(format!("invalid TOML configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ReplicatorResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
