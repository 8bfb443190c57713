// src/error.rs

/// Result type used throughout the replicator library
pub type ReplicatorResult<T> = Result<T, ReplicatorError>;

/// All possible errors that can occur in the replicator library
#[derive(thiserror::Error, Debug)]
pub enum ReplicatorError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A call into the orchestrator, discovery store or cloud API failed
    #[error("Collaborator call '{operation}' failed: {message}")]
    Collaborator { operation: String, message: String },

    /// A command was sent to a runner that has already stopped
    #[error("Replicator runner is not running: {message}")]
    RunnerNotRunning { message: String },

    /// A spawned scaling pass panicked or was cancelled
    #[error("Scaling task failed: {message}")]
    TaskFailed { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Helper methods for creating common errors
impl ReplicatorError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn collaborator<O: Into<String>, M: Into<String>>(operation: O, message: M) -> Self {
        Self::Collaborator {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn runner_not_running<S: Into<String>>(message: S) -> Self {
        Self::RunnerNotRunning {
            message: message.into(),
        }
    }
}

/// Convert from a failed cluster scaling task
impl From<tokio::task::JoinError> for ReplicatorError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::TaskFailed {
            message: error.to_string(),
        }
    }
}
