//! Cloud error types

use thiserror::Error;

/// Errors surfaced by the remote cloud services and the reconciliation engine
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Load balancer not found: {0}")]
    LoadBalancerNotFound(String),

    #[error("API error [{code}]: {message} (request id: {request_id})")]
    Api {
        code: String,
        message: String,
        request_id: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid provider id: {0}")]
    InvalidProviderId(String),

    #[error("Task {task_id} did not finish after {attempts} attempts")]
    TaskTimeout { task_id: String, attempts: u32 },

    #[error("Task {task_id} returned an unexpected status: {status}")]
    UnexpectedTaskStatus { task_id: String, status: i64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether this error means the resource is absent.
    ///
    /// NotFound has control-flow meaning for callers (an absent node is gone,
    /// an absent load balancer gets created) and is never a failure by itself.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CloudError::InstanceNotFound(_) | CloudError::LoadBalancerNotFound(_)
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CloudError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
