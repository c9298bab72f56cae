//! Completion tracking for remote asynchronous tasks
//!
//! A task that reports failure is logged and counted as settled; the next
//! reconciliation pass repairs whatever it left behind. Timeouts and status
//! codes outside the documented set are hard errors.

use futures_util::future::join_all;
use lbsync_cloud::{CloudError, LoadBalancerApi, Result, TaskId, TaskPollConfig, TaskStatus};
use std::sync::Arc;
use tokio::time::sleep;

/// How a task settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed,
}

#[derive(Clone)]
pub struct TaskTracker {
    api: Arc<dyn LoadBalancerApi>,
    config: TaskPollConfig,
}

impl TaskTracker {
    pub fn new(api: Arc<dyn LoadBalancerApi>, config: TaskPollConfig) -> Self {
        Self { api, config }
    }

    /// Poll one task until it settles or the attempt budget runs out
    pub async fn await_one(&self, task_id: &TaskId) -> Result<TaskOutcome> {
        for attempt in 1..=self.config.max_attempts {
            match self.api.describe_task_status(task_id).await? {
                TaskStatus::Succeeded => {
                    tracing::debug!(%task_id, attempt, "task succeeded");
                    return Ok(TaskOutcome::Succeeded);
                }
                TaskStatus::Failed => {
                    tracing::warn!(%task_id, attempt, "remote task failed");
                    return Ok(TaskOutcome::Failed);
                }
                TaskStatus::Running => {
                    tracing::debug!(%task_id, attempt, "task still running");
                }
                TaskStatus::Unexpected(status) => {
                    tracing::warn!(%task_id, status, "task returned an unexpected status");
                    return Err(CloudError::UnexpectedTaskStatus {
                        task_id: task_id.to_string(),
                        status,
                    });
                }
            }

            if attempt < self.config.max_attempts {
                sleep(self.config.interval).await;
            }
        }

        tracing::warn!(%task_id, attempts = self.config.max_attempts, "task timed out");
        Err(CloudError::TaskTimeout {
            task_id: task_id.to_string(),
            attempts: self.config.max_attempts,
        })
    }

    /// Poll every task concurrently and wait for all of them
    ///
    /// Returns the first error in submission order, but only after every task
    /// has settled.
    pub async fn await_all(&self, task_ids: &[TaskId]) -> Result<()> {
        if task_ids.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = task_ids.len(), "waiting for tasks");
        let results = join_all(task_ids.iter().map(|id| self.await_one(id))).await;

        let failed = results
            .iter()
            .filter(|r| matches!(r, Ok(TaskOutcome::Failed)))
            .count();
        if failed > 0 {
            tracing::warn!(failed, total = task_ids.len(), "some remote tasks failed");
        }

        results.into_iter().find_map(Result::err).map_or(Ok(()), Err)
    }
}
