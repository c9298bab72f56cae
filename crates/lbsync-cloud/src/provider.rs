//! Remote service traits
//!
//! The remote cloud is consumed as three independent services. Mutating calls
//! on the load balancer service are asynchronous on the remote side: they
//! return a [`TaskId`] whose status has to be polled until it settles.

use crate::error::Result;
use crate::model::{
    ClusterRoute, HealthCheck, Instance, Listener, ListenerTargets, LoadBalancer,
    LoadBalancerKind, Tag, Target, TaskId, TaskStatus,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Compute service (instance lookups)
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Describe instances owning any of the given private IPs.
    ///
    /// Callers must not pass more values than the per-call filter limit.
    async fn describe_instances_by_private_ips(&self, ips: &[String]) -> Result<Vec<Instance>>;

    /// Describe instances by instance id
    async fn describe_instances_by_ids(&self, ids: &[String]) -> Result<Vec<Instance>>;
}

/// Load balancer service
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    /// Load balancers carrying the given tag
    async fn describe_load_balancers(&self, tag: &Tag) -> Result<Vec<LoadBalancer>>;

    async fn create_load_balancer(&self, request: &CreateLoadBalancer) -> Result<TaskId>;

    async fn delete_load_balancer(&self, load_balancer_id: &str) -> Result<TaskId>;

    async fn describe_listeners(&self, load_balancer_id: &str) -> Result<Vec<Listener>>;

    async fn create_listener(&self, request: &CreateListener) -> Result<TaskId>;

    async fn delete_listener(&self, load_balancer_id: &str, listener_id: &str) -> Result<TaskId>;

    /// Every listener of the load balancer with its registered targets
    async fn describe_targets(&self, load_balancer_id: &str) -> Result<Vec<ListenerTargets>>;

    async fn register_targets(
        &self,
        load_balancer_id: &str,
        listener_id: &str,
        targets: &[Target],
    ) -> Result<TaskId>;

    async fn deregister_targets(
        &self,
        load_balancer_id: &str,
        listener_id: &str,
        targets: &[Target],
    ) -> Result<TaskId>;

    async fn describe_task_status(&self, task_id: &TaskId) -> Result<TaskStatus>;
}

/// Cluster route table service
#[async_trait]
pub trait ClusterRouteApi: Send + Sync {
    async fn describe_cluster_routes(&self, route_table: &str) -> Result<Vec<ClusterRoute>>;

    async fn create_cluster_route(&self, route_table: &str, route: &ClusterRoute) -> Result<()>;

    async fn delete_cluster_route(&self, route_table: &str, route: &ClusterRoute) -> Result<()>;
}

/// Parameters for creating a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLoadBalancer {
    pub name: String,
    pub kind: LoadBalancerKind,
    pub vpc_id: String,
    /// Required for private load balancers
    pub subnet_id: Option<String>,
    pub tags: Vec<Tag>,
    /// Let traffic from the load balancer through without checking backend security groups
    pub pass_to_target: bool,
}

/// Parameters for creating a listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateListener {
    pub load_balancer_id: String,
    pub name: String,
    pub port: u16,
    pub protocol: String,
    pub health_check: HealthCheck,
}

/// Polling settings for remote asynchronous tasks
#[derive(Debug, Clone)]
pub struct TaskPollConfig {
    /// Maximum number of status queries per task
    pub max_attempts: u32,

    /// Delay between two status queries
    pub interval: Duration,
}

impl Default for TaskPollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
        }
    }
}

impl TaskPollConfig {
    /// Upper bound on how long a single task is waited for
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_budget_is_thirty_seconds() {
        let config = TaskPollConfig::default();
        assert_eq!(config.max_attempts, 30);
        assert_eq!(config.budget(), Duration::from_secs(30));
    }
}
