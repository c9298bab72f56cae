//! Snapshots of remote resources
//!
//! Every value here is an immutable view of the remote system as of the call
//! that produced it. Nothing is merged across calls.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power state reported for an instance that is up
pub const INSTANCE_STATE_RUNNING: &str = "RUNNING";

/// Compute instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub vpc_id: String,
    pub zone: String,
    pub instance_type: String,
    pub private_ips: Vec<String>,
    pub public_ips: Vec<String>,
    /// Power state, e.g. `RUNNING`, `STOPPED`
    pub state: String,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.state == INSTANCE_STATE_RUNNING
    }

    pub fn has_private_ip(&self, ip: &str) -> bool {
        self.private_ips.iter().any(|p| p == ip)
    }
}

/// Network visibility of a load balancer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadBalancerKind {
    /// Internet facing
    #[serde(rename = "OPEN")]
    Public,
    /// VPC internal, bound to a subnet
    #[serde(rename = "INTERNAL")]
    Private,
}

impl LoadBalancerKind {
    /// Wire value used by the load balancer API
    pub fn as_api_str(&self) -> &'static str {
        match self {
            LoadBalancerKind::Public => "OPEN",
            LoadBalancerKind::Private => "INTERNAL",
        }
    }

    pub fn from_api_str(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(LoadBalancerKind::Public),
            "INTERNAL" => Some(LoadBalancerKind::Private),
            _ => None,
        }
    }
}

impl fmt::Display for LoadBalancerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadBalancerKind::Public => write!(f, "public"),
            LoadBalancerKind::Private => write!(f, "private"),
        }
    }
}

/// Resource tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    pub kind: LoadBalancerKind,
    pub vpc_id: String,
    /// Only set for private load balancers
    pub subnet_id: Option<String>,
    pub vips: Vec<String>,
    pub tags: Vec<Tag>,
}

impl LoadBalancer {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }
}

/// Natural key of a listener within one load balancer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerKey {
    pub port: u16,
    /// Upper-case protocol name (`TCP`, `UDP`, ...)
    pub protocol: String,
}

impl ListenerKey {
    pub fn new(port: u16, protocol: impl AsRef<str>) -> Self {
        Self {
            port,
            protocol: protocol.as_ref().to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Listener attached to a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub id: String,
    pub name: Option<String>,
    pub port: u16,
    pub protocol: String,
}

impl Listener {
    pub fn key(&self) -> ListenerKey {
        ListenerKey::new(self.port, &self.protocol)
    }
}

/// Backend registered under a listener
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    pub instance_id: String,
    pub port: u16,
}

impl Target {
    pub fn new(instance_id: impl Into<String>, port: u16) -> Self {
        Self {
            instance_id: instance_id.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.instance_id, self.port)
    }
}

/// A listener together with its currently registered targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerTargets {
    pub listener: Listener,
    pub targets: Vec<Target>,
}

/// Listener health check parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub enabled: bool,
    pub timeout_secs: u32,
    pub interval_secs: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 2,
            interval_secs: 5,
            healthy_threshold: 3,
            unhealthy_threshold: 3,
        }
    }
}

/// Handle of a remote asynchronous operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a remote asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed,
    Running,
    /// Any code outside the documented set
    Unexpected(i64),
}

impl TaskStatus {
    /// Map the API status code (0 success, 1 failure, 2 in progress)
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => TaskStatus::Succeeded,
            1 => TaskStatus::Failed,
            2 => TaskStatus::Running,
            other => TaskStatus::Unexpected(other),
        }
    }
}

/// Route in the cluster route table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterRoute {
    /// Node private IP that traffic for the CIDR is sent to
    pub gateway_ip: String,
    pub destination_cidr: String,
}
