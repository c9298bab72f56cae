//! Desired state handed in by the control loop

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Session affinity value that the engine accepts
pub const SESSION_AFFINITY_NONE: &str = "None";

/// A network-exposed workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub namespace: String,
    pub name: String,
    /// Stable unique id, carried by the ownership tag
    pub uid: String,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default = "default_session_affinity")]
    pub session_affinity: String,
}

fn default_session_affinity() -> String {
    SESSION_AFFINITY_NONE.to_string()
}

impl Service {
    pub fn has_session_affinity(&self) -> bool {
        self.session_affinity != SESSION_AFFINITY_NONE
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    #[serde(default)]
    pub name: String,
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub node_port: u16,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

/// A candidate backend host; its name is its private IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Node {
    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.get(key).is_some_and(|v| v == value)
    }
}

/// Externally reachable addresses of a load balancer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerStatus {
    pub ingress: Vec<LoadBalancerIngress>,
}

impl LoadBalancerStatus {
    pub fn from_vips(vips: &[String]) -> Self {
        Self {
            ingress: vips
                .iter()
                .map(|ip| LoadBalancerIngress { ip: ip.clone() })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerIngress {
    pub ip: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeAddressType {
    InternalIP,
    ExternalIP,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    #[serde(rename = "type")]
    pub kind: NodeAddressType,
    pub address: String,
}

/// Route of the cluster route table as seen by the control loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    /// Node name, i.e. the node's private IP
    pub target_node: String,
    pub destination_cidr: String,
}
