//! Typed per-Service load balancer options
//!
//! Annotations are parsed once per pass. Absent keys take their defaults;
//! present keys must hold a recognized value.

use lbsync_cloud::{CloudError, HealthCheck, LoadBalancerKind, Result};
use std::collections::BTreeMap;
use std::str::FromStr;

const ANNOTATION_PREFIX: &str = "service.beta.kubernetes.io/tencentcloud-loadbalancer-";

pub const ANNOTATION_TYPE: &str = "service.beta.kubernetes.io/tencentcloud-loadbalancer-type";
pub const ANNOTATION_SUBNET_ID: &str =
    "service.beta.kubernetes.io/tencentcloud-loadbalancer-type-internal-subnet-id";
pub const ANNOTATION_NODE_LABEL_KEY: &str =
    "service.beta.kubernetes.io/tencentcloud-loadbalancer-node-label-key";
pub const ANNOTATION_NODE_LABEL_VALUE: &str =
    "service.beta.kubernetes.io/tencentcloud-loadbalancer-node-label-value";
pub const ANNOTATION_HEALTH_CHECK_SWITCH: &str =
    "service.beta.kubernetes.io/tencentcloud-loadbalancer-health-check-switch";
pub const ANNOTATION_HEALTH_CHECK_TIMEOUT: &str =
    "service.beta.kubernetes.io/tencentcloud-loadbalancer-health-check-timeout";
pub const ANNOTATION_HEALTH_CHECK_INTERVAL: &str =
    "service.beta.kubernetes.io/tencentcloud-loadbalancer-health-check-interval-time";
pub const ANNOTATION_HEALTH_CHECK_HEALTHY: &str =
    "service.beta.kubernetes.io/tencentcloud-loadbalancer-health-check-health-num";
pub const ANNOTATION_HEALTH_CHECK_UNHEALTHY: &str =
    "service.beta.kubernetes.io/tencentcloud-loadbalancer-health-check-un-health-num";

pub const DEFAULT_NODE_LABEL_KEY: &str = "kubernetes.io/role";
pub const DEFAULT_NODE_LABEL_VALUE: &str = "node";

/// Label a node must carry to become a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSelector {
    pub key: String,
    pub value: String,
}

impl Default for NodeSelector {
    fn default() -> Self {
        Self {
            key: DEFAULT_NODE_LABEL_KEY.to_string(),
            value: DEFAULT_NODE_LABEL_VALUE.to_string(),
        }
    }
}

impl std::fmt::Display for NodeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerOptions {
    pub visibility: LoadBalancerKind,
    /// Required when `visibility` is private
    pub subnet_id: Option<String>,
    pub node_selector: NodeSelector,
    pub health_check: HealthCheck,
}

impl Default for LoadBalancerOptions {
    fn default() -> Self {
        Self {
            visibility: LoadBalancerKind::Private,
            subnet_id: None,
            node_selector: NodeSelector::default(),
            health_check: HealthCheck::default(),
        }
    }
}

impl LoadBalancerOptions {
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(value) = annotations.get(ANNOTATION_TYPE) {
            options.visibility = match value.trim() {
                "public" => LoadBalancerKind::Public,
                "private" => LoadBalancerKind::Private,
                other => {
                    return Err(CloudError::validation(format!(
                        "{ANNOTATION_TYPE} must be \"public\" or \"private\", got {other:?}"
                    )));
                }
            };
        }

        options.subnet_id = annotations
            .get(ANNOTATION_SUBNET_ID)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if let Some(key) = annotations.get(ANNOTATION_NODE_LABEL_KEY) {
            options.node_selector.key = key.clone();
        }
        if let Some(value) = annotations.get(ANNOTATION_NODE_LABEL_VALUE) {
            options.node_selector.value = value.clone();
        }

        let health = &mut options.health_check;
        if let Some(switch) = parse::<u8>(annotations, ANNOTATION_HEALTH_CHECK_SWITCH)? {
            health.enabled = switch != 0;
        }
        if let Some(v) = parse(annotations, ANNOTATION_HEALTH_CHECK_TIMEOUT)? {
            health.timeout_secs = v;
        }
        if let Some(v) = parse(annotations, ANNOTATION_HEALTH_CHECK_INTERVAL)? {
            health.interval_secs = v;
        }
        if let Some(v) = parse(annotations, ANNOTATION_HEALTH_CHECK_HEALTHY)? {
            health.healthy_threshold = v;
        }
        if let Some(v) = parse(annotations, ANNOTATION_HEALTH_CHECK_UNHEALTHY)? {
            health.unhealthy_threshold = v;
        }

        for key in annotations.keys() {
            if key.starts_with(ANNOTATION_PREFIX) && !is_known(key) {
                tracing::debug!(annotation = %key, "ignoring unrecognized load balancer annotation");
            }
        }

        Ok(options)
    }

    /// Subnet of a private load balancer, or None for a public one
    pub fn required_subnet(&self) -> Result<Option<&str>> {
        match self.visibility {
            LoadBalancerKind::Public => Ok(None),
            LoadBalancerKind::Private => self
                .subnet_id
                .as_deref()
                .map(Some)
                .ok_or_else(|| {
                    CloudError::validation(format!(
                        "{ANNOTATION_SUBNET_ID} must be specified for a private load balancer"
                    ))
                }),
        }
    }
}

fn parse<T: FromStr>(annotations: &BTreeMap<String, String>, key: &str) -> Result<Option<T>> {
    match annotations.get(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            CloudError::validation(format!("{key} must be a non-negative integer, got {raw:?}"))
        }),
    }
}

fn is_known(key: &str) -> bool {
    [
        ANNOTATION_TYPE,
        ANNOTATION_SUBNET_ID,
        ANNOTATION_NODE_LABEL_KEY,
        ANNOTATION_NODE_LABEL_VALUE,
        ANNOTATION_HEALTH_CHECK_SWITCH,
        ANNOTATION_HEALTH_CHECK_TIMEOUT,
        ANNOTATION_HEALTH_CHECK_INTERVAL,
        ANNOTATION_HEALTH_CHECK_HEALTHY,
        ANNOTATION_HEALTH_CHECK_UNHEALTHY,
    ]
    .contains(&key)
}
