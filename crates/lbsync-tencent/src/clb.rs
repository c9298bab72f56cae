//! CLB load balancers, listeners and targets
//!
//! Every mutating call is asynchronous on the remote side. Its request id is
//! the handle passed to `DescribeTaskStatus`.

use crate::client::CLB;
use crate::error::TencentError;
use crate::{Filter, PAGE_LIMIT, RequestIdOnly, TencentCloud};
use async_trait::async_trait;
use lbsync_cloud::{
    CloudError, CreateListener, CreateLoadBalancer, Listener, ListenerTargets, LoadBalancer,
    LoadBalancerApi, LoadBalancerKind, Tag, Target, TaskId, TaskStatus,
};
use serde::{Deserialize, Serialize};

/// Health check source IP type: checks originate from 100.64.0.0/10
const HEALTH_CHECK_SOURCE_IP_TYPE: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiTag {
    tag_key: String,
    tag_value: String,
}

impl From<&Tag> for ApiTag {
    fn from(tag: &Tag) -> Self {
        Self {
            tag_key: tag.key.clone(),
            tag_value: tag.value.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeLoadBalancersRequest<'a> {
    filters: Vec<Filter<'a>>,
    offset: u32,
    limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeLoadBalancersResponse {
    #[serde(default)]
    total_count: u32,
    #[serde(default)]
    load_balancer_set: Vec<ApiLoadBalancer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiLoadBalancer {
    load_balancer_id: String,
    #[serde(default)]
    load_balancer_name: String,
    load_balancer_type: String,
    #[serde(default)]
    vpc_id: String,
    #[serde(default)]
    subnet_id: Option<String>,
    #[serde(default)]
    load_balancer_vips: Option<Vec<String>>,
    #[serde(default)]
    tags: Option<Vec<ApiTag>>,
}

impl TryFrom<ApiLoadBalancer> for LoadBalancer {
    type Error = TencentError;

    fn try_from(api: ApiLoadBalancer) -> crate::Result<Self> {
        let kind = LoadBalancerKind::from_api_str(&api.load_balancer_type).ok_or_else(|| {
            TencentError::InvalidResponse(format!(
                "unknown load balancer type {} on {}",
                api.load_balancer_type, api.load_balancer_id
            ))
        })?;

        Ok(LoadBalancer {
            id: api.load_balancer_id,
            name: api.load_balancer_name,
            kind,
            vpc_id: api.vpc_id,
            subnet_id: api.subnet_id.filter(|s| !s.is_empty()),
            vips: api.load_balancer_vips.unwrap_or_default(),
            tags: api
                .tags
                .unwrap_or_default()
                .into_iter()
                .map(|t| Tag::new(t.tag_key, t.tag_value))
                .collect(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateLoadBalancerRequest<'a> {
    load_balancer_type: &'static str,
    /// 1 = application load balancer
    forward: u8,
    load_balancer_name: &'a str,
    vpc_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subnet_id: Option<&'a str>,
    tags: Vec<ApiTag>,
    load_balancer_pass_to_target: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteLoadBalancerRequest<'a> {
    load_balancer_ids: [&'a str; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerIdRequest<'a> {
    load_balancer_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiListener {
    listener_id: String,
    #[serde(default)]
    listener_name: Option<String>,
    port: u16,
    protocol: String,
}

impl From<ApiListener> for Listener {
    fn from(api: ApiListener) -> Self {
        Listener {
            id: api.listener_id,
            name: api.listener_name.filter(|n| !n.is_empty()),
            port: api.port,
            protocol: api.protocol.to_ascii_uppercase(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeListenersResponse {
    #[serde(default)]
    listeners: Option<Vec<ApiListener>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ApiHealthCheck {
    health_switch: u8,
    time_out: u32,
    interval_time: u32,
    health_num: u32,
    un_health_num: u32,
    source_ip_type: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateListenerRequest<'a> {
    load_balancer_id: &'a str,
    ports: [u16; 1],
    protocol: &'a str,
    listener_names: [&'a str; 1],
    health_check: ApiHealthCheck,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteListenerRequest<'a> {
    load_balancer_id: &'a str,
    listener_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeTargetsResponse {
    #[serde(default)]
    listeners: Option<Vec<ApiListenerBackend>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiListenerBackend {
    #[serde(flatten)]
    listener: ApiListener,
    #[serde(default)]
    targets: Option<Vec<ApiBackend>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiBackend {
    #[serde(default)]
    instance_id: Option<String>,
    port: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ApiTarget<'a> {
    instance_id: &'a str,
    port: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TargetsRequest<'a> {
    load_balancer_id: &'a str,
    listener_id: &'a str,
    targets: Vec<ApiTarget<'a>>,
}

impl<'a> TargetsRequest<'a> {
    fn new(load_balancer_id: &'a str, listener_id: &'a str, targets: &'a [Target]) -> Self {
        Self {
            load_balancer_id,
            listener_id,
            targets: targets
                .iter()
                .map(|t| ApiTarget {
                    instance_id: &t.instance_id,
                    port: t.port,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeTaskStatusRequest<'a> {
    task_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeTaskStatusResponse {
    status: i64,
}

/// Map a not-found reply on a call addressed by load balancer id
fn lb_error(load_balancer_id: &str, err: TencentError) -> CloudError {
    if err.is_not_found() {
        CloudError::LoadBalancerNotFound(load_balancer_id.to_string())
    } else {
        err.into()
    }
}

impl TencentCloud {
    async fn mutate<Req: Serialize>(&self, action: &str, request: &Req) -> crate::Result<TaskId> {
        let response: RequestIdOnly = self.client.call(CLB, action, request).await?;
        tracing::debug!(action, task_id = %response.request_id, "load balancer task submitted");
        Ok(TaskId::new(response.request_id))
    }
}

#[async_trait]
impl LoadBalancerApi for TencentCloud {
    async fn describe_load_balancers(&self, tag: &Tag) -> lbsync_cloud::Result<Vec<LoadBalancer>> {
        let values = [tag.value.clone()];
        let mut request = DescribeLoadBalancersRequest {
            filters: vec![Filter::new(format!("tag:{}", tag.key), &values)],
            offset: 0,
            limit: PAGE_LIMIT,
        };

        let mut load_balancers = Vec::new();
        loop {
            let page: DescribeLoadBalancersResponse = self
                .client
                .call(CLB, "DescribeLoadBalancers", &request)
                .await?;
            let fetched = page.load_balancer_set.len() as u32;
            for api in page.load_balancer_set {
                load_balancers.push(LoadBalancer::try_from(api)?);
            }

            request.offset += fetched;
            if fetched == 0 || request.offset >= page.total_count {
                break;
            }
        }

        Ok(load_balancers)
    }

    async fn create_load_balancer(
        &self,
        request: &CreateLoadBalancer,
    ) -> lbsync_cloud::Result<TaskId> {
        let body = CreateLoadBalancerRequest {
            load_balancer_type: request.kind.as_api_str(),
            forward: 1,
            load_balancer_name: &request.name,
            vpc_id: &request.vpc_id,
            subnet_id: request.subnet_id.as_deref(),
            tags: request.tags.iter().map(ApiTag::from).collect(),
            load_balancer_pass_to_target: request.pass_to_target,
        };
        Ok(self.mutate("CreateLoadBalancer", &body).await?)
    }

    async fn delete_load_balancer(&self, load_balancer_id: &str) -> lbsync_cloud::Result<TaskId> {
        let body = DeleteLoadBalancerRequest {
            load_balancer_ids: [load_balancer_id],
        };
        self.mutate("DeleteLoadBalancer", &body)
            .await
            .map_err(|e| lb_error(load_balancer_id, e))
    }

    async fn describe_listeners(&self, load_balancer_id: &str) -> lbsync_cloud::Result<Vec<Listener>> {
        let response: DescribeListenersResponse = self
            .client
            .call(CLB, "DescribeListeners", &LoadBalancerIdRequest { load_balancer_id })
            .await
            .map_err(|e| lb_error(load_balancer_id, e))?;

        Ok(response
            .listeners
            .unwrap_or_default()
            .into_iter()
            .map(Listener::from)
            .collect())
    }

    async fn create_listener(&self, request: &CreateListener) -> lbsync_cloud::Result<TaskId> {
        let health = &request.health_check;
        let body = CreateListenerRequest {
            load_balancer_id: &request.load_balancer_id,
            ports: [request.port],
            protocol: &request.protocol,
            listener_names: [request.name.as_str()],
            health_check: ApiHealthCheck {
                health_switch: u8::from(health.enabled),
                time_out: health.timeout_secs,
                interval_time: health.interval_secs,
                health_num: health.healthy_threshold,
                un_health_num: health.unhealthy_threshold,
                source_ip_type: HEALTH_CHECK_SOURCE_IP_TYPE,
            },
        };
        self.mutate("CreateListener", &body)
            .await
            .map_err(|e| lb_error(&request.load_balancer_id, e))
    }

    async fn delete_listener(
        &self,
        load_balancer_id: &str,
        listener_id: &str,
    ) -> lbsync_cloud::Result<TaskId> {
        let body = DeleteListenerRequest {
            load_balancer_id,
            listener_id,
        };
        self.mutate("DeleteListener", &body)
            .await
            .map_err(|e| lb_error(load_balancer_id, e))
    }

    async fn describe_targets(
        &self,
        load_balancer_id: &str,
    ) -> lbsync_cloud::Result<Vec<ListenerTargets>> {
        let response: DescribeTargetsResponse = self
            .client
            .call(CLB, "DescribeTargets", &LoadBalancerIdRequest { load_balancer_id })
            .await
            .map_err(|e| lb_error(load_balancer_id, e))?;

        Ok(response
            .listeners
            .unwrap_or_default()
            .into_iter()
            .map(|backend| ListenerTargets {
                listener: backend.listener.into(),
                targets: backend
                    .targets
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|b| b.instance_id.map(|id| Target::new(id, b.port)))
                    .collect(),
            })
            .collect())
    }

    async fn register_targets(
        &self,
        load_balancer_id: &str,
        listener_id: &str,
        targets: &[Target],
    ) -> lbsync_cloud::Result<TaskId> {
        let body = TargetsRequest::new(load_balancer_id, listener_id, targets);
        self.mutate("RegisterTargets", &body)
            .await
            .map_err(|e| lb_error(load_balancer_id, e))
    }

    async fn deregister_targets(
        &self,
        load_balancer_id: &str,
        listener_id: &str,
        targets: &[Target],
    ) -> lbsync_cloud::Result<TaskId> {
        let body = TargetsRequest::new(load_balancer_id, listener_id, targets);
        self.mutate("DeregisterTargets", &body)
            .await
            .map_err(|e| lb_error(load_balancer_id, e))
    }

    async fn describe_task_status(&self, task_id: &TaskId) -> lbsync_cloud::Result<TaskStatus> {
        let response: DescribeTaskStatusResponse = self
            .client
            .call(
                CLB,
                "DescribeTaskStatus",
                &DescribeTaskStatusRequest {
                    task_id: task_id.as_str(),
                },
            )
            .await?;
        Ok(TaskStatus::from_code(response.status))
    }
}
