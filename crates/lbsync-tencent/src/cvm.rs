//! CVM instance lookups

use crate::client::CVM;
use crate::{Filter, PAGE_LIMIT, TencentCloud};
use async_trait::async_trait;
use lbsync_cloud::{ComputeApi, Instance};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesRequest<'a> {
    filters: Vec<Filter<'a>>,
    offset: u32,
    limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    #[serde(default)]
    total_count: u32,
    #[serde(default)]
    instance_set: Vec<ApiInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiInstance {
    instance_id: String,
    #[serde(default)]
    instance_type: String,
    #[serde(default)]
    instance_state: String,
    placement: ApiPlacement,
    virtual_private_cloud: ApiVpc,
    #[serde(default)]
    private_ip_addresses: Option<Vec<String>>,
    #[serde(default)]
    public_ip_addresses: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiPlacement {
    #[serde(default)]
    zone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiVpc {
    #[serde(default)]
    vpc_id: String,
}

impl From<ApiInstance> for Instance {
    fn from(api: ApiInstance) -> Self {
        Instance {
            id: api.instance_id,
            vpc_id: api.virtual_private_cloud.vpc_id,
            zone: api.placement.zone,
            instance_type: api.instance_type,
            private_ips: api.private_ip_addresses.unwrap_or_default(),
            public_ips: api.public_ip_addresses.unwrap_or_default(),
            state: api.instance_state,
        }
    }
}

impl TencentCloud {
    async fn describe_instances(&self, filter: Filter<'_>) -> crate::Result<Vec<Instance>> {
        let mut instances = Vec::new();
        let mut request = DescribeInstancesRequest {
            filters: vec![filter],
            offset: 0,
            limit: PAGE_LIMIT,
        };

        loop {
            let page: DescribeInstancesResponse = self
                .client
                .call(CVM, "DescribeInstances", &request)
                .await?;
            let fetched = page.instance_set.len() as u32;
            instances.extend(page.instance_set.into_iter().map(Instance::from));

            request.offset += fetched;
            if fetched == 0 || request.offset >= page.total_count {
                break;
            }
        }

        Ok(instances)
    }
}

#[async_trait]
impl ComputeApi for TencentCloud {
    async fn describe_instances_by_private_ips(
        &self,
        ips: &[String],
    ) -> lbsync_cloud::Result<Vec<Instance>> {
        if ips.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .describe_instances(Filter::new("private-ip-address", ips))
            .await?)
    }

    async fn describe_instances_by_ids(&self, ids: &[String]) -> lbsync_cloud::Result<Vec<Instance>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.describe_instances(Filter::new("instance-id", ids)).await {
            Ok(instances) => Ok(instances),
            Err(e) if e.is_not_found() => {
                tracing::debug!(?ids, error = %e, "instances not found");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}
