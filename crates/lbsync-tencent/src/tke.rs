//! TKE cluster route table

use crate::client::TKE;
use crate::{PAGE_LIMIT, RequestIdOnly, TencentCloud};
use async_trait::async_trait;
use lbsync_cloud::{ClusterRoute, ClusterRouteApi};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeClusterRoutesRequest<'a> {
    route_table_name: &'a str,
    offset: u32,
    limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeClusterRoutesResponse {
    #[serde(default)]
    total_count: u32,
    #[serde(default)]
    route_set: Vec<ApiRoute>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiRoute {
    route_table_name: String,
    destination_cidr_block: String,
    gateway_ip: String,
}

impl ApiRoute {
    fn new(route_table: &str, route: &ClusterRoute) -> Self {
        Self {
            route_table_name: route_table.to_string(),
            destination_cidr_block: route.destination_cidr.clone(),
            gateway_ip: route.gateway_ip.clone(),
        }
    }
}

#[async_trait]
impl ClusterRouteApi for TencentCloud {
    async fn describe_cluster_routes(
        &self,
        route_table: &str,
    ) -> lbsync_cloud::Result<Vec<ClusterRoute>> {
        let mut request = DescribeClusterRoutesRequest {
            route_table_name: route_table,
            offset: 0,
            limit: PAGE_LIMIT,
        };

        let mut routes = Vec::new();
        loop {
            let page: DescribeClusterRoutesResponse = self
                .client
                .call(TKE, "DescribeClusterRoutes", &request)
                .await?;
            let fetched = page.route_set.len() as u32;
            routes.extend(page.route_set.into_iter().map(|r| ClusterRoute {
                gateway_ip: r.gateway_ip,
                destination_cidr: r.destination_cidr_block,
            }));

            request.offset += fetched;
            if fetched == 0 || request.offset >= page.total_count {
                break;
            }
        }

        Ok(routes)
    }

    async fn create_cluster_route(
        &self,
        route_table: &str,
        route: &ClusterRoute,
    ) -> lbsync_cloud::Result<()> {
        let _: RequestIdOnly = self
            .client
            .call(TKE, "CreateClusterRoute", &ApiRoute::new(route_table, route))
            .await?;
        tracing::info!(
            route_table,
            cidr = %route.destination_cidr,
            gateway = %route.gateway_ip,
            "cluster route created"
        );
        Ok(())
    }

    async fn delete_cluster_route(
        &self,
        route_table: &str,
        route: &ClusterRoute,
    ) -> lbsync_cloud::Result<()> {
        let _: RequestIdOnly = self
            .client
            .call(TKE, "DeleteClusterRoute", &ApiRoute::new(route_table, route))
            .await?;
        tracing::info!(
            route_table,
            cidr = %route.destination_cidr,
            gateway = %route.gateway_ip,
            "cluster route deleted"
        );
        Ok(())
    }
}
