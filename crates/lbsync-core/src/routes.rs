//! Cluster route table

use crate::cloud::Cloud;
use crate::service::Route;
use lbsync_cloud::{ClusterRoute, Result};

impl Cloud {
    /// Routes of the configured table; name and target node are the gateway IP
    pub async fn list_routes(&self) -> Result<Vec<Route>> {
        let routes = self
            .routes
            .describe_cluster_routes(&self.config.route_table)
            .await?;

        Ok(routes
            .into_iter()
            .map(|r| Route {
                name: r.gateway_ip.clone(),
                target_node: r.gateway_ip,
                destination_cidr: r.destination_cidr,
            })
            .collect())
    }

    pub async fn create_route(&self, route: &Route) -> Result<()> {
        self.routes
            .create_cluster_route(&self.config.route_table, &cluster_route(route))
            .await
    }

    pub async fn delete_route(&self, route: &Route) -> Result<()> {
        self.routes
            .delete_cluster_route(&self.config.route_table, &cluster_route(route))
            .await
    }
}

fn cluster_route(route: &Route) -> ClusterRoute {
    ClusterRoute {
        gateway_ip: route.target_node.clone(),
        destination_cidr: route.destination_cidr.clone(),
    }
}
