//! Node metadata backed by instance lookups

use crate::cloud::Cloud;
use crate::service::{NodeAddress, NodeAddressType};
use lbsync_cloud::{Instance, Result};

/// Private IPs as internal addresses, then public IPs as external ones
pub fn node_addresses(instance: &Instance) -> Vec<NodeAddress> {
    let internal = instance.private_ips.iter().map(|ip| NodeAddress {
        kind: NodeAddressType::InternalIP,
        address: ip.clone(),
    });
    let external = instance.public_ips.iter().map(|ip| NodeAddress {
        kind: NodeAddressType::ExternalIP,
        address: ip.clone(),
    });
    internal.chain(external).collect()
}

impl Cloud {
    /// Addresses of the node named by its private IP
    pub async fn node_addresses(&self, node_name: &str) -> Result<Vec<NodeAddress>> {
        let instance = self.instances.by_private_ip(node_name).await?;
        Ok(node_addresses(&instance))
    }

    pub async fn node_addresses_by_provider_id(&self, provider_id: &str) -> Result<Vec<NodeAddress>> {
        let instance = self.instances.by_provider_id(provider_id).await?;
        Ok(node_addresses(&instance))
    }

    /// `/<zone>/<instanceId>` of the node
    pub async fn instance_id(&self, node_name: &str) -> Result<String> {
        let instance = self.instances.by_private_ip(node_name).await?;
        Ok(format!("/{}/{}", instance.zone, instance.id))
    }

    pub async fn instance_type(&self, node_name: &str) -> Result<String> {
        let instance = self.instances.by_private_ip(node_name).await?;
        Ok(instance.instance_type.clone())
    }

    pub async fn instance_type_by_provider_id(&self, provider_id: &str) -> Result<String> {
        let instance = self.instances.by_provider_id(provider_id).await?;
        Ok(instance.instance_type.clone())
    }

    /// False only when the instance is known to be gone
    pub async fn instance_exists_by_provider_id(&self, provider_id: &str) -> Result<bool> {
        match self.instances.by_provider_id(provider_id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => {
                tracing::info!(provider_id, "instance no longer exists");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// True when the instance is not running
    pub async fn instance_shutdown_by_provider_id(&self, provider_id: &str) -> Result<bool> {
        let instance = self.instances.by_provider_id(provider_id).await?;
        Ok(!instance.is_running())
    }
}
