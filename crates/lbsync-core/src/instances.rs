//! Compute instance lookups scoped to the cluster VPC

use crate::cache::{self, CacheValue, TtlCache};
use lbsync_cloud::{CloudError, ComputeApi, Instance, Result};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Split `<provider>://<zone>/<instanceId>` into zone and instance id
///
/// Leading slashes after the scheme are ignored, so `tencentcloud:///zone/id`
/// is accepted as well.
pub fn parse_provider_id(provider_id: &str) -> Result<(&str, &str)> {
    let invalid = || CloudError::InvalidProviderId(provider_id.to_string());

    let (_, path) = provider_id.split_once("://").ok_or_else(invalid)?;
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(zone), Some(id), None) if !zone.is_empty() && !id.is_empty() => Ok((zone, id)),
        _ => Err(invalid()),
    }
}

/// Cache-first instance resolver
///
/// Instances outside the configured VPC are dropped from every result.
#[derive(Clone)]
pub struct InstanceResolver {
    compute: Arc<dyn ComputeApi>,
    cache: Arc<TtlCache<CacheValue>>,
    vpc_id: String,
    chunk_size: usize,
}

impl InstanceResolver {
    pub fn new(
        compute: Arc<dyn ComputeApi>,
        cache: Arc<TtlCache<CacheValue>>,
        vpc_id: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            compute,
            cache,
            vpc_id: vpc_id.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub async fn by_private_ip(&self, ip: &str) -> Result<Arc<Instance>> {
        if let Some(instance) = self.cached(&cache::instance_ip_key(ip)) {
            return Ok(instance);
        }

        self.by_private_ips(&[ip.to_string()])
            .await?
            .into_iter()
            .find(|instance| instance.has_private_ip(ip))
            .ok_or_else(|| CloudError::InstanceNotFound(ip.to_string()))
    }

    /// Resolve many private IPs, querying only the ones not cached
    ///
    /// Uncached IPs are sorted and sent in fixed-size chunks. The first failing
    /// chunk fails the whole call.
    pub async fn by_private_ips(&self, ips: &[String]) -> Result<Vec<Arc<Instance>>> {
        let mut instances = Vec::new();
        let mut seen = HashSet::new();
        let mut uncached = BTreeSet::new();

        for ip in ips {
            match self.cached(&cache::instance_ip_key(ip)) {
                Some(instance) => {
                    if seen.insert(instance.id.clone()) {
                        instances.push(instance);
                    }
                }
                None => {
                    uncached.insert(ip.clone());
                }
            }
        }

        tracing::debug!(
            cached = instances.len(),
            uncached = uncached.len(),
            "resolving instances by private ip"
        );

        let uncached: Vec<String> = uncached.into_iter().collect();
        for chunk in uncached.chunks(self.chunk_size) {
            let found = self.compute.describe_instances_by_private_ips(chunk).await?;

            for instance in found {
                if !self.in_vpc(&instance) {
                    continue;
                }
                let instance = Arc::new(instance);
                for ip in instance.private_ips.iter().filter(|ip| chunk.contains(ip)) {
                    self.cache.set(
                        cache::instance_ip_key(ip),
                        CacheValue::Instance(Arc::clone(&instance)),
                    );
                }
                if seen.insert(instance.id.clone()) {
                    instances.push(instance);
                }
            }
        }

        Ok(instances)
    }

    pub async fn by_instance_id(&self, instance_id: &str) -> Result<Arc<Instance>> {
        let key = cache::instance_id_key(instance_id);
        if let Some(instance) = self.cached(&key) {
            return Ok(instance);
        }

        let found = self
            .compute
            .describe_instances_by_ids(&[instance_id.to_string()])
            .await?;

        let instance = found
            .into_iter()
            .filter(|instance| self.in_vpc(instance))
            .find(|instance| instance.id == instance_id)
            .map(Arc::new)
            .ok_or_else(|| CloudError::InstanceNotFound(instance_id.to_string()))?;

        self.cache.set(key, CacheValue::Instance(Arc::clone(&instance)));
        Ok(instance)
    }

    pub async fn by_provider_id(&self, provider_id: &str) -> Result<Arc<Instance>> {
        let (_, instance_id) = parse_provider_id(provider_id)?;
        self.by_instance_id(instance_id).await
    }

    fn cached(&self, key: &str) -> Option<Arc<Instance>> {
        let hit = self.cache.get(key).and_then(CacheValue::into_instance);
        tracing::debug!(key, hit = hit.is_some(), "instance cache lookup");
        hit
    }

    fn in_vpc(&self, instance: &Instance) -> bool {
        if instance.vpc_id == self.vpc_id {
            return true;
        }
        tracing::warn!(
            instance_id = %instance.id,
            vpc_id = %instance.vpc_id,
            expected_vpc_id = %self.vpc_id,
            "dropping instance outside the cluster VPC"
        );
        false
    }
}
