//! Load balancer identity and lookups

use crate::cache::{self, CacheValue, TtlCache};
use crate::service::Service;
use lbsync_cloud::{CloudError, Listener, LoadBalancer, LoadBalancerApi, Result, Tag};
use std::sync::Arc;

/// Remote limit on load balancer names
const MAX_NAME_LEN: usize = 60;
const TRUNCATED_PREFIX_LEN: usize = 50;
const UID_SUFFIX_LEN: usize = 8;

/// `<prefix>_<namespace>_<name>`, shortened to fit the remote limit
///
/// A name over the limit keeps its first 50 characters and gets `_` plus the
/// first 8 characters of the Service uid appended.
pub fn load_balancer_name(prefix: &str, service: &Service) -> String {
    let name = format!("{prefix}_{}_{}", service.namespace, service.name);
    if name.chars().count() <= MAX_NAME_LEN {
        return name;
    }

    let head: String = name.chars().take(TRUNCATED_PREFIX_LEN).collect();
    let uid: String = service.uid.chars().take(UID_SUFFIX_LEN).collect();
    format!("{head}_{uid}")
}

/// Finds the load balancer owned by a Service and caches what it reads
#[derive(Clone)]
pub struct LoadBalancerResolver {
    api: Arc<dyn LoadBalancerApi>,
    cache: Arc<TtlCache<CacheValue>>,
    tag_key: String,
}

impl LoadBalancerResolver {
    pub fn new(
        api: Arc<dyn LoadBalancerApi>,
        cache: Arc<TtlCache<CacheValue>>,
        tag_key: impl Into<String>,
    ) -> Self {
        Self {
            api,
            cache,
            tag_key: tag_key.into(),
        }
    }

    pub fn ownership_tag(&self, service_uid: &str) -> Tag {
        Tag::new(&self.tag_key, service_uid)
    }

    /// Look up by ownership tag; `name` only keys the cache
    ///
    /// More than one match is reported as NotFound, never resolved by picking one.
    pub async fn find_by_name_and_owner(
        &self,
        name: &str,
        service_uid: &str,
    ) -> Result<Arc<LoadBalancer>> {
        let key = cache::load_balancer_key(name);
        if let Some(lb) = self.cache.get(&key).and_then(CacheValue::into_load_balancer) {
            tracing::debug!(name, load_balancer_id = %lb.id, "load balancer cache hit");
            return Ok(lb);
        }

        let mut found = self
            .api
            .describe_load_balancers(&self.ownership_tag(service_uid))
            .await?;

        match found.len() {
            1 => {
                let lb = Arc::new(found.remove(0));
                tracing::debug!(name, load_balancer_id = %lb.id, "load balancer found");
                self.cache.set(key, CacheValue::LoadBalancer(Arc::clone(&lb)));
                Ok(lb)
            }
            0 => {
                tracing::debug!(name, "no load balancer carries the ownership tag");
                Err(CloudError::LoadBalancerNotFound(name.to_string()))
            }
            count => {
                tracing::warn!(
                    name,
                    count,
                    tag_key = %self.tag_key,
                    service_uid,
                    "several load balancers carry the same ownership tag, treating as not found"
                );
                Err(CloudError::LoadBalancerNotFound(name.to_string()))
            }
        }
    }

    pub async fn listeners(&self, load_balancer_id: &str) -> Result<Arc<Vec<Listener>>> {
        let key = cache::listeners_key(load_balancer_id);
        if let Some(listeners) = self.cache.get(&key).and_then(CacheValue::into_listeners) {
            tracing::debug!(load_balancer_id, "listener cache hit");
            return Ok(listeners);
        }

        let listeners = Arc::new(self.api.describe_listeners(load_balancer_id).await?);
        self.cache
            .set(key, CacheValue::Listeners(Arc::clone(&listeners)));
        Ok(listeners)
    }

    pub fn forget_load_balancer(&self, name: &str) {
        let key = cache::load_balancer_key(name);
        if self.cache.delete(&key) {
            tracing::debug!(%key, "cache entry dropped");
        }
    }

    pub fn forget_listeners(&self, load_balancer_id: &str) {
        let key = cache::listeners_key(load_balancer_id);
        if self.cache.delete(&key) {
            tracing::debug!(%key, "cache entry dropped");
        }
    }
}
