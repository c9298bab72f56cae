//! Entry point used by the control loop

use crate::balancer::LoadBalancerResolver;
use crate::cache::{CacheValue, TtlCache};
use crate::instances::InstanceResolver;
use crate::reconciler::Reconciler;
use crate::service::{LoadBalancerStatus, Node, Service};
use crate::settings::EngineSettings;
use crate::tasks::TaskTracker;
use lbsync_cloud::{ClusterRouteApi, ComputeApi, LoadBalancerApi, Result};
use lbsync_config::CloudConfig;
use std::sync::Arc;

/// Load balancer, instance and route operations for one cluster
///
/// Cheap to share; independent Services may be reconciled concurrently
/// through the same value.
pub struct Cloud {
    pub(crate) config: Arc<CloudConfig>,
    pub(crate) instances: InstanceResolver,
    pub(crate) routes: Arc<dyn ClusterRouteApi>,
    reconciler: Reconciler,
    cache: Arc<TtlCache<CacheValue>>,
}

impl Cloud {
    /// Build from one backend serving all three remote services
    pub fn new<B>(config: Arc<CloudConfig>, backend: Arc<B>, settings: EngineSettings) -> Self
    where
        B: ComputeApi + LoadBalancerApi + ClusterRouteApi + 'static,
    {
        Self::with_services(
            config,
            backend.clone(),
            backend.clone(),
            backend,
            settings,
        )
    }

    pub fn with_services(
        config: Arc<CloudConfig>,
        compute: Arc<dyn ComputeApi>,
        load_balancers: Arc<dyn LoadBalancerApi>,
        routes: Arc<dyn ClusterRouteApi>,
        settings: EngineSettings,
    ) -> Self {
        let cache = Arc::new(TtlCache::new(settings.cache_ttl));
        let instances = InstanceResolver::new(
            compute,
            Arc::clone(&cache),
            &config.vpc_id,
            settings.instance_chunk_size,
        );
        let balancers =
            LoadBalancerResolver::new(load_balancers.clone(), Arc::clone(&cache), &config.tag_key);
        let tasks = TaskTracker::new(load_balancers.clone(), settings.task_poll.clone());
        let reconciler = Reconciler::new(
            Arc::clone(&config),
            load_balancers,
            instances.clone(),
            balancers,
            tasks,
            settings.target_batch_size,
        );

        Self {
            config,
            instances,
            routes,
            reconciler,
            cache,
        }
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    pub fn cache(&self) -> &TtlCache<CacheValue> {
        &self.cache
    }

    pub fn load_balancer_name(&self, service: &Service) -> String {
        self.reconciler.load_balancer_name(service)
    }

    pub async fn ensure_load_balancer(
        &self,
        service: &Service,
        nodes: &[Node],
    ) -> Result<LoadBalancerStatus> {
        self.reconciler.ensure(service, nodes).await
    }

    pub async fn update_load_balancer(&self, service: &Service, nodes: &[Node]) -> Result<()> {
        self.reconciler.update(service, nodes).await
    }

    pub async fn get_load_balancer(&self, service: &Service) -> Result<Option<LoadBalancerStatus>> {
        self.reconciler.get(service).await
    }

    pub async fn ensure_load_balancer_deleted(&self, service: &Service) -> Result<()> {
        self.reconciler.delete(service).await
    }
}
