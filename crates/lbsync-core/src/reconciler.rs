//! Three-phase load balancer convergence
//!
//! 1. instance: the Service owns exactly one load balancer of the right kind
//! 2. listeners: one listener per declared `(port, protocol)`
//! 3. backends: every selected node is a target of every listener
//!
//! Phases run in order and a failing phase ends the pass. Nothing is kept
//! between passes apart from the read cache, so a retried pass picks up
//! wherever the last one stopped.

use crate::balancer::{LoadBalancerResolver, load_balancer_name};
use crate::instances::InstanceResolver;
use crate::options::LoadBalancerOptions;
use crate::service::{LoadBalancerStatus, Node, Service};
use crate::tasks::TaskTracker;
use lbsync_cloud::{
    ActionType, CloudError, CreateListener, CreateLoadBalancer, Listener, ListenerKey,
    LoadBalancer, LoadBalancerApi, LoadBalancerKind, Plan, Result, Target, TaskId,
};
use lbsync_config::CloudConfig;
use std::collections::HashSet;
use std::sync::Arc;

pub struct Reconciler {
    config: Arc<CloudConfig>,
    api: Arc<dyn LoadBalancerApi>,
    instances: InstanceResolver,
    balancers: LoadBalancerResolver,
    tasks: TaskTracker,
    target_batch_size: usize,
}

impl Reconciler {
    pub fn new(
        config: Arc<CloudConfig>,
        api: Arc<dyn LoadBalancerApi>,
        instances: InstanceResolver,
        balancers: LoadBalancerResolver,
        tasks: TaskTracker,
        target_batch_size: usize,
    ) -> Self {
        Self {
            config,
            api,
            instances,
            balancers,
            tasks,
            target_batch_size: target_batch_size.max(1),
        }
    }

    pub fn load_balancer_name(&self, service: &Service) -> String {
        load_balancer_name(&self.config.name_prefix, service)
    }

    /// Run all three phases and report the resulting ingress addresses
    pub async fn ensure(&self, service: &Service, nodes: &[Node]) -> Result<LoadBalancerStatus> {
        if service.has_session_affinity() {
            tracing::warn!(
                service = %service,
                affinity = %service.session_affinity,
                "session affinity is not supported"
            );
            return Err(CloudError::validation(format!(
                "session affinity {} is not supported for {service}",
                service.session_affinity
            )));
        }

        let options = LoadBalancerOptions::from_annotations(&service.annotations)?;
        options.required_subnet()?;

        tracing::info!(service = %service, kind = %options.visibility, "ensuring load balancer");
        let lb = self.ensure_instance(service, &options).await?;
        self.ensure_listeners(service, &options, &lb).await?;
        self.ensure_backends(service, &options, &lb, nodes).await?;

        Ok(LoadBalancerStatus::from_vips(&lb.vips))
    }

    /// Re-run backend convergence only, for node set changes
    pub async fn update(&self, service: &Service, nodes: &[Node]) -> Result<()> {
        let options = LoadBalancerOptions::from_annotations(&service.annotations)?;
        let name = self.load_balancer_name(service);
        let lb = self
            .balancers
            .find_by_name_and_owner(&name, &service.uid)
            .await?;

        self.ensure_backends(service, &options, &lb, nodes).await
    }

    /// Status of the Service's load balancer, or None when it has none
    pub async fn get(&self, service: &Service) -> Result<Option<LoadBalancerStatus>> {
        let name = self.load_balancer_name(service);
        match self
            .balancers
            .find_by_name_and_owner(&name, &service.uid)
            .await
        {
            Ok(lb) => Ok(Some(LoadBalancerStatus::from_vips(&lb.vips))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete the Service's load balancer if there is one
    pub async fn delete(&self, service: &Service) -> Result<()> {
        let name = self.load_balancer_name(service);
        match self
            .balancers
            .find_by_name_and_owner(&name, &service.uid)
            .await
        {
            Ok(lb) => self.delete_load_balancer(&name, &lb).await,
            Err(e) if e.is_not_found() => {
                tracing::debug!(service = %service, "no load balancer to delete");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_instance(
        &self,
        service: &Service,
        options: &LoadBalancerOptions,
    ) -> Result<Arc<LoadBalancer>> {
        let name = self.load_balancer_name(service);

        match self
            .balancers
            .find_by_name_and_owner(&name, &service.uid)
            .await
        {
            Ok(lb) if self.matches(&lb, options) => return Ok(lb),
            Ok(lb) => {
                tracing::warn!(
                    service = %service,
                    load_balancer_id = %lb.id,
                    kind = %lb.kind,
                    vpc_id = %lb.vpc_id,
                    subnet_id = ?lb.subnet_id,
                    "load balancer drifted from the Service, recreating"
                );
                self.delete_load_balancer(&name, &lb).await?;
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.create_load_balancer(&name, service, options).await
    }

    fn matches(&self, lb: &LoadBalancer, options: &LoadBalancerOptions) -> bool {
        if lb.kind != options.visibility || lb.vpc_id != self.config.vpc_id {
            return false;
        }
        match options.visibility {
            LoadBalancerKind::Public => true,
            LoadBalancerKind::Private => lb.subnet_id.as_deref() == options.subnet_id.as_deref(),
        }
    }

    async fn create_load_balancer(
        &self,
        name: &str,
        service: &Service,
        options: &LoadBalancerOptions,
    ) -> Result<Arc<LoadBalancer>> {
        let request = CreateLoadBalancer {
            name: name.to_string(),
            kind: options.visibility,
            vpc_id: self.config.vpc_id.clone(),
            subnet_id: options.required_subnet()?.map(str::to_string),
            tags: vec![self.balancers.ownership_tag(&service.uid)],
            pass_to_target: true,
        };

        tracing::info!(service = %service, name, kind = %request.kind, "creating load balancer");
        let task = self.api.create_load_balancer(&request).await?;
        let outcome = self.tasks.await_one(&task).await;
        self.balancers.forget_load_balancer(name);
        outcome?;

        self.balancers
            .find_by_name_and_owner(name, &service.uid)
            .await
    }

    async fn delete_load_balancer(&self, name: &str, lb: &LoadBalancer) -> Result<()> {
        tracing::info!(name, load_balancer_id = %lb.id, "deleting load balancer");
        let outcome = match self.api.delete_load_balancer(&lb.id).await {
            Ok(task) => self.tasks.await_one(&task).await.map(|_| ()),
            Err(e) if e.is_not_found() => {
                tracing::info!(name, load_balancer_id = %lb.id, "load balancer already gone");
                Ok(())
            }
            Err(e) => Err(e),
        };
        self.balancers.forget_load_balancer(name);
        self.balancers.forget_listeners(&lb.id);
        outcome
    }

    /// Drop cached state of a load balancer the remote side no longer knows
    ///
    /// The error is still returned; the next pass looks the load balancer up
    /// again and recreates it.
    fn forget_if_gone<T>(
        &self,
        service: &Service,
        lb: &LoadBalancer,
        result: Result<T>,
    ) -> Result<T> {
        if matches!(&result, Err(e) if e.is_not_found()) {
            tracing::warn!(
                service = %service,
                load_balancer_id = %lb.id,
                "cached load balancer no longer exists"
            );
            self.balancers
                .forget_load_balancer(&self.load_balancer_name(service));
            self.balancers.forget_listeners(&lb.id);
        }
        result
    }

    async fn ensure_listeners(
        &self,
        service: &Service,
        options: &LoadBalancerOptions,
        lb: &LoadBalancer,
    ) -> Result<()> {
        let existing = self.balancers.listeners(&lb.id).await;
        let existing = self.forget_if_gone(service, lb, existing)?;

        let desired: Vec<ListenerKey> = service
            .ports
            .iter()
            .map(|p| ListenerKey::new(p.port, &p.protocol))
            .collect();
        let plan = Plan::diff(desired.iter().cloned(), existing.iter().map(Listener::key));

        // a second listener on an already claimed key goes away as well
        let wanted: HashSet<&ListenerKey> = desired.iter().collect();
        let mut claimed = HashSet::new();
        let to_delete: Vec<&Listener> = existing
            .iter()
            .filter(|l| {
                let key = l.key();
                !wanted.contains(&key) || !claimed.insert(key)
            })
            .collect();

        if !plan.has_changes && to_delete.is_empty() {
            tracing::debug!(load_balancer_id = %lb.id, "listeners up to date");
            return Ok(());
        }
        tracing::info!(
            load_balancer_id = %lb.id,
            create = plan.summary().create,
            delete = to_delete.len(),
            "reconciling listeners"
        );

        let mut task_ids = Vec::new();
        let issued = async {
            for key in plan.to_create() {
                let port_name = service
                    .ports
                    .iter()
                    .find(|p| ListenerKey::new(p.port, &p.protocol) == *key)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                let request = CreateListener {
                    load_balancer_id: lb.id.clone(),
                    name: port_name,
                    port: key.port,
                    protocol: key.protocol.clone(),
                    health_check: options.health_check,
                };
                tracing::info!(load_balancer_id = %lb.id, listener = %key, "creating listener");
                task_ids.push(self.api.create_listener(&request).await?);
            }

            for listener in &to_delete {
                tracing::info!(
                    load_balancer_id = %lb.id,
                    listener_id = %listener.id,
                    listener = %listener.key(),
                    "deleting listener"
                );
                task_ids.push(self.api.delete_listener(&lb.id, &listener.id).await?);
            }
            Ok::<(), CloudError>(())
        }
        .await;

        self.balancers.forget_listeners(&lb.id);
        self.forget_if_gone(service, lb, issued)?;
        self.tasks.await_all(&task_ids).await
    }

    async fn ensure_backends(
        &self,
        service: &Service,
        options: &LoadBalancerOptions,
        lb: &LoadBalancer,
        nodes: &[Node],
    ) -> Result<()> {
        let selector = &options.node_selector;
        let ips: Vec<String> = nodes
            .iter()
            .filter(|n| n.has_label(&selector.key, &selector.value))
            .map(|n| n.name.clone())
            .collect();
        if ips.is_empty() {
            tracing::warn!(service = %service, selector = %selector, "no nodes match the backend selector");
            return Err(CloudError::validation(format!(
                "no nodes match label {selector} for {service}"
            )));
        }

        let instances = self.instances.by_private_ips(&ips).await?;
        let backends = self.api.describe_targets(&lb.id).await;
        let backends = self.forget_if_gone(service, lb, backends)?;

        let mut changes: Vec<(&Listener, Plan<Target>)> = Vec::new();
        for port in &service.ports {
            let key = ListenerKey::new(port.port, &port.protocol);
            let backend = backends
                .iter()
                .find(|b| b.listener.key() == key)
                .ok_or_else(|| {
                    CloudError::validation(format!(
                        "load balancer {} has no listener for port {key} of {service}",
                        lb.id
                    ))
                })?;

            let desired = instances
                .iter()
                .map(|instance| Target::new(&instance.id, port.node_port));
            let plan = Plan::diff(desired, backend.targets.iter().cloned());
            if plan.has_changes {
                changes.push((&backend.listener, plan));
            }
        }

        if changes.is_empty() {
            tracing::debug!(load_balancer_id = %lb.id, "backends up to date");
            return Ok(());
        }

        let mut task_ids = Vec::new();
        for (listener, plan) in &changes {
            let stale: Vec<Target> = plan.items(ActionType::Delete).cloned().collect();
            self.apply_targets(lb, listener, &stale, TargetChange::Deregister, &mut task_ids)
                .await?;
        }
        for (listener, plan) in &changes {
            let missing: Vec<Target> = plan.items(ActionType::Create).cloned().collect();
            self.apply_targets(lb, listener, &missing, TargetChange::Register, &mut task_ids)
                .await?;
        }

        self.tasks.await_all(&task_ids).await
    }

    async fn apply_targets(
        &self,
        lb: &LoadBalancer,
        listener: &Listener,
        targets: &[Target],
        change: TargetChange,
        task_ids: &mut Vec<TaskId>,
    ) -> Result<()> {
        for batch in targets.chunks(self.target_batch_size) {
            tracing::info!(
                load_balancer_id = %lb.id,
                listener_id = %listener.id,
                count = batch.len(),
                "{change} targets"
            );
            let task = match change {
                TargetChange::Register => {
                    self.api
                        .register_targets(&lb.id, &listener.id, batch)
                        .await?
                }
                TargetChange::Deregister => {
                    self.api
                        .deregister_targets(&lb.id, &listener.id, batch)
                        .await?
                }
            };
            task_ids.push(task);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum TargetChange {
    Register,
    Deregister,
}

impl std::fmt::Display for TargetChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetChange::Register => write!(f, "registering"),
            TargetChange::Deregister => write!(f, "deregistering"),
        }
    }
}
