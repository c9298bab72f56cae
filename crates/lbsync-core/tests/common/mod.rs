#![allow(dead_code)]

use async_trait::async_trait;
use lbsync_cloud::{
    CloudError, ClusterRoute, ClusterRouteApi, ComputeApi, CreateListener, CreateLoadBalancer,
    Instance, Listener, ListenerKey, ListenerTargets, LoadBalancer, LoadBalancerApi,
    LoadBalancerKind, Result, Tag, Target, TaskId, TaskStatus,
};
use lbsync_config::CloudConfig;
use lbsync_core::{Cloud, EngineSettings, Node, Service, ServicePort};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const VPC_ID: &str = "vpc-main";
pub const TAG_KEY: &str = "k8s-service-id";
pub const ROUTE_TABLE: &str = "rt-cluster";
pub const SERVICE_UID: &str = "7f3c9a2e-1111-2222-3333-444455556666";

/// One remote call as seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DescribeInstancesByIps(Vec<String>),
    DescribeInstancesByIds(Vec<String>),
    DescribeLoadBalancers(Tag),
    CreateLoadBalancer(CreateLoadBalancer),
    DeleteLoadBalancer(String),
    DescribeListeners(String),
    CreateListener(CreateListener),
    DeleteListener(String),
    DescribeTargets(String),
    RegisterTargets(String, Vec<Target>),
    DeregisterTargets(String, Vec<Target>),
    DescribeTaskStatus(String),
    DescribeRoutes(String),
    CreateRoute(ClusterRoute),
    DeleteRoute(ClusterRoute),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateLoadBalancer(_)
                | Call::DeleteLoadBalancer(_)
                | Call::CreateListener(_)
                | Call::DeleteListener(_)
                | Call::RegisterTargets(..)
                | Call::DeregisterTargets(..)
                | Call::CreateRoute(_)
                | Call::DeleteRoute(_)
        )
    }
}

#[derive(Default)]
struct State {
    instances: Vec<Instance>,
    load_balancers: Vec<LoadBalancer>,
    listeners: HashMap<String, Vec<Listener>>,
    targets: HashMap<String, Vec<Target>>,
    routes: Vec<ClusterRoute>,
    calls: Vec<Call>,
    task_script: VecDeque<TaskStatus>,
    failing_instance_chunk: Option<usize>,
    next_id: u32,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn task(&mut self) -> TaskId {
        TaskId::new(self.next_id("task"))
    }

    fn require_lb(&self, load_balancer_id: &str) -> Result<()> {
        if self.load_balancers.iter().any(|lb| lb.id == load_balancer_id) {
            Ok(())
        } else {
            Err(CloudError::LoadBalancerNotFound(load_balancer_id.to_string()))
        }
    }
}

/// In-memory remote cloud; mutations apply immediately
#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_instance(&self, instance: Instance) {
        self.state.lock().unwrap().instances.push(instance);
    }

    pub fn add_load_balancer(
        &self,
        kind: LoadBalancerKind,
        vpc_id: &str,
        subnet_id: Option<&str>,
        owner_uid: &str,
    ) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("lb");
        state.load_balancers.push(LoadBalancer {
            id: id.clone(),
            name: format!("existing-{id}"),
            kind,
            vpc_id: vpc_id.to_string(),
            subnet_id: subnet_id.map(str::to_string),
            vips: vec!["10.0.9.9".to_string()],
            tags: vec![Tag::new(TAG_KEY, owner_uid)],
        });
        state.listeners.insert(id.clone(), Vec::new());
        id
    }

    pub fn add_listener(&self, load_balancer_id: &str, port: u16, protocol: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("lbl");
        state
            .listeners
            .entry(load_balancer_id.to_string())
            .or_default()
            .push(Listener {
                id: id.clone(),
                name: None,
                port,
                protocol: protocol.to_string(),
            });
        state.targets.insert(id.clone(), Vec::new());
        id
    }

    pub fn add_target(&self, listener_id: &str, target: Target) {
        self.state
            .lock()
            .unwrap()
            .targets
            .entry(listener_id.to_string())
            .or_default()
            .push(target);
    }

    /// Statuses returned by the next task polls, in order; afterwards every task succeeds
    pub fn script_task_statuses(&self, statuses: impl IntoIterator<Item = TaskStatus>) {
        self.state.lock().unwrap().task_script.extend(statuses);
    }

    /// Make the n-th (0-based) private IP query fail
    pub fn fail_instance_chunk(&self, index: usize) {
        self.state.lock().unwrap().failing_instance_chunk = Some(index);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().into_iter().filter(|c| pred(c)).count()
    }

    pub fn load_balancers(&self) -> Vec<LoadBalancer> {
        self.state.lock().unwrap().load_balancers.clone()
    }

    pub fn listener_keys(&self, load_balancer_id: &str) -> Vec<ListenerKey> {
        let state = self.state.lock().unwrap();
        let mut keys: Vec<ListenerKey> = state
            .listeners
            .get(load_balancer_id)
            .map(|ls| ls.iter().map(Listener::key).collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn targets_of(&self, load_balancer_id: &str, port: u16, protocol: &str) -> Vec<Target> {
        let state = self.state.lock().unwrap();
        let key = ListenerKey::new(port, protocol);
        let Some(listener) = state
            .listeners
            .get(load_balancer_id)
            .and_then(|ls| ls.iter().find(|l| l.key() == key))
        else {
            return Vec::new();
        };
        let mut targets = state.targets.get(&listener.id).cloned().unwrap_or_default();
        targets.sort();
        targets
    }

    pub fn routes(&self) -> Vec<ClusterRoute> {
        self.state.lock().unwrap().routes.clone()
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl ComputeApi for FakeCloud {
    async fn describe_instances_by_private_ips(&self, ips: &[String]) -> Result<Vec<Instance>> {
        let mut state = self.record(Call::DescribeInstancesByIps(ips.to_vec()));
        let index = state
            .calls
            .iter()
            .filter(|c| matches!(c, Call::DescribeInstancesByIps(_)))
            .count()
            - 1;
        if state.failing_instance_chunk == Some(index) {
            state.failing_instance_chunk = None;
            return Err(CloudError::Transport("connection reset".into()));
        }

        Ok(state
            .instances
            .iter()
            .filter(|i| i.private_ips.iter().any(|ip| ips.contains(ip)))
            .cloned()
            .collect())
    }

    async fn describe_instances_by_ids(&self, ids: &[String]) -> Result<Vec<Instance>> {
        let state = self.record(Call::DescribeInstancesByIds(ids.to_vec()));
        Ok(state
            .instances
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LoadBalancerApi for FakeCloud {
    async fn describe_load_balancers(&self, tag: &Tag) -> Result<Vec<LoadBalancer>> {
        let state = self.record(Call::DescribeLoadBalancers(tag.clone()));
        Ok(state
            .load_balancers
            .iter()
            .filter(|lb| lb.tags.contains(tag))
            .cloned()
            .collect())
    }

    async fn create_load_balancer(&self, request: &CreateLoadBalancer) -> Result<TaskId> {
        let mut state = self.record(Call::CreateLoadBalancer(request.clone()));
        let id = state.next_id("lb");
        let vip = format!("10.0.1.{}", state.next_id);
        state.load_balancers.push(LoadBalancer {
            id: id.clone(),
            name: request.name.clone(),
            kind: request.kind,
            vpc_id: request.vpc_id.clone(),
            subnet_id: request.subnet_id.clone(),
            vips: vec![vip],
            tags: request.tags.clone(),
        });
        state.listeners.insert(id, Vec::new());
        Ok(state.task())
    }

    async fn delete_load_balancer(&self, load_balancer_id: &str) -> Result<TaskId> {
        let mut state = self.record(Call::DeleteLoadBalancer(load_balancer_id.to_string()));
        state.require_lb(load_balancer_id)?;
        state.load_balancers.retain(|lb| lb.id != load_balancer_id);
        if let Some(listeners) = state.listeners.remove(load_balancer_id) {
            for listener in listeners {
                state.targets.remove(&listener.id);
            }
        }
        Ok(state.task())
    }

    async fn describe_listeners(&self, load_balancer_id: &str) -> Result<Vec<Listener>> {
        let state = self.record(Call::DescribeListeners(load_balancer_id.to_string()));
        state.require_lb(load_balancer_id)?;
        Ok(state
            .listeners
            .get(load_balancer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_listener(&self, request: &CreateListener) -> Result<TaskId> {
        let mut state = self.record(Call::CreateListener(request.clone()));
        state.require_lb(&request.load_balancer_id)?;
        let id = state.next_id("lbl");
        state
            .listeners
            .entry(request.load_balancer_id.clone())
            .or_default()
            .push(Listener {
                id: id.clone(),
                name: Some(request.name.clone()),
                port: request.port,
                protocol: request.protocol.clone(),
            });
        state.targets.insert(id, Vec::new());
        Ok(state.task())
    }

    async fn delete_listener(&self, load_balancer_id: &str, listener_id: &str) -> Result<TaskId> {
        let mut state = self.record(Call::DeleteListener(listener_id.to_string()));
        state.require_lb(load_balancer_id)?;
        if let Some(listeners) = state.listeners.get_mut(load_balancer_id) {
            listeners.retain(|l| l.id != listener_id);
        }
        state.targets.remove(listener_id);
        Ok(state.task())
    }

    async fn describe_targets(&self, load_balancer_id: &str) -> Result<Vec<ListenerTargets>> {
        let state = self.record(Call::DescribeTargets(load_balancer_id.to_string()));
        state.require_lb(load_balancer_id)?;
        Ok(state
            .listeners
            .get(load_balancer_id)
            .map(|listeners| {
                listeners
                    .iter()
                    .map(|l| ListenerTargets {
                        listener: l.clone(),
                        targets: state.targets.get(&l.id).cloned().unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn register_targets(
        &self,
        load_balancer_id: &str,
        listener_id: &str,
        targets: &[Target],
    ) -> Result<TaskId> {
        let mut state = self.record(Call::RegisterTargets(
            listener_id.to_string(),
            targets.to_vec(),
        ));
        state.require_lb(load_balancer_id)?;
        state
            .targets
            .entry(listener_id.to_string())
            .or_default()
            .extend(targets.iter().cloned());
        Ok(state.task())
    }

    async fn deregister_targets(
        &self,
        load_balancer_id: &str,
        listener_id: &str,
        targets: &[Target],
    ) -> Result<TaskId> {
        let mut state = self.record(Call::DeregisterTargets(
            listener_id.to_string(),
            targets.to_vec(),
        ));
        state.require_lb(load_balancer_id)?;
        if let Some(existing) = state.targets.get_mut(listener_id) {
            existing.retain(|t| !targets.contains(t));
        }
        Ok(state.task())
    }

    async fn describe_task_status(&self, task_id: &TaskId) -> Result<TaskStatus> {
        let mut state = self.record(Call::DescribeTaskStatus(task_id.to_string()));
        Ok(state
            .task_script
            .pop_front()
            .unwrap_or(TaskStatus::Succeeded))
    }
}

#[async_trait]
impl ClusterRouteApi for FakeCloud {
    async fn describe_cluster_routes(&self, route_table: &str) -> Result<Vec<ClusterRoute>> {
        let state = self.record(Call::DescribeRoutes(route_table.to_string()));
        Ok(state.routes.clone())
    }

    async fn create_cluster_route(&self, _route_table: &str, route: &ClusterRoute) -> Result<()> {
        let mut state = self.record(Call::CreateRoute(route.clone()));
        state.routes.push(route.clone());
        Ok(())
    }

    async fn delete_cluster_route(&self, _route_table: &str, route: &ClusterRoute) -> Result<()> {
        let mut state = self.record(Call::DeleteRoute(route.clone()));
        state.routes.retain(|r| r != route);
        Ok(())
    }
}

pub fn config() -> Arc<CloudConfig> {
    Arc::new(CloudConfig {
        region: "ap-shanghai".into(),
        vpc_id: VPC_ID.into(),
        name_prefix: "k8s".into(),
        tag_key: TAG_KEY.into(),
        secret_id: "AKID".into(),
        secret_key: "secret".into(),
        route_table: ROUTE_TABLE.into(),
    })
}

pub fn cloud(fake: &Arc<FakeCloud>) -> Cloud {
    Cloud::new(config(), Arc::clone(fake), EngineSettings::default())
}

pub fn instance(id: &str, ip: &str) -> Instance {
    instance_in(id, ip, VPC_ID)
}

pub fn instance_in(id: &str, ip: &str, vpc_id: &str) -> Instance {
    Instance {
        id: id.into(),
        vpc_id: vpc_id.into(),
        zone: "ap-shanghai-2".into(),
        instance_type: "S5.MEDIUM4".into(),
        private_ips: vec![ip.into()],
        public_ips: vec![],
        state: "RUNNING".into(),
    }
}

/// `count` instances `ins-<n>` at `10.0.0.<n>`, registered with the fake
pub fn seed_instances(fake: &FakeCloud, count: usize) -> Vec<Instance> {
    (1..=count)
        .map(|n| {
            let instance = instance(&format!("ins-{n}"), &format!("10.0.0.{n}"));
            fake.add_instance(instance.clone());
            instance
        })
        .collect()
}

pub fn node(ip: &str) -> Node {
    Node {
        name: ip.into(),
        labels: BTreeMap::from([("kubernetes.io/role".to_string(), "node".to_string())]),
    }
}

pub fn nodes_for(instances: &[Instance]) -> Vec<Node> {
    instances.iter().map(|i| node(&i.private_ips[0])).collect()
}

pub fn port(name: &str, port: u16, node_port: u16) -> ServicePort {
    ServicePort {
        name: name.into(),
        port,
        protocol: "TCP".into(),
        node_port,
    }
}

/// Private service on `subnet-1` with the given ports
pub fn service(ports: Vec<ServicePort>) -> Service {
    Service {
        namespace: "default".into(),
        name: "web".into(),
        uid: SERVICE_UID.into(),
        ports,
        annotations: BTreeMap::from([(
            lbsync_core::options::ANNOTATION_SUBNET_ID.to_string(),
            "subnet-1".to_string(),
        )]),
        session_affinity: "None".into(),
    }
}
