//! lbsync reconciliation engine
//!
//! Converges a Service's declared ports and backend nodes onto a remote load
//! balancer. All remote reads go through a short TTL cache, and every
//! asynchronous remote mutation is awaited before the call returns.
//!
//! # Example
//!
//! ```ignore
//! use lbsync_core::{Cloud, EngineSettings};
//!
//! let cloud = Cloud::new(config, backend, EngineSettings::default());
//! let status = cloud.ensure_load_balancer(&service, &nodes).await?;
//! for ingress in status.ingress {
//!     println!("{}", ingress.ip);
//! }
//! ```

pub mod balancer;
pub mod cache;
pub mod cloud;
pub mod instances;
pub mod nodes;
pub mod options;
pub mod reconciler;
pub mod routes;
pub mod service;
pub mod settings;
pub mod tasks;

pub use balancer::{LoadBalancerResolver, load_balancer_name};
pub use cache::{CacheValue, TtlCache};
pub use cloud::Cloud;
pub use instances::{InstanceResolver, parse_provider_id};
pub use options::{LoadBalancerOptions, NodeSelector};
pub use reconciler::Reconciler;
pub use service::{
    LoadBalancerIngress, LoadBalancerStatus, Node, NodeAddress, NodeAddressType, Route, Service,
    ServicePort,
};
pub use settings::EngineSettings;
pub use tasks::{TaskOutcome, TaskTracker};
