//! lbsync remote cloud abstraction
//!
//! This crate describes the remote cloud the reconciliation engine talks to,
//! independent of any concrete HTTP client.
//!
//! # Services
//!
//! - **Compute**: instance lookups by private IP or instance id
//! - **LoadBalancer**: load balancers, listeners, targets and async task status
//! - **ClusterRoute**: the cluster route table
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  lbsync-core                     │
//! │   (cache, resolvers, task tracker, reconciler)   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 lbsync-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait ComputeApi / LoadBalancerApi /    │   │
//! │  │        ClusterRouteApi                   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │    Model     │  │  Diff Plans  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ lbsync-tencent│
//!           │  HTTP client  │
//!           └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod model;
pub mod provider;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary};
pub use error::{CloudError, Result};
pub use model::{
    ClusterRoute, HealthCheck, INSTANCE_STATE_RUNNING, Instance, Listener, ListenerKey,
    ListenerTargets, LoadBalancer, LoadBalancerKind, Tag, Target, TaskId, TaskStatus,
};
pub use provider::{
    ClusterRouteApi, ComputeApi, CreateListener, CreateLoadBalancer, LoadBalancerApi,
    TaskPollConfig,
};
