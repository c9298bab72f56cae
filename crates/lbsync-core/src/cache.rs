//! Short-lived read cache in front of the remote API
//!
//! Entries expire a fixed TTL after insertion. Expiry is passive: an expired
//! entry is dropped when it is read, nothing sweeps the map. A hit is
//! returned as is, without checking the remote side again.

use dashmap::DashMap;
use lbsync_cloud::{Instance, Listener, LoadBalancer};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const INSTANCE_IP_PREFIX: &str = "vm_ip_";
const INSTANCE_ID_PREFIX: &str = "vm_id_";
const LOAD_BALANCER_PREFIX: &str = "clb_id_";
const LISTENERS_PREFIX: &str = "clb_listener_id_";

pub fn instance_ip_key(ip: &str) -> String {
    format!("{INSTANCE_IP_PREFIX}{ip}")
}

pub fn instance_id_key(instance_id: &str) -> String {
    format!("{INSTANCE_ID_PREFIX}{instance_id}")
}

pub fn load_balancer_key(name: &str) -> String {
    format!("{LOAD_BALANCER_PREFIX}{name}")
}

pub fn listeners_key(load_balancer_id: &str) -> String {
    format!("{LISTENERS_PREFIX}{load_balancer_id}")
}

/// Values the engine keeps in the cache
#[derive(Debug, Clone)]
pub enum CacheValue {
    Instance(Arc<Instance>),
    LoadBalancer(Arc<LoadBalancer>),
    Listeners(Arc<Vec<Listener>>),
}

impl CacheValue {
    pub fn into_instance(self) -> Option<Arc<Instance>> {
        match self {
            CacheValue::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn into_load_balancer(self) -> Option<Arc<LoadBalancer>> {
        match self {
            CacheValue::LoadBalancer(lb) => Some(lb),
            _ => None,
        }
    }

    pub fn into_listeners(self) -> Option<Arc<Vec<Listener>>> {
        match self {
            CacheValue::Listeners(listeners) => Some(listeners),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent string-keyed cache with a fixed TTL
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, Entry<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `value`, replacing any previous entry and restarting its TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }

        // Drop the stale entry unless a writer refreshed it in between
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Remove an entry, returning whether a live one was present
    pub fn delete(&self, key: &str) -> bool {
        self.entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.expires_at > Instant::now())
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
