//! Host to handler lookup.
//!
//! # Responsibilities
//! - Store one handler per hostname
//! - Look up the handler for a request's hostname
//! - Return an explicit `None` for unknown hosts
//!
//! # Design Decisions
//! - Exact, case-sensitive string match (no normalization)
//! - Copy-on-write table behind `ArcSwap`: lookups never block
//! - Registration replaces; concurrent writers are last-write-wins

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::routing::handler::Handler;

type RouteTable = HashMap<String, Arc<dyn Handler>>;

/// Hostname → handler table.
pub struct HandlerRegistry {
    routes: ArcSwap<RouteTable>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Store `handler` for `host`, replacing any previous handler.
    pub fn register(&self, host: impl Into<String>, handler: Arc<dyn Handler>) {
        let host = host.into();
        let previous = self.routes.rcu(|current| {
            let mut next = RouteTable::clone(current);
            next.insert(host.clone(), Arc::clone(&handler));
            next
        });
        tracing::debug!(
            host = %host,
            replaced = previous.contains_key(&host),
            "Handler registered"
        );
    }

    pub fn lookup(&self, host: &str) -> Option<Arc<dyn Handler>> {
        self.routes.load().get(host).cloned()
    }

    /// Remove every route.
    pub fn clear(&self) {
        self.routes.store(Arc::new(HashMap::new()));
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }

    /// Registered hostnames, sorted.
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.routes.load().keys().cloned().collect();
        hosts.sort();
        hosts
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry").field("hosts", &self.hosts()).finish()
    }
}
