//! Composite router core: prefix resolution over registered sub-servers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::context::{RequestContext, ResponseWriter};
use crate::servers::SubServer;

/// Upper bound on memoized paths. Once full, new paths are resolved by scanning and not
/// cached.
pub const MAX_CACHED_PATHS: usize = 16 * 1024;

/// Counters describing how requests were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Resolutions answered from the path cache, including cached misses.
    pub cache_hits: u64,
    /// Resolutions that scanned the sub-server list.
    pub scans: u64,
    /// Exact paths currently memoized.
    pub cached_paths: usize,
}

/// Routes each request to exactly one sub-server by path prefix.
///
/// Sub-servers are checked in registration order and the first whose pattern is a
/// prefix of the request path wins, even when a later one has a longer, more specific
/// prefix. Register `/assets/` before `/` if assets should be served by their own
/// sub-server.
///
/// Resolutions are memoized per exact path, misses included. Registration needs
/// `&mut self`, so it cannot happen once the router is shared for serving and the cache
/// can never go stale. The cache holds at most [`MAX_CACHED_PATHS`] entries; after that,
/// unseen paths are scanned on every request while earlier entries keep hitting.
pub struct CompositeRouter {
    servers: Vec<Arc<dyn SubServer>>,
    // exact path -> index into `servers`, `None` for "no sub-server matches"
    cache: RwLock<HashMap<String, Option<usize>>>,
    cache_hits: AtomicU64,
    scans: AtomicU64,
}

impl Default for CompositeRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeRouter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            servers: Vec::new(),
            cache: RwLock::new(HashMap::new()),
            cache_hits: AtomicU64::new(0),
            scans: AtomicU64::new(0),
        }
    }

    /// Append `server` to the routing order.
    pub fn register(&mut self, server: Arc<dyn SubServer>) {
        let pattern = server.pattern();
        if let Some(earlier) = self
            .servers
            .iter()
            .find(|s| pattern.starts_with(s.pattern()))
        {
            warn!(
                pattern = %pattern,
                kind = %server.kind(),
                shadowed_by = %earlier.pattern(),
                "Sub-server is shadowed by an earlier registration and will never be reached"
            );
        }
        info!(pattern = %pattern, kind = %server.kind(), position = self.servers.len(), "Sub-server registered");
        self.servers.push(server);
        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Sub-servers in registration order.
    #[must_use]
    pub fn servers(&self) -> &[Arc<dyn SubServer>] {
        &self.servers
    }

    /// Find the sub-server owning `path`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<Arc<dyn SubServer>> {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied();
        let index = match cached {
            Some(index) => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                index
            }
            None => self.scan_and_cache(path),
        };
        index.map(|i| Arc::clone(&self.servers[i]))
    }

    #[inline]
    fn scan(&self, path: &str) -> Option<usize> {
        self.servers
            .iter()
            .position(|s| path.starts_with(s.pattern()))
    }

    fn scan_and_cache(&self, path: &str) -> Option<usize> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        let index = self.scan(path);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.len() < MAX_CACHED_PATHS {
            cache.entry(path.to_string()).or_insert(index);
        }
        index
    }

    /// Hand the request to its owning sub-server, or answer 404.
    pub fn dispatch(&self, ctx: &RequestContext, out: &mut ResponseWriter) {
        match self.resolve(ctx.path()) {
            Some(server) => {
                debug!(
                    request_id = %ctx.request_id(),
                    path = %ctx.path(),
                    kind = %server.kind(),
                    pattern = %server.pattern(),
                    "Request routed"
                );
                server.handle(ctx, out);
            }
            None => {
                debug!(request_id = %ctx.request_id(), path = %ctx.path(), "No sub-server matches");
                out.write_status(404);
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            cached_paths: self.cache.read().unwrap_or_else(PoisonError::into_inner).len(),
        }
    }
}
