//! # Router Module
//!
//! The router module owns the top level of dispatch: choosing which sub-server handles a
//! request.
//!
//! ## Overview
//!
//! A [`CompositeRouter`] holds an ordered list of [`SubServer`](crate::servers::SubServer)s.
//! For each request it:
//!
//! 1. Looks the exact request path up in its resolution cache. A cached miss is
//!    remembered too, so repeated unknown paths never rescan.
//! 2. On a cache miss, scans sub-servers in registration order and picks the first whose
//!    pattern is a prefix of the path.
//! 3. Records the outcome in the cache and delegates the request, or answers 404.
//!
//! ## Ordering
//!
//! Overlapping prefixes are resolved by registration order, not by length:
//!
//! ```rust
//! use std::sync::Arc;
//! use switchyard::router::CompositeRouter;
//! use switchyard::servers::{ApiServer, SubServer};
//!
//! let mut router = CompositeRouter::new();
//! router.register(Arc::new(ApiServer::json("/api/").unwrap()));
//! router.register(Arc::new(ApiServer::json("/api/v2/").unwrap())); // logged as shadowed
//!
//! let owner = router.resolve("/api/v2/echo").unwrap();
//! assert_eq!(owner.pattern(), "/api/");
//! ```
//!
//! ## Concurrency
//!
//! Registration takes `&mut self`; wrap the finished router in an `Arc` to serve. The
//! cache sits behind an `RwLock`: lookups share the read lock and only a cache miss takes
//! the write lock.

mod core;

pub use self::core::{CompositeRouter, RouterStats, MAX_CACHED_PATHS};
