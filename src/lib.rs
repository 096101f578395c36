//! # switchyard
//!
//! **switchyard** is a coroutine-powered HTTP dispatch engine built on the `may` runtime.
//! One listener multiplexes three kinds of sub-server behind path prefixes:
//!
//! - **Files** serve a local directory.
//! - **Pages** render server-side templates from data produced by a page handler.
//! - **API** procedures take one typed message and answer inside a JSON envelope.
//!
//! ## Architecture
//!
//! ```text
//!  may_minihttp ──► server::AppService ──► router::CompositeRouter
//!                                               │ first registered prefix wins
//!                       ┌───────────────────────┼────────────────────────┐
//!                       ▼                       ▼                        ▼
//!              servers::FileServer   servers::TemplateServer    servers::ApiServer
//!                                     registry + render          procedure + codec
//!                                                                + envelope
//! ```
//!
//! - **[`router`]** picks the sub-server whose prefix matches, caching the answer per path.
//! - **[`registry`]** maps `(path, method)` to a handler plus an optional artifact, falling
//!   back to the wildcard method.
//! - **[`procedure`]** validates procedure contracts at registration and adapts typed
//!   procedures to wire bytes at request time.
//! - **[`codec`]** and **[`envelope`]** decode request bodies and wrap every API answer in
//!   `{"code", "msg", "data"}`.
//! - **[`render`]** binds template files to pages.
//! - **[`server`]** is the `may_minihttp` transport.
//! - **[`config`]**, **[`logging`]** and **[`runtime_config`]** are startup concerns; the
//!   **[`cli`]** ties them together for the `switchyard` binary.
//!
//! ## Registration vs. serving
//!
//! Everything that can be wrong with a deployment is caught while registering: duplicate
//! endpoints, unreadable templates, procedures with the wrong shape, missing
//! directories. Those are [`error::ConfigError`]s and abort startup. Once serving, every
//! failure becomes a response and nothing propagates past the sub-server that owns the
//! request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use switchyard::echo::EchoProcedure;
//! use switchyard::router::CompositeRouter;
//! use switchyard::server::{AppService, HttpServer};
//! use switchyard::servers::{ApiServer, FileServer};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut api = ApiServer::json("/api/")?;
//!     api.register("echo", EchoProcedure)?;
//!
//!     let mut router = CompositeRouter::new();
//!     router.register(Arc::new(FileServer::new("static", "./public")?));
//!     router.register(Arc::new(api));
//!
//!     let service = AppService::new(Arc::new(router), Duration::from_secs(1));
//!     let handle = HttpServer(service).start("0.0.0.0:8080")?;
//!     handle.join().ok();
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod context;
pub mod echo;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod logging;
pub mod procedure;
pub mod registry;
pub mod render;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod servers;

pub use context::{RequestContext, ResponseWriter};
pub use error::ConfigError;
pub use router::CompositeRouter;
