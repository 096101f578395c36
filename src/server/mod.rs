//! HTTP transport: turns `may_minihttp` requests into [`RequestContext`]s, runs them
//! through the [`CompositeRouter`] and writes the buffered [`ResponseWriter`] back out.
//!
//! [`RequestContext`]: crate::context::RequestContext
//! [`CompositeRouter`]: crate::router::CompositeRouter
//! [`ResponseWriter`]: crate::context::ResponseWriter

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{build_context, parse_request, RequestError, REQUEST_ID_HEADER};
pub use service::AppService;
