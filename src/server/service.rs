use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use may_minihttp::{HttpService, Request, Response};
use tracing::{info, warn};

use super::request::{parse_request, RequestError};
use super::response::{write_response, write_status};
use crate::context::ResponseWriter;
use crate::router::CompositeRouter;

/// `may_minihttp` service that feeds every request through a [`CompositeRouter`].
///
/// Cloned once per connection; clones share the router.
#[derive(Clone)]
pub struct AppService {
    router: Arc<CompositeRouter>,
    timeout: Duration,
}

impl AppService {
    /// `timeout` becomes each request's deadline.
    pub fn new(router: Arc<CompositeRouter>, timeout: Duration) -> Self {
        Self { router, timeout }
    }

    pub fn router(&self) -> &CompositeRouter {
        &self.router
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let started = Instant::now();
        let ctx = match parse_request(req, self.timeout) {
            Ok(ctx) => ctx,
            Err(e @ RequestError::InvalidMethod(_)) => {
                warn!(error = %e, "Rejected request");
                write_status(res, 400);
                return Ok(());
            }
        };

        let mut out = ResponseWriter::new();
        self.router.dispatch(&ctx, &mut out);

        if ctx.is_cancelled() {
            warn!(
                request_id = %ctx.request_id(),
                path = %ctx.path(),
                timeout_ms = self.timeout.as_millis() as u64,
                "Request finished after its deadline"
            );
        }
        info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            status = out.status(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
        write_response(res, out);
        Ok(())
    }
}
