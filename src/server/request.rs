use std::io::{self, Read};
use std::time::Duration;

use http::Method;
use may_minihttp::Request;
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::{Deadline, RequestContext};
use crate::ids::RequestId;

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The request line could not be turned into a [`RequestContext`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),
}

/// Build a [`RequestContext`] from a `may_minihttp` request.
///
/// The body is read eagerly; a read failure is recorded on the context rather than
/// returned, so the owning sub-server decides how to report it.
pub fn parse_request(req: Request, timeout: Duration) -> Result<RequestContext, RequestError> {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let request_id = req
        .headers()
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(REQUEST_ID_HEADER))
        .map(|h| String::from_utf8_lossy(h.value).into_owned());

    let mut body = Vec::new();
    let body = req.body().read_to_end(&mut body).map(|_| body);

    build_context(&method, &raw_path, request_id.as_deref(), body, timeout)
}

/// Transport-independent half of [`parse_request`].
pub fn build_context(
    method: &str,
    raw_path: &str,
    request_id: Option<&str>,
    body: io::Result<Vec<u8>>,
    timeout: Duration,
) -> Result<RequestContext, RequestError> {
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| RequestError::InvalidMethod(method.to_string()))?;

    let (path, query) = match raw_path.split_once('?') {
        Some((path, query)) => (path, query),
        None => (raw_path, ""),
    };
    let path = urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string());
    let path = if path.is_empty() { "/".to_string() } else { path };

    let ctx = RequestContext::new(method, path)
        .with_request_id(RequestId::from_header_or_new(request_id))
        .with_raw_query(query)
        .with_deadline(Deadline::after(timeout));

    let ctx = match body {
        Ok(bytes) => ctx.with_body(bytes),
        Err(e) => {
            warn!(request_id = %ctx.request_id(), path = %ctx.path(), error = %e, "Failed to read request body");
            ctx.with_body_read_failure()
        }
    };

    debug!(
        request_id = %ctx.request_id(),
        method = %ctx.method(),
        path = %ctx.path(),
        query_count = ctx.query_params().len(),
        body_size_bytes = ctx.body().len(),
        "HTTP request parsed"
    );
    Ok(ctx)
}
