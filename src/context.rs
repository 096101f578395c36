//! Per-request state handed to sub-servers and handlers.
//!
//! A [`RequestContext`] is created by the transport for exactly one request, owned by
//! the sub-server handling it and dropped when the request completes. It is never shared
//! between requests. The response is written to a separate [`ResponseWriter`] so that the
//! context itself can be lent immutably to page handlers and procedures.

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use http::Method;

use crate::ids::RequestId;

/// Point in time after which a request should stop doing work.
///
/// Cancellation is cooperative: handlers and renderers are expected to poll
/// [`Deadline::is_expired`] around blocking steps. The dispatcher never aborts a
/// handler that ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }
}

/// Immutable view of one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    path: String,
    query: HashMap<String, String>,
    body: Vec<u8>,
    body_read_failed: bool,
    deadline: Deadline,
}

impl RequestContext {
    /// Context with an empty query and body and a one second deadline.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            query: HashMap::new(),
            body: Vec::new(),
            body_read_failed: false,
            deadline: Deadline::after(Duration::from_millis(1000)),
        }
    }

    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = id;
        self
    }

    /// Replace the query parameters with the result of [`parse_query`] on `raw`.
    pub fn with_raw_query(mut self, raw: &str) -> Self {
        self.query = parse_query(raw);
        self
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.body_read_failed = false;
        self
    }

    /// Mark the body as unreadable. The body is left empty.
    pub fn with_body_read_failure(mut self) -> Self {
        self.body.clear();
        self.body_read_failed = true;
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameter by name.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// True when the transport failed to read the request body.
    pub fn body_read_failed(&self) -> bool {
        self.body_read_failed
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// True once the request deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.deadline.is_expired()
    }
}

/// Buffered response sink for one request.
///
/// Sub-servers write status, content type and body here; the transport copies the
/// result onto the wire once the sub-server returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseWriter {
    status: u16,
    content_type: Option<&'static str>,
    body: Vec<u8>,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: 200,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.content_type = Some(content_type);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replace the body wholesale.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// Write a bodiless status response, discarding anything buffered so far.
    pub fn write_status(&mut self, status: u16) {
        self.status = status;
        self.content_type = None;
        self.body.clear();
    }

    pub fn into_parts(self) -> (u16, Option<&'static str>, Vec<u8>) {
        (self.status, self.content_type, self.body)
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Parse a raw query string into a map.
///
/// The whole string is percent-decoded first (`+` is a space), then split on `&`.
/// A segment that does not contain exactly one `=` is skipped. When a key repeats, the
/// last occurrence wins.
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut params = HashMap::new();
    if raw.is_empty() {
        return params;
    }
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode_binary(spaced.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);
    for segment in decoded.split('&') {
        let mut parts = segment.split('=');
        if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
            params.insert(key.to_string(), value.to_string());
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_query_basic() {
        let q = parse_query("x=1&y=2");
        assert_eq!(q.get("x").map(String::as_str), Some("1"));
        assert_eq!(q.get("y").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_parse_query_last_value_wins() {
        let q = parse_query("limit=10&limit=20");
        assert_eq!(q.get("limit").map(String::as_str), Some("20"));
    }

    #[test]
    fn test_parse_query_skips_malformed_segments() {
        let q = parse_query("flag&a=b=c&ok=1&&=empty");
        assert!(!q.contains_key("flag"));
        assert!(!q.contains_key("a"));
        assert_eq!(q.get("ok").map(String::as_str), Some("1"));
        // A lone `=` with an empty key is still exactly one `=`.
        assert_eq!(q.get("").map(String::as_str), Some("empty"));
    }

    #[test]
    fn test_parse_query_decodes_before_splitting() {
        let q = parse_query("name=hello+world&city=S%C3%A3o%20Paulo");
        assert_eq!(q.get("name").map(String::as_str), Some("hello world"));
        assert_eq!(q.get("city").map(String::as_str), Some("São Paulo"));

        // An encoded `&` becomes a separator once decoded.
        let q = parse_query("a=1%26b%3D2");
        assert_eq!(q.get("a").map(String::as_str), Some("1"));
        assert_eq!(q.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_parse_query_empty() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("?").is_empty());
    }

    #[test]
    fn test_deadline_expiry() {
        let past = Deadline::at(Instant::now() - Duration::from_millis(5));
        assert!(past.is_expired());
        assert_eq!(past.remaining(), Duration::ZERO);

        let future = Deadline::after(Duration::from_secs(60));
        assert!(!future.is_expired());
        assert!(future.remaining() > Duration::from_secs(59));
    }

    #[test]
    fn test_context_accessors() {
        let ctx = RequestContext::new(Method::POST, "/api/echo")
            .with_raw_query("?q=1")
            .with_body(b"{}".to_vec());
        assert_eq!(ctx.method(), &Method::POST);
        assert_eq!(ctx.path(), "/api/echo");
        assert_eq!(ctx.query("q"), Some("1"));
        assert_eq!(ctx.query("missing"), None);
        assert_eq!(ctx.body(), b"{}");
        assert!(!ctx.body_read_failed());
        assert!(!ctx.is_cancelled());

        let failed = ctx.with_body_read_failure();
        assert!(failed.body_read_failed());
        assert!(failed.body().is_empty());
    }

    #[test]
    fn test_response_writer_buffers() {
        let mut out = ResponseWriter::new();
        assert_eq!(out.status(), 200);
        write!(out, "hello").unwrap();
        out.set_content_type("text/plain");
        assert_eq!(out.body(), b"hello");

        out.write_status(404);
        let (status, ct, body) = out.into_parts();
        assert_eq!(status, 404);
        assert_eq!(ct, None);
        assert!(body.is_empty());
    }
}
