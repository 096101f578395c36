use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use may_minihttp::Response;

use crate::context::ResponseWriter;

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// `Content-Type` header line for `content_type`.
///
/// `may_minihttp` only takes `'static` header lines. The common types are literals; any
/// other type is leaked once and reused.
fn content_type_header(content_type: &'static str) -> &'static str {
    match content_type {
        "application/json" => "Content-Type: application/json",
        "text/html; charset=utf-8" => "Content-Type: text/html; charset=utf-8",
        "text/plain; charset=utf-8" => "Content-Type: text/plain; charset=utf-8",
        "text/css" => "Content-Type: text/css",
        "application/javascript" => "Content-Type: application/javascript",
        "application/octet-stream" => "Content-Type: application/octet-stream",
        other => {
            static INTERNED: OnceLock<Mutex<HashMap<&'static str, &'static str>>> = OnceLock::new();
            let mut interned = INTERNED
                .get_or_init(Default::default)
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *interned
                .entry(other)
                .or_insert_with(|| {
                    let line: &'static str = Box::leak(format!("Content-Type: {other}").into_boxed_str());
                    line
                })
        }
    }
}

/// Copy a finished [`ResponseWriter`] onto the wire.
pub fn write_response(res: &mut Response, out: ResponseWriter) {
    let (status, content_type, body) = out.into_parts();
    res.status_code(usize::from(status), status_reason(status));
    if let Some(content_type) = content_type {
        res.header(content_type_header(content_type));
    }
    res.body_vec(body);
}

/// Bodiless error status, used when a request never reaches the router.
pub fn write_status(res: &mut Response, status: u16) {
    res.status_code(usize::from(status), status_reason(status));
    res.body_vec(Vec::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(405), "Method Not Allowed");
    }

    #[test]
    fn test_content_type_header_interned() {
        assert_eq!(
            content_type_header("application/json"),
            "Content-Type: application/json"
        );
        let a = content_type_header("application/x-custom");
        let b = content_type_header("application/x-custom");
        assert_eq!(a, "Content-Type: application/x-custom");
        assert!(std::ptr::eq(a, b));
    }
}
