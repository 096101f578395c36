//! # Sub-servers
//!
//! Each sub-server owns every request under one path prefix and handles it end to end:
//! it resolves its own endpoint, runs the handler and writes the response. All
//! per-request failures stop at this boundary and become responses.
//!
//! | Kind                  | Keyed by                    | Fallback           |
//! |-----------------------|-----------------------------|--------------------|
//! | [`FileServer`]        | file path under a directory | `index.html`       |
//! | [`TemplateServer`]    | `(path, method)`            | wildcard method    |
//! | [`ApiServer`]         | service name                | none               |
//!
//! Sub-servers are registered on a [`CompositeRouter`](crate::router::CompositeRouter),
//! which picks the owner of a request by prefix.

use std::fmt;

use crate::context::{RequestContext, ResponseWriter};
use crate::error::ConfigError;

mod api;
mod files;
mod template;

pub use api::ApiServer;
pub use files::{FileServer, StaticFiles};
pub use template::{PageError, PageHandler, PageResult, TemplateServer};

/// Kind tag reported by [`SubServer::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerKind {
    Files,
    Pages,
    Api,
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerKind::Files => "files",
            ServerKind::Pages => "pages",
            ServerKind::Api => "api",
        })
    }
}

/// Uniform contract every sub-server implements.
pub trait SubServer: Send + Sync {
    /// Path prefix this sub-server owns.
    fn pattern(&self) -> &str;

    fn kind(&self) -> ServerKind;

    /// Serve one request. Never fails: errors are written to `out`.
    fn handle(&self, ctx: &RequestContext, out: &mut ResponseWriter);
}

/// Normalize a configured route into a prefix: leading `/` always, trailing `/` when
/// `trailing_slash` is set. The bare root stays `/`.
pub(crate) fn normalize_route(route: &str, trailing_slash: bool) -> Result<String, ConfigError> {
    let trimmed = route.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidRoute {
            route: route.to_string(),
            reason: "route is empty",
        });
    }
    if trimmed.contains(char::is_whitespace) || trimmed.contains('?') || trimmed.contains('#') {
        return Err(ConfigError::InvalidRoute {
            route: route.to_string(),
            reason: "route must be a plain path",
        });
    }
    let inner = trimmed.trim_matches('/');
    if inner.is_empty() {
        return Ok("/".to_string());
    }
    let mut prefix = format!("/{inner}");
    if trailing_slash {
        prefix.push('/');
    }
    Ok(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_route() {
        assert_eq!(normalize_route("api", true).unwrap(), "/api/");
        assert_eq!(normalize_route("/api/", true).unwrap(), "/api/");
        assert_eq!(normalize_route("/static", false).unwrap(), "/static");
        assert_eq!(normalize_route("/", true).unwrap(), "/");
        assert_eq!(normalize_route("//", false).unwrap(), "/");
        assert!(normalize_route("  ", true).is_err());
        assert!(normalize_route("/a b", true).is_err());
    }
}
