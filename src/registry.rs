//! Per-sub-server endpoint table.
//!
//! Maps `(path, method)` to a handler and its prebuilt render artifact. Lookups try the
//! exact method first and then the wildcard method, so a route can bind one handler for
//! every method while still letting method-specific registrations take precedence.
//!
//! The table is filled during startup and only read while serving.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use http::Method;
use thiserror::Error;
use tracing::info;

/// Method half of an endpoint key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// The wildcard method, written `*`: matches any request method.
    Any,
    Exact(Method),
}

impl RouteMethod {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, RouteMethod::Any)
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Exact(method)
    }
}

impl From<&Method> for RouteMethod {
    fn from(method: &Method) -> Self {
        RouteMethod::Exact(method.clone())
    }
}

impl FromStr for RouteMethod {
    type Err = http::method::InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" || s.is_empty() {
            return Ok(RouteMethod::Any);
        }
        Method::from_bytes(s.to_ascii_uppercase().as_bytes()).map(RouteMethod::Exact)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMethod::Any => f.write_str("*"),
            RouteMethod::Exact(m) => f.write_str(m.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("endpoint already registered: [{method}] {path}")]
    Duplicate { path: String, method: RouteMethod },
    #[error("no endpoint for [{method}] {path}")]
    NotFound { path: String, method: RouteMethod },
}

/// A handler with its optional prebuilt render artifact.
#[derive(Debug)]
pub struct RegisteredEndpoint<H, A> {
    handler: H,
    artifact: Option<A>,
}

impl<H, A> RegisteredEndpoint<H, A> {
    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn artifact(&self) -> Option<&A> {
        self.artifact.as_ref()
    }
}

/// `(path, method)` → endpoint table with wildcard-method fallback.
#[derive(Debug)]
pub struct EndpointRegistry<H, A> {
    endpoints: HashMap<String, HashMap<RouteMethod, RegisteredEndpoint<H, A>>>,
}

impl<H, A> Default for EndpointRegistry<H, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, A> EndpointRegistry<H, A> {
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
        }
    }

    /// Bind `handler` (and its artifact) at `(path, method)`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Duplicate`] if the exact key is taken; the existing binding is
    /// left untouched.
    pub fn register(
        &mut self,
        path: impl Into<String>,
        method: RouteMethod,
        handler: H,
        artifact: Option<A>,
    ) -> Result<(), RegistryError> {
        let path = path.into();
        let by_method = self.endpoints.entry(path.clone()).or_default();
        if by_method.contains_key(&method) {
            return Err(RegistryError::Duplicate { path, method });
        }
        info!(path = %path, method = %method, "Endpoint registered");
        by_method.insert(method, RegisteredEndpoint { handler, artifact });
        Ok(())
    }

    /// Exact `(path, method)` first, then `(path, *)`.
    pub fn resolve(
        &self,
        path: &str,
        method: &RouteMethod,
    ) -> Result<&RegisteredEndpoint<H, A>, RegistryError> {
        let by_method = self.endpoints.get(path);
        let exact = by_method.and_then(|m| m.get(method));
        let found = match exact {
            Some(endpoint) => Some(endpoint),
            None if !method.is_wildcard() => by_method.and_then(|m| m.get(&RouteMethod::Any)),
            None => None,
        };
        found.ok_or_else(|| RegistryError::NotFound {
            path: path.to_string(),
            method: method.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered key, sorted by path then method.
    pub fn keys(&self) -> Vec<(String, RouteMethod)> {
        let mut keys: Vec<_> = self
            .endpoints
            .iter()
            .flat_map(|(path, by_method)| by_method.keys().map(move |m| (path.clone(), m.clone())))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.to_string().cmp(&b.1.to_string())));
        keys
    }
}
