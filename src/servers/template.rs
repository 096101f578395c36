use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use http::Method;
use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{normalize_route, ServerKind, SubServer};
use crate::config::PagesConfig;
use crate::context::{RequestContext, ResponseWriter};
use crate::error::ConfigError;
use crate::registry::{EndpointRegistry, RouteMethod};
use crate::render::{Renderer, TemplateFunctions, TemplateRender};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Failure reported by a [`PageHandler`]. The client only ever sees a 500.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PageError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<&str> for PageError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for PageError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

pub type PageResult = Result<JsonValue, PageError>;

/// Produces the data a page template is rendered with.
pub trait PageHandler: Send + Sync {
    fn handle(&self, ctx: &RequestContext) -> PageResult;
}

impl<F> PageHandler for F
where
    F: Fn(&RequestContext) -> PageResult + Send + Sync,
{
    fn handle(&self, ctx: &RequestContext) -> PageResult {
        self(ctx)
    }
}

/// Server-rendered pages keyed by `(path, method)`.
///
/// Only `GET` requests are served. A page registered under the wildcard method answers
/// every `GET` for its path that has no `GET`-specific registration.
pub struct TemplateServer {
    pattern: String,
    config: PagesConfig,
    functions: TemplateFunctions,
    pages: EndpointRegistry<Box<dyn PageHandler>, Box<dyn Renderer>>,
}

impl TemplateServer {
    pub fn new(config: PagesConfig) -> Result<Self, ConfigError> {
        let pattern = normalize_route(&config.route, true)?;
        Ok(Self {
            pattern,
            config,
            functions: TemplateFunctions::new(),
            pages: EndpointRegistry::new(),
        })
    }

    /// Make `f` callable as `name` from the templates of every page registered after
    /// this call.
    pub fn bind_function<F, Rv, Args>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.functions.insert(name, f);
        self
    }

    /// Register a page using the templates configured for `path`.
    ///
    /// The list is the page's own `page_layouts` entry followed by `base_layouts`, all
    /// under `layout_dir`.
    pub fn register_page<H>(
        &mut self,
        path: &str,
        method: RouteMethod,
        handler: H,
    ) -> Result<(), ConfigError>
    where
        H: PageHandler + 'static,
    {
        let templates = self.config.templates_for(path, &method);
        self.register_page_with_templates(path, method, handler, &templates)
    }

    /// Register a page rendered from an explicit template list; the first file is the
    /// entry template.
    pub fn register_page_with_templates<H, P>(
        &mut self,
        path: &str,
        method: RouteMethod,
        handler: H,
        templates: &[P],
    ) -> Result<(), ConfigError>
    where
        H: PageHandler + 'static,
        P: AsRef<Path>,
    {
        let render = TemplateRender::from_files_with(path, templates, &self.functions)?;
        info!(path = %path, method = %method, templates = templates.len(), "Page templates bound");
        self.register_page_with_renderer(path, method, handler, render)
    }

    /// Register a page with a prebuilt renderer.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnreachablePage`] for an exact method other than `GET`, and
    /// [`ConfigError::Registry`] for a duplicate `(path, method)`.
    pub fn register_page_with_renderer<H, R>(
        &mut self,
        path: &str,
        method: RouteMethod,
        handler: H,
        renderer: R,
    ) -> Result<(), ConfigError>
    where
        H: PageHandler + 'static,
        R: Renderer + 'static,
    {
        if let RouteMethod::Exact(exact) = &method {
            if exact != Method::GET {
                return Err(ConfigError::UnreachablePage {
                    path: path.to_string(),
                    method: exact.to_string(),
                });
            }
        }
        self.pages
            .register(path, method, Box::new(handler), Some(Box::new(renderer)))?;
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl SubServer for TemplateServer {
    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn kind(&self) -> ServerKind {
        ServerKind::Pages
    }

    fn handle(&self, ctx: &RequestContext, out: &mut ResponseWriter) {
        if ctx.method() != Method::GET {
            debug!(request_id = %ctx.request_id(), method = %ctx.method(), path = %ctx.path(), "Page route only serves GET");
            out.write_status(404);
            return;
        }

        let endpoint = match self.pages.resolve(ctx.path(), &RouteMethod::from(ctx.method())) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                debug!(request_id = %ctx.request_id(), error = %e, "Page not found");
                out.write_status(404);
                return;
            }
        };
        let Some(renderer) = endpoint.artifact() else {
            warn!(request_id = %ctx.request_id(), path = %ctx.path(), "Page has no renderer");
            out.write_status(404);
            return;
        };

        let data = match catch_unwind(AssertUnwindSafe(|| endpoint.handler().handle(ctx))) {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                warn!(request_id = %ctx.request_id(), path = %ctx.path(), error = %e, "Page handler failed");
                out.write_status(500);
                return;
            }
            Err(_) => {
                error!(request_id = %ctx.request_id(), path = %ctx.path(), "Page handler panicked");
                out.write_status(500);
                return;
            }
        };

        out.set_status(200);
        out.set_content_type(HTML_CONTENT_TYPE);
        if let Err(e) = renderer.render(out, &data) {
            error!(request_id = %ctx.request_id(), path = %ctx.path(), error = %e, "Page render failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> PagesConfig {
        PagesConfig {
            route: "/".to_string(),
            ..PagesConfig::default()
        }
    }

    fn page(body: &str) -> TemplateRender {
        TemplateRender::from_source("page.html", body).unwrap()
    }

    fn get(path: &str) -> RequestContext {
        RequestContext::new(Method::GET, path)
    }

    #[test]
    fn test_get_renders_handler_data() {
        let mut server = TemplateServer::new(config()).unwrap();
        server
            .register_page_with_renderer(
                "/hello",
                RouteMethod::Exact(Method::GET),
                |ctx: &RequestContext| -> PageResult {
                    Ok(json!({ "name": ctx.query("name").unwrap_or("anon") }))
                },
                page("hi {{ name }}"),
            )
            .unwrap();

        let mut out = ResponseWriter::new();
        server.handle(&get("/hello").with_raw_query("name=ann"), &mut out);
        assert_eq!(out.status(), 200);
        assert_eq!(out.content_type(), Some(HTML_CONTENT_TYPE));
        assert_eq!(out.body(), b"hi ann");
    }

    #[test]
    fn test_wildcard_page_and_non_get() {
        let mut server = TemplateServer::new(config()).unwrap();
        server
            .register_page_with_renderer(
                "/any",
                RouteMethod::Any,
                |_: &RequestContext| -> PageResult { Ok(json!({})) },
                page("any"),
            )
            .unwrap();

        let mut out = ResponseWriter::new();
        server.handle(&get("/any"), &mut out);
        assert_eq!(out.body(), b"any");

        let mut out = ResponseWriter::new();
        server.handle(&RequestContext::new(Method::POST, "/any"), &mut out);
        assert_eq!(out.status(), 404);

        let mut out = ResponseWriter::new();
        server.handle(&get("/missing"), &mut out);
        assert_eq!(out.status(), 404);
    }

    #[test]
    fn test_handler_error_is_500_with_empty_body() {
        let mut server = TemplateServer::new(config()).unwrap();
        server
            .register_page_with_renderer(
                "/broken",
                RouteMethod::Any,
                |_: &RequestContext| -> PageResult { Err(PageError::new("backend down")) },
                page("never"),
            )
            .unwrap();
        server
            .register_page_with_renderer(
                "/panics",
                RouteMethod::Any,
                |_: &RequestContext| -> PageResult { panic!("boom") },
                page("never"),
            )
            .unwrap();

        for path in ["/broken", "/panics"] {
            let mut out = ResponseWriter::new();
            server.handle(&get(path), &mut out);
            assert_eq!(out.status(), 500, "{path}");
            assert!(out.body().is_empty(), "{path}");
        }
    }

    #[test]
    fn test_duplicate_page_rejected() {
        let mut server = TemplateServer::new(config()).unwrap();
        let handler = |_: &RequestContext| -> PageResult { Ok(json!({})) };
        server
            .register_page_with_renderer("/", RouteMethod::Any, handler, page("a"))
            .unwrap();
        let err = server
            .register_page_with_renderer("/", RouteMethod::Any, handler, page("b"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Registry(_)));
        assert_eq!(server.page_count(), 1);
    }

    #[test]
    fn test_register_page_without_templates_fails() {
        let mut server = TemplateServer::new(config()).unwrap();
        let err = server
            .register_page("/nothing", RouteMethod::Any, |_: &RequestContext| -> PageResult {
                Ok(json!({}))
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyTemplates(_)));
    }

    #[test]
    fn test_bound_function_reaches_page_templates() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("price.html");
        std::fs::write(&file, "{{ money(cents) }}").unwrap();

        let mut server = TemplateServer::new(config()).unwrap();
        server.bind_function("money", |cents: i64| format!("${}.{:02}", cents / 100, cents % 100));
        server
            .register_page_with_templates(
                "/price",
                RouteMethod::Any,
                |_: &RequestContext| -> PageResult { Ok(json!({ "cents": 1234 })) },
                &[file],
            )
            .unwrap();

        let mut out = ResponseWriter::new();
        server.handle(&get("/price"), &mut out);
        assert_eq!(out.status(), 200);
        assert_eq!(out.body(), b"$12.34");
    }

    #[test]
    fn test_non_get_page_rejected_at_registration() {
        let mut server = TemplateServer::new(config()).unwrap();
        let err = server
            .register_page_with_renderer(
                "/form",
                RouteMethod::Exact(Method::POST),
                |_: &RequestContext| -> PageResult { Ok(json!({})) },
                page("form"),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnreachablePage { ref method, .. } if method == "POST"));
        assert_eq!(server.page_count(), 0);
    }
}
