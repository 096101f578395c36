//! Application configuration.
//!
//! An [`AppConfig`] describes everything mounted on one port: file routes, the page
//! route with its template layout, and the API route. It is usually loaded from YAML:
//!
//! ```yaml
//! server:
//!   addr: 127.0.0.1:8080
//!   timeout_ms: 1000
//! files:
//!   - route: static
//!     dir: ./public
//! pages:
//!   route: /
//!   layout_dir: ./templates
//!   base_layouts: [base.html]
//!   page_layouts:
//!     - path: /
//!       method: GET
//!       templates: [index.html]
//! api:
//!   route: /api/
//! ```
//!
//! Every error found here is a [`ConfigError`] and fatal at startup.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::registry::RouteMethod;

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_method() -> String {
    "*".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Per-request deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One directory served under `/<route>/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileRouteConfig {
    pub route: String,
    pub dir: PathBuf,
}

/// Templates bound to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageLayout {
    pub path: String,
    /// HTTP method or `*`
    #[serde(default = "default_method")]
    pub method: String,
    pub templates: Vec<String>,
}

impl PageLayout {
    pub fn route_method(&self) -> Result<RouteMethod, ConfigError> {
        self.method
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("page `{}` has invalid method `{}`", self.path, self.method)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagesConfig {
    pub route: String,
    /// Directory every template path is resolved against
    #[serde(default)]
    pub layout_dir: Option<PathBuf>,
    /// Templates appended to every page's own list
    #[serde(default)]
    pub base_layouts: Vec<String>,
    #[serde(default)]
    pub page_layouts: Vec<PageLayout>,
}

impl PagesConfig {
    /// Template files for the page at `(path, method)`: the matching layout's own
    /// templates, then the base layouts, all joined under `layout_dir`. The first entry
    /// is the entry template.
    pub fn templates_for(&self, path: &str, method: &RouteMethod) -> Vec<PathBuf> {
        let own = self
            .page_layouts
            .iter()
            .find(|layout| layout.path == path && layout.route_method().ok().as_ref() == Some(method))
            .map(|layout| layout.templates.as_slice())
            .unwrap_or_default();
        own.iter()
            .chain(self.base_layouts.iter())
            .map(|name| match &self.layout_dir {
                Some(dir) => dir.join(name),
                None => PathBuf::from(name),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    pub route: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub files: Vec<FileRouteConfig>,
    #[serde(default)]
    pub pages: Option<PagesConfig>,
    #[serde(default)]
    pub api: Option<ApiConfig>,
}

impl AppConfig {
    /// Read, parse and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values `serde` cannot: non-empty routes and directories, page layouts with
    /// templates and valid methods, and a non-zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.timeout_ms == 0 {
            return Err(ConfigError::Invalid("server.timeout_ms must be greater than zero".into()));
        }
        if self.server.addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server.addr is empty".into()));
        }
        for file in &self.files {
            if file.route.trim().is_empty() {
                return Err(ConfigError::InvalidRoute {
                    route: file.route.clone(),
                    reason: "file route is empty",
                });
            }
            if file.dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("file route `{}` has no dir", file.route)));
            }
        }
        if let Some(pages) = &self.pages {
            if pages.route.trim().is_empty() {
                return Err(ConfigError::InvalidRoute {
                    route: pages.route.clone(),
                    reason: "pages route is empty",
                });
            }
            let mut seen = HashSet::new();
            for layout in &pages.page_layouts {
                if layout.templates.is_empty() {
                    return Err(ConfigError::EmptyTemplates(layout.path.clone()));
                }
                let method = layout.route_method()?;
                if !seen.insert((layout.path.as_str(), method.clone())) {
                    return Err(ConfigError::Invalid(format!(
                        "page `{}` has more than one layout for method `{method}`",
                        layout.path
                    )));
                }
            }
        }
        if let Some(api) = &self.api {
            if api.route.trim().is_empty() {
                return Err(ConfigError::InvalidRoute {
                    route: api.route.clone(),
                    reason: "api route is empty",
                });
            }
        }
        Ok(())
    }
}
