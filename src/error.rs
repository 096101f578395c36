//! Error types shared across the dispatch engine.
//!
//! Registration-time failures are [`ConfigError`]s and must abort startup. Everything
//! that can go wrong while serving a request is handled at the sub-server boundary and
//! turned into a response; those errors never reach the [`CompositeRouter`].
//!
//! [`CompositeRouter`]: crate::router::CompositeRouter

use std::path::PathBuf;

use thiserror::Error;

use crate::procedure::ContractError;
use crate::registry::RegistryError;

/// A configuration or registration error.
///
/// The host must treat every variant as fatal: serving with a partially-registered
/// engine is never allowed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An endpoint, service or sub-server was registered twice under the same key.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A procedure does not satisfy the procedure contract.
    #[error("procedure `{service}` rejected: {source}")]
    Contract {
        service: String,
        #[source]
        source: ContractError,
    },

    /// Two procedures were registered under the same service name.
    #[error("duplicate service name registered: {0}")]
    DuplicateService(String),

    /// Service names are the path suffix after the API route and cannot be empty or nested.
    #[error("invalid service name `{0}`")]
    InvalidServiceName(String),

    /// A route prefix was empty or malformed.
    #[error("invalid route `{route}`: {reason}")]
    InvalidRoute { route: String, reason: &'static str },

    /// A page was registered without any template to render it with.
    #[error("no templates bound to page `{0}`")]
    EmptyTemplates(String),

    /// A page was registered for a method the page route never serves.
    #[error("page `{path}` registered for {method}, but pages only answer GET")]
    UnreachablePage { path: String, method: String },

    /// A template file could not be read.
    #[error("failed to read template {path}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template file was read but failed to parse.
    #[error("failed to parse template {path}: {message}")]
    TemplateParse { path: PathBuf, message: String },

    /// The directory behind a file route does not exist or is not a directory.
    #[error("file route directory {0} does not exist or is not a directory")]
    InvalidDirectory(PathBuf),

    /// The configuration file could not be read.
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`AppConfig`](crate::config::AppConfig).
    #[error("failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
