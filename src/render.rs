//! Template rendering for page routes.
//!
//! A [`Renderer`] writes one page to an output sink from the data value a page handler
//! returned. [`TemplateRender`] is the minijinja-backed implementation and is what the
//! template sub-server prebuilds for every page at registration time.
//!
//! Templates are registered under their file name, so an entry template can
//! `{% extends "base.html" %}` or `{% include "nav.html" %}` any other file in its list.
//! The first file of the list is the entry template.
//!
//! Custom functions collected in a [`TemplateFunctions`] are installed into every
//! environment before its templates are parsed.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value};
use minijinja::Environment;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::error::ConfigError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template execution failed: {0}")]
    Template(#[from] minijinja::Error),
    #[error("failed to write rendered output: {0}")]
    Io(#[from] io::Error),
}

/// Renders handler data into an output sink.
///
/// On error the sink is left holding whatever was written before the failure.
pub trait Renderer: Send + Sync {
    fn render(&self, out: &mut dyn io::Write, data: &JsonValue) -> Result<(), RenderError>;
}

/// Named functions callable from templates, e.g. `{{ money(price) }}`.
#[derive(Debug, Clone, Default)]
pub struct TemplateFunctions {
    functions: BTreeMap<String, Value>,
}

impl TemplateFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `f` under `name`, replacing any function already bound there.
    pub fn insert<F, Rv, Args>(&mut self, name: impl Into<String>, f: F)
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.functions.insert(name.into(), Value::from_function(f));
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn install(&self, env: &mut Environment<'static>) {
        for (name, function) in &self.functions {
            env.add_global(name.clone(), function.clone());
        }
    }
}

/// A parsed set of template files with a designated entry template.
pub struct TemplateRender {
    env: Environment<'static>,
    entry: String,
}

fn template_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

impl TemplateRender {
    /// Read and parse every file in `paths`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyTemplates`] for an empty list, [`ConfigError::TemplateRead`]
    /// for a missing file and [`ConfigError::TemplateParse`] for a syntax error.
    pub fn from_files<P: AsRef<Path>>(page: &str, paths: &[P]) -> Result<Self, ConfigError> {
        Self::from_files_with(page, paths, &TemplateFunctions::default())
    }

    /// [`from_files`](Self::from_files) with `functions` available to every template.
    pub fn from_files_with<P: AsRef<Path>>(
        page: &str,
        paths: &[P],
        functions: &TemplateFunctions,
    ) -> Result<Self, ConfigError> {
        let Some(first) = paths.first() else {
            return Err(ConfigError::EmptyTemplates(page.to_string()));
        };
        let entry = template_name(first.as_ref());

        let mut env = Environment::new();
        functions.install(&mut env);
        for path in paths {
            let path = path.as_ref();
            let source = fs::read_to_string(path).map_err(|source| ConfigError::TemplateRead {
                path: path.to_path_buf(),
                source,
            })?;
            env.add_template_owned(template_name(path), source)
                .map_err(|e| ConfigError::TemplateParse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
        }
        Ok(Self { env, entry })
    }

    /// Parse a single in-memory template.
    pub fn from_source(name: &str, source: &str) -> Result<Self, ConfigError> {
        Self::from_source_with(name, source, &TemplateFunctions::default())
    }

    pub fn from_source_with(
        name: &str,
        source: &str,
        functions: &TemplateFunctions,
    ) -> Result<Self, ConfigError> {
        let mut env = Environment::new();
        functions.install(&mut env);
        env.add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| ConfigError::TemplateParse {
                path: PathBuf::from(name),
                message: e.to_string(),
            })?;
        Ok(Self {
            env,
            entry: name.to_string(),
        })
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }
}

impl Renderer for TemplateRender {
    fn render(&self, out: &mut dyn io::Write, data: &JsonValue) -> Result<(), RenderError> {
        let template = self.env.get_template(&self.entry)?;
        template.render_to_write(data, out)?;
        Ok(())
    }
}

impl fmt::Debug for TemplateRender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRender")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}
