use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use http::Method;
use tracing::{debug, warn};

use super::{normalize_route, ServerKind, SubServer};
use crate::context::{RequestContext, ResponseWriter};
use crate::error::ConfigError;

/// Read-only view of one directory, addressed by URL-style relative paths.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base_dir: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a relative URL path under the base directory. `None` for anything that would
    /// climb out of it.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css",
            "js" | "mjs" => "application/javascript",
            "json" | "map" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "wasm" => "application/wasm",
            "woff2" => "font/woff2",
            _ => "application/octet-stream",
        }
    }

    /// Read the file at `url_path` with its content type.
    ///
    /// Traversal attempts, missing files and directories are all `NotFound`.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

/// Serves files from a local directory under `/<route>/`.
#[derive(Debug)]
pub struct FileServer {
    pattern: String,
    files: StaticFiles,
}

impl FileServer {
    /// # Errors
    ///
    /// [`ConfigError::InvalidRoute`] for an empty route and
    /// [`ConfigError::InvalidDirectory`] if `dir` is not an existing directory.
    pub fn new(route: &str, dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let pattern = normalize_route(route, true)?;
        let dir = dir.into();
        if dir.as_os_str().is_empty() || !dir.is_dir() {
            return Err(ConfigError::InvalidDirectory(dir));
        }
        Ok(Self {
            pattern,
            files: StaticFiles::new(dir),
        })
    }

    pub fn files(&self) -> &StaticFiles {
        &self.files
    }

    fn relative_path(&self, path: &str) -> String {
        let rest = path.strip_prefix(self.pattern.as_str()).unwrap_or(path);
        if rest.is_empty() || rest.ends_with('/') {
            format!("{rest}index.html")
        } else {
            rest.to_string()
        }
    }
}

impl SubServer for FileServer {
    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn kind(&self) -> ServerKind {
        ServerKind::Files
    }

    fn handle(&self, ctx: &RequestContext, out: &mut ResponseWriter) {
        let method = ctx.method();
        if method != Method::GET && method != Method::HEAD {
            out.write_status(405);
            return;
        }

        let relative = self.relative_path(ctx.path());
        match self.files.load(&relative) {
            Ok((bytes, content_type)) => {
                debug!(request_id = %ctx.request_id(), path = %ctx.path(), file = %relative, "Serving file");
                out.set_status(200);
                out.set_content_type(content_type);
                if method != Method::HEAD {
                    out.set_body(bytes);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(request_id = %ctx.request_id(), path = %ctx.path(), "File not found");
                out.write_status(404);
            }
            Err(e) => {
                warn!(request_id = %ctx.request_id(), path = %ctx.path(), error = %e, "File read failed");
                out.write_status(500);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_path_prevents_traversal() {
        let sf = StaticFiles::new("tests/staticdata");
        assert!(sf.map_path("../Cargo.toml").is_none());
        assert!(sf.map_path("a/../../Cargo.toml").is_none());
        assert_eq!(
            sf.map_path("./css/site.css"),
            Some(PathBuf::from("tests/staticdata/css/site.css"))
        );
    }

    #[test]
    fn test_load_plain_file() {
        let sf = StaticFiles::new("tests/staticdata");
        let (bytes, ct) = sf.load("hello.txt").unwrap();
        assert_eq!(ct, "text/plain; charset=utf-8");
        assert_eq!(String::from_utf8(bytes).unwrap(), "Hello\n");
    }

    #[test]
    fn test_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let sf = StaticFiles::new(dir.path());
        let err = sf.load("sub").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_new_requires_directory() {
        assert!(matches!(
            FileServer::new("static", "/no/such/dir"),
            Err(ConfigError::InvalidDirectory(_))
        ));
        assert!(matches!(
            FileServer::new("", "tests/staticdata"),
            Err(ConfigError::InvalidRoute { .. })
        ));
        let server = FileServer::new("static", "tests/staticdata").unwrap();
        assert_eq!(server.pattern(), "/static/");
    }

    #[test]
    fn test_relative_path_index() {
        let server = FileServer::new("/static/", "tests/staticdata").unwrap();
        assert_eq!(server.relative_path("/static/"), "index.html");
        assert_eq!(server.relative_path("/static/docs/"), "docs/index.html");
        assert_eq!(server.relative_path("/static/app.js"), "app.js");
    }

    #[test]
    fn test_handle_methods_and_status() {
        let server = FileServer::new("static", "tests/staticdata").unwrap();

        let mut out = ResponseWriter::new();
        server.handle(&RequestContext::new(Method::GET, "/static/hello.txt"), &mut out);
        assert_eq!(out.status(), 200);
        assert_eq!(out.body(), b"Hello\n");

        let mut out = ResponseWriter::new();
        server.handle(&RequestContext::new(Method::HEAD, "/static/hello.txt"), &mut out);
        assert_eq!(out.status(), 200);
        assert!(out.body().is_empty());

        let mut out = ResponseWriter::new();
        server.handle(&RequestContext::new(Method::POST, "/static/hello.txt"), &mut out);
        assert_eq!(out.status(), 405);

        let mut out = ResponseWriter::new();
        server.handle(&RequestContext::new(Method::GET, "/static/../Cargo.toml"), &mut out);
        assert_eq!(out.status(), 404);
    }
}
