use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::response::Response;

/// Serves files out of a directory, with an optional single-page-app
/// fallback to `index.html` for paths that do not resolve to a real file.
pub struct StaticServer {
    public_dir: PathBuf,
    spa: bool,
}

impl StaticServer {
    pub fn new(public_dir: impl Into<PathBuf>, spa: bool) -> Self {
        Self {
            public_dir: public_dir.into(),
            spa,
        }
    }

    /// Serves the file at `path` relative to the public directory. Returns
    /// `None` when nothing could be served, including the SPA fallback
    /// (the caller is then responsible for a 404), so it can be composed
    /// with a router that takes priority.
    pub fn serve(&self, path: &str) -> Option<Response> {
        if let Some(resolved) = self.resolve(path) {
            return Some(self.read_file(&resolved));
        }
        if self.spa && !last_segment_looks_like_asset(path) {
            let index = self.public_dir.join("index.html");
            if index.is_file() {
                return Some(self.read_file(&index));
            }
        }
        None
    }

    /// Resolves `path` to a file under the public directory, rejecting any
    /// attempt to escape it via `..` path components.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let trimmed = path.trim_start_matches('/');
        let requested = if trimmed.is_empty() { "index.html" } else { trimmed };
        let requested = Path::new(requested);

        if requested
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
        {
            return None;
        }

        let candidate = self.public_dir.join(requested);
        if candidate.is_file() {
            Some(candidate)
        } else {
            None
        }
    }

    fn read_file(&self, path: &Path) -> Response {
        match fs::read(path) {
            Ok(bytes) => {
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                Response::ok(bytes).with_header("Content-Type", mime.to_string())
            }
            Err(err) => Response::internal_error(format!("failed to read {}: {err}", path.display())),
        }
    }
}

/// True if the path's last segment contains a `.`, the heuristic this
/// server uses to tell an asset request (`/app.js`, `/img/logo.png`) from a
/// client-side route (`/app/dashboard`) that the SPA fallback should catch.
fn last_segment_looks_like_asset(path: &str) -> bool {
    path.rsplit('/').next().unwrap_or("").contains('.')
}
