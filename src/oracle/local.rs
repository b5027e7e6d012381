//! Derivative lookups against a directory on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{DerivativeOracle, DerivativeStatus, OracleError};

/// Derivative lookup against a local directory that mirrors the public URL layout.
#[derive(Debug, Clone)]
pub struct LocalDerivativeStore {
    root: PathBuf,
}

impl LocalDerivativeStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a candidate URL onto a path under the store root.
    ///
    /// Scheme and host are dropped, as are query strings and fragments. Returns `None` for paths
    /// that would escape the root.
    fn resolve(&self, candidate_url: &str) -> Option<PathBuf> {
        let path = url_path(candidate_url);
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl DerivativeOracle for LocalDerivativeStore {
    fn check(&self, candidate_url: &str) -> DerivativeStatus {
        let Some(path) = self.resolve(candidate_url) else {
            return DerivativeStatus::NotFound;
        };

        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {
                DerivativeStatus::Found(candidate_url.to_string())
            }
            Ok(_) => DerivativeStatus::NotFound,
            Err(err) if err.kind() == ErrorKind::NotFound => DerivativeStatus::NotFound,
            Err(err) => DerivativeStatus::CheckFailed(OracleError::Io(err)),
        }
    }
}

fn url_path(candidate_url: &str) -> &str {
    let without_suffix = candidate_url
        .split(['?', '#'])
        .next()
        .unwrap_or(candidate_url);

    let after_scheme = match without_suffix.find("://") {
        Some(index) => &without_suffix[index + 3..],
        None => match without_suffix.strip_prefix("//") {
            Some(rest) => rest,
            None => return without_suffix,
        },
    };

    match after_scheme.find('/') {
        Some(index) => &after_scheme[index..],
        None => "",
    }
}
