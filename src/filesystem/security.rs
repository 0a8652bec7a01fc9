use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob_match::glob_match;
use path_jail::Jail;

use crate::protocol::StoreError;

use super::config::StoreConfig;
use super::path_utils;

/// Message returned when a request tries to leave the document root.
const ESCAPE_MESSAGE: &str = "We're not going there.";

/// Paths resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Normalized document root.
    pub document_root: PathBuf,
    /// Document root plus `basePath`; rootless paths are relative to it.
    pub root_dir: PathBuf,
    /// Root dir plus `path`, or the root dir itself when no path was given.
    pub target: PathBuf,
    /// Whether the request named a specific file below the root dir.
    pub names_file: bool,
}

impl ResolvedPaths {
    /// Rootless form of `path`, empty for the root dir itself.
    pub fn rootless(&self, path: &Path) -> Option<String> {
        path_utils::to_rootless(&self.root_dir, path)
    }
}

/// Confines request paths to the document root
pub struct PathGuard {
    config: Arc<StoreConfig>,
    document_root: PathBuf,
    jail: Option<Jail>,
}

impl PathGuard {
    pub fn new(config: Arc<StoreConfig>) -> Self {
        let jail = Jail::new(&config.document_root).ok();
        if jail.is_none() {
            tracing::warn!(
                document_root = %config.document_root.display(),
                "document root cannot be opened; symlink containment disabled"
            );
        }
        let document_root = path_utils::normalize(&config.document_root.to_string_lossy());
        Self {
            config,
            document_root,
            jail,
        }
    }

    /// Compose and validate the root dir and target of a request.
    ///
    /// `base_path` and `path` are URI paths; absolute forms are taken relative
    /// to the document root. After normalization the root dir must lie at or
    /// below the document root and the target at or below the root dir.
    pub fn resolve(
        &self,
        base_path: Option<&str>,
        path: Option<&str>,
    ) -> Result<ResolvedPaths, StoreError> {
        let document_root = self.document_root.clone();
        let root_dir = path_utils::concat(&document_root, base_path.unwrap_or(""));
        let target = match path {
            Some(path) => path_utils::concat(&root_dir, path),
            None => root_dir.clone(),
        };

        if !root_dir.starts_with(&document_root) || !target.starts_with(&root_dir) {
            tracing::warn!(
                base_path = base_path.unwrap_or(""),
                path = path.unwrap_or(""),
                "rejected path outside document root"
            );
            return Err(StoreError::Forbidden(ESCAPE_MESSAGE.to_string()));
        }

        let resolved = ResolvedPaths {
            names_file: target != root_dir,
            document_root,
            root_dir,
            target,
        };

        if !self.config.follow_symlinks {
            self.ensure_jailed(&resolved.target)?;
        }

        Ok(resolved)
    }

    /// Check that a destination computed on the server side stays inside
    /// `root_dir`, e.g. the new location of a rename.
    pub fn ensure_within(&self, root_dir: &Path, candidate: &Path) -> Result<(), StoreError> {
        if !candidate.starts_with(root_dir) || candidate == root_dir {
            return Err(StoreError::Forbidden(ESCAPE_MESSAGE.to_string()));
        }
        if !self.config.follow_symlinks {
            if let Some(parent) = candidate.parent() {
                self.ensure_jailed(parent)?;
            }
        }
        Ok(())
    }

    /// Check if a rootless path matches denied patterns
    pub fn is_denied(&self, rootless: &str) -> bool {
        self.config
            .denied_patterns
            .iter()
            .any(|pattern| glob_match(pattern, rootless))
    }

    /// Lexical checks cannot see symlinks; the deepest existing ancestor of
    /// `path` must also resolve inside the document root.
    fn ensure_jailed(&self, path: &Path) -> Result<(), StoreError> {
        let Some(jail) = &self.jail else {
            return Ok(());
        };
        let Some(existing) = path.ancestors().find(|p| p.exists()) else {
            return Ok(());
        };
        if existing == self.document_root {
            return Ok(());
        }
        if jail.contains(existing).is_err() {
            tracing::warn!(path = %existing.display(), "path resolves outside document root");
            return Err(StoreError::Forbidden(ESCAPE_MESSAGE.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(root: &str) -> PathGuard {
        PathGuard::new(Arc::new(StoreConfig::new(root)))
    }

    #[test]
    fn composes_root_dir_and_target() {
        let resolved = guard("/srv/www")
            .resolve(Some("/docs/"), Some("img//logo.png"))
            .unwrap();
        assert_eq!(resolved.document_root, PathBuf::from("/srv/www"));
        assert_eq!(resolved.root_dir, PathBuf::from("/srv/www/docs"));
        assert_eq!(resolved.target, PathBuf::from("/srv/www/docs/img/logo.png"));
        assert!(resolved.names_file);
        assert_eq!(
            resolved.rootless(&resolved.target).as_deref(),
            Some("img/logo.png")
        );
    }

    #[test]
    fn missing_path_targets_root_dir() {
        let resolved = guard("/srv/www").resolve(None, None).unwrap();
        assert_eq!(resolved.target, resolved.root_dir);
        assert!(!resolved.names_file);
    }

    #[test]
    fn base_path_cannot_escape_document_root() {
        let err = guard("/srv/www")
            .resolve(Some("../../etc"), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }

    #[test]
    fn path_cannot_escape_root_dir() {
        let err = guard("/srv/www")
            .resolve(Some("docs"), Some("../private/key.pem"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }

    #[test]
    fn sibling_prefix_is_not_containment() {
        let err = guard("/srv/www")
            .resolve(Some("../www2"), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }

    #[test]
    fn denied_patterns_match_rootless_paths() {
        let guard = guard("/srv/www");
        assert!(guard.is_denied(".htaccess"));
        assert!(guard.is_denied("docs/.htpasswd"));
        assert!(!guard.is_denied("docs/readme.txt"));
    }
}
