use std::path::PathBuf;

/// Default limit on deep traversal below the requested directory.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for the file store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Server document root; every request is confined below it
    pub document_root: PathBuf,

    /// Whether deep traversal descends into symlinked directories
    pub follow_symlinks: bool,

    /// Maximum directory nesting expanded by a deep listing or search
    pub max_depth: usize,

    /// Rootless paths never listed, matched or modified (glob)
    pub denied_patterns: Vec<String>,
}

impl StoreConfig {
    pub fn new(document_root: impl Into<PathBuf>) -> Self {
        Self {
            document_root: document_root.into(),
            ..Default::default()
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let document_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            document_root,
            follow_symlinks: false,
            max_depth: DEFAULT_MAX_DEPTH,
            denied_patterns: vec!["**/.htaccess".to_string(), "**/.htpasswd".to_string()],
        }
    }
}
