use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::path_utils;
use super::platform;

/// One entry as reported by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub is_directory: bool,
    pub is_symlink: bool,
    pub is_hidden: bool,
    pub size: u64,
    pub modified: i64,
}

/// Which names to report from a directory.
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Every entry of the directory.
    Any,
    /// The single entry with this name.
    Exact(String),
    /// Entries whose name matches a `*`/`?` glob.
    Glob(glob::Pattern),
}

/// A directory plus a filter on entry names, e.g. `docs/*` or `docs/a?.txt`.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    pub directory: PathBuf,
    pub name: NamePattern,
}

impl SearchPattern {
    /// All entries of `directory`.
    pub fn children_of(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            name: NamePattern::Any,
        }
    }

    /// The entry (or entries, if the last segment has wildcards) at `target`.
    pub fn for_target(target: &Path) -> Self {
        let directory = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        let segment = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let name = if path_utils::has_wildcard(&segment) {
            match glob::Pattern::new(&segment) {
                Ok(pattern) => NamePattern::Glob(pattern),
                Err(_) => NamePattern::Exact(segment),
            }
        } else {
            NamePattern::Exact(segment)
        };

        Self { directory, name }
    }

    /// The entry at `target`, taking its last segment literally.
    pub fn exact(target: &Path) -> Self {
        let mut pattern = Self::for_target(target);
        if let Some(name) = target.file_name() {
            pattern.name = NamePattern::Exact(name.to_string_lossy().into_owned());
        }
        pattern
    }

    pub fn matches_name(&self, name: &str) -> bool {
        match &self.name {
            NamePattern::Any => true,
            NamePattern::Exact(exact) => exact == name,
            NamePattern::Glob(pattern) => pattern.matches_with(
                name,
                glob::MatchOptions {
                    case_sensitive: true,
                    require_literal_separator: false,
                    require_literal_leading_dot: false,
                },
            ),
        }
    }
}

/// Source of directory entries.
///
/// Entries come back in discovery order. A missing directory (or a missing
/// exact name) is an `io::ErrorKind::NotFound` error; a directory or glob with
/// no entries is an empty list.
#[allow(async_fn_in_trait)]
pub trait DirectoryEnumerator {
    async fn enumerate(&self, pattern: &SearchPattern) -> io::Result<Vec<RawEntry>>;
}

/// Enumerates the real filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsEnumerator;

impl DirectoryEnumerator for FsEnumerator {
    async fn enumerate(&self, pattern: &SearchPattern) -> io::Result<Vec<RawEntry>> {
        if let NamePattern::Exact(name) = &pattern.name {
            let entry = read_entry(&pattern.directory.join(name), name).await?;
            return Ok(vec![entry]);
        }

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&pattern.directory).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !pattern.matches_name(&name) {
                continue;
            }
            match read_entry(&entry.path(), &name).await {
                Ok(raw) => entries.push(raw),
                Err(e) => {
                    tracing::debug!(path = %entry.path().display(), "skipping unreadable entry: {}", e);
                    continue;
                }
            }
        }
        Ok(entries)
    }
}

async fn read_entry(path: &Path, name: &str) -> io::Result<RawEntry> {
    let metadata = fs::symlink_metadata(path).await?;
    let is_symlink = metadata.file_type().is_symlink();
    let file_metadata = fs::metadata(path).await.unwrap_or(metadata);

    let is_directory = file_metadata.is_dir();
    Ok(RawEntry {
        name: name.to_string(),
        is_directory,
        is_symlink,
        is_hidden: platform::is_hidden(name, &file_metadata),
        size: if is_directory { 0 } else { file_metadata.len() },
        modified: platform::modified_secs(&file_metadata),
    })
}

/// Fixed, ordered entries for tests that depend on discovery order.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryEnumerator {
    directories: std::collections::HashMap<PathBuf, Vec<RawEntry>>,
}

#[cfg(test)]
impl MemoryEnumerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `directory` and its entries, in discovery order.
    pub fn dir(mut self, directory: impl Into<PathBuf>, entries: Vec<RawEntry>) -> Self {
        self.directories.insert(directory.into(), entries);
        self
    }

    pub fn file(name: &str, size: u64, modified: i64) -> RawEntry {
        RawEntry {
            name: name.to_string(),
            is_directory: false,
            is_symlink: false,
            is_hidden: name.starts_with('.'),
            size,
            modified,
        }
    }

    pub fn subdir(name: &str) -> RawEntry {
        RawEntry {
            name: name.to_string(),
            is_directory: true,
            is_symlink: false,
            is_hidden: name.starts_with('.'),
            size: 0,
            modified: 0,
        }
    }
}

#[cfg(test)]
impl DirectoryEnumerator for MemoryEnumerator {
    async fn enumerate(&self, pattern: &SearchPattern) -> io::Result<Vec<RawEntry>> {
        let entries = self
            .directories
            .get(&pattern.directory)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        let found: Vec<RawEntry> = entries
            .iter()
            .filter(|entry| pattern.matches_name(&entry.name))
            .cloned()
            .collect();
        if matches!(pattern.name, NamePattern::Exact(_)) && found.is_empty() {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(found)
    }
}
