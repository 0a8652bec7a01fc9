use super::enumerator::RawEntry;
use super::path_utils;

/// A file or directory found while serving a request.
///
/// A record owns its children; dropping it drops the whole subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    /// Rootless path relative to the request's root dir.
    pub path: String,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub modified: i64,
    pub is_directory: bool,
    pub is_hidden: bool,
    pub is_symlink: bool,
    /// Set once a listing of this directory was attempted, even if it was
    /// empty or failed. Distinguishes "no children" from "not explored".
    pub is_expanded: bool,
    pub children: Vec<FileRecord>,
}

impl FileRecord {
    /// Build a record for `entry` found in the directory at rootless `parent`.
    pub fn from_entry(entry: RawEntry, parent: &str) -> Self {
        let path = path_utils::join_rootless(parent, &entry.name);
        Self {
            name: entry.name,
            path,
            size: if entry.is_directory { 0 } else { entry.size },
            modified: entry.modified,
            is_directory: entry.is_directory,
            is_hidden: entry.is_hidden,
            is_symlink: entry.is_symlink,
            is_expanded: false,
            children: Vec::new(),
        }
    }
}
