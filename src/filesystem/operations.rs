use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::{FutureExt, LocalBoxFuture};
use tokio::fs;

use crate::protocol::StoreError;

use super::config::StoreConfig;
use super::enumerator::{DirectoryEnumerator, FsEnumerator, SearchPattern};
use super::filter::EntryFilter;
use super::path_utils;
use super::query::{matches_all, FileAttribute, Predicate, RenameArgs, RequestArgs, SortKey};
use super::record::FileRecord;
use super::security::{PathGuard, ResolvedPaths};
use super::sort::insert_sorted;

/// Per-request traversal settings shared by every level of a recursive walk.
pub struct Walk<'a> {
    pub paths: &'a ResolvedPaths,
    pub filter: EntryFilter<'a>,
    pub query: &'a [Predicate],
    pub sort: &'a [SortKey],
    pub deep: bool,
}

impl<'a> Walk<'a> {
    pub fn for_listing(paths: &'a ResolvedPaths, args: &'a RequestArgs, guard: &'a PathGuard) -> Self {
        Self {
            paths,
            filter: EntryFilter::new(&args.options, guard),
            query: &args.query,
            sort: &args.sort,
            deep: args.options.deep,
        }
    }

    /// Rename and delete see hidden files, never sort and never go deep.
    pub fn for_mutation(paths: &'a ResolvedPaths, guard: &'a PathGuard) -> Self {
        Self {
            paths,
            filter: EntryFilter::for_mutation(guard),
            query: &[],
            sort: &[],
            deep: false,
        }
    }
}

pub struct FileOperations<E = FsEnumerator> {
    enumerator: E,
    guard: Arc<PathGuard>,
    config: Arc<StoreConfig>,
}

impl<E: DirectoryEnumerator> FileOperations<E> {
    pub fn new(enumerator: E, guard: Arc<PathGuard>, config: Arc<StoreConfig>) -> Self {
        Self {
            enumerator,
            guard,
            config,
        }
    }

    /// Serve a listing request.
    ///
    /// A request naming a file looks that file up; otherwise the root dir is
    /// searched with the query, or listed as a tree when there is no query.
    /// `Ok(None)` means the named file exists but is filtered out.
    pub async fn list(&self, walk: &Walk<'_>) -> io::Result<Option<Vec<FileRecord>>> {
        if walk.paths.names_file {
            let found = self
                .get_file(walk, SearchPattern::for_target(&walk.paths.target))
                .await?;
            return Ok(found.map(|record| vec![record]));
        }

        let root_dir = walk.paths.root_dir.clone();
        let records = if walk.query.is_empty() {
            self.get_directory(walk, root_dir, 0).await?
        } else {
            self.get_match(walk, root_dir, true, 0).await?
        };
        Ok(Some(records))
    }

    /// List `dir` as a tree. Children are attached, and expanded, only on a
    /// deep walk.
    pub fn get_directory<'a>(
        &'a self,
        walk: &'a Walk<'a>,
        dir: PathBuf,
        depth: usize,
    ) -> LocalBoxFuture<'a, io::Result<Vec<FileRecord>>> {
        async move {
            let parent = walk.paths.rootless(&dir).unwrap_or_default();
            let entries = self
                .enumerator
                .enumerate(&SearchPattern::children_of(&dir))
                .await?;

            let mut listing = Vec::with_capacity(entries.len());
            for entry in entries {
                let mut record = FileRecord::from_entry(entry, &parent);
                if walk.filter.excludes(&record) {
                    continue;
                }
                if record.is_directory && walk.deep && self.should_descend(&record, depth) {
                    record.children = self
                        .get_directory(walk, dir.join(&record.name), depth + 1)
                        .await
                        .unwrap_or_else(|e| {
                            tracing::debug!(path = %record.path, "listing failed: {}", e);
                            Vec::new()
                        });
                    record.is_expanded = true;
                }
                insert_sorted(&mut listing, record, walk.sort);
            }
            Ok(listing)
        }
        .boxed_local()
    }

    /// Flat list of everything at or below `dir` matching the query.
    ///
    /// Only the outermost call keeps its result sorted; deeper levels return
    /// matches in discovery order and the caller merges them in.
    pub fn get_match<'a>(
        &'a self,
        walk: &'a Walk<'a>,
        dir: PathBuf,
        sorted: bool,
        depth: usize,
    ) -> LocalBoxFuture<'a, io::Result<Vec<FileRecord>>> {
        async move {
            let keys: &[SortKey] = if sorted { walk.sort } else { &[] };
            let parent = walk.paths.rootless(&dir).unwrap_or_default();
            let entries = self
                .enumerator
                .enumerate(&SearchPattern::children_of(&dir))
                .await?;

            let mut found = Vec::new();
            for entry in entries {
                let record = FileRecord::from_entry(entry, &parent);
                if walk.filter.excludes(&record) {
                    continue;
                }

                let subdir = (record.is_directory
                    && walk.deep
                    && self.should_descend(&record, depth))
                .then(|| dir.join(&record.name));
                let shown = record.path.clone();

                if matches_all(&record, walk.query) {
                    insert_sorted(&mut found, record, keys);
                }

                let Some(subdir) = subdir else {
                    continue;
                };
                match self.get_match(walk, subdir, false, depth + 1).await {
                    Ok(children) if keys.is_empty() => found.extend(children),
                    Ok(children) => {
                        for child in children {
                            insert_sorted(&mut found, child, keys);
                        }
                    }
                    Err(e) => tracing::debug!(path = %shown, "search failed: {}", e),
                }
            }
            Ok(found)
        }
        .boxed_local()
    }

    /// First entry matching `pattern`. A directory comes back with its
    /// children attached and marked expanded.
    pub async fn get_file(
        &self,
        walk: &Walk<'_>,
        pattern: SearchPattern,
    ) -> io::Result<Option<FileRecord>> {
        let parent = walk.paths.rootless(&pattern.directory).unwrap_or_default();
        let entry = self
            .enumerator
            .enumerate(&pattern)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

        let mut record = FileRecord::from_entry(entry, &parent);
        if walk.filter.excludes(&record) {
            return Ok(None);
        }
        if record.is_directory {
            let dir = pattern.directory.join(&record.name);
            record.children = self
                .get_directory(walk, dir, 1)
                .await
                .unwrap_or_else(|e| {
                    tracing::debug!(path = %record.path, "listing failed: {}", e);
                    Vec::new()
                });
            record.is_expanded = true;
        }
        Ok(Some(record))
    }

    /// Delete the file or directory tree at the request target.
    ///
    /// Returns every record removed, children before their directory. The
    /// first failure stops the walk; whatever was removed before it stays
    /// removed.
    pub async fn remove(&self, walk: &Walk<'_>) -> Result<Vec<FileRecord>, StoreError> {
        let display = walk.paths.rootless(&walk.paths.target).unwrap_or_default();
        let pattern = SearchPattern::for_target(&walk.paths.target);
        let directory = pattern.directory.clone();
        let record = match self.get_file(walk, pattern).await {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::from_io("delete", &display, &e)),
        };

        let mut deleted = Vec::new();
        let full = directory.join(&record.name);
        self.remove_record(walk, full, record, &mut deleted).await?;
        Ok(deleted)
    }

    fn remove_record<'a>(
        &'a self,
        walk: &'a Walk<'a>,
        full: PathBuf,
        mut record: FileRecord,
        deleted: &'a mut Vec<FileRecord>,
    ) -> LocalBoxFuture<'a, Result<(), StoreError>> {
        async move {
            if record.is_directory && !record.is_symlink {
                let children = if record.is_expanded {
                    std::mem::take(&mut record.children)
                } else {
                    self.get_directory(walk, full.clone(), 1)
                        .await
                        .map_err(|e| StoreError::from_io("delete", &record.path, &e))?
                };
                for child in children {
                    let child_path = full.join(&child.name);
                    self.remove_record(walk, child_path, child, deleted).await?;
                }
                fs::remove_dir(&full)
                    .await
                    .map_err(|e| StoreError::from_io("delete", &record.path, &e))?;
            } else {
                fs::remove_file(&full)
                    .await
                    .map_err(|e| StoreError::from_io("delete", &record.path, &e))?;
            }

            tracing::debug!(path = %record.path, "deleted");
            record.children.clear();
            record.is_expanded = false;
            deleted.push(record);
            Ok(())
        }
        .boxed_local()
    }

    /// Rename the request target; `Ok(None)` when the target is filtered out.
    pub async fn rename(
        &self,
        walk: &Walk<'_>,
        args: &RenameArgs,
    ) -> Result<Option<FileRecord>, StoreError> {
        let paths = walk.paths;
        let display = paths.rootless(&paths.target).unwrap_or_default();
        let pattern = SearchPattern::for_target(&paths.target);
        let directory = pattern.directory.clone();
        let record = match self.get_file(walk, pattern).await {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(e) => return Err(StoreError::from_io("rename", &display, &e)),
        };

        let source = directory.join(&record.name);
        let destination = match args.attribute {
            FileAttribute::Name => path_utils::concat(&directory, &args.new_value),
            FileAttribute::Path => path_utils::concat(&paths.root_dir, &args.new_value),
            other => {
                return Err(StoreError::BadRequest(format!(
                    "cannot rename by {}",
                    other.as_str()
                )))
            }
        };
        self.guard.ensure_within(&paths.root_dir, &destination)?;

        let new_display = paths.rootless(&destination).unwrap_or_default();
        if destination != source && fs::symlink_metadata(&destination).await.is_ok() {
            return Err(StoreError::Conflict(new_display));
        }

        fs::rename(&source, &destination)
            .await
            .map_err(|e| StoreError::from_io("rename", &record.path, &e))?;
        tracing::debug!(from = %record.path, to = %new_display, "renamed");

        self.get_file(walk, SearchPattern::exact(&destination))
            .await
            .map_err(|e| StoreError::from_io("rename", &new_display, &e))
    }

    fn should_descend(&self, record: &FileRecord, depth: usize) -> bool {
        if record.is_symlink && !self.config.follow_symlinks {
            tracing::debug!(path = %record.path, "not following symlinked directory");
            return false;
        }
        if depth >= self.config.max_depth {
            tracing::warn!(
                path = %record.path,
                max_depth = self.config.max_depth,
                "directory nesting exceeds limit; not expanded"
            );
            return false;
        }
        true
    }
}

