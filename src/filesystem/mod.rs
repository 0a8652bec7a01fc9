//! File store service
//!
//! Lists, searches, renames and deletes files below a document root and
//! shapes the results for the tree widget store.

pub mod config;
pub mod enumerator;
pub mod filter;
pub mod icon;
pub mod operations;
pub mod page;
pub mod path_utils;
pub mod pattern;
pub mod platform;
pub mod query;
pub mod record;
pub mod security;
pub mod sort;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use crate::protocol::{self, Status, StoreError, StoreResponse};

use config::StoreConfig;
use enumerator::{DirectoryEnumerator, FsEnumerator};
use operations::{FileOperations, Walk};
use query::{RenameArgs, RequestArgs};
use security::{PathGuard, ResolvedPaths};

pub use record::FileRecord;

pub struct FileStoreService<E = FsEnumerator> {
    guard: Arc<PathGuard>,
    ops: FileOperations<E>,
}

impl FileStoreService {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_enumerator(config, FsEnumerator)
    }
}

impl<E: DirectoryEnumerator> FileStoreService<E> {
    pub fn with_enumerator(config: StoreConfig, enumerator: E) -> Self {
        let config = Arc::new(config);
        let guard = Arc::new(PathGuard::new(config.clone()));
        let ops = FileOperations::new(enumerator, guard.clone(), config);
        Self { guard, ops }
    }

    /// Listing or query (`GET`).
    pub async fn list(&self, params: &HashMap<String, String>) -> Result<StoreResponse, StoreError> {
        let args = RequestArgs::decode(params)?;
        if args.options.debug {
            tracing::warn!(?args, "decoded request");
        }

        let paths = self
            .guard
            .resolve(args.base_path.as_deref(), args.path.as_deref())?;
        let walk = Walk::for_listing(&paths, &args, &self.guard);

        let records = match self.ops.list(&walk).await {
            Ok(Some(records)) => records,
            Ok(None) => return Ok(StoreResponse::empty(Status::NoContent)),
            Err(e) if protocol::is_not_found(&e) => {
                // Only echo what the client sent.
                let base_path = args.base_path.as_deref().unwrap_or("");
                return Err(StoreError::NotFound(
                    urlencoding::encode(base_path).into_owned(),
                ));
            }
            Err(e) => {
                let display = paths.rootless(&paths.target).unwrap_or_default();
                return Err(StoreError::from_io("list", &display, &e));
            }
        };

        let page = page::paginate(&records, args.start, args.count);
        if args.options.debug {
            tracing::warn!(found = records.len(), returned = page.len(), "listing complete");
        }
        Ok(StoreResponse::from_page(&page, args.options.icon_class))
    }

    /// Recursive delete (`DELETE`).
    pub async fn delete(&self, params: &HashMap<String, String>) -> Result<StoreResponse, StoreError> {
        let paths = self.resolve_mutation(params)?;
        let walk = Walk::for_mutation(&paths, &self.guard);
        let deleted = self.ops.remove(&walk).await?;
        let page: Vec<&FileRecord> = deleted.iter().collect();
        Ok(StoreResponse::from_page(&page, false))
    }

    /// Rename (`POST`).
    pub async fn rename(&self, params: &HashMap<String, String>) -> Result<StoreResponse, StoreError> {
        let rename = RenameArgs::decode(params)?;
        let paths = self.resolve_mutation(params)?;
        let walk = Walk::for_mutation(&paths, &self.guard);
        match self.ops.rename(&walk, &rename).await? {
            Some(record) => Ok(StoreResponse::from_page(&[&record], false)),
            None => Ok(StoreResponse::empty(Status::NoContent)),
        }
    }

    fn resolve_mutation(&self, params: &HashMap<String, String>) -> Result<ResolvedPaths, StoreError> {
        let path = params
            .get("path")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| StoreError::BadRequest("path is required".to_string()))?;
        let paths = self
            .guard
            .resolve(params.get("basePath").map(String::as_str), Some(path.as_str()))?;
        if !paths.names_file {
            return Err(StoreError::BadRequest("path must name a file".to_string()));
        }
        Ok(paths)
    }
}
