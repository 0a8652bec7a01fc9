//! Response shapes and error taxonomy
//!
//! Compatible with the tree widget file store protocol: every successful
//! response is a JSON envelope keyed by `path` and labelled by `name`.

use std::io;

use serde::Serialize;

use crate::filesystem::icon;
use crate::filesystem::FileRecord;

/// Attribute the client uses to identify items.
pub const STORE_IDENTIFIER: &str = "path";
/// Attribute the client uses to label items.
pub const STORE_LABEL: &str = "name";

/// HTTP status codes produced by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NoContent,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Conflict,
    ServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::Unauthorized => 401,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::Conflict => 409,
            Status::ServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NoContent => "No Content",
            Status::BadRequest => "Bad Request",
            Status::Unauthorized => "Unauthorized",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::Conflict => "Conflict",
            Status::ServerError => "Internal Server Error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Carries only the client-supplied location, never a resolved path.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("server error: {0}")]
    ServerError(String),
}

impl StoreError {
    pub fn status(&self) -> Status {
        match self {
            StoreError::BadRequest(_) => Status::BadRequest,
            StoreError::Forbidden(_) => Status::Forbidden,
            StoreError::NotFound(_) => Status::NotFound,
            StoreError::MethodNotAllowed(_) => Status::MethodNotAllowed,
            StoreError::Unauthorized(_) => Status::Unauthorized,
            StoreError::Conflict(_) => Status::Conflict,
            StoreError::ServerError(_) => Status::ServerError,
        }
    }

    /// Text sent to the client in the failure body.
    pub fn client_message(&self) -> &str {
        match self {
            StoreError::BadRequest(msg)
            | StoreError::Forbidden(msg)
            | StoreError::NotFound(msg)
            | StoreError::MethodNotAllowed(msg)
            | StoreError::Unauthorized(msg)
            | StoreError::Conflict(msg)
            | StoreError::ServerError(msg) => msg,
        }
    }

    /// Map a filesystem error raised while operating on `display_path`.
    ///
    /// The raw OS code is logged; the returned error only carries
    /// `display_path`, which must be a rootless path.
    pub fn from_io(operation: &str, display_path: &str, err: &io::Error) -> Self {
        tracing::warn!(
            operation,
            path = display_path,
            os_error = ?err.raw_os_error(),
            "filesystem operation failed: {}",
            err
        );
        match err.kind() {
            _ if is_not_found(err) => StoreError::NotFound(display_path.to_string()),
            io::ErrorKind::AlreadyExists => StoreError::Conflict(display_path.to_string()),
            io::ErrorKind::PermissionDenied => StoreError::Unauthorized(display_path.to_string()),
            _ if is_unauthorized_os_error(err) => StoreError::Unauthorized(display_path.to_string()),
            _ => StoreError::ServerError(format!("{} failed", operation)),
        }
    }
}

/// True when `err` means the path does not resolve to anything, including a
/// path that runs through a regular file.
pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound || is_not_a_directory(err)
}

#[cfg(unix)]
fn is_not_a_directory(err: &io::Error) -> bool {
    // ENOTDIR
    err.raw_os_error() == Some(20)
}

#[cfg(not(unix))]
fn is_not_a_directory(err: &io::Error) -> bool {
    // ERROR_PATH_NOT_FOUND, ERROR_DIRECTORY.
    matches!(err.raw_os_error(), Some(3 | 267))
}

#[cfg(unix)]
fn is_unauthorized_os_error(err: &io::Error) -> bool {
    // EPERM, EBUSY, EXDEV, EROFS, ENOTEMPTY (linux and bsd numbering).
    matches!(err.raw_os_error(), Some(1 | 16 | 18 | 30 | 39 | 66))
}

#[cfg(not(unix))]
fn is_unauthorized_os_error(err: &io::Error) -> bool {
    // ERROR_ACCESS_DENIED, ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION,
    // ERROR_NOT_SAME_DEVICE, ERROR_WRITE_PROTECT, ERROR_DIR_NOT_EMPTY.
    matches!(err.raw_os_error(), Some(5 | 32 | 33 | 17 | 19 | 145))
}

/// A single file as sent to the client.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub modified: i64,
    pub directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    #[serde(rename = "iconClass", skip_serializing_if = "Option::is_none")]
    pub icon_class: Option<String>,
}

impl FileInfo {
    pub fn from_record(record: &FileRecord, include_icon: bool) -> Self {
        let (children, expanded) = if record.is_expanded {
            let children = record
                .children
                .iter()
                .map(|child| FileInfo::from_record(child, include_icon))
                .collect();
            (Some(children), Some(true))
        } else {
            (None, None)
        };

        FileInfo {
            name: record.name.clone(),
            path: record.path.clone(),
            size: record.size,
            modified: record.modified,
            directory: record.is_directory,
            children,
            expanded,
            icon_class: include_icon.then(|| icon::icon_class(&record.name, record.is_directory)),
        }
    }
}

/// Envelope wrapping every successful response.
#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse {
    pub identifier: &'static str,
    pub label: &'static str,
    pub total: usize,
    pub status: u16,
    pub items: Vec<FileInfo>,
}

impl StoreResponse {
    /// Build the envelope over a page of records.
    pub fn from_page(page: &[&FileRecord], include_icon: bool) -> Self {
        let items: Vec<FileInfo> = page
            .iter()
            .map(|record| FileInfo::from_record(record, include_icon))
            .collect();
        let status = if items.is_empty() {
            Status::NoContent
        } else {
            Status::Ok
        };
        Self {
            identifier: STORE_IDENTIFIER,
            label: STORE_LABEL,
            total: items.len(),
            status: status.code(),
            items,
        }
    }

    pub fn empty(status: Status) -> Self {
        Self {
            identifier: STORE_IDENTIFIER,
            label: STORE_LABEL,
            total: 0,
            status: status.code(),
            items: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| {
            tracing::error!("Failed to serialize StoreResponse: {}", e);
            StoreError::ServerError("JSON encoding failed".to_string())
        })
    }
}
