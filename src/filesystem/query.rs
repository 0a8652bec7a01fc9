//! Request argument decoding
//!
//! Turns the loosely-typed request parameters into typed options, predicates
//! and sort keys. JSON-valued parameters are decoded strictly: a parameter that
//! is present but malformed, or of the wrong JSON type, rejects the whole
//! request.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::protocol::StoreError;

use super::pattern;
use super::record::FileRecord;

/// File attributes addressable by `query` and `sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileAttribute {
    Name,
    Path,
    Directory,
    Size,
    Modified,
}

impl FileAttribute {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "name" => Some(FileAttribute::Name),
            "path" => Some(FileAttribute::Path),
            "directory" => Some(FileAttribute::Directory),
            "size" => Some(FileAttribute::Size),
            "modified" => Some(FileAttribute::Modified),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileAttribute::Name => "name",
            FileAttribute::Path => "path",
            FileAttribute::Directory => "directory",
            FileAttribute::Size => "size",
            FileAttribute::Modified => "modified",
        }
    }
}

/// Request-wide switches from `options` and `queryOptions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub deep: bool,
    pub load_all: bool,
    pub ignore_case: bool,
    pub show_hidden_files: bool,
    pub dirs_only: bool,
    pub icon_class: bool,
    pub debug: bool,
}

/// The literal or pattern a predicate tests against.
#[derive(Debug, Clone)]
pub enum PredicateValue {
    Pattern(Regex),
    Boolean(bool),
    Integer(i64),
    Null,
    /// Any other JSON value (floats, arrays, objects). Never matches.
    Other(Value),
}

/// One `query` clause.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub attribute: FileAttribute,
    pub value: PredicateValue,
}

impl Predicate {
    pub fn matches(&self, record: &FileRecord) -> bool {
        match (&self.value, self.attribute) {
            (PredicateValue::Pattern(re), FileAttribute::Name) => re.is_match(&record.name),
            (PredicateValue::Pattern(re), FileAttribute::Path) => re.is_match(&record.path),
            (PredicateValue::Pattern(_), _) => false,
            (PredicateValue::Boolean(b), FileAttribute::Directory) => *b == record.is_directory,
            (PredicateValue::Boolean(_), _) => false,
            (PredicateValue::Integer(n), FileAttribute::Size) => {
                i64::try_from(record.size).map_or(false, |size| size == *n)
            }
            (PredicateValue::Integer(n), FileAttribute::Modified) => record.modified == *n,
            (PredicateValue::Integer(_), _) => false,
            // `null` only ever asks for "not a directory".
            (PredicateValue::Null, FileAttribute::Directory) => !record.is_directory,
            (PredicateValue::Null, _) => false,
            (PredicateValue::Other(_), _) => false,
        }
    }
}

/// True when `record` satisfies every predicate. An empty list matches all.
pub fn matches_all(record: &FileRecord, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|predicate| predicate.matches(record))
}

/// One `sort` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub attribute: FileAttribute,
    pub descending: bool,
    pub ignore_case: bool,
}

/// Decoded request arguments.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub base_path: Option<String>,
    pub path: Option<String>,
    pub start: i64,
    pub count: i64,
    pub options: Options,
    pub query: Vec<Predicate>,
    pub sort: Vec<SortKey>,
}

impl RequestArgs {
    pub fn decode(params: &HashMap<String, String>) -> Result<Self, StoreError> {
        let options = decode_options(params)?;

        let query = match params.get("query") {
            Some(raw) => decode_query(&parse_json("query", raw)?, &options)?,
            None => Vec::new(),
        };
        let sort = match params.get("sort") {
            Some(raw) => decode_sort(&parse_json("sort", raw)?, &options)?,
            None => Vec::new(),
        };

        Ok(Self {
            base_path: params.get("basePath").cloned(),
            path: params.get("path").cloned(),
            start: decode_integer(params, "start"),
            count: decode_integer(params, "count"),
            options,
            query,
            sort,
        })
    }
}

/// Arguments of a rename (`POST`) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameArgs {
    pub attribute: FileAttribute,
    pub new_value: String,
}

impl RenameArgs {
    pub fn decode(params: &HashMap<String, String>) -> Result<Self, StoreError> {
        let attribute = params
            .get("attribute")
            .and_then(|name| FileAttribute::from_name(name))
            .filter(|attr| matches!(attr, FileAttribute::Name | FileAttribute::Path))
            .ok_or_else(|| StoreError::BadRequest("attribute must be name or path".to_string()))?;
        let new_value = params
            .get("newValue")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| StoreError::BadRequest("newValue is required".to_string()))?;
        Ok(Self {
            attribute,
            new_value,
        })
    }
}

fn parse_json(param: &str, raw: &str) -> Result<Value, StoreError> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::BadRequest(format!("{} is not valid JSON: {}", param, e)))
}

fn decode_integer(params: &HashMap<String, String>, name: &str) -> i64 {
    params
        .get(name)
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

fn decode_options(params: &HashMap<String, String>) -> Result<Options, StoreError> {
    let mut options = Options::default();

    if let Some(raw) = params.get("options") {
        let Value::Array(values) = parse_json("options", raw)? else {
            return Err(StoreError::BadRequest("options must be an array".to_string()));
        };
        for value in values {
            let Value::String(flag) = value else {
                return Err(StoreError::BadRequest(
                    "options must contain strings".to_string(),
                ));
            };
            match flag.as_str() {
                "showHiddenFiles" => options.show_hidden_files = true,
                "dirsOnly" => options.dirs_only = true,
                "iconClass" => options.icon_class = true,
                "debug" => options.debug = true,
                _ => {}
            }
        }
    }

    if let Some(raw) = params.get("queryOptions") {
        let Value::Object(map) = parse_json("queryOptions", raw)? else {
            return Err(StoreError::BadRequest(
                "queryOptions must be an object".to_string(),
            ));
        };
        options.deep = flag(&map, "deep");
        options.load_all = flag(&map, "loadAll");
        options.ignore_case = flag(&map, "ignoreCase");
        if options.load_all {
            options.deep = true;
        }
    }

    Ok(options)
}

/// Query options are truthy: zero, `""`, `false` and `null` are off.
fn flag(map: &serde_json::Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn decode_query(value: &Value, options: &Options) -> Result<Vec<Predicate>, StoreError> {
    let map = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        _ => return Err(StoreError::BadRequest("query must be an object".to_string())),
    };

    let mut predicates = Vec::with_capacity(map.len());
    for (property, value) in map {
        let Some(attribute) = FileAttribute::from_name(property) else {
            continue;
        };
        let value = match value {
            Value::String(glob) => match pattern::compile(glob, options.ignore_case) {
                Ok(Some(re)) => PredicateValue::Pattern(re),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(property = property.as_str(), "pattern dropped: {}", e);
                    continue;
                }
            },
            Value::Bool(b) => PredicateValue::Boolean(*b),
            Value::Null => PredicateValue::Null,
            Value::Number(n) => match n.as_i64() {
                Some(n) => PredicateValue::Integer(n),
                None => PredicateValue::Other(value.clone()),
            },
            other => PredicateValue::Other(other.clone()),
        };
        predicates.push(Predicate { attribute, value });
    }
    Ok(predicates)
}

fn decode_sort(value: &Value, options: &Options) -> Result<Vec<SortKey>, StoreError> {
    let entries = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(entries) => entries,
        _ => return Err(StoreError::BadRequest("sort must be an array".to_string())),
    };

    let keys = entries
        .iter()
        .filter_map(|entry| {
            let attribute = entry
                .get("attribute")
                .and_then(Value::as_str)
                .and_then(FileAttribute::from_name)?;
            let descending = entry.get("descending").and_then(Value::as_bool)?;
            let ignore_case = entry
                .get("ignoreCase")
                .and_then(Value::as_bool)
                .unwrap_or(options.ignore_case);
            Some(SortKey {
                attribute,
                descending,
                ignore_case,
            })
        })
        .collect();
    Ok(keys)
}
