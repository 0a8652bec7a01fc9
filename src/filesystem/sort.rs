use std::cmp::Ordering;

use super::query::{FileAttribute, SortKey};
use super::record::FileRecord;

/// Three-way comparison of two records under `keys`, first key first.
pub fn compare(a: &FileRecord, b: &FileRecord, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = match key.attribute {
            FileAttribute::Name => compare_text(&a.name, &b.name, key.ignore_case),
            FileAttribute::Path => compare_text(&a.path, &b.path, key.ignore_case),
            FileAttribute::Size => a.size.cmp(&b.size),
            FileAttribute::Modified => a.modified.cmp(&b.modified),
            FileAttribute::Directory => a.is_directory.cmp(&b.is_directory),
        };
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_text(a: &str, b: &str, ignore_case: bool) -> Ordering {
    if ignore_case {
        a.to_lowercase().cmp(&b.to_lowercase())
    } else {
        a.cmp(b)
    }
}

/// Insert `record` into the already sorted `list`.
///
/// The record goes before the first entry that compares greater, so equal
/// records keep their discovery order. Without keys it is appended.
pub fn insert_sorted(list: &mut Vec<FileRecord>, record: FileRecord, keys: &[SortKey]) {
    if keys.is_empty() {
        list.push(record);
        return;
    }
    let index = list
        .iter()
        .position(|existing| compare(existing, &record, keys) == Ordering::Greater)
        .unwrap_or(list.len());
    list.insert(index, record);
}
