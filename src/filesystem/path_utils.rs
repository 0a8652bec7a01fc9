use std::path::{Component, Path, PathBuf};

/// Lexically normalize a URI-style path.
///
/// Backslashes are treated as separators, redundant separators and `.`
/// segments are dropped and `..` removes the preceding segment. A `..` that
/// would climb above the filesystem root is discarded; on a relative path it
/// is kept so the caller can still detect the escape.
pub fn normalize(raw: &str) -> PathBuf {
    let unix = raw.trim().replace('\\', "/");
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;

    for component in Path::new(&unix).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                normalized.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    normalized.pop();
                    depth -= 1;
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(segment) => {
                normalized.push(segment);
                depth += 1;
            }
        }
    }

    normalized
}

/// Join two URI fragments the way a path string is composed, not the way
/// `Path::join` works: an absolute `tail` stays below `head`.
pub fn concat(head: &Path, tail: &str) -> PathBuf {
    normalize(&format!("{}/{}", head.display(), tail))
}

/// Rootless (`path-noscheme`) form of `path` relative to `root`.
///
/// Returns `None` when `path` is not below `root`.
pub fn to_rootless(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(segments.join("/"))
}

/// Append `name` to a rootless directory path.
pub fn join_rootless(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

pub fn has_wildcard(segment: &str) -> bool {
    segment.contains('*') || segment.contains('?')
}
