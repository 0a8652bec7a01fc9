use std::collections::HashMap;

use tempfile::TempDir;

use crate::protocol::{FileInfo, Status, StoreError, StoreResponse};

use super::config::StoreConfig;
use super::enumerator::MemoryEnumerator;
use super::FileStoreService;

const ROOT: &str = "/srv/www";

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn paths(response: &StoreResponse) -> Vec<&str> {
    response.items.iter().map(|i| i.path.as_str()).collect()
}

fn child_paths(info: &FileInfo) -> Vec<&str> {
    info.children
        .as_ref()
        .map(|c| c.iter().map(|i| i.path.as_str()).collect())
        .unwrap_or_default()
}

/// `/srv/www/{a.txt, sub/{b.txt, c.md}, empty/, .hidden}`
fn sample_tree() -> MemoryEnumerator {
    MemoryEnumerator::new()
        .dir(
            ROOT,
            vec![
                MemoryEnumerator::file("a.txt", 10, 100),
                MemoryEnumerator::subdir("sub"),
                MemoryEnumerator::subdir("empty"),
                MemoryEnumerator::file(".hidden", 1, 100),
            ],
        )
        .dir(
            format!("{}/sub", ROOT),
            vec![
                MemoryEnumerator::file("b.txt", 20, 200),
                MemoryEnumerator::file("c.md", 30, 300),
            ],
        )
        .dir(format!("{}/empty", ROOT), vec![])
}

fn memory_service(enumerator: MemoryEnumerator) -> FileStoreService<MemoryEnumerator> {
    FileStoreService::with_enumerator(StoreConfig::new(ROOT), enumerator)
}

fn fs_service(temp: &TempDir) -> FileStoreService {
    FileStoreService::new(StoreConfig::new(temp.path()))
}

#[tokio::test]
async fn test_deep_query_returns_flat_matches() {
    let service = memory_service(sample_tree());
    let response = service
        .list(&params(&[
            ("query", r#"{"name":"*.txt"}"#),
            ("queryOptions", r#"{"deep":true}"#),
        ]))
        .await
        .unwrap();

    assert_eq!(paths(&response), ["a.txt", "sub/b.txt"]);
    assert!(response.items.iter().all(|i| i.children.is_none()));
    assert_eq!(response.status, 200);
    assert_eq!(response.total, 2);
}

#[tokio::test]
async fn test_shallow_query_stays_in_root_dir() {
    let service = memory_service(sample_tree());
    let response = service
        .list(&params(&[("query", r#"{"name":"*.txt"}"#)]))
        .await
        .unwrap();
    assert_eq!(paths(&response), ["a.txt"]);
}

#[tokio::test]
async fn test_load_all_searches_like_deep() {
    let service = memory_service(sample_tree());
    let query = ("query", r#"{"directory":false}"#);
    let load_all = service
        .list(&params(&[query, ("queryOptions", r#"{"loadAll":true}"#)]))
        .await
        .unwrap();
    let deep = service
        .list(&params(&[query, ("queryOptions", r#"{"deep":true,"loadAll":true}"#)]))
        .await
        .unwrap();
    assert_eq!(paths(&load_all), ["a.txt", "sub/b.txt", "sub/c.md"]);
    assert_eq!(paths(&load_all), paths(&deep));
}

#[tokio::test]
async fn test_sorted_deep_query_merges_children_in_order() {
    let service = memory_service(sample_tree());
    let response = service
        .list(&params(&[
            ("query", r#"{"directory":false}"#),
            ("queryOptions", r#"{"deep":true}"#),
            ("sort", r#"[{"attribute":"size","descending":true}]"#),
        ]))
        .await
        .unwrap();
    assert_eq!(paths(&response), ["sub/c.md", "sub/b.txt", "a.txt"]);
}

#[tokio::test]
async fn test_null_query_value_selects_files() {
    let service = memory_service(sample_tree());
    let response = service
        .list(&params(&[("query", r#"{"directory":null}"#)]))
        .await
        .unwrap();
    assert_eq!(paths(&response), ["a.txt"]);
}

#[tokio::test]
async fn test_listing_without_deep_leaves_directories_unexpanded() {
    let service = memory_service(sample_tree());
    let response = service.list(&HashMap::new()).await.unwrap();

    assert_eq!(paths(&response), ["a.txt", "sub", "empty"]);
    let sub = &response.items[1];
    assert!(sub.directory);
    assert!(sub.children.is_none());
    assert!(sub.expanded.is_none());
}

#[tokio::test]
async fn test_deep_listing_builds_tree() {
    let service = memory_service(sample_tree());
    let response = service
        .list(&params(&[("queryOptions", r#"{"deep":true}"#)]))
        .await
        .unwrap();

    assert_eq!(paths(&response), ["a.txt", "sub", "empty"]);
    let sub = &response.items[1];
    assert_eq!(sub.expanded, Some(true));
    assert_eq!(child_paths(sub), ["sub/b.txt", "sub/c.md"]);

    // Explored but empty is distinct from never explored.
    let empty = &response.items[2];
    assert_eq!(empty.expanded, Some(true));
    assert_eq!(empty.children.as_deref().map(<[FileInfo]>::len), Some(0));
}

#[tokio::test]
async fn test_listing_sorts_each_level() {
    let service = memory_service(sample_tree());
    let response = service
        .list(&params(&[
            ("queryOptions", r#"{"deep":true}"#),
            (
                "sort",
                r#"[{"attribute":"directory","descending":true},{"attribute":"name","descending":false}]"#,
            ),
        ]))
        .await
        .unwrap();
    assert_eq!(paths(&response), ["empty", "sub", "a.txt"]);
}

#[tokio::test]
async fn test_hidden_files_need_option() {
    let service = memory_service(sample_tree());
    let hidden = service
        .list(&params(&[("options", r#"["showHiddenFiles"]"#)]))
        .await
        .unwrap();
    assert!(paths(&hidden).contains(&".hidden"));

    let dirs = service
        .list(&params(&[("options", r#"["dirsOnly"]"#)]))
        .await
        .unwrap();
    assert_eq!(paths(&dirs), ["sub", "empty"]);
}

#[tokio::test]
async fn test_pagination_applies_to_top_level() {
    let service = memory_service(sample_tree());
    let page = service
        .list(&params(&[("start", "1"), ("count", "1")]))
        .await
        .unwrap();
    assert_eq!(paths(&page), ["sub"]);
    assert_eq!(page.total, 1);

    let past_end = service.list(&params(&[("start", "9")])).await.unwrap();
    assert_eq!(past_end.status, 204);
    assert!(past_end.items.is_empty());
}

#[tokio::test]
async fn test_path_to_directory_returns_its_children() {
    let service = memory_service(sample_tree());
    let response = service.list(&params(&[("path", "sub")])).await.unwrap();

    assert_eq!(paths(&response), ["sub"]);
    let sub = &response.items[0];
    assert_eq!(sub.expanded, Some(true));
    assert_eq!(child_paths(sub), ["sub/b.txt", "sub/c.md"]);
}

#[tokio::test]
async fn test_wildcard_path_returns_first_match() {
    let service = memory_service(sample_tree());
    let response = service
        .list(&params(&[("path", "/sub/*.*")]))
        .await
        .unwrap();
    assert_eq!(paths(&response), ["sub/b.txt"]);
}

#[tokio::test]
async fn test_base_path_scopes_rootless_paths() {
    let service = memory_service(sample_tree());
    let response = service
        .list(&params(&[("basePath", "/sub/")]))
        .await
        .unwrap();
    assert_eq!(paths(&response), ["b.txt", "c.md"]);
}

#[tokio::test]
async fn test_filtered_path_is_no_content() {
    let service = memory_service(sample_tree());
    let response = service.list(&params(&[("path", ".hidden")])).await.unwrap();
    assert_eq!(response.status, Status::NoContent.code());
    assert!(response.items.is_empty());
}

#[tokio::test]
async fn test_missing_path_is_not_found_without_leaking_paths() {
    let service = memory_service(sample_tree());
    let err = service
        .list(&params(&[("basePath", "no such")]))
        .await
        .unwrap_err();
    match err {
        StoreError::NotFound(message) => assert_eq!(message, "no%20such"),
        other => panic!("expected NotFound, got {:?}", other),
    }

    let err = service.list(&params(&[("path", "nope.txt")])).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ref m) if m.is_empty()));
}

#[tokio::test]
async fn test_path_through_a_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.txt"), "a").unwrap();
    let service = fs_service(&temp);

    let err = service
        .list(&params(&[("path", "a.txt/b.txt")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    let err = service
        .list(&params(&[("basePath", "a.txt")]))
        .await
        .unwrap_err();
    match err {
        StoreError::NotFound(message) => assert_eq!(message, "a.txt"),
        other => panic!("expected NotFound, got {:?}", other),
    }

    let err = service
        .delete(&params(&[("path", "a.txt/b.txt")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);
}

#[tokio::test]
async fn test_escaping_base_path_is_forbidden() {
    let service = memory_service(sample_tree());
    let err = service
        .list(&params(&[("basePath", "../../etc")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::Forbidden);
    assert_eq!(err.client_message(), "We're not going there.");
}

#[tokio::test]
async fn test_bad_parameters_reject_request() {
    let service = memory_service(sample_tree());
    let err = service
        .list(&params(&[("queryOptions", "{deep:true}")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::BadRequest);
}

#[tokio::test]
async fn test_debug_option_does_not_change_listing() {
    let service = memory_service(sample_tree());
    let plain = service.list(&HashMap::new()).await.unwrap();
    let debug = service
        .list(&params(&[("options", r#"["debug"]"#)]))
        .await
        .unwrap();
    assert_eq!(paths(&debug), paths(&plain));
    assert_eq!(debug.status, Status::Ok.code());
}

#[tokio::test]
async fn test_icon_class_option() {
    let service = memory_service(sample_tree());
    let response = service
        .list(&params(&[("options", r#"["iconClass"]"#)]))
        .await
        .unwrap();
    let icons: Vec<&str> = response
        .items
        .iter()
        .filter_map(|i| i.icon_class.as_deref())
        .collect();
    assert_eq!(
        icons,
        ["fileIconTxt fileIcon", "fileIconDIR fileIcon", "fileIconDIR fileIcon"]
    );
}

#[tokio::test]
async fn test_depth_limit_stops_expansion() {
    let enumerator = MemoryEnumerator::new()
        .dir(ROOT, vec![MemoryEnumerator::subdir("one")])
        .dir(format!("{}/one", ROOT), vec![MemoryEnumerator::subdir("two")])
        .dir(
            format!("{}/one/two", ROOT),
            vec![MemoryEnumerator::file("deep.txt", 1, 1)],
        );
    let config = StoreConfig {
        max_depth: 1,
        ..StoreConfig::new(ROOT)
    };
    let service = FileStoreService::with_enumerator(config, enumerator);
    let response = service
        .list(&params(&[("queryOptions", r#"{"deep":true}"#)]))
        .await
        .unwrap();

    let one = &response.items[0];
    assert_eq!(one.expanded, Some(true));
    let two = &one.children.as_ref().unwrap()[0];
    assert_eq!(two.path, "one/two");
    assert!(two.expanded.is_none());
}

#[tokio::test]
async fn test_symlinked_directories_are_not_descended() {
    let mut link = MemoryEnumerator::subdir("link");
    link.is_symlink = true;
    let enumerator = MemoryEnumerator::new()
        .dir(ROOT, vec![link])
        .dir(
            format!("{}/link", ROOT),
            vec![MemoryEnumerator::file("x.txt", 1, 1)],
        );

    let service = FileStoreService::with_enumerator(StoreConfig::new(ROOT), enumerator.clone());
    let response = service
        .list(&params(&[("queryOptions", r#"{"deep":true}"#)]))
        .await
        .unwrap();
    assert!(response.items[0].expanded.is_none());

    let config = StoreConfig {
        follow_symlinks: true,
        ..StoreConfig::new(ROOT)
    };
    let service = FileStoreService::with_enumerator(config, enumerator);
    let response = service
        .list(&params(&[("queryOptions", r#"{"deep":true}"#)]))
        .await
        .unwrap();
    assert_eq!(child_paths(&response.items[0]), ["link/x.txt"]);
}

#[tokio::test]
async fn test_list_real_directory() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("dir_a")).unwrap();
    std::fs::write(temp.path().join("file_b.txt"), "bb").unwrap();
    std::fs::write(temp.path().join("file_a.txt"), "a").unwrap();
    std::fs::write(temp.path().join(".htaccess"), "deny").unwrap();

    let service = fs_service(&temp);
    let response = service
        .list(&params(&[
            ("options", r#"["showHiddenFiles"]"#),
            ("sort", r#"[{"attribute":"name","descending":false}]"#),
        ]))
        .await
        .unwrap();

    // Denied names never show, even with hidden files on.
    assert_eq!(paths(&response), ["dir_a", "file_a.txt", "file_b.txt"]);
    assert_eq!(response.items[2].size, 2);
    assert_eq!(response.items[0].size, 0);
}

#[tokio::test]
async fn test_delete_directory_tree() {
    let temp = TempDir::new().unwrap();
    let tree = temp.path().join("tree");
    std::fs::create_dir_all(tree.join("nested")).unwrap();
    std::fs::write(tree.join("a.txt"), "a").unwrap();
    std::fs::write(tree.join(".dot"), "d").unwrap();
    std::fs::write(tree.join("nested/b.txt"), "b").unwrap();

    let service = fs_service(&temp);
    let response = service.delete(&params(&[("path", "tree")])).await.unwrap();

    assert!(!tree.exists());
    let mut deleted = paths(&response);
    assert_eq!(deleted.pop(), Some("tree"));
    deleted.sort();
    assert_eq!(
        deleted,
        ["tree/.dot", "tree/a.txt", "tree/nested", "tree/nested/b.txt"]
    );
    assert!(response.items.iter().all(|i| i.children.is_none()));
}

#[tokio::test]
async fn test_delete_reports_children_before_their_directory() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("d/e")).unwrap();
    std::fs::write(temp.path().join("d/e/f.txt"), "f").unwrap();

    let service = fs_service(&temp);
    let response = service.delete(&params(&[("path", "d")])).await.unwrap();
    assert_eq!(paths(&response), ["d/e/f.txt", "d/e", "d"]);
}

#[tokio::test]
async fn test_delete_errors() {
    let temp = TempDir::new().unwrap();
    let service = fs_service(&temp);

    let missing = service
        .delete(&params(&[("path", "gone.txt")]))
        .await
        .unwrap_err();
    assert_eq!(missing.status(), Status::NotFound);

    let no_path = service.delete(&HashMap::new()).await.unwrap_err();
    assert_eq!(no_path.status(), Status::BadRequest);

    let root = service.delete(&params(&[("path", "/")])).await.unwrap_err();
    assert_eq!(root.status(), Status::BadRequest);

    let escape = service
        .delete(&params(&[("path", "../elsewhere")]))
        .await
        .unwrap_err();
    assert_eq!(escape.status(), Status::Forbidden);
}

#[tokio::test]
async fn test_rename_by_name_and_path() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("docs")).unwrap();
    std::fs::write(temp.path().join("docs/old.txt"), "x").unwrap();

    let service = fs_service(&temp);
    let response = service
        .rename(&params(&[
            ("path", "docs/old.txt"),
            ("attribute", "name"),
            ("newValue", "new.txt"),
        ]))
        .await
        .unwrap();
    assert_eq!(paths(&response), ["docs/new.txt"]);
    assert!(temp.path().join("docs/new.txt").exists());
    assert!(!temp.path().join("docs/old.txt").exists());

    let response = service
        .rename(&params(&[
            ("path", "docs/new.txt"),
            ("attribute", "path"),
            ("newValue", "moved.txt"),
        ]))
        .await
        .unwrap();
    assert_eq!(paths(&response), ["moved.txt"]);
    assert!(temp.path().join("moved.txt").exists());
}

#[tokio::test]
async fn test_rename_conflict_and_escape() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.txt"), "a").unwrap();
    std::fs::write(temp.path().join("b.txt"), "b").unwrap();

    let service = fs_service(&temp);
    let conflict = service
        .rename(&params(&[
            ("path", "a.txt"),
            ("attribute", "name"),
            ("newValue", "b.txt"),
        ]))
        .await
        .unwrap_err();
    assert_eq!(conflict.status(), Status::Conflict);
    assert_eq!(std::fs::read_to_string(temp.path().join("b.txt")).unwrap(), "b");

    let escape = service
        .rename(&params(&[
            ("path", "a.txt"),
            ("attribute", "path"),
            ("newValue", "../../outside.txt"),
        ]))
        .await
        .unwrap_err();
    assert_eq!(escape.status(), Status::Forbidden);
    assert!(temp.path().join("a.txt").exists());

    let bad = service
        .rename(&params(&[
            ("path", "a.txt"),
            ("attribute", "size"),
            ("newValue", "1"),
        ]))
        .await
        .unwrap_err();
    assert_eq!(bad.status(), Status::BadRequest);
}
