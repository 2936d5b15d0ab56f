mod common;

use std::collections::HashSet;
use std::fs;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use bookshelf_resolver::store::LocalImageStore;

use common::files_in;

fn store(root: &TempDir) -> LocalImageStore {
    LocalImageStore::new(
        Utf8PathBuf::from_path_buf(root.path().to_path_buf()).unwrap(),
        "uploads",
    )
}

#[test]
fn stored_files_get_unique_names() {
    let root = TempDir::new().unwrap();
    let store = store(&root);
    store.ensure_root().unwrap();

    let first = store.store(b"first", 0).unwrap();
    let second = store.store(b"second", 0).unwrap();

    assert_ne!(first, second);
    for path in [&first, &second] {
        assert!(path.starts_with("uploads/cover_"), "{path}");
        assert!(path.ends_with(".jpg"), "{path}");
        assert!(!path.contains('\\'));
    }
    assert_eq!(files_in(root.path()).len(), 2);
    assert_eq!(
        fs::read(store.absolute_path(&second).unwrap()).unwrap(),
        b"second"
    );
}

#[test]
fn ensure_root_creates_nested_directories() {
    let root = TempDir::new().unwrap();
    let nested = root.path().join("static").join("uploads");
    let store = LocalImageStore::new(Utf8PathBuf::from_path_buf(nested.clone()).unwrap(), "uploads");

    store.ensure_root().unwrap();

    assert!(nested.is_dir());
}

#[test]
fn delete_reports_whether_a_file_was_removed() {
    let root = TempDir::new().unwrap();
    let store = store(&root);
    store.ensure_root().unwrap();
    let stored = store.store(b"cover", 1).unwrap();

    assert!(store.delete(&stored).unwrap());
    assert!(!store.delete(&stored).unwrap());
    assert!(store.delete("uploads/../outside.jpg").is_err());
    assert!(files_in(root.path()).is_empty());
}

#[test]
fn orphans_are_files_nothing_references() {
    let root = TempDir::new().unwrap();
    let store = store(&root);
    store.ensure_root().unwrap();
    let kept = store.store(b"kept", 0).unwrap();
    let orphan = store.store(b"orphaned", 0).unwrap();
    fs::write(root.path().join(".cover-download-inflight"), b"partial").unwrap();

    let referenced: HashSet<String> = [kept.clone()].into_iter().collect();
    let orphans = store.find_orphans(&referenced).unwrap();

    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].relative_path, orphan);
    assert_eq!(orphans[0].size, 8);

    assert_eq!(store.remove_orphans(&orphans), 1);
    assert!(store.absolute_path(&kept).unwrap().exists());
    assert!(!store.absolute_path(&orphan).unwrap().exists());
    assert!(store.find_orphans(&referenced).unwrap().is_empty());
}

#[test]
fn missing_root_has_no_orphans() {
    let root = TempDir::new().unwrap();
    let store = LocalImageStore::new(
        Utf8PathBuf::from_path_buf(root.path().join("absent")).unwrap(),
        "uploads",
    );
    assert!(store.find_orphans(&HashSet::new()).unwrap().is_empty());
}

#[cfg(unix)]
#[test]
fn orphan_scan_ignores_symlinks() {
    use std::os::unix::fs::symlink;

    let root = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("keep-me.jpg"), b"not ours").unwrap();

    let store = store(&root);
    store.ensure_root().unwrap();
    let orphan = store.store(b"orphaned", 0).unwrap();
    symlink(root.path(), root.path().join("loop")).unwrap();
    symlink(outside.path(), root.path().join("elsewhere")).unwrap();
    symlink(
        outside.path().join("keep-me.jpg"),
        root.path().join("linked.jpg"),
    )
    .unwrap();

    let orphans = store.find_orphans(&HashSet::new()).unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].relative_path, orphan);

    assert_eq!(store.remove_orphans(&orphans), 1);
    assert!(outside.path().join("keep-me.jpg").exists());
}
