mod common;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use common::{create_workspace, write_file};
use phpantom_core::config::Config;
use phpantom_core::{Backend, ProjectIndexer};

fn path_of(root: &Path, rel: &str) -> String {
    root.join(rel).to_string_lossy().into_owned()
}

fn index_dir(backend: &Backend, root: &Path) -> phpantom_core::IndexingReport {
    ProjectIndexer::new(backend).index(&[root.to_path_buf()], &HashMap::new())
}

// ─── Selection ──────────────────────────────────────────────────────────────

/// Only configured extensions are picked up, and excluded directories are
/// left out.
#[test]
fn test_extension_filter_and_exclusions() {
    let dir = create_workspace(&[
        ("a.php", "<?php\nclass A {}\n"),
        ("notes.txt", "not php"),
        ("sub/c.php", "<?php\nclass C {}\n"),
        ("vendor/d.php", "<?php\nclass D {}\n"),
    ]);
    let mut config = Config::default();
    config.indexing.exclude = vec![PathBuf::from("vendor")];
    let backend = Backend::in_memory_with(config);

    let report = index_dir(&backend, dir.path());

    assert_eq!(
        report.indexed,
        vec![path_of(dir.path(), "a.php"), path_of(dir.path(), "sub/c.php")]
    );
    assert!(report.skipped.is_empty() && report.failed.is_empty());
    let classes: Vec<String> = backend.class_list().into_iter().map(|c| c.fqcn).collect();
    assert_eq!(classes, vec!["\\A", "\\C"]);
}

#[test]
fn test_custom_extensions() {
    let dir = create_workspace(&[
        ("view.phtml", "<?php\nfunction render() {}\n"),
        ("a.php", "<?php\n"),
    ]);
    let config = Config::from_toml("[indexing]\nextensions = [\"phtml\"]\n").expect("valid toml");
    let backend = Backend::in_memory_with(config);

    let report = index_dir(&backend, dir.path());
    assert_eq!(report.indexed, vec![path_of(dir.path(), "view.phtml")]);
    assert!(backend.store().has_function("\\render"));
}

/// A root may be a single file.
#[test]
fn test_single_file_root() {
    let dir = create_workspace(&[("one.php", "<?php\nclass One {}\n"), ("two.php", "<?php\n")]);
    let backend = Backend::in_memory();
    let file = dir.path().join("one.php");

    let report = ProjectIndexer::new(&backend).index(&[file.clone()], &HashMap::new());
    assert_eq!(report.indexed, vec![file.to_string_lossy().into_owned()]);
}

// ─── Freshness ──────────────────────────────────────────────────────────────

#[test]
fn test_unchanged_files_are_skipped() {
    let dir = create_workspace(&[("a.php", "<?php\nclass A {}\n")]);
    let backend = Backend::in_memory();

    let first = index_dir(&backend, dir.path());
    assert_eq!(first.indexed.len(), 1);

    let second = index_dir(&backend, dir.path());
    assert!(second.indexed.is_empty(), "got: {:?}", second);
    assert_eq!(second.skipped, vec![path_of(dir.path(), "a.php")]);
}

#[test]
fn test_modified_files_are_reindexed() {
    let dir = create_workspace(&[("a.php", "<?php\nclass Before {}\n")]);
    let backend = Backend::in_memory();
    index_dir(&backend, dir.path());

    write_file(dir.path(), "a.php", "<?php\nclass After {}\n");
    let file = fs::File::options()
        .write(true)
        .open(dir.path().join("a.php"))
        .expect("open a.php");
    file.set_modified(SystemTime::now() + Duration::from_secs(60))
        .expect("set mtime");

    let report = index_dir(&backend, dir.path());
    assert_eq!(report.indexed, vec![path_of(dir.path(), "a.php")]);
    assert!(backend.store().classlike("\\Before").is_none());
    assert!(backend.store().classlike("\\After").is_some());
}

/// Overrides win over the disk content and over freshness, and may name
/// files that do not exist.
#[test]
fn test_source_overrides() {
    let dir = create_workspace(&[("a.php", "<?php\nclass OnDisk {}\n")]);
    let backend = Backend::in_memory();
    index_dir(&backend, dir.path());

    let a = path_of(dir.path(), "a.php");
    let unsaved = path_of(dir.path(), "new.php");
    let overrides = HashMap::from([
        (a.clone(), "<?php\nclass InBuffer {}\n".to_string()),
        (unsaved.clone(), "<?php\nclass Unsaved {}\n".to_string()),
    ]);

    let report = ProjectIndexer::new(&backend).index(&[dir.path().to_path_buf()], &overrides);
    assert_eq!(report.indexed, vec![a, unsaved]);

    let store = backend.store();
    assert!(store.classlike("\\OnDisk").is_none());
    assert!(store.classlike("\\InBuffer").is_some());
    assert!(store.classlike("\\Unsaved").is_some());
}

// ─── Reporting ──────────────────────────────────────────────────────────────

#[test]
fn test_progress_is_reported_per_file() {
    let dir = create_workspace(&[("a.php", "<?php\n"), ("b.php", "<?php\n")]);
    let backend = Backend::in_memory();

    let mut seen = Vec::new();
    {
        let mut indexer = ProjectIndexer::new(&backend)
            .with_progress(|p| seen.push((p.done, p.total, p.path.to_string())));
        indexer.index(&[dir.path().to_path_buf()], &HashMap::new());
    }

    assert_eq!(
        seen,
        vec![
            (1, 2, path_of(dir.path(), "a.php")),
            (2, 2, path_of(dir.path(), "b.php")),
        ]
    );
}

/// An unreadable file is reported and does not stop the run.
#[test]
fn test_failed_files_do_not_stop_the_run() {
    let dir = create_workspace(&[("good.php", "<?php\nclass Good {}\n")]);
    fs::write(dir.path().join("bad.php"), [0xff, 0xfe, 0x00, 0xc3]).expect("write bad.php");
    let backend = Backend::in_memory();

    let report = index_dir(&backend, dir.path());
    assert_eq!(report.indexed, vec![path_of(dir.path(), "good.php")]);
    assert_eq!(report.failed.len(), 1, "got: {:?}", report.failed);
    assert_eq!(report.failed[0].0, path_of(dir.path(), "bad.php"));
    assert!(backend.store().has_classlike("\\Good"));
}

#[test]
fn test_prune_removed_files() {
    let dir = create_workspace(&[
        ("keep.php", "<?php\nclass Keep {}\n"),
        ("gone.php", "<?php\nclass Gone {}\n"),
    ]);
    let backend = Backend::in_memory();
    index_dir(&backend, dir.path());

    fs::remove_file(dir.path().join("gone.php")).expect("remove gone.php");
    let removed = ProjectIndexer::new(&backend)
        .prune_removed_files()
        .expect("pruning succeeds");

    assert_eq!(removed, vec![path_of(dir.path(), "gone.php")]);
    assert!(backend.store().classlike("\\Gone").is_none());
    assert!(backend.store().classlike("\\Keep").is_some());
}
