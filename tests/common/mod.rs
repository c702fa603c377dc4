#![allow(dead_code)]

use std::fs;
use std::path::Path;

use phpantom_core::Backend;

/// The marker tests put where a query position is wanted.
pub const MARKER: &str = "/*|*/";

pub fn create_test_backend() -> Backend {
    Backend::in_memory()
}

/// Index `files` into a fresh in-memory backend.
pub fn indexed_backend(files: &[(&str, &str)]) -> Backend {
    let backend = create_test_backend();
    for (path, source) in files {
        backend
            .index(path, source)
            .unwrap_or_else(|err| panic!("indexing {path} failed: {err}"));
    }
    backend
}

/// Byte offset of [`MARKER`] in `source`.
pub fn marker_offset(source: &str) -> u32 {
    source
        .find(MARKER)
        .unwrap_or_else(|| panic!("no marker in source: {source}")) as u32
}

/// Index `source` as `path`, then deduce `expression` at the marker.
/// Returns the fully-qualified names of the candidates, in order.
pub fn deduce_at_marker(path: &str, source: &str, expression: &str) -> Vec<String> {
    let backend = indexed_backend(&[(path, source)]);
    deduce_with(&backend, path, source, expression)
}

pub fn deduce_with(backend: &Backend, path: &str, source: &str, expression: &str) -> Vec<String> {
    backend
        .deduce_expression_at(path, source, marker_offset(source), expression)
        .unwrap_or_else(|err| panic!("deducing {expression} failed: {err}"))
        .fqns()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Write `files` below a fresh temporary directory.
pub fn create_workspace(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel_path, content) in files {
        write_file(dir.path(), rel_path, content);
    }
    dir
}

pub fn write_file(root: &Path, rel_path: &str, content: &str) {
    let full = root.join(rel_path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("failed to create dirs");
    }
    fs::write(&full, content).expect("failed to write PHP file");
}
