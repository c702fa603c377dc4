/// Whole-project indexing.
///
/// [`ProjectIndexer`] walks one or more roots, picks the files the
/// configuration marks as indexable, and indexes each of them through
/// [`Backend::index`].  Every file is its own unit of work: a failure is
/// logged and recorded in the [`IndexingReport`], and the loop goes on.
///
/// A file whose record is at least as recent as its modification time is
/// skipped, unless the caller supplies an in-memory source for it (an
/// unsaved editor buffer, for instance).
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ignore::WalkBuilder;
use serde::Serialize;

use crate::Backend;
use crate::errors::StoreError;

/// Outcome of one [`ProjectIndexer::index`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexingReport {
    pub indexed: Vec<String>,
    /// Files already up to date.
    pub skipped: Vec<String>,
    /// Files that could not be indexed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Progress of a run, handed to the callback after every file.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'p> {
    pub done: usize,
    pub total: usize,
    pub path: &'p str,
}

type ProgressCallback<'b> = Box<dyn FnMut(Progress<'_>) + 'b>;

pub struct ProjectIndexer<'b> {
    backend: &'b Backend,
    progress: Option<ProgressCallback<'b>>,
}

impl<'b> ProjectIndexer<'b> {
    pub fn new(backend: &'b Backend) -> Self {
        Self {
            backend,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: impl FnMut(Progress<'_>) + 'b) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Index every eligible file below `paths`.
    ///
    /// `source_overrides` maps a path to the text to index instead of the
    /// file's content on disk.  Overridden paths are always indexed, even
    /// when they do not exist on disk yet.
    pub fn index(
        &mut self,
        paths: &[PathBuf],
        source_overrides: &HashMap<String, String>,
    ) -> IndexingReport {
        let mut files: BTreeSet<String> = BTreeSet::new();
        for root in paths {
            files.extend(self.collect_files(root));
        }
        files.extend(source_overrides.keys().cloned());

        let total = files.len();
        tracing::info!("indexing {} file(s)", total);

        let mut report = IndexingReport::default();
        for (done, path) in files.iter().enumerate() {
            match source_overrides.get(path) {
                Some(source) => self.index_one(path, source, &mut report),
                None if self.is_up_to_date(path) => {
                    tracing::debug!("{} is up to date", path);
                    report.skipped.push(path.clone());
                }
                None => match std::fs::read_to_string(path) {
                    Ok(source) => self.index_one(path, &source, &mut report),
                    Err(err) => {
                        tracing::warn!("could not read {}: {}", path, err);
                        report.failed.push((path.clone(), err.to_string()));
                    }
                },
            }

            if let Some(callback) = self.progress.as_mut() {
                callback(Progress {
                    done: done + 1,
                    total,
                    path,
                });
            }
        }

        tracing::info!(
            "indexed {}, skipped {}, failed {}",
            report.indexed.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    /// Delete the records of indexed files that no longer exist on disk.
    /// Returns the removed paths.
    pub fn prune_removed_files(&self) -> Result<Vec<String>, StoreError> {
        let _writer = self.backend.writer.lock();
        let mut removed = Vec::new();
        for file in self.backend.store.files() {
            if Path::new(&file.path).exists() {
                continue;
            }
            tracing::debug!("pruning {}", file.path);
            self.backend
                .transaction(|store| store.delete_file(&file.path))?;
            removed.push(file.path);
        }
        Ok(removed)
    }

    fn index_one(&self, path: &str, source: &str, report: &mut IndexingReport) {
        match self.backend.index(path, source) {
            Ok(()) => report.indexed.push(path.to_string()),
            Err(err) => {
                tracing::warn!("skipping {}: {}", path, err);
                report.failed.push((path.to_string(), err.to_string()));
            }
        }
    }

    /// The indexable files below `root`, which may also be a single file.
    fn collect_files(&self, root: &Path) -> Vec<String> {
        let config = &self.backend.config;
        if root.is_file() {
            return if config.is_indexable(root) {
                vec![root.to_string_lossy().into_owned()]
            } else {
                Vec::new()
            };
        }

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("error walking {}: {}", root.display(), err);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if config.is_indexable(path) && !config.is_excluded(root, path) {
                files.push(path.to_string_lossy().into_owned());
            }
        }
        files
    }

    fn is_up_to_date(&self, path: &str) -> bool {
        let Some(record) = self.backend.store.file(path) else {
            return false;
        };
        let modified = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        record.indexed_at >= modified
    }
}
