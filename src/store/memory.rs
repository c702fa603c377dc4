use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, RwLock};
use ustr::{UstrMap, ustr};

use crate::errors::StoreError;
use crate::types::{ClassLikeInfo, ConstantInfo, FileRecord, FunctionInfo, NamespaceScope};
use crate::util::{lookup_key, to_fqsen};

use super::SymbolStore;

#[derive(Debug, Default, Clone)]
struct State {
    files: UstrMap<FileRecord>,
    namespaces: UstrMap<Vec<NamespaceScope>>,
    /// Keyed on the lowercased FQCN.
    classlikes: UstrMap<ClassLikeInfo>,
    /// Keyed on the lowercased FQSEN.
    functions: UstrMap<FunctionInfo>,
    /// Constants are case-sensitive.
    constants: UstrMap<ConstantInfo>,
}

#[derive(Debug)]
struct Transaction {
    owner: ThreadId,
    snapshot: State,
}

/// In-memory [`SymbolStore`].
///
/// A transaction snapshots the whole state on `begin`; `rollback` restores
/// the snapshot.  One transaction is open at a time: `begin` on another
/// thread waits for it to end, and writes are only accepted from the
/// thread that opened it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    transaction: Mutex<Option<Transaction>>,
    released: Condvar,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the current thread has a transaction open.
    pub fn in_transaction(&self) -> bool {
        self.transaction
            .lock()
            .as_ref()
            .is_some_and(|t| t.owner == thread::current().id())
    }

    fn finish(&self, restore: bool) -> Result<(), StoreError> {
        let mut transaction = self.transaction.lock();
        let owner = transaction.as_ref().map(|t| t.owner);
        if owner != Some(thread::current().id()) {
            return Err(StoreError::NoTransaction);
        }
        if let Some(finished) = transaction.take()
            && restore
        {
            *self.state.write() = finished.snapshot;
        }
        drop(transaction);
        self.released.notify_one();
        Ok(())
    }

    fn write<R>(&self, f: impl FnOnce(&mut State) -> R) -> Result<R, StoreError> {
        if !self.in_transaction() {
            return Err(StoreError::NoTransaction);
        }
        Ok(f(&mut self.state.write()))
    }
}

impl SymbolStore for MemoryStore {
    fn begin(&self) -> Result<(), StoreError> {
        let me = thread::current().id();
        let mut transaction = self.transaction.lock();
        loop {
            match transaction.as_ref().map(|t| t.owner) {
                None => break,
                Some(owner) if owner == me => return Err(StoreError::TransactionActive),
                Some(_) => self.released.wait(&mut transaction),
            }
        }
        *transaction = Some(Transaction {
            owner: me,
            snapshot: self.state.read().clone(),
        });
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        self.finish(false)
    }

    fn rollback(&self) -> Result<(), StoreError> {
        self.finish(true)
    }

    fn upsert_file(&self, file: FileRecord) -> Result<(), StoreError> {
        self.write(|s| {
            s.files.insert(ustr(&file.path), file);
        })
    }

    fn delete_file(&self, path: &str) -> Result<(), StoreError> {
        self.write(|s| {
            let key = ustr(path);
            s.files.remove(&key);
            s.namespaces.remove(&key);
            s.classlikes.retain(|_, c| c.file != path);
            s.functions.retain(|_, f| f.file != path);
            s.constants.retain(|_, c| c.file != path);
        })
    }

    fn file(&self, path: &str) -> Option<FileRecord> {
        self.state.read().files.get(&ustr(path)).cloned()
    }

    fn files(&self) -> Vec<FileRecord> {
        let mut files: Vec<_> = self.state.read().files.values().cloned().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    fn upsert_namespaces(
        &self,
        path: &str,
        scopes: Vec<NamespaceScope>,
    ) -> Result<(), StoreError> {
        self.write(|s| {
            s.namespaces.insert(ustr(path), scopes);
        })
    }

    fn namespaces(&self, path: &str) -> Vec<NamespaceScope> {
        self.state
            .read()
            .namespaces
            .get(&ustr(path))
            .cloned()
            .unwrap_or_default()
    }

    fn upsert_classlike(&self, classlike: ClassLikeInfo) -> Result<(), StoreError> {
        self.write(|s| {
            s.classlikes
                .insert(ustr(&lookup_key(&classlike.fqcn)), classlike);
        })
    }

    fn delete_classlike(&self, fqcn: &str) -> Result<(), StoreError> {
        self.write(|s| {
            s.classlikes.remove(&ustr(&lookup_key(fqcn)));
        })
    }

    fn classlike(&self, fqcn: &str) -> Option<ClassLikeInfo> {
        self.state
            .read()
            .classlikes
            .get(&ustr(&lookup_key(fqcn)))
            .cloned()
    }

    fn classlikes(&self) -> Vec<ClassLikeInfo> {
        let mut all: Vec<_> = self.state.read().classlikes.values().cloned().collect();
        all.sort_by(|a, b| a.fqcn.cmp(&b.fqcn));
        all
    }

    fn upsert_function(&self, function: FunctionInfo) -> Result<(), StoreError> {
        self.write(|s| {
            s.functions.insert(ustr(&lookup_key(&function.fqsen)), function);
        })
    }

    fn delete_function(&self, fqsen: &str) -> Result<(), StoreError> {
        self.write(|s| {
            s.functions.remove(&ustr(&lookup_key(fqsen)));
        })
    }

    fn function(&self, fqsen: &str) -> Option<FunctionInfo> {
        self.state
            .read()
            .functions
            .get(&ustr(&lookup_key(fqsen)))
            .cloned()
    }

    fn upsert_constant(&self, constant: ConstantInfo) -> Result<(), StoreError> {
        self.write(|s| {
            s.constants.insert(ustr(&to_fqsen(&constant.fqsen)), constant);
        })
    }

    fn delete_constant(&self, fqsen: &str) -> Result<(), StoreError> {
        self.write(|s| {
            s.constants.remove(&ustr(&to_fqsen(fqsen)));
        })
    }

    fn constant(&self, fqsen: &str) -> Option<ConstantInfo> {
        self.state
            .read()
            .constants
            .get(&ustr(&to_fqsen(fqsen)))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn file(path: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            indexed_at: SystemTime::now(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn writes_require_a_transaction() {
        let store = MemoryStore::new();
        assert_eq!(store.upsert_file(file("a.php")), Err(StoreError::NoTransaction));
        assert_eq!(store.commit(), Err(StoreError::NoTransaction));
    }

    #[test]
    fn nested_begin_is_rejected() {
        let store = MemoryStore::new();
        store.begin().unwrap();
        assert_eq!(store.begin(), Err(StoreError::TransactionActive));
    }

    /// A second thread's `begin` waits for the open transaction to end.
    #[test]
    fn begin_waits_for_other_threads() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.begin().unwrap();

        let other = std::sync::Arc::clone(&store);
        let handle = thread::spawn(move || {
            assert_eq!(other.upsert_file(file("b.php")), Err(StoreError::NoTransaction));
            other.begin().unwrap();
            let seen = other.file("a.php").is_some();
            other.commit().unwrap();
            seen
        });

        thread::sleep(std::time::Duration::from_millis(50));
        store.upsert_file(file("a.php")).unwrap();
        store.commit().unwrap();

        assert!(handle.join().unwrap());
    }

    #[test]
    fn rollback_restores_previous_state() {
        let store = MemoryStore::new();
        store.begin().unwrap();
        store.upsert_file(file("a.php")).unwrap();
        store.commit().unwrap();

        store.begin().unwrap();
        store.delete_file("a.php").unwrap();
        store.upsert_file(file("b.php")).unwrap();
        store.rollback().unwrap();

        assert!(store.file("a.php").is_some());
        assert!(store.file("b.php").is_none());
    }
}
