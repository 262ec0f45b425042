// Shared scan index: one writer per batch, many readers between batches

use crate::error::{Error, Result};
use crate::index::{ScanIndex, ScanReport};
use crate::model::RawExtraction;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Notified after every batch that changed the index
pub trait BatchObserver: Send + Sync {
    fn batch_applied(&self, report: &ScanReport);
}

/// Cloneable handle to a scan index behind an exclusive-write/shared-read lock
#[derive(Clone, Default)]
pub struct SharedIndex {
    inner: Arc<RwLock<ScanIndex>>,
    observers: Arc<RwLock<Vec<Arc<dyn BatchObserver>>>>,
}

impl SharedIndex {
    pub fn new(index: ScanIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
            observers: Arc::default(),
        }
    }

    /// Subscribe to batch completion
    pub fn subscribe(&self, observer: Arc<dyn BatchObserver>) -> Result<()> {
        self.observers
            .write()
            .map_err(|_| poisoned())?
            .push(observer);
        Ok(())
    }

    /// Apply a batch while holding the write lock, then notify observers
    pub fn apply_batch(&self, batch: &[RawExtraction]) -> Result<ScanReport> {
        let report = self.write()?.apply_batch(batch)?;
        self.notify(&report)?;
        Ok(report)
    }

    /// Apply only changed files while holding the write lock
    pub fn sync(&self, batch: &[RawExtraction], scope: Option<&str>) -> Result<ScanReport> {
        let report = self.write()?.sync(batch, scope)?;
        self.notify(&report)?;
        Ok(report)
    }

    /// Shared read access for composition and queries
    pub fn read(&self) -> Result<RwLockReadGuard<'_, ScanIndex>> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ScanIndex>> {
        self.inner.write().map_err(|_| poisoned())
    }

    fn notify(&self, report: &ScanReport) -> Result<()> {
        for observer in self.observers.read().map_err(|_| poisoned())?.iter() {
            observer.batch_applied(report);
        }
        Ok(())
    }
}

fn poisoned() -> Error {
    Error::other("scan index lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, RelationshipKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl BatchObserver for Counter {
        fn batch_applied(&self, report: &ScanReport) {
            self.0.fetch_add(report.applied.len(), Ordering::SeqCst);
        }
    }

    fn file(i: usize) -> RawExtraction {
        RawExtraction::new(format!("f{}.py", i))
            .element(&format!("func{}", i), ElementKind::Function, 1, 2, "def f(): ...")
            .edge(&format!("func{}", i), &format!("func{}", i + 1), RelationshipKind::Calls)
    }

    #[test]
    fn test_concurrent_batches_serialize() {
        let shared = SharedIndex::default();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || shared.apply_batch(&[file(i)]).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let index = shared.read().unwrap();
        assert_eq!(index.mirrors().len(), 8);
        assert!(index.verify_completeness().is_complete());
        // func0..func6 reach their successor; func7's target was never scanned
        assert_eq!(index.unresolved().len(), 1);
    }

    #[test]
    fn test_observers_see_each_batch() {
        let shared = SharedIndex::default();
        let counter = Arc::new(Counter::default());
        shared.subscribe(counter.clone()).unwrap();
        shared.apply_batch(&[file(0), file(1)]).unwrap();
        shared.sync(&[file(0), file(1), file(2)], None).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
    }
}
