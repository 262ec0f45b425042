// Storage backends for feature blueprint versions

use crate::error::{Error, Result};
use crate::versioning::StoredVersion;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Where stored versions live. Records are immutable once saved.
pub trait FeatureBackend: Send + Sync {
    fn load(&self, name: &str, version: u32) -> Result<Option<StoredVersion>>;

    fn save(&self, record: &StoredVersion) -> Result<()>;

    /// Stored version numbers for a name, ascending
    fn versions(&self, name: &str) -> Result<Vec<u32>>;

    /// Stored feature names, sorted
    fn names(&self) -> Result<Vec<String>>;

    fn latest_version(&self, name: &str) -> Result<Option<u32>> {
        Ok(self.versions(name)?.last().copied())
    }
}

/// In-process backend for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<String, BTreeMap<u32, StoredVersion>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, BTreeMap<u32, StoredVersion>>>> {
        self.records
            .lock()
            .map_err(|_| Error::other("feature store lock poisoned"))
    }
}

impl FeatureBackend for MemoryBackend {
    fn load(&self, name: &str, version: u32) -> Result<Option<StoredVersion>> {
        Ok(self.records()?.get(name).and_then(|v| v.get(&version)).cloned())
    }

    fn save(&self, record: &StoredVersion) -> Result<()> {
        let mut records = self.records()?;
        let versions = records.entry(record.name.clone()).or_default();
        if versions.contains_key(&record.version) {
            return Err(Error::AlreadyExists(format!("{} v{}", record.name, record.version)));
        }
        versions.insert(record.version, record.clone());
        Ok(())
    }

    fn versions(&self, name: &str) -> Result<Vec<u32>> {
        Ok(self
            .records()?
            .get(name)
            .map(|v| v.keys().copied().collect())
            .unwrap_or_default())
    }

    fn names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.records()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
