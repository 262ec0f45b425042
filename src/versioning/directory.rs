// Directory-backed version store: <root>/<name>/v<N>.json

use crate::error::{Error, Result};
use crate::versioning::{FeatureBackend, StoredVersion};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One JSON file per stored version
#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, name: &str, version: u32) -> PathBuf {
        self.root.join(name).join(format!("v{}.json", version))
    }
}

impl FeatureBackend for DirectoryBackend {
    fn load(&self, name: &str, version: u32) -> Result<Option<StoredVersion>> {
        let path = self.record_path(name, version);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn save(&self, record: &StoredVersion) -> Result<()> {
        let path = self.record_path(&record.name, record.version);
        if path.exists() {
            return Err(Error::AlreadyExists(format!("{} v{}", record.name, record.version)));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write beside the target and rename so readers never see a partial record
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_string_pretty(record)?)?;
        fs::rename(&staging, &path)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn versions(&self, name: &str) -> Result<Vec<u32>> {
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let file_name = entry?.file_name();
            let parsed = file_name
                .to_str()
                .and_then(|n| n.strip_prefix('v'))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u32>().ok());
            if let Some(version) = parsed {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn names(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
