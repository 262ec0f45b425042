// Change detection between a fresh extraction and the mirrors
//
// Mirrors remember the content hash each file was built from, so a re-scan
// only needs to touch files that are new, modified or gone.

use crate::error::Result;
use crate::index::{ScanIndex, ScanReport};
use crate::model::{normalize_path, RawExtraction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Classification of candidate files against the current mirrors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub new: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

impl ScanIndex {
    /// Compare candidates with the mirrors.
    ///
    /// Mirrored files under `scope` (a path prefix; `None` means everything)
    /// that are not among the candidates count as deleted.
    pub fn detect_changes(&self, candidates: &[RawExtraction], scope: Option<&str>) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let mut present: BTreeSet<String> = BTreeSet::new();

        for raw in candidates {
            let path = normalize_path(&raw.path);
            if !present.insert(path.clone()) {
                continue;
            }
            if !self.mirrors().exists(&path) {
                changes.new.push(path);
            } else if self.mirrors().is_up_to_date(&path, &raw.content_hash()) {
                changes.unchanged.push(path);
            } else {
                changes.modified.push(path);
            }
        }

        let scope = scope.map(normalize_path);
        for path in self.mirrors().files() {
            let in_scope = match &scope {
                Some(prefix) if !prefix.is_empty() => {
                    let prefix = prefix.trim_end_matches('/');
                    path == prefix || path.starts_with(&format!("{}/", prefix))
                }
                _ => true,
            };
            if in_scope && !present.contains(path) {
                changes.deleted.push(path.to_string());
            }
        }

        debug!(
            "Detected {} new, {} modified, {} deleted files",
            changes.new.len(),
            changes.modified.len(),
            changes.deleted.len()
        );
        changes
    }

    /// Apply only what changed: new and modified files are re-indexed,
    /// deleted files are removed, unchanged files are left alone
    pub fn sync(&mut self, candidates: &[RawExtraction], scope: Option<&str>) -> Result<ScanReport> {
        let changes = self.detect_changes(candidates, scope);
        let unchanged: BTreeSet<&str> = changes.unchanged.iter().map(|p| p.as_str()).collect();
        let to_apply: Vec<RawExtraction> = candidates
            .iter()
            .filter(|raw| !unchanged.contains(normalize_path(&raw.path).as_str()))
            .cloned()
            .collect();

        let mut report = ScanReport::default();
        for file in self.normalize_batch(&to_apply, &mut report) {
            report.applied.push(file.path.clone());
            self.apply_normalized(file)?;
        }
        for path in &changes.deleted {
            self.remove_file(path)?;
            report.removed.push(path.clone());
        }
        report.unchanged = changes.unchanged;
        report.resolved_edges = self.resolve_pending()?;
        report.unresolved_edges = self.unresolved().len();
        info!("Sync applied: {}", report.summary());
        Ok(report)
    }
}
