// Scan index
//
// Owns the relationship map and the mirror store and is the only place either
// is mutated. Every file enters through one batch operation that updates both,
// which keeps the two representations in step.

pub mod changes;
pub mod resolve;
pub mod shared;

pub use changes::*;
pub use shared::*;

use crate::error::{Error, Result};
use crate::graph::RelationshipMap;
use crate::mirror::MirrorStore;
use crate::model::{
    normalize_path, Element, ElementId, NormalizedFile, RawExtraction, RelationshipKind, UnresolvedEdge,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// A file that could not be applied, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiagnostic {
    pub path: String,
    pub message: String,
}

impl FileDiagnostic {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn from_error(fallback_path: &str, error: &Error) -> Self {
        match error {
            Error::MalformedExtraction { path, message } => Self::new(path.clone(), message.clone()),
            other => Self::new(fallback_path, other.to_string()),
        }
    }
}

/// Outcome of applying a scan batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Files written to the map and mirrors
    pub applied: Vec<String>,
    /// Files whose content hash matched the mirror and were left alone
    pub unchanged: Vec<String>,
    /// Files dropped from the scope
    pub removed: Vec<String>,
    /// Files rejected, one diagnostic each
    pub failures: Vec<FileDiagnostic>,
    /// Edges attached during this batch
    pub resolved_edges: usize,
    /// Edges still waiting for their target after this batch
    pub unresolved_edges: usize,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "{} applied, {} unchanged, {} removed, {} failed; {} edges resolved, {} unresolved",
            self.applied.len(),
            self.unchanged.len(),
            self.removed.len(),
            self.failures.len(),
            self.resolved_edges,
            self.unresolved_edges
        )
    }
}

/// Identifiers present in only one of the two representations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletenessReport {
    pub only_in_map: BTreeSet<ElementId>,
    pub only_in_mirrors: BTreeSet<ElementId>,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.only_in_map.is_empty() && self.only_in_mirrors.is_empty()
    }
}

/// Relationship map and mirror store, built and updated together
#[derive(Debug, Default, Clone)]
pub struct ScanIndex {
    map: RelationshipMap,
    mirrors: MirrorStore,
    unresolved: Vec<UnresolvedEdge>,
}

impl ScanIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh index from one batch
    pub fn from_batch(batch: &[RawExtraction]) -> Result<(Self, ScanReport)> {
        let mut index = Self::new();
        let report = index.apply_batch(batch)?;
        Ok((index, report))
    }

    pub fn map(&self) -> &RelationshipMap {
        &self.map
    }

    pub fn mirrors(&self) -> &MirrorStore {
        &self.mirrors
    }

    /// Edges whose target has not been seen yet, in arrival order
    pub fn unresolved(&self) -> &[UnresolvedEdge] {
        &self.unresolved
    }

    /// Apply one file, failing on malformed input
    pub fn apply_file(&mut self, raw: &RawExtraction) -> Result<ScanReport> {
        let file = raw.normalize()?;
        let mut report = ScanReport::default();
        report.applied.push(file.path.clone());
        self.apply_normalized(file)?;
        report.resolved_edges = self.resolve_pending()?;
        report.unresolved_edges = self.unresolved.len();
        Ok(report)
    }

    /// Apply a batch of files.
    ///
    /// A malformed file is reported in `failures` and skipped; the rest of the
    /// batch is still applied.
    pub fn apply_batch(&mut self, batch: &[RawExtraction]) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        for file in self.normalize_batch(batch, &mut report) {
            report.applied.push(file.path.clone());
            self.apply_normalized(file)?;
        }
        report.resolved_edges = self.resolve_pending()?;
        report.unresolved_edges = self.unresolved.len();
        info!("Scan batch applied: {}", report.summary());
        Ok(report)
    }

    pub(crate) fn normalize_batch(&self, batch: &[RawExtraction], report: &mut ScanReport) -> Vec<NormalizedFile> {
        let mut files = Vec::with_capacity(batch.len());
        let mut seen: HashSet<String> = HashSet::new();
        for raw in batch {
            match raw.normalize() {
                Ok(file) => {
                    if !seen.insert(file.path.clone()) {
                        warn!("{}: extracted twice in one batch, keeping the last result", file.path);
                        files.retain(|f: &NormalizedFile| f.path != file.path);
                    }
                    files.push(file);
                }
                Err(e) => {
                    let diagnostic = FileDiagnostic::from_error(&raw.path, &e);
                    warn!("Skipping {}: {}", diagnostic.path, diagnostic.message);
                    report.failures.push(diagnostic);
                }
            }
        }
        files
    }

    /// Remove a file and everything it declared
    pub fn remove_file(&mut self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        if !self.mirrors.exists(&path) {
            return Err(Error::not_found(format!("file {}", path)));
        }
        self.detach_file(&path, &HashSet::new())?;
        self.mirrors.remove_file(&path);
        debug!("Removed {} from the scan index", path);
        Ok(())
    }

    pub(crate) fn apply_normalized(&mut self, file: NormalizedFile) -> Result<()> {
        let keep: HashSet<ElementId> = file.ids().into_iter().collect();
        self.detach_file(&file.path, &keep)?;

        let elements: Vec<Element> = file.all_elements().cloned().collect();
        self.map.insert_or_update(elements.clone(), file.contains)?;
        self.mirrors.upsert_file(&file.path, &file.content_hash, &elements);
        self.unresolved.extend(file.edges);
        debug!("Indexed {} ({} elements)", file.path, elements.len());
        Ok(())
    }

    /// Drop edges owned by `path`, remove its elements not in `keep`, and
    /// send edges that lost their target back to the unresolved queue
    fn detach_file(&mut self, path: &str, keep: &HashSet<ElementId>) -> Result<()> {
        let old_ids = self.map.ids_in_file(path);
        for id in &old_ids {
            self.map.remove_outgoing(id, None);
        }
        self.unresolved.retain(|edge| edge.source.path() != path);

        for id in old_ids.iter().filter(|id| !keep.contains(*id)) {
            self.map.remove_element(id)?;
        }
        for edge in self.map.prune_orphans() {
            if self.map.contains(&edge.source) {
                self.unresolved.push(UnresolvedEdge {
                    source: edge.source.clone(),
                    target_name: edge.target.as_str().to_string(),
                    kind: edge.kind,
                    line: edge.line,
                });
            }
        }
        Ok(())
    }

    /// Attach every queued edge whose target now exists
    pub(crate) fn resolve_pending(&mut self) -> Result<usize> {
        // Imports first, so receiver calls can follow them in the same pass
        let (imports, others): (Vec<_>, Vec<_>) = std::mem::take(&mut self.unresolved)
            .into_iter()
            .partition(|edge| edge.kind == RelationshipKind::Imports);
        let mut resolved = 0;
        for edge in imports.into_iter().chain(others) {
            if !self.map.contains(&edge.source) {
                continue;
            }
            match resolve::resolve_target(&self.map, &edge) {
                Some(target) => {
                    self.map.add_edge(edge.resolve(target))?;
                    resolved += 1;
                }
                None => self.unresolved.push(edge),
            }
        }
        debug!("Resolved {} edges, {} still pending", resolved, self.unresolved.len());
        Ok(resolved)
    }

    /// Compare identifier sets of the map and the mirrors
    pub fn verify_completeness(&self) -> CompletenessReport {
        let in_map: BTreeSet<ElementId> = self.map.elements().map(|e| e.id.clone()).collect();
        let in_mirrors = self.mirrors.element_ids();
        CompletenessReport {
            only_in_map: in_map.difference(&in_mirrors).cloned().collect(),
            only_in_mirrors: in_mirrors.difference(&in_map).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, ElementKind, RelationshipKind};

    fn file_a() -> RawExtraction {
        RawExtraction::new("a.py")
            .element("foo", ElementKind::Function, 1, 2, "def foo():\n    bar()")
            .edge("foo", "bar", RelationshipKind::Calls)
    }

    fn file_b() -> RawExtraction {
        RawExtraction::new("b.py").element("bar", ElementKind::Function, 1, 2, "def bar():\n    pass")
    }

    fn calls_from(index: &ScanIndex, id: &ElementId) -> Vec<ElementId> {
        index
            .map()
            .neighbors(id, Direction::Outgoing, Some(RelationshipKind::Calls))
            .unwrap()
            .into_iter()
            .map(|e| e.target.clone())
            .collect()
    }

    #[test]
    fn test_cross_file_edge_resolves_in_any_order() {
        for batch in [vec![file_a(), file_b()], vec![file_b(), file_a()]] {
            let (index, report) = ScanIndex::from_batch(&batch).unwrap();
            assert_eq!(report.resolved_edges, 1);
            assert_eq!(calls_from(&index, &ElementId::new("a.py", "foo")), vec![ElementId::new("b.py", "bar")]);
        }
    }

    #[test]
    fn test_edge_waits_for_later_batch() {
        let mut index = ScanIndex::new();
        index.apply_file(&file_a()).unwrap();
        assert_eq!(index.unresolved().len(), 1);

        let report = index.apply_file(&file_b()).unwrap();
        assert_eq!(report.resolved_edges, 1);
        assert!(index.unresolved().is_empty());
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let (mut index, _) = ScanIndex::from_batch(&[file_a(), file_b()]).unwrap();
        let before: BTreeSet<ElementId> = index.map().elements().map(|e| e.id.clone()).collect();
        let edges_before = index.map().relationship_count();

        index.apply_batch(&[file_a(), file_b()]).unwrap();
        let after: BTreeSet<ElementId> = index.map().elements().map(|e| e.id.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(index.map().relationship_count(), edges_before);
    }

    #[test]
    fn test_mirror_completeness_after_batches() {
        let (mut index, _) = ScanIndex::from_batch(&[file_a(), file_b()]).unwrap();
        assert!(index.verify_completeness().is_complete());

        let shrunk = RawExtraction::new("b.py").element("baz", ElementKind::Function, 1, 2, "def baz(): ...");
        index.apply_file(&shrunk).unwrap();
        assert!(index.verify_completeness().is_complete());

        index.remove_file("a.py").unwrap();
        assert!(index.verify_completeness().is_complete());
        assert!(index.mirrors().get_file("a.py").is_err());
    }

    #[test]
    fn test_removed_target_requeues_edge() {
        let (mut index, _) = ScanIndex::from_batch(&[file_a(), file_b()]).unwrap();
        index.remove_file("b.py").unwrap();
        assert!(calls_from(&index, &ElementId::new("a.py", "foo")).is_empty());
        assert_eq!(index.unresolved().len(), 1);

        index.apply_file(&file_b()).unwrap();
        assert_eq!(calls_from(&index, &ElementId::new("a.py", "foo")), vec![ElementId::new("b.py", "bar")]);
    }

    #[test]
    fn test_requeued_edge_does_not_move_to_same_named_element() {
        let models = RawExtraction::new("a.py")
            .element("User", ElementKind::Class, 1, 4, "class User:")
            .element("User.save", ElementKind::Method, 2, 4, "def save(self): ...");
        let caller = RawExtraction::new("b.py")
            .element("main", ElementKind::Function, 1, 2, "def main():\n    User.save()")
            .edge("main", "User.save", RelationshipKind::Calls);
        let other = RawExtraction::new("c.py").element("save", ElementKind::Function, 1, 2, "def save(): ...");
        let (mut index, _) = ScanIndex::from_batch(&[models.clone(), caller, other]).unwrap();
        let main = ElementId::new("b.py", "main");
        assert_eq!(calls_from(&index, &main), vec![ElementId::new("a.py", "User.save")]);

        index.remove_file("a.py").unwrap();
        let unrelated = RawExtraction::new("d.py").element("other", ElementKind::Function, 1, 2, "def other(): ...");
        index.apply_file(&unrelated).unwrap();
        assert!(calls_from(&index, &main).is_empty());
        assert_eq!(index.unresolved().len(), 1);
        assert_eq!(index.unresolved()[0].target_name, "a.py::User.save");

        index.apply_file(&models).unwrap();
        assert_eq!(calls_from(&index, &main), vec![ElementId::new("a.py", "User.save")]);
    }

    #[test]
    fn test_member_call_follows_import_in_same_batch() {
        let util = RawExtraction::new("util.js").element("log", ElementKind::Function, 1, 1, "function log() {}");
        let app = RawExtraction::new("app.js")
            .element("start", ElementKind::Function, 2, 4, "function start() {}")
            .edge("", "./util", RelationshipKind::Imports)
            .edge("start", "util.log", RelationshipKind::Calls);
        let (index, report) = ScanIndex::from_batch(&[app, util]).unwrap();
        assert_eq!(report.resolved_edges, 2);
        assert!(index.unresolved().is_empty());
        assert_eq!(calls_from(&index, &ElementId::new("app.js", "start")), vec![ElementId::new("util.js", "log")]);
    }

    #[test]
    fn test_member_call_on_unknown_receiver_stays_unresolved() {
        let util = RawExtraction::new("util.js").element("log", ElementKind::Function, 1, 1, "function log() {}");
        let app = RawExtraction::new("app.js")
            .element("start", ElementKind::Function, 1, 3, "function start() {}")
            .edge("start", "console.log", RelationshipKind::Calls);
        let (index, report) = ScanIndex::from_batch(&[util, app]).unwrap();
        assert_eq!(report.resolved_edges, 0);
        assert_eq!(index.unresolved()[0].target_name, "console.log");
        assert!(calls_from(&index, &ElementId::new("app.js", "start")).is_empty());
    }

    #[test]
    fn test_content_change_keeps_incoming_edges() {
        let (mut index, _) = ScanIndex::from_batch(&[file_a(), file_b()]).unwrap();
        let changed = RawExtraction::new("b.py").element("bar", ElementKind::Function, 1, 3, "def bar():\n    return 42\n");
        index.apply_file(&changed).unwrap();
        assert_eq!(calls_from(&index, &ElementId::new("a.py", "foo")), vec![ElementId::new("b.py", "bar")]);
        assert_eq!(index.map().get(&ElementId::new("b.py", "bar")).unwrap().line_end, 3);
    }

    #[test]
    fn test_malformed_file_does_not_abort_batch() {
        let broken = RawExtraction::new("broken.py").element("oops", ElementKind::Function, 4, 1, "");
        let (index, report) = ScanIndex::from_batch(&[file_a(), broken, file_b()]).unwrap();
        assert_eq!(report.applied, vec!["a.py".to_string(), "b.py".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "broken.py");
        assert!(!report.is_clean());
        assert!(index.mirrors().get_file("broken.py").is_err());
    }

    #[test]
    fn test_apply_file_surfaces_malformed() {
        let mut index = ScanIndex::new();
        let result = index.apply_file(&RawExtraction::new(""));
        assert!(matches!(result, Err(Error::MalformedExtraction { .. })));
    }

    #[test]
    fn test_remove_unknown_file() {
        let mut index = ScanIndex::new();
        assert!(matches!(index.remove_file("ghost.py"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_external_calls_stay_unresolved() {
        let raw = RawExtraction::new("a.py")
            .element("foo", ElementKind::Function, 1, 2, "def foo():\n    print()")
            .edge("foo", "print", RelationshipKind::Calls);
        let (index, report) = ScanIndex::from_batch(&[raw]).unwrap();
        assert_eq!(report.resolved_edges, 0);
        assert_eq!(report.unresolved_edges, 1);
        assert_eq!(index.unresolved()[0].target_name, "print");
    }

    #[test]
    fn test_report_summary() {
        let (_, report) = ScanIndex::from_batch(&[file_a(), file_b()]).unwrap();
        assert_eq!(
            report.summary(),
            "2 applied, 0 unchanged, 0 removed, 0 failed; 1 edges resolved, 0 unresolved"
        );
    }
}
