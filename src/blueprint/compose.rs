// Blueprint composer
//
// Reads the relationship map and the mirrors after a scan batch has completed
// and assembles file, method or feature blueprints from a validated selection.

use crate::blueprint::{Blueprint, BlueprintKind, ElementRef, Selection};
use crate::error::{Error, Result};
use crate::graph::RelationshipMap;
use crate::index::ScanIndex;
use crate::mirror::MirrorStore;
use crate::model::{DetailLevel, ElementId, RelationshipKind};
use std::collections::BTreeSet;
use tracing::debug;

/// Composes blueprints from a read-only view of the scan index
pub struct Composer<'a> {
    map: &'a RelationshipMap,
    mirrors: &'a MirrorStore,
}

impl<'a> Composer<'a> {
    pub fn new(map: &'a RelationshipMap, mirrors: &'a MirrorStore) -> Self {
        Self { map, mirrors }
    }

    pub fn from_index(index: &'a ScanIndex) -> Self {
        Self::new(index.map(), index.mirrors())
    }

    pub fn compose(&self, selection: &Selection, detail: DetailLevel) -> Result<Blueprint> {
        if selection.is_empty() {
            return Err(Error::EmptySelection(format!("{} blueprint selects nothing", selection.kind())));
        }
        let blueprint = match selection {
            Selection::Files(files) => self.compose_files(files, detail)?,
            Selection::Methods(refs) => self.compose_methods(refs, detail)?,
            Selection::Feature { name, files, elements } => self.compose_feature(name, files, elements, detail)?,
        };
        if blueprint.is_empty() {
            return Err(Error::EmptySelection(format!(
                "{} blueprint resolved to no elements",
                selection.kind()
            )));
        }
        debug!(
            "Composed {} blueprint: {} elements, {} relationships",
            blueprint.kind,
            blueprint.len(),
            blueprint.relationship_count()
        );
        Ok(blueprint)
    }

    /// Whole files: every mirrored element and its containment edges.
    /// Standard adds edges between the selected files, detailed adds one hop
    /// of calls/references leaving them.
    fn compose_files(&self, files: &[String], detail: DetailLevel) -> Result<Blueprint> {
        let mut blueprint = Blueprint::new(BlueprintKind::File, detail);
        let selected = self.file_members(files)?;
        for id in &selected {
            self.include(&mut blueprint, id)?;
        }

        for id in &selected {
            for edge in self.map.outgoing_edges(id) {
                let internal = selected.contains(&edge.target);
                let keep = match edge.kind {
                    RelationshipKind::Contains => internal,
                    _ if detail == DetailLevel::Minimal => false,
                    RelationshipKind::Imports => internal,
                    RelationshipKind::Calls | RelationshipKind::References => {
                        internal || detail == DetailLevel::Detailed
                    }
                };
                if !keep {
                    continue;
                }
                if !internal {
                    self.include(&mut blueprint, &edge.target)?;
                }
                blueprint.insert_edge(edge.clone());
            }
        }
        Ok(blueprint)
    }

    /// Exact elements plus their cross-file closure
    fn compose_methods(&self, refs: &[ElementRef], detail: DetailLevel) -> Result<Blueprint> {
        let mut blueprint = Blueprint::new(BlueprintKind::Method, detail);
        let seeds = self.element_ids(refs)?;
        let closure = self.map.cross_file_closure(&seeds, detail.closure_depth())?;
        for id in &closure.elements {
            self.include(&mut blueprint, id)?;
        }
        for edge in closure.edges {
            blueprint.insert_edge(edge);
        }
        Ok(blueprint)
    }

    /// Files and specific elements grouped under a name. Members always keep
    /// their one-hop outgoing edges so exit points are visible; the detail
    /// level controls how much of the closure comes along as context.
    fn compose_feature(
        &self,
        name: &str,
        files: &[String],
        elements: &[ElementRef],
        detail: DetailLevel,
    ) -> Result<Blueprint> {
        let mut blueprint = Blueprint::new(BlueprintKind::Feature, detail).with_name(name);
        let mut members = self.file_members(files)?;
        members.extend(self.element_ids(elements)?);

        for id in &members {
            self.include(&mut blueprint, id)?;
            blueprint.add_member(id.clone());
        }

        let seeds: Vec<ElementId> = members.iter().cloned().collect();
        let closure = self.map.cross_file_closure(&seeds, detail.closure_depth())?;
        for id in &closure.elements {
            self.include(&mut blueprint, id)?;
        }
        for edge in closure.edges {
            blueprint.insert_edge(edge);
        }

        for id in &members {
            for edge in self.map.outgoing_edges(id) {
                if edge.kind != RelationshipKind::Contains || members.contains(&edge.target) {
                    blueprint.insert_edge(edge.clone());
                }
            }
        }
        Ok(blueprint)
    }

    /// All identifiers the mirrors hold for the given files
    fn file_members(&self, files: &[String]) -> Result<BTreeSet<ElementId>> {
        let mut ids = BTreeSet::new();
        for file in files {
            let mirror = self
                .mirrors
                .get_file(file)
                .map_err(|_| Error::selection_not_found(format!("file {}", file)))?;
            ids.extend(mirror.ids());
        }
        Ok(ids)
    }

    fn element_ids(&self, refs: &[ElementRef]) -> Result<Vec<ElementId>> {
        let mut ids = Vec::with_capacity(refs.len());
        for element in refs {
            if !self.mirrors.exists(&element.file) {
                return Err(Error::selection_not_found(format!("file {}", element.file)));
            }
            let id = ElementId::new(&element.file, &element.name);
            if !self.map.contains(&id) {
                return Err(Error::selection_not_found(format!("element {} in {}", element.name, element.file)));
            }
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Copy an element and its file hash into the blueprint
    fn include(&self, blueprint: &mut Blueprint, id: &ElementId) -> Result<()> {
        let element = self.map.get(id)?;
        if let Some(file) = self.map.element(&ElementId::file(&element.file)) {
            blueprint.set_file_hash(element.file.clone(), file.content_hash.clone());
        }
        blueprint.insert_element(element.clone());
        Ok(())
    }
}

/// Compose against a scan index in one call
pub fn compose(index: &ScanIndex, selection: &Selection, detail: DetailLevel) -> Result<Blueprint> {
    Composer::from_index(index).compose(selection, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeKey, ElementKind, RawExtraction};

    fn foo_bar_index() -> ScanIndex {
        let a = RawExtraction::new("a.py")
            .with_source("def foo():\n    bar()\n")
            .element("foo", ElementKind::Function, 1, 2, "def foo():\n    bar()")
            .edge("foo", "bar", RelationshipKind::Calls);
        let b = RawExtraction::new("b.py")
            .with_source("def bar():\n    baz()\n\ndef baz():\n    pass\n")
            .element("bar", ElementKind::Function, 1, 2, "def bar():\n    baz()")
            .element("baz", ElementKind::Function, 4, 5, "def baz():\n    pass")
            .edge("bar", "baz", RelationshipKind::Calls);
        ScanIndex::from_batch(&[a, b]).unwrap().0
    }

    fn calls(source: &ElementId, target: &ElementId) -> EdgeKey {
        EdgeKey {
            source: source.clone(),
            target: target.clone(),
            kind: RelationshipKind::Calls,
        }
    }

    #[test]
    fn test_method_blueprint_standard_follows_one_hop() {
        let index = foo_bar_index();
        let selection = Selection::Methods(vec![ElementRef::new("a.py", "foo")]);
        let bp = compose(&index, &selection, DetailLevel::Standard).unwrap();

        let foo = ElementId::new("a.py", "foo");
        let bar = ElementId::new("b.py", "bar");
        assert_eq!(bp.element_ids(), BTreeSet::from([foo.clone(), bar.clone()]));
        assert_eq!(bp.relationship_count(), 1);
        assert!(bp.has_edge(&calls(&foo, &bar)));
        assert_eq!(bp.file_hash("b.py").len(), 64);
    }

    #[test]
    fn test_method_blueprint_minimal_is_seed_only() {
        let index = foo_bar_index();
        let selection = Selection::Methods(vec![ElementRef::new("a.py", "foo")]);
        let bp = compose(&index, &selection, DetailLevel::Minimal).unwrap();
        assert_eq!(bp.element_ids(), BTreeSet::from([ElementId::new("a.py", "foo")]));
        assert_eq!(bp.relationship_count(), 0);
    }

    #[test]
    fn test_method_blueprint_detailed_reaches_everything() {
        let index = foo_bar_index();
        let selection = Selection::Methods(vec![ElementRef::new("a.py", "foo")]);
        let bp = compose(&index, &selection, DetailLevel::Detailed).unwrap();
        assert_eq!(bp.len(), 3);
        assert_eq!(bp.relationship_count(), 2);
    }

    #[test]
    fn test_file_blueprint_levels() {
        let index = foo_bar_index();
        let selection = Selection::Files(vec!["a.py".to_string()]);

        let minimal = compose(&index, &selection, DetailLevel::Minimal).unwrap();
        assert_eq!(minimal.len(), 2);
        assert!(minimal.relationships().all(|e| e.kind == RelationshipKind::Contains));

        let standard = compose(&index, &selection, DetailLevel::Standard).unwrap();
        assert_eq!(standard.len(), 2);
        assert!(!standard.has_edge(&calls(&ElementId::new("a.py", "foo"), &ElementId::new("b.py", "bar"))));

        let detailed = compose(&index, &selection, DetailLevel::Detailed).unwrap();
        assert!(detailed.contains(&ElementId::new("b.py", "bar")));
        assert!(!detailed.contains(&ElementId::new("b.py", "baz")));
        assert!(detailed.has_edge(&calls(&ElementId::new("a.py", "foo"), &ElementId::new("b.py", "bar"))));
    }

    #[test]
    fn test_file_blueprint_standard_keeps_edges_between_selected_files() {
        let index = foo_bar_index();
        let selection = Selection::Files(vec!["a.py".to_string(), "b.py".to_string()]);
        let bp = compose(&index, &selection, DetailLevel::Standard).unwrap();
        assert_eq!(bp.len(), 5);
        // 3 contains + foo->bar + bar->baz
        assert_eq!(bp.relationship_count(), 5);
    }

    #[test]
    fn test_feature_blueprint_entry_and_exit_points() {
        let index = foo_bar_index();
        let selection = Selection::Feature {
            name: "pipeline".to_string(),
            files: vec![],
            elements: vec![ElementRef::new("a.py", "foo"), ElementRef::new("b.py", "bar")],
        };
        let bp = compose(&index, &selection, DetailLevel::Minimal).unwrap();
        assert_eq!(bp.name.as_deref(), Some("pipeline"));
        assert_eq!(bp.entry_points(), vec![ElementId::new("a.py", "foo")]);
        assert_eq!(bp.exit_points(), vec![ElementId::new("b.py", "bar")]);
    }

    #[test]
    fn test_unknown_selection() {
        let index = foo_bar_index();
        let missing_file = Selection::Files(vec!["nope.py".to_string()]);
        assert!(matches!(
            compose(&index, &missing_file, DetailLevel::Standard),
            Err(Error::SelectionNotFound(_))
        ));
        let missing_element = Selection::Methods(vec![ElementRef::new("a.py", "nope")]);
        assert!(matches!(
            compose(&index, &missing_element, DetailLevel::Standard),
            Err(Error::SelectionNotFound(_))
        ));
    }

    #[test]
    fn test_empty_selection() {
        let index = foo_bar_index();
        assert!(matches!(
            compose(&index, &Selection::Methods(vec![]), DetailLevel::Standard),
            Err(Error::EmptySelection(_))
        ));
    }
}
