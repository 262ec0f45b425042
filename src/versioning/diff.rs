// Differences between two blueprint renderings

use crate::blueprint::Blueprint;
use crate::model::{EdgeKey, ElementId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Element, edge and membership changes from `old` to `new`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintDiff {
    pub added_elements: Vec<ElementId>,
    pub removed_elements: Vec<ElementId>,
    /// Same identifier, different content hash
    pub modified_elements: Vec<ElementId>,
    pub added_edges: Vec<EdgeKey>,
    pub removed_edges: Vec<EdgeKey>,
    pub added_members: Vec<ElementId>,
    pub removed_members: Vec<ElementId>,
}

impl BlueprintDiff {
    pub fn between(old: &Blueprint, new: &Blueprint) -> Self {
        let old_ids = old.element_ids();
        let new_ids = new.element_ids();
        let old_edges = old.edge_keys();
        let new_edges = new.edge_keys();

        let modified_elements = old_ids
            .intersection(&new_ids)
            .filter(|id| {
                let before = old.element(id).map(|e| e.content_hash.as_str());
                let after = new.element(id).map(|e| e.content_hash.as_str());
                before != after
            })
            .cloned()
            .collect();

        Self {
            added_elements: difference(&new_ids, &old_ids),
            removed_elements: difference(&old_ids, &new_ids),
            modified_elements,
            added_edges: difference(&new_edges, &old_edges),
            removed_edges: difference(&old_edges, &new_edges),
            added_members: difference(new.members(), old.members()),
            removed_members: difference(old.members(), new.members()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added_elements.is_empty()
            && self.removed_elements.is_empty()
            && self.modified_elements.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
            && self.added_members.is_empty()
            && self.removed_members.is_empty()
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "elements +{} -{} ~{}, relationships +{} -{}, members +{} -{}",
            self.added_elements.len(),
            self.removed_elements.len(),
            self.modified_elements.len(),
            self.added_edges.len(),
            self.removed_edges.len(),
            self.added_members.len(),
            self.removed_members.len()
        )
    }
}

fn difference<T: Ord + Clone>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> Vec<T> {
    left.difference(right).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::BlueprintKind;
    use crate::model::{DetailLevel, Element, ElementKind, Relationship};

    fn func(file: &str, name: &str, source: &str) -> Element {
        Element::new(file, name, ElementKind::Function, 1, 2, source)
    }

    #[test]
    fn test_identical_blueprints_have_no_diff() {
        let mut bp = Blueprint::new(BlueprintKind::Feature, DetailLevel::Standard);
        bp.insert_element(func("a.js", "a", "function a() {}"));
        let diff = BlueprintDiff::between(&bp, &bp.clone());
        assert!(diff.is_empty());
        assert_eq!(diff.summary(), "elements +0 -0 ~0, relationships +0 -0, members +0 -0");
    }

    #[test]
    fn test_classifies_changes() {
        let mut old = Blueprint::new(BlueprintKind::Feature, DetailLevel::Standard);
        old.insert_element(func("a.js", "kept", "function kept() {}"));
        old.insert_element(func("a.js", "changed", "function changed() {}"));
        old.insert_element(func("a.js", "gone", "function gone() {}"));
        old.insert_edge(Relationship::calls(ElementId::new("a.js", "kept"), ElementId::new("a.js", "gone")));
        old.add_member(ElementId::new("a.js", "gone"));

        let mut new = Blueprint::new(BlueprintKind::Feature, DetailLevel::Standard);
        new.insert_element(func("a.js", "kept", "function kept() {}"));
        new.insert_element(func("a.js", "changed", "function changed() { return 1 }"));
        new.insert_element(func("b.js", "fresh", "function fresh() {}"));
        new.insert_edge(Relationship::calls(ElementId::new("a.js", "kept"), ElementId::new("b.js", "fresh")));
        new.add_member(ElementId::new("b.js", "fresh"));

        let diff = BlueprintDiff::between(&old, &new);
        assert_eq!(diff.added_elements, vec![ElementId::new("b.js", "fresh")]);
        assert_eq!(diff.removed_elements, vec![ElementId::new("a.js", "gone")]);
        assert_eq!(diff.modified_elements, vec![ElementId::new("a.js", "changed")]);
        assert_eq!(diff.added_edges.len(), 1);
        assert_eq!(diff.removed_edges.len(), 1);
        assert_eq!(diff.added_members, vec![ElementId::new("b.js", "fresh")]);
        assert_eq!(diff.removed_members, vec![ElementId::new("a.js", "gone")]);
    }
}
