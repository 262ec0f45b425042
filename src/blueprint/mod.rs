// Blueprints: typed, composable views over the scan index

pub mod compose;
pub mod definition;

pub use compose::*;
pub use definition::*;

use crate::error::{Error, Result};
use crate::model::{DetailLevel, EdgeKey, Element, ElementId, ElementKind, Relationship, RelationshipKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// How a blueprint's selection is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlueprintKind {
    File,
    Method,
    Feature,
}

impl BlueprintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlueprintKind::File => "file",
            BlueprintKind::Method => "method",
            BlueprintKind::Feature => "feature",
        }
    }
}

impl fmt::Display for BlueprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlueprintKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" | "files" => Ok(BlueprintKind::File),
            "method" | "methods" => Ok(BlueprintKind::Method),
            "feature" => Ok(BlueprintKind::Feature),
            other => Err(Error::invalid_definition(format!(
                "unknown blueprint type '{}'. Valid options are: file, method, feature",
                other
            ))),
        }
    }
}

/// A generated view over scanned code.
///
/// Elements and edges are keyed by identifier, so unions are set unions.
/// Feature blueprints additionally record their member set; entry and exit
/// points are derived from members and edges on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    pub kind: BlueprintKind,
    pub name: Option<String>,
    pub detail_level: DetailLevel,
    pub generated_at: DateTime<Utc>,
    /// Assigned by the version registry for stored feature blueprints
    pub version: Option<u32>,
    elements: BTreeMap<ElementId, Element>,
    edges: BTreeMap<EdgeKey, Relationship>,
    members: BTreeSet<ElementId>,
    file_hashes: BTreeMap<String, String>,
}

impl Blueprint {
    pub fn new(kind: BlueprintKind, detail_level: DetailLevel) -> Self {
        Self {
            kind,
            name: None,
            detail_level,
            generated_at: Utc::now(),
            version: None,
            elements: BTreeMap::new(),
            edges: BTreeMap::new(),
            members: BTreeSet::new(),
            file_hashes: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn insert_element(&mut self, element: Element) {
        self.elements.insert(element.id.clone(), element);
    }

    pub fn insert_edge(&mut self, edge: Relationship) {
        self.edges.entry(edge.key()).or_insert(edge);
    }

    /// Mark an element as belonging to the feature
    pub fn add_member(&mut self, id: ElementId) {
        self.members.insert(id);
    }

    /// Record the content hash of a file contributing elements
    pub fn set_file_hash(&mut self, path: impl Into<String>, hash: impl Into<String>) {
        self.file_hashes.insert(path.into(), hash.into());
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Elements in identifier order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn element_ids(&self) -> BTreeSet<ElementId> {
        self.elements.keys().cloned().collect()
    }

    /// Edges in (source, target, kind) order
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.edges.values()
    }

    pub fn edge_keys(&self) -> BTreeSet<EdgeKey> {
        self.edges.keys().cloned().collect()
    }

    pub fn has_edge(&self, key: &EdgeKey) -> bool {
        self.edges.contains_key(key)
    }

    pub fn members(&self) -> &BTreeSet<ElementId> {
        &self.members
    }

    /// Paths of files contributing elements, sorted
    pub fn files(&self) -> BTreeSet<&str> {
        self.elements.values().map(|e| e.file.as_str()).collect()
    }

    /// Content hash of a contributing file, empty when unknown
    pub fn file_hash(&self, path: &str) -> &str {
        self.file_hashes.get(path).map(|h| h.as_str()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn relationship_count(&self) -> usize {
        self.edges.len()
    }

    /// Members that no other member calls
    pub fn entry_points(&self) -> Vec<ElementId> {
        self.members
            .iter()
            .filter(|id| !id.is_file())
            .filter(|id| {
                !self.edges.values().any(|e| {
                    e.kind == RelationshipKind::Calls
                        && &e.target == *id
                        && e.source != e.target
                        && self.members.contains(&e.source)
                })
            })
            .cloned()
            .collect()
    }

    /// Members with an outgoing edge that leaves the member set
    pub fn exit_points(&self) -> Vec<ElementId> {
        self.members
            .iter()
            .filter(|id| {
                self.edges.values().any(|e| {
                    e.kind != RelationshipKind::Contains && &e.source == *id && !self.members.contains(&e.target)
                })
            })
            .cloned()
            .collect()
    }

    /// Combine two blueprints of the same kind.
    ///
    /// Elements are unioned by identifier; when both sides carry the same
    /// identifier the newer blueprint's copy wins, `other` on a tie. Edges,
    /// members and file hashes are unioned the same way.
    pub fn merge(&self, other: &Blueprint) -> Result<Blueprint> {
        if self.kind != other.kind {
            return Err(Error::IncompatibleMerge(format!(
                "{} blueprint cannot be merged with a {} blueprint",
                self.kind, other.kind
            )));
        }
        let (older, newer) = if other.generated_at >= self.generated_at {
            (self, other)
        } else {
            (other, self)
        };

        let mut merged = older.clone();
        merged.name = newer.name.clone().or_else(|| older.name.clone());
        merged.version = if self.version == other.version { self.version } else { None };
        merged.detail_level = self.detail_level.max(other.detail_level);
        merged.generated_at = newer.generated_at;
        for element in newer.elements.values() {
            merged.insert_element(element.clone());
        }
        for (key, edge) in &newer.edges {
            merged.edges.insert(key.clone(), edge.clone());
        }
        merged.members.extend(newer.members.iter().cloned());
        merged
            .file_hashes
            .extend(newer.file_hashes.iter().map(|(p, h)| (p.clone(), h.clone())));
        Ok(merged)
    }

    /// Element count by kind, for summaries
    pub fn counts_by_kind(&self) -> BTreeMap<ElementKind, usize> {
        let mut counts = BTreeMap::new();
        for element in self.elements.values() {
            *counts.entry(element.kind).or_default() += 1;
        }
        counts
    }
}
