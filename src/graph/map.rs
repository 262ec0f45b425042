// Relationship map: element store plus per-element edge indexes

use crate::error::{Error, Result};
use crate::model::{Direction, EdgeKey, Element, ElementId, ElementKind, Relationship, RelationshipKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Graph index over all elements and relationships of a scan scope.
///
/// Edges are stored under a monotonically increasing sequence number so every
/// query returns them in insertion order, which keeps traversals reproducible.
#[derive(Debug, Default, Clone)]
pub struct RelationshipMap {
    elements: BTreeMap<ElementId, Element>,
    edges: BTreeMap<u64, Relationship>,
    edge_index: HashMap<EdgeKey, u64>,
    outgoing: HashMap<ElementId, Vec<u64>>,
    incoming: HashMap<ElementId, Vec<u64>>,
    /// File path to the elements it declares (file element included)
    by_file: BTreeMap<String, BTreeSet<ElementId>>,
    /// Qualified and short names to identifiers
    by_name: HashMap<String, BTreeSet<ElementId>>,
    next_seq: u64,
}

impl RelationshipMap {
    /// Create a new empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of elements and edges into the map.
    ///
    /// An element replaced by identifier loses its outgoing `contains` edges
    /// (the batch carries the regenerated ones); edges other elements hold
    /// towards it are kept. Every edge endpoint must exist in the map or in
    /// the batch, otherwise nothing is applied.
    pub fn insert_or_update(&mut self, elements: Vec<Element>, edges: Vec<Relationship>) -> Result<()> {
        let batch_ids: HashSet<&ElementId> = elements.iter().map(|e| &e.id).collect();
        for edge in &edges {
            for endpoint in [&edge.source, &edge.target] {
                if !batch_ids.contains(endpoint) && !self.elements.contains_key(endpoint) {
                    return Err(Error::unknown_identifier(endpoint));
                }
            }
        }

        for element in elements {
            if self.elements.contains_key(&element.id) {
                self.remove_outgoing(&element.id, Some(RelationshipKind::Contains));
                self.unindex_element(&element.id);
            }
            self.index_element(&element);
            self.elements.insert(element.id.clone(), element);
        }

        for edge in edges {
            self.insert_edge(edge);
        }
        Ok(())
    }

    /// Add or refresh a single edge whose endpoints already exist
    pub fn add_edge(&mut self, edge: Relationship) -> Result<()> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.elements.contains_key(endpoint) {
                return Err(Error::unknown_identifier(endpoint));
            }
        }
        self.insert_edge(edge);
        Ok(())
    }

    fn insert_edge(&mut self, edge: Relationship) {
        let key = edge.key();
        if let Some(seq) = self.edge_index.get(&key) {
            if let Some(existing) = self.edges.get_mut(seq) {
                if edge.line.is_some() {
                    existing.line = edge.line;
                }
            }
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.outgoing.entry(edge.source.clone()).or_default().push(seq);
        self.incoming.entry(edge.target.clone()).or_default().push(seq);
        self.edge_index.insert(key, seq);
        self.edges.insert(seq, edge);
    }

    fn index_element(&mut self, element: &Element) {
        self.by_file
            .entry(element.file.clone())
            .or_default()
            .insert(element.id.clone());
        self.by_name
            .entry(element.name.clone())
            .or_default()
            .insert(element.id.clone());
        if element.kind != ElementKind::File && element.short_name() != element.name {
            self.by_name
                .entry(element.short_name().to_string())
                .or_default()
                .insert(element.id.clone());
        }
    }

    fn unindex_element(&mut self, id: &ElementId) {
        let Some(element) = self.elements.get(id) else {
            return;
        };
        let names = [element.name.clone(), element.short_name().to_string()];
        let file = element.file.clone();
        for name in names {
            if let Some(ids) = self.by_name.get_mut(&name) {
                ids.remove(id);
                if ids.is_empty() {
                    self.by_name.remove(&name);
                }
            }
        }
        if let Some(ids) = self.by_file.get_mut(&file) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_file.remove(&file);
            }
        }
    }

    /// Remove an element; its edges stay until [`prune_orphans`](Self::prune_orphans)
    pub fn remove_element(&mut self, id: &ElementId) -> Result<Element> {
        if !self.elements.contains_key(id) {
            return Err(Error::unknown_identifier(id));
        }
        self.unindex_element(id);
        self.elements
            .remove(id)
            .ok_or_else(|| Error::unknown_identifier(id))
    }

    /// Remove outgoing edges of `id`, optionally only of one kind
    pub fn remove_outgoing(&mut self, id: &ElementId, kind: Option<RelationshipKind>) -> Vec<Relationship> {
        let seqs: Vec<u64> = self
            .outgoing
            .get(id)
            .map(|seqs| {
                seqs.iter()
                    .copied()
                    .filter(|seq| {
                        kind.map_or(true, |k| self.edges.get(seq).is_some_and(|e| e.kind == k))
                    })
                    .collect()
            })
            .unwrap_or_default();
        seqs.into_iter().filter_map(|seq| self.remove_edge_seq(seq)).collect()
    }

    fn remove_edge_seq(&mut self, seq: u64) -> Option<Relationship> {
        let edge = self.edges.remove(&seq)?;
        self.edge_index.remove(&edge.key());
        for (index, endpoint) in [(&mut self.outgoing, &edge.source), (&mut self.incoming, &edge.target)] {
            if let Some(seqs) = index.get_mut(endpoint) {
                seqs.retain(|s| *s != seq);
                if seqs.is_empty() {
                    index.remove(endpoint);
                }
            }
        }
        Some(edge)
    }

    /// Remove edges whose source or target no longer exists, returned in insertion order
    pub fn prune_orphans(&mut self) -> Vec<Relationship> {
        let stale: Vec<u64> = self
            .edges
            .iter()
            .filter(|(_, e)| !self.elements.contains_key(&e.source) || !self.elements.contains_key(&e.target))
            .map(|(seq, _)| *seq)
            .collect();
        let pruned: Vec<Relationship> = stale.into_iter().filter_map(|seq| self.remove_edge_seq(seq)).collect();
        if !pruned.is_empty() {
            debug!("Pruned {} orphaned relationships", pruned.len());
        }
        pruned
    }

    /// Adjacent edges in insertion order, optionally filtered by kind
    pub fn neighbors(
        &self,
        id: &ElementId,
        direction: Direction,
        kind: Option<RelationshipKind>,
    ) -> Result<Vec<&Relationship>> {
        self.require(id)?;
        let mut seqs: Vec<u64> = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            seqs.extend(self.outgoing.get(id).into_iter().flatten());
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            seqs.extend(self.incoming.get(id).into_iter().flatten());
        }
        seqs.sort_unstable();
        seqs.dedup();
        Ok(seqs
            .iter()
            .filter_map(|seq| self.edges.get(seq))
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .collect())
    }

    pub(crate) fn outgoing_edges<'a>(&'a self, id: &ElementId) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(move |seq| self.edges.get(seq))
    }

    pub(crate) fn incoming_edges<'a>(&'a self, id: &ElementId) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.incoming
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(move |seq| self.edges.get(seq))
    }

    pub(crate) fn require(&self, id: &ElementId) -> Result<&Element> {
        self.elements.get(id).ok_or_else(|| Error::unknown_identifier(id))
    }

    /// Look up an element, failing for identifiers never inserted
    pub fn get(&self, id: &ElementId) -> Result<&Element> {
        self.require(id)
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn has_edge(&self, key: &EdgeKey) -> bool {
        self.edge_index.contains_key(key)
    }

    /// Elements declared in a file ordered by line, file element first
    pub fn elements_in_file(&self, path: &str) -> Vec<&Element> {
        let mut elements: Vec<&Element> = self
            .by_file
            .get(path)
            .into_iter()
            .flatten()
            .filter_map(|id| self.elements.get(id))
            .collect();
        elements.sort_by(|a, b| {
            (a.kind != ElementKind::File)
                .cmp(&(b.kind != ElementKind::File))
                .then(a.line_start.cmp(&b.line_start))
                .then_with(|| a.id.cmp(&b.id))
        });
        elements
    }

    pub fn ids_in_file(&self, path: &str) -> BTreeSet<ElementId> {
        self.by_file.get(path).cloned().unwrap_or_default()
    }

    /// Identifiers whose qualified or short name matches
    pub fn find_by_name(&self, name: &str) -> Vec<&ElementId> {
        self.by_name.get(name).into_iter().flatten().collect()
    }

    /// Known file paths in lexicographic order
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.by_file.keys().map(|p| p.as_str())
    }

    /// All elements in identifier order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// All edges in insertion order
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.edges.values()
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

    /// Counts of elements and relationships by kind
    pub fn stats(&self) -> MapStats {
        let mut stats = MapStats::default();
        for element in self.elements.values() {
            *stats.elements_by_kind.entry(element.kind).or_default() += 1;
        }
        for edge in self.edges.values() {
            *stats.relationships_by_kind.entry(edge.kind).or_default() += 1;
        }
        stats.files = self.by_file.len();
        stats.elements = self.elements.len();
        stats.relationships = self.edges.len();
        stats
    }
}

/// Statistics about the relationship map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapStats {
    pub files: usize,
    pub elements: usize,
    pub relationships: usize,
    pub elements_by_kind: BTreeMap<ElementKind, usize>,
    pub relationships_by_kind: BTreeMap<RelationshipKind, usize>,
}
