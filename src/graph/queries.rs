// Structural queries: containment ancestry, paths, subgraphs

use crate::error::{Error, Result};
use crate::graph::RelationshipMap;
use crate::model::{ElementId, RelationshipKind};
use std::collections::{HashMap, HashSet, VecDeque};

impl RelationshipMap {
    /// Containers of `id`, nearest first (method -> class -> file)
    pub fn ancestors(&self, id: &ElementId) -> Result<Vec<ElementId>> {
        self.require(id)?;
        let mut result = Vec::new();
        let mut seen: HashSet<ElementId> = HashSet::from([id.clone()]);
        let mut current = id.clone();
        while let Some(parent) = self
            .incoming_edges(&current)
            .find(|e| e.kind == RelationshipKind::Contains)
            .map(|e| e.source.clone())
        {
            if !seen.insert(parent.clone()) {
                break;
            }
            result.push(parent.clone());
            current = parent;
        }
        Ok(result)
    }

    /// Everything transitively contained by `id`, breadth first
    pub fn descendants(&self, id: &ElementId) -> Result<Vec<ElementId>> {
        self.require(id)?;
        let mut result = Vec::new();
        let mut seen: HashSet<ElementId> = HashSet::from([id.clone()]);
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing_edges(&current) {
                if edge.kind == RelationshipKind::Contains && seen.insert(edge.target.clone()) {
                    result.push(edge.target.clone());
                    queue.push_back(edge.target.clone());
                }
            }
        }
        Ok(result)
    }

    /// Shortest chain of non-`contains` edges from `from` to `to`
    pub fn shortest_path(&self, from: &ElementId, to: &ElementId) -> Result<Vec<ElementId>> {
        self.require(from)?;
        self.require(to)?;

        let mut parents: HashMap<ElementId, ElementId> = HashMap::new();
        let mut seen: HashSet<ElementId> = HashSet::from([from.clone()]);
        let mut queue = VecDeque::from([from.clone()]);

        while let Some(current) = queue.pop_front() {
            if &current == to {
                let mut path = vec![current.clone()];
                let mut cursor = &current;
                while let Some(parent) = parents.get(cursor) {
                    path.push(parent.clone());
                    cursor = parent;
                }
                path.reverse();
                return Ok(path);
            }
            for edge in self.outgoing_edges(&current) {
                if edge.kind == RelationshipKind::Contains {
                    continue;
                }
                if seen.insert(edge.target.clone()) {
                    parents.insert(edge.target.clone(), current.clone());
                    queue.push_back(edge.target.clone());
                }
            }
        }

        Err(Error::not_found(format!("path from {} to {}", from, to)))
    }

    /// New map holding only `ids` and the edges among them
    pub fn subgraph(&self, ids: &[ElementId]) -> Result<RelationshipMap> {
        let wanted: HashSet<&ElementId> = ids.iter().collect();
        let mut elements = Vec::with_capacity(ids.len());
        for id in ids {
            elements.push(self.require(id)?.clone());
        }
        let edges = self
            .relationships()
            .filter(|e| wanted.contains(&e.source) && wanted.contains(&e.target))
            .cloned()
            .collect();
        let mut sub = RelationshipMap::new();
        sub.insert_or_update(elements, edges)?;
        Ok(sub)
    }
}
