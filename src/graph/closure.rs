// Bounded cross-file closure over calls/references edges

use crate::error::Result;
use crate::graph::RelationshipMap;
use crate::model::{Depth, EdgeKey, ElementId, Relationship};
use std::collections::{HashSet, VecDeque};

/// Elements reached from a seed set and the edges walked to reach them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Closure {
    /// Reached elements in visit order, seeds first
    pub elements: Vec<ElementId>,
    /// Traversed edges in traversal order
    pub edges: Vec<Relationship>,
}

impl Closure {
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains(id)
    }
}

impl RelationshipMap {
    /// Breadth-first traversal along outgoing `calls` and `references` edges.
    ///
    /// `Depth::Limited(0)` returns the seeds only. Each element is visited at
    /// most once, so cycles terminate; edges at the same depth are taken in
    /// insertion order.
    pub fn cross_file_closure(&self, seeds: &[ElementId], max_depth: Depth) -> Result<Closure> {
        let mut closure = Closure::default();
        let mut visited: HashSet<ElementId> = HashSet::new();
        let mut walked: HashSet<EdgeKey> = HashSet::new();
        let mut queue: VecDeque<(ElementId, usize)> = VecDeque::new();

        for seed in seeds {
            self.require(seed)?;
            if visited.insert(seed.clone()) {
                closure.elements.push(seed.clone());
                queue.push_back((seed.clone(), 0));
            }
        }

        while let Some((id, depth)) = queue.pop_front() {
            if !max_depth.allows_expansion(depth) {
                continue;
            }
            for edge in self.outgoing_edges(&id) {
                if !edge.kind.is_traversable() || !self.contains(&edge.target) {
                    continue;
                }
                if walked.insert(edge.key()) {
                    closure.edges.push(edge.clone());
                }
                if visited.insert(edge.target.clone()) {
                    closure.elements.push(edge.target.clone());
                    queue.push_back((edge.target.clone(), depth + 1));
                }
            }
        }

        Ok(closure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{Element, ElementKind, Relationship, RelationshipKind};

    fn func(file: &str, name: &str) -> Element {
        Element::new(file, name, ElementKind::Function, 1, 2, format!("def {}(): ...", name))
    }

    fn id(file: &str, name: &str) -> ElementId {
        ElementId::new(file, name)
    }

    /// a.py::foo -> b.py::bar -> c.py::baz -> a.py::foo, plus foo -> qux
    fn cyclic_map() -> RelationshipMap {
        let mut map = RelationshipMap::new();
        map.insert_or_update(
            vec![func("a.py", "foo"), func("b.py", "bar"), func("c.py", "baz"), func("d.py", "qux")],
            vec![
                Relationship::calls(id("a.py", "foo"), id("b.py", "bar")),
                Relationship::calls(id("b.py", "bar"), id("c.py", "baz")),
                Relationship::calls(id("c.py", "baz"), id("a.py", "foo")),
                Relationship::new(id("a.py", "foo"), id("d.py", "qux"), RelationshipKind::References),
            ],
        )
        .unwrap();
        map
    }

    #[test]
    fn test_depth_zero_is_seeds_only() {
        let map = cyclic_map();
        let closure = map.cross_file_closure(&[id("a.py", "foo")], Depth::Limited(0)).unwrap();
        assert_eq!(closure.elements, vec![id("a.py", "foo")]);
        assert!(closure.edges.is_empty());
    }

    #[test]
    fn test_depth_one() {
        let map = cyclic_map();
        let closure = map.cross_file_closure(&[id("a.py", "foo")], Depth::Limited(1)).unwrap();
        assert_eq!(closure.elements, vec![id("a.py", "foo"), id("b.py", "bar"), id("d.py", "qux")]);
        assert_eq!(closure.edges.len(), 2);
    }

    #[test]
    fn test_unbounded_terminates_on_cycle() {
        let map = cyclic_map();
        let closure = map.cross_file_closure(&[id("a.py", "foo")], Depth::Unbounded).unwrap();
        assert_eq!(closure.elements.len(), 4);
        let unique: HashSet<&ElementId> = closure.elements.iter().collect();
        assert_eq!(unique.len(), 4);
        // the back edge baz -> foo is walked even though foo was already visited
        assert_eq!(closure.edges.len(), 4);
    }

    #[test]
    fn test_visit_order_is_reproducible() {
        let first = cyclic_map().cross_file_closure(&[id("a.py", "foo")], Depth::Unbounded).unwrap();
        for _ in 0..5 {
            let again = cyclic_map().cross_file_closure(&[id("a.py", "foo")], Depth::Unbounded).unwrap();
            assert_eq!(first, again);
        }
        assert_eq!(
            first.elements,
            vec![id("a.py", "foo"), id("b.py", "bar"), id("d.py", "qux"), id("c.py", "baz")]
        );
    }

    #[test]
    fn test_contains_edges_are_not_followed() {
        let mut map = RelationshipMap::new();
        let file = Element::file_root("a.py", 3, "h");
        map.insert_or_update(
            vec![file.clone(), func("a.py", "foo")],
            vec![Relationship::contains(file.id.clone(), id("a.py", "foo"))],
        )
        .unwrap();
        let closure = map.cross_file_closure(&[file.id.clone()], Depth::Unbounded).unwrap();
        assert_eq!(closure.elements, vec![file.id]);
    }

    #[test]
    fn test_duplicate_seeds_visit_once() {
        let map = cyclic_map();
        let closure = map
            .cross_file_closure(&[id("a.py", "foo"), id("a.py", "foo")], Depth::Limited(0))
            .unwrap();
        assert_eq!(closure.elements.len(), 1);
    }

    #[test]
    fn test_unknown_seed() {
        let map = cyclic_map();
        let result = map.cross_file_closure(&[id("z.py", "nope")], Depth::Limited(1));
        assert!(matches!(result, Err(Error::UnknownIdentifier(_))));
    }
}
