// JSON mirror store
//
// Per-file structured snapshot of the declared elements. Mutation is crate
// private: only the scan index writes here, in the same batch that updates
// the relationship map.

use crate::error::{Error, Result};
use crate::model::{Element, ElementId, ElementKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One element as mirrored for its file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorElement {
    pub id: ElementId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub line_start: usize,
    pub line_end: usize,
    pub source: String,
    pub content_hash: String,
}

impl From<&Element> for MirrorElement {
    fn from(element: &Element) -> Self {
        Self {
            id: element.id.clone(),
            name: element.name.clone(),
            kind: element.kind,
            line_start: element.line_start,
            line_end: element.line_end,
            source: element.source.clone(),
            content_hash: element.content_hash.clone(),
        }
    }
}

/// Mirror document for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMirror {
    pub path: String,
    pub content_hash: String,
    /// Declared elements ordered by line
    pub elements: Vec<MirrorElement>,
}

impl FileMirror {
    /// Identifiers this mirror accounts for, file element included
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::once(ElementId::file(&self.path)).chain(self.elements.iter().map(|e| e.id.clone()))
    }

    pub fn element(&self, name: &str) -> Option<&MirrorElement> {
        self.elements.iter().find(|e| e.name == name)
    }
}

/// Mapping from normalized file path to its mirror
#[derive(Debug, Default, Clone)]
pub struct MirrorStore {
    files: BTreeMap<String, FileMirror>,
}

impl MirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole entry for a file
    pub(crate) fn upsert_file(&mut self, path: &str, content_hash: &str, elements: &[Element]) {
        let mut mirrored: Vec<MirrorElement> = elements
            .iter()
            .filter(|e| e.kind != ElementKind::File)
            .map(MirrorElement::from)
            .collect();
        mirrored.sort_by(|a, b| a.line_start.cmp(&b.line_start).then_with(|| a.id.cmp(&b.id)));
        self.files.insert(
            path.to_string(),
            FileMirror {
                path: path.to_string(),
                content_hash: content_hash.to_string(),
                elements: mirrored,
            },
        );
    }

    pub(crate) fn remove_file(&mut self, path: &str) -> Option<FileMirror> {
        self.files.remove(path)
    }

    /// Current mirror for a file
    pub fn get_file(&self, path: &str) -> Result<&FileMirror> {
        self.files
            .get(path)
            .ok_or_else(|| Error::not_found(format!("mirror for {}", path)))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// True if the mirror was built from content with this hash
    pub fn is_up_to_date(&self, path: &str, content_hash: &str) -> bool {
        self.files
            .get(path)
            .is_some_and(|mirror| mirror.content_hash == content_hash)
    }

    /// Mirrored paths in lexicographic order
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|p| p.as_str())
    }

    pub fn mirrors(&self) -> impl Iterator<Item = &FileMirror> {
        self.files.values()
    }

    /// Every identifier the store accounts for
    pub fn element_ids(&self) -> BTreeSet<ElementId> {
        self.files.values().flat_map(|m| m.ids()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements() -> Vec<Element> {
        vec![
            Element::new("a.py", "late", ElementKind::Function, 10, 12, "def late(): ..."),
            Element::file_root("a.py", 12, "hash"),
            Element::new("a.py", "early", ElementKind::Function, 1, 3, "def early(): ..."),
        ]
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = MirrorStore::new();
        store.upsert_file("a.py", "hash", &elements());
        let mirror = store.get_file("a.py").unwrap();
        assert_eq!(mirror.content_hash, "hash");
        let names: Vec<&str> = mirror.elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn test_upsert_replaces_whole_entry() {
        let mut store = MirrorStore::new();
        store.upsert_file("a.py", "hash", &elements());
        store.upsert_file(
            "a.py",
            "hash2",
            &[Element::new("a.py", "only", ElementKind::Function, 1, 2, "def only(): ...")],
        );
        let mirror = store.get_file("a.py").unwrap();
        assert_eq!(mirror.elements.len(), 1);
        assert!(mirror.element("early").is_none());
        assert!(store.is_up_to_date("a.py", "hash2"));
        assert!(!store.is_up_to_date("a.py", "hash"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let store = MirrorStore::new();
        assert!(matches!(store.get_file("nope.py"), Err(Error::NotFound(_))));
        assert!(!store.exists("nope.py"));
    }

    #[test]
    fn test_element_ids_include_file() {
        let mut store = MirrorStore::new();
        store.upsert_file("a.py", "hash", &elements());
        let ids = store.element_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&ElementId::file("a.py")));
    }

    #[test]
    fn test_mirror_serializes_type_key() {
        let mut store = MirrorStore::new();
        store.upsert_file("a.py", "hash", &elements());
        let json = serde_json::to_value(store.get_file("a.py").unwrap()).unwrap();
        assert_eq!(json["elements"][0]["type"], "function");
    }
}
