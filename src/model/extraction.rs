// Raw extraction input and its normalization into model records
//
// The extraction collaborator hands over, per file, the declared elements and
// the raw reference edges between names. Normalization turns that into
// elements with stable identifiers, containment edges, and edges whose
// targets still have to be resolved against the whole scan.

use crate::error::{Error, Result};
use crate::model::{content_hash, normalize_path, Element, ElementId, ElementKind, Relationship, RelationshipKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Extraction result for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExtraction {
    pub path: String,
    /// Full file text, used for the file content hash when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub elements: Vec<RawElement>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

/// A declared code element as reported by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    /// Qualified name within the file, e.g. `User.save`
    pub name: String,
    pub kind: ElementKind,
    #[serde(alias = "line_start")]
    pub line_start: usize,
    #[serde(alias = "line_end")]
    pub line_end: usize,
    #[serde(default, alias = "source_text")]
    pub source_text: String,
}

/// A reference between names as reported by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdge {
    /// Declaring element name; empty or the file path for file-level edges
    #[serde(default, alias = "source_name")]
    pub source_name: String,
    #[serde(alias = "target_name")]
    pub target_name: String,
    pub kind: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl RawExtraction {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: None,
            elements: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn element(
        mut self,
        name: &str,
        kind: ElementKind,
        line_start: usize,
        line_end: usize,
        source_text: &str,
    ) -> Self {
        self.elements.push(RawElement {
            name: name.to_string(),
            kind,
            line_start,
            line_end,
            source_text: source_text.to_string(),
        });
        self
    }

    pub fn edge(mut self, source_name: &str, target_name: &str, kind: RelationshipKind) -> Self {
        self.edges.push(RawEdge {
            source_name: source_name.to_string(),
            target_name: target_name.to_string(),
            kind,
            line: None,
        });
        self
    }

    /// Content hash of the file: the full text when known, else the declared elements
    pub fn content_hash(&self) -> String {
        match &self.source {
            Some(source) => content_hash(source),
            None => {
                let mut digest_input = String::new();
                for element in &self.elements {
                    digest_input.push_str(&element.name);
                    digest_input.push('\n');
                    digest_input.push_str(&element.source_text);
                    digest_input.push('\n');
                }
                content_hash(&digest_input)
            }
        }
    }

    /// Validate and normalize into canonical records
    pub fn normalize(&self) -> Result<NormalizedFile> {
        let path = normalize_path(&self.path);
        if path.is_empty() {
            return Err(Error::malformed("<unknown>", "extraction has no file path"));
        }

        // Last declaration wins when a name is declared twice
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        let mut elements: Vec<Element> = Vec::with_capacity(self.elements.len());
        for raw in &self.elements {
            validate_element(&path, raw)?;
            let element = Element::new(
                &path,
                raw.name.trim(),
                raw.kind,
                raw.line_start,
                raw.line_end,
                raw.source_text.clone(),
            );
            match by_name.get(raw.name.trim()) {
                Some(&index) => {
                    warn!("{}: duplicate declaration of '{}', keeping the last one", path, raw.name);
                    elements[index] = element;
                }
                None => {
                    by_name.insert(raw.name.trim(), elements.len());
                    elements.push(element);
                }
            }
        }
        elements.sort_by(|a, b| a.line_start.cmp(&b.line_start).then_with(|| a.id.cmp(&b.id)));

        let line_end = self
            .source
            .as_ref()
            .map(|s| s.lines().count())
            .unwrap_or(0)
            .max(elements.iter().map(|e| e.line_end).max().unwrap_or(1));
        let file_element = Element::file_root(&path, line_end, self.content_hash());

        let contains = containment_edges(&file_element, &elements);

        let mut edges = Vec::with_capacity(self.edges.len());
        for raw in &self.edges {
            let target_name = raw.target_name.trim();
            if target_name.is_empty() {
                return Err(Error::malformed(&path, "edge has an empty target name"));
            }
            let source = resolve_source(&path, &file_element, &elements, raw.source_name.trim())?;
            edges.push(UnresolvedEdge {
                source,
                target_name: target_name.to_string(),
                kind: raw.kind,
                line: raw.line,
            });
        }

        Ok(NormalizedFile {
            path,
            content_hash: file_element.content_hash.clone(),
            file_element,
            elements,
            contains,
            edges,
        })
    }
}

/// Canonical records for one file, ready to enter the scan index
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    pub path: String,
    pub content_hash: String,
    pub file_element: Element,
    /// Declared elements ordered by line
    pub elements: Vec<Element>,
    pub contains: Vec<Relationship>,
    pub edges: Vec<UnresolvedEdge>,
}

impl NormalizedFile {
    /// File element followed by the declared elements
    pub fn all_elements(&self) -> impl Iterator<Item = &Element> {
        std::iter::once(&self.file_element).chain(self.elements.iter())
    }

    pub fn ids(&self) -> Vec<ElementId> {
        self.all_elements().map(|e| e.id.clone()).collect()
    }
}

/// An edge whose source is known but whose target is still a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedEdge {
    pub source: ElementId,
    pub target_name: String,
    pub kind: RelationshipKind,
    pub line: Option<usize>,
}

impl UnresolvedEdge {
    pub fn resolve(&self, target: ElementId) -> Relationship {
        Relationship::new(self.source.clone(), target, self.kind).with_line(self.line)
    }
}

fn validate_element(path: &str, raw: &RawElement) -> Result<()> {
    if raw.name.trim().is_empty() {
        return Err(Error::malformed(path, "element has an empty name"));
    }
    if raw.kind == ElementKind::File {
        return Err(Error::malformed(
            path,
            format!("element '{}' declares kind file; file elements are derived from the path", raw.name),
        ));
    }
    if raw.line_start < 1 || raw.line_end < 1 {
        return Err(Error::malformed(
            path,
            format!("element '{}' has a line number below 1", raw.name),
        ));
    }
    if raw.line_start > raw.line_end {
        return Err(Error::malformed(
            path,
            format!(
                "element '{}' starts at line {} after it ends at line {}",
                raw.name, raw.line_start, raw.line_end
            ),
        ));
    }
    Ok(())
}

/// File contains top-level elements; an element contains those whose dotted
/// prefix names it
fn containment_edges(file: &Element, elements: &[Element]) -> Vec<Relationship> {
    let ids: HashMap<&str, &ElementId> = elements.iter().map(|e| (e.name.as_str(), &e.id)).collect();
    elements
        .iter()
        .map(|element| {
            let parent = element
                .parent_name()
                .and_then(|name| ids.get(name).copied())
                .unwrap_or(&file.id);
            Relationship::contains(parent.clone(), element.id.clone())
        })
        .collect()
}

fn resolve_source(path: &str, file: &Element, elements: &[Element], name: &str) -> Result<ElementId> {
    if name.is_empty() || name == path || name == file.name {
        return Ok(file.id.clone());
    }
    if let Some(element) = elements.iter().find(|e| e.name == name) {
        return Ok(element.id.clone());
    }
    let mut by_short = elements.iter().filter(|e| e.short_name() == name);
    match (by_short.next(), by_short.next()) {
        (Some(element), None) => Ok(element.id.clone()),
        (Some(_), Some(_)) => Err(Error::malformed(
            path,
            format!("edge source '{}' is ambiguous within the file", name),
        )),
        _ => Err(Error::malformed(
            path,
            format!("edge source '{}' is not declared in the file", name),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawExtraction {
        RawExtraction::new("./pkg/a.py")
            .element("User", ElementKind::Class, 1, 6, "class User:\n    def save(self): ...")
            .element("User.save", ElementKind::Method, 2, 3, "def save(self): ...")
            .element("foo", ElementKind::Function, 8, 9, "def foo():\n    bar()")
            .edge("foo", "bar", RelationshipKind::Calls)
            .edge("", "b", RelationshipKind::Imports)
    }

    #[test]
    fn test_normalize_builds_identifiers() {
        let file = sample().normalize().unwrap();
        assert_eq!(file.path, "pkg/a.py");
        assert_eq!(file.file_element.id.as_str(), "file:pkg/a.py");
        let ids: Vec<&str> = file.elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["pkg/a.py::User", "pkg/a.py::User.save", "pkg/a.py::foo"]);
    }

    #[test]
    fn test_normalize_twice_is_identical() {
        let a = sample().normalize().unwrap();
        let b = sample().normalize().unwrap();
        assert_eq!(a.ids(), b.ids());
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_containment_follows_dotted_names() {
        let file = sample().normalize().unwrap();
        let pairs: Vec<(&str, &str)> = file
            .contains
            .iter()
            .map(|r| (r.source.as_str(), r.target.as_str()))
            .collect();
        assert!(pairs.contains(&("file:pkg/a.py", "pkg/a.py::User")));
        assert!(pairs.contains(&("pkg/a.py::User", "pkg/a.py::User.save")));
        assert!(pairs.contains(&("file:pkg/a.py", "pkg/a.py::foo")));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_edges_stay_unresolved() {
        let file = sample().normalize().unwrap();
        assert_eq!(file.edges.len(), 2);
        assert_eq!(file.edges[0].source.as_str(), "pkg/a.py::foo");
        assert_eq!(file.edges[0].target_name, "bar");
        assert_eq!(file.edges[1].source.as_str(), "file:pkg/a.py");
    }

    #[test]
    fn test_missing_path_is_malformed() {
        let err = RawExtraction::new("  ").normalize().unwrap_err();
        assert!(matches!(err, Error::MalformedExtraction { .. }));
    }

    #[test]
    fn test_bad_line_range_is_malformed() {
        let err = RawExtraction::new("a.py")
            .element("foo", ElementKind::Function, 5, 2, "")
            .normalize()
            .unwrap_err();
        match err {
            Error::MalformedExtraction { path, message } => {
                assert_eq!(path, "a.py");
                assert!(message.contains("foo"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let zero = RawExtraction::new("a.py")
            .element("foo", ElementKind::Function, 0, 2, "")
            .normalize();
        assert!(zero.is_err());
    }

    #[test]
    fn test_empty_name_is_malformed() {
        let result = RawExtraction::new("a.py")
            .element(" ", ElementKind::Function, 1, 2, "")
            .normalize();
        assert!(matches!(result, Err(Error::MalformedExtraction { .. })));
    }

    #[test]
    fn test_undeclared_edge_source_is_malformed() {
        let result = RawExtraction::new("a.py")
            .element("foo", ElementKind::Function, 1, 2, "")
            .edge("ghost", "foo", RelationshipKind::Calls)
            .normalize();
        assert!(matches!(result, Err(Error::MalformedExtraction { .. })));
    }

    #[test]
    fn test_duplicate_declaration_keeps_last() {
        let file = RawExtraction::new("a.py")
            .element("foo", ElementKind::Function, 1, 2, "def foo(): 1")
            .element("foo", ElementKind::Function, 4, 5, "def foo(): 2")
            .normalize()
            .unwrap();
        assert_eq!(file.elements.len(), 1);
        assert_eq!(file.elements[0].line_start, 4);
    }

    #[test]
    fn test_parses_camel_case_input() {
        let json = r#"{
            "path": "a.py",
            "elements": [{"name": "foo", "kind": "function", "lineStart": 1, "lineEnd": 2, "sourceText": "def foo(): pass"}],
            "edges": [{"sourceName": "foo", "targetName": "bar", "kind": "calls"}]
        }"#;
        let raw: RawExtraction = serde_json::from_str(json).unwrap();
        assert_eq!(raw.elements[0].line_end, 2);
        assert_eq!(raw.edges[0].target_name, "bar");
    }

    #[test]
    fn test_content_hash_prefers_full_source() {
        let a = RawExtraction::new("a.py").with_source("x = 1\n");
        let b = RawExtraction::new("a.py").with_source("x = 2\n");
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
