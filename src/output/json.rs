// JSON encoding of blueprints and parsing rendered documents back

use crate::blueprint::{Blueprint, BlueprintKind};
use crate::error::{Error, Result};
use crate::model::{DetailLevel, Element, ElementId, ElementKind, Relationship, RelationshipKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rendered blueprint with deterministic ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintDocument {
    pub blueprint_type: BlueprintKind,
    pub generation_time: DateTime<Utc>,
    pub detail_level: DetailLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<FeatureSection>,
    pub files: Vec<FileSection>,
    pub relationships: Vec<RelationshipRecord>,
}

/// Derived feature data; only `members` is read back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSection {
    pub members: Vec<ElementId>,
    #[serde(default)]
    pub entry_points: Vec<ElementId>,
    #[serde(default)]
    pub exit_points: Vec<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSection {
    pub path: String,
    pub content_hash: String,
    pub elements: Vec<ElementRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub line_start: usize,
    pub line_end: usize,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub source: ElementId,
    pub target: ElementId,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl From<&Blueprint> for BlueprintDocument {
    fn from(blueprint: &Blueprint) -> Self {
        let files = blueprint
            .files()
            .into_iter()
            .map(|path| {
                let mut elements: Vec<&Element> = blueprint.elements().filter(|e| e.file == path).collect();
                // File element first, then by line; identifiers break ties
                elements.sort_by(|a, b| {
                    (a.kind != ElementKind::File)
                        .cmp(&(b.kind != ElementKind::File))
                        .then(a.line_start.cmp(&b.line_start))
                        .then_with(|| a.id.cmp(&b.id))
                });
                FileSection {
                    path: path.to_string(),
                    content_hash: blueprint.file_hash(path).to_string(),
                    elements: elements.into_iter().map(ElementRecord::from).collect(),
                }
            })
            .collect();

        // Edge keys order by (source, target, kind) already
        let relationships = blueprint
            .relationships()
            .map(|edge| RelationshipRecord {
                source: edge.source.clone(),
                target: edge.target.clone(),
                kind: edge.kind,
                line: edge.line,
            })
            .collect();

        let feature = (blueprint.kind == BlueprintKind::Feature).then(|| FeatureSection {
            members: blueprint.members().iter().cloned().collect(),
            entry_points: blueprint.entry_points(),
            exit_points: blueprint.exit_points(),
        });

        Self {
            blueprint_type: blueprint.kind,
            generation_time: blueprint.generated_at,
            detail_level: blueprint.detail_level,
            name: blueprint.name.clone(),
            version: blueprint.version,
            feature,
            files,
            relationships,
        }
    }
}

impl From<&Element> for ElementRecord {
    fn from(element: &Element) -> Self {
        Self {
            name: element.name.clone(),
            kind: element.kind,
            line_start: element.line_start,
            line_end: element.line_end,
            source: element.source.clone(),
        }
    }
}

impl TryFrom<BlueprintDocument> for Blueprint {
    type Error = Error;

    fn try_from(document: BlueprintDocument) -> Result<Self> {
        let mut blueprint = Blueprint::new(document.blueprint_type, document.detail_level)
            .with_generated_at(document.generation_time);
        blueprint.name = document.name;
        blueprint.version = document.version;

        for file in document.files {
            blueprint.set_file_hash(file.path.clone(), file.content_hash.clone());
            for record in file.elements {
                let element = match record.kind {
                    ElementKind::File => Element::file_root(&file.path, record.line_end, file.content_hash.clone()),
                    kind => Element::new(
                        &file.path,
                        &record.name,
                        kind,
                        record.line_start,
                        record.line_end,
                        record.source,
                    ),
                };
                blueprint.insert_element(element);
            }
        }
        for record in document.relationships {
            blueprint.insert_edge(Relationship::new(record.source, record.target, record.kind).with_line(record.line));
        }
        if let Some(feature) = document.feature {
            for member in feature.members {
                if !blueprint.contains(&member) {
                    return Err(Error::other(format!("feature member {} has no element record", member)));
                }
                blueprint.add_member(member);
            }
        }
        Ok(blueprint)
    }
}

/// Pretty-printed JSON bytes
pub fn render_json(blueprint: &Blueprint) -> Result<Vec<u8>> {
    let document = BlueprintDocument::from(blueprint);
    let mut bytes = serde_json::to_vec_pretty(&document)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a rendered JSON document
pub fn parse_json(bytes: &[u8]) -> Result<BlueprintDocument> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Parse a rendered JSON document straight into a blueprint
pub fn read_blueprint(bytes: &[u8]) -> Result<Blueprint> {
    Blueprint::try_from(parse_json(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{compose, ElementRef, Selection};
    use crate::index::ScanIndex;
    use crate::model::RawExtraction;

    fn index() -> ScanIndex {
        let user = RawExtraction::new("src/user.py")
            .with_source("class User:\n    def save(self):\n        validate(self)\n")
            .element("User", ElementKind::Class, 1, 3, "class User:\n    def save(self):\n        validate(self)")
            .element("User.save", ElementKind::Method, 2, 3, "def save(self):\n        validate(self)")
            .edge("User.save", "validate", RelationshipKind::Calls);
        let checks = RawExtraction::new("src/checks.py")
            .with_source("def validate(obj):\n    return \"<ok>\" and '&'\n")
            .element("validate", ElementKind::Function, 1, 2, "def validate(obj):\n    return \"<ok>\" and '&'");
        ScanIndex::from_batch(&[user, checks]).unwrap().0
    }

    #[test]
    fn test_document_layout_is_sorted() {
        let selection = Selection::Files(vec!["src/user.py".to_string(), "src/checks.py".to_string()]);
        let bp = compose(&index(), &selection, DetailLevel::Standard).unwrap();
        let doc = BlueprintDocument::from(&bp);

        let paths: Vec<&str> = doc.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/checks.py", "src/user.py"]);
        let names: Vec<&str> = doc.files[1].elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["src/user.py", "User", "User.save"]);

        let keys: Vec<(String, String, RelationshipKind)> = doc
            .relationships
            .iter()
            .map(|r| (r.source.to_string(), r.target.to_string(), r.kind))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_stable_keys() {
        let selection = Selection::Methods(vec![ElementRef::new("src/user.py", "User.save")]);
        let bp = compose(&index(), &selection, DetailLevel::Standard).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&render_json(&bp).unwrap()).unwrap();
        assert_eq!(value["blueprint_type"], "method");
        assert_eq!(value["detail_level"], "standard");
        assert!(value["generation_time"].is_string());
        let element = &value["files"][0]["elements"][0];
        assert_eq!(element["type"], "function");
        assert!(element["source"].as_str().unwrap().contains("\"<ok>\""));
        assert_eq!(value["relationships"][0]["type"], "calls");
        assert!(value.get("feature").is_none());
    }

    #[test]
    fn test_round_trip_reconstructs_sets() {
        let selection = Selection::Feature {
            name: "persistence".to_string(),
            files: vec!["src/user.py".to_string()],
            elements: vec![],
        };
        let bp = compose(&index(), &selection, DetailLevel::Detailed).unwrap();
        let parsed = read_blueprint(&render_json(&bp).unwrap()).unwrap();

        assert_eq!(parsed.element_ids(), bp.element_ids());
        assert_eq!(parsed.edge_keys(), bp.edge_keys());
        assert_eq!(parsed.members(), bp.members());
        assert_eq!(parsed.entry_points(), bp.entry_points());
        assert_eq!(parsed, bp);
    }

    #[test]
    fn test_render_is_byte_stable() {
        let selection = Selection::Files(vec!["src/user.py".to_string()]);
        let bp = compose(&index(), &selection, DetailLevel::Detailed).unwrap();
        assert_eq!(render_json(&bp).unwrap(), render_json(&bp).unwrap());
        let reparsed = read_blueprint(&render_json(&bp).unwrap()).unwrap();
        assert_eq!(render_json(&reparsed).unwrap(), render_json(&bp).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_json(b"{not json"), Err(Error::Json(_))));
    }
}
