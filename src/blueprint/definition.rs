// Blueprint definitions
//
// YAML documents describing what to compose. They are loose on the way in and
// validated into a `Selection` with a fixed shape per blueprint kind before
// anything reaches the composer.

use crate::blueprint::BlueprintKind;
use crate::error::{Error, Result};
use crate::model::{normalize_path, DetailLevel};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One entry of a definition's `components` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub file: String,
    /// Qualified element names inside `file`; absent means the whole file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<String>>,
}

/// Blueprint definition as written by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintDefinition {
    #[serde(rename = "type")]
    pub kind: BlueprintKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "detailLevel")]
    pub detail_level: Option<DetailLevel>,
    #[serde(default)]
    pub persistence: bool,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// A specific element addressed by file and qualified name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub file: String,
    pub name: String,
}

impl ElementRef {
    pub fn new(file: &str, name: &str) -> Self {
        Self {
            file: normalize_path(file),
            name: name.trim().to_string(),
        }
    }

    /// Parse `path:name` as given on the command line
    pub fn parse(spec: &str) -> Result<Self> {
        match spec.rsplit_once(':') {
            Some((file, name)) if !file.trim().is_empty() && !name.trim().is_empty() => Ok(Self::new(file, name)),
            _ => Err(Error::invalid_definition(format!(
                "element reference '{}' must look like <file>:<name>",
                spec
            ))),
        }
    }
}

/// Validated selection, one shape per blueprint kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Files(Vec<String>),
    Methods(Vec<ElementRef>),
    Feature {
        name: String,
        files: Vec<String>,
        elements: Vec<ElementRef>,
    },
}

impl Selection {
    pub fn kind(&self) -> BlueprintKind {
        match self {
            Selection::Files(_) => BlueprintKind::File,
            Selection::Methods(_) => BlueprintKind::Method,
            Selection::Feature { .. } => BlueprintKind::Feature,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Selection::Feature { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Selection::Files(files) => files.is_empty(),
            Selection::Methods(elements) => elements.is_empty(),
            Selection::Feature { files, elements, .. } => files.is_empty() && elements.is_empty(),
        }
    }
}

impl BlueprintDefinition {
    /// Parse a YAML definition without validating it
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::PathNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn detail_level(&self) -> DetailLevel {
        self.detail_level.unwrap_or_default()
    }

    /// Check the per-kind rules and build the selection
    pub fn validate(&self) -> Result<Selection> {
        if self.components.is_empty() {
            return Err(Error::invalid_definition("definition has no components"));
        }
        for component in &self.components {
            if component.file.trim().is_empty() {
                return Err(Error::invalid_definition("component has an empty file path"));
            }
        }
        if self.persistence && self.kind != BlueprintKind::Feature {
            return Err(Error::invalid_definition(format!(
                "only feature blueprints can be persistent, not {} blueprints",
                self.kind
            )));
        }

        match self.kind {
            BlueprintKind::File => {
                if let Some(component) = self.components.iter().find(|c| c.elements.is_some()) {
                    return Err(Error::invalid_definition(format!(
                        "file blueprints select whole files; '{}' names elements",
                        component.file
                    )));
                }
                Ok(Selection::Files(self.components.iter().map(|c| normalize_path(&c.file)).collect()))
            }
            BlueprintKind::Method => {
                let mut refs = Vec::new();
                for component in &self.components {
                    let names = component.elements.as_deref().unwrap_or_default();
                    if names.is_empty() {
                        return Err(Error::invalid_definition(format!(
                            "method blueprints need at least one element for '{}'",
                            component.file
                        )));
                    }
                    refs.extend(names.iter().map(|name| ElementRef::new(&component.file, name)));
                }
                Ok(Selection::Methods(refs))
            }
            BlueprintKind::Feature => {
                let name = self
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| Error::invalid_definition("feature blueprints need a name"))?;
                let mut files = Vec::new();
                let mut elements = Vec::new();
                for component in &self.components {
                    match component.elements.as_deref() {
                        Some(names) if !names.is_empty() => {
                            elements.extend(names.iter().map(|n| ElementRef::new(&component.file, n)));
                        }
                        _ => files.push(normalize_path(&component.file)),
                    }
                }
                Ok(Selection::Feature {
                    name: name.to_string(),
                    files,
                    elements,
                })
            }
        }
    }
}
