// Code elements and their identifiers

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

const FILE_PREFIX: &str = "file:";
const NAME_SEPARATOR: &str = "::";

/// Stable identifier for an element.
///
/// Built only from the declaring file path and the qualified name inside that
/// file, so scanning identical code twice yields identical identifiers.
/// Files use `file:<path>`, everything else `<path>::<qualified name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Identifier of a file element
    pub fn file(path: &str) -> Self {
        Self(format!("{}{}", FILE_PREFIX, normalize_path(path)))
    }

    /// Identifier of a named element declared in `path`
    pub fn new(path: &str, qualified_name: &str) -> Self {
        Self(format!("{}{}{}", normalize_path(path), NAME_SEPARATOR, qualified_name))
    }

    /// Wrap an already-rendered identifier
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_file(&self) -> bool {
        self.0.starts_with(FILE_PREFIX)
    }

    /// Declaring file path
    pub fn path(&self) -> &str {
        if let Some(path) = self.0.strip_prefix(FILE_PREFIX) {
            return path;
        }
        self.0
            .split_once(NAME_SEPARATOR)
            .map(|(path, _)| path)
            .unwrap_or(&self.0)
    }

    /// Qualified name within the file (the path itself for file elements)
    pub fn name(&self) -> &str {
        if let Some(path) = self.0.strip_prefix(FILE_PREFIX) {
            return path;
        }
        self.0
            .split_once(NAME_SEPARATOR)
            .map(|(_, name)| name)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of code element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    File,
    Class,
    Function,
    Method,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::File => "file",
            ElementKind::Class => "class",
            ElementKind::Function => "function",
            ElementKind::Method => "method",
        }
    }

    /// Functions and methods can be called
    pub fn is_callable(&self) -> bool {
        matches!(self, ElementKind::Function | ElementKind::Method)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(ElementKind::File),
            "class" => Ok(ElementKind::Class),
            "function" => Ok(ElementKind::Function),
            "method" => Ok(ElementKind::Method),
            other => Err(Error::other(format!("Invalid element kind: {}", other))),
        }
    }
}

/// A named program construct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    /// Qualified name within the file (`Class.method`); the path for files
    pub name: String,
    pub kind: ElementKind,
    /// Declaring file path (normalized)
    pub file: String,
    pub line_start: usize,
    pub line_end: usize,
    /// Raw source text
    pub source: String,
    /// SHA-256 of the source text, hex encoded
    pub content_hash: String,
}

impl Element {
    /// Create a named element, deriving its identifier and content hash
    pub fn new(
        file: &str,
        name: &str,
        kind: ElementKind,
        line_start: usize,
        line_end: usize,
        source: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let file = normalize_path(file);
        Self {
            id: ElementId::new(&file, name),
            name: name.to_string(),
            kind,
            content_hash: content_hash(&source),
            file,
            line_start,
            line_end,
            source,
        }
    }

    /// Create the element standing for a whole file
    pub fn file_root(path: &str, line_end: usize, content_hash: impl Into<String>) -> Self {
        let file = normalize_path(path);
        Self {
            id: ElementId::file(&file),
            name: file.clone(),
            kind: ElementKind::File,
            file,
            line_start: 1,
            line_end: line_end.max(1),
            source: String::new(),
            content_hash: content_hash.into(),
        }
    }

    /// Last segment of the qualified name (`save` for `User.save`)
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Qualified name of the enclosing element, if the name is dotted
    pub fn parent_name(&self) -> Option<&str> {
        if self.kind == ElementKind::File {
            return None;
        }
        self.name.rsplit_once('.').map(|(parent, _)| parent)
    }
}

/// Hex-encoded SHA-256 of a piece of text
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Normalize a file path to forward slashes without a leading `./`
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    normalized
}
