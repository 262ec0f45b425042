// Typed, directed edges between elements

use crate::error::{Error, Result};
use crate::model::ElementId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of relationship.
///
/// Variants are declared in name order so the derived ordering matches a
/// lexicographic sort on the rendered kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    /// Function A calls function B
    Calls,
    /// File contains element, class contains method
    Contains,
    /// File or element imports another file
    Imports,
    /// Element mentions another element without calling it
    References,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Calls => "calls",
            RelationshipKind::Contains => "contains",
            RelationshipKind::Imports => "imports",
            RelationshipKind::References => "references",
        }
    }

    /// Kinds followed by cross-file closure
    pub fn is_traversable(&self) -> bool {
        matches!(self, RelationshipKind::Calls | RelationshipKind::References)
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "calls" => Ok(RelationshipKind::Calls),
            "contains" => Ok(RelationshipKind::Contains),
            "imports" => Ok(RelationshipKind::Imports),
            "references" => Ok(RelationshipKind::References),
            other => Err(Error::other(format!("Invalid relationship kind: {}", other))),
        }
    }
}

/// Deduplication key of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: ElementId,
    pub target: ElementId,
    pub kind: RelationshipKind,
}

/// A directed, typed connection between two elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: ElementId,
    pub target: ElementId,
    pub kind: RelationshipKind,
    /// Line of the call site or import, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Relationship {
    pub fn new(source: ElementId, target: ElementId, kind: RelationshipKind) -> Self {
        Self {
            source,
            target,
            kind,
            line: None,
        }
    }

    pub fn contains(parent: ElementId, child: ElementId) -> Self {
        Self::new(parent, child, RelationshipKind::Contains)
    }

    pub fn calls(caller: ElementId, callee: ElementId) -> Self {
        Self::new(caller, callee, RelationshipKind::Calls)
    }

    pub fn with_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
            kind: self.kind,
        }
    }

    /// Endpoint opposite to `from`
    pub fn other_end(&self, from: &ElementId) -> &ElementId {
        if &self.source == from {
            &self.target
        } else {
            &self.source
        }
    }
}

/// Edge direction relative to an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}
