//! Architectum - structured blueprints of a codebase
//!
//! Scans Python and JavaScript sources into a relationship map of files,
//! classes, functions and methods, kept alongside a per-file mirror. Blueprints
//! are bounded views over that map, selected by file, by element or by named
//! feature, and rendered as deterministic JSON or XML. Feature blueprints are
//! versioned and can be diffed.

pub mod blueprint;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod index;
pub mod mirror;
pub mod model;
pub mod output;
pub mod versioning;

// Re-export main types
pub use blueprint::{Blueprint, BlueprintDefinition, BlueprintKind, Composer, Selection};
pub use config::Config;
pub use error::{Error, Result};
pub use graph::RelationshipMap;
pub use index::{ScanIndex, SharedIndex};
pub use mirror::MirrorStore;
pub use model::{DetailLevel, Element, ElementId, ElementKind, Relationship, RelationshipKind};
pub use output::Format;
pub use versioning::FeatureRegistry;
