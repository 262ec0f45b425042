// Extraction of elements and raw edges from source files
//
// Each language extractor walks a tree-sitter syntax tree and reports
// declared elements with qualified names plus the names they call, reference
// and import. Name resolution happens later in the scan index.

mod javascript;
mod python;
pub mod scanner;

pub use javascript::JavaScriptExtractor;
pub use python::PythonExtractor;
pub use scanner::*;

use crate::error::{Error, Result};
use crate::model::{ElementKind, RawEdge, RawElement, RawExtraction, RelationshipKind};
use std::path::Path;
use tree_sitter::Node;

/// Source languages with an extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Some(Self::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }
}

/// Turns the text of one file into a raw extraction
pub trait Extractor {
    fn language(&self) -> Language;

    /// `path` is recorded as given; it should already be relative to the scan root
    fn extract(&mut self, path: &str, source: &str) -> Result<RawExtraction>;
}

/// One extractor per language, owned by a single worker
pub struct LanguageExtractors {
    python: PythonExtractor,
    javascript: JavaScriptExtractor,
}

impl LanguageExtractors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            python: PythonExtractor::new()?,
            javascript: JavaScriptExtractor::new()?,
        })
    }

    pub fn for_language(&mut self, language: Language) -> &mut dyn Extractor {
        match language {
            Language::Python => &mut self.python,
            Language::JavaScript => &mut self.javascript,
        }
    }

    /// Extract a file, choosing the extractor by extension
    pub fn extract(&mut self, path: &str, source: &str) -> Result<RawExtraction> {
        let language = Language::from_path(Path::new(path))
            .ok_or_else(|| Error::parser(format!("{}: no extractor for this file type", path)))?;
        self.for_language(language).extract(path, source)
    }
}

/// Enclosing declaration while walking a tree
#[derive(Debug, Clone, Default)]
struct Scope {
    /// Qualified name; `None` at file level
    name: Option<String>,
    /// Directly inside a class body
    in_class: bool,
}

impl Scope {
    fn qualify(&self, name: &str) -> String {
        match &self.name {
            Some(parent) => format!("{}.{}", parent, name),
            None => name.to_string(),
        }
    }

    fn nested(name: String, in_class: bool) -> Self {
        Self {
            name: Some(name),
            in_class,
        }
    }

    /// Edge source name; empty means the file itself
    fn source_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Accumulates declarations and edges for one file
struct Collector<'s> {
    source: &'s str,
    raw: RawExtraction,
}

impl<'s> Collector<'s> {
    fn new(path: &str, source: &'s str) -> Self {
        Self {
            source,
            raw: RawExtraction::new(path).with_source(source),
        }
    }

    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn declare(&mut self, name: String, kind: ElementKind, span: Node) {
        self.raw.elements.push(RawElement {
            name,
            kind,
            line_start: span.start_position().row + 1,
            line_end: span.end_position().row + 1,
            source_text: self.text(span).to_string(),
        });
    }

    fn edge(&mut self, scope: &Scope, target: &str, kind: RelationshipKind, at: Node) {
        let target = target.trim();
        if target.is_empty() {
            return;
        }
        self.raw.edges.push(RawEdge {
            source_name: scope.source_name().to_string(),
            target_name: target.to_string(),
            kind,
            line: Some(at.start_position().row + 1),
        });
    }

    /// Imports always belong to the file
    fn import(&mut self, module: &str, at: Node) {
        self.edge(&Scope::default(), module, RelationshipKind::Imports, at);
    }

    fn finish(self) -> RawExtraction {
        self.raw
    }
}

/// Strip one layer of matching quotes from a string literal
fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}
