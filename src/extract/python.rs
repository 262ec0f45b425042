// Python extractor using tree-sitter

use crate::error::{Error, Result};
use crate::extract::{Collector, Extractor, Language, Scope};
use crate::model::{ElementKind, RawExtraction, RelationshipKind};
use tree_sitter::{Node, Parser};

/// Extractor for Python source files
pub struct PythonExtractor {
    parser: Parser,
}

impl PythonExtractor {
    /// Create a new Python extractor
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::Parser(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }
}

impl Extractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(&mut self, path: &str, source: &str) -> Result<RawExtraction> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| Error::parser(format!("{}: failed to parse source", path)))?;
        let mut collector = Collector::new(path, source);
        visit_children(&mut collector, tree.root_node(), &Scope::default());
        Ok(collector.finish())
    }
}

fn visit_children(collector: &mut Collector, node: Node, scope: &Scope) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(collector, child, scope);
    }
}

fn visit(collector: &mut Collector, node: Node, scope: &Scope) {
    match node.kind() {
        "class_definition" | "function_definition" => visit_definition(collector, node, node, scope),
        "decorated_definition" => {
            // Decorators run at definition time in the enclosing scope
            let mut cursor = node.walk();
            for decorator in node.children(&mut cursor).filter(|c| c.kind() == "decorator") {
                visit_children(collector, decorator, scope);
            }
            if let Some(definition) = node.child_by_field_name("definition") {
                visit_definition(collector, definition, node, scope);
            }
        }
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                let module = match name.kind() {
                    "aliased_import" => name.child_by_field_name("name").map(|n| collector.text(n)),
                    _ => Some(collector.text(name)),
                };
                if let Some(module) = module {
                    collector.import(module, node);
                }
            }
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                let module = collector.text(module);
                collector.import(module, node);
            }
        }
        "call" => {
            if let Some(function) = node.child_by_field_name("function") {
                if matches!(function.kind(), "identifier" | "attribute") {
                    let target = collector.text(function);
                    collector.edge(scope, target, RelationshipKind::Calls, node);
                }
            }
            visit_children(collector, node, scope);
        }
        _ => visit_children(collector, node, scope),
    }
}

/// Declare a class or function; `span` includes decorators when present
fn visit_definition(collector: &mut Collector, node: Node, span: Node, scope: &Scope) {
    let Some(name) = node.child_by_field_name("name").map(|n| collector.text(n)) else {
        return;
    };
    let qualified = scope.qualify(name);

    if node.kind() == "class_definition" {
        collector.declare(qualified.clone(), ElementKind::Class, span);
        let inner = Scope::nested(qualified, true);
        if let Some(bases) = node.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            for base in bases.named_children(&mut cursor) {
                if matches!(base.kind(), "identifier" | "attribute") {
                    let target = collector.text(base);
                    collector.edge(&inner, target, RelationshipKind::References, base);
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            visit_children(collector, body, &inner);
        }
    } else {
        let kind = if scope.in_class {
            ElementKind::Method
        } else {
            ElementKind::Function
        };
        collector.declare(qualified.clone(), kind, span);
        let inner = Scope::nested(qualified, false);
        if let Some(parameters) = node.child_by_field_name("parameters") {
            // Default values are evaluated in the enclosing scope
            visit_children(collector, parameters, scope);
        }
        if let Some(body) = node.child_by_field_name("body") {
            visit_children(collector, body, &inner);
        }
    }
}
