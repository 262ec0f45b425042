// JavaScript extractor using tree-sitter

use crate::error::{Error, Result};
use crate::extract::{unquote, Collector, Extractor, Language, Scope};
use crate::model::{ElementKind, RawExtraction, RelationshipKind};
use tree_sitter::{Node, Parser};

/// Extractor for JavaScript source files (ES modules, CommonJS, JSX)
pub struct JavaScriptExtractor {
    parser: Parser,
}

impl JavaScriptExtractor {
    /// Create a new JavaScript extractor
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_javascript::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::Parser(format!("Failed to set JavaScript language: {}", e)))?;
        Ok(Self { parser })
    }
}

impl Extractor for JavaScriptExtractor {
    fn language(&self) -> Language {
        Language::JavaScript
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
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                let name = collector.text(name);
                declare_function(collector, name, ElementKind::Function, node, node, scope);
            }
        }
        "class_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                let name = collector.text(name);
                declare_class(collector, name, node, node, scope);
            }
        }
        "method_definition" if scope.in_class => {
            if let Some(name) = node.child_by_field_name("name") {
                let name = collector.text(name);
                declare_function(collector, name, ElementKind::Method, node, node, scope);
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            for declarator in node.named_children(&mut cursor) {
                if declarator.kind() == "variable_declarator" {
                    visit_declarator(collector, declarator, node, scope);
                } else {
                    visit(collector, declarator, scope);
                }
            }
        }
        "import_statement" => {
            if let Some(source) = node.child_by_field_name("source") {
                let module = unquote(collector.text(source));
                collector.import(module, node);
            }
        }
        "call_expression" => {
            if let Some(function) = node.child_by_field_name("function") {
                let target = collector.text(function);
                match function.kind() {
                    "identifier" if target == "require" => {
                        if let Some(module) = first_string_argument(collector, node) {
                            collector.import(module, node);
                        }
                    }
                    "identifier" | "member_expression" => {
                        collector.edge(scope, target, RelationshipKind::Calls, node)
                    }
                    _ => {}
                }
            }
            visit_children(collector, node, scope);
        }
        "new_expression" => {
            if let Some(constructor) = node.child_by_field_name("constructor") {
                if matches!(constructor.kind(), "identifier" | "member_expression") {
                    let target = collector.text(constructor);
                    collector.edge(scope, target, RelationshipKind::References, node);
                }
            }
            visit_children(collector, node, scope);
        }
        _ => visit_children(collector, node, scope),
    }
}

/// `const name = () => ...`, `const name = function () {}`, `const Name = class {}`
fn visit_declarator(collector: &mut Collector, declarator: Node, statement: Node, scope: &Scope) {
    let name = declarator
        .child_by_field_name("name")
        .filter(|n| n.kind() == "identifier")
        .map(|n| collector.text(n));
    let value = declarator.child_by_field_name("value");

    match (name, value) {
        (Some(name), Some(value))
            if matches!(value.kind(), "arrow_function" | "function_expression" | "function" | "generator_function") =>
        {
            declare_function(collector, name, ElementKind::Function, value, statement, scope);
        }
        (Some(name), Some(value)) if value.kind() == "class" => {
            declare_class(collector, name, value, statement, scope);
        }
        _ => visit_children(collector, declarator, scope),
    }
}

fn declare_function(collector: &mut Collector, name: &str, kind: ElementKind, node: Node, span: Node, scope: &Scope) {
    let qualified = scope.qualify(name);
    collector.declare(qualified.clone(), kind, span);
    let inner = Scope::nested(qualified, false);
    if let Some(parameters) = node.child_by_field_name("parameters") {
        visit_children(collector, parameters, scope);
    }
    if let Some(body) = node.child_by_field_name("body") {
        visit(collector, body, &inner);
    }
}

fn declare_class(collector: &mut Collector, name: &str, node: Node, span: Node, scope: &Scope) {
    let qualified = scope.qualify(name);
    collector.declare(qualified.clone(), ElementKind::Class, span);
    let inner = Scope::nested(qualified, true);

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "class_heritage" {
            let mut heritage = child.walk();
            for base in child.named_children(&mut heritage) {
                if matches!(base.kind(), "identifier" | "member_expression") {
                    let target = collector.text(base);
                    collector.edge(&inner, target, RelationshipKind::References, base);
                }
            }
        }
    }
    if let Some(body) = node.child_by_field_name("body") {
        visit_children(collector, body, &inner);
    }
}

fn first_string_argument<'s>(collector: &Collector<'s>, call: Node) -> Option<&'s str> {
    let arguments = call.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let first = arguments.named_children(&mut cursor).next()?;
    (first.kind() == "string").then(|| unquote(collector.text(first)))
}
