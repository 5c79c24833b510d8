//! Python visitor.
//!
//! Declarations come from module-level statements only. Imports and bindings
//! are collected from the whole tree: a function-level import is still a
//! dependency of the unit, and bindings are unit-wide.

use crate::config::ExtractorConfig;
use crate::extractor::{compact_text, line_of, node_text, UnitFacts};
use crate::types::{ImportSpec, SymbolKind};
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

static CONSTANT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_*[A-Z][A-Z0-9_]*$").expect("constant-name pattern is valid"));

pub(crate) fn visit<'c>(root: Node<'_>, src: &str, config: &'c ExtractorConfig) -> UnitFacts<'c> {
    let mut facts = UnitFacts::new(config);

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        declare_statement(child, src, &mut facts);
    }

    walk(root, src, &mut facts);
    facts
}

fn declare_statement(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    match node.kind() {
        "function_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|params| render_parameters(params, src));
                facts.declare_function(node_text(name, src), line_of(node), params);
            }
        }
        "class_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                facts.declare(node_text(name, src), SymbolKind::Class, line_of(node));
            }
        }
        "decorated_definition" => {
            if let Some(definition) = node.child_by_field_name("definition") {
                declare_statement(definition, src, facts);
            }
        }
        "expression_statement" => {
            let mut cursor = node.walk();
            for expr in node.named_children(&mut cursor) {
                if expr.kind() == "assignment" {
                    declare_assignment(expr, src, facts);
                }
            }
        }
        _ => {}
    }
}

/// Parameter names with defaults elided: `a, b=..., *args, **kwargs`
fn render_parameters(params: Node<'_>, src: &str) -> String {
    let mut rendered = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "comment" => {}
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = param.child_by_field_name("name") {
                    rendered.push(format!("{}=...", node_text(name, src)));
                }
            }
            "typed_parameter" => {
                if let Some(name) = param.named_child(0) {
                    rendered.push(compact_text(name, src));
                }
            }
            _ => rendered.push(compact_text(param, src)),
        }
    }
    rendered.join(", ")
}

fn declare_assignment(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    if let Some(left) = node.child_by_field_name("left") {
        let mut targets = Vec::new();
        pattern_identifiers(left, &mut targets);
        for target in targets {
            let name = node_text(target, src);
            let kind = if CONSTANT_NAME.is_match(name) {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            };
            facts.declare(name, kind, line_of(target));
        }
    }

    // a = b = value
    if let Some(right) = node.child_by_field_name("right") {
        if right.kind() == "assignment" {
            declare_assignment(right, src, facts);
        }
    }
}

/// Identifiers bound by an assignment/loop/with target
fn pattern_identifiers<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    match node.kind() {
        "identifier" => out.push(node),
        "attribute" | "subscript" | "call" => {}
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                pattern_identifiers(child, out);
            }
        }
    }
}

fn bind_pattern(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    let mut targets = Vec::new();
    pattern_identifiers(node, &mut targets);
    for target in targets {
        facts.bind(node_text(target, src));
    }
}

fn walk(root: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => {
                record_import(node, src, facts);
                continue;
            }
            "import_from_statement" => {
                record_from_import(node, src, facts);
                continue;
            }
            "future_import_statement" => continue,
            "function_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    facts.bind(node_text(name, src));
                }
                if let Some(params) = node.child_by_field_name("parameters") {
                    bind_parameters(params, src, facts);
                }
            }
            "lambda" => {
                if let Some(params) = node.child_by_field_name("parameters") {
                    bind_parameters(params, src, facts);
                }
            }
            "class_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    facts.bind(node_text(name, src));
                }
                if let Some(bases) = node.child_by_field_name("superclasses") {
                    let mut cursor = bases.walk();
                    for base in bases.named_children(&mut cursor) {
                        if base.kind() == "identifier" {
                            facts.use_name(node_text(base, src), line_of(base));
                        }
                    }
                }
            }
            "assignment" | "augmented_assignment" | "for_statement" | "for_in_clause" => {
                if let Some(left) = node.child_by_field_name("left") {
                    bind_pattern(left, src, facts);
                }
            }
            "as_pattern" => {
                if let Some(alias) = node.child_by_field_name("alias") {
                    bind_pattern(alias, src, facts);
                }
            }
            "except_clause" => bind_except_alias(node, src, facts),
            "named_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    facts.bind(node_text(name, src));
                }
            }
            "global_statement" | "nonlocal_statement" => bind_pattern(node, src, facts),
            "call" => {
                if let Some(function) = node.child_by_field_name("function") {
                    if function.kind() == "identifier" {
                        facts.use_name(node_text(function, src), line_of(function));
                    }
                }
            }
            "decorator" => {
                if let Some(expr) = node.named_child(0) {
                    if expr.kind() == "identifier" {
                        facts.use_name(node_text(expr, src), line_of(expr));
                    }
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

fn bind_parameters(params: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "identifier" => facts.bind(node_text(param, src)),
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = param.child_by_field_name("name") {
                    bind_pattern(name, src, facts);
                }
            }
            // typed_parameter, list_splat_pattern, dictionary_splat_pattern
            _ => {
                if let Some(first) = param.named_child(0) {
                    bind_pattern(first, src, facts);
                }
            }
        }
    }
}

/// `except E as err:` binds `err`
fn bind_except_alias(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    let mut after_as = false;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "as" {
            after_as = true;
        } else if after_as && child.kind() == "identifier" {
            facts.bind(node_text(child, src));
            return;
        }
    }
}

/// `import a.b`, `import a.b as c`
fn record_import(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    let line = line_of(node);
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            "dotted_name" => {
                let module = node_text(name, src);
                if let Some(top) = module.split('.').next() {
                    facts.bind(top);
                }
                facts.import(ImportSpec::module(module, line));
            }
            "aliased_import" => {
                let Some(module) = name.child_by_field_name("name") else {
                    continue;
                };
                let alias = name
                    .child_by_field_name("alias")
                    .map(|alias| node_text(alias, src).to_string());
                facts.import(ImportSpec::module(node_text(module, src), line).with_alias(alias));
            }
            _ => {}
        }
    }
}

/// `from m import x, y as z`, `from . import x`, `from m import *`
fn record_from_import(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    let Some(module) = node.child_by_field_name("module_name") else {
        return;
    };
    let specifier: String = node_text(module, src)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let line = line_of(node);

    let mut cursor = node.walk();
    let has_wildcard = node
        .children(&mut cursor)
        .any(|child| child.kind() == "wildcard_import");
    if has_wildcard {
        facts.import(ImportSpec::wildcard(specifier, line));
        return;
    }

    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            "dotted_name" | "identifier" => {
                facts.import(ImportSpec::symbol(&specifier, node_text(name, src), line));
            }
            "aliased_import" => {
                let Some(symbol) = name.child_by_field_name("name") else {
                    continue;
                };
                let alias = name
                    .child_by_field_name("alias")
                    .map(|alias| node_text(alias, src).to_string());
                facts.import(
                    ImportSpec::symbol(&specifier, node_text(symbol, src), line).with_alias(alias),
                );
            }
            _ => {}
        }
    }
}
