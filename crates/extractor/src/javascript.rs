//! JavaScript, TypeScript and TSX visitor.
//!
//! One visitor serves all three grammars. TypeScript-only node kinds simply
//! never occur in plain JavaScript trees.

use crate::config::ExtractorConfig;
use crate::extractor::{compact_text, line_of, node_text, UnitFacts};
use crate::types::{ImportSpec, SymbolKind};
use tree_sitter::Node;

pub(crate) fn visit<'c>(root: Node<'_>, src: &str, config: &'c ExtractorConfig) -> UnitFacts<'c> {
    let mut facts = UnitFacts::new(config);

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        declare_statement(child, src, &mut facts);
    }
    // export clauses may name bindings declared further down
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "export_statement" {
            declare_local_exports(child, src, &mut facts);
        }
    }

    walk(root, src, &mut facts);
    facts
}

fn declare_statement(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            declare_function(node, src, facts);
        }
        "class_declaration"
        | "abstract_class_declaration"
        | "interface_declaration"
        | "type_alias_declaration"
        | "enum_declaration" => declare_named(node, src, SymbolKind::Class, facts),
        "lexical_declaration" => {
            let is_const = node
                .child_by_field_name("kind")
                .is_some_and(|kind| node_text(kind, src) == "const");
            declare_variables(node, src, is_const, facts);
        }
        "variable_declaration" => declare_variables(node, src, false, facts),
        "export_statement" => {
            if let Some(declaration) = node.child_by_field_name("declaration") {
                declare_statement(declaration, src, facts);
            } else if let Some(value) = node.child_by_field_name("value") {
                // export default function name() {} / export default class Name {}
                match value.kind() {
                    "function_expression" | "function" => {
                        declare_function(value, src, facts);
                    }
                    "class" => declare_named(value, src, SymbolKind::Class, facts),
                    _ => {}
                }
            }
        }
        "ambient_declaration" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                declare_statement(child, src, facts);
            }
        }
        _ => {}
    }
}

fn declare_named(node: Node<'_>, src: &str, kind: SymbolKind, facts: &mut UnitFacts<'_>) {
    if let Some(name) = node.child_by_field_name("name") {
        facts.declare(node_text(name, src), kind, line_of(node));
    }
}

fn declare_function(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    if let Some(name) = node.child_by_field_name("name") {
        facts.declare_function(node_text(name, src), line_of(node), parameters(node, src));
    }
}

/// Parameter list of a function or arrow function with defaults elided
fn parameters(callable: Node<'_>, src: &str) -> Option<String> {
    // x => x
    if let Some(param) = callable.child_by_field_name("parameter") {
        return Some(compact_text(param, src));
    }
    let params = callable.child_by_field_name("parameters")?;

    let mut rendered = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "comment" => {}
            "assignment_pattern" => {
                if let Some(left) = param.child_by_field_name("left") {
                    rendered.push(format!("{}=...", compact_text(left, src)));
                }
            }
            "required_parameter" | "optional_parameter" => {
                let Some(pattern) = param.child_by_field_name("pattern") else {
                    continue;
                };
                let mut text = compact_text(pattern, src);
                if param.kind() == "optional_parameter" {
                    text.push('?');
                }
                if param.child_by_field_name("value").is_some() {
                    text.push_str("=...");
                }
                rendered.push(text);
            }
            _ => rendered.push(compact_text(param, src)),
        }
    }
    Some(rendered.join(", "))
}

/// `export { impl as publicName }` without a source exports local bindings
/// under new names
fn declare_local_exports(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    if node.child_by_field_name("source").is_some() {
        return;
    }
    let mut cursor = node.walk();
    let clause = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "export_clause");
    let Some(clause) = clause else {
        return;
    };

    let mut cursor = clause.walk();
    for spec in clause.named_children(&mut cursor) {
        if spec.kind() != "export_specifier" {
            continue;
        }
        let Some(local) = spec.child_by_field_name("name") else {
            continue;
        };
        let local = string_value(local, src);
        let exported = spec
            .child_by_field_name("alias")
            .map(|alias| string_value(alias, src))
            .unwrap_or_else(|| local.clone());
        if exported == "default" {
            continue;
        }
        let kind = facts.declared_kind(&local).unwrap_or(SymbolKind::Variable);
        facts.declare(&exported, kind, line_of(spec));
    }
}

fn declare_variables(node: Node<'_>, src: &str, is_const: bool, facts: &mut UnitFacts<'_>) {
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name) = declarator.child_by_field_name("name") else {
            continue;
        };

        let function = declarator.child_by_field_name("value").filter(|value| {
            matches!(
                value.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            )
        });
        if let (Some(function), "identifier") = (function, name.kind()) {
            facts.declare_function(
                node_text(name, src),
                line_of(name),
                parameters(function, src),
            );
            continue;
        }
        let kind = if function.is_some() {
            SymbolKind::Function
        } else if is_const {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        };

        let mut targets = Vec::new();
        pattern_identifiers(name, &mut targets);
        for target in targets {
            facts.declare(node_text(target, src), kind, line_of(target));
        }
    }
}

/// Identifiers bound by a binding pattern
fn pattern_identifiers<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(node),
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                pattern_identifiers(value, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                pattern_identifiers(left, out);
            }
        }
        "required_parameter" | "optional_parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                pattern_identifiers(pattern, out);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                pattern_identifiers(child, out);
            }
        }
        _ => {}
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
            "export_statement" => record_reexport(node, src, facts),
            "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "class_declaration"
            | "abstract_class_declaration"
            | "class"
            | "interface_declaration"
            | "type_alias_declaration"
            | "enum_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    facts.bind(node_text(name, src));
                }
            }
            "formal_parameters" => {
                let mut cursor = node.walk();
                for param in node.named_children(&mut cursor) {
                    bind_pattern(param, src, facts);
                }
            }
            "arrow_function" => {
                if let Some(param) = node.child_by_field_name("parameter") {
                    bind_pattern(param, src, facts);
                }
            }
            "variable_declarator" => {
                if let Some(name) = node.child_by_field_name("name") {
                    bind_pattern(name, src, facts);
                }
            }
            "catch_clause" => {
                if let Some(param) = node.child_by_field_name("parameter") {
                    bind_pattern(param, src, facts);
                }
            }
            "for_in_statement" => {
                if let Some(left) = node.child_by_field_name("left") {
                    bind_pattern(left, src, facts);
                }
            }
            "call_expression" => record_call(node, src, facts),
            "new_expression" => {
                if let Some(constructor) = node.child_by_field_name("constructor") {
                    if constructor.kind() == "identifier" {
                        facts.use_name(node_text(constructor, src), line_of(constructor));
                    }
                }
            }
            "class_heritage" | "extends_clause" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "identifier" {
                        facts.use_name(node_text(child, src), line_of(child));
                    }
                }
            }
            "decorator" => {
                if let Some(expr) = node.named_child(0) {
                    let target = if expr.kind() == "call_expression" {
                        expr.child_by_field_name("function")
                    } else {
                        Some(expr)
                    };
                    if let Some(target) = target.filter(|t| t.kind() == "identifier") {
                        facts.use_name(node_text(target, src), line_of(target));
                    }
                }
            }
            "jsx_opening_element" | "jsx_self_closing_element" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let text = node_text(name, src);
                    if name.kind() == "identifier"
                        && text.chars().next().is_some_and(char::is_uppercase)
                    {
                        facts.use_name(text, line_of(name));
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

/// Module specifier of a string literal node, quotes stripped
fn string_value(node: Node<'_>, src: &str) -> String {
    node_text(node, src)
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

/// `import x from 'm'`, `import * as ns from 'm'`, `import { a, b as c } from 'm'`, `import 'm'`
fn record_import(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    let Some(source) = node.child_by_field_name("source") else {
        return;
    };
    let specifier = string_value(source, src);
    let line = line_of(node);

    let mut cursor = node.walk();
    let clause = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "import_clause");
    let Some(clause) = clause else {
        facts.import_unbound(ImportSpec::module(specifier, line));
        return;
    };

    let mut cursor = clause.walk();
    for part in clause.named_children(&mut cursor) {
        match part.kind() {
            // default import binds the module's default export
            "identifier" => {
                facts.import(
                    ImportSpec::module(&specifier, line)
                        .with_alias(Some(node_text(part, src).to_string())),
                );
            }
            "namespace_import" => {
                let alias = part
                    .named_child(0)
                    .map(|name| node_text(name, src).to_string());
                facts.import(ImportSpec::module(&specifier, line).with_alias(alias));
            }
            "named_imports" => {
                let mut specs = part.walk();
                for spec in part.named_children(&mut specs) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let Some(name) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let alias = spec
                        .child_by_field_name("alias")
                        .map(|alias| node_text(alias, src).to_string());
                    facts.import(
                        ImportSpec::symbol(&specifier, string_value(name, src), line)
                            .with_alias(alias),
                    );
                }
            }
            _ => {}
        }
    }
}

/// `export { a } from 'm'`, `export * from 'm'`
fn record_reexport(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    let Some(source) = node.child_by_field_name("source") else {
        return;
    };
    let specifier = string_value(source, src);
    let line = line_of(node);

    let mut cursor = node.walk();
    let clause = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "export_clause");
    // export * from 'm' re-exports everything
    let Some(clause) = clause else {
        facts.import_unbound(ImportSpec::wildcard(specifier, line));
        return;
    };

    let mut cursor = clause.walk();
    for spec in clause.named_children(&mut cursor) {
        if spec.kind() != "export_specifier" {
            continue;
        }
        if let Some(name) = spec.child_by_field_name("name") {
            facts.import_unbound(ImportSpec::symbol(&specifier, string_value(name, src), line));
        }
    }
}

/// Calls: `require('m')`, `import('m')` and plain identifier targets
fn record_call(node: Node<'_>, src: &str, facts: &mut UnitFacts<'_>) {
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };
    let line = line_of(node);

    let is_require = function.kind() == "identifier" && node_text(function, src) == "require";
    let is_dynamic_import = function.kind() == "import";
    if is_require || is_dynamic_import {
        let specifier = node
            .child_by_field_name("arguments")
            .and_then(|args| args.named_child(0))
            .filter(|arg| arg.kind() == "string");
        if let Some(specifier) = specifier {
            facts.import_unbound(ImportSpec::module(string_value(specifier, src), line));
        }
        return;
    }

    if function.kind() == "identifier" {
        facts.use_name(node_text(function, src), line_of(function));
    }
}
