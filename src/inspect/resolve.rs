//! Semantic questions over the syntax tree that no single tree pattern can
//! answer: what constant strings can an expression evaluate to, is this node
//! a closure, what does a call reference.
//!
//! Everything here is a pure read over the tree. When a question cannot be
//! answered with certainty the answer is "no information", never a guess.

use std::collections::BTreeSet;

use tree_sitter::Node;

use super::parser::ParsedSource;

/// Bound on enumerated concatenation combinations; anything larger is
/// treated as unresolvable.
const COMBINATION_CAP: usize = 128;
const MAX_DEPTH: usize = 8;

/// The set of distinct string values an expression could statically evaluate
/// to. Empty means "could not determine" — callers must treat emptiness as
/// no information, never as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedStrings(BTreeSet<String>);

impl ResolvedStrings {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn one(value: impl Into<String>) -> Self {
        let mut set = BTreeSet::new();
        set.insert(value.into());
        Self(set)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn insert(&mut self, value: String) {
        self.0.insert(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Single,
    Double,
}

/// Returns the literal node if `node` is syntactically a string literal,
/// unwrapping trivial parenthesization.
pub fn resolve_as_string_literal(node: Node) -> Option<Node> {
    let mut current = node;
    while current.kind() == "parenthesized_expression" {
        current = current.named_child(0)?;
    }

    match current.kind() {
        "string" | "encapsed_string" => Some(current),
        _ => None,
    }
}

/// Splits a string literal into its quote style and raw (still escaped)
/// content between the quotes.
pub fn string_literal_parts(node: Node, parsed: &ParsedSource) -> Option<(QuoteStyle, String)> {
    let text = node_text(node, parsed)?;
    let mut chars = text.chars();
    let open = chars.next()?;
    let close = text.chars().last()?;

    let style = match open {
        '\'' => QuoteStyle::Single,
        '"' => QuoteStyle::Double,
        _ => return None,
    };
    if close != open || text.len() < 2 {
        return None;
    }

    Some((style, text[1..text.len() - 1].to_owned()))
}

/// Conservative abstract evaluation of an expression to its possible
/// compile-time string values. Any unresolvable sub-expression poisons the
/// whole result to the empty set. Deterministic for a fixed tree.
pub fn resolve_as_string(node: Node, parsed: &ParsedSource) -> ResolvedStrings {
    resolve_with_depth(node, parsed, 0)
}

fn resolve_with_depth(node: Node, parsed: &ParsedSource, depth: usize) -> ResolvedStrings {
    if depth > MAX_DEPTH {
        return ResolvedStrings::none();
    }

    match node.kind() {
        "parenthesized_expression" => match node.named_child(0) {
            Some(inner) => resolve_with_depth(inner, parsed, depth + 1),
            None => ResolvedStrings::none(),
        },
        "string" | "encapsed_string" => resolve_literal(node, parsed),
        "binary_expression" => resolve_concatenation(node, parsed, depth),
        "conditional_expression" => resolve_ternary(node, parsed, depth),
        "variable_name" => resolve_variable(node, parsed, depth),
        _ => ResolvedStrings::none(),
    }
}

fn resolve_literal(node: Node, parsed: &ParsedSource) -> ResolvedStrings {
    let Some((style, raw)) = string_literal_parts(node, parsed) else {
        return ResolvedStrings::none();
    };

    match style {
        QuoteStyle::Single => ResolvedStrings::one(single_quoted_value(&raw)),
        QuoteStyle::Double => match double_quoted_value(&raw) {
            Some(value) => ResolvedStrings::one(value),
            None => ResolvedStrings::none(),
        },
    }
}

fn resolve_concatenation(node: Node, parsed: &ParsedSource, depth: usize) -> ResolvedStrings {
    let operator = node
        .child_by_field_name("operator")
        .and_then(|op| node_text(op, parsed));
    if operator.as_deref() != Some(".") {
        return ResolvedStrings::none();
    }

    let (Some(left), Some(right)) = (
        node.child_by_field_name("left"),
        node.child_by_field_name("right"),
    ) else {
        return ResolvedStrings::none();
    };

    let lhs = resolve_with_depth(left, parsed, depth + 1);
    let rhs = resolve_with_depth(right, parsed, depth + 1);
    if lhs.is_empty() || rhs.is_empty() || lhs.len() * rhs.len() > COMBINATION_CAP {
        return ResolvedStrings::none();
    }

    let mut joined = ResolvedStrings::none();
    for prefix in lhs.iter() {
        for suffix in rhs.iter() {
            joined.insert(format!("{prefix}{suffix}"));
        }
    }
    joined
}

fn resolve_ternary(node: Node, parsed: &ParsedSource, depth: usize) -> ResolvedStrings {
    // Short ternary (`?:`) yields the condition value; not enumerable here.
    let (Some(body), Some(alternative)) = (
        node.child_by_field_name("body"),
        node.child_by_field_name("alternative"),
    ) else {
        return ResolvedStrings::none();
    };

    let truthy = resolve_with_depth(body, parsed, depth + 1);
    let falsy = resolve_with_depth(alternative, parsed, depth + 1);
    if truthy.is_empty() || falsy.is_empty() {
        return ResolvedStrings::none();
    }

    let mut union = ResolvedStrings::none();
    for value in truthy.iter().chain(falsy.iter()) {
        union.insert(value.to_owned());
    }
    union
}

/// Variable lookup, restricted to the safe case: exactly one plain
/// assignment before the use site in the enclosing scope, and no compound
/// assignments. Nested function bodies are separate PHP scopes with no
/// implicit capture, so their assignments are invisible here; an assignment
/// at or after the use site poisons the lookup instead of resolving it.
fn resolve_variable(node: Node, parsed: &ParsedSource, depth: usize) -> ResolvedStrings {
    let Some(name) = node_text(node, parsed) else {
        return ResolvedStrings::none();
    };
    let scope = enclosing_scope(node);

    let mut assigned = Vec::new();
    let mut poisoned = false;
    walk_scope(scope, &mut |candidate| {
        match candidate.kind() {
            "assignment_expression" => {
                if assigns_to(candidate, &name, parsed) {
                    if candidate.start_byte() >= node.start_byte() {
                        poisoned = true;
                    } else if let Some(right) = candidate.child_by_field_name("right") {
                        assigned.push(right);
                    }
                }
            }
            "augmented_assignment_expression" => {
                if assigns_to(candidate, &name, parsed) {
                    poisoned = true;
                }
            }
            _ => {}
        }
    });

    if poisoned || assigned.len() != 1 {
        return ResolvedStrings::none();
    }

    resolve_with_depth(assigned[0], parsed, depth + 1)
}

fn assigns_to(assignment: Node, name: &str, parsed: &ParsedSource) -> bool {
    assignment
        .child_by_field_name("left")
        .filter(|left| left.kind() == "variable_name")
        .and_then(|left| node_text(left, parsed))
        .as_deref()
        == Some(name)
}

fn opens_scope(node: Node) -> bool {
    matches!(
        node.kind(),
        "function_definition"
            | "method_declaration"
            | "anonymous_function_creation_expression"
            | "arrow_function"
    )
}

fn enclosing_scope(node: Node) -> Node {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if opens_scope(parent) {
            return parent;
        }
        current = parent;
    }
    current
}

/// Depth-first walk over one scope: visits every node under `node` but does
/// not descend into children that open a new function scope.
fn walk_scope<'a, F>(node: Node<'a>, callback: &mut F)
where
    F: FnMut(Node<'a>),
{
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            callback(child);
            if !opens_scope(child) {
                walk_scope(child, callback);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

/// Single-quoted literals only collapse `\\` and `\'`.
pub fn single_quoted_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Double-quoted literals collapse `\\`, `\"`, `\$`, `\r`, `\n` and `\t`;
/// any other escape stays literal. Interpolation makes the value
/// non-constant, signalled with `None`.
pub fn double_quoted_value(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('$') => out.push('$'),
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '$' => match chars.peek() {
                Some(&next) if next == '{' || next == '_' || next.is_ascii_alphabetic() => {
                    return None;
                }
                _ => out.push('$'),
            },
            '{' if chars.peek() == Some(&'$') => return None,
            _ => out.push(c),
        }
    }
    Some(out)
}

/// Structural test: is this an anonymous function or arrow function.
pub fn is_closure(node: Node) -> bool {
    matches!(
        node.kind(),
        "anonymous_function_creation_expression" | "arrow_function"
    )
}

/// Returns the `static` keyword token of a closure declared static.
pub fn static_keyword(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            // `anonymous_function_creation_expression` exposes a bare `static`
            // token; `arrow_function` wraps it in a `static_modifier` node.
            if matches!(child.kind(), "static" | "static_modifier") {
                return Some(child);
            }
            // The modifier can only precede the `function`/`fn` keyword.
            if matches!(child.kind(), "function" | "fn") {
                return None;
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    None
}

/// Exact source text of a node.
pub fn node_text(node: Node, parsed: &ParsedSource) -> Option<String> {
    node.utf8_text(parsed.source.as_bytes())
        .ok()
        .map(ToOwned::to_owned)
}

/// Splits a call's callee into namespace prefix (kept verbatim, including
/// the trailing backslash) and base name. `None` for dynamic callees.
pub fn call_name(call: Node, parsed: &ParsedSource) -> Option<(String, String)> {
    let callee = call.child_by_field_name("function")?;
    if !matches!(callee.kind(), "name" | "qualified_name") {
        return None;
    }
    let text = node_text(callee, parsed)?;

    match text.rfind('\\') {
        Some(idx) => Some((text[..=idx].to_owned(), text[idx + 1..].to_owned())),
        None => Some((String::new(), text)),
    }
}

/// Argument expressions of a call, with argument wrappers unwrapped.
pub fn call_arguments<'a>(call: Node<'a>) -> Vec<Node<'a>> {
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for idx in 0..arguments.named_child_count() {
        if let Some(argument) = arguments.named_child(idx) {
            if argument.kind() != "argument" {
                continue;
            }
            // Skips the label of PHP 8 named arguments.
            let count = argument.named_child_count();
            if count > 0 {
                if let Some(expression) = argument.named_child(count - 1) {
                    out.push(expression);
                }
            }
        }
    }
    out
}

pub fn walk_node<'a, F>(node: Node<'a>, callback: &mut F)
where
    F: FnMut(Node<'a>),
{
    callback(node);
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            walk_node(cursor.node(), callback);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

pub fn child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    for idx in 0..node.named_child_count() {
        if let Some(child) = node.named_child(idx) {
            if child.kind() == kind {
                return Some(child);
            }
        }
    }
    None
}
