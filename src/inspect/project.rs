//! Class declarations indexed across the inspected file set, used to resolve
//! `parent::method()` style references to their declarations.

use std::collections::HashMap;

use tree_sitter::Node;

use super::parser::ParsedSource;
use super::resolve::{child_by_kind, node_text, walk_node};

const MAX_ANCESTRY_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub parent: Option<String>,
    pub methods: HashMap<String, MethodInfo>,
}

/// Immutable per-pass symbol table. Built once before inspection starts and
/// shared read-only between workers.
#[derive(Debug, Default)]
pub struct ClassIndex {
    classes: HashMap<String, ClassInfo>,
}

impl ClassIndex {
    pub fn build(sources: &[ParsedSource]) -> Self {
        let mut classes = HashMap::new();

        for parsed in sources {
            walk_node(parsed.tree.root_node(), &mut |node| {
                if node.kind() != "class_declaration" {
                    return;
                }
                if let Some(info) = collect_class(node, parsed) {
                    classes.insert(info.name.clone(), info);
                }
            });
        }

        Self { classes }
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// Resolves a `parent::method()` call to the method declaration, walking
    /// the ancestor chain of the class enclosing `call`. Unknown ancestors
    /// and dynamic references resolve to `None`, never a guess.
    pub fn resolve_parent_method(
        &self,
        call: Node,
        parsed: &ParsedSource,
    ) -> Option<&MethodInfo> {
        let scope = call.child_by_field_name("scope")?;
        if scope.kind() != "relative_scope" || node_text(scope, parsed)?.to_lowercase() != "parent"
        {
            return None;
        }

        let method_name = node_text(call.child_by_field_name("name")?, parsed)?;
        let class_name = enclosing_class_name(call, parsed)?;
        let mut ancestor = self.classes.get(&class_name)?.parent.clone();

        for _ in 0..MAX_ANCESTRY_DEPTH {
            let info = self.classes.get(ancestor.as_deref()?)?;
            if let Some(method) = info.methods.get(&method_name) {
                return Some(method);
            }
            ancestor = info.parent.clone();
        }

        None
    }
}

fn collect_class(node: Node, parsed: &ParsedSource) -> Option<ClassInfo> {
    let name = node_text(node.child_by_field_name("name")?, parsed)?;
    let parent = child_by_kind(node, "base_clause")
        .and_then(|base| base.named_child(0))
        .and_then(|parent| node_text(parent, parsed))
        .map(|text| text.trim_start_matches('\\').to_owned());

    let mut methods = HashMap::new();
    if let Some(body) = node.child_by_field_name("body") {
        for idx in 0..body.named_child_count() {
            let Some(member) = body.named_child(idx) else {
                continue;
            };
            if member.kind() != "method_declaration" {
                continue;
            }
            if let Some(method_name) = member
                .child_by_field_name("name")
                .and_then(|n| node_text(n, parsed))
            {
                methods.insert(
                    method_name.clone(),
                    MethodInfo {
                        name: method_name,
                        is_static: child_by_kind(member, "static_modifier").is_some(),
                    },
                );
            }
        }
    }

    Some(ClassInfo {
        name,
        parent,
        methods,
    })
}

fn enclosing_class_name(node: Node, parsed: &ParsedSource) -> Option<String> {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.kind() == "class_declaration" {
            return parent
                .child_by_field_name("name")
                .and_then(|name| node_text(name, parsed));
        }
        current = parent;
    }
    None
}
