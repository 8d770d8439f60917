//! Typed dispatch over the syntax tree: one depth-first traversal per file,
//! with each inspector invoked once per node of the kinds it subscribed to.

use std::collections::HashMap;

use tree_sitter::Node;

use super::document::{NodeKey, PinTable};
use super::inspectors::Inspector;
use super::parser::ParsedSource;
use super::project::ClassIndex;
use super::resolve::walk_node;
use super::settings::InspectionSettings;
use super::Diagnostic;

/// Closed set of node kinds inspectors can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    FunctionCall,
    Closure,
}

impl Target {
    fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "function_call_expression" => Some(Target::FunctionCall),
            "anonymous_function_creation_expression" | "arrow_function" => Some(Target::Closure),
            _ => None,
        }
    }
}

/// Per-file inspection state handed to inspectors: the parsed snapshot, the
/// class index, and the pin table fixes anchor into.
pub struct FileContext<'a> {
    pub parsed: &'a ParsedSource,
    pub classes: &'a ClassIndex,
    pins: PinTable,
}

impl<'a> FileContext<'a> {
    fn new(parsed: &'a ParsedSource, classes: &'a ClassIndex) -> Self {
        Self {
            parsed,
            classes,
            pins: PinTable::new(),
        }
    }

    /// Captures the node's range for a later fix; the returned key stays
    /// valid across tree edits (resolving to "absent" when stale).
    pub fn pin(&mut self, node: Node) -> NodeKey {
        self.pins.pin(node)
    }
}

/// Constructed once per file; maps node kinds to the inspectors interested
/// in them and runs a single traversal.
pub struct Dispatcher {
    inspectors: Vec<Box<dyn Inspector>>,
    by_target: HashMap<Target, Vec<usize>>,
}

impl Dispatcher {
    pub fn new(inspectors: Vec<Box<dyn Inspector>>) -> Self {
        let mut by_target: HashMap<Target, Vec<usize>> = HashMap::new();
        for (idx, inspector) in inspectors.iter().enumerate() {
            for target in inspector.targets() {
                by_target.entry(*target).or_default().push(idx);
            }
        }

        Self {
            inspectors,
            by_target,
        }
    }

    pub fn run(
        &self,
        settings: &InspectionSettings,
        parsed: &ParsedSource,
        classes: &ClassIndex,
    ) -> (Vec<Diagnostic>, PinTable) {
        let mut cx = FileContext::new(parsed, classes);
        let mut diagnostics = Vec::new();

        walk_node(parsed.tree.root_node(), &mut |node| {
            let Some(target) = Target::from_kind(node.kind()) else {
                return;
            };
            let Some(interested) = self.by_target.get(&target) else {
                return;
            };

            for &idx in interested {
                let inspector = &self.inspectors[idx];
                // The settings gate runs before any resolution work.
                if !settings.category_enabled(inspector.category())
                    || !settings.rule_enabled(inspector.name())
                {
                    continue;
                }

                if let Some(diagnostic) = inspector.check(node, &mut cx) {
                    diagnostics.push(diagnostic);
                }
            }
        });

        (diagnostics, cx.pins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::inspectors::{registry, test_utils::parse_php};
    use crate::inspect::settings::StrictnessCategory;

    const STATIC_THIS: &str = "<?php $f = static function () { return $this; };";

    #[test]
    fn enabled_rules_report() {
        let parsed = parse_php(STATIC_THIS);
        let classes = ClassIndex::build(std::slice::from_ref(&parsed));
        let dispatcher = Dispatcher::new(registry());

        let (diagnostics, _) =
            dispatcher.run(&InspectionSettings::default(), &parsed, &classes);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn disabled_category_short_circuits() {
        let parsed = parse_php(STATIC_THIS);
        let classes = ClassIndex::build(std::slice::from_ref(&parsed));
        let dispatcher = Dispatcher::new(registry());

        let mut settings = InspectionSettings::default();
        settings
            .categories
            .insert(StrictnessCategory::ProbableBugs, false);

        let (diagnostics, _) = dispatcher.run(&settings, &parsed, &classes);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn disabled_rule_short_circuits() {
        let parsed = parse_php(STATIC_THIS);
        let classes = ClassIndex::build(std::slice::from_ref(&parsed));
        let dispatcher = Dispatcher::new(registry());

        let mut settings = InspectionSettings::default();
        settings
            .rules
            .insert("closures/static_closure_binding".to_string(), false);

        let (diagnostics, _) = dispatcher.run(&settings, &parsed, &classes);
        assert!(diagnostics.is_empty());
    }
}
