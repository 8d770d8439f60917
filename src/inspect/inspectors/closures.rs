//! Closures declared `static` have no bound object: referencing `$this` or
//! calling a non-static method through `parent::` inside them fails at
//! runtime.

use tree_sitter::Node;

use crate::inspect::dispatch::{FileContext, Target};
use crate::inspect::resolve::{is_closure, node_text, static_keyword, walk_node};
use crate::inspect::settings::StrictnessCategory;
use crate::inspect::{Diagnostic, Severity, SuggestedFix};

use super::Inspector;

const MESSAGE_THIS: &str = "'$this' can not be used in static closures.";
const MESSAGE_PARENT: &str = "Non-static method should not be used in static closures.";
const FIX_TITLE: &str = "Make the closure non-static";

pub struct StaticClosureBinding;

impl Inspector for StaticClosureBinding {
    fn name(&self) -> &'static str {
        "closures/static_closure_binding"
    }

    fn category(&self) -> StrictnessCategory {
        StrictnessCategory::ProbableBugs
    }

    fn targets(&self) -> &'static [Target] {
        &[Target::Closure]
    }

    fn check<'t>(&self, node: Node<'t>, cx: &mut FileContext<'t>) -> Option<Diagnostic> {
        if !is_closure(node) {
            return None;
        }
        let keyword = static_keyword(node)?;

        // First violation in document order wins; one diagnostic per closure.
        let mut violation: Option<(Node, &'static str)> = None;
        walk_node(node, &mut |candidate| {
            if violation.is_some() {
                return;
            }

            match candidate.kind() {
                "variable_name" => {
                    if node_text(candidate, cx.parsed).as_deref() == Some("$this") {
                        violation = Some((candidate, MESSAGE_THIS));
                    }
                }
                "scoped_call_expression" => {
                    if let Some(method) = cx.classes.resolve_parent_method(candidate, cx.parsed) {
                        if !method.is_static {
                            violation = Some((candidate, MESSAGE_PARENT));
                        }
                    }
                }
                _ => {}
            }
        });

        let (anchor, message) = violation?;
        let fix = SuggestedFix::delete(cx.pin(keyword), FIX_TITLE);

        Some(Diagnostic::for_node(
            cx.parsed,
            self.name(),
            Severity::Warning,
            anchor,
            message,
            Some(fix),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::inspectors::test_utils::{
        apply_fixes, assert_messages, assert_no_diagnostics, check_source,
    };

    fn run(source: &str) -> (Vec<Diagnostic>, crate::inspect::Document) {
        check_source(Box::new(StaticClosureBinding), source)
    }

    #[test]
    fn this_inside_static_closure_triggers() {
        let (diagnostics, _) = run("<?php $f = static function () { return $this->value; };");
        assert_messages(&diagnostics, &["'$this' can not be used in static closures."]);
    }

    #[test]
    fn static_arrow_function_triggers() {
        let (diagnostics, _) = run("<?php $f = static fn () => $this->value;");
        assert_messages(&diagnostics, &["'$this' can not be used"]);
    }

    #[test]
    fn only_first_violation_is_reported() {
        let (diagnostics, _) =
            run("<?php $f = static function () { return $this->a . $this->b; };");
        assert_eq!(diagnostics.len(), 1);
        // Anchored at the first `$this` in document order.
        assert_eq!(diagnostics[0].span.start.column, 39);
    }

    #[test]
    fn non_static_closure_is_fine() {
        let (diagnostics, _) = run("<?php $f = function () { return $this->value; };");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn static_closure_without_binding_is_fine() {
        let (diagnostics, _) = run("<?php $f = static function ($x) { return $x * 2; };");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn parent_call_to_non_static_method_triggers() {
        let source = r#"<?php
class Base {
    public function render() {}
}
class Child extends Base {
    public function helper() {
        return static function () {
            parent::render();
        };
    }
}
"#;
        let (diagnostics, _) = run(source);
        assert_messages(
            &diagnostics,
            &["Non-static method should not be used in static closures."],
        );
    }

    #[test]
    fn parent_call_to_static_method_is_fine() {
        let source = r#"<?php
class Base {
    public static function render() {}
}
class Child extends Base {
    public function helper() {
        return static function () {
            parent::render();
        };
    }
}
"#;
        let (diagnostics, _) = run(source);
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn unresolvable_parent_declines() {
        let source = r#"<?php
class Child extends \Vendor\Widget {
    public function helper() {
        return static function () {
            parent::render();
        };
    }
}
"#;
        let (diagnostics, _) = run(source);
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn fix_removes_exactly_the_static_token() {
        let source = "<?php $f = static function () { return $this; };";
        let (diagnostics, mut doc) = run(source);
        let fixed = apply_fixes(&diagnostics, &mut doc);
        assert_eq!(fixed, "<?php $f =  function () { return $this; };");
    }

    #[test]
    fn fix_resolves_its_own_trigger() {
        let (diagnostics, mut doc) = run("<?php $f = static function () { return $this; };");
        let fixed = apply_fixes(&diagnostics, &mut doc);
        let (after, _) = run(&fixed);
        assert_no_diagnostics(&after);
    }
}
