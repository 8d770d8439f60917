//! `str_replace` based path-traversal filtering that strips `../` with an
//! empty replacement can be bypassed by nesting (`....//` collapses to
//! `../` after one pass).

use tree_sitter::Node;

use crate::inspect::dispatch::{FileContext, Target};
use crate::inspect::resolve::{call_arguments, call_name, node_text, resolve_as_string};
use crate::inspect::settings::StrictnessCategory;
use crate::inspect::{Diagnostic, Severity, SuggestedFix};

use super::Inspector;

const MESSAGE: &str =
    "The call doesn't prevent path traversal, as it can be bypassed with e.g. '....//'.";
const FIX_TITLE: &str = "Harden with preg_replace(...)";

pub struct BypassedPathTraversalProtection;

impl Inspector for BypassedPathTraversalProtection {
    fn name(&self) -> &'static str {
        "security/bypassed_path_traversal"
    }

    fn category(&self) -> StrictnessCategory {
        StrictnessCategory::Security
    }

    fn targets(&self) -> &'static [Target] {
        &[Target::FunctionCall]
    }

    fn check<'t>(&self, node: Node<'t>, cx: &mut FileContext<'t>) -> Option<Diagnostic> {
        let parsed = cx.parsed;
        let (_, base) = call_name(node, parsed)?;
        if !base.eq_ignore_ascii_case("str_replace") {
            return None;
        }

        let arguments = call_arguments(node);
        if arguments.len() < 3 {
            return None;
        }

        let replacement = resolve_as_string(arguments[1], parsed);
        if replacement.is_empty() || !replacement.contains("") {
            return None;
        }

        let search = arguments[0];
        let is_array = search.kind() == "array_creation_expression";
        let variants = if is_array {
            array_element_values(search)
        } else {
            vec![search]
        };

        let filters_traversal = variants.iter().any(|variant| {
            let values = resolve_as_string(*variant, parsed);
            !values.is_empty() && (values.contains("../") || values.contains("..\\"))
        });
        if !filters_traversal {
            return None;
        }

        // A multi-pattern search cannot be collapsed into one replacement
        // call without further analysis, so the array form gets no fix.
        let fix = if is_array {
            None
        } else {
            let subject = node_text(arguments[2], parsed)?;
            let expression = format!("preg_replace('/\\.+[\\/\\\\]+/', '', {subject})");
            Some(SuggestedFix::replace_with(cx.pin(node), FIX_TITLE, expression))
        };

        Some(Diagnostic::for_node(
            parsed,
            self.name(),
            Severity::Warning,
            node,
            MESSAGE,
            fix,
        ))
    }
}

/// Values of an array literal, skipping keyed elements.
fn array_element_values<'a>(array: Node<'a>) -> Vec<Node<'a>> {
    let mut values = Vec::new();
    for idx in 0..array.named_child_count() {
        let Some(element) = array.named_child(idx) else {
            continue;
        };
        if element.kind() != "array_element_initializer" || element.named_child_count() != 1 {
            continue;
        }
        if let Some(value) = element.named_child(0) {
            values.push(value);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::inspectors::test_utils::{
        apply_fixes, assert_messages, assert_no_diagnostics, check_source,
    };

    fn run(source: &str) -> (Vec<Diagnostic>, crate::inspect::Document) {
        check_source(Box::new(BypassedPathTraversalProtection), source)
    }

    #[test]
    fn scalar_search_triggers_with_fix() {
        let (diagnostics, _) = run("<?php $path = str_replace('../', '', $path);");
        assert_messages(&diagnostics, &["can be bypassed with e.g. '....//'"]);
        let fix = diagnostics[0].fix.as_ref().expect("fix for scalar search");
        assert_eq!(fix.title, "Harden with preg_replace(...)");
    }

    #[test]
    fn array_search_triggers_without_fix() {
        let (diagnostics, _) =
            run(r"<?php $path = str_replace(['../', '..\\'], '', $path);");
        assert_messages(&diagnostics, &["can be bypassed"]);
        assert!(diagnostics[0].fix.is_none());
    }

    #[test]
    fn backslash_traversal_variant_triggers() {
        let (diagnostics, _) = run(r"<?php $path = str_replace('..\\', '', $path);");
        assert_messages(&diagnostics, &["can be bypassed"]);
    }

    #[test]
    fn non_empty_replacement_is_safe() {
        let (diagnostics, _) = run("<?php $path = str_replace('../', '_', $path);");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn unrelated_search_pattern_is_safe() {
        let (diagnostics, _) = run("<?php $out = str_replace('--', '', $input);");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn unresolvable_replacement_declines() {
        let (diagnostics, _) = run("<?php $path = str_replace('../', $filler, $path);");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn resolvable_variable_search_triggers() {
        let (diagnostics, _) =
            run("<?php $needle = '../'; $path = str_replace($needle, '', $path);");
        assert_messages(&diagnostics, &["can be bypassed"]);
    }

    #[test]
    fn search_assigned_only_inside_a_sibling_closure_declines() {
        let (diagnostics, _) = run(
            "<?php $f = function () { $needle = '../'; }; $clean = str_replace($needle, '', $path);",
        );
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn search_assigned_only_after_the_call_declines() {
        let (diagnostics, _) =
            run("<?php $clean = str_replace($needle, '', $path); $needle = '../';");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn fix_swaps_in_single_pass_regex() {
        let (diagnostics, mut doc) = run("<?php $path = str_replace('../', '', $path);");
        let fixed = apply_fixes(&diagnostics, &mut doc);
        assert_eq!(
            fixed,
            r"<?php $path = preg_replace('/\.+[\/\\]+/', '', $path);"
        );
    }

    #[test]
    fn fix_resolves_its_own_trigger() {
        let (diagnostics, mut doc) = run("<?php $path = str_replace('../', '', $path);");
        let fixed = apply_fixes(&diagnostics, &mut doc);
        let (after, _) = run(&fixed);
        assert_no_diagnostics(&after);
    }
}
