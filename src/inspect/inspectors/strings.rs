//! `strtr($subject, $search, $replace)` with a single-character search is
//! just a roundabout `str_replace`.

use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Node;

use crate::inspect::dispatch::{FileContext, Target};
use crate::inspect::resolve::{
    call_arguments, call_name, node_text, resolve_as_string_literal, string_literal_parts,
    QuoteStyle,
};
use crate::inspect::settings::StrictnessCategory;
use crate::inspect::{Diagnostic, Severity, SuggestedFix};

use super::Inspector;

const FIX_TITLE: &str = "Use str_replace(...) instead";

// One logical character: a bare character, or a recognized escape of the
// literal's quote style.
static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.|\\[\\'])$").expect("valid single-quote pattern"));
static DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(.|\\[\\"$rnt])$"#).expect("valid double-quote pattern"));

pub struct StrTrUsageAsStrReplace;

impl Inspector for StrTrUsageAsStrReplace {
    fn name(&self) -> &'static str {
        "strings/strtr_as_str_replace"
    }

    fn category(&self) -> StrictnessCategory {
        StrictnessCategory::ControlFlow
    }

    fn targets(&self) -> &'static [Target] {
        &[Target::FunctionCall]
    }

    fn check<'t>(&self, node: Node<'t>, cx: &mut FileContext<'t>) -> Option<Diagnostic> {
        let parsed = cx.parsed;
        let (namespace, base) = call_name(node, parsed)?;
        if !base.eq_ignore_ascii_case("strtr") {
            return None;
        }

        let arguments = call_arguments(node);
        if arguments.len() != 3 {
            return None;
        }

        let search = resolve_as_string_literal(arguments[1])?;
        let (style, content) = string_literal_parts(search, parsed)?;
        if content.is_empty() || content.chars().count() > 2 {
            return None;
        }

        let is_single_character = match style {
            QuoteStyle::Single => SINGLE_QUOTED.is_match(&content),
            QuoteStyle::Double => DOUBLE_QUOTED.is_match(&content),
        };
        if !is_single_character {
            return None;
        }

        let replacement = format!(
            "{}str_replace({}, {}, {})",
            namespace,
            node_text(arguments[1], parsed)?,
            node_text(arguments[2], parsed)?,
            node_text(arguments[0], parsed)?,
        );
        let message = format!("'{replacement}' can be used instead (improves maintainability).");
        let fix = SuggestedFix::replace_with(cx.pin(node), FIX_TITLE, replacement);

        Some(Diagnostic::for_node(
            parsed,
            self.name(),
            Severity::Warning,
            node,
            message,
            Some(fix),
        ))
    }
}
