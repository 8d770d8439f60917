//! Literal patterns handed to `preg_*` calls with modifiers that cannot
//! change the match: `/i` without letters, `/s` without a dot.

use tree_sitter::Node;

use crate::inspect::dispatch::{FileContext, Target};
use crate::inspect::parser::ParsedSource;
use crate::inspect::resolve::{
    call_arguments, call_name, double_quoted_value, node_text, resolve_as_string_literal,
    single_quoted_value, string_literal_parts, QuoteStyle,
};
use crate::inspect::settings::StrictnessCategory;
use crate::inspect::{Diagnostic, Severity, SuggestedFix};

use super::Inspector;

const FIX_TITLE: &str = "Drop the senseless modifier";

const PREG_FUNCTIONS: &[&str] = &[
    "preg_match",
    "preg_match_all",
    "preg_replace",
    "preg_replace_callback",
    "preg_split",
    "preg_grep",
];

pub struct SenselessRegexModifier;

impl Inspector for SenselessRegexModifier {
    fn name(&self) -> &'static str {
        "regex/senseless_modifier"
    }

    fn category(&self) -> StrictnessCategory {
        StrictnessCategory::Performance
    }

    fn targets(&self) -> &'static [Target] {
        &[Target::FunctionCall]
    }

    fn check<'t>(&self, node: Node<'t>, cx: &mut FileContext<'t>) -> Option<Diagnostic> {
        let parsed = cx.parsed;
        let (_, base) = call_name(node, parsed)?;
        if !PREG_FUNCTIONS.contains(&base.to_ascii_lowercase().as_str()) {
            return None;
        }

        let literal = resolve_as_string_literal(*call_arguments(node).first()?)?;
        let (style, raw) = string_literal_parts(literal, parsed)?;
        let pattern = match style {
            QuoteStyle::Single => single_quoted_value(&raw),
            QuoteStyle::Double => double_quoted_value(&raw)?,
        };

        let parts = parse_pattern(&pattern)?;
        let (modifier, reason) = if parts.modifiers.contains('i') && !has_letter(&parts.body) {
            ('i', "the pattern has no alphabet characters")
        } else if parts.modifiers.contains('s') && !has_unescaped_dot(&parts.body) {
            ('s', "'.' is missing in the pattern")
        } else {
            return None;
        };

        let message = format!("'{modifier}' modifier is senseless here ({reason}).");
        let fix = drop_modifier(literal, parsed, parts.close, modifier)
            .map(|expression| SuggestedFix::replace_with(cx.pin(literal), FIX_TITLE, expression));

        Some(Diagnostic::for_node(
            parsed,
            self.name(),
            Severity::Info,
            literal,
            message,
            fix,
        ))
    }
}

struct PatternParts {
    body: String,
    modifiers: String,
    close: char,
}

fn parse_pattern(pattern: &str) -> Option<PatternParts> {
    let open = pattern.chars().next()?;
    if open.is_ascii_alphanumeric() || open == '\\' || open.is_whitespace() {
        return None;
    }
    let close = match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    };

    let end = pattern.rfind(close)?;
    if end < open.len_utf8() {
        return None;
    }

    Some(PatternParts {
        body: pattern[open.len_utf8()..end].to_owned(),
        modifiers: pattern[end + close.len_utf8()..].to_owned(),
        close,
    })
}

fn has_letter(body: &str) -> bool {
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c.is_ascii_alphabetic() {
            return true;
        }
    }
    false
}

fn has_unescaped_dot(body: &str) -> bool {
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == '.' {
            return true;
        }
    }
    false
}

/// Rewrites the literal with the modifier removed, operating on the raw
/// (still escaped) literal text so quoting is preserved verbatim.
fn drop_modifier(
    literal: Node,
    parsed: &ParsedSource,
    close: char,
    modifier: char,
) -> Option<String> {
    let text = node_text(literal, parsed)?;
    let close_pos = text.rfind(close)?;
    let offset = text[close_pos + close.len_utf8()..].find(modifier)?;

    let mut rewritten = text.clone();
    rewritten.remove(close_pos + close.len_utf8() + offset);
    Some(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::inspectors::test_utils::{
        apply_fixes, assert_messages, assert_no_diagnostics, check_source,
    };

    fn run(source: &str) -> (Vec<Diagnostic>, crate::inspect::Document) {
        check_source(Box::new(SenselessRegexModifier), source)
    }

    #[test]
    fn ignore_case_without_letters_triggers() {
        let (diagnostics, _) = run(r"<?php preg_match('/\d+/i', $input);");
        assert_messages(&diagnostics, &["'i' modifier is senseless here"]);
    }

    #[test]
    fn ignore_case_with_letters_is_fine() {
        let (diagnostics, _) = run("<?php preg_match('/abc/i', $input);");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn escaped_letters_do_not_count() {
        let (diagnostics, _) = run(r"<?php preg_split('/\s\d/i', $input);");
        assert_messages(&diagnostics, &["'i' modifier is senseless here"]);
    }

    #[test]
    fn dot_all_without_dot_triggers() {
        let (diagnostics, _) = run("<?php preg_match('/abc/s', $input);");
        assert_messages(&diagnostics, &["'s' modifier is senseless here"]);
    }

    #[test]
    fn dot_all_with_dot_is_fine() {
        let (diagnostics, _) = run("<?php preg_match('/a.c/s', $input);");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn escaped_dot_does_not_count() {
        let (diagnostics, _) = run(r"<?php preg_match('/a\.c/s', $input);");
        assert_messages(&diagnostics, &["'s' modifier is senseless here"]);
    }

    #[test]
    fn paired_delimiters_are_supported() {
        let (diagnostics, _) = run(r"<?php preg_match('(\d+)i', $input);");
        assert_messages(&diagnostics, &["'i' modifier is senseless here"]);
    }

    #[test]
    fn non_literal_pattern_declines() {
        let (diagnostics, _) = run("<?php preg_match($pattern, $input);");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn unrelated_function_is_ignored() {
        let (diagnostics, _) = run("<?php str_word_count('/1+/i');");
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn fix_drops_only_the_modifier() {
        let (diagnostics, mut doc) = run(r"<?php preg_match('/\d+/iu', $input);");
        let fixed = apply_fixes(&diagnostics, &mut doc);
        assert_eq!(fixed, r"<?php preg_match('/\d+/u', $input);");
    }

    #[test]
    fn fix_resolves_its_own_trigger() {
        let (diagnostics, mut doc) = run(r"<?php preg_match('/\d+/i', $input);");
        let fixed = apply_fixes(&diagnostics, &mut doc);
        let (after, _) = run(&fixed);
        assert_no_diagnostics(&after);
    }
}
