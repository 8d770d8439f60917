pub mod closures;
pub mod regex_quality;
pub mod security;
pub mod strings;

#[cfg(test)]
pub mod test_utils;

use tree_sitter::Node;

use super::dispatch::{FileContext, Target};
use super::settings::StrictnessCategory;
use super::Diagnostic;

pub use closures::StaticClosureBinding;
pub use regex_quality::SenselessRegexModifier;
pub use security::BypassedPathTraversalProtection;
pub use strings::StrTrUsageAsStrReplace;

/// A single inspection rule: a pure predicate over one node, producing at
/// most one diagnostic per invocation.
///
/// Missing structural preconditions (argument counts, unresolvable
/// operands) must decline with `None` — no errors, no partial matches.
pub trait Inspector {
    fn name(&self) -> &'static str;
    fn category(&self) -> StrictnessCategory;
    fn targets(&self) -> &'static [Target];
    fn check<'t>(&self, node: Node<'t>, cx: &mut FileContext<'t>) -> Option<Diagnostic>;
}

/// The rule catalog, instantiated fresh per dispatcher.
pub fn registry() -> Vec<Box<dyn Inspector>> {
    vec![
        Box::new(StrTrUsageAsStrReplace),
        Box::new(BypassedPathTraversalProtection),
        Box::new(StaticClosureBinding),
        Box::new(SenselessRegexModifier),
    ]
}
