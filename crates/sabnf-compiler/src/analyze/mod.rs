//! Dependency and attribute analysis (§4.3).
//!
//! Runs in two passes over the translated `GrammarIr`: dependency sets and
//! recursive-type classification first (`refs`), then the six-attribute
//! SEST walk (`attributes`), which needs nothing from the first pass except
//! that rule roots already exist.

pub mod attributes;
pub mod refs;

use sabnf_core::RuleId;

use crate::ir::GrammarIr;

/// Run both passes, writing dependency sets, recursive types, and
/// attributes onto every `RuleIr`. Returns the ids of rules that are
/// fatally defective (`left ∨ cyclic ∨ ¬finite`); analysis always runs to
/// completion for every rule regardless of earlier failures.
pub fn analyze(ir: &mut GrammarIr) -> Vec<RuleId> {
    let deps = refs::collect_all(ir);
    refs::classify(ir, &deps);
    attributes::compute(ir)
}
