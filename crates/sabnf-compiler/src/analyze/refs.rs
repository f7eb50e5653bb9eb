//! Dependency sets and recursive-type classification (§4.3).
//!
//! Mutual recursion only ever needs a two-rule check (`S ∈ refers_to[R] ∧ R
//! ∈ refers_to[S]`), so MR groups are formed with a direct pairwise scan and
//! a small connected-components pass, not Tarjan's algorithm.

use indexmap::IndexSet;
use sabnf_core::{OpId, RuleId, UdtId};

use crate::ir::{BkrTarget, GrammarIr, OpKind, RecursiveType};

#[derive(Clone, Debug, Default)]
pub struct RuleRefs {
    pub refers_to: IndexSet<RuleId>,
    pub refers_to_udt: IndexSet<UdtId>,
}

/// Transitive closure of the rules/UDTs reachable from `root` via `RNM`/`BKR`.
fn collect_refs(ir: &GrammarIr, root: RuleId) -> RuleRefs {
    let mut refs = RuleRefs::default();
    let mut expanded = IndexSet::new();
    let mut stack = vec![root];
    expanded.insert(root);

    while let Some(rule_id) = stack.pop() {
        let rule = ir.rule(rule_id);
        for i in 0..rule.opcode_count {
            let op = ir.op(OpId::from_raw(rule.opcode_start.as_u32() + i));
            match &op.kind {
                OpKind::Rnm { rule: target } => {
                    refs.refers_to.insert(*target);
                    if expanded.insert(*target) {
                        stack.push(*target);
                    }
                }
                OpKind::Bkr {
                    target: BkrTarget::Rule(target),
                    ..
                } => {
                    refs.refers_to.insert(*target);
                    if expanded.insert(*target) {
                        stack.push(*target);
                    }
                }
                OpKind::Bkr {
                    target: BkrTarget::Udt(udt),
                    ..
                } => {
                    refs.refers_to_udt.insert(*udt);
                }
                OpKind::Udt(udt) => {
                    refs.refers_to_udt.insert(*udt);
                }
                _ => {}
            }
        }
    }

    refs
}

/// Dependency sets for every rule, indexed by `RuleId::as_usize()`.
pub fn collect_all(ir: &GrammarIr) -> Vec<RuleRefs> {
    ir.rules.iter().map(|rule| collect_refs(ir, rule.id)).collect()
}

/// Classify each rule's recursive type and write its dependency sets back
/// onto `RuleIr`. Must run after `collect_all`.
pub fn classify(ir: &mut GrammarIr, refs: &[RuleRefs]) {
    let n = ir.rules.len();
    let is_recursive = |i: usize| refs[i].refers_to.contains(&ir.rules[i].id);
    let is_mutual =
        |i: usize, j: usize| refs[i].refers_to.contains(&ir.rules[j].id) && refs[j].refers_to.contains(&ir.rules[i].id);

    let mut group_of: Vec<Option<u32>> = vec![None; n];
    let mut next_group = 0u32;

    for i in 0..n {
        if group_of[i].is_some() || !is_recursive(i) {
            continue;
        }
        let mut members = vec![i];
        let mut frontier = vec![i];
        while let Some(cur) = frontier.pop() {
            for j in 0..n {
                if j == cur || !is_recursive(j) || group_of[j].is_some() || members.contains(&j) {
                    continue;
                }
                if is_mutual(cur, j) {
                    members.push(j);
                    frontier.push(j);
                }
            }
        }
        if members.len() > 1 {
            for &m in &members {
                group_of[m] = Some(next_group);
            }
            next_group += 1;
        }
    }

    for i in 0..n {
        ir.rules[i].recursive_type = match group_of[i] {
            Some(g) => RecursiveType::Mr(g),
            None if is_recursive(i) => RecursiveType::R,
            None => RecursiveType::N,
        };
        ir.rules[i].refers_to = refs[i].refers_to.iter().copied().collect();
        ir.rules[i].refers_to_udt = refs[i].refers_to_udt.iter().copied().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::Translator;
    use sabnf_core::Span;

    fn span() -> Span {
        Span::new(0, 0)
    }

    fn grammar() -> sabnf_core::Grammar {
        crate::validate::validate(b"x\r\n", true).unwrap()
    }

    #[test]
    fn self_recursion_is_type_r_not_mr() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("R", span());
        t.alt_open(span());
        t.rnm("R", span());
        t.tls_string("a", span());
        t.alt_close(span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();

        let refs = collect_all(&ir);
        classify(&mut ir, &refs);
        let r = ir.find_rule("R").unwrap();
        assert_eq!(ir.rule(r).recursive_type, RecursiveType::R);
    }

    #[test]
    fn mutual_pair_gets_the_same_mr_group() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("A", span());
        t.rnm("B", span());
        t.rule_close(span());
        t.rule_open("B", span());
        t.rnm("A", span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();

        let refs = collect_all(&ir);
        classify(&mut ir, &refs);
        let a = ir.find_rule("A").unwrap();
        let b = ir.find_rule("B").unwrap();
        match (ir.rule(a).recursive_type, ir.rule(b).recursive_type) {
            (RecursiveType::Mr(ga), RecursiveType::Mr(gb)) => assert_eq!(ga, gb),
            other => panic!("expected both rules in the same MR group, got {other:?}"),
        }
    }

    #[test]
    fn non_recursive_rule_is_type_n() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.tls_string("a", span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();

        let refs = collect_all(&ir);
        classify(&mut ir, &refs);
        let s = ir.find_rule("S").unwrap();
        assert_eq!(ir.rule(s).recursive_type, RecursiveType::N);
    }
}
