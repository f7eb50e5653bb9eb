//! Six-attribute computation over each rule's Single-Expansion Syntax Tree
//! (§4.3). Walks a rule's own opcode tree, substituting referenced rules
//! in place on their first occurrence and cutting off repeat occurrences
//! (of the root itself, or of any other already-expanded rule) as leaves.

use std::collections::HashSet;

use sabnf_core::{OpId, RuleId};

use crate::ir::{Attributes, BkrTarget, GrammarIr, OpKind, RuleIr};

/// A leaf standing in for a direct recursive occurrence of the rule whose
/// SEST is currently being walked.
const RECURSIVE_LEAF: Attributes = Attributes {
    left: true,
    nested: false,
    right: true,
    cyclic: true,
    empty: false,
    finite: false,
};

/// A leaf standing in for the second (and later) occurrence of a reference
/// to some other rule already expanded once in this walk.
const REPEAT_LEAF: Attributes = Attributes {
    left: false,
    nested: false,
    right: false,
    cyclic: false,
    empty: false,
    finite: true,
};

struct Sest<'a> {
    ir: &'a GrammarIr,
    root: RuleId,
    expanded: HashSet<RuleId>,
}

impl<'a> Sest<'a> {
    fn walk_rule(&mut self, target: RuleId) -> Attributes {
        if target == self.root {
            return RECURSIVE_LEAF;
        }
        if !self.expanded.insert(target) {
            return REPEAT_LEAF;
        }
        self.walk_op(self.ir.rule(target).root())
    }

    fn walk_op(&mut self, id: OpId) -> Attributes {
        match &self.ir.op(id).kind {
            OpKind::Tls(text) => terminal(text.is_empty()),
            OpKind::Tbs(_) | OpKind::Trg { .. } => terminal(false),
            OpKind::Udt(udt) => terminal(self.ir.udt(*udt).may_empty),
            OpKind::Abg | OpKind::Aen => terminal(true),
            OpKind::Rnm { rule } => self.walk_rule(*rule),
            OpKind::Bkr { target, .. } => {
                let mut a = match target {
                    BkrTarget::Rule(rule) => self.walk_rule(*rule),
                    BkrTarget::Udt(udt) => terminal(self.ir.udt(*udt).may_empty),
                };
                a.left = false;
                a.nested = false;
                a.right = false;
                a.cyclic = false;
                a
            }
            OpKind::Rep { min, child, .. } => {
                let mut a = self.walk_op(*child);
                if *min == 0 {
                    a.empty = true;
                    a.finite = true;
                }
                a
            }
            OpKind::And(child) | OpKind::Not(child) | OpKind::Bka(child) | OpKind::Bkn(child) => {
                let mut a = self.walk_op(*child);
                a.empty = true;
                a
            }
            OpKind::Alt(children) => {
                let mut acc: Option<Attributes> = None;
                for &c in children {
                    let ca = self.walk_op(c);
                    acc = Some(match acc {
                        None => ca,
                        Some(prev) => Attributes {
                            left: prev.left || ca.left,
                            nested: prev.nested || ca.nested,
                            right: prev.right || ca.right,
                            cyclic: prev.cyclic || ca.cyclic,
                            empty: prev.empty || ca.empty,
                            finite: prev.finite || ca.finite,
                        },
                    });
                }
                acc.unwrap_or_default()
            }
            OpKind::Cat(children) => self.walk_cat(children),
        }
    }

    fn walk_cat(&mut self, children: &[OpId]) -> Attributes {
        let kinds: Vec<bool> = children
            .iter()
            .map(|&c| is_structural(&self.ir.op(c).kind))
            .collect();
        let attrs: Vec<Attributes> = children.iter().map(|&c| self.walk_op(c)).collect();

        let empty = attrs.iter().all(|a| a.empty);
        let finite = attrs.iter().all(|a| a.finite);
        let cyclic = attrs.iter().all(|a| a.cyclic);

        let left = attrs
            .iter()
            .find(|a| !a.is_empty_only())
            .map(|a| a.left)
            .unwrap_or(false);
        let right = attrs
            .iter()
            .rev()
            .find(|a| !a.is_empty_only())
            .map(|a| a.right)
            .unwrap_or(false);

        let mut nested = attrs.iter().any(|a| a.nested);

        if let Some(i) = (0..attrs.len()).find(|&i| attrs[i].right && kinds[i]) {
            if (i + 1..attrs.len()).any(|j| !attrs[j].is_empty_only()) {
                nested = true;
            }
        }
        if let Some(i) = (0..attrs.len()).rev().find(|&i| attrs[i].left && kinds[i]) {
            if (0..i).any(|j| !attrs[j].is_empty_only()) {
                nested = true;
            }
        }
        for (i, a) in attrs.iter().enumerate() {
            let recursive = a.left || a.right || a.cyclic;
            if !recursive {
                continue;
            }
            let before = (0..i).any(|j| is_non_recursive_nonempty(&attrs[j]));
            let after = (i + 1..attrs.len()).any(|j| is_non_recursive_nonempty(&attrs[j]));
            if before && after {
                nested = true;
            }
        }

        Attributes {
            left,
            nested,
            right,
            cyclic,
            empty,
            finite,
        }
    }
}

fn terminal(empty: bool) -> Attributes {
    Attributes {
        left: false,
        nested: false,
        right: false,
        cyclic: false,
        empty,
        finite: true,
    }
}

fn is_non_recursive_nonempty(a: &Attributes) -> bool {
    !(a.left || a.right || a.cyclic) && !a.empty
}

fn is_structural(kind: &OpKind) -> bool {
    matches!(
        kind,
        OpKind::Alt(_) | OpKind::Cat(_) | OpKind::Rep { .. } | OpKind::And(_) | OpKind::Not(_) | OpKind::Bka(_) | OpKind::Bkn(_)
    )
}

/// Compute every rule's six attributes and write them (plus `may_empty`)
/// back onto `RuleIr`. Returns the ids of rules that are fatally defective
/// (`left ∨ cyclic ∨ ¬finite`); the walk always completes for every rule
/// regardless of whether earlier rules were fatal.
pub fn compute(ir: &mut GrammarIr) -> Vec<RuleId> {
    let roots: Vec<(RuleId, OpId)> = ir.rules.iter().map(|rule| (rule.id, rule.root())).collect();
    let computed: Vec<Attributes> = roots
        .into_iter()
        .map(|(root, op)| {
            let mut sest = Sest {
                ir,
                root,
                expanded: HashSet::new(),
            };
            sest.walk_op(op)
        })
        .collect();

    let mut fatal = Vec::new();
    for (rule, attrs) in ir.rules.iter_mut().zip(computed.into_iter()) {
        set_attributes(rule, attrs);
        if attrs.is_fatal() {
            fatal.push(rule.id);
        }
    }
    fatal
}

fn set_attributes(rule: &mut RuleIr, attrs: Attributes) {
    rule.attributes = attrs;
    rule.may_empty = attrs.empty;
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
    fn a_plain_literal_rule_is_not_fatal() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.tls_string("a", span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        let fatal = compute(&mut ir);
        assert!(fatal.is_empty());
        let s = ir.find_rule("S").unwrap();
        assert!(ir.rule(s).attributes.finite);
        assert!(!ir.rule(s).attributes.empty);
    }

    #[test]
    fn left_recursion_is_fatal() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("R", span());
        t.cat_open(span());
        t.rnm("R", span());
        t.tls_string("a", span());
        t.cat_close(span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        let fatal = compute(&mut ir);
        assert_eq!(fatal.len(), 1);
        let r = ir.find_rule("R").unwrap();
        assert!(ir.rule(r).attributes.left);
        assert!(ir.rule(r).attributes.is_fatal());
    }

    #[test]
    fn right_recursion_alone_is_not_fatal() {
        // R = "a" R / "b"
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("R", span());
        t.alt_open(span());
        t.cat_open(span());
        t.tls_string("a", span());
        t.rnm("R", span());
        t.cat_close(span());
        t.tls_string("b", span());
        t.alt_close(span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        let fatal = compute(&mut ir);
        let r = ir.find_rule("R").unwrap();
        assert!(!ir.rule(r).attributes.left);
        assert!(fatal.is_empty());
    }

    #[test]
    fn an_empty_option_is_reported_as_empty() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.option_open(span());
        t.tls_string("a", span());
        t.option_close(span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        compute(&mut ir);
        let s = ir.find_rule("S").unwrap();
        assert!(ir.rule(s).attributes.empty);
    }
}
