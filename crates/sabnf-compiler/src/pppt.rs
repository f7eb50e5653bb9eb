//! Partially-Predictive Parsing Table builder (§4.4).
//!
//! Every `ALT`/`CAT`/`REP`/`TRG`/`TLS`/`TBS`/`AND`/`NOT` opcode and every
//! rule gets one map: `map_size` cells, one per alphabet character plus a
//! synthetic end-of-input cell, each saying whether the runtime can skip
//! trying that op for a given next character. `RNM`/`UDT`/`BKR`/`BKA`/`BKN`/
//! `ABG`/`AEN` carry no map of their own; they contribute an undecided
//! (all-`ACTIVE`) value when combined into a parent's map, except `RNM`,
//! which recurses into its target rule through the open/complete cache
//! below.

use sabnf_bytecode::{PpptCell, PpptTable};
use sabnf_core::{OpId, RuleId};

use crate::error::PpptError;
use crate::ir::{BkrTarget, GrammarIr, OpKind};

/// Opcodes that carry their own PPPT map, per §4.4.
fn carries_map(kind: &OpKind) -> bool {
    matches!(
        kind,
        OpKind::Alt(_)
            | OpKind::Cat(_)
            | OpKind::Rep { .. }
            | OpKind::Trg { .. }
            | OpKind::Tls(_)
            | OpKind::Tbs(_)
            | OpKind::And(_)
            | OpKind::Not(_)
    )
}

/// Every achar that appears in any terminal, widened so that a `TLS`'s
/// folded-lowercase letters also cover their uppercase twin (§4.4 sizing).
fn terminal_achars(ir: &GrammarIr) -> Vec<u64> {
    let mut achars = Vec::new();
    for op in &ir.opcodes {
        match &op.kind {
            OpKind::Tls(text) => {
                for c in text.chars() {
                    achars.push(c as u64);
                    if c.is_ascii_lowercase() {
                        achars.push(c.to_ascii_uppercase() as u64);
                    }
                }
            }
            OpKind::Tbs(bytes) => {
                for &b in bytes {
                    achars.push(b as u64);
                }
            }
            OpKind::Trg { min, max } => {
                achars.push(*min);
                achars.push(*max);
            }
            _ => {}
        }
    }
    achars
}

/// The achars that start some terminal in the grammar: a `TLS`/`TBS`'s
/// first character (case-folded), or every value in a `TRG`'s range, since
/// a range terminal trivially starts with any character it accepts.
fn starting_achars(ir: &GrammarIr) -> Vec<u64> {
    let mut starts = Vec::new();
    for op in &ir.opcodes {
        match &op.kind {
            OpKind::Tls(text) => {
                if let Some(c) = text.chars().next() {
                    starts.push(c as u64);
                    if c.is_ascii_lowercase() {
                        starts.push(c.to_ascii_uppercase() as u64);
                    }
                }
            }
            OpKind::Tbs(bytes) => {
                if let Some(&b) = bytes.first() {
                    starts.push(b as u64);
                }
            }
            OpKind::Trg { min, max } => {
                for v in *min..=*max {
                    starts.push(v);
                }
            }
            _ => {}
        }
    }
    starts
}

struct Builder<'a> {
    ir: &'a GrammarIr,
    achar_min: u64,
    map_size: usize,
    empty_map: Vec<PpptCell>,
    table: PpptTable,
    op_map_index: Vec<Option<u32>>,
    rule_map_index: Vec<u32>,
    rule_open: Vec<bool>,
    rule_complete: Vec<bool>,
    rule_cache: Vec<Option<Vec<PpptCell>>>,
    protected: Vec<bool>,
}

impl<'a> Builder<'a> {
    fn all_active(&self) -> Vec<PpptCell> {
        vec![PpptCell::Active; self.map_size]
    }

    fn cell_of(&self, achar: u64) -> usize {
        (achar - self.achar_min) as usize
    }

    fn literal_map(&self, first: Option<u64>, upper: Option<u64>, single: bool) -> Vec<PpptCell> {
        let mut map = vec![PpptCell::NoMatch; self.map_size];
        let value = if single { PpptCell::Match } else { PpptCell::Active };
        if let Some(c) = first {
            map[self.cell_of(c)] = value;
        }
        if let Some(c) = upper {
            map[self.cell_of(c)] = value;
        }
        map
    }

    fn ensure_rule(&mut self, rule: RuleId) -> Vec<PpptCell> {
        let idx = rule.as_usize();
        if self.rule_complete[idx] {
            return self.rule_cache[idx].clone().expect("completed rule has a cached map");
        }
        if self.rule_open[idx] {
            return self.all_active();
        }
        self.rule_open[idx] = true;
        let root = self.ir.rule(rule).root();
        let mut map = self.walk_op(root);
        if self.protected[idx] {
            map = self.all_active();
        }
        self.table.copy_map(self.rule_map_index[idx] as usize, &map);
        self.rule_cache[idx] = Some(map.clone());
        self.rule_open[idx] = false;
        self.rule_complete[idx] = true;
        map
    }

    fn walk_op(&mut self, id: OpId) -> Vec<PpptCell> {
        let kind = self.ir.op(id).kind.clone();
        let map = match &kind {
            OpKind::Tls(text) => {
                if text.is_empty() {
                    self.empty_map.clone()
                } else {
                    let mut chars = text.chars();
                    let first = chars.next().unwrap();
                    let upper = first.is_ascii_lowercase().then(|| first.to_ascii_uppercase() as u64);
                    self.literal_map(Some(first as u64), upper, text.chars().count() == 1)
                }
            }
            OpKind::Tbs(bytes) => {
                if bytes.is_empty() {
                    self.empty_map.clone()
                } else {
                    self.literal_map(Some(bytes[0] as u64), None, bytes.len() == 1)
                }
            }
            OpKind::Trg { min, max } => {
                let mut map = vec![PpptCell::NoMatch; self.map_size];
                for v in *min..=*max {
                    map[self.cell_of(v)] = PpptCell::Match;
                }
                map
            }
            OpKind::Alt(children) => {
                let child_maps: Vec<_> = children.iter().map(|&c| self.walk_op(c)).collect();
                let mut map = vec![PpptCell::NoMatch; self.map_size];
                for cell in 0..self.map_size {
                    map[cell] = child_maps
                        .iter()
                        .map(|m| m[cell])
                        .find(|&v| v != PpptCell::NoMatch)
                        .unwrap_or(PpptCell::NoMatch);
                }
                map
            }
            OpKind::Cat(children) => {
                let first = *children.first().expect("normalized CAT has at least two children");
                let first_map = self.walk_op(first);
                for &c in &children[1..] {
                    self.walk_op(c);
                }
                let mut map = vec![PpptCell::NoMatch; self.map_size];
                for cell in 0..self.map_size {
                    map[cell] = if first_map[cell] == PpptCell::NoMatch {
                        PpptCell::NoMatch
                    } else {
                        PpptCell::Active
                    };
                }
                map
            }
            OpKind::Rep { min, child, .. } => {
                let child_map = self.walk_op(*child);
                let mut map = vec![PpptCell::NoMatch; self.map_size];
                for cell in 0..self.map_size {
                    map[cell] = match child_map[cell] {
                        PpptCell::Empty => PpptCell::Empty,
                        PpptCell::NoMatch => {
                            if *min == 0 {
                                PpptCell::Empty
                            } else {
                                PpptCell::NoMatch
                            }
                        }
                        PpptCell::Match | PpptCell::Active => PpptCell::Active,
                    };
                }
                map
            }
            OpKind::And(child) => {
                let mut map = self.walk_op(*child);
                for cell in map.iter_mut() {
                    if *cell == PpptCell::Match {
                        *cell = PpptCell::Empty;
                    }
                }
                map
            }
            OpKind::Not(child) => {
                let mut map = self.walk_op(*child);
                for cell in map.iter_mut() {
                    *cell = match *cell {
                        PpptCell::Match => PpptCell::NoMatch,
                        PpptCell::NoMatch => PpptCell::Empty,
                        other => other,
                    };
                }
                map
            }
            OpKind::Rnm { rule } => self.ensure_rule(*rule),
            OpKind::Udt(_) | OpKind::Bkr { .. } | OpKind::Bka(_) | OpKind::Bkn(_) | OpKind::Abg | OpKind::Aen => {
                self.all_active()
            }
        };

        if let Some(idx) = self.op_map_index[id.as_usize()] {
            self.table.copy_map(idx as usize, &map);
        }
        map
    }
}

/// Everything the emitter needs out of the PPPT stage: the table itself
/// plus the map index written onto every rule and every mapped opcode.
pub struct PpptBuild {
    pub table: PpptTable,
    pub achar_min: u64,
    pub map_size: usize,
}

/// Build the full PPPT. `protected_names` are rule names the runtime must
/// always be able to call even if lookahead would otherwise predict
/// `NOMATCH`/`EMPTY`; each name must match a defined rule or this returns
/// `PpptError` before any map is built (Open Question 1, resolved in
/// DESIGN.md).
pub fn build(ir: &mut GrammarIr, protected_names: &[String]) -> Result<PpptBuild, PpptError> {
    let mut protected = vec![false; ir.rules.len()];
    for name in protected_names {
        let id = ir
            .find_rule(name)
            .ok_or_else(|| PpptError(format!("protected rule name {name:?} does not match any defined rule")))?;
        protected[id.as_usize()] = true;
    }

    let achars = terminal_achars(ir);
    let achar_min = achars.iter().copied().min().unwrap_or(0);
    let achar_max = achars.iter().copied().max().unwrap_or(0);
    let map_size = (achar_max - achar_min + 2) as usize;

    let mut empty_map = vec![PpptCell::NoMatch; map_size];
    for achar in starting_achars(ir) {
        empty_map[(achar - achar_min) as usize] = PpptCell::Empty;
    }
    let eos = map_size - 1;
    empty_map[eos] = PpptCell::Empty;

    let rule_count = ir.rules.len();
    let mut op_map_index = vec![None; ir.opcodes.len()];
    let mut next_index = rule_count as u32;
    for (i, op) in ir.opcodes.iter().enumerate() {
        if carries_map(&op.kind) {
            op_map_index[i] = Some(next_index);
            next_index += 1;
        }
    }
    let map_count = next_index as usize;

    map_count
        .checked_mul(map_size)
        .ok_or_else(|| PpptError("PPPT table size overflows the platform word".to_string()))?;

    let table = PpptTable::new(map_count, map_size, achar_min);
    let rule_map_index: Vec<u32> = (0..rule_count as u32).collect();

    let mut order: Vec<usize> = (0..rule_count).collect();
    order.sort_by_key(|&i| (ir.rules[i].opcode_count, ir.rules[i].name.clone()));

    let mut builder = Builder {
        ir,
        achar_min,
        map_size,
        empty_map,
        table,
        op_map_index,
        rule_map_index,
        rule_open: vec![false; rule_count],
        rule_complete: vec![false; rule_count],
        rule_cache: vec![None; rule_count],
        protected,
    };

    for i in order {
        builder.ensure_rule(RuleId::from_raw(i as u32));
    }

    let Builder {
        table,
        op_map_index,
        rule_map_index,
        ..
    } = builder;

    for (i, rule) in ir.rules.iter_mut().enumerate() {
        rule.pppt_index = Some(rule_map_index[i]);
    }
    for (i, op) in ir.opcodes.iter_mut().enumerate() {
        op.pppt_index = op_map_index[i];
    }

    Ok(PpptBuild {
        table,
        achar_min,
        map_size,
    })
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
    fn single_char_tls_predicts_match_on_its_letter() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.tls_string("a", span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        crate::analyze::analyze(&mut ir);
        let build = build(&mut ir, &[]).unwrap();

        let s = ir.find_rule("S").unwrap();
        let idx = ir.rule(s).pppt_index.unwrap() as usize;
        let map = build.table.map(idx);
        let a_cell = build.table.char_cell('a' as u64);
        let upper_cell = build.table.char_cell('A' as u64);
        assert_eq!(map[a_cell], PpptCell::Match);
        assert_eq!(map[upper_cell], PpptCell::Match);
    }

    #[test]
    fn trg_marks_every_value_in_range_as_match() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.trg(48, 57, span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        crate::analyze::analyze(&mut ir);
        let build = build(&mut ir, &[]).unwrap();

        let s = ir.find_rule("S").unwrap();
        let idx = ir.rule(s).pppt_index.unwrap() as usize;
        let map = build.table.map(idx);
        for v in 48..=57u64 {
            assert_eq!(map[build.table.char_cell(v)], PpptCell::Match);
        }
    }

    #[test]
    fn unmatched_protected_name_is_a_fatal_error() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.tls_string("a", span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        crate::analyze::analyze(&mut ir);
        let err = build(&mut ir, &["nosuch".to_string()]).unwrap_err();
        assert!(err.0.contains("nosuch"));
    }

    #[test]
    fn protected_rule_map_is_forced_all_active() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.tls_string("a", span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        crate::analyze::analyze(&mut ir);
        let build = build(&mut ir, &["S".to_string()]).unwrap();
        let s = ir.find_rule("S").unwrap();
        let idx = ir.rule(s).pppt_index.unwrap() as usize;
        assert!(build.table.map(idx).iter().all(|&c| c == PpptCell::Active));
    }

    #[test]
    fn self_recursive_rule_does_not_loop_forever() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("R", span());
        t.alt_open(span());
        t.rnm("R", span());
        t.tls_string("a", span());
        t.alt_close(span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        crate::analyze::analyze(&mut ir);
        let build = build(&mut ir, &[]).unwrap();
        let r = ir.find_rule("R").unwrap();
        assert!(ir.rule(r).pppt_index.is_some());
        let _ = build;
    }
}
