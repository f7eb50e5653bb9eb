//! Semantic translator (§4.2): syntax events in, `GrammarIr` out.
//!
//! Consumes the callback stream of `crate::syntax::SyntaxConsumer` while
//! building, per rule, a local opcode arena. `RNM`/`BKR` targets are
//! recorded as pending name references and resolved in one pass at
//! `finish()`, once every rule in the grammar has been seen — this is what
//! lets a rule refer to another rule defined later in the source. Rule
//! arenas are concatenated into the session's single opcode stream only at
//! `finish()`, so an incremental alternative (`=/`) extending a rule whose
//! first definition appeared many rules ago never has to relocate anything
//! that was already flattened.

use indexmap::IndexMap;
use sabnf_bytecode::{BkrCase, BkrMode};
use sabnf_core::{Grammar, Interner, OpId, RuleId, Span, Symbol, UdtId};

use crate::diagnostics::{DiagnosticEntry, Diagnostics, Stage};
use crate::ir::{Attributes, BkrTarget, GrammarIr, OpKind, OpNode, RecursiveType, RuleIr, UdtIr};
use crate::syntax::SyntaxConsumer;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FrameKind {
    Rule,
    Alt,
    Cat,
    Rep { min: u64, max: u64 },
    And,
    Not,
    Bka,
    Bkn,
}

struct OpenFrame {
    kind: FrameKind,
    span: Span,
    children: Vec<u32>,
}

enum PendingKind {
    Rnm,
    Bkr(BkrCase, BkrMode),
}

struct PendingRef {
    owner: RuleId,
    local_index: u32,
    name: String,
    span: Span,
    kind: PendingKind,
}

struct RuleBuilder {
    name: String,
    name_symbol: Symbol,
    local_ops: Vec<OpNode>,
    root: Option<u32>,
    incremental_pending: bool,
}

pub struct Translator<'g> {
    grammar: &'g Grammar,
    diagnostics: Diagnostics,
    interner: Interner,
    rule_index: IndexMap<String, RuleId>,
    rule_builders: Vec<RuleBuilder>,
    udt_index: IndexMap<String, UdtId>,
    udts: Vec<UdtIr>,
    frames: Vec<OpenFrame>,
    current_rule: Option<RuleId>,
    pending_refs: Vec<PendingRef>,
    version: Option<String>,
    copyright: Option<String>,
    license: Option<String>,
}

impl<'g> Translator<'g> {
    /// `grammar` is the already-validated source (§4.1); the translator
    /// borrows its line index to attach locations to its own diagnostics.
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            diagnostics: Diagnostics::new(),
            interner: Interner::new(),
            rule_index: IndexMap::new(),
            rule_builders: Vec::new(),
            udt_index: IndexMap::new(),
            udts: Vec::new(),
            frames: Vec::new(),
            current_rule: None,
            pending_refs: Vec::new(),
            version: None,
            copyright: None,
            license: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = Some(copyright.into());
        self
    }

    #[must_use]
    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        let location = self.grammar.line_index().locate(span.offset);
        let rendered_line =
            String::from_utf8_lossy(self.grammar.line_index().rendered_line(self.grammar.bytes(), span.offset))
                .into_owned();
        self.diagnostics
            .push(DiagnosticEntry::new(Stage::Translate, message).at(location, rendered_line));
    }

    fn builder(&mut self) -> &mut RuleBuilder {
        let id = self.current_rule.expect("op event outside a rule body");
        &mut self.rule_builders[id.as_usize()]
    }

    /// Push a leaf/combinator opcode onto the current rule's local arena and
    /// wire it as a child of whatever frame is open.
    fn push_op(&mut self, kind: OpKind, span: Span) -> u32 {
        let builder = self.builder();
        let index = builder.local_ops.len() as u32;
        builder.local_ops.push(OpNode { kind, span, pppt_index: None });
        if let Some(frame) = self.frames.last_mut() {
            frame.children.push(index);
        }
        index
    }

    fn open(&mut self, kind: FrameKind, span: Span) {
        self.frames.push(OpenFrame {
            kind,
            span,
            children: Vec::new(),
        });
    }

    /// Pop the innermost frame, apply §4.2.6 normalization, and push the
    /// resulting child (possibly the frame's sole child, unwrapped) up.
    fn close(&mut self, expected: FrameKind) {
        let frame = self.frames.pop().expect("unbalanced close event");
        debug_assert_eq!(
            std::mem::discriminant(&frame.kind),
            std::mem::discriminant(&expected)
        );

        let local_index = match frame.kind {
            FrameKind::Rule => {
                if let [only] = frame.children[..] {
                    Some(only)
                } else if frame.children.is_empty() {
                    self.error("rule body has no content", frame.span);
                    None
                } else {
                    // A rule body is a single top-level expression; more
                    // than one child here is a frontend bug, not user error.
                    self.error("rule body produced more than one expression", frame.span);
                    frame.children.first().copied()
                }
            }
            FrameKind::Alt if frame.children.len() == 1 => Some(frame.children[0]),
            FrameKind::Cat if frame.children.len() == 1 => Some(frame.children[0]),
            FrameKind::Alt => {
                Some(self.push_op_in_place(OpKind::Alt(to_op_ids(&frame.children)), frame.span))
            }
            FrameKind::Cat => {
                Some(self.push_op_in_place(OpKind::Cat(to_op_ids(&frame.children)), frame.span))
            }
            FrameKind::Rep { min, max } => {
                if min > max {
                    self.error(
                        format!("inverted repetition bounds: min {min} > max {max}"),
                        frame.span,
                    );
                }
                let &child = frame.children.first().unwrap_or(&0);
                if min == 1 && max == 1 {
                    Some(child)
                } else {
                    Some(self.push_op_in_place(
                        OpKind::Rep {
                            min,
                            max,
                            child: OpId::from_raw(child),
                        },
                        frame.span,
                    ))
                }
            }
            FrameKind::And => {
                let &child = frame.children.first().unwrap_or(&0);
                Some(self.push_op_in_place(OpKind::And(OpId::from_raw(child)), frame.span))
            }
            FrameKind::Not => {
                let &child = frame.children.first().unwrap_or(&0);
                Some(self.push_op_in_place(OpKind::Not(OpId::from_raw(child)), frame.span))
            }
            FrameKind::Bka => {
                let &child = frame.children.first().unwrap_or(&0);
                Some(self.push_op_in_place(OpKind::Bka(OpId::from_raw(child)), frame.span))
            }
            FrameKind::Bkn => {
                let &child = frame.children.first().unwrap_or(&0);
                Some(self.push_op_in_place(OpKind::Bkn(OpId::from_raw(child)), frame.span))
            }
        };

        let Some(local_index) = local_index else {
            return;
        };

        if matches!(frame.kind, FrameKind::Rule) {
            self.close_rule(local_index, frame.span);
        } else if let Some(parent) = self.frames.last_mut() {
            parent.children.push(local_index);
        }
    }

    /// Like `push_op`, but does not also wire the new node as a child of the
    /// (already-popped) frame; the caller does that itself.
    fn push_op_in_place(&mut self, kind: OpKind, span: Span) -> u32 {
        let builder = self.builder();
        let index = builder.local_ops.len() as u32;
        builder.local_ops.push(OpNode { kind, span, pppt_index: None });
        index
    }

    fn close_rule(&mut self, new_top: u32, span: Span) {
        let rule_id = self.current_rule.take().expect("rule_close outside a rule");
        let incremental = self.rule_builders[rule_id.as_usize()].incremental_pending;
        self.rule_builders[rule_id.as_usize()].incremental_pending = false;

        let existing_root = self.rule_builders[rule_id.as_usize()].root;
        match existing_root {
            None => {
                self.rule_builders[rule_id.as_usize()].root = Some(new_top);
            }
            Some(old_root) if incremental => {
                let builder = &mut self.rule_builders[rule_id.as_usize()];
                if let OpKind::Alt(children) = &builder.local_ops[old_root as usize].kind {
                    // `root()` assumes a rule's root is the last opcode of its
                    // arena range, so the merged ALT has to move to the end
                    // rather than being mutated in place — the old_root node
                    // is otherwise no longer last once new_top was pushed.
                    let mut children = children.clone();
                    children.push(OpId::from_raw(new_top));
                    let index = builder.local_ops.len() as u32;
                    builder.local_ops.push(OpNode {
                        kind: OpKind::Alt(children),
                        span,
                        pppt_index: None,
                    });
                    builder.root = Some(index);
                } else {
                    let alt = OpKind::Alt(vec![OpId::from_raw(old_root), OpId::from_raw(new_top)]);
                    let index = builder.local_ops.len() as u32;
                    builder.local_ops.push(OpNode { kind: alt, span, pppt_index: None });
                    builder.root = Some(index);
                }
            }
            Some(_) => {
                self.error(
                    format!(
                        "rule {:?} redefined without an incremental alternative",
                        self.rule_builders[rule_id.as_usize()].name
                    ),
                    span,
                );
            }
        }
    }

    pub fn finish(mut self) -> Result<GrammarIr, Diagnostics> {
        // Flatten every rule's local opcode arena into one contiguous,
        // global stream, in ascending RuleId order. Each rule's local
        // indices become global via its base offset (§4.2.6).
        let mut opcodes = Vec::new();
        let mut bases = Vec::with_capacity(self.rule_builders.len());
        for builder in &self.rule_builders {
            let base = opcodes.len() as u32;
            bases.push(base);
            for op in &builder.local_ops {
                opcodes.push(OpNode {
                    kind: remap(&op.kind, base),
                    span: op.span,
                    pppt_index: None,
                });
            }
        }
        let total = opcodes.len() as u32;

        let pending_refs = std::mem::take(&mut self.pending_refs);
        for pending in &pending_refs {
            let global = bases[pending.owner.as_usize()] + pending.local_index;
            let target_rule = self.rule_index.get(&pending.name.to_ascii_lowercase()).copied();
            match pending.kind {
                PendingKind::Rnm => match target_rule {
                    Some(rule) => opcodes[global as usize].kind = OpKind::Rnm { rule },
                    None => self.error(
                        format!("undefined rule reference {:?}", pending.name),
                        pending.span,
                    ),
                },
                PendingKind::Bkr(case, mode) => {
                    let target = target_rule.map(BkrTarget::Rule).or_else(|| {
                        self.udt_index
                            .get(&pending.name.to_ascii_lowercase())
                            .copied()
                            .map(BkrTarget::Udt)
                    });
                    match target {
                        Some(target) => {
                            opcodes[global as usize].kind = OpKind::Bkr { target, case, mode }
                        }
                        None => self.error(
                            format!("undefined back-reference target {:?}", pending.name),
                            pending.span,
                        ),
                    }
                }
            }
        }

        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }

        let mut rules = Vec::with_capacity(self.rule_builders.len());
        for (i, builder) in self.rule_builders.into_iter().enumerate() {
            let id = RuleId::from_raw(i as u32);
            let count = opcodes_count_for(&bases, i, total);
            rules.push(RuleIr {
                id,
                name: builder.name,
                name_symbol: builder.name_symbol,
                protected: false,
                opcode_start: OpId::from_raw(bases[i]),
                opcode_count: count,
                may_empty: false,
                attributes: Attributes::default(),
                recursive_type: RecursiveType::N,
                refers_to: Vec::new(),
                refers_to_udt: Vec::new(),
                pppt_index: None,
            });
        }

        let version = self.version.map(|s| self.interner.intern_owned(s));
        let copyright = self.copyright.map(|s| self.interner.intern_owned(s));
        let license = self.license.map(|s| self.interner.intern_owned(s));

        Ok(GrammarIr {
            rule_index: self.rule_index,
            rules,
            udt_index: self.udt_index,
            udts: self.udts,
            opcodes,
            interner: self.interner,
            version,
            copyright,
            license,
        })
    }
}

fn opcodes_count_for(bases: &[u32], index: usize, total: u32) -> u32 {
    let start = bases[index];
    let end = bases.get(index + 1).copied().unwrap_or(total);
    end - start
}

fn to_op_ids(indices: &[u32]) -> Vec<OpId> {
    indices.iter().copied().map(OpId::from_raw).collect()
}

/// Rewrite every locally-numbered child reference in `kind` to its final
/// global `OpId` by adding the rule's base offset. `RNM`/`BKR` targets are
/// rule/UDT ids, not opcode positions, so they pass through untouched.
fn remap(kind: &OpKind, base: u32) -> OpKind {
    let shift = |id: OpId| OpId::from_raw(id.as_u32() + base);
    match kind {
        OpKind::Alt(children) => OpKind::Alt(children.iter().copied().map(shift).collect()),
        OpKind::Cat(children) => OpKind::Cat(children.iter().copied().map(shift).collect()),
        OpKind::Rep { min, max, child } => OpKind::Rep {
            min: *min,
            max: *max,
            child: shift(*child),
        },
        OpKind::Rnm { rule } => OpKind::Rnm { rule: *rule },
        OpKind::Tls(text) => OpKind::Tls(text.clone()),
        OpKind::Tbs(bytes) => OpKind::Tbs(bytes.clone()),
        OpKind::Trg { min, max } => OpKind::Trg { min: *min, max: *max },
        OpKind::Udt(udt) => OpKind::Udt(*udt),
        OpKind::Bkr { target, case, mode } => OpKind::Bkr {
            target: *target,
            case: *case,
            mode: *mode,
        },
        OpKind::And(child) => OpKind::And(shift(*child)),
        OpKind::Not(child) => OpKind::Not(shift(*child)),
        OpKind::Bka(child) => OpKind::Bka(shift(*child)),
        OpKind::Bkn(child) => OpKind::Bkn(shift(*child)),
        OpKind::Abg => OpKind::Abg,
        OpKind::Aen => OpKind::Aen,
    }
}

impl<'g> SyntaxConsumer for Translator<'g> {
    fn rule_open(&mut self, name: &str, span: Span) {
        let key = name.to_ascii_lowercase();
        let id = match self.rule_index.get(&key) {
            Some(&id) => id,
            None => {
                let id = RuleId::from_raw(self.rule_builders.len() as u32);
                let name_symbol = self.interner.intern(name);
                self.rule_index.insert(key, id);
                self.rule_builders.push(RuleBuilder {
                    name: name.to_string(),
                    name_symbol,
                    local_ops: Vec::new(),
                    root: None,
                    incremental_pending: false,
                });
                id
            }
        };
        self.current_rule = Some(id);
        self.open(FrameKind::Rule, span);
    }

    fn rule_close(&mut self, span: Span) {
        self.close(FrameKind::Rule);
        let _ = span;
    }

    fn incremental_alt(&mut self, _span: Span) {
        if let Some(id) = self.current_rule {
            self.rule_builders[id.as_usize()].incremental_pending = true;
        }
    }

    fn alt_open(&mut self, span: Span) {
        self.open(FrameKind::Alt, span);
    }

    fn alt_close(&mut self, _span: Span) {
        self.close(FrameKind::Alt);
    }

    fn cat_open(&mut self, span: Span) {
        self.open(FrameKind::Cat, span);
    }

    fn cat_close(&mut self, _span: Span) {
        self.close(FrameKind::Cat);
    }

    fn rep_open(&mut self, min: u64, max: u64, span: Span) {
        self.open(FrameKind::Rep { min, max }, span);
    }

    fn rep_close(&mut self, _span: Span) {
        self.close(FrameKind::Rep { min: 0, max: 0 });
    }

    fn option_open(&mut self, span: Span) {
        self.open(FrameKind::Rep { min: 0, max: 1 }, span);
    }

    fn option_close(&mut self, _span: Span) {
        self.close(FrameKind::Rep { min: 0, max: 1 });
    }

    fn rnm(&mut self, name: &str, span: Span) {
        let owner = self.current_rule.expect("rnm event outside a rule body");
        let local_index = self.push_op(OpKind::Rnm { rule: owner }, span);
        self.pending_refs.push(PendingRef {
            owner,
            local_index,
            name: name.to_string(),
            span,
            kind: PendingKind::Rnm,
        });
    }

    fn udt(&mut self, name: &str, may_empty: bool, span: Span) {
        let key = name.to_ascii_lowercase();
        let id = match self.udt_index.get(&key) {
            Some(&id) => id,
            None => {
                let id = UdtId::from_raw(self.udts.len() as u32);
                let name_symbol = self.interner.intern(name);
                self.udt_index.insert(key, id);
                self.udts.push(UdtIr {
                    id,
                    name: name.to_string(),
                    name_symbol,
                    may_empty,
                });
                id
            }
        };
        self.push_op(OpKind::Udt(id), span);
    }

    fn bkr(&mut self, target: &str, case: BkrCase, mode: BkrMode, span: Span) {
        let owner = self.current_rule.expect("bkr event outside a rule body");
        let local_index = self.push_op(
            OpKind::Bkr {
                target: BkrTarget::Rule(owner),
                case,
                mode,
            },
            span,
        );
        self.pending_refs.push(PendingRef {
            owner,
            local_index,
            name: target.to_string(),
            span,
            kind: PendingKind::Bkr(case, mode),
        });
    }

    fn tls_string(&mut self, text: &str, span: Span) {
        if text.bytes().any(|b| b == 0x09) {
            self.error("TAB is not allowed inside a string literal", span);
        }
        self.push_op(OpKind::Tls(text.to_ascii_lowercase()), span);
    }

    fn tbs_string(&mut self, bytes: &[u8], span: Span) {
        if bytes.is_empty() {
            self.error("a case-sensitive literal may not be empty", span);
        }
        if bytes.contains(&0x09) {
            self.error("TAB is not allowed inside a string literal", span);
        }
        self.push_op(OpKind::Tbs(bytes.to_vec()), span);
    }

    fn trg(&mut self, min: u64, max: u64, span: Span) {
        if min > max {
            self.error(format!("inverted character range: {min} > {max}"), span);
        }
        self.push_op(OpKind::Trg { min, max }, span);
    }

    fn anchor_begin(&mut self, span: Span) {
        self.push_op(OpKind::Abg, span);
    }

    fn anchor_end(&mut self, span: Span) {
        self.push_op(OpKind::Aen, span);
    }

    fn and_open(&mut self, span: Span) {
        self.open(FrameKind::And, span);
    }

    fn and_close(&mut self, _span: Span) {
        self.close(FrameKind::And);
    }

    fn not_open(&mut self, span: Span) {
        self.open(FrameKind::Not, span);
    }

    fn not_close(&mut self, _span: Span) {
        self.close(FrameKind::Not);
    }

    fn bka_open(&mut self, span: Span) {
        self.open(FrameKind::Bka, span);
    }

    fn bka_close(&mut self, _span: Span) {
        self.close(FrameKind::Bka);
    }

    fn bkn_open(&mut self, span: Span) {
        self.open(FrameKind::Bkn, span);
    }

    fn bkn_close(&mut self, _span: Span) {
        self.close(FrameKind::Bkn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 0)
    }

    fn grammar() -> Grammar {
        crate::validate::validate(b"x\r\n", true).unwrap()
    }

    #[test]
    fn trivial_literal_elides_wrapping_alt_and_cat() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.alt_open(span());
        t.cat_open(span());
        t.tls_string("abc", span());
        t.cat_close(span());
        t.alt_close(span());
        t.rule_close(span());
        let ir = t.finish().unwrap();
        assert_eq!(ir.rules.len(), 1);
        assert_eq!(ir.opcodes.len(), 1);
        assert!(matches!(&ir.opcodes[0].kind, OpKind::Tls(s) if s == "abc"));
    }

    #[test]
    fn incremental_alternative_appends_to_a_shared_alt() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("R", span());
        t.tls_string("a", span());
        t.rule_close(span());

        t.rule_open("R", span());
        t.incremental_alt(span());
        t.tls_string("b", span());
        t.rule_close(span());

        let ir = t.finish().unwrap();
        assert_eq!(ir.rules.len(), 1);
        let root = ir.rule(ir.rules[0].id).root();
        assert!(matches!(&ir.op(root).kind, OpKind::Alt(children) if children.len() == 2));
    }

    #[test]
    fn incremental_alternative_relocates_an_existing_multi_child_alt_root() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("R", span());
        t.alt_open(span());
        t.tls_string("a", span());
        t.tls_string("c", span());
        t.alt_close(span());
        t.rule_close(span());

        t.rule_open("R", span());
        t.incremental_alt(span());
        t.tls_string("b", span());
        t.rule_close(span());

        let ir = t.finish().unwrap();
        assert_eq!(ir.rules.len(), 1);
        let root = ir.rule(ir.rules[0].id).root();
        match &ir.op(root).kind {
            OpKind::Alt(children) => {
                assert_eq!(children.len(), 3);
                let texts: Vec<_> = children
                    .iter()
                    .map(|&c| match &ir.op(c).kind {
                        OpKind::Tls(text) => text.as_str(),
                        other => panic!("expected a Tls child, got {other:?}"),
                    })
                    .collect();
                assert_eq!(texts, vec!["a", "c", "b"]);
            }
            other => panic!("expected the relocated Alt to be the rule's root, got {other:?}"),
        }
    }

    #[test]
    fn forward_rule_reference_resolves_at_finish() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("A", span());
        t.rnm("B", span());
        t.rule_close(span());
        t.rule_open("B", span());
        t.tls_string("x", span());
        t.rule_close(span());

        let ir = t.finish().unwrap();
        let a = ir.find_rule("A").unwrap();
        let b = ir.find_rule("B").unwrap();
        let root = ir.rule(a).root();
        assert!(matches!(ir.op(root).kind, OpKind::Rnm { rule } if rule == b));
    }

    #[test]
    fn undefined_rule_reference_is_a_diagnostic() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("A", span());
        t.rnm("Nope", span());
        t.rule_close(span());
        assert!(t.finish().is_err());
    }

    #[test]
    fn inverted_repetition_bounds_is_a_diagnostic() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("R", span());
        t.rep_open(3, 2, span());
        t.tls_string("x", span());
        t.rep_close(span());
        t.rule_close(span());
        assert!(t.finish().is_err());
    }

    #[test]
    fn rep_1_1_is_elided() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("R", span());
        t.rep_open(1, 1, span());
        t.tls_string("x", span());
        t.rep_close(span());
        t.rule_close(span());
        let ir = t.finish().unwrap();
        assert_eq!(ir.opcodes.len(), 1);
    }
}
