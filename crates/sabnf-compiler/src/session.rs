//! API session (§3.2, §5): the owning struct a host builds, feeds a
//! grammar through, and drains an initialization image from.
//!
//! There is no typestate chain of wrapper types here — just one struct
//! whose stage-validity flags advance monotonically
//! (`input_valid -> syntax_valid -> semantics_valid -> attributes_valid`)
//! and whose methods check the flag they need before touching session
//! state. A fresh `input()` call resets every downstream flag and frees
//! whatever that stage had produced, exactly like the teacher's query
//! session resets on re-parse.
//!
//! Concurrency model (§5): a `Session` is single-threaded and
//! cooperative — one session, no internal parallelism, no statics.
//! Independent sessions may run on independent threads. Dropping a
//! session releases everything it owns; no `unsafe` arena is needed for
//! that, ordinary ownership already gives it for free.

use sabnf_bytecode::build_image;
use sabnf_core::Grammar;

use crate::analyze;
use crate::diagnostics::{DiagnosticEntry, Diagnostics, Stage};
use crate::emit;
use crate::error::{Error, Result};
use crate::ir::GrammarIr;
use crate::pppt::{self, PpptBuild};
use crate::translate::Translator;
use crate::validate;

/// Builds a [`Session`] with the policy knobs the core owns directly:
/// `strict` line-ending mode and the protected-rule-name list (§2.1,
/// §4.4). Not "configuration files" — in-process, construction-time
/// configuration of one library session.
#[must_use]
#[derive(Debug, Default, Clone)]
pub struct SessionBuilder {
    strict: bool,
    protected_rule_names: Vec<String>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn protect_rule(mut self, name: impl Into<String>) -> Self {
        self.protected_rule_names.push(name.into());
        self
    }

    pub fn protected_rules(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.protected_rule_names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Session {
        Session {
            strict: self.strict,
            protected_rule_names: self.protected_rule_names,
            grammar: None,
            ir: None,
            pppt: None,
            input_valid: false,
            syntax_valid: false,
            semantics_valid: false,
            attributes_valid: false,
        }
    }
}

/// The `CompilerBuilder`-style entry point; an alias kept for callers
/// that think of this as "the compiler" rather than "a session".
pub type CompilerBuilder = SessionBuilder;

pub struct Session {
    strict: bool,
    protected_rule_names: Vec<String>,
    grammar: Option<Grammar>,
    ir: Option<GrammarIr>,
    pppt: Option<PpptBuild>,
    input_valid: bool,
    syntax_valid: bool,
    semantics_valid: bool,
    attributes_valid: bool,
}

fn require(valid: bool, stage: &'static str, prerequisite: &'static str) -> Result<()> {
    if valid {
        Ok(())
    } else {
        Err(Error::State { stage, prerequisite })
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// §4.1. Validates `bytes` and resets every downstream stage,
    /// releasing whatever tree/attributes/table a prior grammar had
    /// produced.
    pub fn input(&mut self, bytes: &[u8]) -> Result<()> {
        let grammar = validate::validate(bytes, self.strict).map_err(Error::InputCharacter)?;
        self.grammar = Some(grammar);
        self.ir = None;
        self.pppt = None;
        self.input_valid = true;
        self.syntax_valid = false;
        self.semantics_valid = false;
        self.attributes_valid = false;
        Ok(())
    }

    /// §4.2/§4.2a. Drives `produce` against a fresh [`Translator`] borrowed
    /// from the validated grammar, then finishes translation. `produce` is
    /// any syntax-tree producer that calls [`crate::syntax::SyntaxConsumer`]
    /// methods on the translator it's given — typically the standalone
    /// front-end crate's parser.
    pub fn syntax<F, E>(&mut self, produce: F) -> Result<()>
    where
        F: FnOnce(&mut Translator<'_>) -> std::result::Result<(), E>,
        E: std::fmt::Display,
    {
        require(self.input_valid, "syntax", "input")?;
        let grammar = self.grammar.as_ref().expect("input_valid implies a grammar is set");
        let mut translator = Translator::new(grammar);
        produce(&mut translator).map_err(|e| {
            let mut diagnostics = Diagnostics::new();
            diagnostics.push(DiagnosticEntry::new(Stage::Translate, e.to_string()));
            Error::Semantic(diagnostics)
        })?;
        self.syntax_valid = true;

        let ir = translator.finish().map_err(Error::Semantic)?;
        self.semantics_valid = true;
        self.ir = Some(ir);
        Ok(())
    }

    /// §4.3. Computes dependency sets, recursive classification, and the
    /// six-attribute walk; fails if any rule comes out left-recursive,
    /// cyclic, or non-finite.
    pub fn attributes(&mut self) -> Result<()> {
        require(self.semantics_valid, "attributes", "syntax")?;
        let ir = self.ir.as_mut().expect("semantics_valid implies ir is set");
        let bad = analyze::analyze(ir);
        if !bad.is_empty() {
            let mut diagnostics = Diagnostics::new();
            for id in bad {
                let rule = ir.rule(id);
                diagnostics.push(DiagnosticEntry::new(
                    Stage::Analyze,
                    format!(
                        "rule {:?} is fatally defective (left={}, cyclic={}, finite={})",
                        rule.name, rule.attributes.left, rule.attributes.cyclic, rule.attributes.finite
                    ),
                ));
            }
            return Err(Error::Attribute(diagnostics));
        }
        self.attributes_valid = true;
        Ok(())
    }

    /// §4.4. Builds the PPPT over the translated, analyzed grammar.
    pub fn build_pppt(&mut self) -> Result<()> {
        require(self.attributes_valid, "pppt", "attributes")?;
        let ir = self.ir.as_mut().expect("attributes_valid implies ir is set");
        let build = pppt::build(ir, &self.protected_rule_names)?;
        self.pppt = Some(build);
        Ok(())
    }

    /// §4.5/§6.1. Lays out and returns the initialization image. Consumes
    /// the session's PPPT table; call [`Session::build_pppt`] again (or
    /// start a new session) to emit another image.
    pub fn emit_image(&mut self) -> Result<Vec<u8>> {
        require(self.attributes_valid, "emit", "pppt")?;
        let ir = self.ir.as_ref().expect("attributes_valid implies ir is set");
        let pppt = self.pppt.take().ok_or(Error::State {
            stage: "emit",
            prerequisite: "pppt",
        })?;
        let sections = emit::emit(ir, pppt);
        let image = build_image(&sections).map_err(Error::Emit)?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SyntaxConsumer;

    /// Drives a handful of `SyntaxConsumer` calls directly, standing in
    /// for a real front-end parser in tests that don't need one.
    fn feed_trivial_rule(t: &mut Translator<'_>) -> std::result::Result<(), std::convert::Infallible> {
        use sabnf_core::Span;
        let span = Span::new(0, 1);
        t.rule_open("S", span);
        t.alt_open(span);
        t.cat_open(span);
        t.tls_string("a", span);
        t.cat_close(span);
        t.alt_close(span);
        t.rule_close(span);
        Ok(())
    }

    #[test]
    fn stages_must_run_in_order() {
        let mut session = Session::builder().build();
        let err = session.syntax(feed_trivial_rule).unwrap_err();
        assert!(matches!(err, Error::State { stage: "syntax", .. }));
    }

    #[test]
    fn full_pipeline_produces_an_image() {
        let mut session = Session::builder().strict(true).build();
        session.input(b"S = \"a\"\r\n").unwrap();
        session.syntax(feed_trivial_rule).unwrap();
        session.attributes().unwrap();
        session.build_pppt().unwrap();
        let image = session.emit_image().unwrap();
        assert!(!image.is_empty());
    }

    #[test]
    fn re_input_resets_downstream_validity() {
        let mut session = Session::builder().build();
        session.input(b"S = \"a\"\r\n").unwrap();
        session.syntax(feed_trivial_rule).unwrap();
        session.attributes().unwrap();
        session.input(b"S = \"b\"\r\n").unwrap();
        let err = session.attributes().unwrap_err();
        assert!(matches!(err, Error::State { stage: "attributes", .. }));
    }

    #[test]
    fn unmatched_protected_rule_name_surfaces_as_pppt_error() {
        let mut session = Session::builder().protect_rule("nosuch").build();
        session.input(b"S = \"a\"\r\n").unwrap();
        session.syntax(feed_trivial_rule).unwrap();
        session.attributes().unwrap();
        let err = session.build_pppt().unwrap_err();
        assert!(matches!(err, Error::Pppt(_)));
    }
}
