//! The syntax stage's consumer contract (§6.4).
//!
//! The grammar's own lexer/parser is an external producer as far as the
//! core is concerned (§1 Out of scope); this trait is the shape of what it
//! hands the translator. It is realized here as a push/callback interface
//! rather than a materialized event list: each method call *is* one event,
//! carrying the source span of the phrase that triggered it, so the
//! producer never has to buffer a whole tree before the translator can
//! start resolving references.
//!
//! The `sabnf-frontend` crate's lexer/parser is one concrete producer
//! (§4.2a); any other producer emitting the same calls is an equally
//! valid front end.

use sabnf_bytecode::{BkrCase, BkrMode};
use sabnf_core::Span;

pub trait SyntaxConsumer {
    fn rule_open(&mut self, name: &str, span: Span);
    fn rule_close(&mut self, span: Span);
    fn incremental_alt(&mut self, span: Span);

    fn alt_open(&mut self, span: Span);
    fn alt_close(&mut self, span: Span);
    fn cat_open(&mut self, span: Span);
    fn cat_close(&mut self, span: Span);

    fn rep_open(&mut self, min: u64, max: u64, span: Span);
    fn rep_close(&mut self, span: Span);
    /// Sugar for `REP(0,1)` (`[...]` / `?`).
    fn option_open(&mut self, span: Span);
    fn option_close(&mut self, span: Span);

    fn rnm(&mut self, name: &str, span: Span);
    fn udt(&mut self, name: &str, may_empty: bool, span: Span);
    fn bkr(&mut self, target: &str, case: BkrCase, mode: BkrMode, span: Span);

    fn tls_string(&mut self, text: &str, span: Span);
    fn tbs_string(&mut self, bytes: &[u8], span: Span);
    fn trg(&mut self, min: u64, max: u64, span: Span);

    fn anchor_begin(&mut self, span: Span);
    fn anchor_end(&mut self, span: Span);

    fn and_open(&mut self, span: Span);
    fn and_close(&mut self, span: Span);
    fn not_open(&mut self, span: Span);
    fn not_close(&mut self, span: Span);
    fn bka_open(&mut self, span: Span);
    fn bka_close(&mut self, span: Span);
    fn bkn_open(&mut self, span: Span);
    fn bkn_close(&mut self, span: Span);
}
