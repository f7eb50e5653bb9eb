#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures shared across the SABNF compilation pipeline.
//!
//! This crate holds the entities that outlive any single stage and that
//! more than one downstream crate needs: stable index newtypes for rules,
//! UDTs, and opcodes; the append-only string interner; and the grammar
//! source together with its line index. It owns no compilation logic — the
//! stages themselves (translator, analyzer, PPPT builder, emitter) live in
//! `sabnf-compiler`; the wire format lives in `sabnf-bytecode`.

mod ids;
mod interner;
mod span;

pub use ids::{OpId, RuleId, UdtId};
pub use interner::{Interner, Symbol};
pub use span::{Grammar, Line, LineEnding, LineIndex, SourceLocation, Span};
