//! Top-level error kinds (§7).
//!
//! Recoverable, per-item diagnostics are collected into a `Diagnostics` log;
//! a stage decides whether to raise one of these variants once it has
//! finished collecting. Only `Pppt`/`Emit`'s infrastructure failures and
//! `State` abort immediately without draining a log first.

use crate::diagnostics::Diagnostics;
use thiserror::Error;

/// A fatal failure building the PPPT (§4.4, §7): a protected-rules list
/// names an unknown rule, or the table itself would exceed the platform's
/// addressable size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PpptError(pub String);

/// Errors the compiler pipeline can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error("grammar contains {} invalid input character(s)", .0.len())]
    InputCharacter(Diagnostics),

    #[error("grammar contains {} semantic error(s)", .0.len())]
    Semantic(Diagnostics),

    #[error("grammar contains {} attribute error(s)", .0.len())]
    Attribute(Diagnostics),

    #[error(transparent)]
    Pppt(#[from] PpptError),

    #[error(transparent)]
    Emit(#[from] sabnf_bytecode::BytecodeError),

    #[error("stage {stage} requires {prerequisite} to have completed first")]
    State {
        stage: &'static str,
        prerequisite: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
