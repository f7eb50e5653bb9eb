//! SABNF compiler core: validates, translates, analyzes, and emits the
//! binary initialization image a runtime loads to execute a grammar.
//!
//! - `validate` - input byte/line-ending validation (§4.1)
//! - `translate` - syntax-event consumer building the grammar IR (§4.2)
//! - `syntax` - the `SyntaxConsumer` contract an external front-end drives
//! - `analyze` - dependency sets, recursive classification, attributes (§4.3)
//! - `pppt` - Partially-Predictive Parsing Table builder (§4.4)
//! - `emit` - bridges the IR to `sabnf-bytecode`'s wire-format sections (§4.5)
//! - `ir` - the translator's output types
//! - `diagnostics` - ordered per-stage diagnostic collection (§6.3)
//! - `session` - the owning `Session`/`SessionBuilder` API surface (§3.2, §5)
//!
//! This crate has no lexer or parser of its own: the concrete syntax of
//! SABNF source text is produced by a separate front-end crate driving
//! [`syntax::SyntaxConsumer`] (§4.2a).

pub mod analyze;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod ir;
pub mod pppt;
pub mod session;
pub mod syntax;
pub mod translate;
pub mod validate;

pub use diagnostics::{Diagnostics, DiagnosticEntry, DiagnosticsPrinter, Stage};
pub use error::{Error, PpptError, Result};
pub use session::{CompilerBuilder, Session, SessionBuilder};
pub use syntax::SyntaxConsumer;
pub use translate::Translator;
