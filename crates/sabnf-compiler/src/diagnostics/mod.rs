//! Compiler diagnostics infrastructure (§6.3, §7).
//!
//! Diagnostics are collected per stage, in source order, and never
//! interleaved with diagnostics from a different stage. A stage decides
//! whether to raise its hard error after draining whatever it collected.

mod collection;
mod message;
mod printer;

pub use collection::Diagnostics;
pub use message::{DiagnosticEntry, Stage};
pub use printer::DiagnosticsPrinter;
