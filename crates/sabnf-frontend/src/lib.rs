//! Standalone SABNF lexer/parser (§4.2a).
//!
//! Architecturally separate from `sabnf-compiler`: this crate only knows
//! how to turn source bytes into calls against
//! [`sabnf_compiler::syntax::SyntaxConsumer`]. It never touches the IR,
//! the PPPT builder, or the image emitter directly, and it carries its
//! own error type rather than reusing the compiler's `Diagnostics`.

mod lexer;
mod parser;

pub use parser::{parse_into, SyntaxError};
