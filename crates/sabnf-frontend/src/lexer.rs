//! Token set for SABNF source text.
//!
//! Whitespace other than newlines, and `;`-to-end-of-line comments, are
//! trivia and never reach the parser. Newlines are kept: at paren/bracket
//! depth zero they terminate a rule's body, since this front-end does not
//! implement ABNF's indentation-continuation rule.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t]+|;[^\n]*")]
pub enum Token<'src> {
    #[token("=/")]
    IncrEquals,
    #[token("=")]
    Equals,
    #[token("/")]
    Slash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("&&")]
    AmpAmp,
    #[token("&")]
    Amp,
    #[token("!!")]
    BangBang,
    #[token("!")]
    Bang,
    #[token("^")]
    Caret,
    #[token("$")]
    Dollar,
    #[token("*")]
    Star,

    #[regex(r"[0-9]+")]
    Number(&'src str),

    #[regex(r#""[^"]*""#)]
    TlsString(&'src str),
    #[regex(r"'[^']*'")]
    TbsString(&'src str),
    #[regex(r"%[xXdDbB][0-9A-Fa-f]+(-[0-9A-Fa-f]+)?")]
    Numeric(&'src str),
    #[regex(r"\\%[iI]?")]
    BkrSigil(&'src str),

    #[regex(r"[A-Za-z][A-Za-z0-9_-]*")]
    Identifier(&'src str),

    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Newline,
}

/// Lex `src` into a flat token list with byte spans. Logos errors (bytes
/// matching no token) surface as a `lex_error` at the offending offset.
pub fn lex(src: &str) -> Result<Vec<(Token<'_>, usize, usize)>, usize> {
    let mut lexer = Token::lexer(src);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span.start, span.end - span.start)),
            Err(_) => return Err(span.start),
        }
    }
    Ok(tokens)
}
