//! Recursive-descent SABNF parser driving a `SyntaxConsumer` directly,
//! with no intermediate tree (§4.2a).
//!
//! Concrete grammar this front-end accepts (not part of the core's
//! contract — any producer emitting the same consumer calls is equally
//! valid):
//!
//! ```text
//! rulelist      = *(rule / blank-line)
//! rule          = identifier ("=" / "=/") alternation newline
//! alternation   = concatenation *("/" concatenation)
//! concatenation = 1*element
//! element       = ("&&" / "&" / "!!" / "!") element / repetition
//! repetition    = [repeat-count] primary
//! repeat-count  = number ["*" [number]] / "*" [number]
//! primary       = "(" alternation ")" / "[" alternation "]" / tls-string /
//!                 tbs-string / numeric-terminal / back-reference /
//!                 "^" / "$" / identifier
//! ```
//!
//! An identifier primary beginning with `u_` or `e_` is a UDT reference
//! (`may_empty` from the `e_` prefix); any other identifier is a rule
//! reference.

use sabnf_bytecode::{BkrCase, BkrMode};
use sabnf_compiler::syntax::SyntaxConsumer;
use sabnf_core::Span;
use thiserror::Error;

use crate::lexer::{lex, Token};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at byte {offset}: {message}")]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Lex and parse `src`, driving every event into `consumer`.
pub fn parse_into(src: &str, consumer: &mut impl SyntaxConsumer) -> Result<(), SyntaxError> {
    let tokens = lex(src).map_err(|offset| SyntaxError::new("unrecognized character", offset))?;
    Parser {
        tokens,
        pos: 0,
        depth: 0,
        consumer,
    }
    .parse()
}

struct Parser<'src, 'c, C: SyntaxConsumer> {
    tokens: Vec<(Token<'src>, usize, usize)>,
    pos: usize,
    depth: u32,
    consumer: &'c mut C,
}

impl<'src, 'c, C: SyntaxConsumer> Parser<'src, 'c, C> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(t, _, _)| t)
    }

    fn offset_here(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|&(_, start, _)| start)
            .unwrap_or_else(|| self.tokens.last().map(|&(_, s, l)| s + l).unwrap_or(0))
    }

    fn span_here(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(&(_, start, len)) => Span::new(start as u32, len as u32),
            None => Span::new(self.offset_here() as u32, 0),
        }
    }

    fn advance(&mut self) -> Option<(Token<'src>, usize, usize)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Some(Token::Newline)) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> Result<(), SyntaxError> {
        self.skip_newlines();
        while self.peek().is_some() {
            self.parse_rule()?;
            self.skip_newlines();
        }
        Ok(())
    }

    fn parse_rule(&mut self) -> Result<(), SyntaxError> {
        let (name, span) = match self.advance() {
            Some((Token::Identifier(name), start, len)) => (name.to_string(), Span::new(start as u32, len as u32)),
            other => {
                return Err(SyntaxError::new(
                    "expected a rule name",
                    other.map(|(_, s, _)| s).unwrap_or_else(|| self.offset_here()),
                ))
            }
        };
        let incremental = match self.advance() {
            Some((Token::Equals, _, _)) => false,
            Some((Token::IncrEquals, _, _)) => true,
            other => {
                return Err(SyntaxError::new(
                    format!("expected '=' or '=/' after rule name {name:?}"),
                    other.map(|(_, s, _)| s).unwrap_or_else(|| self.offset_here()),
                ))
            }
        };

        self.consumer.rule_open(&name, span);
        if incremental {
            self.consumer.incremental_alt(span);
        }
        self.parse_alternation()?;
        self.consumer.rule_close(span);

        match self.peek() {
            Some(Token::Newline) | None => {
                self.advance();
                Ok(())
            }
            _ => Err(SyntaxError::new(
                "expected end of line after a rule body",
                self.offset_here(),
            )),
        }
    }

    fn parse_alternation(&mut self) -> Result<(), SyntaxError> {
        let span = self.span_here();
        self.consumer.alt_open(span);
        self.parse_concatenation()?;
        while matches!(self.peek(), Some(Token::Slash)) {
            self.advance();
            if self.depth > 0 {
                self.skip_newlines();
            }
            self.parse_concatenation()?;
        }
        self.consumer.alt_close(span);
        Ok(())
    }

    fn parse_concatenation(&mut self) -> Result<(), SyntaxError> {
        let span = self.span_here();
        self.consumer.cat_open(span);
        let mut count = 0;
        while self.at_element_start() {
            self.parse_element()?;
            count += 1;
        }
        if count == 0 {
            return Err(SyntaxError::new("expected at least one element", self.offset_here()));
        }
        self.consumer.cat_close(span);
        Ok(())
    }

    fn at_element_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::LParen
                    | Token::LBracket
                    | Token::TlsString(_)
                    | Token::TbsString(_)
                    | Token::Numeric(_)
                    | Token::BkrSigil(_)
                    | Token::Identifier(_)
                    | Token::Caret
                    | Token::Dollar
                    | Token::Amp
                    | Token::AmpAmp
                    | Token::Bang
                    | Token::BangBang
                    | Token::Number(_)
            )
        )
    }

    fn parse_element(&mut self) -> Result<(), SyntaxError> {
        match self.peek() {
            Some(Token::AmpAmp) => {
                let span = self.span_here();
                self.advance();
                self.consumer.bka_open(span);
                self.parse_element()?;
                self.consumer.bka_close(span);
                Ok(())
            }
            Some(Token::Amp) => {
                let span = self.span_here();
                self.advance();
                self.consumer.and_open(span);
                self.parse_element()?;
                self.consumer.and_close(span);
                Ok(())
            }
            Some(Token::BangBang) => {
                let span = self.span_here();
                self.advance();
                self.consumer.bkn_open(span);
                self.parse_element()?;
                self.consumer.bkn_close(span);
                Ok(())
            }
            Some(Token::Bang) => {
                let span = self.span_here();
                self.advance();
                self.consumer.not_open(span);
                self.parse_element()?;
                self.consumer.not_close(span);
                Ok(())
            }
            _ => self.parse_repetition(),
        }
    }

    fn parse_repetition(&mut self) -> Result<(), SyntaxError> {
        let span = self.span_here();
        match self.try_parse_repeat() {
            Some((min, max)) => {
                self.consumer.rep_open(min, max, span);
                self.parse_primary()?;
                self.consumer.rep_close(span);
            }
            None => self.parse_primary()?,
        }
        Ok(())
    }

    fn try_parse_repeat(&mut self) -> Option<(u64, u64)> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let n: u64 = n.parse().unwrap_or(0);
                if matches!(self.peek_at(1), Some(Token::Star)) {
                    self.advance();
                    self.advance();
                    if let Some(Token::Number(m)) = self.peek() {
                        let m: u64 = m.parse().unwrap_or(0);
                        self.advance();
                        Some((n, m))
                    } else {
                        Some((n, u64::MAX))
                    }
                } else {
                    self.advance();
                    Some((n, n))
                }
            }
            Some(Token::Star) => {
                self.advance();
                if let Some(Token::Number(m)) = self.peek() {
                    let m: u64 = m.parse().unwrap_or(0);
                    self.advance();
                    Some((0, m))
                } else {
                    Some((0, u64::MAX))
                }
            }
            _ => None,
        }
    }

    fn parse_primary(&mut self) -> Result<(), SyntaxError> {
        let (tok, start, len) = self
            .advance()
            .ok_or_else(|| SyntaxError::new("expected an element", self.offset_here()))?;
        let span = Span::new(start as u32, len as u32);

        match tok {
            Token::LParen => {
                self.depth += 1;
                self.skip_newlines();
                self.parse_alternation()?;
                self.skip_newlines();
                self.depth -= 1;
                self.expect_rparen()?;
                Ok(())
            }
            Token::LBracket => {
                self.depth += 1;
                self.consumer.option_open(span);
                self.skip_newlines();
                self.parse_alternation()?;
                self.skip_newlines();
                self.depth -= 1;
                self.expect_rbracket()?;
                self.consumer.option_close(span);
                Ok(())
            }
            Token::TlsString(text) => {
                self.consumer.tls_string(&text[1..text.len() - 1], span);
                Ok(())
            }
            Token::TbsString(text) => {
                self.consumer.tbs_string(text[1..text.len() - 1].as_bytes(), span);
                Ok(())
            }
            Token::Numeric(text) => {
                self.parse_numeric(text, span);
                Ok(())
            }
            Token::BkrSigil(sigil) => {
                let insensitive = sigil.len() > 2;
                let (name, name_span) = self.expect_identifier()?;
                let case = if insensitive { BkrCase::Insensitive } else { BkrCase::Sensitive };
                self.consumer.bkr(&name, case, BkrMode::Universal, name_span);
                Ok(())
            }
            Token::Caret => {
                self.consumer.anchor_begin(span);
                Ok(())
            }
            Token::Dollar => {
                self.consumer.anchor_end(span);
                Ok(())
            }
            Token::Identifier(name) => {
                if let Some(may_empty) = udt_may_empty(name) {
                    self.consumer.udt(name, may_empty, span);
                } else {
                    self.consumer.rnm(name, span);
                }
                Ok(())
            }
            other => Err(SyntaxError::new(format!("unexpected token {other:?}"), start)),
        }
    }

    fn parse_numeric(&mut self, text: &str, span: Span) {
        let radix = match text.as_bytes()[1].to_ascii_lowercase() {
            b'x' => 16,
            b'b' => 2,
            _ => 10,
        };
        let rest = &text[2..];
        if let Some((lo, hi)) = rest.split_once('-') {
            let min = u64::from_str_radix(lo, radix).unwrap_or(0);
            let max = u64::from_str_radix(hi, radix).unwrap_or(min);
            self.consumer.trg(min, max, span);
        } else {
            let value = u64::from_str_radix(rest, radix).unwrap_or(0);
            if value <= u8::MAX as u64 {
                self.consumer.tbs_string(&[value as u8], span);
            } else {
                self.consumer.trg(value, value, span);
            }
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, Span), SyntaxError> {
        match self.advance() {
            Some((Token::Identifier(name), start, len)) => Ok((name.to_string(), Span::new(start as u32, len as u32))),
            other => Err(SyntaxError::new(
                "expected a name",
                other.map(|(_, s, _)| s).unwrap_or_else(|| self.offset_here()),
            )),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), SyntaxError> {
        match self.advance() {
            Some((Token::RParen, _, _)) => Ok(()),
            other => Err(SyntaxError::new(
                "expected ')'",
                other.map(|(_, s, _)| s).unwrap_or_else(|| self.offset_here()),
            )),
        }
    }

    fn expect_rbracket(&mut self) -> Result<(), SyntaxError> {
        match self.advance() {
            Some((Token::RBracket, _, _)) => Ok(()),
            other => Err(SyntaxError::new(
                "expected ']'",
                other.map(|(_, s, _)| s).unwrap_or_else(|| self.offset_here()),
            )),
        }
    }
}

/// `None` for a plain rule reference; `Some(may_empty)` for a UDT
/// reference, derived from the `u_`/`e_` naming convention (§3.1).
fn udt_may_empty(name: &str) -> Option<bool> {
    if name.starts_with("e_") {
        Some(true)
    } else if name.starts_with("u_") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sabnf_compiler::ir::OpKind;
    use sabnf_compiler::translate::Translator;

    fn grammar() -> sabnf_core::Grammar {
        sabnf_compiler::validate::validate(b"x\r\n", true).unwrap()
    }

    #[test]
    fn parses_a_trivial_literal_rule() {
        let g = grammar();
        let mut t = Translator::new(&g);
        parse_into("S = \"abc\"\n", &mut t).unwrap();
        let ir = t.finish().unwrap();
        let s = ir.find_rule("S").unwrap();
        let root = ir.rule(s).root();
        assert!(matches!(&ir.op(root).kind, OpKind::Tls(text) if text == "abc"));
    }

    #[test]
    fn parses_alternation_and_concatenation() {
        let g = grammar();
        let mut t = Translator::new(&g);
        parse_into("S = \"a\" \"b\" / \"c\"\n", &mut t).unwrap();
        let ir = t.finish().unwrap();
        let s = ir.find_rule("S").unwrap();
        let root = ir.rule(s).root();
        match &ir.op(root).kind {
            OpKind::Alt(children) => assert_eq!(children.len(), 2),
            other => panic!("expected a top-level Alt, got {other:?}"),
        }
    }

    #[test]
    fn parses_repetition_and_option_sugar() {
        let g = grammar();
        let mut t = Translator::new(&g);
        parse_into("S = 2*3\"a\" [\"b\"]\n", &mut t).unwrap();
        let ir = t.finish().unwrap();
        assert!(ir.find_rule("S").is_some());
    }

    #[test]
    fn parses_incremental_alternative_across_two_definitions() {
        let g = grammar();
        let mut t = Translator::new(&g);
        parse_into("R = \"a\"\nR =/ \"b\"\n", &mut t).unwrap();
        let ir = t.finish().unwrap();
        assert_eq!(ir.rules.len(), 1);
        let r = ir.find_rule("R").unwrap();
        let root = ir.rule(r).root();
        assert!(matches!(&ir.op(root).kind, OpKind::Alt(children) if children.len() == 2));
    }

    #[test]
    fn parses_a_udt_reference_by_naming_convention() {
        let g = grammar();
        let mut t = Translator::new(&g);
        parse_into("S = e_custom\n", &mut t).unwrap();
        let ir = t.finish().unwrap();
        let s = ir.find_rule("S").unwrap();
        let root = ir.rule(s).root();
        assert!(matches!(&ir.op(root).kind, OpKind::Udt(_)));
    }

    #[test]
    fn unterminated_group_is_a_syntax_error() {
        let g = grammar();
        let mut t = Translator::new(&g);
        let err = parse_into("S = (\"a\"\n", &mut t).unwrap_err();
        assert!(err.message.contains(')'));
    }
}
