//! Formula text -> [`Token`] stream.
//!
//! This is a small tokenizer covering the shapes the parser understands (plus a few it rejects
//! later, such as array constants and `%`). It does not validate nesting; unbalanced parentheses
//! are reported by the parser.

use crate::error::{TranspileError, TranspileResult};
use crate::token::{Token, TokenKind, TokenSubkind};

const ERROR_LITERALS: &[&str] = &[
    "#NULL!",
    "#DIV/0!",
    "#VALUE!",
    "#REF!",
    "#NAME?",
    "#NUM!",
    "#N/A",
    "#GETTING_DATA",
];

/// Tokenize cell content.
///
/// Content without a leading `=` is not a formula and becomes a single [`TokenKind::Literal`]
/// token (or no tokens at all when empty).
pub fn tokenize(formula: &str) -> TranspileResult<Vec<Token>> {
    let Some(body) = formula.strip_prefix('=') else {
        if formula.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![Token::literal(formula)]);
    };
    Lexer::new(body, 1).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Paren,
    Func,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    /// Offset of `src` inside the original formula, for error positions.
    base: usize,
    groups: Vec<Group>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, base: usize) -> Self {
        Self {
            src,
            pos: 0,
            base,
            groups: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> TranspileResult<Vec<Token>> {
        while let Some(ch) = self.peek() {
            match ch {
                c if c.is_whitespace() => {
                    let ws = self.take_while(char::is_whitespace);
                    self.push(TokenKind::Whitespace, TokenSubkind::None, ws);
                }
                '"' => self.lex_string()?,
                '#' => self.lex_error_literal()?,
                c if c.is_ascii_digit() || (c == '.' && self.peek_nth_is_digit(1)) => {
                    self.lex_number()
                }
                c if c.is_alphabetic() || matches!(c, '_' | '$' | '\\' | '\'') => {
                    self.lex_operand()?
                }
                '(' => {
                    self.bump();
                    self.groups.push(Group::Paren);
                    self.push(TokenKind::Paren, TokenSubkind::Open, "(");
                }
                ')' => {
                    self.bump();
                    let kind = match self.groups.pop() {
                        Some(Group::Func) => TokenKind::Func,
                        Some(Group::Paren) | None => TokenKind::Paren,
                    };
                    self.push(kind, TokenSubkind::Close, ")");
                }
                '{' => {
                    self.bump();
                    self.push(TokenKind::Array, TokenSubkind::Open, "{");
                }
                '}' => {
                    self.bump();
                    self.push(TokenKind::Array, TokenSubkind::Close, "}");
                }
                ',' => {
                    self.bump();
                    self.push(TokenKind::Sep, TokenSubkind::Arg, ",");
                }
                ';' => {
                    self.bump();
                    self.push(TokenKind::Sep, TokenSubkind::Row, ";");
                }
                '%' => {
                    self.bump();
                    self.push(TokenKind::OpPostfix, TokenSubkind::None, "%");
                }
                '+' | '-' => {
                    self.bump();
                    let kind = if self.prev_allows_prefix() {
                        TokenKind::OpPrefix
                    } else {
                        TokenKind::OpInfix
                    };
                    self.push(kind, TokenSubkind::None, ch.to_string());
                }
                '<' | '>' => {
                    self.bump();
                    let mut symbol = ch.to_string();
                    if let Some(next @ ('=' | '>')) = self.peek() {
                        if ch == '<' || next == '=' {
                            self.bump();
                            symbol.push(next);
                        }
                    }
                    self.push(TokenKind::OpInfix, TokenSubkind::None, symbol);
                }
                '*' | '/' | '^' | '&' | '=' => {
                    self.bump();
                    self.push(TokenKind::OpInfix, TokenSubkind::None, ch.to_string());
                }
                other => {
                    return Err(TranspileError::tokenize(
                        format!("unexpected character `{other}`"),
                        self.offset(),
                    ))
                }
            }
        }
        Ok(self.tokens)
    }

    fn lex_string(&mut self) -> TranspileResult<()> {
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                }
                Some('"') => break,
                Some(_) => {}
                None => {
                    return Err(TranspileError::tokenize(
                        "unterminated string literal",
                        self.base + start,
                    ))
                }
            }
        }
        let src = self.src;
        self.push(TokenKind::Operand, TokenSubkind::Text, &src[start..self.pos]);
        Ok(())
    }

    fn lex_error_literal(&mut self) -> TranspileResult<()> {
        let rest = &self.src[self.pos..];
        let Some(literal) = ERROR_LITERALS.iter().find(|lit| {
            rest.get(..lit.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(lit))
        })
        else {
            return Err(TranspileError::tokenize(
                "unknown error literal",
                self.offset(),
            ));
        };
        self.pos += literal.len();
        self.push(TokenKind::Operand, TokenSubkind::Error, *literal);
        Ok(())
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit() || c == '.');
        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_digits_at = match self.peek_nth(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek_nth_is_digit(exponent_digits_at) {
                for _ in 0..exponent_digits_at {
                    self.bump();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
        }
        let src = self.src;
        self.push(TokenKind::Operand, TokenSubkind::Number, &src[start..self.pos]);
    }

    /// Cell references, ranges, sheet-qualified references, names, booleans and function opens.
    fn lex_operand(&mut self) -> TranspileResult<()> {
        let start = self.pos;
        loop {
            match self.peek() {
                Some('\'') => {
                    let quote_at = self.pos;
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('\'') if self.peek() == Some('\'') => {
                                self.bump();
                            }
                            Some('\'') => break,
                            Some(_) => {}
                            None => {
                                return Err(TranspileError::tokenize(
                                    "unterminated quoted sheet name",
                                    self.base + quote_at,
                                ))
                            }
                        }
                    }
                }
                Some(c) if c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | ':' | '!' | '\\') => {
                    self.bump();
                }
                _ => break,
            }
        }
        let src = self.src;
        let word = &src[start..self.pos];

        if self.peek() == Some('(') {
            self.bump();
            self.groups.push(Group::Func);
            self.push(TokenKind::Func, TokenSubkind::Open, format!("{word}("));
        } else if word.eq_ignore_ascii_case("TRUE") || word.eq_ignore_ascii_case("FALSE") {
            self.push(TokenKind::Operand, TokenSubkind::Logical, word.to_ascii_uppercase());
        } else {
            self.push(TokenKind::Operand, TokenSubkind::Range, word);
        }
        Ok(())
    }

    /// `+`/`-` are prefix operators unless they follow a value.
    fn prev_allows_prefix(&self) -> bool {
        let prev = self
            .tokens
            .iter()
            .rev()
            .find(|t| t.kind != TokenKind::Whitespace);
        match prev {
            None => true,
            Some(t) => match t.kind {
                TokenKind::OpInfix | TokenKind::OpPrefix | TokenKind::Sep => true,
                TokenKind::Paren | TokenKind::Func | TokenKind::Array => {
                    t.subkind == TokenSubkind::Open
                }
                TokenKind::Literal
                | TokenKind::Operand
                | TokenKind::OpPostfix
                | TokenKind::Whitespace => false,
            },
        }
    }

    fn push(&mut self, kind: TokenKind, subkind: TokenSubkind, value: impl Into<String>) {
        self.tokens.push(Token::new(kind, subkind, value));
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn peek_nth_is_digit(&self, n: usize) -> bool {
        self.peek_nth(n).is_some_and(|c| c.is_ascii_digit())
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn take_while<F>(&mut self, pred: F) -> &'a str
    where
        F: Fn(char) -> bool,
    {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &src[start..self.pos]
    }
}
