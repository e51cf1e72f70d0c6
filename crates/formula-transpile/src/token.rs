//! Flat formula token stream consumed by the parser.
//!
//! The shape mirrors what spreadsheet formula tokenizers conventionally emit: every token has a
//! coarse [`TokenKind`], a [`TokenSubkind`] refining it, and the raw source text in `value`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// The whole input when it is not a formula (no leading `=`).
    Literal,
    Operand,
    /// Function open (`SUM(`) or close (`)`).
    Func,
    /// Array constant braces (`{` / `}`).
    Array,
    Paren,
    Sep,
    OpPrefix,
    OpInfix,
    OpPostfix,
    Whitespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenSubkind {
    None,
    Text,
    Number,
    Logical,
    Error,
    /// A cell coordinate, a `A1:B9` range, or a defined name.
    Range,
    Open,
    Close,
    Arg,
    Row,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub subkind: TokenSubkind,
    pub value: String,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, subkind: TokenSubkind, value: impl Into<String>) -> Self {
        Self {
            kind,
            subkind,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Literal, TokenSubkind::None, value)
    }

    #[must_use]
    pub fn operand_number(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Operand, TokenSubkind::Number, value)
    }

    /// A text operand. `value` is the quoted source form, e.g. `"a ""b"""`.
    #[must_use]
    pub fn operand_text(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Operand, TokenSubkind::Text, value)
    }

    #[must_use]
    pub fn operand_range(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Operand, TokenSubkind::Range, value)
    }

    #[must_use]
    pub fn infix(symbol: impl Into<String>) -> Self {
        Self::new(TokenKind::OpInfix, TokenSubkind::None, symbol)
    }

    #[must_use]
    pub fn prefix(symbol: impl Into<String>) -> Self {
        Self::new(TokenKind::OpPrefix, TokenSubkind::None, symbol)
    }

    /// Function open token; `value` keeps the trailing `(` (e.g. `SUM(`).
    #[must_use]
    pub fn func_open(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Func, TokenSubkind::Open, value)
    }

    #[must_use]
    pub fn func_close() -> Self {
        Self::new(TokenKind::Func, TokenSubkind::Close, ")")
    }

    #[must_use]
    pub fn paren_open() -> Self {
        Self::new(TokenKind::Paren, TokenSubkind::Open, "(")
    }

    #[must_use]
    pub fn paren_close() -> Self {
        Self::new(TokenKind::Paren, TokenSubkind::Close, ")")
    }

    #[must_use]
    pub fn arg_sep() -> Self {
        Self::new(TokenKind::Sep, TokenSubkind::Arg, ",")
    }

    #[must_use]
    pub fn whitespace(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Whitespace, TokenSubkind::None, value)
    }

    #[must_use]
    pub fn is_func_close(&self) -> bool {
        self.kind == TokenKind::Func && self.subkind == TokenSubkind::Close
    }

    /// Function name of a function-open token, without the trailing `(`.
    #[must_use]
    pub fn func_name(&self) -> &str {
        self.value.strip_suffix('(').unwrap_or(&self.value)
    }
}
