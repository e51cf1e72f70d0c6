use std::fmt;

use serde::{Deserialize, Serialize};

use crate::token::{TokenKind, TokenSubkind};

pub type TranspileResult<T> = Result<T, TranspileError>;

/// The opening delimiter a closing token failed to match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    Paren,
    Function(String),
    /// A function close with no function open on the stack.
    UnopenedFunction,
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Paren => f.write_str("parenthesis"),
            Delimiter::Function(name) => write!(f, "function call `{name}(`"),
            Delimiter::UnopenedFunction => f.write_str("function close"),
        }
    }
}

/// Every way compiling a single formula can fail.
///
/// All variants are terminal for the formula being compiled; callers translating a whole sheet
/// may skip the offending formula and carry on with the rest.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranspileError {
    #[error("no cell info for coordinate {coordinate}")]
    UnresolvedReference { coordinate: String },

    #[error("malformed cell range `{range}`")]
    MalformedRange { range: String },

    #[error("unbalanced {delimiter}")]
    UnbalancedParenOrFunction { delimiter: Delimiter },

    #[error("`{symbol}` is missing an operand")]
    MissingOperand { symbol: String },

    #[error("expression reduced to {count} values, expected exactly one")]
    IncompleteReduction { count: usize },

    #[error("unknown operator `{symbol}`")]
    UnknownOperator { symbol: String },

    #[error("unexpected token {kind:?}/{subkind:?} `{value}`")]
    UnexpectedToken {
        kind: TokenKind,
        subkind: TokenSubkind,
        value: String,
    },

    #[error("invalid number literal `{0}`")]
    InvalidNumber(String),

    #[error("argument separator outside of a function call")]
    SeparatorOutsideCall,

    #[error("tokenize error at offset {offset}: {message}")]
    Tokenize { message: String, offset: usize },

    #[error("duplicate cell info for coordinate {coordinate}")]
    DuplicateCell { coordinate: String },

    #[error("conditional `{name}` nested inside an expression is not supported")]
    NestedConditional { name: String },

    #[error("conditional `{name}` takes 2 or 3 arguments, got {count}")]
    ConditionalArity { name: String, count: usize },

    #[error("`{name}` is not a valid Python identifier")]
    InvalidIdentifier { name: String },
}

impl TranspileError {
    pub(crate) fn missing_operand(symbol: impl Into<String>) -> Self {
        TranspileError::MissingOperand {
            symbol: symbol.into(),
        }
    }

    pub(crate) fn unbalanced_paren() -> Self {
        TranspileError::UnbalancedParenOrFunction {
            delimiter: Delimiter::Paren,
        }
    }

    pub(crate) fn tokenize(message: impl Into<String>, offset: usize) -> Self {
        TranspileError::Tokenize {
            message: message.into(),
            offset,
        }
    }
}
