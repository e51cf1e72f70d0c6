//! Fixed catalog of supported operators.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mult,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    LtE,
    Gt,
    GtE,
    Eq,
    NotEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorKind {
    Binary(BinaryOp),
    Unary(UnaryOp),
    Comparison(CompareOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatorDescriptor {
    pub symbol: &'static str,
    pub precedence: u8,
    pub associativity: Associativity,
    pub kind: OperatorKind,
}

impl OperatorDescriptor {
    const fn new(
        symbol: &'static str,
        precedence: u8,
        associativity: Associativity,
        kind: OperatorKind,
    ) -> Self {
        Self {
            symbol,
            precedence,
            associativity,
            kind,
        }
    }

    #[must_use]
    pub fn is_unary(&self) -> bool {
        matches!(self.kind, OperatorKind::Unary(_))
    }

    /// Whether an already-pending `top` operator must be reduced before `self` is pushed.
    #[must_use]
    pub fn yields_to(&self, top: &OperatorDescriptor) -> bool {
        top.precedence > self.precedence
            || (top.precedence == self.precedence && self.associativity == Associativity::Left)
    }
}

use Associativity::{Left, Right};

pub static OPERATORS: &[OperatorDescriptor] = &[
    OperatorDescriptor::new("<", 0, Left, OperatorKind::Comparison(CompareOp::Lt)),
    OperatorDescriptor::new("<=", 0, Left, OperatorKind::Comparison(CompareOp::LtE)),
    OperatorDescriptor::new(">", 0, Left, OperatorKind::Comparison(CompareOp::Gt)),
    OperatorDescriptor::new(">=", 0, Left, OperatorKind::Comparison(CompareOp::GtE)),
    OperatorDescriptor::new("=", 0, Left, OperatorKind::Comparison(CompareOp::Eq)),
    OperatorDescriptor::new("<>", 0, Left, OperatorKind::Comparison(CompareOp::NotEq)),
    OperatorDescriptor::new("+", 3, Left, OperatorKind::Binary(BinaryOp::Add)),
    OperatorDescriptor::new("-", 3, Left, OperatorKind::Binary(BinaryOp::Sub)),
    OperatorDescriptor::new("*", 5, Left, OperatorKind::Binary(BinaryOp::Mult)),
    OperatorDescriptor::new("/", 5, Left, OperatorKind::Binary(BinaryOp::Div)),
    OperatorDescriptor::new("^", 7, Right, OperatorKind::Binary(BinaryOp::Pow)),
    OperatorDescriptor::new("+", 10, Right, OperatorKind::Unary(UnaryOp::Plus)),
    OperatorDescriptor::new("-", 10, Right, OperatorKind::Unary(UnaryOp::Neg)),
];

/// Binary or comparison operator for an infix token.
#[must_use]
pub fn infix_operator(symbol: &str) -> Option<&'static OperatorDescriptor> {
    OPERATORS
        .iter()
        .find(|op| !op.is_unary() && op.symbol == symbol)
}

/// Unary operator for a prefix token. `+`/`-` resolve here instead of to their binary forms
/// because the token stream already classified them as prefix.
#[must_use]
pub fn prefix_operator(symbol: &str) -> Option<&'static OperatorDescriptor> {
    OPERATORS.iter().find(|op| op.is_unary() && op.symbol == symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn symbols_are_unique_per_position() {
        for (i, a) in OPERATORS.iter().enumerate() {
            for b in &OPERATORS[i + 1..] {
                assert!(
                    a.symbol != b.symbol || a.is_unary() != b.is_unary(),
                    "duplicate {} operator",
                    a.symbol
                );
            }
        }
    }

    #[test]
    fn plus_and_minus_resolve_by_position() {
        let minus = infix_operator("-").unwrap();
        assert_eq!(minus.kind, OperatorKind::Binary(BinaryOp::Sub));
        assert_eq!(minus.precedence, 3);

        let neg = prefix_operator("-").unwrap();
        assert_eq!(neg.kind, OperatorKind::Unary(UnaryOp::Neg));
        assert_eq!(neg.precedence, 10);
        assert_eq!(neg.associativity, Associativity::Right);
    }

    #[test]
    fn greater_equal_has_its_own_symbol() {
        assert_eq!(
            infix_operator(">=").unwrap().kind,
            OperatorKind::Comparison(CompareOp::GtE)
        );
        assert_eq!(
            infix_operator("<=").unwrap().kind,
            OperatorKind::Comparison(CompareOp::LtE)
        );
    }

    #[test]
    fn unsupported_symbols_are_absent() {
        assert!(infix_operator("&").is_none());
        assert!(prefix_operator("*").is_none());
        assert!(infix_operator("%").is_none());
    }

    #[test]
    fn reduction_rule_respects_associativity() {
        let add = infix_operator("+").unwrap();
        let sub = infix_operator("-").unwrap();
        let mul = infix_operator("*").unwrap();
        let pow = infix_operator("^").unwrap();
        let neg = prefix_operator("-").unwrap();

        assert!(sub.yields_to(add));
        assert!(add.yields_to(mul));
        assert!(!mul.yields_to(add));
        assert!(!pow.yields_to(pow));
        assert!(!neg.yields_to(neg));
        assert!(!neg.yields_to(mul));
    }
}
