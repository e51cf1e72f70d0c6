//! Operator-precedence ("shunting yard") parser from [`Token`]s to an [`Expr`] tree.
//!
//! The parser keeps two stacks: completed subtrees (`output`) and pending markers (`ops`).
//! Spreadsheet-specific extensions on top of the textbook algorithm:
//! - function calls collect one argument per separator marker popped while unwinding to the
//!   function marker;
//! - a cell range operand pushes one variable per cell, joined by synthetic separator markers, so
//!   `SUM(A1:A3)` becomes a three-argument call;
//! - `+`/`-` are unary or binary depending on how the token stream classified them.

use crate::ast::Expr;
use crate::cell_info::{CellInfo, CellInfoTable};
use crate::error::{Delimiter, TranspileError, TranspileResult};
use crate::operator::{infix_operator, prefix_operator, OperatorDescriptor, OperatorKind};
use crate::range::expand_range;
use crate::token::{Token, TokenKind, TokenSubkind};

/// Parse one formula's tokens into a single expression tree.
///
/// Every cell coordinate referenced by the tokens must be present in `cells`.
pub fn parse(tokens: &[Token], cells: &CellInfoTable) -> TranspileResult<Expr> {
    ShuntingYard::new(tokens, cells).run()
}

#[derive(Debug)]
enum Pending {
    Operator(&'static OperatorDescriptor),
    Paren,
    /// `base` is the output depth at which this call's arguments start.
    Function { name: String, base: usize },
    Separator,
}

struct ShuntingYard<'a> {
    tokens: &'a [Token],
    cells: &'a CellInfoTable,
    output: Vec<Expr>,
    ops: Vec<Pending>,
    cursor: usize,
}

impl<'a> ShuntingYard<'a> {
    fn new(tokens: &'a [Token], cells: &'a CellInfoTable) -> Self {
        Self {
            tokens,
            cells,
            output: Vec::new(),
            ops: Vec::new(),
            cursor: 0,
        }
    }

    fn run(mut self) -> TranspileResult<Expr> {
        let tokens = self.tokens;
        while let Some(token) = tokens.get(self.cursor) {
            self.process(token)?;
            self.cursor += 1;
        }

        while let Some(pending) = self.ops.pop() {
            match pending {
                Pending::Operator(op) => self.apply(op)?,
                Pending::Paren => return Err(TranspileError::unbalanced_paren()),
                Pending::Function { name, .. } => {
                    return Err(TranspileError::UnbalancedParenOrFunction {
                        delimiter: Delimiter::Function(name),
                    })
                }
                // Leftover list separators (e.g. a bare `A1:A3`) leave extra values behind, which
                // is reported as an incomplete reduction below.
                Pending::Separator => {}
            }
        }

        if self.output.len() != 1 {
            return Err(TranspileError::IncompleteReduction {
                count: self.output.len(),
            });
        }
        let expr = self.output.pop().ok_or(TranspileError::IncompleteReduction { count: 0 })?;
        log::debug!("parsed {} tokens into {expr:?}", self.tokens.len());
        Ok(expr)
    }

    fn process(&mut self, token: &Token) -> TranspileResult<()> {
        match (token.kind, token.subkind) {
            (TokenKind::Literal, _) => self.output.push(literal(&token.value)),
            (TokenKind::Operand, _) => self.process_operand(token)?,
            (TokenKind::OpInfix, _) => {
                let op = infix_operator(&token.value).ok_or_else(|| unknown_operator(token))?;
                self.push_operator(op)?;
            }
            (TokenKind::OpPrefix, _) => {
                let op = prefix_operator(&token.value).ok_or_else(|| unknown_operator(token))?;
                self.push_operator(op)?;
            }
            (TokenKind::Paren, TokenSubkind::Open) => self.ops.push(Pending::Paren),
            (TokenKind::Paren, TokenSubkind::Close) => self.close_paren()?,
            (TokenKind::Func, TokenSubkind::Open) => self.open_function(token),
            (TokenKind::Func, TokenSubkind::Close) => self.close_function()?,
            (TokenKind::Sep, _) => self.ops.push(Pending::Separator),
            (TokenKind::Whitespace, _) => {}
            _ => return Err(unexpected(token)),
        }
        Ok(())
    }

    fn process_operand(&mut self, token: &Token) -> TranspileResult<()> {
        match token.subkind {
            TokenSubkind::Text => self.output.push(Expr::Text(unquote(&token.value))),
            TokenSubkind::Number => {
                let value = token
                    .value
                    .parse::<f64>()
                    .map_err(|_| TranspileError::InvalidNumber(token.value.clone()))?;
                self.output.push(Expr::Number(value));
            }
            TokenSubkind::Logical => self
                .output
                .push(Expr::Boolean(token.value.eq_ignore_ascii_case("TRUE"))),
            TokenSubkind::Range => {
                for (idx, coordinate) in expand_range(&token.value)?.enumerate() {
                    // One separator between consecutive cells; a range never leaves a trailing one.
                    if idx > 0 {
                        self.ops.push(Pending::Separator);
                    }
                    let info = self.cells.resolve(&coordinate)?;
                    self.output.push(variable(info));
                }
            }
            _ => return Err(unexpected(token)),
        }
        Ok(())
    }

    fn push_operator(&mut self, op: &'static OperatorDescriptor) -> TranspileResult<()> {
        while let Some(&Pending::Operator(top)) = self.ops.last() {
            if !op.yields_to(top) {
                break;
            }
            self.ops.pop();
            self.apply(top)?;
        }
        self.ops.push(Pending::Operator(op));
        Ok(())
    }

    fn apply(&mut self, op: &'static OperatorDescriptor) -> TranspileResult<()> {
        let node = match op.kind {
            OperatorKind::Unary(unary) => {
                let operand = self.pop_operand(op)?;
                Expr::unary(unary, operand)
            }
            OperatorKind::Binary(binary) => {
                let right = self.pop_operand(op)?;
                let left = self.pop_operand(op)?;
                Expr::binary(left, binary, right)
            }
            OperatorKind::Comparison(compare) => {
                let right = self.pop_operand(op)?;
                let left = self.pop_operand(op)?;
                Expr::compare(left, compare, right)
            }
        };
        self.output.push(node);
        Ok(())
    }

    /// Operands never come from below the innermost open call's argument base.
    fn pop_operand(&mut self, op: &OperatorDescriptor) -> TranspileResult<Expr> {
        let (floor, _) = self.innermost_call();
        if self.output.len() <= floor {
            return Err(TranspileError::missing_operand(op.symbol));
        }
        self.output
            .pop()
            .ok_or_else(|| TranspileError::missing_operand(op.symbol))
    }

    fn close_paren(&mut self) -> TranspileResult<()> {
        loop {
            match self.ops.pop() {
                Some(Pending::Operator(op)) => self.apply(op)?,
                Some(Pending::Paren) => return Ok(()),
                Some(Pending::Separator) => return Err(TranspileError::SeparatorOutsideCall),
                Some(Pending::Function { name, .. }) => {
                    return Err(TranspileError::UnbalancedParenOrFunction {
                        delimiter: Delimiter::Function(name),
                    })
                }
                None => return Err(TranspileError::unbalanced_paren()),
            }
        }
    }

    fn open_function(&mut self, token: &Token) {
        let name = token.func_name().to_string();

        let next = self.tokens[self.cursor + 1..]
            .iter()
            .position(|t| t.kind != TokenKind::Whitespace)
            .map(|offset| self.cursor + 1 + offset);
        if let Some(close_at) = next.filter(|&idx| self.tokens[idx].is_func_close()) {
            self.output.push(Expr::call(Expr::Name(name), Vec::new()));
            self.cursor = close_at;
            return;
        }

        self.ops.push(Pending::Function {
            name,
            base: self.output.len(),
        });
    }

    fn close_function(&mut self) -> TranspileResult<()> {
        let mut args = Vec::new();
        loop {
            match self.ops.pop() {
                Some(Pending::Operator(op)) => self.apply(op)?,
                Some(Pending::Separator) => {
                    let (floor, name) = self.innermost_call();
                    let name = name.unwrap_or_default().to_string();
                    args.push(self.pop_argument(floor, name)?);
                }
                Some(Pending::Function { name, base }) => {
                    let last = self.pop_argument(base, name.as_str())?;
                    args.push(last);
                    args.reverse();
                    self.output.push(Expr::call(Expr::Name(name), args));
                    return Ok(());
                }
                Some(Pending::Paren) => return Err(TranspileError::unbalanced_paren()),
                None => {
                    return Err(TranspileError::UnbalancedParenOrFunction {
                        delimiter: Delimiter::UnopenedFunction,
                    })
                }
            }
        }
    }

    /// Argument base and name of the innermost open function call, if any.
    fn innermost_call(&self) -> (usize, Option<&str>) {
        self.ops
            .iter()
            .rev()
            .find_map(|pending| match pending {
                Pending::Function { name, base } => Some((*base, Some(name.as_str()))),
                _ => None,
            })
            .unwrap_or((0, None))
    }

    fn pop_argument(&mut self, floor: usize, name: impl Into<String>) -> TranspileResult<Expr> {
        match self.output.pop() {
            Some(arg) if self.output.len() >= floor => Ok(arg),
            _ => Err(TranspileError::missing_operand(name)),
        }
    }
}

fn variable(info: &CellInfo) -> Expr {
    let var = Expr::variable(info.variable_name.as_str());
    if info.is_formula() {
        Expr::call(var, Vec::new())
    } else {
        var
    }
}

/// Non-formula cell content: numeric when it parses as a number, text otherwise.
fn literal(value: &str) -> Expr {
    match value.trim().parse::<f64>() {
        Ok(number) => Expr::Number(number),
        Err(_) => Expr::Text(value.to_string()),
    }
}

/// Strip the surrounding quotes of a text operand and collapse doubled quotes.
fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .map(|inner| inner.replace("\"\"", "\""))
        .unwrap_or_else(|| value.to_string())
}

fn unknown_operator(token: &Token) -> TranspileError {
    TranspileError::UnknownOperator {
        symbol: token.value.clone(),
    }
}

fn unexpected(token: &Token) -> TranspileError {
    TranspileError::UnexpectedToken {
        kind: token.kind,
        subkind: token.subkind,
        value: token.value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{BinaryOp, UnaryOp};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn num(n: f64) -> Expr {
        Expr::Number(n)
    }

    #[test]
    fn trailing_separator_of_single_cell_range_is_not_pushed() {
        let cells: CellInfoTable = vec![CellInfo::new("B2", "b", json!(1))]
            .into_iter()
            .collect();
        let tokens = vec![Token::operand_range("$B$2")];
        assert_eq!(parse(&tokens, &cells).unwrap(), Expr::variable("b"));
    }

    #[test]
    fn lowercase_single_reference_resolves() {
        let cells: CellInfoTable = vec![
            CellInfo::new("A1", "a", json!(1)),
            CellInfo::new("A2", "b", json!(2)),
        ]
        .into_iter()
        .collect();
        let tokens = vec![
            Token::operand_range("a1"),
            Token::infix("+"),
            Token::operand_number("1"),
        ];
        assert_eq!(
            parse(&tokens, &cells).unwrap(),
            Expr::binary(Expr::variable("a"), BinaryOp::Add, num(1.0))
        );

        let tokens = vec![
            Token::func_open("SUM("),
            Token::operand_range("$a$2"),
            Token::func_close(),
        ];
        assert_eq!(
            parse(&tokens, &cells).unwrap(),
            Expr::call(Expr::name("SUM"), vec![Expr::variable("b")])
        );
    }

    #[test]
    fn leftover_values_are_an_incomplete_reduction() {
        let cells: CellInfoTable = vec![
            CellInfo::new("A1", "a", json!(1)),
            CellInfo::new("A2", "b", json!(2)),
        ]
        .into_iter()
        .collect();
        let juxtaposed = vec![
            Token::operand_number("1"),
            Token::whitespace(" "),
            Token::operand_number("2"),
        ];
        assert_eq!(
            parse(&juxtaposed, &cells).unwrap_err(),
            TranspileError::IncompleteReduction { count: 2 }
        );
        assert_eq!(
            parse(&[Token::operand_range("A1:A2")], &cells).unwrap_err(),
            TranspileError::IncompleteReduction { count: 2 }
        );
        assert_eq!(
            parse(&[], &cells).unwrap_err(),
            TranspileError::IncompleteReduction { count: 0 }
        );
        assert_eq!(
            parse(&[Token::paren_open(), Token::paren_close()], &cells).unwrap_err(),
            TranspileError::IncompleteReduction { count: 0 }
        );
    }

    #[test]
    fn empty_call_lookahead_skips_whitespace() {
        let tokens = vec![
            Token::func_open("NOW("),
            Token::whitespace(" "),
            Token::func_close(),
            Token::infix("+"),
            Token::operand_number("1"),
        ];
        assert_eq!(
            parse(&tokens, &CellInfoTable::new()).unwrap(),
            Expr::binary(Expr::call(Expr::name("NOW"), vec![]), BinaryOp::Add, num(1.0))
        );
    }

    #[test]
    fn empty_argument_slot_does_not_steal_enclosing_operand() {
        // `1+SUM(,2)`: the first argument slot is empty.
        let tokens = vec![
            Token::operand_number("1"),
            Token::infix("+"),
            Token::func_open("SUM("),
            Token::arg_sep(),
            Token::operand_number("2"),
            Token::func_close(),
        ];
        assert_eq!(
            parse(&tokens, &CellInfoTable::new()).unwrap_err(),
            TranspileError::MissingOperand {
                symbol: "SUM".to_string()
            }
        );
    }

    #[test]
    fn operator_missing_operand() {
        let tokens = vec![Token::operand_number("1"), Token::infix("*")];
        assert_eq!(
            parse(&tokens, &CellInfoTable::new()).unwrap_err(),
            TranspileError::MissingOperand {
                symbol: "*".to_string()
            }
        );
    }

    #[test]
    fn text_operands_are_unquoted() {
        let tokens = vec![Token::operand_text(r#""a ""b""""#)];
        assert_eq!(
            parse(&tokens, &CellInfoTable::new()).unwrap(),
            Expr::Text(r#"a "b""#.to_string())
        );
    }

    #[test]
    fn literal_token_prefers_numbers() {
        let cells = CellInfoTable::new();
        assert_eq!(parse(&[Token::literal("2.5")], &cells).unwrap(), num(2.5));
        assert_eq!(
            parse(&[Token::literal("n/a")], &cells).unwrap(),
            Expr::Text("n/a".to_string())
        );
    }

    #[test]
    fn prefix_binds_tighter_than_power() {
        let tokens = vec![
            Token::prefix("-"),
            Token::operand_number("2"),
            Token::infix("^"),
            Token::operand_number("2"),
        ];
        assert_eq!(
            parse(&tokens, &CellInfoTable::new()).unwrap(),
            Expr::binary(Expr::unary(UnaryOp::Neg, num(2.0)), BinaryOp::Pow, num(2.0))
        );
    }

    #[test]
    fn unsupported_token_shapes_are_rejected() {
        let cells = CellInfoTable::new();
        let postfix = Token::new(TokenKind::OpPostfix, TokenSubkind::None, "%");
        assert!(matches!(
            parse(&[Token::operand_number("5"), postfix], &cells),
            Err(TranspileError::UnexpectedToken { .. })
        ));
        assert_eq!(
            parse(
                &[Token::operand_number("1"), Token::infix("&"), Token::operand_number("2")],
                &cells
            )
            .unwrap_err(),
            TranspileError::UnknownOperator {
                symbol: "&".to_string()
            }
        );
    }

    #[test]
    fn close_function_without_open() {
        assert_eq!(
            parse(&[Token::operand_number("1"), Token::func_close()], &CellInfoTable::new())
                .unwrap_err(),
            TranspileError::UnbalancedParenOrFunction {
                delimiter: Delimiter::UnopenedFunction
            }
        );
    }
}
