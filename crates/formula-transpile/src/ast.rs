use serde::{Deserialize, Serialize};

use crate::operator::{BinaryOp, CompareOp, UnaryOp};

/// Value-shaped tree node produced by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Bare identifier, e.g. a spreadsheet function name before rewriting.
    Name(String),
    /// Field of the generated state container bound to a cell.
    Variable(String),
    /// Member of a host-runtime module, e.g. `math.sin`.
    Qualified(QualifiedName),
    Call(CallExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Compare(CompareExpr),
}

impl Expr {
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    #[must_use]
    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call(CallExpr {
            callee: Box::new(callee),
            args,
        })
    }

    #[must_use]
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
        })
    }

    #[must_use]
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary(BinaryExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    #[must_use]
    pub fn compare(left: Expr, op: CompareOp, right: Expr) -> Self {
        Expr::Compare(CompareExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    /// Name of the called bare identifier, if this is a call of one.
    #[must_use]
    pub fn called_name(&self) -> Option<&str> {
        match self {
            Expr::Call(call) => match call.callee.as_ref() {
                Expr::Name(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub module: String,
    pub member: String,
}

impl QualifiedName {
    #[must_use]
    pub fn new(module: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            member: member.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareExpr {
    pub left: Box<Expr>,
    pub op: CompareOp,
    pub right: Box<Expr>,
}

/// Statement-shaped node. Only produced by lowering a conditional call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Return(Expr),
    If(IfStmt),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub test: Expr,
    pub body: Box<Stmt>,
    pub orelse: Box<Stmt>,
}

/// Root of a compiled formula: a plain expression, or a statement when a conditional was lowered.
///
/// A `Stmt` root can only be placed where a statement is legal (typically as a whole function
/// body), never nested inside another expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Expr(Expr),
    Stmt(Stmt),
}

impl Node {
    #[must_use]
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Node::Expr(expr) => Some(expr),
            Node::Stmt(_) => None,
        }
    }

    #[must_use]
    pub fn as_stmt(&self) -> Option<&Stmt> {
        match self {
            Node::Stmt(stmt) => Some(stmt),
            Node::Expr(_) => None,
        }
    }

    /// Stable JSON serialization useful for debugging/tests.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<Expr> for Node {
    fn from(expr: Expr) -> Self {
        Node::Expr(expr)
    }
}

impl From<Stmt> for Node {
    fn from(stmt: Stmt) -> Self {
        Node::Stmt(stmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lowered() -> Node {
        Stmt::If(IfStmt {
            test: Expr::compare(Expr::variable("rate"), CompareOp::Gt, Expr::Number(0.5)),
            body: Box::new(Stmt::Return(Expr::call(
                Expr::Qualified(QualifiedName::new("math", "sin")),
                vec![Expr::unary(UnaryOp::Neg, Expr::variable("angle"))],
            ))),
            orelse: Box::new(Stmt::Return(Expr::binary(
                Expr::Text("n/a".to_string()),
                BinaryOp::Add,
                Expr::Boolean(false),
            ))),
        })
        .into()
    }

    #[test]
    fn json_reads_back_as_the_same_tree() {
        for node in [lowered(), Node::from(Expr::call(Expr::name("FOO"), vec![]))] {
            let json = node.to_json().unwrap();
            let back: Node = serde_json::from_str(&json).unwrap();
            assert_eq!(back, node);
        }
    }

    #[test]
    fn root_accessors_pick_one_family() {
        let expr = Node::from(Expr::variable("rate"));
        assert_eq!(expr.as_expr(), Some(&Expr::variable("rate")));
        assert_eq!(expr.as_stmt(), None);

        let stmt = lowered();
        assert_eq!(stmt.as_expr(), None);
        assert!(matches!(stmt.as_stmt(), Some(Stmt::If(_))));
    }

    #[test]
    fn called_name_only_for_plain_name_callees() {
        assert_eq!(Expr::call(Expr::name("IF"), vec![]).called_name(), Some("IF"));
        assert_eq!(Expr::call(Expr::variable("total"), vec![]).called_name(), None);
        assert_eq!(Expr::name("IF").called_name(), None);
    }
}
