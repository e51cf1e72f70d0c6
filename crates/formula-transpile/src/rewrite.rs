//! Rewriting parsed spreadsheet trees onto host-runtime (Python) equivalents.
//!
//! Two things happen here:
//! - known spreadsheet constants and functions are substituted with qualified module members
//!   (`PI()` -> `math.pi`, `SIN(x)` -> `math.sin(x)`);
//! - the conditional function (`IF`) is lowered into an `if`/`else` statement whose branches
//!   return the two values.
//!
//! Lowering turns an expression into a statement, so it only happens where a statement is legal:
//! at the root of a formula, or as a branch value of an enclosing lowered conditional. A
//! conditional nested anywhere else is left as a call and rejected by the code generator.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::ast::{CallExpr, Expr, IfStmt, Node, QualifiedName, Stmt};

/// Substitution tables driving a [`Rewriter`].
///
/// Keys are spreadsheet names and are matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteRules {
    pub constants: BTreeMap<String, QualifiedName>,
    pub functions: BTreeMap<String, QualifiedName>,
    /// Name of the `IF(test, then, else)` function lowered into a statement.
    pub conditional: String,
}

impl Default for RewriteRules {
    fn default() -> Self {
        Self::python_math()
    }
}

impl RewriteRules {
    /// Tables mapping spreadsheet math built-ins onto Python's `math` module.
    #[must_use]
    pub fn python_math() -> Self {
        let math = |member: &str| QualifiedName::new("math", member);

        let constants = BTreeMap::from([("PI".to_string(), math("pi"))]);
        let functions = [
            ("SIN", "sin"),
            ("COS", "cos"),
            ("TAN", "tan"),
            ("ASIN", "asin"),
            ("ACOS", "acos"),
            ("ATAN", "atan"),
            ("EXP", "exp"),
            ("LN", "log"),
            ("SQRT", "sqrt"),
            ("DEGREES", "degrees"),
            ("RADIANS", "radians"),
        ]
        .into_iter()
        .map(|(name, member)| (name.to_string(), math(member)))
        .collect();

        Self {
            constants,
            functions,
            conditional: "IF".to_string(),
        }
    }

    /// Process-wide builtin rules, built on first use.
    pub fn builtin() -> &'static RewriteRules {
        static BUILTIN: OnceLock<RewriteRules> = OnceLock::new();
        BUILTIN.get_or_init(RewriteRules::python_math)
    }

    /// Load rules from JSON. Missing fields fall back to [`RewriteRules::python_math`].
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        let mut rules: RewriteRules = serde_json::from_str(json)?;
        rules.normalize_keys();
        Ok(rules)
    }

    fn normalize_keys(&mut self) {
        let upper = |table: &mut BTreeMap<String, QualifiedName>| {
            *table = std::mem::take(table)
                .into_iter()
                .map(|(name, target)| (name.to_ascii_uppercase(), target))
                .collect();
        };
        upper(&mut self.constants);
        upper(&mut self.functions);
    }

    fn constant(&self, name: &str) -> Option<&QualifiedName> {
        self.constants.get(&name.to_ascii_uppercase())
    }

    fn function(&self, name: &str) -> Option<&QualifiedName> {
        self.functions.get(&name.to_ascii_uppercase())
    }

    fn is_conditional(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(&self.conditional)
    }
}

/// Post-order tree rewriter. Never fails: unknown names pass through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Rewriter<'r> {
    rules: &'r RewriteRules,
}

impl<'r> Rewriter<'r> {
    #[must_use]
    pub fn new(rules: &'r RewriteRules) -> Self {
        Self { rules }
    }

    /// Rewrite a tree. Idempotent: rewriting an already rewritten tree returns it unchanged.
    #[must_use]
    pub fn rewrite(&self, node: Node) -> Node {
        match node {
            Node::Expr(expr) => self.rewrite_root(expr),
            Node::Stmt(stmt) => self.rewrite_stmt(stmt).into(),
        }
    }

    /// Rewrite an expression in statement position, lowering it if it is a conditional.
    fn rewrite_root(&self, expr: Expr) -> Node {
        let expr = self.rewrite_expr(expr);
        self.lower_conditional(expr).map_or_else(Node::from, Node::from)
    }

    fn rewrite_stmt(&self, stmt: Stmt) -> Stmt {
        match stmt {
            Stmt::Return(expr) => match self.rewrite_root(expr) {
                Node::Expr(expr) => Stmt::Return(expr),
                Node::Stmt(stmt) => stmt,
            },
            Stmt::If(IfStmt { test, body, orelse }) => Stmt::If(IfStmt {
                test: self.rewrite_expr(test),
                body: Box::new(self.rewrite_stmt(*body)),
                orelse: Box::new(self.rewrite_stmt(*orelse)),
            }),
        }
    }

    /// Lower an already rewritten conditional call into an `if` statement; other expressions are
    /// handed back untouched.
    fn lower_conditional(&self, expr: Expr) -> Result<Stmt, Expr> {
        let is_conditional = expr
            .called_name()
            .is_some_and(|name| self.rules.is_conditional(name));
        let Expr::Call(CallExpr { callee, args }) = expr else {
            return Err(expr);
        };

        let mut parts = args.into_iter();
        match (is_conditional, parts.next(), parts.next(), parts.next(), parts.next()) {
            (true, Some(test), Some(then), otherwise, None) => {
                log::debug!("lowering conditional into an if statement");
                // Spreadsheet `IF(test, then)` evaluates to FALSE when the test fails.
                let otherwise = otherwise.unwrap_or(Expr::Boolean(false));
                Ok(Stmt::If(IfStmt {
                    test,
                    body: Box::new(self.branch(then)),
                    orelse: Box::new(self.branch(otherwise)),
                }))
            }
            (is_conditional, a, b, c, d) => {
                let args: Vec<Expr> = [a, b, c, d].into_iter().flatten().chain(parts).collect();
                if is_conditional {
                    log::warn!(
                        "leaving conditional with {} arguments as a plain call",
                        args.len()
                    );
                }
                Err(Expr::Call(CallExpr { callee, args }))
            }
        }
    }

    fn branch(&self, value: Expr) -> Stmt {
        self.lower_conditional(value).unwrap_or_else(Stmt::Return)
    }

    fn rewrite_expr(&self, expr: Expr) -> Expr {
        match expr {
            Expr::Name(name) => match self.rules.constant(&name) {
                Some(target) => Expr::Qualified(target.clone()),
                None => Expr::Name(name),
            },
            Expr::Call(CallExpr { callee, args }) => {
                let args = args.into_iter().map(|arg| self.rewrite_expr(arg)).collect();
                self.rewrite_call(*callee, args)
            }
            Expr::Unary(mut unary) => {
                *unary.operand = self.rewrite_expr(*unary.operand);
                Expr::Unary(unary)
            }
            Expr::Binary(mut binary) => {
                *binary.left = self.rewrite_expr(*binary.left);
                *binary.right = self.rewrite_expr(*binary.right);
                Expr::Binary(binary)
            }
            Expr::Compare(mut compare) => {
                *compare.left = self.rewrite_expr(*compare.left);
                *compare.right = self.rewrite_expr(*compare.right);
                Expr::Compare(compare)
            }
            leaf @ (Expr::Number(_)
            | Expr::Text(_)
            | Expr::Boolean(_)
            | Expr::Variable(_)
            | Expr::Qualified(_)) => leaf,
        }
    }

    /// Only calls of a bare identifier are candidates; qualified or variable callees are already
    /// in host form.
    fn rewrite_call(&self, callee: Expr, args: Vec<Expr>) -> Expr {
        let Expr::Name(name) = callee else {
            return Expr::call(callee, args);
        };

        if args.is_empty() {
            if let Some(target) = self.rules.constant(&name) {
                return Expr::Qualified(target.clone());
            }
        }
        if let Some(target) = self.rules.function(&name) {
            log::debug!("rewriting {name} -> {}.{}", target.module, target.member);
            return Expr::call(Expr::Qualified(target.clone()), args);
        }
        Expr::call(Expr::Name(name), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{BinaryOp, CompareOp};
    use pretty_assertions::assert_eq;

    fn rewrite(expr: Expr) -> Node {
        Rewriter::new(RewriteRules::builtin()).rewrite(Node::Expr(expr))
    }

    fn math(member: &str) -> Expr {
        Expr::Qualified(QualifiedName::new("math", member))
    }

    #[test]
    fn pi_becomes_module_constant() {
        let pi = Expr::call(Expr::name("PI"), vec![]);
        assert_eq!(rewrite(pi), Node::Expr(math("pi")));
        assert_eq!(rewrite(Expr::name("pi")), Node::Expr(math("pi")));
    }

    #[test]
    fn function_callee_is_replaced_and_args_kept() {
        let call = Expr::call(Expr::name("Sin"), vec![Expr::variable("angle")]);
        assert_eq!(
            rewrite(call),
            Node::Expr(Expr::call(math("sin"), vec![Expr::variable("angle")]))
        );
    }

    #[test]
    fn nested_calls_rewrite_inside_out() {
        let call = Expr::call(
            Expr::name("EXP"),
            vec![Expr::binary(
                Expr::call(Expr::name("PI"), vec![]),
                BinaryOp::Mult,
                Expr::call(Expr::name("COS"), vec![Expr::Number(0.0)]),
            )],
        );
        let expected = Expr::call(
            math("exp"),
            vec![Expr::binary(
                math("pi"),
                BinaryOp::Mult,
                Expr::call(math("cos"), vec![Expr::Number(0.0)]),
            )],
        );
        assert_eq!(rewrite(call), Node::Expr(expected));
    }

    #[test]
    fn unknown_and_variable_calls_pass_through() {
        let unknown = Expr::call(Expr::name("VLOOKUP"), vec![Expr::Number(1.0)]);
        assert_eq!(rewrite(unknown.clone()), Node::Expr(unknown));

        let formula_ref = Expr::call(Expr::variable("sin"), vec![]);
        assert_eq!(rewrite(formula_ref.clone()), Node::Expr(formula_ref));
    }

    #[test]
    fn constant_name_with_arguments_is_left_alone() {
        let call = Expr::call(Expr::name("PI"), vec![Expr::Number(2.0)]);
        assert_eq!(rewrite(call.clone()), Node::Expr(call));
    }

    #[test]
    fn conditional_lowers_to_statement() {
        let test = Expr::compare(Expr::variable("a"), CompareOp::Gt, Expr::Number(0.0));
        let call = Expr::call(
            Expr::name("IF"),
            vec![test.clone(), Expr::variable("b"), Expr::variable("c")],
        );
        assert_eq!(
            rewrite(call),
            Node::Stmt(Stmt::If(IfStmt {
                test,
                body: Box::new(Stmt::Return(Expr::variable("b"))),
                orelse: Box::new(Stmt::Return(Expr::variable("c"))),
            }))
        );
    }

    #[test]
    fn two_argument_conditional_returns_false_otherwise() {
        let call = Expr::call(
            Expr::name("if"),
            vec![Expr::Boolean(true), Expr::Number(1.0)],
        );
        let Node::Stmt(Stmt::If(lowered)) = rewrite(call) else {
            panic!("expected a lowered conditional");
        };
        assert_eq!(*lowered.orelse, Stmt::Return(Expr::Boolean(false)));
    }

    #[test]
    fn conditional_in_branch_nests_statements() {
        let inner = Expr::call(
            Expr::name("IF"),
            vec![Expr::variable("x"), Expr::Number(1.0), Expr::Number(2.0)],
        );
        let outer = Expr::call(
            Expr::name("IF"),
            vec![Expr::variable("y"), inner, Expr::Number(3.0)],
        );
        let Node::Stmt(Stmt::If(lowered)) = rewrite(outer) else {
            panic!("expected a lowered conditional");
        };
        assert!(matches!(*lowered.body, Stmt::If(_)));
        assert_eq!(*lowered.orelse, Stmt::Return(Expr::Number(3.0)));
    }

    #[test]
    fn conditional_inside_expression_stays_a_call() {
        let nested = Expr::binary(
            Expr::Number(1.0),
            BinaryOp::Add,
            Expr::call(
                Expr::name("IF"),
                vec![Expr::variable("x"), Expr::Number(1.0), Expr::Number(2.0)],
            ),
        );
        assert_eq!(rewrite(nested.clone()), Node::Expr(nested));
    }

    #[test]
    fn rules_load_from_json_with_defaults() {
        let rules = RewriteRules::from_json_str(
            r#"{"functions": {"abs": {"module": "builtins", "member": "abs"}}}"#,
        )
        .unwrap();
        assert_eq!(rules.conditional, "IF");
        assert!(rules.constants.contains_key("PI"));
        assert_eq!(
            rules.functions.get("ABS"),
            Some(&QualifiedName::new("builtins", "abs"))
        );
        assert!(!rules.functions.contains_key("SIN"));
    }

    fn arb_expr() -> impl proptest::strategy::Strategy<Value = Expr> {
        use proptest::prelude::*;

        let leaf = prop_oneof![
            (-1000i32..1000).prop_map(|n| Expr::Number(f64::from(n))),
            any::<bool>().prop_map(Expr::Boolean),
            prop::sample::select(vec!["PI", "pi", "rate", "E"]).prop_map(Expr::name),
            prop::sample::select(vec!["a", "b", "total"]).prop_map(Expr::variable),
        ];
        leaf.prop_recursive(4, 32, 3, |inner| {
            let names = prop::sample::select(vec!["IF", "SIN", "pi", "SUM", "exp"]);
            prop_oneof![
                (names, prop::collection::vec(inner.clone(), 0..4))
                    .prop_map(|(name, args)| Expr::call(Expr::name(name), args)),
                (inner.clone(), inner.clone())
                    .prop_map(|(l, r)| Expr::binary(l, BinaryOp::Add, r)),
                (inner.clone(), inner).prop_map(|(l, r)| Expr::compare(l, CompareOp::LtE, r)),
            ]
        })
    }

    proptest::proptest! {
        #[test]
        fn rewriting_is_idempotent(expr in arb_expr()) {
            let rewriter = Rewriter::new(RewriteRules::builtin());
            let once = rewriter.rewrite(Node::Expr(expr));
            let twice = rewriter.rewrite(once.clone());
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
