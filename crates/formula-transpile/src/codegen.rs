//! Python source emission for compiled formulas and whole sheets.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ast::{CallExpr, Expr, IfStmt, Node, Stmt};
use crate::cell_info::{CellInfo, CellInfoTable};
use crate::compile::compile_formula;
use crate::error::{TranspileError, TranspileResult};
use crate::naming::is_identifier;
use crate::operator::{BinaryOp, CompareOp, UnaryOp};
use crate::rewrite::RewriteRules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    /// Name of the state container parameter (`self.rate`).
    pub receiver: String,
    /// One level of indentation.
    pub indent: String,
    pub class_name: String,
    /// Conditional function name; a call of it left inside an expression cannot be emitted.
    pub conditional: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            receiver: "self".to_string(),
            indent: "    ".to_string(),
            class_name: "Sheet".to_string(),
            conditional: "IF".to_string(),
        }
    }
}

/// Cell left out of the generated class, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaFailure {
    pub coordinate: String,
    pub error: TranspileError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedModule {
    pub source: String,
    pub failures: Vec<FormulaFailure>,
}

impl GeneratedModule {
    /// True when every formula cell made it into the generated class.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Python binding strength, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Compare,
    Additive,
    Multiplicative,
    Unary,
    Power,
    Atom,
}

impl Prec {
    fn next(self) -> Prec {
        match self {
            Prec::Compare => Prec::Additive,
            Prec::Additive => Prec::Multiplicative,
            Prec::Multiplicative => Prec::Unary,
            Prec::Unary => Prec::Power,
            Prec::Power | Prec::Atom => Prec::Atom,
        }
    }
}

struct Emitter<'o> {
    options: &'o CodegenOptions,
}

impl Emitter<'_> {
    fn expr(&self, expr: &Expr, min: Prec) -> TranspileResult<String> {
        let (text, prec) = match expr {
            Expr::Number(n) => {
                let prec = if n.is_sign_negative() && *n != 0.0 {
                    Prec::Unary
                } else {
                    Prec::Atom
                };
                (python_number(*n), prec)
            }
            Expr::Text(s) => (python_string(s), Prec::Atom),
            Expr::Boolean(b) => (python_bool(*b).to_string(), Prec::Atom),
            Expr::Name(name) => (name.clone(), Prec::Atom),
            Expr::Variable(name) => {
                let name = checked_identifier(name)?;
                (format!("{}.{name}", self.options.receiver), Prec::Atom)
            }
            Expr::Qualified(q) => (format!("{}.{}", q.module, q.member), Prec::Atom),
            Expr::Call(call) => {
                if let Some(name) = expr.called_name() {
                    if name.eq_ignore_ascii_case(&self.options.conditional) {
                        return Err(misplaced_conditional(name, call.args.len()));
                    }
                }
                (self.call(call)?, Prec::Atom)
            }
            Expr::Unary(unary) => {
                let sign = match unary.op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Neg => "-",
                };
                let operand = self.expr(&unary.operand, Prec::Unary)?;
                (format!("{sign}{operand}"), Prec::Unary)
            }
            Expr::Binary(binary) => {
                let (symbol, prec) = match binary.op {
                    BinaryOp::Add => ("+", Prec::Additive),
                    BinaryOp::Sub => ("-", Prec::Additive),
                    BinaryOp::Mult => ("*", Prec::Multiplicative),
                    BinaryOp::Div => ("/", Prec::Multiplicative),
                    BinaryOp::Pow => ("**", Prec::Power),
                };
                // `**` is right-associative and its left operand binds tighter than a sign.
                let (left_min, right_min) = if prec == Prec::Power {
                    (Prec::Atom, Prec::Unary)
                } else {
                    (prec, prec.next())
                };
                let left = self.expr(&binary.left, left_min)?;
                let right = self.expr(&binary.right, right_min)?;
                (format!("{left} {symbol} {right}"), prec)
            }
            Expr::Compare(compare) => {
                let symbol = match compare.op {
                    CompareOp::Lt => "<",
                    CompareOp::LtE => "<=",
                    CompareOp::Gt => ">",
                    CompareOp::GtE => ">=",
                    CompareOp::Eq => "==",
                    CompareOp::NotEq => "!=",
                };
                // Python chains `a < b < c`; nested comparisons keep their parentheses.
                let left = self.expr(&compare.left, Prec::Additive)?;
                let right = self.expr(&compare.right, Prec::Additive)?;
                (format!("{left} {symbol} {right}"), Prec::Compare)
            }
        };

        Ok(if prec < min { format!("({text})") } else { text })
    }

    fn call(&self, call: &CallExpr) -> TranspileResult<String> {
        let callee = self.expr(&call.callee, Prec::Atom)?;
        let args = call
            .args
            .iter()
            .map(|arg| self.expr(arg, Prec::Compare))
            .collect::<TranspileResult<Vec<_>>>()?;
        Ok(format!("{callee}({})", args.join(", ")))
    }

    fn stmt(&self, stmt: &Stmt, depth: usize, out: &mut String) -> TranspileResult<()> {
        let pad = self.options.indent.repeat(depth);
        match stmt {
            Stmt::Return(expr) => {
                let _ = writeln!(out, "{pad}return {}", self.expr(expr, Prec::Compare)?);
            }
            Stmt::If(if_stmt) => {
                let _ = writeln!(out, "{pad}if {}:", self.expr(&if_stmt.test, Prec::Compare)?);
                self.stmt(&if_stmt.body, depth + 1, out)?;
                self.orelse(if_stmt, depth, out)?;
            }
        }
        Ok(())
    }

    /// `else: if ...` chains collapse into `elif`.
    fn orelse(&self, if_stmt: &IfStmt, depth: usize, out: &mut String) -> TranspileResult<()> {
        let pad = self.options.indent.repeat(depth);
        match if_stmt.orelse.as_ref() {
            Stmt::If(next) => {
                let _ = writeln!(out, "{pad}elif {}:", self.expr(&next.test, Prec::Compare)?);
                self.stmt(&next.body, depth + 1, out)?;
                self.orelse(next, depth, out)
            }
            other => {
                let _ = writeln!(out, "{pad}else:");
                self.stmt(other, depth + 1, out)
            }
        }
    }
}

/// A conditional the rewriter could not lower: either its arity is wrong, or it sits inside an
/// expression where no statement can go.
fn misplaced_conditional(name: &str, count: usize) -> TranspileError {
    let name = name.to_string();
    if matches!(count, 2 | 3) {
        TranspileError::NestedConditional { name }
    } else {
        TranspileError::ConditionalArity { name, count }
    }
}

fn checked_identifier(name: &str) -> TranspileResult<&str> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(TranspileError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// Python source for a single expression.
pub fn render_expr(expr: &Expr, options: &CodegenOptions) -> TranspileResult<String> {
    Emitter { options }.expr(expr, Prec::Compare)
}

/// Python source for a compiled formula.
///
/// An expression renders as its bare source; a statement renders as a block at indentation depth
/// zero, one statement per line.
pub fn render_node(node: &Node, options: &CodegenOptions) -> TranspileResult<String> {
    match node {
        Node::Expr(expr) => render_expr(expr, options),
        Node::Stmt(stmt) => {
            let mut out = String::new();
            Emitter { options }.stmt(stmt, 0, &mut out)?;
            Ok(out)
        }
    }
}

/// Generate a Python module with one class holding the whole sheet.
///
/// Constant cells become attributes assigned in `__init__`, formula cells become methods. Cells whose
/// name is not a Python identifier, and formulas that fail to compile, are left out and reported in
/// [`GeneratedModule::failures`].
pub fn generate_class(
    cells: &CellInfoTable,
    rules: &RewriteRules,
    options: &CodegenOptions,
) -> GeneratedModule {
    let options = CodegenOptions {
        conditional: rules.conditional.clone(),
        ..options.clone()
    };
    let emitter = Emitter { options: &options };
    let indent = options.indent.as_str();
    let receiver = options.receiver.as_str();

    let mut names = BTreeSet::new();
    for info in cells.iter() {
        if !names.insert(info.variable_name.as_str()) {
            log::warn!(
                "{} reuses variable name `{}`",
                info.coordinate,
                info.variable_name
            );
        }
    }

    let mut source = String::from("import math\n\n\n");
    let _ = writeln!(source, "class {}:", options.class_name);
    let _ = writeln!(source, "{indent}def __init__({receiver}):");

    let mut failures = Vec::new();
    let mut assignments = Vec::new();
    for info in cells.iter().filter(|info| !info.is_formula()) {
        match checked_identifier(&info.variable_name) {
            Ok(name) => assignments.push(format!(
                "{indent}{indent}{receiver}.{name} = {}",
                python_value(&info.value)
            )),
            Err(error) => skip(&mut failures, info, error),
        }
    }
    if assignments.is_empty() {
        let _ = writeln!(source, "{indent}{indent}pass");
    }
    for line in assignments {
        let _ = writeln!(source, "{line}");
    }

    for info in cells.iter() {
        let Some(formula) = info.formula() else {
            continue;
        };
        let mut body = String::new();
        let emitted = checked_identifier(&info.variable_name)
            .and_then(|_| compile_formula(formula, cells, rules))
            .and_then(|node| {
                let stmt = match node {
                    Node::Expr(expr) => Stmt::Return(expr),
                    Node::Stmt(stmt) => stmt,
                };
                emitter.stmt(&stmt, 2, &mut body)
            });
        match emitted {
            Ok(()) => {
                let _ = writeln!(source);
                let _ = writeln!(source, "{indent}def {}({receiver}):", info.variable_name);
                source.push_str(&body);
            }
            Err(error) => skip(&mut failures, info, error),
        }
    }

    GeneratedModule { source, failures }
}

fn skip(failures: &mut Vec<FormulaFailure>, info: &CellInfo, error: TranspileError) {
    log::warn!("skipping {} `{}`: {error}", info.coordinate, info.value);
    failures.push(FormulaFailure {
        coordinate: info.coordinate.clone(),
        error,
    });
}

fn python_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

fn python_number(n: f64) -> String {
    if n.is_nan() {
        return "math.nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "math.inf" } else { "-math.inf" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        // Integral and small enough to print exactly without an exponent.
        return format!("{}", n as i64);
    }
    format!("{n:?}")
}

fn python_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn python_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "None".to_string(),
        JsonValue::Bool(b) => python_bool(*b).to_string(),
        JsonValue::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (None, Some(u), _) => u.to_string(),
            (None, None, Some(f)) => python_number(f),
            (None, None, None) => n.to_string(),
        },
        JsonValue::String(s) => python_string(s),
        JsonValue::Array(items) => {
            let items: Vec<String> = items.iter().map(python_value).collect();
            format!("[{}]", items.join(", "))
        }
        JsonValue::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", python_string(k), python_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}
