#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! Spreadsheet formula to Python transpiler.
//!
//! A formula such as `=IF(B2>0, SIN(B3)*PI(), 0)` goes through four stages:
//!
//! 1. [`tokenize`] splits the text into typed [`Token`]s.
//! 2. [`parse`] runs an operator-precedence parser over the tokens. Cell references are resolved
//!    through a [`CellInfoTable`] into variables of a generated state container; ranges such as
//!    `A1:B3` expand to one variable per cell (see [`expand_range`]).
//! 3. [`Rewriter`] maps spreadsheet built-ins onto Python's `math` module and lowers `IF` into an
//!    `if`/`else` statement, driven by injectable [`RewriteRules`].
//! 4. [`codegen`] renders the tree as Python source, either per formula or as a whole class via
//!    [`generate_class`].
//!
//! [`compile_formula`] chains the first three stages. The library reports failures as
//! [`TranspileError`] and logs through the `log` facade without installing a logger.

pub mod ast;
pub mod cell_info;
pub mod codegen;
pub mod compile;
pub mod error;
pub mod naming;
pub mod operator;
pub mod parser;
pub mod range;
pub mod rewrite;
pub mod token;
pub mod tokenizer;

pub use ast::{Expr, IfStmt, Node, QualifiedName, Stmt};
pub use cell_info::{CellInfo, CellInfoTable, SheetCell};
pub use codegen::{
    generate_class, render_expr, render_node, CodegenOptions, FormulaFailure, GeneratedModule,
};
pub use compile::compile_formula;
pub use error::{Delimiter, TranspileError, TranspileResult};
pub use naming::make_variable_name;
pub use operator::{
    infix_operator, prefix_operator, Associativity, BinaryOp, CompareOp, OperatorDescriptor,
    OperatorKind, UnaryOp, OPERATORS,
};
pub use parser::parse;
pub use range::{column_to_letters, expand_range, letters_to_column, CellCoord, CellRangeIter};
pub use rewrite::{RewriteRules, Rewriter};
pub use token::{Token, TokenKind, TokenSubkind};
pub use tokenizer::tokenize;
