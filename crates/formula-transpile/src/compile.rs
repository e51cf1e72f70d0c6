use crate::ast::Node;
use crate::cell_info::CellInfoTable;
use crate::error::TranspileResult;
use crate::parser::parse;
use crate::rewrite::{RewriteRules, Rewriter};
use crate::tokenizer::tokenize;

/// Tokenize, parse and rewrite one formula (`=A1*2`) against the sheet's cell bindings.
///
/// Text without a leading `=` compiles to its literal value.
pub fn compile_formula(
    formula: &str,
    cells: &CellInfoTable,
    rules: &RewriteRules,
) -> TranspileResult<Node> {
    let tokens = tokenize(formula)?;
    let expr = parse(&tokens, cells)?;
    let node = Rewriter::new(rules).rewrite(expr.into());
    if log::log_enabled!(log::Level::Trace) {
        if let Ok(json) = node.to_json() {
            log::trace!("compiled `{formula}` to {json}");
        }
    }
    Ok(node)
}
