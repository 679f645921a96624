//! Combined rows and WHERE evaluation
//!
//! A combined row maps column identifiers to values. Each scanned table
//! contributes its primary key, its qualified `table.column` names and its
//! bare column names; tables later in the join overwrite bare names.

use crate::collections::ChainedHashMap;
use crate::sql::{Expr, Operand};

/// Column identifier -> value
pub type Row = ChainedHashMap<String, String>;

/// Identifier/value pairs contributed by one stored row.
///
/// `cells[0]` is the primary key, `cells[i + 1]` belongs to `columns[i]`.
/// Cells missing from a short line are left unbound.
pub fn bind_row(
    table: &str,
    pk_column: &str,
    columns: &[String],
    cells: &[String],
) -> Vec<(String, String)> {
    let mut bindings = Vec::with_capacity(columns.len() * 2 + 1);
    if let Some(pk) = cells.first() {
        bindings.push((pk_column.to_string(), pk.clone()));
    }
    for (column, value) in columns.iter().zip(cells.iter().skip(1)) {
        bindings.push((format!("{}.{}", table, column), value.clone()));
        bindings.push((column.clone(), value.clone()));
    }
    bindings
}

/// Value of an operand against a row.
///
/// Literals evaluate to their text; identifiers to their bound value, or to
/// their own text when the row has no such column.
pub fn resolve<'a>(operand: &'a Operand, row: &'a Row) -> &'a str {
    match operand {
        Operand::Literal(text) => text,
        Operand::Identifier(name) => row.get(name.as_str()).map_or(name.as_str(), String::as_str),
    }
}

/// Evaluate a WHERE expression. Both sides of AND/OR are always evaluated.
pub fn evaluate(expr: &Expr, row: &Row) -> bool {
    match expr {
        Expr::Or(left, right) => {
            let left = evaluate(left, row);
            let right = evaluate(right, row);
            left || right
        }
        Expr::And(left, right) => {
            let left = evaluate(left, row);
            let right = evaluate(right, row);
            left && right
        }
        Expr::Eq(lhs, rhs) => resolve(lhs, row) == resolve(rhs, row),
    }
}
