//! Translation of parsed filter expressions into query DSL trees.

use serde_json::{Number, Value};

use super::parser::{BinaryOp, Expr, Literal};
use crate::dsl::{Query, QueryStringQuery, RangeBounds};
use crate::errors::FilterError;

const STARTS_WITH: &str = "startsWith";
const CONTAINS: &str = "contains";
const NESTED_FILTER: &str = "nestedFilter";

/// Characters with special meaning in the engine's query-string syntax.
const QUERY_STRING_RESERVED: &[char] = &[
    '-', '=', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
    '/',
];

/// One side of a comparison.
enum Operand {
    /// A field reference, fully qualified with the nesting prefix.
    Field { path: String, raw: String },
    Value(Value),
}

/// Translate `expr` into a query. Field references are qualified with `prefix`,
/// which is empty at the top level and `path.` inside `nestedFilter`.
pub fn translate(expr: &Expr, prefix: &str) -> Result<Query, FilterError> {
    match expr {
        Expr::Binary { op, lhs, rhs } => match op {
            BinaryOp::And => Ok(Query::must(vec![
                translate(lhs, prefix)?,
                translate(rhs, prefix)?,
            ])),
            BinaryOp::Or => Ok(Query::should(vec![
                translate(lhs, prefix)?,
                translate(rhs, prefix)?,
            ])),
            comparison => compare(*comparison, lhs, rhs, prefix),
        },
        Expr::Call {
            target,
            function,
            args,
        } => call(target.as_deref(), function, args, prefix),
        _ => Err(FilterError::unsupported(
            "filter must be a comparison, a logical expression or a function call",
        )),
    }
}

fn compare(op: BinaryOp, lhs: &Expr, rhs: &Expr, prefix: &str) -> Result<Query, FilterError> {
    let (field, value, op) = match (operand(lhs, prefix)?, operand(rhs, prefix)?) {
        (Operand::Field { path, .. }, Operand::Value(value)) => (path, value, op),
        (Operand::Field { path, .. }, Operand::Field { raw, .. }) => (path, Value::String(raw), op),
        (Operand::Value(value), Operand::Field { path, .. }) => (path, value, flip(op)),
        (Operand::Value(_), Operand::Value(_)) => {
            return Err(FilterError::unsupported(
                "comparison requires a field reference on at least one side",
            ))
        }
    };

    let mut bounds = RangeBounds::default();
    match op {
        BinaryOp::Eq => return Ok(Query::term(field, value)),
        BinaryOp::Ne => return Ok(Query::must_not(vec![Query::term(field, value)])),
        BinaryOp::Lt => bounds.lt = Some(value),
        BinaryOp::Le => bounds.lte = Some(value),
        BinaryOp::Gt => bounds.gt = Some(value),
        BinaryOp::Ge => bounds.gte = Some(value),
        BinaryOp::And | BinaryOp::Or => {
            return Err(FilterError::unsupported("logical operator used as comparison"))
        }
    }
    Ok(Query::range(field, bounds))
}

/// Mirror a comparison so that the field moves to the left-hand side.
fn flip(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::Le => BinaryOp::Ge,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::Ge => BinaryOp::Le,
        other => other,
    }
}

fn call(
    target: Option<&Expr>,
    function: &str,
    args: &[Expr],
    prefix: &str,
) -> Result<Query, FilterError> {
    match (function, target, args) {
        (STARTS_WITH, Some(target), [arg]) => {
            Ok(Query::prefix(field_of(target, prefix)?, string_of(arg, function)?))
        }
        (CONTAINS, Some(target), [arg]) => Ok(Query::QueryString(QueryStringQuery {
            default_field: field_of(target, prefix)?,
            query: format!("*{}*", escape_query_string(&string_of(arg, function)?)),
        })),
        (NESTED_FILTER, Some(target), [inner]) => nested(field_of(target, prefix)?, inner),
        (NESTED_FILTER, None, [path, inner]) => {
            let path = match path {
                Expr::Literal(Literal::String(value)) => format!("{}{}", prefix, value),
                other => field_of(other, prefix)?,
            };
            nested(path, inner)
        }
        (STARTS_WITH | CONTAINS | NESTED_FILTER, _, _) => Err(FilterError::unsupported(format!(
            "wrong number of arguments to {}",
            function
        ))),
        _ => Err(FilterError::unsupported(format!(
            "unknown function {}",
            function
        ))),
    }
}

fn nested(path: String, inner: &Expr) -> Result<Query, FilterError> {
    let inner_prefix = format!("{}.", path);
    Ok(Query::nested(path, translate(inner, &inner_prefix)?))
}

fn operand(expr: &Expr, prefix: &str) -> Result<Operand, FilterError> {
    if let Some(raw) = field_path(expr) {
        return Ok(Operand::Field {
            path: format!("{}{}", prefix, raw),
            raw,
        });
    }
    match expr {
        Expr::Literal(literal) => Ok(Operand::Value(literal_value(literal)?)),
        _ => Err(FilterError::unsupported(
            "comparison operands must be fields or literals",
        )),
    }
}

/// Dotted path of an identifier or field selection, without the nesting prefix.
fn field_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(name) => Some(name.clone()),
        Expr::Select { operand, field } => {
            field_path(operand).map(|parent| format!("{}.{}", parent, field))
        }
        _ => None,
    }
}

fn field_of(expr: &Expr, prefix: &str) -> Result<String, FilterError> {
    field_path(expr)
        .map(|path| format!("{}{}", prefix, path))
        .ok_or_else(|| FilterError::unsupported("function receiver must be a field"))
}

fn string_of(expr: &Expr, function: &str) -> Result<String, FilterError> {
    match expr {
        Expr::Literal(Literal::String(value)) => Ok(value.clone()),
        _ => Err(FilterError::unsupported(format!(
            "{} expects a string argument",
            function
        ))),
    }
}

fn literal_value(literal: &Literal) -> Result<Value, FilterError> {
    Ok(match literal {
        Literal::String(value) => Value::String(value.clone()),
        Literal::Int(value) => Value::from(*value),
        Literal::UInt(value) => Value::from(*value),
        Literal::Bool(value) => Value::Bool(*value),
        Literal::Double(value) => Number::from_f64(*value)
            .map(Value::Number)
            .ok_or_else(|| FilterError::unsupported("number is not finite"))?,
    })
}

/// Escape query-string reserved characters with a backslash.
pub fn escape_query_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if QUERY_STRING_RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
