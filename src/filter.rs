//! Filter expression trees and RFC 9535 comparison semantics.

use std::fmt;

use itertools::Itertools;
use serde_json::{Number, Value};

use crate::{
    function::{FunctionExpr, JSONPathValue, SingularQueryExpr},
    query::Query,
};

/// One or more and-expressions joined by `||`. Truthy when any of them is.
#[derive(Debug, Clone)]
pub struct LogicalOr(pub Vec<LogicalAnd>);

impl LogicalOr {
    pub fn test_filter(&self, current: &Value, root: &Value) -> bool {
        self.0.iter().any(|expr| expr.test_filter(current, root))
    }
}

impl fmt::Display for LogicalOr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(" || "))
    }
}

/// One or more basic expressions joined by `&&`. Truthy when all are.
#[derive(Debug, Clone)]
pub struct LogicalAnd(pub Vec<BasicExpr>);

impl LogicalAnd {
    pub fn test_filter(&self, current: &Value, root: &Value) -> bool {
        self.0.iter().all(|expr| expr.test_filter(current, root))
    }
}

impl fmt::Display for LogicalAnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(" && "))
    }
}

#[derive(Debug, Clone)]
pub enum BasicExpr {
    /// A parenthesized expression.
    Paren(LogicalOr),
    /// A parenthesized expression preceded by `!`.
    NotParen(LogicalOr),
    /// Truthy when the embedded query selects at least one node.
    Exist(Query),
    /// Truthy when the embedded query selects no nodes.
    NotExist(Query),
    Comparison(ComparisonExpr),
    /// A call to a function whose declared result is `LogicalType`.
    FuncCall(FunctionExpr),
    NotFuncCall(FunctionExpr),
}

impl BasicExpr {
    pub fn test_filter(&self, current: &Value, root: &Value) -> bool {
        match self {
            BasicExpr::Paren(expr) => expr.test_filter(current, root),
            BasicExpr::NotParen(expr) => !expr.test_filter(current, root),
            BasicExpr::Exist(query) => !query.select(current, root).is_empty(),
            BasicExpr::NotExist(query) => query.select(current, root).is_empty(),
            BasicExpr::Comparison(expr) => expr.test_filter(current, root),
            BasicExpr::FuncCall(function) => function.execute(current, root).is_truthy(),
            BasicExpr::NotFuncCall(function) => !function.execute(current, root).is_truthy(),
        }
    }
}

impl fmt::Display for BasicExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasicExpr::Paren(expr) => write!(f, "({})", expr),
            BasicExpr::NotParen(expr) => write!(f, "!({})", expr),
            BasicExpr::Exist(query) => write!(f, "{}", query),
            BasicExpr::NotExist(query) => write!(f, "!{}", query),
            BasicExpr::Comparison(expr) => write!(f, "{}", expr),
            BasicExpr::FuncCall(function) => write!(f, "{}", function),
            BasicExpr::NotFuncCall(function) => write!(f, "!{}", function),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompOp::Eq => f.write_str("=="),
            CompOp::Ne => f.write_str("!="),
            CompOp::Lt => f.write_str("<"),
            CompOp::Le => f.write_str("<="),
            CompOp::Gt => f.write_str(">"),
            CompOp::Ge => f.write_str(">="),
        }
    }
}

/// A comparable value: a literal, a singular query, or a call to a
/// function whose declared result is `ValueType`.
#[derive(Debug, Clone)]
pub enum CompVal {
    Literal(Value),
    SingularQuery(SingularQueryExpr),
    FuncCall(FunctionExpr),
}

impl CompVal {
    pub fn as_value<'a>(&'a self, current: &'a Value, root: &'a Value) -> JSONPathValue<'a> {
        match self {
            CompVal::Literal(value) => JSONPathValue::Value(std::borrow::Cow::Borrowed(value)),
            CompVal::SingularQuery(query) => query.evaluate(current, root),
            CompVal::FuncCall(function) => function.execute(current, root),
        }
    }
}

impl fmt::Display for CompVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompVal::Literal(value) => write_json_value(value, f),
            CompVal::SingularQuery(query) => write!(f, "{}", query),
            CompVal::FuncCall(function) => write!(f, "{}", function),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonExpr {
    pub left: CompVal,
    pub op: CompOp,
    pub right: CompVal,
}

impl ComparisonExpr {
    pub fn new(left: CompVal, op: CompOp, right: CompVal) -> Self {
        ComparisonExpr { left, op, right }
    }

    pub fn test_filter(&self, current: &Value, root: &Value) -> bool {
        let left = self.left.as_value(current, root);
        let right = self.right.as_value(current, root);
        match self.op {
            CompOp::Eq => equal_to(&left, &right),
            CompOp::Ne => !equal_to(&left, &right),
            CompOp::Lt => less_than(&left, &right),
            CompOp::Gt => less_than(&right, &left),
            CompOp::Le => less_than(&left, &right) || equal_to(&left, &right),
            CompOp::Ge => less_than(&right, &left) || equal_to(&left, &right),
        }
    }
}

impl fmt::Display for ComparisonExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

fn equal_to(left: &JSONPathValue, right: &JSONPathValue) -> bool {
    match (left, right) {
        (JSONPathValue::Nothing, JSONPathValue::Nothing) => true,
        (JSONPathValue::Value(left), JSONPathValue::Value(right)) => value_equal_to(left, right),
        _ => false,
    }
}

fn less_than(left: &JSONPathValue, right: &JSONPathValue) -> bool {
    match (left, right) {
        (JSONPathValue::Value(left), JSONPathValue::Value(right)) => value_less_than(left, right),
        _ => false,
    }
}

/// Deep equality over JSON values, comparing numbers by numeric value
/// across integer and float representations.
pub fn value_equal_to(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => number_equal_to(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left.iter().zip(right).all(|(l, r)| value_equal_to(l, r))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(k, l)| right.get(k).is_some_and(|r| value_equal_to(l, r)))
        }
        _ => left == right,
    }
}

/// True when both values are numbers in numeric order, or both are
/// strings in code point order. Everything else is unordered.
pub fn value_less_than(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => number_less_than(left, right),
        (Value::String(left), Value::String(right)) => left < right,
        _ => false,
    }
}

fn number_equal_to(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        left == right
    } else if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        left == right
    } else if let (Some(left), Some(right)) = (left.as_f64(), right.as_f64()) {
        left == right
    } else {
        false
    }
}

fn number_less_than(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        left < right
    } else if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        left < right
    } else if let (Some(left), Some(right)) = (left.as_f64(), right.as_f64()) {
        left < right
    } else {
        false
    }
}

pub(crate) fn write_json_value(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match serde_json::to_string(value) {
        Ok(rendered) => f.write_str(&rendered),
        Err(_) => Err(fmt::Error),
    }
}

pub(crate) fn write_json_string(value: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match serde_json::to_string(value) {
        Ok(rendered) => f.write_str(&rendered),
        Err(_) => Err(fmt::Error),
    }
}
