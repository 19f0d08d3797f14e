//! The JSONPath type system and function extensions.
//!
//! RFC 9535 defines three declared types for expression results —
//! [`PathType::Value`], [`PathType::Logical`] and [`PathType::Nodes`] —
//! and classifies every function argument as one of five kinds
//! ([`FuncType`]). Whether an argument kind is acceptable for a declared
//! parameter type is settled at parse time by [`FuncType::converts_to`].
//!
//! Function extensions live in a process-wide registry. [`register`] a
//! [`FunctionExtension`] implementation to make it available to
//! subsequently parsed queries; the standard `length`, `count`, `value`,
//! `match` and `search` functions are pre-registered.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};

use itertools::Itertools;
use lazy_static::lazy_static;
use lru::LruCache;
use regex::Regex;
use serde_json::Value;

use crate::{
    filter::{write_json_value, LogicalOr},
    query::{Query, Segment},
    selector::Selector,
};

/// A declared expression result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    /// A single JSON value, or nothing.
    Value,
    /// True or false.
    Logical,
    /// An ordered list of JSON values.
    Nodes,
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathType::Value => f.write_str("ValueType"),
            PathType::Logical => f.write_str("LogicalType"),
            PathType::Nodes => f.write_str("NodesType"),
        }
    }
}

/// The parse-time kind of a function argument or function result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncType {
    /// A literal JSON value.
    Literal,
    /// The result of a singular query.
    SingularQuery,
    /// A JSON value, from a function that returns `ValueType`.
    Value,
    /// A node list, from a filter query or a function that returns
    /// `NodesType`.
    NodeList,
    /// A boolean, from a logical expression or a function that returns
    /// `LogicalType`.
    Logical,
}

impl FuncType {
    /// True if an argument of this kind can be converted to the declared
    /// type `target`.
    pub fn converts_to(self, target: PathType) -> bool {
        match self {
            FuncType::Literal | FuncType::Value => target == PathType::Value,
            FuncType::SingularQuery => true,
            FuncType::NodeList => target != PathType::Value,
            FuncType::Logical => target == PathType::Logical,
        }
    }
}

/// A runtime value produced while evaluating a filter expression.
#[derive(Debug, Clone)]
pub enum JSONPathValue<'a> {
    /// The absence of a value, as produced by a singular query that
    /// selects no node.
    Nothing,
    Value(Cow<'a, Value>),
    Logical(bool),
    Nodes(Vec<Cow<'a, Value>>),
}

impl<'a> JSONPathValue<'a> {
    /// Convert to a `ValueType` value, where `None` is nothing. Panics on
    /// a logical or node list value; parse-time validation ensures a
    /// well-typed AST never produces one here.
    pub fn into_value(self) -> Option<Cow<'a, Value>> {
        match self {
            JSONPathValue::Nothing => None,
            JSONPathValue::Value(value) => Some(value),
            value => panic!("unexpected {:?} where a ValueType is required", value),
        }
    }

    /// Convert to a `NodesType` node list. A single value becomes a
    /// one-node list and nothing becomes an empty list. Panics on a
    /// logical value.
    pub fn into_nodes(self) -> Vec<Cow<'a, Value>> {
        match self {
            JSONPathValue::Nothing => Vec::new(),
            JSONPathValue::Value(value) => vec![value],
            JSONPathValue::Nodes(nodes) => nodes,
            value => panic!("unexpected {:?} where a NodesType is required", value),
        }
    }

    /// Convert to a `LogicalType` boolean. A node list converts to its
    /// non-emptiness and nothing converts to false. Panics on a value.
    pub fn into_logical(self) -> bool {
        match self {
            JSONPathValue::Nothing => false,
            JSONPathValue::Logical(b) => b,
            JSONPathValue::Nodes(nodes) => !nodes.is_empty(),
            value => panic!("unexpected {:?} where a LogicalType is required", value),
        }
    }

    /// Truthiness when this value is the result of a bare function call
    /// in a filter: a non-empty node list, a true logical, or a present
    /// value that is not `null`, `false`, zero, or an empty collection.
    pub fn is_truthy(&self) -> bool {
        match self {
            JSONPathValue::Nothing => false,
            JSONPathValue::Logical(b) => *b,
            JSONPathValue::Nodes(nodes) => !nodes.is_empty(),
            JSONPathValue::Value(value) => match value.as_ref() {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
                Value::String(_) => true,
            },
        }
    }
}

/// A JSONPath function extension.
///
/// `result_type` must be one of [`FuncType::Value`], [`FuncType::NodeList`]
/// or [`FuncType::Logical`]. `validate` runs at parse time against the
/// argument expressions; `evaluate` runs against the realized argument
/// values, which it may coerce with the `JSONPathValue::into_*` methods.
pub trait FunctionExtension: Send + Sync {
    fn name(&self) -> &str;
    fn result_type(&self) -> FuncType;
    fn validate(&self, args: &[FunctionExprArg]) -> Result<(), String>;
    fn evaluate<'a>(&self, args: Vec<JSONPathValue<'a>>) -> JSONPathValue<'a>;
}

pub type FunctionRegister = HashMap<String, Arc<dyn FunctionExtension>>;

lazy_static! {
    static ref REGISTRY: RwLock<FunctionRegister> = RwLock::new(standard_functions());
}

fn standard_functions() -> FunctionRegister {
    let mut functions: FunctionRegister = HashMap::new();
    for function in [
        Arc::new(Length) as Arc<dyn FunctionExtension>,
        Arc::new(Count),
        Arc::new(ValueOf),
        Arc::new(MatchFunction::new()),
        Arc::new(SearchFunction::new()),
    ] {
        functions.insert(function.name().to_string(), function);
    }
    functions
}

/// Register a function extension for use in subsequently parsed queries.
///
/// Panics if the function has an empty name or a function with the same
/// name is already registered.
pub fn register(function: Arc<dyn FunctionExtension>) {
    let name = function.name().to_string();
    if name.is_empty() {
        panic!("jsonpath: register called with an unnamed function");
    }

    // Release the write lock before panicking so a duplicate
    // registration cannot poison the registry.
    let duplicate = {
        let mut registry = REGISTRY.write().expect("function registry lock poisoned");
        if registry.contains_key(&name) {
            true
        } else {
            registry.insert(name.clone(), function);
            false
        }
    };
    if duplicate {
        panic!("jsonpath: register called twice for function {}", name);
    }
}

/// Look up a registered function extension by name.
pub fn get_function(name: &str) -> Option<Arc<dyn FunctionExtension>> {
    REGISTRY
        .read()
        .expect("function registry lock poisoned")
        .get(name)
        .cloned()
}

fn expect_args(count: usize, args: &[FunctionExprArg]) -> Result<(), String> {
    if args.len() == count {
        Ok(())
    } else {
        Err(format!(
            "expected {} argument{} but found {}",
            count,
            if count == 1 { "" } else { "s" },
            args.len()
        ))
    }
}

struct Length;

impl FunctionExtension for Length {
    fn name(&self) -> &str {
        "length"
    }

    fn result_type(&self) -> FuncType {
        FuncType::Value
    }

    fn validate(&self, args: &[FunctionExprArg]) -> Result<(), String> {
        expect_args(1, args)?;
        if !args[0].as_type_kind().converts_to(PathType::Value) {
            return Err(String::from(
                "cannot convert length() argument to ValueType",
            ));
        }
        Ok(())
    }

    fn evaluate<'a>(&self, args: Vec<JSONPathValue<'a>>) -> JSONPathValue<'a> {
        let arg = args
            .into_iter()
            .next()
            .expect("length() takes one argument");
        match arg.into_value() {
            Some(value) => match value.as_ref() {
                // Unicode scalar values, not bytes.
                Value::String(s) => JSONPathValue::Value(Cow::Owned(Value::from(s.chars().count()))),
                Value::Array(a) => JSONPathValue::Value(Cow::Owned(Value::from(a.len()))),
                Value::Object(o) => JSONPathValue::Value(Cow::Owned(Value::from(o.len()))),
                _ => JSONPathValue::Nothing,
            },
            None => JSONPathValue::Nothing,
        }
    }
}

struct Count;

impl FunctionExtension for Count {
    fn name(&self) -> &str {
        "count"
    }

    fn result_type(&self) -> FuncType {
        FuncType::Value
    }

    fn validate(&self, args: &[FunctionExprArg]) -> Result<(), String> {
        expect_args(1, args)?;
        if !args[0].as_type_kind().converts_to(PathType::Nodes) {
            return Err(String::from("cannot convert count() argument to NodesType"));
        }
        Ok(())
    }

    fn evaluate<'a>(&self, args: Vec<JSONPathValue<'a>>) -> JSONPathValue<'a> {
        let arg = args.into_iter().next().expect("count() takes one argument");
        JSONPathValue::Value(Cow::Owned(Value::from(arg.into_nodes().len())))
    }
}

struct ValueOf;

impl FunctionExtension for ValueOf {
    fn name(&self) -> &str {
        "value"
    }

    fn result_type(&self) -> FuncType {
        FuncType::Value
    }

    fn validate(&self, args: &[FunctionExprArg]) -> Result<(), String> {
        expect_args(1, args)?;
        if !args[0].as_type_kind().converts_to(PathType::Nodes) {
            return Err(String::from("cannot convert value() argument to NodesType"));
        }
        Ok(())
    }

    fn evaluate<'a>(&self, args: Vec<JSONPathValue<'a>>) -> JSONPathValue<'a> {
        let arg = args.into_iter().next().expect("value() takes one argument");
        let mut nodes = arg.into_nodes();
        if nodes.len() == 1 {
            JSONPathValue::Value(nodes.remove(0))
        } else {
            JSONPathValue::Nothing
        }
    }
}

const REGEX_CACHE_SIZE: usize = 100;

struct MatchFunction {
    cache: Mutex<LruCache<String, Regex>>,
}

impl MatchFunction {
    fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(REGEX_CACHE_SIZE).expect("cache size must be non-zero"),
            )),
        }
    }
}

impl FunctionExtension for MatchFunction {
    fn name(&self) -> &str {
        "match"
    }

    fn result_type(&self) -> FuncType {
        FuncType::Logical
    }

    fn validate(&self, args: &[FunctionExprArg]) -> Result<(), String> {
        expect_args(2, args)?;
        for (i, arg) in args.iter().enumerate() {
            if !arg.as_type_kind().converts_to(PathType::Value) {
                return Err(format!(
                    "cannot convert match() argument {} to ValueType",
                    i + 1
                ));
            }
        }
        Ok(())
    }

    fn evaluate<'a>(&self, args: Vec<JSONPathValue<'a>>) -> JSONPathValue<'a> {
        let mut args = args.into_iter();
        let value = args.next().expect("match() takes two arguments").into_value();
        let pattern = args.next().expect("match() takes two arguments").into_value();

        if let (Some(value), Some(pattern)) = (value, pattern) {
            if let (Value::String(s), Value::String(p)) = (value.as_ref(), pattern.as_ref()) {
                // match() is a full match, per RFC 9535.
                let anchored = format!(r"\A(?:{})\z", map_iregexp(p));
                return JSONPathValue::Logical(cached_is_match(&self.cache, &anchored, s));
            }
        }
        JSONPathValue::Logical(false)
    }
}

struct SearchFunction {
    cache: Mutex<LruCache<String, Regex>>,
}

impl SearchFunction {
    fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(REGEX_CACHE_SIZE).expect("cache size must be non-zero"),
            )),
        }
    }
}

impl FunctionExtension for SearchFunction {
    fn name(&self) -> &str {
        "search"
    }

    fn result_type(&self) -> FuncType {
        FuncType::Logical
    }

    fn validate(&self, args: &[FunctionExprArg]) -> Result<(), String> {
        expect_args(2, args)?;
        for (i, arg) in args.iter().enumerate() {
            if !arg.as_type_kind().converts_to(PathType::Value) {
                return Err(format!(
                    "cannot convert search() argument {} to ValueType",
                    i + 1
                ));
            }
        }
        Ok(())
    }

    fn evaluate<'a>(&self, args: Vec<JSONPathValue<'a>>) -> JSONPathValue<'a> {
        let mut args = args.into_iter();
        let value = args.next().expect("search() takes two arguments").into_value();
        let pattern = args.next().expect("search() takes two arguments").into_value();

        if let (Some(value), Some(pattern)) = (value, pattern) {
            if let (Value::String(s), Value::String(p)) = (value.as_ref(), pattern.as_ref()) {
                let mapped = map_iregexp(p);
                return JSONPathValue::Logical(cached_is_match(&self.cache, &mapped, s));
            }
        }
        JSONPathValue::Logical(false)
    }
}

// A pattern the regex crate rejects matches nothing rather than raising.
fn cached_is_match(cache: &Mutex<LruCache<String, Regex>>, pattern: &str, value: &str) -> bool {
    let mut cache = cache.lock().expect("regex cache lock poisoned");
    if let Some(re) = cache.get(pattern) {
        return re.is_match(value);
    }
    match Regex::new(pattern) {
        Ok(re) => {
            let is_match = re.is_match(value);
            cache.push(pattern.to_string(), re);
            is_match
        }
        Err(_) => false,
    }
}

/// Rewrite an I-Regexp pattern for the host regex engine. RFC 9485
/// defines `.` to match anything but `\n` and `\r`, so every dot outside
/// a character class becomes the class `[^\n\r]`.
fn map_iregexp(pattern: &str) -> String {
    let mut mapped = String::with_capacity(pattern.len());
    let mut escaped = false;
    let mut in_class = false;

    for ch in pattern.chars() {
        if escaped {
            mapped.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                mapped.push(ch);
                escaped = true;
            }
            '[' if !in_class => {
                mapped.push(ch);
                in_class = true;
            }
            ']' if in_class => {
                mapped.push(ch);
                in_class = false;
            }
            '.' if !in_class => mapped.push_str(r"[^\n\r]"),
            _ => mapped.push(ch),
        }
    }

    mapped
}

/// An error creating a [`FunctionExpr`].
#[derive(Debug, Clone)]
pub enum FunctionExprError {
    /// No function with the given name is registered.
    Unregistered { name: String },
    /// The function rejected its argument expressions.
    Invalid { msg: String },
}

impl fmt::Display for FunctionExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionExprError::Unregistered { name } => {
                write!(f, "unknown jsonpath function {}()", name)
            }
            FunctionExprError::Invalid { msg } => f.write_str(msg),
        }
    }
}

impl std::error::Error for FunctionExprError {}

/// A singular query used as a comparable or function argument. Holds only
/// name and index selectors and selects at most one node.
#[derive(Debug, Clone)]
pub struct SingularQueryExpr {
    pub relative: bool,
    pub selectors: Vec<Selector>,
}

impl SingularQueryExpr {
    pub fn new(relative: bool, selectors: Vec<Selector>) -> Self {
        SingularQueryExpr {
            relative,
            selectors,
        }
    }

    /// Convert a singular [`Query`] into a singular query expression.
    /// Panics if the query is not singular.
    pub fn from_query(query: Query) -> Self {
        let relative = !query.root;
        let selectors = query
            .segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Child { mut selectors } if selectors.len() == 1 => selectors.remove(0),
                _ => panic!("cannot convert a non-singular query to a singular query expression"),
            })
            .collect();
        SingularQueryExpr::new(relative, selectors)
    }

    /// Walk the selectors from the query root, producing the single
    /// selected value or nothing.
    pub fn evaluate<'a>(&'a self, current: &'a Value, root: &'a Value) -> JSONPathValue<'a> {
        let mut target = if self.relative { current } else { root };
        for selector in &self.selectors {
            match selector.select(target, root).into_iter().next() {
                Some(node) => target = node,
                None => return JSONPathValue::Nothing,
            }
        }
        JSONPathValue::Value(Cow::Borrowed(target))
    }
}

impl fmt::Display for SingularQueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.relative { "@" } else { "$" })?;
        for selector in &self.selectors {
            write!(f, "[{}]", selector)?;
        }
        Ok(())
    }
}

/// A function argument expression, classified by [`FuncType`].
#[derive(Debug, Clone)]
pub enum FunctionExprArg {
    Literal(Value),
    SingularQuery(SingularQueryExpr),
    FilterQuery(Query),
    LogicalExpr(LogicalOr),
    FunctionExpr(FunctionExpr),
}

impl FunctionExprArg {
    /// The parse-time kind of this argument, checked against function
    /// parameter types with [`FuncType::converts_to`].
    pub fn as_type_kind(&self) -> FuncType {
        match self {
            FunctionExprArg::Literal(_) => FuncType::Literal,
            FunctionExprArg::SingularQuery(_) => FuncType::SingularQuery,
            FunctionExprArg::FilterQuery(query) => {
                if query.is_singular() {
                    FuncType::SingularQuery
                } else {
                    FuncType::NodeList
                }
            }
            FunctionExprArg::LogicalExpr(_) => FuncType::Logical,
            FunctionExprArg::FunctionExpr(function) => function.result_type(),
        }
    }

    pub fn evaluate<'a>(&'a self, current: &'a Value, root: &'a Value) -> JSONPathValue<'a> {
        match self {
            FunctionExprArg::Literal(value) => JSONPathValue::Value(Cow::Borrowed(value)),
            FunctionExprArg::SingularQuery(query) => query.evaluate(current, root),
            FunctionExprArg::FilterQuery(query) => JSONPathValue::Nodes(
                query
                    .select(current, root)
                    .into_iter()
                    .map(Cow::Borrowed)
                    .collect(),
            ),
            FunctionExprArg::LogicalExpr(expr) => {
                JSONPathValue::Logical(expr.test_filter(current, root))
            }
            FunctionExprArg::FunctionExpr(function) => function.execute(current, root),
        }
    }
}

impl fmt::Display for FunctionExprArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionExprArg::Literal(value) => write_json_value(value, f),
            FunctionExprArg::SingularQuery(query) => write!(f, "{}", query),
            FunctionExprArg::FilterQuery(query) => write!(f, "{}", query),
            FunctionExprArg::LogicalExpr(expr) => write!(f, "{}", expr),
            FunctionExprArg::FunctionExpr(function) => write!(f, "{}", function),
        }
    }
}

/// A validated function call bound to its registered function.
#[derive(Clone)]
pub struct FunctionExpr {
    name: String,
    function: Arc<dyn FunctionExtension>,
    args: Vec<FunctionExprArg>,
}

impl FunctionExpr {
    /// Look up `name` in the registry and validate `args` against it.
    pub fn new(name: &str, args: Vec<FunctionExprArg>) -> Result<Self, FunctionExprError> {
        match get_function(name) {
            Some(function) => {
                function
                    .validate(&args)
                    .map_err(|msg| FunctionExprError::Invalid { msg })?;
                Ok(FunctionExpr {
                    name: name.to_string(),
                    function,
                    args,
                })
            }
            None => Err(FunctionExprError::Unregistered {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[FunctionExprArg] {
        &self.args
    }

    pub fn result_type(&self) -> FuncType {
        self.function.result_type()
    }

    /// Evaluate each argument, then apply the bound function.
    pub fn execute<'a>(&'a self, current: &'a Value, root: &'a Value) -> JSONPathValue<'a> {
        let args = self
            .args
            .iter()
            .map(|arg| arg.evaluate(current, root))
            .collect();
        self.function.evaluate(args)
    }
}

impl fmt::Debug for FunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionExpr")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

impl fmt::Display for FunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value_arg(value: Value) -> JSONPathValue<'static> {
        JSONPathValue::Value(Cow::Owned(value))
    }

    fn evaluate_value(name: &str, args: Vec<JSONPathValue>) -> Option<Value> {
        let function = get_function(name).expect("function should be registered");
        match function.evaluate(args) {
            JSONPathValue::Value(value) => Some(value.into_owned()),
            JSONPathValue::Nothing => None,
            value => panic!("expected a ValueType result, found {:?}", value),
        }
    }

    fn evaluate_logical(name: &str, args: Vec<JSONPathValue>) -> bool {
        let function = get_function(name).expect("function should be registered");
        match function.evaluate(args) {
            JSONPathValue::Logical(b) => b,
            value => panic!("expected a LogicalType result, found {:?}", value),
        }
    }

    #[test]
    fn convertibility_matrix() {
        use FuncType::*;
        use PathType as P;

        for (kind, value, logical, nodes) in [
            (Literal, true, false, false),
            (SingularQuery, true, true, true),
            (Value, true, false, false),
            (NodeList, false, true, true),
            (Logical, false, true, false),
        ] {
            assert_eq!(kind.converts_to(P::Value), value, "{:?} -> ValueType", kind);
            assert_eq!(
                kind.converts_to(P::Logical),
                logical,
                "{:?} -> LogicalType",
                kind
            );
            assert_eq!(kind.converts_to(P::Nodes), nodes, "{:?} -> NodesType", kind);
        }
    }

    #[test]
    fn declared_type_names() {
        assert_eq!(PathType::Value.to_string(), "ValueType");
        assert_eq!(PathType::Logical.to_string(), "LogicalType");
        assert_eq!(PathType::Nodes.to_string(), "NodesType");
    }

    #[test]
    fn standard_functions_are_registered() {
        for name in ["length", "count", "value", "match", "search"] {
            assert!(get_function(name).is_some(), "{} should be registered", name);
        }
        assert!(get_function("no_such_function").is_none());
    }

    #[test]
    #[should_panic(expected = "register called twice for function length")]
    fn duplicate_registration() {
        register(Arc::new(Length));
    }

    struct Unnamed;

    impl FunctionExtension for Unnamed {
        fn name(&self) -> &str {
            ""
        }
        fn result_type(&self) -> FuncType {
            FuncType::Value
        }
        fn validate(&self, _: &[FunctionExprArg]) -> Result<(), String> {
            Ok(())
        }
        fn evaluate<'a>(&self, _: Vec<JSONPathValue<'a>>) -> JSONPathValue<'a> {
            JSONPathValue::Nothing
        }
    }

    #[test]
    #[should_panic(expected = "register called with an unnamed function")]
    fn unnamed_registration() {
        register(Arc::new(Unnamed));
    }

    #[test]
    fn length_counts_unicode_scalar_values() {
        assert_eq!(
            evaluate_value("length", vec![value_arg(json!("hello"))]),
            Some(json!(5))
        );
        assert_eq!(
            evaluate_value("length", vec![value_arg(json!("caf\u{e9}"))]),
            Some(json!(4))
        );
        assert_eq!(
            evaluate_value("length", vec![value_arg(json!("hi \u{1f600}"))]),
            Some(json!(4))
        );
    }

    #[test]
    fn length_of_collections() {
        assert_eq!(
            evaluate_value("length", vec![value_arg(json!([1, 2, 3]))]),
            Some(json!(3))
        );
        assert_eq!(
            evaluate_value("length", vec![value_arg(json!({"a": 1}))]),
            Some(json!(1))
        );
        assert_eq!(evaluate_value("length", vec![value_arg(json!(42))]), None);
        assert_eq!(evaluate_value("length", vec![JSONPathValue::Nothing]), None);
    }

    #[test]
    fn count_nodes() {
        let doc = json!([1, 2, 3]);
        let nodes: Vec<Cow<Value>> = doc
            .as_array()
            .expect("expected an array")
            .iter()
            .map(Cow::Borrowed)
            .collect();
        assert_eq!(
            evaluate_value("count", vec![JSONPathValue::Nodes(nodes)]),
            Some(json!(3))
        );
        // A single value coerces to a one-node list, nothing to an empty one.
        assert_eq!(
            evaluate_value("count", vec![value_arg(json!("x"))]),
            Some(json!(1))
        );
        assert_eq!(
            evaluate_value("count", vec![JSONPathValue::Nothing]),
            Some(json!(0))
        );
    }

    #[test]
    fn value_of_nodes() {
        let doc = json!(["only"]);
        let nodes: Vec<Cow<Value>> = doc
            .as_array()
            .expect("expected an array")
            .iter()
            .map(Cow::Borrowed)
            .collect();
        assert_eq!(
            evaluate_value("value", vec![JSONPathValue::Nodes(nodes)]),
            Some(json!("only"))
        );
        assert_eq!(
            evaluate_value("value", vec![JSONPathValue::Nodes(Vec::new())]),
            None
        );

        let doc = json!(["a", "b"]);
        let nodes: Vec<Cow<Value>> = doc
            .as_array()
            .expect("expected an array")
            .iter()
            .map(Cow::Borrowed)
            .collect();
        assert_eq!(evaluate_value("value", vec![JSONPathValue::Nodes(nodes)]), None);
    }

    #[test]
    fn match_is_anchored() {
        assert!(evaluate_logical(
            "match",
            vec![value_arg(json!("ab")), value_arg(json!("a."))]
        ));
        assert!(!evaluate_logical(
            "match",
            vec![value_arg(json!("xabx")), value_arg(json!("a."))]
        ));
        // Alternation stays anchored as a whole.
        assert!(!evaluate_logical(
            "match",
            vec![value_arg(json!("xa")), value_arg(json!("a|b"))]
        ));
    }

    #[test]
    fn match_dot_excludes_line_terminators() {
        assert!(evaluate_logical(
            "match",
            vec![value_arg(json!("axb")), value_arg(json!("a.b"))]
        ));
        assert!(!evaluate_logical(
            "match",
            vec![value_arg(json!("a\nb")), value_arg(json!("a.b"))]
        ));
        assert!(!evaluate_logical(
            "match",
            vec![value_arg(json!("a\rb")), value_arg(json!("a.b"))]
        ));
        // A dot inside a character class is literal.
        assert!(evaluate_logical(
            "match",
            vec![value_arg(json!("a.b")), value_arg(json!("a[.]b"))]
        ));
        assert!(!evaluate_logical(
            "match",
            vec![value_arg(json!("axb")), value_arg(json!("a[.]b"))]
        ));
    }

    #[test]
    fn search_is_unanchored() {
        assert!(evaluate_logical(
            "search",
            vec![value_arg(json!("xaby")), value_arg(json!("a.b"))]
        ));
        assert!(!evaluate_logical(
            "search",
            vec![value_arg(json!("xa\nby")), value_arg(json!("a.b"))]
        ));
    }

    #[test]
    fn regex_failures_are_false() {
        assert!(!evaluate_logical(
            "match",
            vec![value_arg(json!("ab")), value_arg(json!("(unclosed"))]
        ));
        assert!(!evaluate_logical(
            "match",
            vec![value_arg(json!(42)), value_arg(json!("a.b"))]
        ));
        assert!(!evaluate_logical(
            "search",
            vec![value_arg(json!("ab")), value_arg(json!(null))]
        ));
        assert!(!evaluate_logical(
            "match",
            vec![JSONPathValue::Nothing, value_arg(json!("a.b"))]
        ));
    }

    #[test]
    fn iregexp_dot_mapping() {
        assert_eq!(map_iregexp("a.b"), r"a[^\n\r]b");
        assert_eq!(map_iregexp(r"a\.b"), r"a\.b");
        assert_eq!(map_iregexp("a[.]b"), "a[.]b");
        assert_eq!(map_iregexp("a[^.]b."), r"a[^.]b[^\n\r]");
    }

    #[test]
    fn truthiness_of_values() {
        for (value, expected) in [
            (json!(null), false),
            (json!(false), false),
            (json!(true), true),
            (json!(0), false),
            (json!(0.0), false),
            (json!(1), true),
            (json!(""), true),
            (json!("x"), true),
            (json!([]), false),
            (json!([0]), true),
            (json!({}), false),
            (json!({"a": 1}), true),
        ] {
            assert_eq!(value_arg(value.clone()).is_truthy(), expected, "{}", value);
        }
        assert!(!JSONPathValue::Nothing.is_truthy());
        assert!(JSONPathValue::Logical(true).is_truthy());
        assert!(!JSONPathValue::Nodes(Vec::new()).is_truthy());
    }
}
