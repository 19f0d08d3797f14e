//! An RFC 9535 JSONPath parser and evaluator for [`serde_json`] values.
//!
//! A query string is parsed once into a [`Path`], then applied to any
//! number of JSON documents with [`Path::select`].
//!
//! ```
//! use serde_json::json;
//! use serde_jsonpath::{parse, JSONPathError};
//!
//! fn main() -> Result<(), JSONPathError> {
//!     let path = parse("$.users[?@.admin].name")?;
//!
//!     let doc = json!({
//!         "users": [
//!             {"name": "Sue", "admin": true},
//!             {"name": "Sal"},
//!             {"name": "Abdul", "admin": true}
//!         ]
//!     });
//!
//!     let names = path.select(&doc);
//!     assert_eq!(names, vec![&json!("Sue"), &json!("Abdul")]);
//!     Ok(())
//! }
//! ```
//!
//! A parsed [`Path`] displays in a canonical form:
//!
//! ```
//! use serde_jsonpath::parse;
//!
//! let path = parse("$.a[1:9:2]..b[?@.c > 1]").unwrap();
//! assert_eq!(path.to_string(), "$[\"a\"][1:9:2]..[\"b\"][?@[\"c\"] > 1]");
//! ```
//!
//! ## Function extensions
//!
//! The `length`, `count`, `value`, `match` and `search` [function
//! extensions] are built in. Additional functions implement
//! [`FunctionExtension`] and are installed with [`register`] before
//! parsing queries that use them. `match` and `search` apply RFC 9485
//! I-Regexp semantics, where `.` never matches a line terminator.
//!
//! [function extensions]: https://datatracker.ietf.org/doc/html/rfc9535#name-function-extensions

pub mod errors;
pub mod filter;
pub mod function;
pub mod lexer;
mod parser;
pub mod query;
pub mod selector;
mod token;

pub use errors::{JSONPathError, JSONPathErrorType};
pub use filter::{
    value_equal_to, value_less_than, BasicExpr, CompOp, CompVal, ComparisonExpr, LogicalAnd,
    LogicalOr,
};
pub use function::{
    get_function, register, FuncType, FunctionExpr, FunctionExprArg, FunctionExprError,
    FunctionExtension, JSONPathValue, PathType, SingularQueryExpr,
};
pub use query::{NodeList, Path, Query, Segment};
pub use selector::{Selector, SliceSelector};

/// Parse `query` as an RFC 9535 JSONPath expression.
pub fn parse(query: &str) -> Result<Path, JSONPathError> {
    Path::parse(query)
}
