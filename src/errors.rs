use std::fmt;

/// Broad classification of a [`JSONPathError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JSONPathErrorType {
    /// Malformed query text, including lexical errors.
    SyntaxError,
    /// A well-formed expression that violates the JSONPath type system.
    TypeError,
    /// A reference to an unregistered function extension.
    NameError,
}

/// An error raised while parsing a JSONPath query string.
///
/// `position` is the 1-based offset of the offending character in the
/// query. Evaluating a parsed query never raises; all runtime type
/// mismatches select nothing or compare false instead.
#[derive(Debug, Clone)]
pub struct JSONPathError {
    pub kind: JSONPathErrorType,
    pub msg: String,
    pub position: usize,
}

impl JSONPathError {
    /// `index` is the 0-based byte offset of the offending character.
    pub fn new(kind: JSONPathErrorType, msg: String, index: usize) -> Self {
        Self {
            kind,
            msg,
            position: index + 1,
        }
    }

    pub fn syntax(msg: String, index: usize) -> Self {
        Self::new(JSONPathErrorType::SyntaxError, msg, index)
    }

    pub fn typ(msg: String, index: usize) -> Self {
        Self::new(JSONPathErrorType::TypeError, msg, index)
    }

    pub fn name(msg: String, index: usize) -> Self {
        Self::new(JSONPathErrorType::NameError, msg, index)
    }
}

impl std::error::Error for JSONPathError {}

impl fmt::Display for JSONPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jsonpath: {} at position {}", self.msg, self.position)
    }
}
