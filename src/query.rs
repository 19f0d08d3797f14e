//! The JSONPath syntax tree and its evaluation against JSON values.
//!
//! A [`Path`] owns exactly one [`Query`]. A query holds zero or more
//! [`Segment`]s, each applying one or more selectors to the nodes selected
//! so far.

use std::fmt;

use itertools::Itertools;
use serde_json::Value;

use crate::{errors::JSONPathError, parser, selector::Selector};

/// An ordered list of JSON values selected from a document.
pub type NodeList<'a> = Vec<&'a Value>;

/// A parsed JSONPath expression.
///
/// A `Path` is immutable once parsed and safe to share between threads for
/// concurrent evaluation.
#[derive(Debug, Clone)]
pub struct Path {
    query: Query,
}

impl Path {
    /// Parse `query` as an RFC 9535 JSONPath expression.
    pub fn parse(query: &str) -> Result<Self, JSONPathError> {
        Ok(Path {
            query: parser::parse(query)?,
        })
    }

    pub fn new(query: Query) -> Self {
        Path { query }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Apply this path to `root`, returning the selected nodes in order.
    pub fn select<'a>(&self, root: &'a Value) -> NodeList<'a> {
        self.query.select(root, root)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)
    }
}

/// A sequence of segments applied from the query argument (`$`) or, in
/// filter expressions, from the current node (`@`).
#[derive(Debug, Clone)]
pub struct Query {
    pub root: bool,
    pub segments: Vec<Segment>,
}

impl Query {
    pub fn new(root: bool, segments: Vec<Segment>) -> Self {
        Query { root, segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A query is singular if it can never select more than one node; that
    /// is, every segment is a child segment holding exactly one name or
    /// index selector.
    pub fn is_singular(&self) -> bool {
        self.segments.iter().all(Segment::is_singular)
    }

    pub fn select<'a>(&self, current: &'a Value, root: &'a Value) -> NodeList<'a> {
        let target = if self.root { root } else { current };
        let mut nodes: NodeList<'a> = vec![target];
        for segment in &self.segments {
            nodes = nodes
                .iter()
                .flat_map(|node| segment.select(node, root))
                .collect();
        }
        nodes
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            if self.root { "$" } else { "@" },
            self.segments.iter().join("")
        )
    }
}

/// One step in a query: a child or descendant selection.
#[derive(Debug, Clone)]
pub enum Segment {
    Child { selectors: Vec<Selector> },
    Descendant { selectors: Vec<Selector> },
}

impl Segment {
    pub fn selectors(&self) -> &[Selector] {
        match self {
            Segment::Child { selectors } => selectors,
            Segment::Descendant { selectors } => selectors,
        }
    }

    pub fn is_singular(&self) -> bool {
        match self {
            Segment::Child { selectors } => {
                selectors.len() == 1 && selectors.first().is_some_and(Selector::is_singular)
            }
            Segment::Descendant { .. } => false,
        }
    }

    /// Select from `current` with each of this segment's selectors.
    /// Descendant segments visit `current` and everything under it in
    /// pre-order, applying every selector at each visited node.
    pub fn select<'a>(&self, current: &'a Value, root: &'a Value) -> NodeList<'a> {
        match self {
            Segment::Child { selectors } => selectors
                .iter()
                .flat_map(|selector| selector.select(current, root))
                .collect(),
            Segment::Descendant { selectors } => {
                let mut nodes: NodeList<'a> = selectors
                    .iter()
                    .flat_map(|selector| selector.select(current, root))
                    .collect();

                match current {
                    Value::Array(arr) => {
                        for value in arr {
                            nodes.extend(self.select(value, root));
                        }
                    }
                    Value::Object(obj) => {
                        for value in obj.values() {
                            nodes.extend(self.select(value, root));
                        }
                    }
                    _ => (),
                }

                nodes
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Child { selectors } => {
                write!(f, "[{}]", selectors.iter().join(","))
            }
            Segment::Descendant { selectors } => {
                write!(f, "..[{}]", selectors.iter().join(","))
            }
        }
    }
}
