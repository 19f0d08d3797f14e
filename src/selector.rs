use std::fmt;

use serde_json::Value;

use crate::{
    filter::{write_json_string, LogicalOr},
    query::NodeList,
};

/// A single selector within a segment.
#[derive(Debug, Clone)]
pub enum Selector {
    /// Select a named member of an object.
    Name(String),
    /// Select an array element, counting from the end when negative.
    Index(i64),
    /// Select a range of array elements.
    Slice(SliceSelector),
    /// Select every element of an array or every member value of an object.
    Wild,
    /// Select children for which the filter expression is truthy.
    Filter(LogicalOr),
}

impl Selector {
    /// A selector is singular if it selects at most one node.
    pub fn is_singular(&self) -> bool {
        matches!(self, Selector::Name(_) | Selector::Index(_))
    }

    pub fn select<'a>(&self, current: &'a Value, root: &'a Value) -> NodeList<'a> {
        match self {
            Selector::Name(name) => match current {
                Value::Object(obj) => obj.get(name).map_or_else(Vec::new, |value| vec![value]),
                _ => Vec::new(),
            },
            Selector::Index(index) => match current {
                Value::Array(arr) => {
                    let len = arr.len() as i64;
                    let resolved = if *index < 0 { len + index } else { *index };
                    if (0..len).contains(&resolved) {
                        vec![&arr[resolved as usize]]
                    } else {
                        Vec::new()
                    }
                }
                _ => Vec::new(),
            },
            Selector::Slice(slice) => match current {
                Value::Array(arr) => slice.select(arr),
                _ => Vec::new(),
            },
            Selector::Wild => match current {
                Value::Array(arr) => arr.iter().collect(),
                Value::Object(obj) => obj.values().collect(),
                _ => Vec::new(),
            },
            Selector::Filter(expression) => match current {
                Value::Array(arr) => arr
                    .iter()
                    .filter(|value| expression.test_filter(value, root))
                    .collect(),
                Value::Object(obj) => obj
                    .values()
                    .filter(|value| expression.test_filter(value, root))
                    .collect(),
                _ => Vec::new(),
            },
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Name(name) => write_json_string(name, f),
            Selector::Index(index) => write!(f, "{}", index),
            Selector::Slice(slice) => write!(f, "{}", slice),
            Selector::Wild => f.write_str("*"),
            Selector::Filter(expression) => write!(f, "?{}", expression),
        }
    }
}

/// An array slice with optional start, end, and step.
///
/// An omitted start defaults to the first element for a positive step and
/// the last for a negative step; an omitted end takes in the rest of the
/// array in the direction of travel; an omitted step is `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSelector {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub step: Option<i64>,
}

impl SliceSelector {
    /// Create a slice from up to three JSON arguments, where `null` stands
    /// for an omitted part.
    ///
    /// Panics if any argument is not an integer or `null`; use
    /// [`SliceSelector::from_parts`] for a non-panicking constructor.
    pub fn new(args: &[Value]) -> Self {
        const ORDINALS: [&str; 3] = ["First", "Second", "Third"];
        let mut parts: [Option<i64>; 3] = [None; 3];

        for (i, arg) in args.iter().take(3).enumerate() {
            parts[i] = match arg {
                Value::Null => None,
                Value::Number(num) => match num.as_i64() {
                    Some(int) => Some(int),
                    None => panic!("{} value passed to NewSlice is not an integer", ORDINALS[i]),
                },
                _ => panic!("{} value passed to NewSlice is not an integer", ORDINALS[i]),
            };
        }

        SliceSelector {
            start: parts[0],
            end: parts[1],
            step: parts[2],
        }
    }

    pub fn from_parts(start: Option<i64>, end: Option<i64>, step: Option<i64>) -> Self {
        SliceSelector { start, end, step }
    }

    /// The normalized, clamped iteration bounds for an array of length
    /// `len`, per RFC 9535 section 2.3.4.2.2.
    fn bounds(&self, len: i64) -> (i64, i64) {
        let normalize = |index: i64| if index < 0 { index + len } else { index };

        if self.step.unwrap_or(1) >= 0 {
            let lower = self.start.map_or(0, normalize).clamp(0, len);
            let upper = self.end.map_or(len, normalize).clamp(0, len);
            (lower, upper)
        } else {
            let upper = self.start.map_or(len - 1, normalize).clamp(-1, len - 1);
            let lower = self.end.map_or(-1, normalize).clamp(-1, len - 1);
            (lower, upper)
        }
    }

    pub fn select<'a>(&self, array: &'a [Value]) -> NodeList<'a> {
        let step = self.step.unwrap_or(1);
        if step == 0 || array.is_empty() {
            return Vec::new();
        }

        let (lower, upper) = self.bounds(array.len() as i64);
        let mut nodes: NodeList = Vec::new();

        if step > 0 {
            let mut i = lower;
            while i < upper {
                nodes.push(&array[i as usize]);
                i += step;
            }
        } else {
            let mut i = upper;
            while i > lower {
                nodes.push(&array[i as usize]);
                i += step;
            }
        }

        nodes
    }
}

impl fmt::Display for SliceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // An explicit start is never omitted. The implied start is 0 only
        // for a forward step; for a negative step it is the last element,
        // so `0::-1` and `::-1` select different nodes.
        match self.start {
            Some(start) => write!(f, "{}:", start)?,
            None => f.write_str(":")?,
        }
        if let Some(end) = self.end {
            write!(f, "{}", end)?;
        }
        match self.step {
            Some(step) if step != 1 => write!(f, ":{}", step),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slice(start: Option<i64>, end: Option<i64>, step: Option<i64>) -> SliceSelector {
        SliceSelector::from_parts(start, end, step)
    }

    #[test]
    fn slice_display() {
        for (selector, expected) in [
            (slice(Some(0), Some(4), None), "0:4"),
            (slice(None, Some(4), None), ":4"),
            (slice(Some(4), Some(5), None), "4:5"),
            (slice(None, Some(42), None), ":42"),
            (slice(Some(4), None, None), "4:"),
            (slice(Some(4), Some(7), Some(2)), "4:7:2"),
            (slice(Some(4), None, Some(2)), "4::2"),
            (slice(None, Some(4), Some(2)), ":4:2"),
            (slice(None, None, Some(3)), "::3"),
            (slice(None, None, None), ":"),
            (slice(None, None, Some(-1)), "::-1"),
            // An explicit zero start must survive rendering: with a
            // negative step it is not the default.
            (slice(Some(0), None, Some(-1)), "0::-1"),
        ] {
            assert_eq!(selector.to_string(), expected);
        }
    }

    #[test]
    fn slice_bounds() {
        // (slice, len, lower, upper)
        for (selector, len, lower, upper) in [
            (slice(None, None, None), 10, 0, 10),
            (slice(None, None, None), 3, 0, 3),
            (slice(Some(3), Some(8), Some(2)), 10, 3, 8),
            (slice(Some(3), Some(8), Some(2)), 3, 3, 3),
            (slice(Some(1), Some(3), Some(1)), 2, 1, 2),
            (slice(Some(5), None, None), 8, 5, 8),
            (slice(Some(1), Some(5), Some(2)), 10, 1, 5),
            (slice(Some(1), Some(5), Some(2)), 4, 1, 4),
            (slice(Some(5), Some(1), Some(-2)), 10, 1, 5),
            (slice(Some(5), Some(1), Some(-2)), 4, 1, 3),
            (slice(None, None, Some(-1)), 10, -1, 9),
            (slice(None, None, Some(-1)), 4, -1, 3),
        ] {
            assert_eq!(selector.bounds(len), (lower, upper), "{} @ {}", selector, len);
        }
    }

    #[test]
    fn slice_select() {
        let letters = json!(["a", "b", "c", "d", "e", "f", "g"]);
        let array = letters.as_array().expect("expected an array");

        for (selector, expected) in [
            (slice(Some(1), Some(5), Some(2)), json!(["b", "d"])),
            (slice(Some(5), Some(1), Some(-2)), json!(["f", "d"])),
            (
                slice(None, None, Some(-1)),
                json!(["g", "f", "e", "d", "c", "b", "a"]),
            ),
            (slice(None, Some(3), None), json!(["a", "b", "c"])),
            (slice(Some(-2), None, None), json!(["f", "g"])),
            (slice(None, None, Some(0)), json!([])),
            (slice(Some(2), Some(2), None), json!([])),
        ] {
            let expected: Vec<&Value> = expected.as_array().map(|a| a.iter().collect()).unwrap();
            assert_eq!(selector.select(array), expected, "{}", selector);
        }
    }

    #[test]
    fn index_select() {
        let doc = json!([42, true, "hi"]);
        assert_eq!(Selector::Index(0).select(&doc, &doc), vec![&json!(42)]);
        assert_eq!(Selector::Index(2).select(&doc, &doc), vec![&json!("hi")]);
        assert_eq!(Selector::Index(-1).select(&doc, &doc), vec![&json!("hi")]);
        assert_eq!(Selector::Index(-3).select(&doc, &doc), vec![&json!(42)]);
        assert!(Selector::Index(3).select(&doc, &doc).is_empty());
        assert!(Selector::Index(-4).select(&doc, &doc).is_empty());
        assert!(Selector::Index(0).select(&json!({"a": 1}), &doc).is_empty());
    }

    #[test]
    fn name_select() {
        let doc = json!({"hi": [42, true]});
        assert_eq!(
            Selector::Name(String::from("hi")).select(&doc, &doc),
            vec![&json!([42, true])]
        );
        assert!(Selector::Name(String::from("oy"))
            .select(&doc, &doc)
            .is_empty());
        assert!(Selector::Name(String::from("hi"))
            .select(&json!([1, 2]), &doc)
            .is_empty());
    }

    #[test]
    fn wild_select() {
        let doc = json!([true, 42, {"x": 6}]);
        assert_eq!(
            Selector::Wild.select(&doc, &doc),
            vec![&json!(true), &json!(42), &json!({"x": 6})]
        );
        assert!(Selector::Wild.select(&json!("scalar"), &doc).is_empty());

        let obj = json!({"x": true, "y": [1]});
        let selected = Selector::Wild.select(&obj, &obj);
        assert_eq!(selected.len(), 2);
        assert!(selected.contains(&&json!(true)));
        assert!(selected.contains(&&json!([1])));
    }

    #[test]
    fn slice_from_json_args() {
        assert_eq!(
            SliceSelector::new(&[json!(1), json!(null), json!(-2)]),
            slice(Some(1), None, Some(-2))
        );
        assert_eq!(SliceSelector::new(&[]), slice(None, None, None));
    }

    #[test]
    #[should_panic(expected = "First value passed to NewSlice is not an integer")]
    fn slice_first_arg_not_an_integer() {
        SliceSelector::new(&[json!("hi")]);
    }

    #[test]
    #[should_panic(expected = "Second value passed to NewSlice is not an integer")]
    fn slice_second_arg_not_an_integer() {
        SliceSelector::new(&[json!(null), json!(1.5)]);
    }

    #[test]
    #[should_panic(expected = "Third value passed to NewSlice is not an integer")]
    fn slice_third_arg_not_an_integer() {
        SliceSelector::new(&[json!(null), json!(42), json!(true)]);
    }
}
