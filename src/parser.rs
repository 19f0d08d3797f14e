//! A recursive descent parser over the lexer's token stream.
//!
//! Beyond the RFC 9535 grammar itself, the parser enforces the
//! context-sensitive rules: path integers are range checked and `-0` is
//! rejected, comparison operands must not be logical-typed, a
//! value-returning function call must be part of a comparison, and
//! function arguments are validated against the registered function's
//! signature.

use std::{iter::Peekable, vec::IntoIter};

use serde_json::Value;

use crate::{
    errors::JSONPathError,
    filter::{BasicExpr, CompOp, CompVal, ComparisonExpr, LogicalAnd, LogicalOr},
    function::{FuncType, FunctionExpr, FunctionExprArg, FunctionExprError, SingularQueryExpr},
    lexer::lex,
    query::{Query, Segment},
    selector::{Selector, SliceSelector},
    token::{Token, TokenType},
};

use TokenType::*;

const EOQ_TOKEN: Token = Token {
    kind: Eoq,
    span: (0, 0),
};

type Tokens = Peekable<IntoIter<Token>>;

const MAX_PATH_INT: i64 = (1 << 53) - 1;
const MIN_PATH_INT: i64 = -MAX_PATH_INT;

pub(crate) fn parse(query: &str) -> Result<Query, JSONPathError> {
    let tokens = lex(query)?;
    let mut it = tokens.into_iter().peekable();

    match it.next().unwrap_or(EOQ_TOKEN) {
        Token { kind: Root, .. } => {
            let segments = parse_segments(&mut it)?;
            match it.next().unwrap_or(EOQ_TOKEN) {
                Token { kind: Eoq, .. } => Ok(Query {
                    root: true,
                    segments,
                }),
                token => Err(JSONPathError::syntax(
                    format!("expected end of query, found {}", token.kind),
                    token.index(),
                )),
            }
        }
        token => Err(JSONPathError::syntax(
            format!("expected '$', found {}", token.kind),
            token.index(),
        )),
    }
}

fn peek<'t>(it: &'t mut Tokens) -> &'t Token {
    it.peek().unwrap_or(&EOQ_TOKEN)
}

fn unexpected(token: &Token) -> JSONPathError {
    JSONPathError::syntax(format!("unexpected {}", token.kind), token.index())
}

fn parse_segments(it: &mut Tokens) -> Result<Vec<Segment>, JSONPathError> {
    let mut segments: Vec<Segment> = Vec::new();
    loop {
        match peek(it).kind {
            DoubleDot => {
                it.next();
                let selectors = parse_selectors(it)?;
                segments.push(Segment::Descendant { selectors });
            }
            LBracket | Name { .. } | Wild => {
                let selectors = parse_selectors(it)?;
                segments.push(Segment::Child { selectors });
            }
            _ => break,
        }
    }
    Ok(segments)
}

fn parse_selectors(it: &mut Tokens) -> Result<Vec<Selector>, JSONPathError> {
    match peek(it) {
        Token {
            kind: Name { value },
            ..
        } => {
            // Shorthand names contain no escape sequences.
            let name = value.to_string();
            it.next();
            Ok(vec![Selector::Name(name)])
        }
        Token { kind: Wild, .. } => {
            it.next();
            Ok(vec![Selector::Wild])
        }
        Token { kind: LBracket, .. } => parse_bracketed(it),
        _ => Ok(Vec::new()),
    }
}

fn parse_bracketed(it: &mut Tokens) -> Result<Vec<Selector>, JSONPathError> {
    let open = it.next().expect("expected the start of a bracketed selection");
    let mut selectors: Vec<Selector> = Vec::new();

    loop {
        match peek(it) {
            Token { kind: RBracket, .. } => {
                it.next();
                break;
            }
            Token {
                kind: Index { .. } | Colon,
                ..
            } => {
                selectors.push(parse_slice_or_index(it)?);
            }
            Token {
                kind: DoubleQuoteString { value },
                span,
            } => {
                let name = unescape_string(value, span.0)?;
                it.next();
                selectors.push(Selector::Name(name));
            }
            Token {
                kind: SingleQuoteString { value },
                span,
            } => {
                let name = unescape_string(&value.replace("\\'", "'"), span.0)?;
                it.next();
                selectors.push(Selector::Name(name));
            }
            Token { kind: Wild, .. } => {
                it.next();
                selectors.push(Selector::Wild);
            }
            Token { kind: Filter, .. } => {
                it.next();
                let expression = parse_logical_or(it)?;
                selectors.push(Selector::Filter(expression));
            }
            Token { kind: Eoq, .. } => {
                return Err(JSONPathError::syntax(
                    String::from("unexpected end of query"),
                    open.index(),
                ));
            }
            token => {
                return Err(JSONPathError::syntax(
                    format!("unexpected selector token {}", token.kind),
                    token.index(),
                ));
            }
        }

        // A comma or the end of the selection must follow each selector.
        match peek(it) {
            Token { kind: RBracket, .. } => continue,
            Token { kind: Comma, .. } => {
                it.next();
                if matches!(peek(it).kind, RBracket) {
                    return Err(unexpected(peek(it)));
                }
            }
            token => {
                return Err(JSONPathError::syntax(
                    format!("expected a comma or closing bracket, found {}", token.kind),
                    token.index(),
                ));
            }
        }
    }

    if selectors.is_empty() {
        return Err(JSONPathError::syntax(
            String::from("empty bracketed selection"),
            open.index(),
        ));
    }

    Ok(selectors)
}

fn parse_slice_or_index(it: &mut Tokens) -> Result<Selector, JSONPathError> {
    let token = it.next().expect("expected an index or slice");

    if token.kind == Colon || peek(it).kind == Colon {
        // A slice. `token` is its start, or the colon following an
        // omitted start.
        let mut start: Option<i64> = None;
        let mut end: Option<i64> = None;
        let mut step: Option<i64> = None;

        if let Token {
            kind: Index { ref value },
            span,
        } = token
        {
            start = Some(parse_path_int(value, span.0)?);
            it.next(); // the colon following the start
        }

        // The end, or a colon when the end is omitted.
        if matches!(peek(it).kind, Index { .. } | Colon) {
            if let Token {
                kind: Index { ref value },
                span,
            } = it.next().expect("peeked an index or colon")
            {
                end = Some(parse_path_int(value, span.0)?);
                if peek(it).kind == Colon {
                    it.next();
                }
            }
        }

        if matches!(peek(it).kind, Index { .. }) {
            if let Token {
                kind: Index { ref value },
                span,
            } = it.next().expect("peeked an index")
            {
                step = Some(parse_path_int(value, span.0)?);
            }
        }

        Ok(Selector::Slice(SliceSelector::from_parts(start, end, step)))
    } else {
        match token {
            Token {
                kind: Index { ref value },
                span,
            } => Ok(Selector::Index(parse_path_int(value, span.0)?)),
            token => Err(JSONPathError::syntax(
                format!("expected an index, found {}", token.kind),
                token.index(),
            )),
        }
    }
}

// Parse an integer used as an index or slice part, which must be in the
// interval [-(2^53)+1, (2^53)-1] with no leading zeros. Textual `-0` is
// rejected here, not by the lexer.
fn parse_path_int(value: &str, index: usize) -> Result<i64, JSONPathError> {
    if value == "-0" || (value.len() > 1 && (value.starts_with('0') || value.starts_with("-0"))) {
        return Err(JSONPathError::syntax(
            format!("invalid integer path value \"{}\"", value),
            index,
        ));
    }

    let parsed = value.parse::<i64>().map_err(|_| {
        JSONPathError::syntax(format!("cannot parse \"{}\", value out of range", value), index)
    })?;

    if !(MIN_PATH_INT..=MAX_PATH_INT).contains(&parsed) {
        return Err(JSONPathError::syntax(
            format!("cannot parse \"{}\", value out of range", value),
            index,
        ));
    }

    Ok(parsed)
}

fn parse_logical_or(it: &mut Tokens) -> Result<LogicalOr, JSONPathError> {
    let mut ands = vec![parse_logical_and(it)?];
    while matches!(peek(it).kind, Or) {
        it.next();
        ands.push(parse_logical_and(it)?);
    }
    Ok(LogicalOr(ands))
}

fn parse_logical_and(it: &mut Tokens) -> Result<LogicalAnd, JSONPathError> {
    let mut exprs = vec![parse_basic_expr(it)?];
    while matches!(peek(it).kind, And) {
        it.next();
        exprs.push(parse_basic_expr(it)?);
    }
    Ok(LogicalAnd(exprs))
}

fn parse_basic_expr(it: &mut Tokens) -> Result<BasicExpr, JSONPathError> {
    match peek(it) {
        Token { kind: Not, .. } => {
            it.next();
            match peek(it) {
                Token { kind: LParen, .. } => {
                    it.next();
                    Ok(BasicExpr::NotParen(parse_paren_inner(it)?))
                }
                Token {
                    kind: Function { .. },
                    ..
                } => {
                    let function = parse_function_call(it)?;
                    if function.result_type() == FuncType::Logical {
                        Ok(BasicExpr::NotFuncCall(function))
                    } else {
                        Err(JSONPathError::typ(
                            String::from("missing comparison to function result"),
                            peek(it).index(),
                        ))
                    }
                }
                Token {
                    kind: Current | Root,
                    ..
                } => Ok(BasicExpr::NotExist(parse_filter_query(it)?)),
                token => Err(unexpected(token)),
            }
        }
        Token { kind: LParen, .. } => {
            it.next();
            Ok(BasicExpr::Paren(parse_paren_inner(it)?))
        }
        Token {
            kind:
                DoubleQuoteString { .. } | SingleQuoteString { .. } | Int { .. } | Float { .. } | True
                | False | Null,
            ..
        } => {
            // A literal is only valid as a comparison operand.
            let literal = parse_literal(it)?;
            let comparison = parse_comparison(it, CompVal::Literal(literal))?;
            Ok(BasicExpr::Comparison(comparison))
        }
        Token {
            kind: Function { .. },
            span,
        } => {
            let index = span.0;
            let function = parse_function_call(it)?;
            if function.result_type() == FuncType::Logical {
                Ok(BasicExpr::FuncCall(function))
            } else if is_comparison_op(&peek(it).kind) {
                let left = comparable_function(function, index)?;
                Ok(BasicExpr::Comparison(parse_comparison(it, left)?))
            } else {
                Err(JSONPathError::typ(
                    String::from("missing comparison to function result"),
                    peek(it).index(),
                ))
            }
        }
        Token {
            kind: Current | Root,
            ..
        } => {
            let query = parse_filter_query(it)?;
            if query.is_singular() && is_comparison_op(&peek(it).kind) {
                let left = CompVal::SingularQuery(SingularQueryExpr::from_query(query));
                Ok(BasicExpr::Comparison(parse_comparison(it, left)?))
            } else {
                Ok(BasicExpr::Exist(query))
            }
        }
        token => Err(unexpected(token)),
    }
}

fn parse_paren_inner(it: &mut Tokens) -> Result<LogicalOr, JSONPathError> {
    let expression = parse_logical_or(it)?;
    match it.next().unwrap_or(EOQ_TOKEN) {
        Token { kind: RParen, .. } => Ok(expression),
        token => Err(JSONPathError::syntax(
            format!("expected ')' but found {}", token.kind),
            token.index(),
        )),
    }
}

fn parse_filter_query(it: &mut Tokens) -> Result<Query, JSONPathError> {
    let root = matches!(it.next().unwrap_or(EOQ_TOKEN).kind, Root);
    let segments = parse_segments(it)?;
    Ok(Query { root, segments })
}

fn parse_literal(it: &mut Tokens) -> Result<Value, JSONPathError> {
    let token = it.next().unwrap_or(EOQ_TOKEN);
    match token {
        Token {
            kind: DoubleQuoteString { ref value },
            span,
        } => Ok(Value::String(unescape_string(value, span.0)?)),
        Token {
            kind: SingleQuoteString { ref value },
            span,
        } => Ok(Value::String(unescape_string(
            &value.replace("\\'", "'"),
            span.0,
        )?)),
        Token {
            kind: Int { ref value },
            span,
        } => {
            let parsed = value.parse::<i64>().map_err(|_| {
                JSONPathError::syntax(
                    format!("cannot parse \"{}\", value out of range", value),
                    span.0,
                )
            })?;
            Ok(Value::from(parsed))
        }
        Token {
            kind: Float { ref value },
            span,
        } => {
            let parsed = value.parse::<f64>().ok().filter(|f| f.is_finite());
            match parsed {
                Some(float) => Ok(Value::from(float)),
                None => Err(JSONPathError::syntax(
                    format!("cannot parse \"{}\", value out of range", value),
                    span.0,
                )),
            }
        }
        Token { kind: True, .. } => Ok(Value::Bool(true)),
        Token { kind: False, .. } => Ok(Value::Bool(false)),
        Token { kind: Null, .. } => Ok(Value::Null),
        token => Err(unexpected(&token)),
    }
}

fn is_comparison_op(kind: &TokenType) -> bool {
    matches!(kind, Eq | Ne | Lt | Le | Gt | Ge)
}

fn parse_comparison(it: &mut Tokens, left: CompVal) -> Result<ComparisonExpr, JSONPathError> {
    let op = parse_comparison_op(it)?;
    let right = parse_comp_val(it)?;
    Ok(ComparisonExpr::new(left, op, right))
}

fn parse_comparison_op(it: &mut Tokens) -> Result<CompOp, JSONPathError> {
    let token = it.next().unwrap_or(EOQ_TOKEN);
    match token.kind {
        Eq => Ok(CompOp::Eq),
        Ne => Ok(CompOp::Ne),
        Lt => Ok(CompOp::Lt),
        Le => Ok(CompOp::Le),
        Gt => Ok(CompOp::Gt),
        Ge => Ok(CompOp::Ge),
        _ => Err(JSONPathError::syntax(
            String::from("invalid comparison operator"),
            token.index(),
        )),
    }
}

fn parse_comp_val(it: &mut Tokens) -> Result<CompVal, JSONPathError> {
    match peek(it) {
        Token {
            kind:
                DoubleQuoteString { .. } | SingleQuoteString { .. } | Int { .. } | Float { .. } | True
                | False | Null,
            ..
        } => Ok(CompVal::Literal(parse_literal(it)?)),
        Token {
            kind: Current | Root,
            ..
        } => Ok(CompVal::SingularQuery(parse_singular_query(it)?)),
        Token {
            kind: Function { .. },
            span,
        } => {
            let index = span.0;
            let function = parse_function_call(it)?;
            comparable_function(function, index)
        }
        token => Err(unexpected(token)),
    }
}

// A comparable function call must return ValueType.
fn comparable_function(function: FunctionExpr, index: usize) -> Result<CompVal, JSONPathError> {
    match function.result_type() {
        FuncType::Value => Ok(CompVal::FuncCall(function)),
        FuncType::Logical => Err(JSONPathError::typ(
            String::from("cannot compare result of logical function"),
            index,
        )),
        _ => Err(JSONPathError::typ(
            String::from("cannot compare result of nodes function"),
            index,
        )),
    }
}

// Parse a comparison operand of the form `@...` or `$...`, which may hold
// only name and index selectors.
fn parse_singular_query(it: &mut Tokens) -> Result<SingularQueryExpr, JSONPathError> {
    let relative = matches!(it.next().unwrap_or(EOQ_TOKEN).kind, Current);
    let mut selectors: Vec<Selector> = Vec::new();

    loop {
        match peek(it) {
            Token {
                kind: Name { value },
                ..
            } => {
                let name = value.to_string();
                it.next();
                selectors.push(Selector::Name(name));
            }
            Token { kind: LBracket, .. } => {
                it.next();
                match peek(it) {
                    Token {
                        kind: DoubleQuoteString { value },
                        span,
                    } => {
                        let name = unescape_string(value, span.0)?;
                        it.next();
                        selectors.push(Selector::Name(name));
                    }
                    Token {
                        kind: SingleQuoteString { value },
                        span,
                    } => {
                        let name = unescape_string(&value.replace("\\'", "'"), span.0)?;
                        it.next();
                        selectors.push(Selector::Name(name));
                    }
                    Token {
                        kind: Index { value },
                        span,
                    } => {
                        let index = parse_path_int(value, span.0)?;
                        it.next();
                        selectors.push(Selector::Index(index));
                    }
                    token => return Err(unexpected(token)),
                }
                match it.next().unwrap_or(EOQ_TOKEN) {
                    Token { kind: RBracket, .. } => (),
                    token => return Err(unexpected(&token)),
                }
            }
            _ => break,
        }
    }

    Ok(SingularQueryExpr::new(relative, selectors))
}

fn parse_function_call(it: &mut Tokens) -> Result<FunctionExpr, JSONPathError> {
    let token = it.next().expect("expected a function token");
    let (name, name_index, paren_index) = match &token {
        Token {
            kind: Function { name },
            span,
        } => (name.to_string(), span.0, span.1),
        token => return Err(unexpected(token)),
    };

    let args = parse_function_args(it)?;

    FunctionExpr::new(&name, args).map_err(|err| match err {
        FunctionExprError::Unregistered { .. } => JSONPathError::name(err.to_string(), name_index),
        FunctionExprError::Invalid { .. } => JSONPathError::typ(err.to_string(), paren_index),
    })
}

fn parse_function_args(it: &mut Tokens) -> Result<Vec<FunctionExprArg>, JSONPathError> {
    let mut args: Vec<FunctionExprArg> = Vec::new();
    loop {
        if matches!(peek(it).kind, RParen) {
            it.next();
            return Ok(args);
        }

        args.push(parse_function_arg(it)?);

        match peek(it) {
            Token { kind: RParen, .. } => continue,
            Token { kind: Comma, .. } => {
                it.next();
                if matches!(peek(it).kind, RParen) {
                    return Err(unexpected(peek(it)));
                }
            }
            token => return Err(unexpected(token)),
        }
    }
}

// A function argument is a literal, a filter query, a logical expression
// (including a bare comparison), or a nested function call.
fn parse_function_arg(it: &mut Tokens) -> Result<FunctionExprArg, JSONPathError> {
    match peek(it) {
        Token {
            kind:
                DoubleQuoteString { .. } | SingleQuoteString { .. } | Int { .. } | Float { .. } | True
                | False | Null,
            ..
        } => {
            let literal = parse_literal(it)?;
            if is_comparison_op(&peek(it).kind) {
                let comparison = parse_comparison(it, CompVal::Literal(literal))?;
                logical_arg(it, BasicExpr::Comparison(comparison))
            } else if matches!(peek(it).kind, And | Or) {
                Err(JSONPathError::typ(
                    String::from("filter expression literals must be compared"),
                    peek(it).index(),
                ))
            } else {
                Ok(FunctionExprArg::Literal(literal))
            }
        }
        Token {
            kind: Current | Root,
            ..
        } => {
            let query = parse_filter_query(it)?;
            if is_comparison_op(&peek(it).kind) {
                if !query.is_singular() {
                    return Err(unexpected(peek(it)));
                }
                let left = CompVal::SingularQuery(SingularQueryExpr::from_query(query));
                let comparison = parse_comparison(it, left)?;
                logical_arg(it, BasicExpr::Comparison(comparison))
            } else if matches!(peek(it).kind, And | Or) {
                logical_arg(it, BasicExpr::Exist(query))
            } else if query.is_singular() {
                Ok(FunctionExprArg::SingularQuery(SingularQueryExpr::from_query(
                    query,
                )))
            } else {
                Ok(FunctionExprArg::FilterQuery(query))
            }
        }
        Token {
            kind: Function { .. },
            span,
        } => {
            let index = span.0;
            let function = parse_function_call(it)?;
            if is_comparison_op(&peek(it).kind) {
                let left = comparable_function(function, index)?;
                let comparison = parse_comparison(it, left)?;
                logical_arg(it, BasicExpr::Comparison(comparison))
            } else if matches!(peek(it).kind, And | Or) {
                if function.result_type() == FuncType::Logical {
                    logical_arg(it, BasicExpr::FuncCall(function))
                } else {
                    Err(JSONPathError::typ(
                        String::from("missing comparison to function result"),
                        peek(it).index(),
                    ))
                }
            } else {
                Ok(FunctionExprArg::FunctionExpr(function))
            }
        }
        Token {
            kind: Not | LParen, ..
        } => {
            let expression = parse_basic_expr(it)?;
            logical_arg(it, expression)
        }
        token => Err(unexpected(token)),
    }
}

// Fold any trailing `&&`/`||` clauses onto `first` and wrap the result as
// a logical-typed argument.
fn logical_arg(it: &mut Tokens, first: BasicExpr) -> Result<FunctionExprArg, JSONPathError> {
    let mut and_exprs = vec![first];
    while matches!(peek(it).kind, And) {
        it.next();
        and_exprs.push(parse_basic_expr(it)?);
    }

    let mut ands = vec![LogicalAnd(and_exprs)];
    while matches!(peek(it).kind, Or) {
        it.next();
        ands.push(parse_logical_and(it)?);
    }

    Ok(FunctionExprArg::LogicalExpr(LogicalOr(ands)))
}

fn unescape_string(value: &str, offset: usize) -> Result<String, JSONPathError> {
    let chars: Vec<char> = value.chars().collect();
    let length = chars.len();
    let mut rv = String::with_capacity(value.len());
    let mut index = 0;

    while index < length {
        let error_index = offset + index;
        match chars[index] {
            '\\' => {
                index += 1;
                if index >= length {
                    return Err(JSONPathError::syntax(
                        String::from("invalid escape sequence"),
                        error_index,
                    ));
                }
                match chars[index] {
                    '"' => rv.push('"'),
                    '\\' => rv.push('\\'),
                    '/' => rv.push('/'),
                    'b' => rv.push('\u{0008}'),
                    'f' => rv.push('\u{000C}'),
                    'n' => rv.push('\n'),
                    'r' => rv.push('\r'),
                    't' => rv.push('\t'),
                    'u' => {
                        let (ch, consumed) = unescape_unicode(&chars, index, error_index)?;
                        rv.push(ch);
                        index += consumed;
                    }
                    _ => {
                        return Err(JSONPathError::syntax(
                            String::from("invalid escape sequence"),
                            error_index,
                        ));
                    }
                }
            }
            ch if (ch as u32) <= 0x1F => {
                return Err(JSONPathError::syntax(
                    String::from("invalid character"),
                    error_index,
                ));
            }
            ch => rv.push(ch),
        }
        index += 1;
    }

    Ok(rv)
}

// Decode the `\uXXXX` escape whose `u` sits at `chars[index]`, including
// a following low surrogate escape when required. Returns the decoded
// character and the number of characters consumed past the `u`.
fn unescape_unicode(
    chars: &[char],
    index: usize,
    error_index: usize,
) -> Result<(char, usize), JSONPathError> {
    let invalid = || JSONPathError::syntax(String::from("invalid \\uXXXX escape"), error_index);
    let length = chars.len();

    if index + 4 >= length {
        return Err(invalid());
    }
    let digits: String = chars[index + 1..index + 5].iter().collect();
    let code_point = u32::from_str_radix(&digits, 16).map_err(|_| invalid())?;

    if is_low_surrogate(code_point) {
        return Err(JSONPathError::syntax(
            String::from("unexpected low surrogate code point"),
            error_index,
        ));
    }

    if is_high_surrogate(code_point) {
        // A high surrogate must pair with an immediately following
        // `\uXXXX` low surrogate.
        if !(index + 10 < length && chars[index + 5] == '\\' && chars[index + 6] == 'u') {
            return Err(invalid());
        }
        let digits: String = chars[index + 7..index + 11].iter().collect();
        let low = u32::from_str_radix(&digits, 16).map_err(|_| invalid())?;
        if !is_low_surrogate(low) {
            return Err(JSONPathError::syntax(
                String::from("unexpected code point"),
                error_index,
            ));
        }

        let combined = 0x10000 + (((code_point & 0x03FF) << 10) | (low & 0x03FF));
        let ch = char::from_u32(combined).ok_or_else(invalid)?;
        return Ok((ch, 10));
    }

    match char::from_u32(code_point) {
        Some(ch) => Ok((ch, 4)),
        None => Err(invalid()),
    }
}

fn is_high_surrogate(code_point: u32) -> bool {
    (0xD800..=0xDBFF).contains(&code_point)
}

fn is_low_surrogate(code_point: u32) -> bool {
    (0xDC00..=0xDFFF).contains(&code_point)
}
