//! Literal and expression parsing for command bodies.
//!
//! Literals are typed by shape alone: quoted text, `true`/`false`, signed
//! integers, and everything else as bare text. Expression bodies are split on
//! commas that sit outside quotes, then on the first `=`.

use crate::db_types::{Assignments, Filter, Value};
use crate::error::{DbError, Result};

/// Converts a single token into a typed value. Never fails.
pub fn parse_literal(token: &str) -> Value {
    if let Some(inner) = strip_quotes(token) {
        return Value::Text(inner.to_string());
    }

    if token.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if is_integer(token) {
        // Out-of-range digit strings stay text.
        if let Ok(i) = token.parse::<i64>() {
            return Value::Int(i);
        }
    }

    Value::Text(token.to_string())
}

fn strip_quotes(token: &str) -> Option<&str> {
    let bytes = token.as_bytes();
    let first = *bytes.first()?;
    if bytes.len() >= 2 && (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

/// `token` without a matching pair of surrounding quotes, if it has one.
pub fn unquote(token: &str) -> &str {
    strip_quotes(token).unwrap_or(token)
}

fn is_integer(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Splits `text` at every char matching `is_delim` that is not inside a
/// single- or double-quoted run. Quote characters are kept in the pieces.
/// Each piece comes with its byte offset into `text`.
pub fn split_unquoted(text: &str, is_delim: impl Fn(char) -> bool) -> Result<Vec<(usize, &str)>> {
    let mut pieces = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if is_delim(ch) => {
                pieces.push((start, &text[start..i]));
                start = i + ch.len_utf8();
            }
            None => {}
        }
    }

    if let Some(q) = quote {
        return Err(DbError::parse(format!("unbalanced quotes ({}) in: {}", q, text)));
    }
    pieces.push((start, &text[start..]));
    Ok(pieces)
}

fn split_commas(text: &str) -> Result<Vec<&str>> {
    Ok(split_unquoted(text, |c| c == ',')?
        .into_iter()
        .map(|(_, piece)| piece.trim())
        .filter(|piece| !piece.is_empty())
        .collect())
}

/// `(v1, v2, ...)` -> values, in order. The parentheses are optional.
pub fn parse_value_list(text: &str) -> Result<Vec<Value>> {
    let mut body = text.trim();
    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        body = inner;
    }

    Ok(split_commas(body)?.into_iter().map(parse_literal).collect())
}

fn parse_equality(segment: &str) -> Result<(String, Value)> {
    let (key, value) = segment.split_once('=').ok_or_else(|| {
        DbError::parse(format!("expected <column> = <value>, got: {}", segment))
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(DbError::parse(format!("missing column name in: {}", segment)));
    }
    Ok((key.to_string(), parse_literal(value.trim())))
}

/// `a = 1, b = "x"` -> ordered assignments. Later duplicates win.
pub fn parse_assignment_map(text: &str) -> Result<Assignments> {
    let mut assignments = Assignments::new();
    for segment in split_commas(text)? {
        let (key, value) = parse_equality(segment)?;
        assignments.insert(key, value);
    }
    Ok(assignments)
}

/// `col = value`, a single equality split on the first `=`.
pub fn parse_filter(text: &str) -> Result<Filter> {
    let (key, value) = parse_equality(text.trim())?;
    let mut filter = Filter::new();
    filter.insert(key, value);
    Ok(filter)
}
