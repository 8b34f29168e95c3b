//! Lenient JSON parsing for model output.
//!
//! Model replies wrap JSON in prose or code fences and often contain small
//! syntax defects. [`parse_lenient`] extracts the first balanced `{...}` block,
//! tries a strict parse, then applies [`REPAIRS`] in order and retries once.
//! The value accessors at the bottom coerce loosely-typed fields.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("JSON could not be repaired: {source}")]
    Unparseable {
        #[source]
        source: serde_json::Error,
    },
}

/// A single textual repair step
pub type Repair = fn(&str) -> String;

/// Repairs applied, in this order, when a strict parse fails
pub const REPAIRS: &[(&str, Repair)] = &[
    ("trailing_commas", strip_trailing_commas),
    ("single_quotes", convert_single_quotes),
    ("control_chars", strip_control_chars),
    ("empty_values", fill_empty_values),
];

/// Parse the first JSON object in `text`, repairing it once if needed
pub fn parse_lenient(text: &str) -> Result<Value, ParseError> {
    let block = extract_json_block(text).ok_or(ParseError::NoJsonObject)?;

    match serde_json::from_str::<Value>(block) {
        Ok(value) => Ok(value),
        Err(first) => {
            tracing::debug!(error = %first, "strict JSON parse failed, applying repairs");
            let repaired = repair(block);
            serde_json::from_str(&repaired).map_err(|source| ParseError::Unparseable { source })
        }
    }
}

/// Apply every repair in [`REPAIRS`] order
pub fn repair(text: &str) -> String {
    REPAIRS
        .iter()
        .fold(text.to_string(), |acc, (_, step)| step(&acc))
}

/// Find the first balanced brace-delimited block, ignoring braces in strings.
///
/// Single-quoted strings follow the same closing rule as
/// [`convert_single_quotes`], so apostrophes inside them do not end the string.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                let rest = &text[start + offset + c.len_utf8()..];
                if q == '"' || closes_single_quote(rest.chars()) {
                    quote = None;
                }
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("valid regex"))
}

fn empty_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"":\s*([,}\]])"#).expect("valid regex"))
}

/// `{"a": 1,}` becomes `{"a": 1}`
pub fn strip_trailing_commas(text: &str) -> String {
    trailing_comma_re().replace_all(text, "$1").into_owned()
}

/// Convert single-quoted keys and strings to double-quoted ones.
///
/// A single quote opens a string only outside double-quoted strings, and closes
/// it only when followed by `,` `:` `}` `]` or the end, so apostrophes inside
/// words survive.
pub fn convert_single_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_double {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_double = false;
            }
        } else if in_single {
            if c == '\\' && i + 1 < chars.len() {
                if chars[i + 1] == '\'' {
                    out.push('\'');
                } else {
                    out.push('\\');
                    out.push(chars[i + 1]);
                }
                i += 2;
                continue;
            }
            if c == '\'' && closes_single_quote(chars[i + 1..].iter().copied()) {
                out.push('"');
                in_single = false;
            } else if c == '"' {
                out.push_str("\\\"");
            } else {
                out.push(c);
            }
        } else {
            match c {
                '"' => {
                    in_double = true;
                    out.push(c);
                }
                '\'' => {
                    in_single = true;
                    out.push('"');
                }
                _ => out.push(c),
            }
        }
        i += 1;
    }
    out
}

fn closes_single_quote(mut rest: impl Iterator<Item = char>) -> bool {
    rest.find(|c| !c.is_whitespace())
        .map_or(true, |c| matches!(c, ',' | ':' | '}' | ']'))
}

/// Drop control characters; raw newlines and tabs inside strings become spaces
pub fn strip_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if c.is_control() {
            let whitespace = matches!(c, '\n' | '\r' | '\t');
            if in_string {
                if whitespace {
                    out.push(' ');
                }
            } else if whitespace {
                out.push(c);
            }
            escaped = false;
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    out
}

/// `{"a": , "b": }` becomes `{"a": null, "b": null}`
pub fn fill_empty_values(text: &str) -> String {
    empty_value_re()
        .replace_all(text, "\": null$1")
        .into_owned()
}

/// First present field among `keys`, skipping nulls
pub fn pick<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find(|v| !v.is_null())
}

/// Scalar rendered as a trimmed string
pub fn string_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First string field among `keys`, or empty
pub fn string_field(value: &Value, keys: &[&str]) -> String {
    pick(value, keys).and_then(string_of).unwrap_or_default()
}

/// Coerce a value into a list of non-empty strings.
///
/// Arrays keep their scalar items and the first text-like field of object
/// items; a bare string is split into lines with bullet markers removed.
pub fn string_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(_) => pick(
                    item,
                    &["text", "item", "name", "value", "title", "description"],
                )
                .and_then(string_of),
                other => string_of(other),
            })
            .collect(),
        Value::String(s) => s
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
            .collect(),
        Value::Null => Vec::new(),
        other => string_of(other).into_iter().collect(),
    };
    items.into_iter().filter(|s| !s.is_empty()).collect()
}

/// First list field among `keys`, or empty
pub fn list_field(value: &Value, keys: &[&str]) -> Vec<String> {
    pick(value, keys).map(string_list).unwrap_or_default()
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"))
}

/// Numeric value of a number or a numeric-looking string (`"7.5"`, `"8/10"`)
pub fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => number_re()
            .find(s.trim())
            .and_then(|m| m.as_str().parse::<f64>().ok()),
        _ => None,
    }
}

/// Non-negative integer field, tolerating strings and floats
pub fn count_field(value: &Value, keys: &[&str]) -> Option<u32> {
    pick(value, keys)
        .and_then(number_of)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u32)
}
