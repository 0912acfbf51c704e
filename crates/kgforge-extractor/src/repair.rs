//! Lenient JSON repair for extraction-service output
//!
//! Services wrap JSON in markdown fences, prepend chatter, stop mid-object, leave
//! trailing commas or answer with Python literals. [`repair`] tries a strict parse
//! first and then a fixed sequence of repairs on the first JSON-looking span.

use crate::error::ParseError;
use serde_json::Value;

/// Parse `raw` as JSON, repairing common defects
///
/// Returns [`ParseError::NoJson`] when the text contains no `{` or `[` and is not
/// itself valid JSON.
///
/// # Examples
///
/// ```
/// use kgforge_extractor::repair;
///
/// let value = repair("```json\n{'triples': [['a', 'b', 'c'],],}\n```").unwrap();
/// assert_eq!(value["triples"][0][2], "c");
///
/// let truncated = repair(r#"{"attributes": {"x": ["y"#).unwrap();
/// assert_eq!(truncated["attributes"]["x"][0], "y");
/// ```
pub fn repair(raw: &str) -> Result<Value, ParseError> {
    let text = strip_code_fence(raw.trim());
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    let start = text.find(['{', '[']).ok_or(ParseError::NoJson)?;
    let first = repair_span(&text[start..]);
    if first.as_ref().is_ok_and(holds_object) {
        return first;
    }

    // Chatter like `Note [1]: {...}` opens a bracket before the real object
    match text.find('{') {
        Some(brace) if brace > start => match repair_span(&text[brace..]) {
            Ok(value) if value.is_object() => Ok(value),
            _ => first,
        },
        _ => first,
    }
}

fn holds_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(Value::is_object),
        _ => false,
    }
}

/// Repair the balanced span at the start of `text`
fn repair_span(text: &str) -> Result<Value, ParseError> {
    let span = balanced_span(text);

    let mut last_error = String::new();
    for candidate in [
        span.to_string(),
        normalize(span),
        close_open_brackets(&normalize(span)),
    ] {
        match serde_json::from_str::<Value>(&candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(ParseError::Unrepairable(last_error))
}

/// Drop a surrounding ```` ``` ```` / ```` ```json ```` fence
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// The prefix of `text` up to the bracket closing its first bracket, or all of it
fn balanced_span(text: &str) -> &str {
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &text[..i + c.len_utf8()];
                }
            }
            _ => {}
        }
    }
    text
}

/// Rewrite single-quoted strings, Python literals and trailing commas
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                let (literal, next) = read_string(&chars, i);
                out.push_str(&literal);
                i = next;
                continue;
            }
            ',' => {
                let next_significant = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next_significant, Some('}') | Some(']') | None) {
                    out.push(c);
                }
            }
            _ if c.is_ascii_alphabetic() => {
                let end = chars[i..]
                    .iter()
                    .position(|c| !c.is_ascii_alphanumeric() && *c != '_')
                    .map_or(chars.len(), |offset| i + offset);
                let word: String = chars[i..end].iter().collect();
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
                i = end;
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// Read a quoted string starting at `start`, re-emitted as a JSON string
///
/// An unterminated string runs to the end of the input and is closed.
fn read_string(chars: &[char], start: usize) -> (String, usize) {
    let quote = chars[start];
    let mut out = String::from('"');
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() => {
                let next = chars[i + 1];
                if next == '\'' {
                    out.push('\'');
                } else {
                    out.push('\\');
                    out.push(next);
                }
                i += 2;
                continue;
            }
            c if c == quote => return (out + "\"", i + 1),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => {}
            other => out.push(other),
        }
        i += 1;
    }
    (out + "\"", chars.len())
}

/// Append the closers for every bracket left open (truncated output)
fn close_open_brackets(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = text.trim_end().trim_end_matches(',').to_string();
    if in_string {
        out.push('"');
    }
    // A dangling key (`{"a"` or `{"a":`) gets a null value
    if out.ends_with(':') {
        out.push_str(" null");
    } else if stack.last() == Some(&'}') && ends_with_dangling_key(&out) {
        out.push_str(": null");
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

fn ends_with_dangling_key(text: &str) -> bool {
    if !text.ends_with('"') {
        return false;
    }
    let body = &text[..text.len() - 1];
    let Some(open) = body.rfind('"') else {
        return false;
    };
    let before = body[..open].trim_end();
    before.ends_with('{') || before.ends_with(',')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_json_passes_through() {
        let value = repair(r#"{"triples": [["a", "b", "c"]]}"#).unwrap();
        assert_eq!(value, json!({"triples": [["a", "b", "c"]]}));
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let value = repair("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
        let value = repair("```\n[1, 2]\n```").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_leading_and_trailing_chatter() {
        let value = repair("Here is the result: {\"a\": [1]} Hope this helps!").unwrap();
        assert_eq!(value, json!({"a": [1]}));
    }

    #[test]
    fn test_bracketed_note_before_object() {
        let value = repair(r#"Note [1]: {"triples": [["a", "b", "c"]]}"#).unwrap();
        assert_eq!(value, json!({"triples": [["a", "b", "c"]]}));

        let value = repair("See [1, 2] for details.").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_trailing_commas() {
        let value = repair(r#"{"a": [1, 2,], "b": {"c": 3,},}"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2], "b": {"c": 3}}));
    }

    #[test]
    fn test_single_quotes_and_python_literals() {
        let value = repair("{'a': 'it\\'s', 'b': True, 'c': None, 'd': \"say \\\"hi\\\"\"}").unwrap();
        assert_eq!(value, json!({"a": "it's", "b": true, "c": null, "d": "say \"hi\""}));
    }

    #[test]
    fn test_embedded_double_quote_in_single_quoted_string() {
        let value = repair(r#"{'name': '6" pipe'}"#).unwrap();
        assert_eq!(value, json!({"name": "6\" pipe"}));
    }

    #[test]
    fn test_truncated_output_is_closed() {
        let value = repair(r#"{"attributes": {"AHU": ["model: X"#).unwrap();
        assert_eq!(value, json!({"attributes": {"AHU": ["model: X"]}}));

        let value = repair(r#"{"triples": [["a", "b", "c"], ["d""#).unwrap();
        assert_eq!(value, json!({"triples": [["a", "b", "c"], ["d"]]}));
    }

    #[test]
    fn test_dangling_key_gets_null() {
        let value = repair(r#"{"a": 1, "b""#).unwrap();
        assert_eq!(value, json!({"a": 1, "b": null}));
        let value = repair(r#"{"a": 1, "b":"#).unwrap();
        assert_eq!(value, json!({"a": 1, "b": null}));
    }

    #[test]
    fn test_unquoted_words_inside_strings_untouched() {
        let value = repair("{'a': 'True story',}").unwrap();
        assert_eq!(value, json!({"a": "True story"}));
    }

    #[test]
    fn test_json_string_literal_is_a_string() {
        let value = repair(r#""just text""#).unwrap();
        assert_eq!(value, json!("just text"));
    }

    #[test]
    fn test_no_json() {
        assert_eq!(repair("I could not find anything."), Err(ParseError::NoJson));
        assert_eq!(repair(""), Err(ParseError::NoJson));
    }

    #[test]
    fn test_unrepairable() {
        assert!(matches!(repair("{ : : }"), Err(ParseError::Unrepairable(_))));
    }
}
