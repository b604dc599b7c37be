//! JSON Scrubbing
//!
//! Models emit almost-JSON: `//` commentary, `/* */` blocks, and trailing
//! commas before closing brackets. serde_json has no lenient mode, so the
//! scrubber rewrites a candidate into strict JSON with a character scanner
//! that respects string literals, then the strict parser runs again.

use serde_json::{Map, Value};

/// Remove `//` line comments and `/* */` block comments outside string
/// literals.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
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
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    chars.next();
                    for next in chars.by_ref() {
                        if next == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for next in chars.by_ref() {
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out
}

/// Remove commas immediately followed — ignoring whitespace — by a closing
/// bracket, outside string literals.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
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
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Rewrite an almost-JSON candidate into strict JSON.
pub fn scrub(text: &str) -> String {
    strip_trailing_commas(&strip_comments(text))
}

/// Parse a candidate into a JSON object: strict first, scrubbed second.
/// Arrays and scalars are rejected — a plan is always an object.
pub fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
        return Some(map);
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&scrub(candidate)) {
        return Some(map);
    }
    None
}
