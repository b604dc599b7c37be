//! Field Normalization
//!
//! Applies the plan schema to the winning JSON object. Liberal about
//! synonym key names, bullet-string items, and decorated paths, but never
//! inventing data: an entry either normalizes fully or is dropped.

use serde_json::{Map, Value};

use draftsmith_core::plan::{CommandRequest, FileAction, FileActionKind, Plan, Step};

use crate::RecoveryError;

/// Normalize the winning object into a `Plan`.
///
/// `summary` must be a non-empty string; `message` may be empty or absent;
/// every sequence field tolerates synonym keys and drops malformed entries.
pub fn normalize_plan(object: &Map<String, Value>) -> Result<Plan, RecoveryError> {
    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            RecoveryError::UnrecoverableFormat(
                "plan object lacks a non-empty summary string".to_string(),
            )
        })?
        .to_string();

    let message = object
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();

    Ok(Plan {
        summary,
        message,
        steps: normalize_steps(lookup(object, &["steps", "plan", "tasks"])),
        live_log: normalize_string_list(object, &["liveLog", "live_log", "log", "logs"]),
        qa_findings: normalize_string_list(object, &["qaFindings", "qa_findings", "findings"]),
        test_results: normalize_string_list(object, &["testResults", "test_results", "tests"]),
        command_requests: normalize_commands(lookup(
            object,
            &[
                "commandRequests",
                "command_requests",
                "commands",
                "shellCommands",
                "shell_commands",
            ],
        )),
        file_actions: normalize_file_actions(lookup(
            object,
            &[
                "fileActions",
                "file_actions",
                "files",
                "fileChanges",
                "file_changes",
                "actions",
                "edits",
            ],
        )),
    })
}

/// First value present under any of the given keys, in key order.
fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

/// Trimmed non-empty string from an optional value.
fn text_of(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn normalize_steps(value: Option<&Value>) -> Vec<Step> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items.iter().filter_map(step_from_value).collect()
}

fn step_from_value(item: &Value) -> Option<Step> {
    match item {
        Value::String(raw) => {
            let title = strip_wrappers(strip_list_prefix(raw.trim()));
            if title.is_empty() {
                None
            } else {
                Some(Step::titled(title))
            }
        }
        Value::Object(map) => {
            let title = text_of(map.get("title"))?;
            Some(Step {
                title,
                detail: text_of(lookup(map, &["detail", "description"])),
                result: text_of(lookup(map, &["result", "outcome"])),
            })
        }
        _ => None,
    }
}

fn normalize_string_list(object: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let Some(value) = lookup(object, keys) else {
        return Vec::new();
    };
    let Value::Array(items) = value else {
        tracing::warn!(field = keys[0], "expected an array, dropping field");
        return Vec::new();
    };

    let kept: Vec<String> = items
        .iter()
        .filter_map(|item| item.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if !items.is_empty() && kept.is_empty() {
        tracing::warn!(field = keys[0], "array present but every entry was rejected");
    }
    kept
}

fn normalize_commands(value: Option<&Value>) -> Vec<CommandRequest> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items.iter().filter_map(command_from_value).collect()
}

fn command_from_value(item: &Value) -> Option<CommandRequest> {
    match item {
        Value::String(raw) => command_from_string(raw),
        Value::Object(map) => {
            let command = text_of(lookup(map, &["command", "cmd"]))?;
            Some(CommandRequest {
                command,
                description: text_of(lookup(map, &["description", "desc"])),
            })
        }
        _ => None,
    }
}

/// Shared string grammar for bullet-style items:
/// `- mkdir out - make output dir` → command `mkdir out`,
/// description `make output dir`.
fn command_from_string(raw: &str) -> Option<CommandRequest> {
    let cleaned = strip_list_prefix(raw.trim());
    let (head, description) = split_description(cleaned);
    let command = strip_wrappers(head);
    if command.is_empty() {
        return None;
    }
    Some(CommandRequest {
        command: command.to_string(),
        description: description.map(String::from),
    })
}

fn normalize_file_actions(value: Option<&Value>) -> Vec<FileAction> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items.iter().filter_map(file_action_from_value).collect()
}

fn file_action_from_value(item: &Value) -> Option<FileAction> {
    match item {
        Value::String(raw) => file_action_from_string(raw),
        Value::Object(map) => {
            let kind = text_of(lookup(map, &["type", "action", "kind", "op", "operation"]))
                .and_then(|token| normalize_kind(&token))?;
            let raw_path = text_of(lookup(
                map,
                &[
                    "path",
                    "file",
                    "filePath",
                    "file_path",
                    "filename",
                    "file_name",
                    "target",
                ],
            ))?;
            let (path, path_description) = clean_path(&raw_path)?;
            let content = lookup(
                map,
                &[
                    "content",
                    "contents",
                    "text",
                    "body",
                    "code",
                    "lines",
                    "newContent",
                    "new_content",
                ],
            )
            .and_then(content_of);
            let description =
                text_of(lookup(map, &["description", "desc", "reason", "note"]))
                    .or(path_description);
            Some(FileAction {
                kind,
                path,
                content,
                description,
            })
        }
        _ => None,
    }
}

/// Bullet-string form: `- create \`src/app.py\` - entry point`.
fn file_action_from_string(raw: &str) -> Option<FileAction> {
    let cleaned = strip_list_prefix(raw.trim());
    let (verb, rest) = cleaned.split_once(char::is_whitespace)?;
    let kind = normalize_kind(verb)?;
    let (path, description) = clean_path(rest)?;
    Some(FileAction {
        kind,
        path,
        content: None,
        description,
    })
}

/// Normalize a file-action type token, tolerant of case, punctuation, and
/// near-synonyms (`CREATE_FILE`, `Add`, `modify`, `remove`, ...).
fn normalize_kind(token: &str) -> Option<FileActionKind> {
    let folded: String = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if folded.is_empty() {
        return None;
    }

    const CREATE: &[&str] = &["create", "add", "write", "new", "make"];
    const EDIT: &[&str] = &["edit", "update", "modify", "replace", "patch", "change"];
    const DELETE: &[&str] = &["delete", "remove", "drop", "unlink", "erase"];

    // Exact matches first, including the short forms too risky for the
    // substring scan below.
    if folded == "rm" || DELETE.contains(&folded.as_str()) {
        return Some(FileActionKind::Delete);
    }
    if CREATE.contains(&folded.as_str()) {
        return Some(FileActionKind::Create);
    }
    if EDIT.contains(&folded.as_str()) {
        return Some(FileActionKind::Edit);
    }

    // Compound tokens like "create_file" or "FileUpdate".
    for (tokens, kind) in [
        (DELETE, FileActionKind::Delete),
        (EDIT, FileActionKind::Edit),
        (CREATE, FileActionKind::Create),
    ] {
        if tokens.iter().any(|needle| folded.contains(needle)) {
            return Some(kind);
        }
    }
    None
}

/// Strip a decorated path down to the bare path, extracting a trailing
/// ` - description` / em-dash suffix when present.
fn clean_path(raw: &str) -> Option<(String, Option<String>)> {
    let cleaned = strip_list_prefix(raw.trim());
    let (head, description) = split_description(cleaned);
    let path = strip_wrappers(head);
    if path.is_empty() {
        return None;
    }
    Some((path.to_string(), description.map(String::from)))
}

/// Content from a string or an array of lines (joined with newlines).
/// Arrays carrying non-string entries are treated as absent content.
fn content_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let lines: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if lines.len() == items.len() && !items.is_empty() {
                Some(lines.join("\n"))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Strip list-item prefixes: `- `, `* `, `1.`, `(1)`, `a)`.
pub(crate) fn strip_list_prefix(s: &str) -> &str {
    let t = s.trim_start();
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = t.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }

    let (label, parenthesized) = match t.strip_prefix('(') {
        Some(rest) => (rest, true),
        None => (t, false),
    };

    let digits = label.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = &label[digits..];
        let closer = if parenthesized { ")" } else { "." };
        if let Some(rest) = after.strip_prefix(closer).or_else(|| after.strip_prefix(')')) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    } else if !parenthesized {
        // Single-letter labels only with a closing paren ("a) ..."), so
        // ordinary paths like "a.py" are left alone.
        let mut chars = label.chars();
        if let (Some(letter), Some(')')) = (chars.next(), chars.clone().next()) {
            if letter.is_ascii_alphabetic() {
                let rest = &label[letter.len_utf8() + 1..];
                if rest.starts_with(char::is_whitespace) {
                    return rest.trim_start();
                }
            }
        }
    }
    t
}

/// Strip symmetric quote/backtick/emphasis wrappers.
pub(crate) fn strip_wrappers(s: &str) -> &str {
    let mut t = s.trim();
    loop {
        let first = t.chars().next();
        let last = t.chars().last();
        match (first, last) {
            (Some(a), Some(b))
                if a == b
                    && t.chars().count() >= 2
                    && matches!(a, '`' | '"' | '\'' | '*' | '_') =>
            {
                t = t[a.len_utf8()..t.len() - b.len_utf8()].trim();
            }
            _ => return t,
        }
    }
}

/// Split a trailing ` - description` or em-dash-delimited description off
/// an item, returning `(head, description)`.
pub(crate) fn split_description(s: &str) -> (&str, Option<&str>) {
    let dash = s.find(" - ");
    let em_dash = s.find('—');
    let (pos, len) = match (dash, em_dash) {
        (Some(d), Some(e)) if d < e => (d, 3),
        (_, Some(e)) => (e, '—'.len_utf8()),
        (Some(d), None) => (d, 3),
        (None, None) => return (s, None),
    };
    let head = s[..pos].trim_end();
    let tail = s[pos + len..].trim();
    (head, (!tail.is_empty()).then_some(tail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(json: &str) -> Map<String, Value> {
        match serde_json::from_str(json).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_summary_is_required() {
        let result = normalize_plan(&object(r#"{"message": "m"}"#));
        assert!(result.is_err());
        let result = normalize_plan(&object(r#"{"summary": "  ", "message": "m"}"#));
        assert!(result.is_err());
    }

    #[test]
    fn test_message_may_be_empty_or_absent() {
        let plan = normalize_plan(&object(r#"{"summary": "s"}"#)).unwrap();
        assert_eq!(plan.message, "");
    }

    #[test]
    fn test_steps_accept_strings_and_objects() {
        let plan = normalize_plan(&object(
            r#"{"summary": "s", "steps": [
                "- first thing",
                {"title": "second", "description": "with detail", "outcome": "done"},
                {"detail": "no title, dropped"},
                42
            ]}"#,
        ))
        .unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].title, "first thing");
        assert_eq!(plan.steps[1].detail.as_deref(), Some("with detail"));
        assert_eq!(plan.steps[1].result.as_deref(), Some("done"));
    }

    #[test]
    fn test_string_lists_accept_synonyms_and_drop_blanks() {
        let plan = normalize_plan(&object(
            r#"{"summary": "s", "live_log": ["a", "", 3, "b"], "findings": ["f"]}"#,
        ))
        .unwrap();
        assert_eq!(plan.live_log, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(plan.qa_findings, vec!["f".to_string()]);
    }

    #[test]
    fn test_command_string_grammar() {
        let plan = normalize_plan(&object(
            r#"{"summary": "s", "commandRequests": ["- mkdir out - make output dir"]}"#,
        ))
        .unwrap();
        assert_eq!(
            plan.command_requests,
            vec![CommandRequest {
                command: "mkdir out".to_string(),
                description: Some("make output dir".to_string()),
            }]
        );
    }

    #[test]
    fn test_command_objects_require_nonblank_command() {
        let plan = normalize_plan(&object(
            r#"{"summary": "s", "commands": [
                {"command": "cargo test", "desc": "run tests"},
                {"command": "   "},
                {"description": "no command"}
            ]}"#,
        ))
        .unwrap();
        assert_eq!(plan.command_requests.len(), 1);
        assert_eq!(plan.command_requests[0].command, "cargo test");
        assert_eq!(
            plan.command_requests[0].description.as_deref(),
            Some("run tests")
        );
    }

    #[test]
    fn test_file_action_type_token_tolerance() {
        for (token, kind) in [
            ("CREATE_FILE", FileActionKind::Create),
            ("Add", FileActionKind::Create),
            ("write", FileActionKind::Create),
            ("update", FileActionKind::Edit),
            ("Modify-File", FileActionKind::Edit),
            ("remove", FileActionKind::Delete),
            ("rm", FileActionKind::Delete),
        ] {
            assert_eq!(normalize_kind(token), Some(kind), "token {token}");
        }
        assert_eq!(normalize_kind("rename"), None);
    }

    #[test]
    fn test_file_action_object_with_contents_lines() {
        let plan = normalize_plan(&object(
            r#"{"summary":"ok","message":"m","fileActions":[
                {"type":"CREATE_FILE","file":"a.py","contents":["print(1)",""]}
            ]}"#,
        ))
        .unwrap();
        assert_eq!(
            plan.file_actions,
            vec![FileAction {
                kind: FileActionKind::Create,
                path: "a.py".to_string(),
                content: Some("print(1)\n".to_string()),
                description: None,
            }]
        );
    }

    #[test]
    fn test_file_action_path_decorations_are_stripped() {
        let plan = normalize_plan(&object(
            r#"{"summary": "s", "files": [
                {"type": "edit", "path": "- `src/main.rs` - wire the new module"}
            ]}"#,
        ))
        .unwrap();
        let action = &plan.file_actions[0];
        assert_eq!(action.path, "src/main.rs");
        assert_eq!(action.description.as_deref(), Some("wire the new module"));
    }

    #[test]
    fn test_file_action_bullet_string() {
        let plan = normalize_plan(&object(
            r#"{"summary": "s", "fileActions": ["- create **out/report.md** — summary file"]}"#,
        ))
        .unwrap();
        let action = &plan.file_actions[0];
        assert_eq!(action.kind, FileActionKind::Create);
        assert_eq!(action.path, "out/report.md");
        assert_eq!(action.description.as_deref(), Some("summary file"));
    }

    #[test]
    fn test_malformed_file_actions_are_dropped_not_patched() {
        let plan = normalize_plan(&object(
            r#"{"summary": "s", "fileActions": [
                {"type": "create", "path": "keep.txt"},
                {"type": "conjure", "path": "bad-kind.txt"},
                {"type": "create"},
                "not an action at all"
            ]}"#,
        ))
        .unwrap();
        assert_eq!(plan.file_actions.len(), 1);
        assert_eq!(plan.file_actions[0].path, "keep.txt");
    }

    #[test]
    fn test_strip_list_prefix_forms() {
        assert_eq!(strip_list_prefix("- item"), "item");
        assert_eq!(strip_list_prefix("1. item"), "item");
        assert_eq!(strip_list_prefix("12) item"), "item");
        assert_eq!(strip_list_prefix("(1) item"), "item");
        assert_eq!(strip_list_prefix("a) item"), "item");
        // Paths must survive untouched.
        assert_eq!(strip_list_prefix("a.py"), "a.py");
        assert_eq!(strip_list_prefix("1.py"), "1.py");
    }

    #[test]
    fn test_strip_wrappers_nested() {
        assert_eq!(strip_wrappers("**`a.py`**"), "a.py");
        assert_eq!(strip_wrappers("\"quoted\""), "quoted");
        assert_eq!(strip_wrappers("plain"), "plain");
    }

    #[test]
    fn test_split_description_em_dash() {
        let (head, desc) = split_description("a.py — the entry point");
        assert_eq!(head, "a.py");
        assert_eq!(desc, Some("the entry point"));
    }
}
