//! Candidate Extraction
//!
//! Builds the ordered list of candidate strings recovery will try to parse
//! from a raw model response. Models wrap their JSON in prose, markdown
//! fences, and reasoning traces in every combination, so each plausible
//! extraction is tried in a fixed order and the first one that parses wins.

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Remove reasoning-trace blocks delimited by `<think>`/`</think>`.
///
/// An unterminated trailing block (open marker with no close) drops the
/// remainder of the text — models frequently get cut off mid-trace.
pub fn strip_reasoning(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;

    while let Some(start) = rest.find(THINK_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + THINK_OPEN.len()..];
        match after.find(THINK_CLOSE) {
            Some(end) => rest = &after[end + THINK_CLOSE.len()..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Extract the contents of the first fenced code block, skipping any
/// language tag on the opening line.
pub fn extract_fenced(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // The opening fence line may carry a language tag ("```json").
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = after.get(body_start..)?;
    let end = body.find("```")?;
    let inner = body[..end].trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

/// Extract the span from the first `{` to the last `}`.
pub fn extract_brace_span(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].to_string())
}

/// The ordered, deduplicated candidate list for a raw response.
pub fn candidates(raw: &str) -> Vec<String> {
    let stripped = strip_reasoning(raw);

    let mut list: Vec<String> = Vec::new();
    push_candidate(&mut list, Some(raw.to_string()));
    push_candidate(&mut list, Some(stripped.clone()));
    push_candidate(&mut list, extract_fenced(raw));
    push_candidate(&mut list, extract_brace_span(raw));
    push_candidate(&mut list, extract_fenced(&stripped));
    push_candidate(&mut list, extract_brace_span(&stripped));
    list
}

fn push_candidate(list: &mut Vec<String>, candidate: Option<String>) {
    if let Some(candidate) = candidate {
        if !candidate.trim().is_empty() && !list.contains(&candidate) {
            list.push(candidate);
        }
    }
}
