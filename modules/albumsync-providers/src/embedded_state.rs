// Extraction of client-side state blobs embedded in HTML, e.g.
// `modelExport: { ... }` inside an inline script. The payload is large and
// deeply nested, so the object is located by a brace-depth scan that is aware
// of JSON string literals rather than by regex.
//
// The upstream format is undocumented and changes without notice. This module
// only promises "the first balanced, parseable JSON object after the marker";
// interpreting its shape is the caller's problem.

use serde_json::Value;

/// Locate `marker` in `html` and parse the balanced JSON object that follows
/// it. Each occurrence of the marker is tried in order until one parses.
pub fn extract_embedded_json(html: &str, marker: &str) -> Option<Value> {
    if marker.is_empty() {
        return None;
    }

    let mut from = 0;
    while let Some(found) = html[from..].find(marker) {
        let after_marker = from + found + marker.len();
        if let Some(object) = balanced_object_at(html, after_marker) {
            if let Ok(value) = serde_json::from_str::<Value>(object) {
                return Some(value);
            }
        }
        from = after_marker;
    }
    None
}

/// The balanced `{...}` starting at the first non-whitespace character at or
/// after `start`. Returns `None` if that character is not `{` or the object
/// never closes.
pub fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let rest = text.get(start..)?;
    let offset = rest.len() - rest.trim_start().len();
    let open = start + offset;
    if !text[open..].starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.as_bytes()[open..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=open + i]);
                }
            }
            _ => {}
        }
    }
    None
}
