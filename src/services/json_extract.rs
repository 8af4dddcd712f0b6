use serde_json::Value;

/// Pulls a JSON value out of an agent reply. Falls back to the untouched input
/// as a JSON string when nothing parseable is embedded in it.
pub fn extract_json(raw: &str) -> Value {
    parse_json_loose(raw).unwrap_or_else(|| Value::String(raw.to_string()))
}

pub fn parse_json_loose(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(fenced) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(fenced) {
            return Some(value);
        }
    }

    first_balanced_json(trimmed)
}

/// Body of the first triple-backtick block, with the language tag line removed.
fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_open = &raw[open + 3..];
    let body_start = after_open.find('\n').map(|idx| idx + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    let candidate = body[..close].trim();
    if candidate.is_empty() {
        None
    } else {
        Some(candidate)
    }
}

/// Earliest-starting balanced object or array that parses. One pass collects
/// every balanced span; brackets inside string literals are skipped and a
/// mismatched closer discards all spans still open.
fn first_balanced_json(raw: &str) -> Option<Value> {
    let mut spans = balanced_spans(raw);
    spans.sort_unstable_by_key(|(start, _)| *start);
    spans
        .into_iter()
        .find_map(|(start, end)| serde_json::from_str::<Value>(&raw[start..=end]).ok())
}

fn balanced_spans(raw: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Vec<(usize, char)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in raw.char_indices() {
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
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push((idx, '}')),
            '[' => open.push((idx, ']')),
            '}' | ']' if !open.is_empty() => match open.pop() {
                Some((start, expected)) if expected == c => spans.push((start, idx)),
                _ => open.clear(),
            },
            _ => {}
        }
    }

    spans
}
