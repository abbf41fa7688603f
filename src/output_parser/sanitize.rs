//! Normalization of raw LLM text before YAML decoding.
//!
//! Every decode attempt, partial or final, runs through [`sanitize`] first.
//! The function is pure and total: it never fails, and when no known quirk
//! applies it returns the input (minus trailing whitespace) unchanged.
//! It is also idempotent, which the streaming consumer relies on when it
//! re-sanitizes the whole accumulator after every chunk.

/// Normalize raw model output into text suitable for YAML decoding.
///
/// Applied in order:
/// 1. `\r\n` and lone `\r` become `\n`
/// 2. `<think>`/`<thinking>` blocks are removed (an unclosed block runs to the end)
/// 3. a markdown code fence is reduced to its body, even while still unclosed
/// 4. conversational prose before the first structured line is dropped
/// 5. tab indentation becomes two spaces per tab
/// 6. plain scalars containing `": "` are double-quoted
/// 7. trailing whitespace is trimmed
///
/// # Examples
///
/// ```
/// use kitchencraft_stream::output_parser::sanitize;
///
/// assert_eq!(sanitize("```yaml\nname: X\n```"), "name: X");
/// assert_eq!(sanitize("Sure! Here you go.\n\nname: X"), "name: X");
/// assert_eq!(sanitize("tip: Note: salt early"), "tip: \"Note: salt early\"");
/// ```
pub fn sanitize(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut text = strip_think_tags(&text);
    while let Some(body) = fenced_body(&text) {
        text = body.to_string();
    }
    let text = drop_leading_prose(&text);
    let fixed: Vec<String> = text.lines().map(fix_line).collect();
    fixed.join("\n").trim_end().to_string()
}

/// Strip all `<think>...</think>` and `<thinking>...</thinking>` blocks.
///
/// Handles complete blocks, incomplete blocks (no closing tag, which is the
/// normal state while a reasoning model is still streaming) and multiple
/// sequential blocks.
///
/// ```
/// use kitchencraft_stream::output_parser::strip_think_tags;
///
/// assert_eq!(strip_think_tags("<think>hmm</think>name: X"), "name: X");
/// assert_eq!(strip_think_tags("<think>still going"), "");
/// ```
pub fn strip_think_tags(text: &str) -> String {
    let mut result = text.to_string();
    loop {
        let before = result.len();
        result = strip_tag_variant(&result, "<think>", "</think>");
        result = strip_tag_variant(&result, "<thinking>", "</thinking>");
        if result.len() == before {
            return result;
        }
    }
}

fn strip_tag_variant(text: &str, open: &str, close: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find(open) {
        match result[start..].find(close) {
            Some(end_offset) => {
                let end = start + end_offset + close.len();
                result.replace_range(start..end, "");
            }
            None => {
                result.truncate(start);
                break;
            }
        }
    }
    result
}

/// Locate the body of a markdown code fence.
///
/// Returns `None` when the text has no opening fence. Backticks inside a
/// value are not fences: an opening fence is a triple backtick followed only
/// by an optional language tag, either at the start of a line or ending a
/// line of prose. The closing fence is a line holding only backticks.
///
/// An opening fence whose line has not finished streaming yields an empty
/// body. A bare fence that follows structured content and ends the text is
/// treated as a stray closing fence.
fn fenced_body(text: &str) -> Option<&str> {
    let fence = opening_fence(text)?;
    let before = &text[..fence];
    let after = &text[fence + 3..];

    let (fence_line, remainder) = match after.find('\n') {
        Some(nl) => (&after[..nl], &after[nl + 1..]),
        None => (after, ""),
    };
    if line_prefix_is_blank(before)
        && fence_line.trim().is_empty()
        && remainder.trim().is_empty()
        && before.lines().any(looks_structured)
    {
        return Some(before);
    }

    let Some(nl) = after.find('\n') else {
        return Some("");
    };
    let body = &after[nl + 1..];
    match closing_fence(body) {
        Some(close) => Some(&body[..close]),
        None => Some(body),
    }
}

fn opening_fence(text: &str) -> Option<usize> {
    let is_tag = |tag: &str| {
        tag.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
    };
    text.match_indices("```").map(|(pos, _)| pos).find(|&pos| {
        let rest = &text[pos + 3..];
        let (tag, has_newline) = match rest.find('\n') {
            Some(nl) => (rest[..nl].trim_end(), true),
            None => (rest.trim_end(), false),
        };
        let before = &text[..pos];
        if line_prefix_is_blank(before) {
            return is_tag(tag.trim_start());
        }
        has_newline
            && !tag.is_empty()
            && is_tag(tag)
            && before.ends_with(char::is_whitespace)
    })
}

/// Byte offset of the first bare fence line.
fn closing_fence(body: &str) -> Option<usize> {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        if line.trim() == "```" {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Whether the current (last) line of `text` holds only whitespace.
fn line_prefix_is_blank(text: &str) -> bool {
    let start = text.rfind('\n').map_or(0, |nl| nl + 1);
    text[start..].trim().is_empty()
}

/// Drop lines preceding the first one that looks like YAML content.
///
/// Without any structured line only leading blank lines are removed.
fn drop_leading_prose(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    match lines.iter().position(|l| looks_structured(l)) {
        Some(first) => lines[first..].join("\n"),
        None => lines
            .iter()
            .skip_while(|l| l.trim().is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Whether a line looks like a YAML mapping entry or sequence item.
pub(crate) fn looks_structured(line: &str) -> bool {
    let t = line.trim();
    t == "-" || t.starts_with("- ") || key_colon(t).is_some()
}

/// Byte offset of the `:` after a leading identifier key, if `text` starts
/// with `key:` followed by whitespace or end of line.
fn key_colon(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    let (_, first) = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    for (i, ch) in chars {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            continue;
        }
        if ch != ':' {
            return None;
        }
        let rest = &text[i + 1..];
        return (rest.is_empty() || rest.starts_with([' ', '\t'])).then_some(i);
    }
    None
}

fn fix_line(line: &str) -> String {
    let body = line.trim_start_matches([' ', '\t']);
    let indent = line[..line.len() - body.len()].replace('\t', "  ");
    format!("{}{}", indent, quote_colon_scalar(body))
}

/// Values that YAML treats specially when they open a scalar.
const SPECIAL_VALUE_STARTS: [char; 10] = ['"', '\'', '|', '>', '[', '{', '&', '*', '!', '#'];

fn quote_colon_scalar(body: &str) -> String {
    let (marker, item) = match body.strip_prefix("- ") {
        Some(rest) => ("- ", rest),
        None => ("", body),
    };

    if let Some(colon) = key_colon(item) {
        let value = item[colon + 1..].trim();
        if needs_quotes(value) {
            return format!("{}{} {}", marker, &item[..=colon], quoted(value));
        }
        return body.to_string();
    }

    // A list item like `- Step 1: preheat the oven` would otherwise decode as
    // a single-entry mapping.
    if !marker.is_empty() && needs_quotes(item.trim()) {
        return format!("{}{}", marker, quoted(item.trim()));
    }
    body.to_string()
}

fn needs_quotes(value: &str) -> bool {
    !value.is_empty() && !value.starts_with(SPECIAL_VALUE_STARTS) && value.contains(": ")
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
