/// Substitute `{key}` placeholders in a prompt template.
///
/// Substitution is a single pass over the template, so braces inside
/// substituted values are never expanded. Use `{{` and `}}` for literal
/// braces. Unknown placeholders are left as-is.
///
/// ```
/// use kitchencraft_stream::prompt::render;
///
/// let vars = [("dish", "soup"), ("servings", "4")];
/// let out = render("Cook {dish} for {servings}. Shape: {{name: ...}}", &vars);
/// assert_eq!(out, "Cook soup for 4. Shape: {name: ...}");
/// ```
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            continue;
        }
        if let Some(end) = tail.find('}').filter(|_| tail.starts_with('{')) {
            let key = &tail[1..end];
            if let Some((_, value)) = vars.iter().find(|(k, _)| *k == key) {
                out.push_str(value);
                rest = &tail[end + 1..];
                continue;
            }
        }
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

/// Render items as a `- ` bullet list, one per line.
pub fn bullet_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join items with commas, or return `fallback` when there are none.
pub fn comma_list<S: AsRef<str>>(items: &[S], fallback: &str) -> String {
    if items.is_empty() {
        return fallback.to_string();
    }
    items.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", ")
}
