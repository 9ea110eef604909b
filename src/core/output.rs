//! Compact output rendering helpers for CLI surfaces.
//!
//! Levels can hold hundreds of names; keep status output bounded.

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Render up to `max_items` names, comma separated, noting how many were cut.
pub fn preview_names<'a, I>(names: I, max_items: usize, max_chars: usize) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let names: Vec<&String> = names.into_iter().collect();
    if names.is_empty() {
        return "(empty)".to_string();
    }
    let shown = names
        .iter()
        .take(max_items)
        .map(|n| compact_line(n, max_chars))
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > max_items {
        format!("{} (+{} more)", shown, names.len() - max_items)
    } else {
        shown
    }
}
