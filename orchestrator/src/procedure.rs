//! Procedure outlines
//!
//! Procedures arrive as free text. When the text is written as a numbered
//! list (`1. ...`, `2) ...`) the outline is the list of step bodies.

/// Split a procedure into its numbered steps
///
/// Returns an empty list unless at least one line is numbered. Unnumbered
/// lines in a numbered procedure are kept as-is.
pub fn outline(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if !lines.iter().any(|line| numbering_len(line).is_some()) {
        return Vec::new();
    }

    lines
        .into_iter()
        .map(|line| match numbering_len(line) {
            Some(len) => line[len..].trim().to_string(),
            None => line.to_string(),
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Byte length of a leading `N.` / `N)` marker
fn numbering_len(line: &str) -> Option<usize> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    match line.as_bytes().get(digits) {
        Some(b'.') | Some(b')') => Some(digits + 1),
        _ => None,
    }
}
