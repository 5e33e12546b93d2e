//! Split a legacy parameter string into tokens.
//!
//! The split is purely on `,`: a comma inside a compound token is not
//! protected. Empty pieces (trailing or doubled commas) are dropped.

/// Split `input` on commas, trim each piece and drop the empty ones.
pub fn tokenize(input: &str) -> Vec<&str> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// If the whole token is wrapped in one matching `[...]` pair, return the
/// trimmed inside.
///
/// `"[Radius]"` → `Some("Radius")`, `"[A] [B]"` → `None` (the first `]` closes
/// the opening bracket before the end).
pub fn strip_optional(token: &str) -> Option<&str> {
    let inner = token.strip_prefix('[')?.strip_suffix(']')?;
    let mut depth = 0usize;
    for ch in inner.chars() {
        match ch {
            '[' => depth += 1,
            ']' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    Some(inner.trim())
}
