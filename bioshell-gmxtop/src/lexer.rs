/// Maximum length of a section name accepted inside `[ name ]`.
const MAX_SECTION_NAME_LEN: usize = 63;

/// Strips an inline `;` comment and surrounding whitespace.
///
/// Returns `None` when the resulting line is empty — callers drop such
/// lines rather than dispatching them anywhere.
pub fn strip_comments(line: &str) -> Option<String> {
    let without_comment = match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let trimmed = without_comment.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Returns the section name if `line` matches `^\s*\[\s*NAME\s*\]\s*$`.
pub fn is_section_header(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    let name = inner.trim();
    if name.is_empty() || name.len() > MAX_SECTION_NAME_LEN {
        return None;
    }
    Some(name.to_string())
}

/// Returns true if the first non-whitespace character of `line` is `#`.
///
/// This must be checked against the *raw* line — a `;` comment elsewhere on
/// a directive line does not change whether the line is a directive.
pub fn is_preprocessor_directive(line: &str) -> bool {
    line.trim_start().starts_with('#')
}
