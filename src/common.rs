//! Common utility functions shared across the ingest, chunking and graph layers
//!
//! Slicing helpers never panic on out-of-range input; callers get `None`
//! and decide how to degrade.

use std::path::Path;

/// Returns true when the path has a Python source extension.
///
/// Only `.py` is accepted; stub files (`.pyi`) carry no bodies to chunk.
pub fn is_python_path(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("py")
}

/// Safely extract a byte slice from source with bounds checking
///
/// Returns None if the slice range is invalid or exceeds source length.
/// Use this instead of direct slicing to prevent panics on malformed input.
///
/// # Example
/// ```rust
/// use chunkgraph::common::safe_slice;
/// let source = b"hello world";
/// assert_eq!(safe_slice(source, 0, 5), Some(&b"hello"[..]));
/// assert_eq!(safe_slice(source, 10, 20), None);
/// ```
pub fn safe_slice(source: &[u8], start: usize, end: usize) -> Option<&[u8]> {
    if start <= end && end <= source.len() {
        Some(&source[start..end])
    } else {
        None
    }
}

/// Extract lines `start_line..=end_line` (1-indexed, inclusive) joined by `\n`.
///
/// Lines are split on `\n` only, so a `\r` before the newline stays part of
/// the line. An `end_line` past the end of the text is clamped; an empty or
/// inverted range yields `None`.
///
/// # Example
/// ```rust
/// use chunkgraph::common::slice_lines;
/// let text = "a\nb\nc\n";
/// assert_eq!(slice_lines(text, 2, 3).as_deref(), Some("b\nc"));
/// assert_eq!(slice_lines(text, 3, 2), None);
/// ```
pub fn slice_lines(text: &str, start_line: usize, end_line: usize) -> Option<String> {
    if start_line == 0 || start_line > end_line {
        return None;
    }
    let lines: Vec<&str> = text
        .split('\n')
        .skip(start_line - 1)
        .take(end_line - start_line + 1)
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}

/// Collapse a possibly multi-line source fragment onto a single line.
///
/// Each line is trimmed and the pieces joined by a space; padding that this
/// introduces just inside brackets is removed so `foo(\n    a,\n)` becomes
/// `foo(a,)`. Single-line text is returned unchanged.
pub fn single_line(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_string();
    }
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut out = String::with_capacity(joined.len());
    let chars: Vec<char> = joined.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = if i > 0 { chars[i - 1] } else { ' ' };
            let next = chars.get(i + 1).copied().unwrap_or(' ');
            if matches!(prev, '(' | '[' | '{') || matches!(next, ')' | ']' | '}') {
                continue;
            }
        }
        out.push(c);
    }
    out
}
