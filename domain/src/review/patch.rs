//! Hunk-based patch application
//!
//! A pure line-cursor walk over the original content. For each hunk the
//! unchanged prefix is copied verbatim, then lines signed with the direction's
//! keep sign (or context) are emitted while the cursor advances past every
//! line that existed in the source version.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+),?(\d+)? \+(\d+),?(\d+)? @@").expect("valid hunk header regex")
});

/// Which side of the diff `original` corresponds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchDirection {
    /// `original` is the old version, produce the new one
    #[default]
    Forward,
    /// `original` is the new version, produce the old one
    Reverse,
}

impl PatchDirection {
    fn keep_sign(self) -> char {
        match self {
            PatchDirection::Forward => '+',
            PatchDirection::Reverse => '-',
        }
    }

    /// Capture group holding the start line of the source side
    fn start_group(self) -> usize {
        match self {
            PatchDirection::Forward => 1,
            PatchDirection::Reverse => 3,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Bad patch: malformed hunk header at patch line {line}")]
    MalformedHeader { line: usize },

    #[error("Bad patch: bad line number at patch line {line}")]
    BadLineNumber { line: usize },
}

/// Apply the given hunks to `original`.
///
/// An empty hunk list returns `original` unchanged.
pub fn apply_hunks<S: AsRef<str>>(
    original: &str,
    hunks: &[S],
    direction: PatchDirection,
) -> Result<String, PatchError> {
    if hunks.is_empty() {
        return Ok(original.to_string());
    }
    let mut patch = String::new();
    for hunk in hunks {
        patch.push_str(hunk.as_ref());
        patch.push('\n');
    }
    apply_patch(original, &patch, direction)
}

/// Apply a unified diff (optionally with `---`/`+++` file headers) to `original`.
pub fn apply_patch(
    original: &str,
    patch: &str,
    direction: PatchDirection,
) -> Result<String, PatchError> {
    let original_lines: Vec<&str> = original.split_inclusive('\n').collect();
    let patch_lines: Vec<&str> = patch.split_inclusive('\n').collect();
    let keep = direction.keep_sign();
    let group = direction.start_group();

    let mut updated = String::with_capacity(original.len());
    let mut idx = 0;
    let mut cursor = 0usize;

    while idx < patch_lines.len()
        && (patch_lines[idx].starts_with("---") || patch_lines[idx].starts_with("+++"))
    {
        idx += 1;
    }

    while idx < patch_lines.len() {
        let caps = HUNK_HEADER
            .captures(patch_lines[idx])
            .ok_or(PatchError::MalformedHeader { line: idx })?;
        let start: usize = caps[group]
            .parse()
            .map_err(|_| PatchError::MalformedHeader { line: idx })?;
        let empty_range = caps.get(group + 1).is_some_and(|m| m.as_str() == "0");

        // A zero-length range names the line *before* the insertion point.
        let line_number = (start + usize::from(empty_range))
            .checked_sub(1)
            .ok_or(PatchError::BadLineNumber { line: idx })?;
        if cursor > line_number || line_number > original_lines.len() {
            return Err(PatchError::BadLineNumber { line: idx });
        }

        updated.extend(original_lines[cursor..line_number].iter().copied());
        cursor = line_number;
        idx += 1;

        while idx < patch_lines.len() && !patch_lines[idx].starts_with('@') {
            let line = if patch_lines
                .get(idx + 1)
                .is_some_and(|next| next.starts_with('\\'))
            {
                let line = patch_lines[idx];
                idx += 2;
                line.strip_suffix('\n').unwrap_or(line)
            } else {
                idx += 1;
                patch_lines[idx - 1]
            };

            let mut chars = line.chars();
            if let Some(sign) = chars.next() {
                if sign == keep || sign == ' ' {
                    updated.push_str(chars.as_str());
                }
                if sign != keep {
                    cursor += 1;
                }
            }
        }
    }

    if let Some(rest) = original_lines.get(cursor..) {
        updated.extend(rest.iter().copied());
    }
    Ok(updated)
}
