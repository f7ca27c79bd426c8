//! Unified diff hunks between two file versions

use similar::{ChangeTag, TextDiff};

/// Lines of unchanged context around each change
pub const CONTEXT_LINES: usize = 3;

/// Marker emitted after a line that has no trailing newline
pub const NO_EOL: &str = "\\ No newline at end of file";

/// Split the unified diff of `old` -> `new` into hunks.
///
/// Each hunk starts with its `@@ -a,b +c,d @@` header and carries no trailing
/// newline. Identical inputs produce no hunks.
pub fn diff_hunks(old: &str, new: &str) -> Vec<String> {
    let diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();

    for group in diff.grouped_ops(CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let old_len = last.old_range().end - old_start;
        let new_start = first.new_range().start;
        let new_len = last.new_range().end - new_start;

        let mut text = format!(
            "@@ -{} +{} @@\n",
            format_range(old_start, old_len),
            format_range(new_start, new_len)
        );
        for op in &group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Equal => ' ',
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                };
                let value = change.value();
                text.push(sign);
                text.push_str(value);
                if !value.ends_with('\n') {
                    text.push('\n');
                    text.push_str(NO_EOL);
                    text.push('\n');
                }
            }
        }
        let trimmed_len = text.trim_end_matches('\n').len();
        text.truncate(trimmed_len);
        hunks.push(text);
    }

    hunks
}

/// Format a hunk range the way `diff -u` does.
fn format_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}
