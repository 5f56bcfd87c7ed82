//! Golden trace comparison
//!
//! Lines are compared the way `diff -b` does: trailing whitespace is ignored
//! and any run of whitespace matches any other. A missing newline at the end
//! of either text is not a difference. Mismatches are rendered as a unified
//! diff with three lines of context.

use difference::{Changeset, Difference};

/// Lines of unchanged context around each hunk
const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Same,
    Rem,
    Add,
}

/// One line of the edit script, with indices into the original texts
#[derive(Debug, Clone, Copy)]
struct Edit {
    op: Op,
    old: usize,
    new: usize,
}

/// Compare `actual` against `expected`.
///
/// Returns `None` when the texts match, otherwise a unified diff whose header
/// names the two sides with the given labels.
pub fn unified_diff(
    expected: &str,
    actual: &str,
    expected_label: &str,
    actual_label: &str,
) -> Option<String> {
    let old: Vec<&str> = expected.lines().collect();
    let new: Vec<&str> = actual.lines().collect();
    let old_norm: Vec<String> = old.iter().map(|l| normalize(l)).collect();
    let new_norm: Vec<String> = new.iter().map(|l| normalize(l)).collect();

    if old_norm == new_norm {
        return None;
    }

    let edits = edit_script(&old_norm, &new_norm);

    let mut out = format!("--- {}\n+++ {}\n", expected_label, actual_label);
    for (start, end) in hunk_ranges(&edits) {
        render_hunk(&mut out, &edits[start..end], &old, &new);
    }
    // Trailing newline is noise in the report
    out.pop();
    Some(out)
}

/// Collapse whitespace runs to one space and drop trailing whitespace
fn normalize(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_space = false;
    for c in line.trim_end().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn edit_script(old: &[String], new: &[String]) -> Vec<Edit> {
    let mut edits = Vec::with_capacity(old.len().max(new.len()));
    let (mut i, mut j) = (0, 0);
    let mut push = |op: Op, count: usize, edits: &mut Vec<Edit>| {
        for _ in 0..count {
            edits.push(Edit { op, old: i, new: j });
            match op {
                Op::Same => {
                    i += 1;
                    j += 1;
                }
                Op::Rem => i += 1,
                Op::Add => j += 1,
            }
        }
    };

    let old_text = old.join("\n");
    let new_text = new.join("\n");

    // Changeset cannot tell "no lines" from "one empty line": both join to ""
    if old_text.is_empty() || new_text.is_empty() {
        push(Op::Rem, old.len(), &mut edits);
        push(Op::Add, new.len(), &mut edits);
        return edits;
    }

    let changeset = Changeset::new(&old_text, &new_text, "\n");
    for chunk in &changeset.diffs {
        let (op, text) = match chunk {
            Difference::Same(text) => (Op::Same, text),
            Difference::Rem(text) => (Op::Rem, text),
            Difference::Add(text) => (Op::Add, text),
        };
        push(op, text.split('\n').count(), &mut edits);
    }
    edits
}

/// Group changed lines into hunks, merging hunks whose context would overlap
fn hunk_ranges(edits: &[Edit]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for (idx, _) in edits.iter().enumerate().filter(|(_, e)| e.op != Op::Same) {
        let start = idx.saturating_sub(CONTEXT);
        let end = (idx + 1 + CONTEXT).min(edits.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }
    ranges
}

fn render_hunk(out: &mut String, hunk: &[Edit], old: &[&str], new: &[&str]) {
    let old_len = hunk.iter().filter(|e| e.op != Op::Add).count();
    let new_len = hunk.iter().filter(|e| e.op != Op::Rem).count();
    let first = hunk[0];

    out.push_str(&format!(
        "@@ -{} +{} @@\n",
        range(first.old, old_len),
        range(first.new, new_len)
    ));

    for edit in hunk {
        let (prefix, line) = match edit.op {
            Op::Same => (' ', old.get(edit.old)),
            Op::Rem => ('-', old.get(edit.old)),
            Op::Add => ('+', new.get(edit.new)),
        };
        out.push(prefix);
        out.push_str(line.copied().unwrap_or_default());
        out.push('\n');
    }
}

/// Hunk range in `diff -u` notation: 1-based start, length omitted when 1,
/// start is the preceding line when the range is empty
fn range(before: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", before),
        1 => format!("{}", before + 1),
        _ => format!("{},{}", before + 1, len),
    }
}
