//! Checksums and diff-text helpers.

use crate::spec::Specification;

/// blake3 over the canonical JSON form of the whole snapshot. Keyed maps in
/// the model are ordered, so equal snapshots hash equally.
pub fn spec_checksum(spec: &Specification) -> String {
    let bytes = serde_json::to_vec(spec).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

pub fn content_checksum(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Render `content` as a new-file unified diff against `/dev/null`.
pub fn render_new_file_diff(path: &str, content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut diff = format!("--- /dev/null\n+++ b/{}\n@@ -0,0 +1,{} @@\n", path, lines.len());
    for line in lines {
        diff.push('+');
        diff.push_str(line);
        diff.push('\n');
    }
    diff
}

/// Recover file content from diff text.
///
/// Lines before the first `@@` hunk header are file headers and are dropped.
/// Inside a hunk only the first character is a marker: `+` and ` ` lines keep
/// their body, `-` and `\` lines are dropped, and a new `@@` or `diff ` line
/// starts the next hunk or file.
pub fn content_from_diff(diff: &str) -> String {
    let mut content = String::new();
    let mut in_hunk = false;
    for line in diff.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        if !in_hunk {
            continue;
        }
        if line.starts_with("diff ") {
            in_hunk = false;
            continue;
        }
        let body = match line.chars().next() {
            Some('+') | Some(' ') => &line[1..],
            Some('-') | Some('\\') => continue,
            // Editors strip the lone space of an empty context line.
            None => "",
            Some(_) => line,
        };
        content.push_str(body);
        content.push('\n');
    }
    content
}

/// Conventional file-name form: `OrderItem` → `order_item`, `HTTPServer` → `http_server`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.map(|n| n.is_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }
    out
}
