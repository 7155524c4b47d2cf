//! Source clean-up applied before parsing.
//!
//! READMEs in the wild often start a list directly under a paragraph or pad
//! markers with odd spacing. CommonMark then folds the list into the
//! paragraph, so list blocks are fenced with blank lines and markers are
//! rewritten to `marker + single space + content`. Fenced code is left alone.

pub(crate) fn normalize_markdown(input: &str) -> String {
    let source = input.replace("\r\n", "\n");
    let mut out: Vec<String> = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut in_comment = false;
    let mut in_list = false;

    for line in source.split('\n') {
        if let Some((marker, width)) = fence {
            if closes_fence(line, marker, width) {
                fence = None;
            }
            out.push(line.to_string());
            continue;
        }

        let (stripped, had_comment) = strip_comments(line, &mut in_comment);
        if had_comment && stripped.trim().is_empty() {
            continue;
        }
        let line = stripped.as_str();

        if let Some(opened) = opens_fence(line) {
            if in_list && !is_indented(line) {
                end_list(&mut out, &mut in_list);
            }
            fence = Some(opened);
            out.push(line.to_string());
            continue;
        }

        if let Some(item) = rewrite_list_item(line) {
            if !in_list && last_is_text(&out) {
                out.push(String::new());
            }
            in_list = true;
            out.push(item);
        } else if line.trim().is_empty() {
            out.push(String::new());
        } else if in_list && is_indented(line) {
            out.push(line.to_string());
        } else {
            if in_list {
                end_list(&mut out, &mut in_list);
            }
            out.push(line.to_string());
        }
    }

    out.join("\n")
}

fn end_list(out: &mut Vec<String>, in_list: &mut bool) {
    if last_is_text(out) {
        out.push(String::new());
    }
    *in_list = false;
}

fn last_is_text(out: &[String]) -> bool {
    out.last().is_some_and(|line| !line.trim().is_empty())
}

fn is_indented(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

/// Remove `<!-- ... -->` spans, tracking comments that continue across lines.
fn strip_comments(line: &str, in_comment: &mut bool) -> (String, bool) {
    if !*in_comment && !line.contains("<!--") {
        return (line.to_string(), false);
    }

    let mut result = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        if *in_comment {
            match rest.find("-->") {
                Some(end) => {
                    *in_comment = false;
                    rest = &rest[end + 3..];
                }
                None => break,
            }
        } else {
            match rest.find("<!--") {
                Some(start) => {
                    result.push_str(&rest[..start]);
                    *in_comment = true;
                    rest = &rest[start + 4..];
                }
                None => {
                    result.push_str(rest);
                    break;
                }
            }
        }
    }
    (result, true)
}

fn opens_fence(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let width = trimmed.chars().take_while(|c| *c == marker).count();
    if width < 3 {
        return None;
    }
    if marker == '`' && trimmed[width..].contains('`') {
        return None;
    }
    Some((marker, width))
}

fn closes_fence(line: &str, marker: char, width: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= width && trimmed.chars().all(|c| c == marker)
}

/// Rewrite a list item line, returning `None` for anything else.
fn rewrite_list_item(line: &str) -> Option<String> {
    let content_start = line.len() - line.trim_start().len();
    let (indent, body) = line.split_at(content_start);
    let marker_len = list_marker_len(body)?;
    let (marker, rest) = body.split_at(marker_len);
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let content = rest.trim_start();
    if content.is_empty() {
        return None;
    }
    Some(format!("{indent}{marker} {content}"))
}

fn list_marker_len(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    match bytes.first()? {
        b'-' | b'*' | b'+' => Some(1),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 {
                return None;
            }
            matches!(bytes.get(digits), Some(b'.') | Some(b')')).then_some(digits + 1)
        }
        _ => None,
    }
}
