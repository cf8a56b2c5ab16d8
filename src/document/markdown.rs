//! Markdown and plain-text parsing.

use super::{SourceDocument, clean_title};

/// ATX (`# Title`) and setext (`Title` over `===`) headings are section titles.
/// Fenced code is body text and never yields headings.
pub(super) fn parse_into(doc: &mut SourceDocument, text: &str) {
    let lines: Vec<&str> = text.lines().collect();
    let mut fence: Option<&str> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            } else {
                doc.push_body(line);
            }
            i += 1;
            continue;
        }

        if trimmed.starts_with("```") {
            fence = Some("```");
        } else if trimmed.starts_with("~~~") {
            fence = Some("~~~");
        } else if let Some(title) = atx_heading(line) {
            doc.push_title(title);
        } else if let Some(next) = lines.get(i + 1)
            && !trimmed.is_empty()
            && is_setext_underline(next)
        {
            doc.push_title(clean_title(line));
            i += 1;
        } else {
            doc.push_body(line);
        }
        i += 1;
    }
}

/// The first non-empty line is the title; everything else is body text.
pub(super) fn parse_plain_into(doc: &mut SourceDocument, text: &str) {
    let mut lines = text.lines().skip_while(|line| line.trim().is_empty());
    if let Some(first) = lines.next() {
        doc.push_title(first.trim().to_string());
    }
    for line in lines {
        doc.push_body(line);
    }
}

fn atx_heading(line: &str) -> Option<String> {
    if line.starts_with("    ") {
        return None;
    }
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim_end();
    let title = clean_title(title);
    (!title.is_empty()).then_some(title)
}

fn is_setext_underline(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && (trimmed.chars().all(|c| c == '=') || trimmed.chars().all(|c| c == '-'))
        && (trimmed.starts_with('=') || trimmed.len() >= 2)
}
