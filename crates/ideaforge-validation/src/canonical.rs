//! Canonical text form for provider output
//!
//! Providers wrap documents in code fences, mix line endings and pad with
//! blank lines. Everything stored as an artifact goes through [`canonicalize`]
//! first so regenerated artifacts compare cleanly.

use regex::Regex;
use std::sync::LazyLock;

/// A fence line, optionally tagged with a language (```` ```markdown ````)
static FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(```|~~~)[A-Za-z0-9_+.-]*\s*$").unwrap());

/// Normalize whitespace and strip a document-wide code fence.
///
/// - CRLF and CR become LF
/// - trailing whitespace is removed from every line
/// - runs of more than one blank line collapse to one
/// - a fence wrapping the entire response is removed
/// - leading and trailing blank lines are dropped
pub fn canonicalize(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let unwrapped = strip_outer_fence(&normalized);

    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in unwrapped.lines() {
        let line = line.trim_end();
        let blank = line.is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push(line);
        previous_blank = blank;
    }

    out.join("\n").trim_matches('\n').to_string()
}

/// Remove a single code fence surrounding the whole text, if present.
///
/// Fences in the middle of a document are content and stay untouched.
fn strip_outer_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(first_newline) = trimmed.find('\n') else {
        return text;
    };
    let (first_line, rest) = trimmed.split_at(first_newline);
    if !FENCE_LINE.is_match(first_line) {
        return text;
    }

    let body = &rest[1..];
    let Some(last_newline) = body.rfind('\n') else {
        return text;
    };
    let last_line = &body[last_newline + 1..];
    if !FENCE_LINE.is_match(last_line) {
        return text;
    }

    &body[..last_newline]
}

/// Pull source code out of a per-file generation response.
///
/// When the reply contains a fenced block, the contents of the first block
/// are returned. Otherwise the whole reply is used. The result always ends
/// with a newline unless it is empty.
pub fn extract_code(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let mut inside = false;
    let mut block: Vec<&str> = Vec::new();
    let mut found = false;

    for line in normalized.lines() {
        if FENCE_LINE.is_match(line) {
            if inside {
                found = true;
                break;
            }
            inside = true;
            continue;
        }
        if inside {
            block.push(line);
        }
    }

    let code = if found || (inside && !block.is_empty()) {
        block.join("\n")
    } else {
        normalized
    };

    let trimmed = code.trim_matches('\n').trim_end();
    if trimmed.trim().is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}
