//! Reply normalization for assistant text.
//!
//! Gateway replies often arrive as run-on text: headings, numbered steps and
//! dash bullets glued into one paragraph. [`normalize_reply`] rewrites them
//! into Markdown a CommonMark renderer lays out as blocks, without touching
//! the words themselves.
//!
//! The rewrite is an ordered list of independent rules ([`REPLY_RULES`]);
//! each one sees the output of the previous one. Several rules have
//! overlapping triggers, so the order is part of the contract.
//!
//! `regex` has no look-around, so rules that care about what precedes a
//! match inspect the haystack directly from the replacement closure.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// One named rewrite step.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

pub const REPLY_RULES: [Rule; 10] = [
    Rule {
        name: "normalize-line-endings",
        apply: normalize_line_endings,
    },
    Rule {
        name: "isolate-horizontal-rules",
        apply: isolate_horizontal_rules,
    },
    Rule {
        name: "break-before-headings",
        apply: break_before_headings,
    },
    Rule {
        name: "break-before-bold-labels",
        apply: break_before_bold_labels,
    },
    Rule {
        name: "break-inline-numbered-items",
        apply: break_inline_numbered_items,
    },
    Rule {
        name: "break-inline-dash-items",
        apply: break_inline_dash_items,
    },
    Rule {
        name: "separate-list-lines",
        apply: separate_list_lines,
    },
    Rule {
        name: "collapse-blank-lines",
        apply: collapse_blank_lines,
    },
    Rule {
        name: "strip-trailing-whitespace",
        apply: strip_trailing_whitespace,
    },
    Rule {
        name: "trim",
        apply: trim,
    },
];

/// Apply every rule in [`REPLY_RULES`] in order.
///
/// Close to idempotent on its own output, but not guaranteed to be.
pub fn normalize_reply(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    REPLY_RULES
        .iter()
        .fold(text.to_owned(), |acc, rule| (rule.apply)(&acc))
}

/// Text as it should be displayed: user messages verbatim, assistant replies normalized.
pub fn display_text(text: &str, is_user: bool) -> String {
    if is_user {
        text.to_owned()
    } else {
        normalize_reply(text)
    }
}

pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn isolate_horizontal_rules(text: &str) -> String {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    let re = CACHED.get_or_init(|| {
        Regex::new(r"(?:^|\s+)-{3,}(?:\s+|$)").expect("horizontal rule regex must compile")
    });
    re.replace_all(text, "\n\n---\n\n").into_owned()
}

/// `##`..`######` at the start of the text or after whitespace opens a paragraph.
pub fn break_before_headings(text: &str) -> String {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    let re = CACHED.get_or_init(|| {
        Regex::new(r"(?:^|\s+)(#{2,6})[ \t]*").expect("heading regex must compile")
    });
    re.replace_all(text, "\n\n$1 ").into_owned()
}

/// `**Label:**` or `**Label**:` opens a paragraph, except inside a list item.
pub fn break_before_bold_labels(text: &str) -> String {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    let re = CACHED.get_or_init(|| {
        Regex::new(r"[ \t]*(\*\*[^*\n]+?(?::\*\*|\*\*:))").expect("bold label regex must compile")
    });
    re.replace_all(text, |caps: &Captures| {
        let before = &text[..match_start(caps)];
        let prefix = current_line(before);
        let line = format!("{prefix}{}", &caps[0]);
        if list_marker_regex().is_match(&line) {
            return caps[0].to_owned();
        }
        if prefix.trim().is_empty() && at_paragraph_start(before) {
            return caps[0].to_owned();
        }
        format!("\n\n{}", &caps[1])
    })
    .into_owned()
}

/// `N.` in the middle of a line starts a new line, unless it follows a
/// heading marker or a digit.
pub fn break_inline_numbered_items(text: &str) -> String {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    let re = CACHED.get_or_init(|| {
        Regex::new(r"[ \t]+(\d{1,3})\.[ \t]+").expect("numbered item regex must compile")
    });
    re.replace_all(text, |caps: &Captures| {
        let before = &text[..match_start(caps)];
        match before.chars().last() {
            None | Some('\n' | '#') => caps[0].to_owned(),
            Some(prev) if prev.is_ascii_digit() => caps[0].to_owned(),
            Some(_) => format!("\n{}. ", &caps[1]),
        }
    })
    .into_owned()
}

/// ` - ` becomes a list item after sentence punctuation or a bold label, or
/// before a capital, digit or `(`. Once a line is a dash item, its remaining
/// ` - ` separators split it into further items.
pub fn break_inline_dash_items(text: &str) -> String {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    let re = CACHED
        .get_or_init(|| Regex::new(r"[ \t]+-[ \t]+").expect("dash item regex must compile"));
    let broken = re.replace_all(text, |caps: &Captures| {
        let start = match_start(caps);
        let end = caps.get(0).map_or(start, |m| m.end());
        let before = &text[..start];
        let prev = before.chars().last();
        let next = text[end..].chars().next();

        let after_punctuation = matches!(prev, Some('.' | '!' | '?' | ':' | ';'));
        let after_bold_label = before.ends_with("**");
        let before_item_start =
            next.is_some_and(|c| c.is_uppercase() || c.is_ascii_digit() || c == '(');

        if prev.is_some_and(|c| c != '\n')
            && (after_punctuation || after_bold_label || before_item_start)
        {
            "\n- ".to_owned()
        } else {
            caps[0].to_owned()
        }
    });

    broken
        .split('\n')
        .map(|line| {
            if line.starts_with("- ") {
                line.split(" - ").collect::<Vec<_>>().join("\n- ")
            } else {
                line.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Every list line gets a blank line above it unless it already has one.
pub fn separate_list_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        if list_marker_regex().is_match(line) {
            if let Some(prev) = lines.last() {
                if !prev.trim().is_empty() {
                    lines.push("");
                }
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub fn collapse_blank_lines(text: &str) -> String {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    let re = CACHED.get_or_init(|| Regex::new(r"\n{3,}").expect("blank line regex must compile"));
    re.replace_all(text, "\n\n").into_owned()
}

pub fn strip_trailing_whitespace(text: &str) -> String {
    text.split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn trim(text: &str) -> String {
    text.trim().to_owned()
}

fn list_marker_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"^[ \t]*(?:\d{1,3}\.|-)[ \t]+\S").expect("list marker regex must compile")
    })
}

fn match_start(caps: &Captures) -> usize {
    caps.get(0).map_or(0, |m| m.start())
}

fn current_line(before: &str) -> &str {
    before.rsplit('\n').next().unwrap_or(before)
}

fn at_paragraph_start(before: &str) -> bool {
    let trimmed = before.trim_end_matches([' ', '\t']);
    trimmed.is_empty() || trimmed.ends_with("\n\n")
}
