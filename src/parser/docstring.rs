//! Rule docstring parser: a line-by-line state machine.
//!
//! A docstring is free text optionally followed by sections:
//!
//! ```text
//! Summary line.
//!
//! Args:
//!   name: A unique name for this rule.
//!   deps: Dependencies.
//!
//!     Continuation paragraph.
//!
//! Outputs:
//!   jar: A Java archive.
//!
//! Example:
//!   Free-form usage text.
//! ```
//!
//! Section headers must sit alone on their line. A section ends at the first
//! non-blank line indented no deeper than its header.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static RE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[[:blank:]]*(Args|Outputs|Example):[[:blank:]]*$").unwrap());

static RE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[[:blank:]]*(\w+):[[:blank:]]*(.*?)[[:blank:]]*$").unwrap());

const TAB_WIDTH: usize = 8;

/// Structured documentation extracted from one docstring.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocString {
    pub description: Option<String>,
    /// `Args:` entries keyed by attribute name
    pub args: HashMap<String, String>,
    /// `Outputs:` entries keyed by output name
    pub outputs: HashMap<String, String>,
    pub example: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Args,
    Outputs,
    Example,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Description,
    InSection {
        section: Section,
        header_indent: usize,
        body_start: usize,
    },
}

/// Parse the text of a docstring (already decoded from its literal).
pub fn parse(raw: &str) -> DocString {
    let lines = clean(raw);
    let mut doc = DocString::default();
    let mut description: Vec<&str> = Vec::new();
    let mut state = State::Description;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].as_str();
        match state {
            State::Description => {
                if let Some(caps) = RE_HEADER.captures(line) {
                    let section = match &caps[1] {
                        "Args" => Section::Args,
                        "Outputs" => Section::Outputs,
                        _ => Section::Example,
                    };
                    state = State::InSection {
                        section,
                        header_indent: indent_of(line),
                        body_start: i + 1,
                    };
                } else {
                    description.push(line);
                }
                i += 1;
            }
            State::InSection {
                section,
                header_indent,
                body_start,
            } => {
                if !is_blank(line) && indent_of(line) <= header_indent {
                    close_section(&mut doc, section, &lines[body_start..i]);
                    state = State::Description;
                    // Re-examine this line as description or a new header
                    continue;
                }
                i += 1;
            }
        }
    }

    if let State::InSection {
        section, body_start, ..
    } = state
    {
        close_section(&mut doc, section, &lines[body_start..]);
    }

    doc.description = normalize(description);
    doc
}

fn close_section(doc: &mut DocString, section: Section, body: &[String]) {
    match section {
        Section::Args | Section::Outputs => {
            let Some(entries) = parse_entries(body) else {
                tracing::debug!(?section, "malformed docstring section ignored");
                return;
            };
            let target = if section == Section::Args {
                &mut doc.args
            } else {
                &mut doc.outputs
            };
            target.extend(entries);
        }
        Section::Example => {
            if let Some(text) = normalize(dedent(body).iter().map(String::as_str)) {
                doc.example = Some(text);
            }
        }
    }
}

/// Split an `Args:`/`Outputs:` body into `key: text` entries. Returns `None`
/// when the body's indentation is inconsistent or a line at entry level is
/// not an entry.
fn parse_entries(body: &[String]) -> Option<Vec<(String, String)>> {
    let Some(base) = body.iter().find(|l| !is_blank(l)).map(|l| indent_of(l)) else {
        return Some(Vec::new());
    };

    let mut entries = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in body {
        if is_blank(line) {
            if let Some((_, text)) = current.as_mut() {
                text.push(String::new());
            }
            continue;
        }

        let indent = indent_of(line);
        if indent == base {
            let caps = RE_ENTRY.captures(line)?;
            if let Some(done) = current.take() {
                entries.extend(finish_entry(done));
            }
            let first = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            current = Some((caps[1].to_string(), vec![first.to_string()]));
        } else if indent > base {
            let (_, text) = current.as_mut()?;
            text.push(line.trim().to_string());
        } else {
            return None;
        }
    }

    if let Some(done) = current {
        entries.extend(finish_entry(done));
    }
    Some(entries)
}

fn finish_entry((key, lines): (String, Vec<String>)) -> Option<(String, String)> {
    let text = normalize(lines.iter().map(String::as_str))?;
    Some((key, text))
}

/// Trim a block of lines: drop surrounding blank lines, collapse runs of
/// blank lines into one, strip trailing whitespace. `None` when empty.
pub(crate) fn normalize<'a>(lines: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut out: Vec<&str> = Vec::new();
    let mut pending_blank = false;
    for line in lines {
        let line = line.trim_end();
        if line.trim().is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if pending_blank {
            out.push("");
            pending_blank = false;
        }
        out.push(line);
    }
    let text = out.join("\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Docstring cleaning: expand tabs, strip the first line's leading
/// whitespace, remove the common indentation of the remaining lines, and
/// drop surrounding blank lines.
fn clean(raw: &str) -> Vec<String> {
    let expanded: Vec<String> = raw
        .lines()
        .map(expand_tabs)
        .collect();
    let Some((first, rest)) = expanded.split_first() else {
        return Vec::new();
    };

    let mut lines = vec![first.trim().to_string()];
    lines.extend(dedent(rest));

    while lines.last().is_some_and(|l| is_blank(l)) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| is_blank(l)).count();
    lines.drain(..leading);
    lines
}

/// Replace tabs with spaces up to the next multiple of [`TAB_WIDTH`].
fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - column % TAB_WIDTH;
            out.push_str(&" ".repeat(pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// Remove the common leading indentation of the non-blank lines.
fn dedent(lines: &[String]) -> Vec<String> {
    let common = lines
        .iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            if is_blank(l) {
                String::new()
            } else {
                l[common..].trim_end().to_string()
            }
        })
        .collect()
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
