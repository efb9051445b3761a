//! Configuration-language front end.
//!
//! The build definition language is a syntactic subset of Python, so the
//! tree-sitter Python grammar is used to obtain a concrete syntax tree. The
//! rest of the extractor only ever walks that tree; nothing is executed.

use crate::error::ExtractError;
use tree_sitter::{Node, Parser, Tree};

/// Node kinds the extractor relies on.
pub mod kinds {
    pub const ARGUMENT_LIST: &str = "argument_list";
    pub const ASSIGNMENT: &str = "assignment";
    pub const ATTRIBUTE: &str = "attribute";
    pub const BINARY_OPERATOR: &str = "binary_operator";
    pub const CALL: &str = "call";
    pub const COMMENT: &str = "comment";
    pub const CONCATENATED_STRING: &str = "concatenated_string";
    pub const DICTIONARY: &str = "dictionary";
    pub const EXPRESSION_STATEMENT: &str = "expression_statement";
    pub const FALSE: &str = "false";
    pub const FUNCTION_DEFINITION: &str = "function_definition";
    pub const IDENTIFIER: &str = "identifier";
    pub const INTEGER: &str = "integer";
    pub const KEYWORD_ARGUMENT: &str = "keyword_argument";
    pub const LIST: &str = "list";
    pub const NONE: &str = "none";
    pub const PAIR: &str = "pair";
    pub const PARENTHESIZED_EXPRESSION: &str = "parenthesized_expression";
    pub const RETURN_STATEMENT: &str = "return_statement";
    pub const STRING: &str = "string";
    pub const TRUE: &str = "true";
    pub const UNARY_OPERATOR: &str = "unary_operator";
}

/// Parse source text into a syntax tree, failing on the first syntax error.
pub fn parse_tree(source: &str, origin: &str) -> Result<Tree, ExtractError> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_python::LANGUAGE.into())?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ExtractError::NoTree {
            origin: origin.to_string(),
        })?;

    let root = tree.root_node();
    if root.has_error() {
        let bad = first_error(root).unwrap_or(root);
        let pos = bad.start_position();
        return Err(ExtractError::Syntax {
            origin: origin.to_string(),
            line: pos.row + 1,
            column: pos.column + 1,
            snippet: snippet(bad, source),
        });
    }

    Ok(tree)
}

/// Depth-first search for the first ERROR or MISSING node.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

fn snippet(node: Node, source: &str) -> String {
    let text = text(node, source).lines().next().unwrap_or("").trim();
    if text.is_empty() {
        return node.kind().to_string();
    }
    text.chars().take(24).collect()
}

/// Source text covered by a node.
pub fn text<'s>(node: Node, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

/// Named children, comments excluded.
pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let named: Vec<Node<'t>> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != kinds::COMMENT)
        .collect();
    named
}

/// The string a string-literal node denotes, if it is one.
pub fn string_value(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        kinds::STRING => decode_string_literal(text(node, source)),
        kinds::CONCATENATED_STRING => {
            let mut out = String::new();
            for part in children(node) {
                out.push_str(&string_value(part, source)?);
            }
            Some(out)
        }
        _ => None,
    }
}

/// If `stmt` is a bare string-literal statement, the string's node.
pub fn bare_string(stmt: Node) -> Option<Node> {
    if stmt.kind() != kinds::EXPRESSION_STATEMENT {
        return None;
    }
    match children(stmt).as_slice() {
        [only] if matches!(only.kind(), kinds::STRING | kinds::CONCATENATED_STRING) => Some(*only),
        _ => None,
    }
}

/// Decode a quoted literal such as `"a\tb"`, `r'x'` or `"""doc"""`.
pub fn decode_string_literal(literal: &str) -> Option<String> {
    let body_start = literal.find(['"', '\''])?;
    let prefix = &literal[..body_start];
    if !prefix.chars().all(|c| "rRbBuU".contains(c)) {
        return None;
    }
    let raw = prefix.contains(['r', 'R']);

    let rest = &literal[body_start..];
    let quote = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|q| rest.len() >= 2 * q.len() && rest.starts_with(q) && rest.ends_with(q))?;
    let body = &rest[quote.len()..rest.len() - quote.len()];

    if raw {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            // line continuation
            Some('\n') => {}
            Some('x') => push_code_point(&mut out, &mut chars, 2, 'x'),
            Some('u') => push_code_point(&mut out, &mut chars, 4, 'u'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn push_code_point(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars>,
    width: usize,
    marker: char,
) {
    let mut digits = String::new();
    while digits.len() < width {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
        Some(c) if digits.len() == width => out.push(c),
        _ => {
            out.push('\\');
            out.push(marker);
            out.push_str(&digits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_plain_and_escaped() {
        assert_eq!(decode_string_literal(r#""foo""#).as_deref(), Some("foo"));
        assert_eq!(decode_string_literal("'a\\tb'").as_deref(), Some("a\tb"));
        assert_eq!(decode_string_literal(r#""it\'s""#).as_deref(), Some("it's"));
        assert_eq!(decode_string_literal(r#""\x41é""#).as_deref(), Some("Aé"));
        assert_eq!(decode_string_literal(r#""\d""#).as_deref(), Some("\\d"));
    }

    #[test]
    fn decode_triple_and_raw() {
        assert_eq!(
            decode_string_literal("\"\"\"Doc.\n\nMore.\"\"\"").as_deref(),
            Some("Doc.\n\nMore.")
        );
        assert_eq!(decode_string_literal(r#"r"\n""#).as_deref(), Some("\\n"));
        assert_eq!(decode_string_literal("''").as_deref(), Some(""));
        assert_eq!(decode_string_literal("\"\"\"\"\"\"").as_deref(), Some(""));
    }

    #[test]
    fn decode_rejects_non_literals() {
        assert_eq!(decode_string_literal("foo"), None);
        assert_eq!(decode_string_literal("f\"{x}\""), None);
        assert_eq!(decode_string_literal("\"unterminated"), None);
    }

    #[test]
    fn valid_source_parses() {
        let tree = parse_tree("x = 1\n", "test.bzl").unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn syntax_error_reports_position() {
        let err = parse_tree("x = 1\ny = rule(\n", "bad.bzl").unwrap_err();
        match err {
            ExtractError::Syntax { origin, line, .. } => {
                assert_eq!(origin, "bad.bzl");
                assert!(line >= 2, "line was {line}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bare_string_statement() {
        let src = "\"\"\"Doc.\"\"\"\nx = 1\n";
        let tree = parse_tree(src, "t").unwrap();
        let stmts = children(tree.root_node());
        let doc = bare_string(stmts[0]).unwrap();
        assert_eq!(string_value(doc, src).as_deref(), Some("Doc."));
        assert!(bare_string(stmts[1]).is_none());
    }
}
