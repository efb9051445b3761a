//! Load statement reader.
//!
//! `load("//pkg:defs.bzl", "a", b = "c")` imports `a` as itself and `c`
//! under the local name `b`. Only the current file is read; re-exports
//! across files are the caller's business.

use super::syntax::{self, kinds};
use crate::error::{ExtractError, ANONYMOUS_ORIGIN};
use crate::model::LoadSymbol;
use tree_sitter::Node;

/// Collect the symbols imported by the file's top-level load statements.
pub fn extract_loads(source: &str) -> Result<Vec<LoadSymbol>, ExtractError> {
    let tree = syntax::parse_tree(source, ANONYMOUS_ORIGIN)?;
    let mut symbols = Vec::new();
    for stmt in syntax::children(tree.root_node()) {
        if stmt.kind() != kinds::EXPRESSION_STATEMENT {
            continue;
        }
        for expr in syntax::children(stmt) {
            if let Some(call_symbols) = load_call(expr, source) {
                symbols.extend(call_symbols);
            }
        }
    }
    Ok(symbols)
}

fn load_call(expr: Node, source: &str) -> Option<Vec<LoadSymbol>> {
    if expr.kind() != kinds::CALL {
        return None;
    }
    let callee = expr.child_by_field_name("function")?;
    if callee.kind() != kinds::IDENTIFIER || syntax::text(callee, source) != "load" {
        return None;
    }
    let args = syntax::children(expr.child_by_field_name("arguments")?);
    let (module, names) = args.split_first()?;
    let module_path = syntax::string_value(*module, source)?;

    let mut symbols = Vec::new();
    for arg in names {
        if arg.kind() == kinds::KEYWORD_ARGUMENT {
            let alias = syntax::text(arg.child_by_field_name("name")?, source);
            let original = syntax::string_value(arg.child_by_field_name("value")?, source)?;
            symbols.push(LoadSymbol::new(&module_path, &original, Some(alias)));
        } else if let Some(name) = syntax::string_value(*arg, source) {
            symbols.push(LoadSymbol::new(&module_path, &name, None));
        }
    }
    Some(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_and_aliased_symbols() {
        let src = "load(\"//foo/bar:bar.bzl\", \"foo_library\")\nload(\"//foo/bar:baz.bzl\", \"foo_test\", orig_foo_binary = \"foo_binary\")\n\nx = foo_library\n";
        let symbols = extract_loads(src).unwrap();
        assert_eq!(
            symbols,
            vec![
                LoadSymbol::new("//foo/bar:bar.bzl", "foo_library", None),
                LoadSymbol::new("//foo/bar:baz.bzl", "foo_test", None),
                LoadSymbol::new("//foo/bar:baz.bzl", "foo_binary", Some("orig_foo_binary")),
            ]
        );
    }

    #[test]
    fn ignores_other_calls() {
        let symbols = extract_loads("print(\"hi\")\nload_more(\"//x\", \"y\")\n").unwrap();
        assert!(symbols.is_empty());
    }
}
