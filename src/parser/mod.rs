//! Extraction engine and document assembly.
//!
//! One forward pass over the top-level statements: the scanner records name
//! bindings and reports rule declarations, the string literal right after a
//! rule (if any) goes through the docstring parser, and both are folded into
//! a [`RuleDoc`]. A name bound again later documents its last binding only.
//! Private rules are built like any other and dropped last.

pub mod docstring;
pub mod eval;
pub mod load;
pub mod rule;
pub mod scan;
pub mod stubs;
pub mod syntax;

use crate::error::{ExtractError, ANONYMOUS_ORIGIN};
use crate::model::{AttributeDoc, BuildLanguageDocument, LoadSymbol, OutputDoc, RuleDoc};
use docstring::DocString;
use rule::RuleDeclaration;
use scan::{Bound, Environment, FoundRule, Scanner};
use std::path::Path;
use stubs::{create_stubs, Stubs};

/// Extract the rule documentation of one source file.
pub fn parse(source: &str, load_symbols: &[LoadSymbol]) -> Result<BuildLanguageDocument, ExtractError> {
    extract(source, load_symbols, ANONYMOUS_ORIGIN)
}

/// Like [`parse`], with `path` reported as the origin of syntax errors.
pub fn parse_file(
    path: &Path,
    source: &str,
    load_symbols: &[LoadSymbol],
) -> Result<BuildLanguageDocument, ExtractError> {
    extract(source, load_symbols, &path.display().to_string())
}

fn extract(
    source: &str,
    load_symbols: &[LoadSymbol],
    origin: &str,
) -> Result<BuildLanguageDocument, ExtractError> {
    let tree = syntax::parse_tree(source, origin)?;
    let stubs = create_stubs(&Stubs::new(), load_symbols);
    let mut scanner = Scanner::new(source, Environment::from_stubs(&stubs));

    let statements = syntax::children(tree.root_node());
    // Every top-level name in first-binding order; `None` once it no longer
    // holds a rule. The last binding of a name decides what it documents.
    let mut bound: Vec<(String, Option<RuleDoc>)> = Vec::new();

    for (i, stmt) in statements.iter().enumerate() {
        let (name, rule_doc) = match scanner.scan(*stmt) {
            Some(Bound::Rule(FoundRule { name, declaration })) => {
                let docs = statements
                    .get(i + 1)
                    .and_then(|next| syntax::bare_string(*next))
                    .and_then(|literal| syntax::string_value(literal, source))
                    .map(|text| docstring::parse(&text))
                    .unwrap_or_default();
                let rule_doc = assemble(name.clone(), declaration, docs);
                (name, Some(rule_doc))
            }
            Some(Bound::Other(name)) => (name, None),
            None => continue,
        };

        match bound.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => {
                if slot.is_some() {
                    tracing::debug!(rule = %name, "rule rebound; earlier declaration replaced");
                }
                *slot = rule_doc;
            }
            None => bound.push((name, rule_doc)),
        }
    }

    let rules = bound
        .into_iter()
        .filter_map(|(_, rule_doc)| rule_doc)
        .filter(|rule_doc| {
            let private = rule_doc.name.starts_with('_');
            if private {
                tracing::debug!(rule = %rule_doc.name, "skipping private rule");
            }
            !private
        })
        .collect();

    Ok(BuildLanguageDocument { rules })
}

/// Merge a rule's declared schema with its docstring.
fn assemble(name: String, declaration: RuleDeclaration, mut docs: DocString) -> RuleDoc {
    let mut attributes = Vec::with_capacity(declaration.attributes.len() + 1);
    attributes.push(AttributeDoc::synthetic_name(docs.args.remove("name")));

    for mut attr in declaration.attributes {
        if attr.name == "name" {
            tracing::debug!(rule = %name, "declared `name` attribute shadowed by the implicit one");
            continue;
        }
        if let Some(text) = docs.args.remove(&attr.name) {
            attr.documentation = Some(text);
        }
        attributes.push(attr);
    }

    let outputs = declaration
        .outputs
        .into_iter()
        .map(|(key, template)| OutputDoc {
            template,
            documentation: docs.outputs.remove(&key),
        })
        .collect();

    RuleDoc {
        name,
        kind: declaration.kind,
        documentation: docs.description,
        example_documentation: docs.example,
        attributes,
        outputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeType, RuleKind};

    #[test]
    fn docstring_must_directly_follow_the_rule() {
        let src = "r = rule(implementation = _impl)\nx = 1\n\"\"\"Not the rule's docstring.\"\"\"\n";
        let doc = parse(src, &[]).unwrap();
        assert_eq!(doc.rules.len(), 1);
        assert_eq!(doc.rules[0].documentation, None);
    }

    #[test]
    fn comments_between_rule_and_docstring_are_skipped() {
        let src = "r = rule(implementation = _impl)\n# comment\n\"\"\"Doc.\"\"\"\n";
        let doc = parse(src, &[]).unwrap();
        assert_eq!(doc.rules[0].documentation.as_deref(), Some("Doc."));
    }

    #[test]
    fn docstring_overrides_attr_doc_argument() {
        let src = "r = rule(attrs = {\"a\": attr.int(doc = \"From attr.\"), \"b\": attr.int(doc = \"Kept.\")})\n\"\"\"Doc.\n\nArgs:\n  a: From docstring.\n  undeclared: Ignored.\n\"\"\"\n";
        let doc = parse(src, &[]).unwrap();
        let rule = &doc.rules[0];
        assert_eq!(
            rule.attribute("a").and_then(|a| a.documentation.as_deref()),
            Some("From docstring.")
        );
        assert_eq!(
            rule.attribute("b").and_then(|a| a.documentation.as_deref()),
            Some("Kept.")
        );
        assert!(rule.attribute("undeclared").is_none());
    }

    #[test]
    fn attribute_order_follows_declaration() {
        let src = "r = rule(attrs = {\"z\": attr.int(), \"a\": attr.bool()})\n\"\"\"Doc.\n\nArgs:\n  a: A.\n  z: Z.\n\"\"\"\n";
        let doc = parse(src, &[]).unwrap();
        let names: Vec<_> = doc.rules[0].attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["name", "z", "a"]);
        assert_eq!(doc.rules[0].attributes[0].attr_type, AttributeType::Unknown);
        assert_eq!(doc.rules[0].kind, RuleKind::Rule);
    }

    #[test]
    fn syntax_errors_carry_the_path() {
        let err = parse_file(Path::new("pkg/defs.bzl"), "r = rule(\n", &[]).unwrap_err();
        assert!(err.to_string().starts_with("pkg/defs.bzl:"), "{err}");
    }
}
