//! Rule recognizer. Turns a `rule(...)` / `repository_rule(...)` call into
//! an attribute and output schema.

use super::docstring;
use super::eval::{AttrSpec, Evaluator, Value};
use super::scan::Environment;
use super::syntax::{self, kinds};
use crate::model::{AttributeDoc, AttributeType, RuleKind};
use tree_sitter::Node;

/// How a rule's `implementation` argument resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Implementation {
    Function(String),
    Unresolved,
}

/// Everything the call site of a rule declares.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDeclaration {
    pub kind: RuleKind,
    pub implementation: Implementation,
    /// Declared attributes in declaration order (no synthetic `name`)
    pub attributes: Vec<AttributeDoc>,
    /// `(key, template)` pairs in declaration order
    pub outputs: Vec<(String, String)>,
}

/// The kind of rule `expr` constructs, if it is a call to an unshadowed
/// `rule` or `repository_rule`.
pub fn rule_kind(expr: Node, source: &str, env: &Environment) -> Option<RuleKind> {
    if expr.kind() != kinds::CALL {
        return None;
    }
    let callee = expr.child_by_field_name("function")?;
    if callee.kind() != kinds::IDENTIFIER {
        return None;
    }
    let name = syntax::text(callee, source);
    if !env.is_builtin(name) {
        return None;
    }
    match name {
        "rule" => Some(RuleKind::Rule),
        "repository_rule" => Some(RuleKind::RepositoryRule),
        _ => None,
    }
}

/// Evaluate a rule call's arguments into a [`RuleDeclaration`].
pub fn recognize(call: Node, kind: RuleKind, source: &str, env: &Environment) -> RuleDeclaration {
    let evaluator = Evaluator::new(env, source);
    let (positional, keyword) = match call.child_by_field_name("arguments") {
        Some(args) if args.kind() == kinds::ARGUMENT_LIST => evaluator.arguments(args),
        _ => (Vec::new(), Vec::new()),
    };
    let kwarg = |name: &str| keyword.iter().find(|(k, _)| k == name).map(|(_, v)| v);

    let implementation = match kwarg("implementation").or(positional.first()) {
        Some(Value::Function(name)) => Implementation::Function(name.clone()),
        _ => {
            tracing::debug!("rule implementation could not be resolved");
            Implementation::Unresolved
        }
    };

    let attributes = match kwarg("attrs") {
        Some(Value::Dict(entries)) => entries
            .iter()
            .filter_map(|(key, value)| Some(attribute(key.as_str()?, value)))
            .collect(),
        Some(Value::None) | None => Vec::new(),
        Some(other) => {
            tracing::debug!(?other, "attrs is not a mapping literal; no attributes extracted");
            Vec::new()
        }
    };

    let outputs = match kwarg("outputs") {
        Some(Value::Dict(entries)) => entries
            .iter()
            .filter_map(|(key, template)| {
                Some((key.as_str()?.to_string(), template.as_str()?.to_string()))
            })
            .collect(),
        _ => Vec::new(),
    };

    RuleDeclaration {
        kind,
        implementation,
        attributes,
        outputs,
    }
}

/// Build an attribute from its name and `attr.<kind>(...)` value.
fn attribute(name: &str, value: &Value) -> AttributeDoc {
    let Value::Attr(spec) = value else {
        tracing::debug!(attribute = name, "attribute value is not an attr constructor");
        return AttributeDoc {
            name: name.to_string(),
            attr_type: AttributeType::Unknown,
            mandatory: false,
            documentation: None,
            default: None,
        };
    };

    let attr_type = AttributeType::from_constructor(&spec.kind);
    if attr_type == AttributeType::Unknown {
        tracing::debug!(attribute = name, kind = %spec.kind, "unrecognized attribute constructor");
    }
    let mandatory = matches!(spec.kwarg("mandatory"), Some(Value::Bool(true)));
    let documentation = spec
        .kwarg("doc")
        .and_then(Value::as_str)
        .and_then(|doc| docstring::normalize(doc.lines()));

    AttributeDoc {
        name: name.to_string(),
        attr_type,
        mandatory,
        documentation,
        default: if mandatory {
            None
        } else {
            default_literal(attr_type, spec)
        },
    }
}

/// The attribute's default as a literal, explicit or implied by its type.
fn default_literal(attr_type: AttributeType, spec: &AttrSpec) -> Option<String> {
    match spec.kwarg("default") {
        Some(value) => render_default(attr_type, value),
        None => implicit_default(attr_type).map(str::to_string),
    }
}

/// Label-like defaults print as their bare path; everything else uses
/// literal syntax.
pub fn render_default(attr_type: AttributeType, value: &Value) -> Option<String> {
    match (attr_type, value) {
        (AttributeType::License | AttributeType::Unknown, _) => None,
        (t, Value::Str(path)) if t.is_label_like() => Some(path.clone()),
        (t, Value::None) if t.is_label_like() => None,
        _ => value.to_literal(),
    }
}

fn implicit_default(attr_type: AttributeType) -> Option<&'static str> {
    match attr_type {
        AttributeType::Boolean => Some("False"),
        AttributeType::Integer => Some("0"),
        AttributeType::String => Some("''"),
        AttributeType::IntegerList
        | AttributeType::LabelList
        | AttributeType::OutputList
        | AttributeType::StringList => Some("[]"),
        AttributeType::StringDict | AttributeType::StringListDict => Some("{}"),
        AttributeType::Label
        | AttributeType::Output
        | AttributeType::License
        | AttributeType::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::scan::{Binding, FunctionDef};

    fn recognize_src(src: &str, env: &Environment) -> RuleDeclaration {
        let tree = syntax::parse_tree(src, "test").unwrap();
        let stmt = syntax::children(tree.root_node())[0];
        let assignment = syntax::children(stmt)[0];
        let call = assignment.child_by_field_name("right").unwrap();
        let kind = rule_kind(call, src, env).expect("rule call");
        recognize(call, kind, src, env)
    }

    fn env_with_impl() -> Environment {
        let mut env = Environment::default();
        env.bind(
            "_impl",
            Binding::Function(FunctionDef {
                name: "_impl".into(),
                required_params: 1,
                returns: None,
            }),
        );
        env
    }

    #[test]
    fn no_attrs() {
        let decl = recognize_src("r = rule(implementation = _impl)\n", &env_with_impl());
        assert_eq!(decl.kind, RuleKind::Rule);
        assert_eq!(decl.implementation, Implementation::Function("_impl".into()));
        assert!(decl.attributes.is_empty());
        assert!(decl.outputs.is_empty());
    }

    #[test]
    fn positional_implementation() {
        let decl = recognize_src("r = repository_rule(_impl)\n", &env_with_impl());
        assert_eq!(decl.kind, RuleKind::RepositoryRule);
        assert_eq!(decl.implementation, Implementation::Function("_impl".into()));
    }

    #[test]
    fn unresolved_implementation_still_extracts_schema() {
        let decl = recognize_src(
            "r = rule(implementation = impls[0], attrs = {\"a\": attr.int()})\n",
            &Environment::default(),
        );
        assert_eq!(decl.implementation, Implementation::Unresolved);
        assert_eq!(decl.attributes.len(), 1);
        assert_eq!(decl.attributes[0].default.as_deref(), Some("0"));
    }

    #[test]
    fn mandatory_attributes_have_no_default() {
        let decl = recognize_src(
            "r = rule(attrs = {\"path\": attr.string(mandatory = True), \"opt\": attr.string()})\n",
            &Environment::default(),
        );
        assert!(decl.attributes[0].mandatory);
        assert_eq!(decl.attributes[0].default, None);
        assert!(!decl.attributes[1].mandatory);
        assert_eq!(decl.attributes[1].default.as_deref(), Some("''"));
    }

    #[test]
    fn unknown_constructors_and_values() {
        let decl = recognize_src(
            "r = rule(attrs = {\"a\": attr.label_keyed_string_dict(), \"b\": some_helper(), 3: attr.int()})\n",
            &Environment::default(),
        );
        assert_eq!(decl.attributes.len(), 2);
        assert_eq!(decl.attributes[0].attr_type, AttributeType::Unknown);
        assert_eq!(decl.attributes[0].default, None);
        assert_eq!(decl.attributes[1].name, "b");
        assert_eq!(decl.attributes[1].attr_type, AttributeType::Unknown);
    }

    #[test]
    fn outputs_in_declaration_order() {
        let decl = recognize_src(
            "r = rule(outputs = {\"jar\": \"%{name}.jar\", \"deploy_jar\": \"%{name}_deploy.jar\"})\n",
            &Environment::default(),
        );
        assert_eq!(
            decl.outputs,
            vec![
                ("jar".to_string(), "%{name}.jar".to_string()),
                ("deploy_jar".to_string(), "%{name}_deploy.jar".to_string()),
            ]
        );
    }

    #[test]
    fn attrs_through_a_named_mapping() {
        let mut env = Environment::default();
        env.bind(
            "_COMMON",
            Binding::Value(Value::Dict(vec![(
                Value::Str("deps".into()),
                Value::Attr(AttrSpec {
                    kind: "label_list".into(),
                    kwargs: vec![],
                }),
            )])),
        );
        let decl = recognize_src("r = rule(attrs = _COMMON)\n", &env);
        assert_eq!(decl.attributes.len(), 1);
        assert_eq!(decl.attributes[0].attr_type, AttributeType::LabelList);
        assert_eq!(decl.attributes[0].default.as_deref(), Some("[]"));
    }

    #[test]
    fn attr_doc_is_normalized() {
        let decl = recognize_src(
            "r = rule(attrs = {\"a\": attr.int(doc = \"One.\\n\\n\\n\\nTwo.   \\n\"), \"b\": attr.int(doc = \"  \\n \")})\n",
            &Environment::default(),
        );
        assert_eq!(decl.attributes[0].documentation.as_deref(), Some("One.\n\nTwo."));
        assert_eq!(decl.attributes[1].documentation, None);
    }

    #[test]
    fn repeated_attribute_keys_keep_the_last_value() {
        let decl = recognize_src(
            "r = rule(attrs = {\"a\": attr.int(), \"b\": attr.bool(), \"a\": attr.string()})\n",
            &Environment::default(),
        );
        let attrs: Vec<_> = decl
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.attr_type))
            .collect();
        assert_eq!(
            attrs,
            [("a", AttributeType::String), ("b", AttributeType::Boolean)]
        );
    }

    #[test]
    fn label_defaults() {
        assert_eq!(
            render_default(AttributeType::Label, &Value::Str("//foo:bar".into())).as_deref(),
            Some("//foo:bar")
        );
        assert_eq!(
            render_default(
                AttributeType::LabelList,
                &Value::List(vec![Value::Str("//foo:bar".into()), Value::Str("//bar:baz".into())])
            )
            .as_deref(),
            Some("['//foo:bar', '//bar:baz']")
        );
        assert_eq!(render_default(AttributeType::Label, &Value::None), None);
        assert_eq!(render_default(AttributeType::License, &Value::Str("x".into())), None);
        assert_eq!(render_default(AttributeType::Label, &Value::Stub), None);
    }
}
