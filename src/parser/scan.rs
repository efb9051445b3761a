//! Declaration scanner. Walks top-level statements and keeps the name
//! bindings needed to resolve rule implementations and attribute schemas.

use super::eval::{Evaluator, Value};
use super::rule::{self, RuleDeclaration};
use super::stubs::Stubs;
use super::syntax::{self, kinds};
use std::collections::HashMap;
use tree_sitter::Node;

/// Alias/call chains longer than this resolve to [`Resolved::Opaque`].
const MAX_INDIRECTION: usize = 16;

/// What a top-level name is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Imported through a load statement, or predefined by the caller
    Stub,
    Function(FunctionDef),
    /// `x = y`
    Alias(String),
    /// `x = f()` where `f` is not a rule constructor
    CallResult(String),
    /// `x = rule(...)` / `x = repository_rule(...)`
    Rule,
    /// Any other right-hand side, evaluated when bound
    Value(Value),
}

/// The parts of a `def` the scanner cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    /// Parameters without a default value
    pub required_params: usize,
    /// Set when the body is nothing but `return <name>` (plus a docstring)
    pub returns: Option<String>,
}

/// Outcome of resolving a name through the environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Function(String),
    Value(Value),
    Stub,
    Opaque,
}

/// Name bindings visible at the current point of the scan.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    bindings: HashMap<String, Binding>,
}

impl Environment {
    pub fn from_stubs(stubs: &Stubs) -> Self {
        Environment {
            bindings: stubs
                .keys()
                .map(|name| (name.clone(), Binding::Stub))
                .collect(),
        }
    }

    pub fn bind(&mut self, name: &str, binding: Binding) {
        self.bindings.insert(name.to_string(), binding);
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// A predefined name (`rule`, `attr`, `Label`, ...) that the file has
    /// not rebound or imported over.
    pub fn is_builtin(&self, name: &str) -> bool {
        !self.bindings.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Resolved {
        self.resolve_at(name, 0)
    }

    /// Resolve the result of calling `callee` with no arguments.
    pub fn resolve_call(&self, callee: &str) -> Resolved {
        self.resolve_call_at(callee, 0)
    }

    fn resolve_at(&self, name: &str, depth: usize) -> Resolved {
        if depth > MAX_INDIRECTION {
            tracing::debug!(name, "indirection limit reached; treating as opaque");
            return Resolved::Opaque;
        }
        match self.bindings.get(name) {
            Some(Binding::Stub) => Resolved::Stub,
            Some(Binding::Function(def)) => Resolved::Function(def.name.clone()),
            Some(Binding::Alias(target)) => self.resolve_at(target, depth + 1),
            Some(Binding::CallResult(callee)) => self.resolve_call_at(callee, depth + 1),
            Some(Binding::Value(value)) => Resolved::Value(value.clone()),
            Some(Binding::Rule) | None => Resolved::Opaque,
        }
    }

    fn resolve_call_at(&self, callee: &str, depth: usize) -> Resolved {
        if depth > MAX_INDIRECTION {
            tracing::debug!(callee, "indirection limit reached; treating as opaque");
            return Resolved::Opaque;
        }
        match self.bindings.get(callee) {
            Some(Binding::Function(FunctionDef {
                required_params: 0,
                returns: Some(target),
                ..
            })) => self.resolve_at(target, depth + 1),
            Some(Binding::Alias(target)) => self.resolve_call_at(target, depth + 1),
            _ => Resolved::Opaque,
        }
    }
}

/// A rule found by the scanner, bound to `name`.
#[derive(Debug)]
pub struct FoundRule {
    pub name: String,
    pub declaration: RuleDeclaration,
}

/// The top-level name a statement binds.
#[derive(Debug)]
pub enum Bound {
    Rule(FoundRule),
    /// Bound to anything other than a rule
    Other(String),
}

/// Single forward pass over a file's top-level statements.
pub struct Scanner<'s> {
    source: &'s str,
    env: Environment,
}

impl<'s> Scanner<'s> {
    pub fn new(source: &'s str, env: Environment) -> Self {
        Scanner { source, env }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Record the binding a statement introduces and report which name it
    /// bound. Rules carry their recognized declaration.
    pub fn scan(&mut self, stmt: Node) -> Option<Bound> {
        match stmt.kind() {
            kinds::FUNCTION_DEFINITION => {
                let def = function_def(stmt, self.source)?;
                let name = def.name.clone();
                self.env.bind(&name, Binding::Function(def));
                Some(Bound::Other(name))
            }
            kinds::EXPRESSION_STATEMENT => {
                let assignment = syntax::children(stmt)
                    .into_iter()
                    .find(|c| c.kind() == kinds::ASSIGNMENT)?;
                self.scan_assignment(assignment)
            }
            _ => None,
        }
    }

    fn scan_assignment(&mut self, assignment: Node) -> Option<Bound> {
        let left = assignment.child_by_field_name("left")?;
        let right = assignment.child_by_field_name("right")?;
        if left.kind() != kinds::IDENTIFIER {
            return None;
        }
        let name = syntax::text(left, self.source).to_string();

        if let Some(kind) = rule::rule_kind(right, self.source, &self.env) {
            let declaration = rule::recognize(right, kind, self.source, &self.env);
            tracing::trace!(rule = %name, ?kind, "recognized rule declaration");
            self.env.bind(&name, Binding::Rule);
            return Some(Bound::Rule(FoundRule { name, declaration }));
        }

        let binding = self.binding_for(right);
        self.env.bind(&name, binding);
        Some(Bound::Other(name))
    }

    fn binding_for(&self, expr: Node) -> Binding {
        match expr.kind() {
            kinds::IDENTIFIER => Binding::Alias(syntax::text(expr, self.source).to_string()),
            kinds::CALL => match zero_arg_callee(expr, self.source) {
                Some(callee) if !self.env.is_builtin(callee) => {
                    Binding::CallResult(callee.to_string())
                }
                _ => Binding::Value(Evaluator::new(&self.env, self.source).eval(expr)),
            },
            _ => Binding::Value(Evaluator::new(&self.env, self.source).eval(expr)),
        }
    }
}

/// `f()` → `Some("f")`
fn zero_arg_callee<'s>(call: Node, source: &'s str) -> Option<&'s str> {
    let callee = call.child_by_field_name("function")?;
    let args = call.child_by_field_name("arguments")?;
    if callee.kind() != kinds::IDENTIFIER
        || args.kind() != kinds::ARGUMENT_LIST
        || !syntax::children(args).is_empty()
    {
        return None;
    }
    Some(syntax::text(callee, source))
}

fn function_def(node: Node, source: &str) -> Option<FunctionDef> {
    let name = syntax::text(node.child_by_field_name("name")?, source).to_string();
    let required_params = node
        .child_by_field_name("parameters")
        .map(|params| {
            syntax::children(params)
                .iter()
                .filter(|p| p.kind() == kinds::IDENTIFIER)
                .count()
        })
        .unwrap_or(0);
    let returns = node
        .child_by_field_name("body")
        .and_then(|body| single_returned_name(body, source));
    Some(FunctionDef {
        name,
        required_params,
        returns,
    })
}

/// The name returned by a body consisting of an optional docstring and a
/// single `return <identifier>`.
fn single_returned_name(body: Node, source: &str) -> Option<String> {
    let mut statements = syntax::children(body);
    if statements.first().is_some_and(|s| syntax::bare_string(*s).is_some()) {
        statements.remove(0);
    }
    let [stmt] = statements.as_slice() else {
        return None;
    };
    if stmt.kind() != kinds::RETURN_STATEMENT {
        return None;
    }
    match syntax::children(*stmt).as_slice() {
        [value] if value.kind() == kinds::IDENTIFIER => Some(syntax::text(*value, source).to_string()),
        _ => None,
    }
}
