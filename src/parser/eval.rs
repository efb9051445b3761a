//! Bounded symbolic evaluation of configuration-language expressions.
//!
//! Only literals, name references, list/dict displays and a handful of calls
//! (`attr.<kind>(...)`, `Label(...)`, zero-argument calls to in-file helper
//! functions) are understood. Everything else evaluates to [`Value::Opaque`].

use super::scan::{Environment, Resolved};
use super::syntax::{self, kinds};
use tree_sitter::Node;

/// Nesting limit for expression evaluation.
const MAX_EXPR_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    /// Insertion-ordered mapping
    Dict(Vec<(Value, Value)>),
    /// Reference to a function defined in the file
    Function(String),
    /// Result of an `attr.<kind>(...)` constructor call
    Attr(AttrSpec),
    /// A name imported through a load statement
    Stub,
    Opaque,
}

/// An attribute constructor call: the `<kind>` of `attr.<kind>` and its
/// evaluated keyword arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub kind: String,
    pub kwargs: Vec<(String, Value)>,
}

impl AttrSpec {
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Render as a literal in the configuration language's own syntax.
    /// Values with no literal form (functions, stubs, opaque) yield `None`.
    pub fn to_literal(&self) -> Option<String> {
        match self {
            Value::None => Some("None".to_string()),
            Value::Bool(true) => Some("True".to_string()),
            Value::Bool(false) => Some("False".to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::Str(s) => Some(quote(s)),
            Value::List(items) => {
                let parts = items
                    .iter()
                    .map(Value::to_literal)
                    .collect::<Option<Vec<_>>>()?;
                Some(format!("[{}]", parts.join(", ")))
            }
            Value::Dict(entries) => {
                let parts = entries
                    .iter()
                    .map(|(k, v)| Some(format!("{}: {}", k.to_literal()?, v.to_literal()?)))
                    .collect::<Option<Vec<_>>>()?;
                Some(format!("{{{}}}", parts.join(", ")))
            }
            Value::Function(_) | Value::Attr(_) | Value::Stub | Value::Opaque => None,
        }
    }
}

/// Quote a string the way the configuration language prints it: single
/// quotes unless the text holds a single quote and no double quote.
pub fn quote(s: &str) -> String {
    let q = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(q);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == q => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(q);
    out
}

/// Evaluates expression nodes against a read-only environment.
pub struct Evaluator<'a> {
    env: &'a Environment,
    source: &'a str,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: &'a Environment, source: &'a str) -> Self {
        Evaluator { env, source }
    }

    pub fn eval(&self, node: Node) -> Value {
        self.eval_at(node, 0)
    }

    fn eval_at(&self, node: Node, depth: usize) -> Value {
        if depth > MAX_EXPR_DEPTH {
            return Value::Opaque;
        }
        match node.kind() {
            kinds::NONE => Value::None,
            kinds::TRUE => Value::Bool(true),
            kinds::FALSE => Value::Bool(false),
            kinds::INTEGER => parse_int(syntax::text(node, self.source))
                .map(Value::Int)
                .unwrap_or(Value::Opaque),
            kinds::STRING | kinds::CONCATENATED_STRING => syntax::string_value(node, self.source)
                .map(Value::Str)
                .unwrap_or(Value::Opaque),
            kinds::IDENTIFIER => self.env.resolve(syntax::text(node, self.source)).into(),
            kinds::PARENTHESIZED_EXPRESSION => match syntax::children(node).as_slice() {
                [inner] => self.eval_at(*inner, depth + 1),
                _ => Value::Opaque,
            },
            kinds::UNARY_OPERATOR => self.eval_unary(node, depth),
            kinds::BINARY_OPERATOR => self.eval_binary(node, depth),
            kinds::LIST => self.eval_list(node, depth),
            kinds::DICTIONARY => self.eval_dict(node, depth),
            kinds::CALL => self.eval_call(node, depth),
            _ => Value::Opaque,
        }
    }

    fn eval_unary(&self, node: Node, depth: usize) -> Value {
        let (Some(op), Some(arg)) = (
            node.child_by_field_name("operator"),
            node.child_by_field_name("argument"),
        ) else {
            return Value::Opaque;
        };
        match (syntax::text(op, self.source), self.eval_at(arg, depth + 1)) {
            ("-", Value::Int(n)) => n.checked_neg().map(Value::Int).unwrap_or(Value::Opaque),
            ("+", Value::Int(n)) => Value::Int(n),
            _ => Value::Opaque,
        }
    }

    fn eval_binary(&self, node: Node, depth: usize) -> Value {
        let (Some(left), Some(op), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("operator"),
            node.child_by_field_name("right"),
        ) else {
            return Value::Opaque;
        };
        if syntax::text(op, self.source) != "+" {
            return Value::Opaque;
        }
        match (self.eval_at(left, depth + 1), self.eval_at(right, depth + 1)) {
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Value::List(a)
            }
            (Value::Str(a), Value::Str(b)) => Value::Str(a + &b),
            (Value::Int(a), Value::Int(b)) => {
                a.checked_add(b).map(Value::Int).unwrap_or(Value::Opaque)
            }
            _ => Value::Opaque,
        }
    }

    fn eval_list(&self, node: Node, depth: usize) -> Value {
        Value::List(
            syntax::children(node)
                .into_iter()
                .map(|item| self.eval_at(item, depth + 1))
                .collect(),
        )
    }

    fn eval_dict(&self, node: Node, depth: usize) -> Value {
        let mut entries = Vec::new();
        for item in syntax::children(node) {
            // `**other` splats are not followed
            if item.kind() != kinds::PAIR {
                return Value::Opaque;
            }
            let (Some(key), Some(value)) = (
                item.child_by_field_name("key"),
                item.child_by_field_name("value"),
            ) else {
                return Value::Opaque;
            };
            let key = self.eval_at(key, depth + 1);
            let value = self.eval_at(value, depth + 1);
            // a repeated key keeps its first position and takes the last value
            match entries
                .iter_mut()
                .find(|(k, _)| *k == key && key.to_literal().is_some())
            {
                Some((_, slot)) => *slot = value,
                None => entries.push((key, value)),
            }
        }
        Value::Dict(entries)
    }

    fn eval_call(&self, node: Node, depth: usize) -> Value {
        let (Some(callee), Some(args)) = (
            node.child_by_field_name("function"),
            node.child_by_field_name("arguments"),
        ) else {
            return Value::Opaque;
        };
        if args.kind() != kinds::ARGUMENT_LIST {
            return Value::Opaque;
        }

        match callee.kind() {
            kinds::ATTRIBUTE => self.eval_method_call(callee, args, depth),
            kinds::IDENTIFIER => {
                let name = syntax::text(callee, self.source);
                if name == "Label" && self.env.is_builtin(name) {
                    return self.eval_label(args);
                }
                if !syntax::children(args).is_empty() {
                    return Value::Opaque;
                }
                self.env.resolve_call(name).into()
            }
            _ => Value::Opaque,
        }
    }

    /// `attr.<kind>(...)`
    fn eval_method_call(&self, callee: Node, args: Node, depth: usize) -> Value {
        let (Some(object), Some(method)) = (
            callee.child_by_field_name("object"),
            callee.child_by_field_name("attribute"),
        ) else {
            return Value::Opaque;
        };
        let object_name = syntax::text(object, self.source);
        if object.kind() != kinds::IDENTIFIER
            || object_name != "attr"
            || !self.env.is_builtin(object_name)
        {
            return Value::Opaque;
        }
        let (_, kwargs) = self.eval_arguments(args, depth);
        Value::Attr(AttrSpec {
            kind: syntax::text(method, self.source).to_string(),
            kwargs,
        })
    }

    /// `Label("//pkg:target", ...)` evaluates to its path.
    fn eval_label(&self, args: Node) -> Value {
        syntax::children(args)
            .into_iter()
            .find(|a| a.kind() != kinds::KEYWORD_ARGUMENT)
            .and_then(|a| syntax::string_value(a, self.source))
            .map(Value::Str)
            .unwrap_or(Value::Opaque)
    }

    /// Evaluate a call's positional and keyword arguments.
    pub fn arguments(&self, args: Node) -> (Vec<Value>, Vec<(String, Value)>) {
        self.eval_arguments(args, 0)
    }

    fn eval_arguments(&self, args: Node, depth: usize) -> (Vec<Value>, Vec<(String, Value)>) {
        let mut positional = Vec::new();
        let mut keyword = Vec::new();
        for arg in syntax::children(args) {
            if arg.kind() == kinds::KEYWORD_ARGUMENT {
                if let (Some(name), Some(value)) = (
                    arg.child_by_field_name("name"),
                    arg.child_by_field_name("value"),
                ) {
                    keyword.push((
                        syntax::text(name, self.source).to_string(),
                        self.eval_at(value, depth + 1),
                    ));
                }
            } else {
                positional.push(self.eval_at(arg, depth + 1));
            }
        }
        (positional, keyword)
    }
}

impl From<Resolved> for Value {
    fn from(resolved: Resolved) -> Self {
        match resolved {
            Resolved::Function(name) => Value::Function(name),
            Resolved::Value(value) => value,
            Resolved::Stub => Value::Stub,
            Resolved::Opaque => Value::Opaque,
        }
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let digits = text.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        lower.parse().ok()
    }
}
