//! Data model for extracted rule documentation, format-agnostic.

use serde::Serialize;

/// Complete extracted document from a single source file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BuildLanguageDocument {
    pub rules: Vec<RuleDoc>,
}

impl BuildLanguageDocument {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Look up a rule by its bound name.
    pub fn rule(&self, name: &str) -> Option<&RuleDoc> {
        self.rules.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    Rule,
    RepositoryRule,
}

/// A single documented rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDoc {
    pub name: String,
    pub kind: RuleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_documentation: Option<String>,
    /// Synthetic `name` first, then declaration order
    pub attributes: Vec<AttributeDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputDoc>,
}

impl RuleDoc {
    pub fn attribute(&self, name: &str) -> Option<&AttributeDoc> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Semantic attribute type, keyed on the `attr.<kind>` constructor name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeType {
    Unknown,
    Boolean,
    Integer,
    IntegerList,
    Label,
    LabelList,
    License,
    Output,
    OutputList,
    String,
    StringDict,
    StringList,
    StringListDict,
}

impl AttributeType {
    /// Map an `attr.<kind>` constructor name onto its type.
    pub fn from_constructor(kind: &str) -> Self {
        match kind {
            "bool" => Self::Boolean,
            "int" => Self::Integer,
            "int_list" => Self::IntegerList,
            "label" => Self::Label,
            "label_list" => Self::LabelList,
            "license" => Self::License,
            "output" => Self::Output,
            "output_list" => Self::OutputList,
            "string" => Self::String,
            "string_dict" => Self::StringDict,
            "string_list" => Self::StringList,
            "string_list_dict" => Self::StringListDict,
            _ => Self::Unknown,
        }
    }

    /// Labels and outputs print their default as a bare path.
    pub fn is_label_like(self) -> bool {
        matches!(self, Self::Label | Self::Output)
    }
}

/// A single rule attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    pub mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    /// Default rendered with the configuration language's literal syntax
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl AttributeDoc {
    /// The implicit `name` attribute every rule accepts.
    pub fn synthetic_name(documentation: Option<String>) -> Self {
        AttributeDoc {
            name: "name".to_string(),
            attr_type: AttributeType::Unknown,
            mandatory: true,
            documentation,
            default: None,
        }
    }
}

/// A declared output and its path template, e.g. `%{name}.jar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDoc {
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// A name imported through a load statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSymbol {
    pub module_path: String,
    pub original_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_alias: Option<String>,
}

impl LoadSymbol {
    pub fn new(module_path: &str, original_name: &str, local_alias: Option<&str>) -> Self {
        LoadSymbol {
            module_path: module_path.to_string(),
            original_name: original_name.to_string(),
            local_alias: local_alias.map(str::to_string),
        }
    }

    /// The name this symbol is visible under in the loading file.
    pub fn local_name(&self) -> &str {
        self.local_alias.as_deref().unwrap_or(&self.original_name)
    }
}
