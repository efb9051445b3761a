//! ruledoc: extract reference documentation from build rule definitions.
//!
//! Given the text of a build definition file and the symbols it imports
//! through load statements, [`parse`] finds every top-level `rule(...)` and
//! `repository_rule(...)` declaration, evaluates its attribute and output
//! schema without executing any code, pairs it with the docstring that
//! follows it, and returns a [`BuildLanguageDocument`].
//!
//! ```no_run
//! let source = std::fs::read_to_string("defs.bzl")?;
//! let loads = ruledoc::extract_loads(&source)?;
//! let doc = ruledoc::parse(&source, &loads)?;
//! for rule in &doc.rules {
//!     println!("{} ({} attributes)", rule.name, rule.attributes.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod model;
pub mod parser;

pub use error::ExtractError;
pub use model::{
    AttributeDoc, AttributeType, BuildLanguageDocument, LoadSymbol, OutputDoc, RuleDoc, RuleKind,
};
pub use parser::load::extract_loads;
pub use parser::stubs::{create_stubs, Stubs};
pub use parser::{parse, parse_file};
