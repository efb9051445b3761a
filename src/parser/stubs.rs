//! Placeholder bindings for names imported through load statements.

use crate::model::LoadSymbol;
use std::collections::BTreeMap;

/// Locally visible name → placeholder value.
pub type Stubs = BTreeMap<String, String>;

/// The inert value every loaded name is bound to.
pub const STUB_VALUE: &str = "";

/// Extend `existing` with one stub per load symbol, keyed on the symbol's
/// local alias (or original name when not aliased). Later entries win.
pub fn create_stubs(existing: &Stubs, load_symbols: &[LoadSymbol]) -> Stubs {
    let mut stubs = existing.clone();
    for symbol in load_symbols {
        stubs.insert(symbol.local_name().to_string(), STUB_VALUE.to_string());
    }
    stubs
}
