//! The global signature: top-level definitions and axioms.

use std::rc::Rc;

use fxhash::FxHashMap;

use crate::core::semantics::{RcValue, Type, Value};
use crate::core::Name;
use crate::symbol::Symbol;

/// The values of global definitions.
///
/// This is a persistent map so that closures can cheaply capture the
/// definitions that were in scope when they were created.
pub type GlobalValues = rpds::HashTrieMap<Symbol, RcValue>;

/// Parallel maps from names to values and to types.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    values: GlobalValues,
    types: FxHashMap<Symbol, Type>,
    /// Names in the order they were first declared.
    names: Vec<Symbol>,
}

impl Globals {
    pub fn new() -> Globals {
        Globals::default()
    }

    pub fn values(&self) -> &GlobalValues {
        &self.values
    }

    pub fn value(&self, name: Symbol) -> Option<&RcValue> {
        self.values.get(&name)
    }

    pub fn r#type(&self, name: Symbol) -> Option<&Type> {
        self.types.get(&name)
    }

    /// Record a definition, replacing any previous definition or axiom of the
    /// same name.
    pub fn define(&mut self, name: Symbol, value: RcValue, r#type: Type) {
        if self.types.insert(name, r#type).is_none() {
            self.names.push(name);
        }
        self.values.insert_mut(name, value);
    }

    /// Record an axiom. Its value is the name itself, as a free variable.
    pub fn postulate(&mut self, name: Symbol, r#type: Type) {
        self.define(name, Rc::new(Value::global(name)), r#type);
    }

    /// Returns true if `name` was declared with [`Globals::postulate`].
    pub fn is_axiom(&self, name: Symbol) -> bool {
        matches!(
            self.value(name).map(|value| value.as_ref()),
            Some(Value::Stuck(Name::Global(head), spine)) if *head == name && spine.is_empty()
        )
    }

    /// Iterate over the declared names and their types, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &Type)> {
        (self.names.iter()).filter_map(|name| Some((*name, self.types.get(name)?)))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Remove every definition and axiom.
    pub fn clear(&mut self) {
        *self = Globals::new();
    }
}
