//! Term-formers supplied by extensions.
//!
//! A term-former is a constructor, type-former or eliminator that takes part
//! in elaboration, checking, evaluation and read-back without the core term
//! and value types knowing about it. Each one is a self-contained unit:
//!
//! - a term node implementing [`InferableFormer`] or [`CheckableFormer`],
//! - value nodes implementing [`FormerValue`] for its canonical forms,
//! - stuck eliminator frames implementing [`NeutralFormer`],
//! - a [`FormerSpec`] in the [`Registry`], which the elaborator consults when
//!   it sees the former's identifier applied to arguments.

use std::any::Any;
use std::fmt;
use std::panic::panic_any;
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::core::semantics::{self, EvalContext, QuoteContext, RcValue, Type};
use crate::core::typing::{Context, TypeError};
use crate::core::{Checkable, Inferable};
use crate::env::Index;
use crate::source::Span;
use crate::symbol::Symbol;

pub mod nat;
pub mod vec;

/// Upcasting to [`Any`], so that values of extension types can be
/// inspected by the extension that defined them.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Structural equality between term-formers of possibly different types.
pub trait DynEq: AsAny {
    fn dyn_eq(&self, other: &dyn Any) -> bool;
}

impl<T: Any + PartialEq> DynEq for T {
    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().map_or(false, |other| self == other)
    }
}

/// A sub-term of a term-former, used for printing.
#[derive(Debug, Copy, Clone)]
pub enum Arg<'a> {
    Inferable(&'a Inferable),
    Checkable(&'a Checkable),
}

/// A term-former that synthesizes its type.
pub trait InferableFormer: DynEq + fmt::Debug {
    /// The identifier the former is registered under.
    fn name(&self) -> &'static str;

    /// The sub-terms of the former, in the order they are written.
    fn args(&self) -> Vec<Arg<'_>>;

    fn infer(&self, context: &Context<'_>) -> Result<Type, TypeError>;

    fn eval(&self, context: &mut EvalContext<'_>) -> RcValue;

    /// Substitute into every sub-term, as in [`Inferable::subst`].
    fn subst(&self, index: Index, replacement: &Inferable) -> Rc<dyn InferableFormer>;

    /// The natural number this term denotes, if it is a numeral.
    fn to_numeral(&self) -> Option<u64> {
        None
    }
}

/// A term-former that can only be checked against a known type.
pub trait CheckableFormer: DynEq + fmt::Debug {
    /// The identifier the former is registered under.
    fn name(&self) -> &'static str;

    /// The sub-terms of the former, in the order they are written.
    fn args(&self) -> Vec<Arg<'_>>;

    fn check(&self, context: &Context<'_>, expected: &Type) -> Result<(), TypeError>;

    fn eval(&self, context: &mut EvalContext<'_>) -> RcValue;

    /// Substitute into every sub-term, as in [`Checkable::subst`].
    fn subst(&self, index: Index, replacement: &Inferable) -> Rc<dyn CheckableFormer>;
}

impl PartialEq for dyn InferableFormer {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other.as_any())
    }
}

impl PartialEq for dyn CheckableFormer {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other.as_any())
    }
}

/// Values introduced by a term-former.
pub trait FormerValue: AsAny + fmt::Debug {
    /// Read the value back into a term at the depth of `context`.
    fn reify(&self, context: &mut QuoteContext) -> Checkable;

    /// Apply the value to an argument. Constructors and type formers are not
    /// functions, so by default this is an invariant violation.
    fn apply(&self, _arg: RcValue) -> RcValue {
        panic_any(semantics::Error::InvalidFunctionApp)
    }
}

/// An eliminator that is stuck on a neutral scrutinee.
///
/// These live in the spine of a [stuck value][semantics::Value::Stuck], so
/// further eliminations stack up behind them.
pub trait NeutralFormer: fmt::Debug {
    /// Read the eliminator back, given the term that its scrutinee was read
    /// back to.
    fn neutral_reify(&self, context: &mut QuoteContext, scrut: Inferable) -> Inferable;
}

/// The way an argument of a term-former should be elaborated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArgKind {
    Inferable,
    Checkable,
}

/// An elaborated argument, passed to a [`FormerSpec::build`] function.
#[derive(Debug, Clone)]
pub enum Operand {
    Inferable(Inferable),
    Checkable(Checkable),
}

impl Operand {
    pub fn into_checkable(self) -> Checkable {
        match self {
            Operand::Inferable(term) => Checkable::Inf(term),
            Operand::Checkable(term) => term,
        }
    }

    pub fn into_inferable(self) -> Inferable {
        match self {
            Operand::Inferable(term) | Operand::Checkable(Checkable::Inf(term)) => term,
            Operand::Checkable(_) => panic_any(semantics::Error::InvalidFormerArgs),
        }
    }
}

/// The result of building a term-former.
pub enum Former {
    Inferable(Rc<dyn InferableFormer>),
    Checkable(Rc<dyn CheckableFormer>),
}

impl Former {
    pub fn inferable(former: impl InferableFormer + 'static) -> Former {
        Former::Inferable(Rc::new(former))
    }

    pub fn checkable(former: impl CheckableFormer + 'static) -> Former {
        Former::Checkable(Rc::new(former))
    }
}

/// How to recognise and build a term-former.
#[derive(Debug, Copy, Clone)]
pub struct FormerSpec {
    pub name: &'static str,
    pub args: &'static [ArgKind],
    /// Called with exactly one operand per entry of `args`, of the matching
    /// kind.
    pub build: fn(Vec<Operand>) -> Former,
}

impl FormerSpec {
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// Collect exactly `N` checkable operands.
pub fn checkable_operands<const N: usize>(operands: Vec<Operand>) -> [Rc<Checkable>; N] {
    let operands = (operands.into_iter())
        .map(|operand| Rc::new(operand.into_checkable()))
        .collect::<Vec<_>>();

    operands
        .try_into()
        .unwrap_or_else(|_| panic_any(semantics::Error::InvalidFormerArgs))
}

// Building blocks for the types of eliminators. These are open terms, to be
// evaluated with [`Context::eval_in`].

/// `Bound(index)`.
pub(crate) fn bound(index: u32) -> Inferable {
    let index = (0..index).fold(Index::last(), |index, _| index.prev());
    Inferable::Bound(Span::Empty, index)
}

/// A dependent function type, binding `name` in the codomain.
pub(crate) fn pi(
    name: &'static str,
    domain: impl Into<Checkable>,
    codomain: impl Into<Checkable>,
) -> Inferable {
    let name = Some(Symbol::intern_static(name));
    Inferable::Pi(Span::Empty, name, Rc::new(domain.into()), Rc::new(codomain.into()))
}

/// A non-dependent function type.
pub(crate) fn arrow(domain: impl Into<Checkable>, codomain: impl Into<Checkable>) -> Inferable {
    Inferable::Pi(Span::Empty, None, Rc::new(domain.into()), Rc::new(codomain.into()))
}

/// Apply a term to each of `args` in turn.
pub(crate) fn apps(head: Inferable, args: impl IntoIterator<Item = Inferable>) -> Inferable {
    args.into_iter().fold(head, |head, arg| Inferable::app(head, arg))
}

/// The table of term-formers known to the elaborator.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    formers: FxHashMap<Symbol, FormerSpec>,
}

impl Registry {
    /// A registry without any term-formers.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry with the natural number and vector term-formers.
    pub fn builtin() -> Registry {
        let mut registry = Registry::new();
        nat::register(&mut registry);
        vec::register(&mut registry);
        registry
    }

    /// Add a term-former, replacing any former of the same name.
    pub fn register(&mut self, spec: FormerSpec) {
        self.formers.insert(Symbol::intern_static(spec.name), spec);
    }

    pub fn get(&self, name: Symbol) -> Option<&FormerSpec> {
        self.formers.get(&name)
    }
}
