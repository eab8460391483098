//! Core language.
//!
//! Terms are split into two families. [`Inferable`] terms synthesize their
//! own type, while [`Checkable`] terms can only be checked against a type
//! that is already known. Bound variables are de Bruijn [indices][Index].

use std::rc::Rc;

use crate::env::{Index, Level};
use crate::source::Span;
use crate::symbol::Symbol;

pub mod formers;
pub mod globals;
pub mod pretty;
pub mod semantics;
pub mod typing;

#[cfg(test)]
pub(crate) mod testing;

pub use self::formers::{CheckableFormer, InferableFormer};

/// Names of free variables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// Top-level definitions and axioms.
    Global(Symbol),
    /// Variables introduced by the type checker when it goes under a binder,
    /// identified by the binder depth.
    Local(Level),
    /// Variables introduced while reading back a closure. These never escape
    /// [read-back][semantics::QuoteContext].
    Quote(Level),
}

/// Terms that synthesize their own type.
#[derive(Debug, Clone)]
pub enum Inferable {
    /// Annotated terms.
    Ann(Span, Rc<Checkable>, Rc<Checkable>),
    /// The type of types.
    Star(Span),
    /// Dependent function types. The codomain refers to the parameter as
    /// `Bound(0)`.
    Pi(Span, Option<Symbol>, Rc<Checkable>, Rc<Checkable>),
    /// Variables bound by an enclosing binder.
    Bound(Span, Index),
    /// Free variables.
    Free(Span, Name),
    /// Function applications.
    App(Span, Rc<Inferable>, Rc<Checkable>),
    /// Term-formers that synthesize their type.
    Former(Span, Rc<dyn InferableFormer>),
}

/// Terms that are checked against a known type.
#[derive(Debug, Clone)]
pub enum Checkable {
    /// Inferable terms, checked by comparing the synthesized type.
    Inf(Inferable),
    /// Function literals. The body refers to the parameter as `Bound(0)`.
    Lam(Span, Option<Symbol>, Rc<Checkable>),
    /// Term-formers that can only be checked.
    Former(Span, Rc<dyn CheckableFormer>),
}

impl Inferable {
    pub fn span(&self) -> Span {
        match self {
            Inferable::Ann(span, ..)
            | Inferable::Star(span)
            | Inferable::Pi(span, ..)
            | Inferable::Bound(span, _)
            | Inferable::Free(span, _)
            | Inferable::App(span, ..)
            | Inferable::Former(span, _) => *span,
        }
    }

    pub fn global(name: Symbol) -> Inferable {
        Inferable::Free(Span::Empty, Name::Global(name))
    }

    pub fn app(head: Inferable, arg: impl Into<Checkable>) -> Inferable {
        Inferable::App(Span::Empty, Rc::new(head), Rc::new(arg.into()))
    }

    pub fn former(former: impl InferableFormer + 'static) -> Inferable {
        Inferable::Former(Span::Empty, Rc::new(former))
    }

    /// Replace occurrences of `Bound(index)` with `replacement`, shifting the
    /// target index each time a binder is crossed.
    ///
    /// The replacement is always a closed term (a fresh free variable), so it
    /// never needs to be shifted itself.
    pub fn subst(&self, index: Index, replacement: &Inferable) -> Inferable {
        match self {
            Inferable::Ann(span, expr, r#type) => Inferable::Ann(
                *span,
                Rc::new(expr.subst(index, replacement)),
                Rc::new(r#type.subst(index, replacement)),
            ),
            Inferable::Star(_) | Inferable::Free(..) => self.clone(),
            Inferable::Pi(span, name, domain, codomain) => Inferable::Pi(
                *span,
                *name,
                Rc::new(domain.subst(index, replacement)),
                Rc::new(codomain.subst(index.prev(), replacement)),
            ),
            Inferable::Bound(_, var) if *var == index => replacement.clone(),
            Inferable::Bound(..) => self.clone(),
            Inferable::App(span, head, arg) => Inferable::App(
                *span,
                Rc::new(head.subst(index, replacement)),
                Rc::new(arg.subst(index, replacement)),
            ),
            Inferable::Former(span, former) => {
                Inferable::Former(*span, former.subst(index, replacement))
            }
        }
    }
}

impl Checkable {
    pub fn span(&self) -> Span {
        match self {
            Checkable::Inf(term) => term.span(),
            Checkable::Lam(span, ..) | Checkable::Former(span, _) => *span,
        }
    }

    /// See [`Inferable::subst`].
    pub fn subst(&self, index: Index, replacement: &Inferable) -> Checkable {
        match self {
            Checkable::Inf(term) => Checkable::Inf(term.subst(index, replacement)),
            Checkable::Lam(span, name, body) => Checkable::Lam(
                *span,
                *name,
                Rc::new(body.subst(index.prev(), replacement)),
            ),
            Checkable::Former(span, former) => {
                Checkable::Former(*span, former.subst(index, replacement))
            }
        }
    }
}

impl From<Inferable> for Checkable {
    fn from(term: Inferable) -> Checkable {
        Checkable::Inf(term)
    }
}

// Equality is alpha-equivalence: spans and binder names are ignored.

impl PartialEq for Inferable {
    fn eq(&self, other: &Inferable) -> bool {
        match (self, other) {
            (Inferable::Ann(_, expr0, type0), Inferable::Ann(_, expr1, type1)) => {
                expr0 == expr1 && type0 == type1
            }
            (Inferable::Star(_), Inferable::Star(_)) => true,
            (Inferable::Pi(_, _, domain0, codomain0), Inferable::Pi(_, _, domain1, codomain1)) => {
                domain0 == domain1 && codomain0 == codomain1
            }
            (Inferable::Bound(_, var0), Inferable::Bound(_, var1)) => var0 == var1,
            (Inferable::Free(_, name0), Inferable::Free(_, name1)) => name0 == name1,
            (Inferable::App(_, head0, arg0), Inferable::App(_, head1, arg1)) => {
                head0 == head1 && arg0 == arg1
            }
            (Inferable::Former(_, former0), Inferable::Former(_, former1)) => former0 == former1,
            (_, _) => false,
        }
    }
}

impl PartialEq for Checkable {
    fn eq(&self, other: &Checkable) -> bool {
        match (self, other) {
            (Checkable::Inf(term0), Checkable::Inf(term1)) => term0 == term1,
            (Checkable::Lam(_, _, body0), Checkable::Lam(_, _, body1)) => body0 == body1,
            (Checkable::Former(_, former0), Checkable::Former(_, former1)) => former0 == former1,
            (_, _) => false,
        }
    }
}
