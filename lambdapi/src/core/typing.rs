//! Bidirectional type checking of core terms.
//!
//! [`Context::infer`] synthesizes the type of an [`Inferable`] term, and
//! [`Context::check`] checks a [`Checkable`] term against a type that is
//! already known. Types are [values][Value], and two types are considered
//! equal when they read back to the same term.
//!
//! Binders are never checked with `Bound` variables in their bodies. Instead
//! the bound variable is substituted for a fresh `Free(Local(level))`, where
//! `level` is the binder depth at which it was introduced.

use std::panic::panic_any;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::core::globals::Globals;
use crate::core::semantics::{self, EvalContext, QuoteContext, RcValue, Type, Value};
use crate::core::{Checkable, Inferable, Name};
use crate::env::{EnvLen, Index, SharedEnv};
use crate::files::FileId;
use crate::source::Span;
use crate::symbol::Symbol;

/// Type errors, reported to the user.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("type mismatch, expected `{expected}`, found `{found}`")]
    Mismatch {
        span: Span,
        expected: Checkable,
        found: Checkable,
    },
    #[error("Undefined variable identifier {name}")]
    UndefinedVariable {
        span: Span,
        name: Symbol,
        suggestion: Option<Symbol>,
    },
    #[error("expected function type, found `{found}`")]
    ExpectedFunctionType { span: Span, found: Checkable },
    #[error("lambda checked against non-function type `{expected}`")]
    LamNotFunction { span: Span, expected: Checkable },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::Mismatch { span, .. }
            | TypeError::UndefinedVariable { span, .. }
            | TypeError::ExpectedFunctionType { span, .. }
            | TypeError::LamNotFunction { span, .. } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        let label = match self {
            TypeError::Mismatch { .. } => "type mismatch",
            TypeError::UndefinedVariable { .. } => "not found in scope",
            TypeError::ExpectedFunctionType { .. } => "applied to an argument",
            TypeError::LamNotFunction { .. } => "unexpected function literal",
        };
        let labels = (self.span().range().into_iter())
            .map(|range| Label::primary(range.file_id(), range).with_message(label))
            .collect();
        let notes = match self {
            TypeError::UndefinedVariable {
                suggestion: Some(suggestion),
                ..
            } => vec![format!("help: a global with a similar name exists: `{suggestion}`")],
            _ => Vec::new(),
        };

        Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(labels)
            .with_notes(notes)
    }
}

/// Typing context.
#[derive(Clone)]
pub struct Context<'globals> {
    globals: &'globals Globals,
    /// The types of the local variables that have been introduced by the
    /// checker, innermost first.
    locals: rpds::List<(Name, Type)>,
    /// The current binder depth.
    len: EnvLen,
}

impl<'globals> Context<'globals> {
    pub fn new(globals: &'globals Globals) -> Context<'globals> {
        Context {
            globals,
            locals: rpds::List::new(),
            len: EnvLen::new(),
        }
    }

    pub fn globals(&self) -> &'globals Globals {
        self.globals
    }

    pub fn len(&self) -> EnvLen {
        self.len
    }

    /// Extend the context with a fresh local variable of the given type,
    /// returning the extended context and the variable.
    ///
    /// The original context is left untouched.
    pub fn bind(&self, r#type: Type) -> (Context<'globals>, Inferable) {
        let name = Name::Local(self.len.next_level());
        let context = Context {
            globals: self.globals,
            locals: self.locals.push_front((name, r#type)),
            len: self.len.succ(),
        };

        (context, Inferable::Free(Span::Empty, name))
    }

    /// Evaluate a term that has been checked in this context.
    pub fn eval(&self, term: &Checkable) -> RcValue {
        EvalContext::new(&mut SharedEnv::new(), self.globals.values()).eval_checkable(term)
    }

    pub fn eval_inferable(&self, term: &Inferable) -> RcValue {
        EvalContext::new(&mut SharedEnv::new(), self.globals.values()).eval(term)
    }

    /// Evaluate an open term, with its bound variables referring to `locals`
    /// (the last value is `Bound(0)`).
    ///
    /// Term-formers use this to build the types of their sub-terms.
    pub fn eval_in(&self, locals: impl IntoIterator<Item = RcValue>, term: &Checkable) -> RcValue {
        let mut env = SharedEnv::new();
        for value in locals {
            env.push(value);
        }
        EvalContext::new(&mut env, self.globals.values()).eval_checkable(term)
    }

    /// Read a value back into a term at the current binder depth.
    pub fn quote(&self, value: &Value) -> Checkable {
        QuoteContext::new(self.len).quote(value)
    }

    /// Check that a term is a type, returning its value.
    pub fn check_type(&self, term: &Checkable) -> Result<Type, TypeError> {
        self.check(term, &Type::star())?;
        Ok(Type::new(self.eval(term)))
    }

    /// Check that `found` is the same type as `expected`, by reading both
    /// back to terms and comparing them.
    pub fn convert(&self, span: Span, expected: &Type, found: &Type) -> Result<(), TypeError> {
        let expected = self.quote(expected.value());
        let found = self.quote(found.value());

        match expected == found {
            true => Ok(()),
            false => Err(TypeError::Mismatch {
                span,
                expected,
                found,
            }),
        }
    }

    /// Synthesize the type of a term.
    pub fn infer(&self, term: &Inferable) -> Result<Type, TypeError> {
        tracing::trace!(len = ?self.len, ?term, "infer");

        match term {
            Inferable::Ann(_, expr, r#type) => {
                let r#type = self.check_type(r#type)?;
                self.check(expr, &r#type)?;
                Ok(r#type)
            }
            Inferable::Star(_) => Ok(Type::star()),
            Inferable::Pi(_, _, domain, codomain) => {
                let domain = self.check_type(domain)?;
                let (context, var) = self.bind(domain);
                context.check_type(&codomain.subst(Index::last(), &var))?;
                Ok(Type::star())
            }
            Inferable::Bound(..) => panic_any(semantics::Error::UnexpectedBound),
            Inferable::Free(span, name) => self.lookup(*span, *name),
            Inferable::App(_, head, arg) => {
                let head_type = self.infer(head)?;
                match head_type.value().as_ref() {
                    Value::Pi(_, domain, codomain) => {
                        self.check(arg, &Type::new(domain.clone()))?;
                        Ok(Type::new(codomain.apply(self.eval(arg))))
                    }
                    _ => Err(TypeError::ExpectedFunctionType {
                        span: head.span(),
                        found: self.quote(head_type.value()),
                    }),
                }
            }
            Inferable::Former(_, former) => former.infer(self),
        }
    }

    /// Check a term against an expected type.
    pub fn check(&self, term: &Checkable, expected: &Type) -> Result<(), TypeError> {
        tracing::trace!(len = ?self.len, ?term, "check");

        match term {
            Checkable::Inf(term) => {
                let found = self.infer(term)?;
                self.convert(term.span(), expected, &found)
            }
            Checkable::Lam(span, _, body) => match expected.value().as_ref() {
                Value::Pi(_, domain, codomain) => {
                    let (context, var) = self.bind(Type::new(domain.clone()));
                    let body_type = Type::new(codomain.apply(context.eval_inferable(&var)));
                    context.check(&body.subst(Index::last(), &var), &body_type)
                }
                _ => Err(TypeError::LamNotFunction {
                    span: *span,
                    expected: self.quote(expected.value()),
                }),
            },
            Checkable::Former(_, former) => former.check(self, expected),
        }
    }

    fn lookup(&self, span: Span, name: Name) -> Result<Type, TypeError> {
        match name {
            Name::Global(symbol) => match self.globals.r#type(symbol) {
                Some(r#type) => Ok(r#type.clone()),
                None => Err(TypeError::UndefinedVariable {
                    span,
                    name: symbol,
                    suggestion: self.suggest(symbol),
                }),
            },
            Name::Local(_) => match self.locals.iter().find(|(local, _)| *local == name) {
                Some((_, r#type)) => Ok(r#type.clone()),
                None => panic_any(semantics::Error::UnboundVariable),
            },
            Name::Quote(_) => panic_any(semantics::Error::UnboundQuote),
        }
    }

    /// The global with the most similar spelling to `name`, if any is close.
    fn suggest(&self, name: Symbol) -> Option<Symbol> {
        (self.globals.iter())
            .map(|(global, _)| (levenshtein::levenshtein(name.resolve(), global.resolve()), global))
            .filter(|(distance, _)| *distance <= 2)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, global)| global)
    }
}

impl<'globals> std::fmt::Debug for Context<'globals> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}
