//! A pretty printer for the core language.
//!
//! Bound variables are printed using the names of their binders, made unique
//! by appending primes where a binder would otherwise shadow a name that is
//! still in scope. Anonymous binders are given generated alphabetic names.
//!
//! Example:
//!
//! ```
//! use lambdapi::core::pretty::Context;
//! use lambdapi::core::{Checkable, Inferable};
//! use lambdapi::source::Span;
//!
//! let term = Checkable::Inf(Inferable::Star(Span::Empty));
//! let doc = Context::new().term(&term);
//! assert_eq!(doc.pretty(80).to_string(), "*");
//! ```

use std::fmt;

use pretty::RcDoc;

use crate::core::formers::Arg;
use crate::core::{Checkable, Inferable, Name};
use crate::env::{Index, UniqueEnv};
use crate::symbol::Symbol;

/// Term precedences
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Top = 0,
    Arrow,
    App,
    Atomic,
}

const INDENT: isize = 2;

/// Width used by the [`Display`][fmt::Display] impls, wide enough that
/// terms in messages stay on one line.
const DISPLAY_WIDTH: usize = 1 << 16;

pub struct Context {
    /// The names of the binders in scope.
    names: UniqueEnv<Symbol>,
}

impl Context {
    pub fn new() -> Context {
        Context {
            names: UniqueEnv::new(),
        }
    }

    pub fn term(&mut self, term: &Checkable) -> RcDoc<'static> {
        self.checkable(Prec::Top, term)
    }

    pub fn inferable_term(&mut self, term: &Inferable) -> RcDoc<'static> {
        self.inferable(Prec::Top, term)
    }

    fn is_bound(&self, name: Symbol) -> bool {
        self.names.iter().any(|bound| *bound == name)
    }

    /// Choose a name for a binder that does not shadow any name in scope,
    /// nor capture a global that occurs in `body`.
    fn fresh_name(&self, name: Option<Symbol>, body: &Checkable) -> Symbol {
        let is_taken = |name| self.is_bound(name) || checkable_mentions(body, name);
        let name = match name {
            Some(name) => name,
            None => {
                let mut index = 0;
                loop {
                    let name = Symbol::get_alphabetic_name(index);
                    if !is_taken(name) {
                        break name;
                    }
                    index += 1;
                }
            }
        };

        let mut candidate = name;
        let mut primed = name.resolve().to_owned();
        while is_taken(candidate) {
            primed.push('\'');
            candidate = Symbol::intern(&primed);
        }
        candidate
    }

    fn checkable(&mut self, prec: Prec, term: &Checkable) -> RcDoc<'static> {
        match term {
            Checkable::Inf(term) => self.inferable(prec, term),
            Checkable::Lam(..) => {
                let mut params = Vec::new();
                let mut body = term;
                while let Checkable::Lam(_, name, next) = body {
                    let name = self.fresh_name(*name, next);
                    self.names.push(name);
                    params.push(name);
                    body = &**next;
                }
                let body = self.checkable(Prec::Arrow, body);
                for _ in &params {
                    self.names.pop();
                }

                Self::paren(
                    prec > Prec::Arrow,
                    RcDoc::concat([
                        RcDoc::concat([
                            RcDoc::text("λ"),
                            RcDoc::intersperse(params.into_iter().map(ident), RcDoc::space()),
                            RcDoc::text("."),
                        ])
                        .group(),
                        RcDoc::line().append(body).nest(INDENT),
                    ])
                    .group(),
                )
            }
            Checkable::Former(_, former) => self.former(prec, former.name(), former.args()),
        }
    }

    fn inferable(&mut self, prec: Prec, term: &Inferable) -> RcDoc<'static> {
        match term {
            Inferable::Ann(_, expr, r#type) => Self::paren(
                prec > Prec::Top,
                RcDoc::concat([
                    RcDoc::concat([
                        self.checkable(Prec::Arrow, expr),
                        RcDoc::space(),
                        RcDoc::text(":"),
                    ])
                    .group(),
                    RcDoc::softline(),
                    self.checkable(Prec::Arrow, r#type),
                ])
                .group(),
            ),
            Inferable::Star(_) => RcDoc::text("*"),
            Inferable::Pi(_, name, domain, codomain) => {
                let dependent = checkable_binds(codomain, Index::last());
                let name = self.fresh_name(*name, codomain);
                let head = if dependent {
                    RcDoc::concat([
                        RcDoc::text("forall"),
                        RcDoc::space(),
                        RcDoc::text("("),
                        ident(name),
                        RcDoc::space(),
                        RcDoc::text(":"),
                        RcDoc::space(),
                        self.checkable(Prec::Top, domain),
                        RcDoc::text(")"),
                    ])
                } else {
                    self.checkable(Prec::App, domain)
                };

                self.names.push(name);
                let codomain = self.checkable(Prec::Arrow, codomain);
                self.names.pop();

                Self::paren(
                    prec > Prec::Arrow,
                    RcDoc::concat([
                        RcDoc::concat([head, RcDoc::space(), RcDoc::text("->")]).group(),
                        RcDoc::softline(),
                        codomain,
                    ])
                    .group(),
                )
            }
            Inferable::Bound(_, index) => match self.names.get_index(*index) {
                Some(name) => ident(*name),
                None => RcDoc::text(format!("#{index}")),
            },
            Inferable::Free(_, Name::Global(name)) => ident(*name),
            Inferable::Free(_, Name::Local(level)) => RcDoc::text(format!("%{level}")),
            Inferable::Free(_, Name::Quote(level)) => RcDoc::text(format!("'{level}")),
            Inferable::App(_, head, arg) => Self::paren(
                prec > Prec::App,
                RcDoc::concat([
                    self.inferable(Prec::App, head),
                    RcDoc::line()
                        .append(self.checkable(Prec::Atomic, arg))
                        .nest(INDENT),
                ])
                .group(),
            ),
            Inferable::Former(_, former) => match former.to_numeral() {
                Some(number) => RcDoc::text(number.to_string()),
                None => self.former(prec, former.name(), former.args()),
            },
        }
    }

    /// Term-formers are printed as applications of their identifier.
    fn former(&mut self, prec: Prec, name: &'static str, args: Vec<Arg<'_>>) -> RcDoc<'static> {
        if args.is_empty() {
            return RcDoc::text(name);
        }

        let args = (args.into_iter())
            .map(|arg| {
                let arg = match arg {
                    Arg::Inferable(term) => self.inferable(Prec::Atomic, term),
                    Arg::Checkable(term) => self.checkable(Prec::Atomic, term),
                };
                RcDoc::line().append(arg).nest(INDENT)
            })
            .collect::<Vec<_>>();

        Self::paren(
            prec > Prec::App,
            RcDoc::text(name).append(RcDoc::concat(args)).group(),
        )
    }

    /// Wrap a document in parens.
    fn paren(wrap: bool, doc: RcDoc<'static>) -> RcDoc<'static> {
        if wrap {
            RcDoc::concat([RcDoc::text("("), doc, RcDoc::text(")")])
        } else {
            doc
        }
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}

fn ident(name: Symbol) -> RcDoc<'static> {
    RcDoc::text(name.resolve().to_owned())
}

/// Returns true if `Bound(index)` occurs in `term`.
fn checkable_binds(term: &Checkable, index: Index) -> bool {
    match term {
        Checkable::Inf(term) => inferable_binds(term, index),
        Checkable::Lam(_, _, body) => checkable_binds(body, index.prev()),
        Checkable::Former(_, former) => args_bind(former.args(), index),
    }
}

fn inferable_binds(term: &Inferable, index: Index) -> bool {
    match term {
        Inferable::Ann(_, expr, r#type) => {
            checkable_binds(expr, index) || checkable_binds(r#type, index)
        }
        Inferable::Star(_) | Inferable::Free(..) => false,
        Inferable::Pi(_, _, domain, codomain) => {
            checkable_binds(domain, index) || checkable_binds(codomain, index.prev())
        }
        Inferable::Bound(_, var) => *var == index,
        Inferable::App(_, head, arg) => inferable_binds(head, index) || checkable_binds(arg, index),
        Inferable::Former(_, former) => args_bind(former.args(), index),
    }
}

fn args_bind(args: Vec<Arg<'_>>, index: Index) -> bool {
    args.into_iter().any(|arg| match arg {
        Arg::Inferable(term) => inferable_binds(term, index),
        Arg::Checkable(term) => checkable_binds(term, index),
    })
}

/// Returns true if the global `name` occurs in `term`.
fn checkable_mentions(term: &Checkable, name: Symbol) -> bool {
    match term {
        Checkable::Inf(term) => inferable_mentions(term, name),
        Checkable::Lam(_, _, body) => checkable_mentions(body, name),
        Checkable::Former(_, former) => args_mention(former.args(), name),
    }
}

fn inferable_mentions(term: &Inferable, name: Symbol) -> bool {
    match term {
        Inferable::Ann(_, expr, r#type) => {
            checkable_mentions(expr, name) || checkable_mentions(r#type, name)
        }
        Inferable::Star(_) | Inferable::Bound(..) => false,
        Inferable::Free(_, free) => *free == Name::Global(name),
        Inferable::Pi(_, _, domain, codomain) => {
            checkable_mentions(domain, name) || checkable_mentions(codomain, name)
        }
        Inferable::App(_, head, arg) => inferable_mentions(head, name) || checkable_mentions(arg, name),
        Inferable::Former(_, former) => args_mention(former.args(), name),
    }
}

fn args_mention(args: Vec<Arg<'_>>, name: Symbol) -> bool {
    args.into_iter().any(|arg| match arg {
        Arg::Inferable(term) => inferable_mentions(term, name),
        Arg::Checkable(term) => checkable_mentions(term, name),
    })
}

impl fmt::Display for Checkable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = Context::new().term(self);
        write!(f, "{}", doc.pretty(DISPLAY_WIDTH))
    }
}

impl fmt::Display for Inferable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = Context::new().inferable_term(self);
        write!(f, "{}", doc.pretty(DISPLAY_WIDTH))
    }
}
