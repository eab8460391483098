//! Elaboration of the surface language into the core language.
//!
//! Variables are resolved to De Bruijn indices if they refer to a binder in
//! scope, to term-formers if the [`Registry`] knows their name, and to
//! globals otherwise. Globals are not looked up here: an undefined global is
//! a type error, reported by the checker.
//!
//! Applications of term-formers are collected from the application spine.
//! A former consumes exactly as many arguments as it declares, and any
//! further arguments are applied to the result in the usual way.

use std::rc::Rc;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::core::formers::{ArgKind, Former, FormerSpec, Operand, Registry};
use crate::core::{Checkable, Inferable, Name};
use crate::env::UniqueEnv;
use crate::files::FileId;
use crate::source::{ByteRange, FileRange, Span};
use crate::surface::Term;
use crate::symbol::Symbol;

/// Errors in the shape of a surface term.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ElabError {
    #[error("cannot infer the type of a function literal")]
    LamNotInferable { span: Span },
    #[error("Term former '{name}' expects {expected} argument(s), but got {found}")]
    FormerArity {
        span: Span,
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("cannot infer the type of term former '{name}'")]
    FormerNotInferable { span: Span, name: &'static str },
    #[error("number literals are not supported without the `Zero` and `Succ` term formers")]
    NumberNotSupported { span: Span },
}

impl ElabError {
    pub fn span(&self) -> Span {
        match self {
            ElabError::LamNotInferable { span }
            | ElabError::FormerArity { span, .. }
            | ElabError::FormerNotInferable { span, .. }
            | ElabError::NumberNotSupported { span } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        let (label, notes) = match self {
            ElabError::LamNotInferable { .. } | ElabError::FormerNotInferable { .. } => (
                "type annotations needed",
                vec!["help: add a type annotation with `:`".to_owned()],
            ),
            ElabError::FormerArity { .. } => (
                "missing arguments",
                vec!["Term former does not support currying".to_owned()],
            ),
            ElabError::NumberNotSupported { .. } => ("number literal", Vec::new()),
        };
        let labels = (self.span().range().into_iter())
            .map(|range| Label::primary(range.file_id(), range).with_message(label))
            .collect();

        Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(labels)
            .with_notes(notes)
    }
}

/// Elaboration context.
pub struct Context<'registry> {
    file_id: FileId,
    registry: &'registry Registry,
    /// Names of the binders in scope. Anonymous function types bind a
    /// variable that cannot be referred to.
    names: UniqueEnv<Option<Symbol>>,
}

impl<'registry> Context<'registry> {
    pub fn new(file_id: FileId, registry: &'registry Registry) -> Context<'registry> {
        Context {
            file_id,
            registry,
            names: UniqueEnv::new(),
        }
    }

    fn span(&self, range: ByteRange) -> Span {
        Span::Range(FileRange::new(self.file_id, range))
    }

    /// Elaborate a closed term whose type can be inferred.
    pub fn elaborate(&mut self, term: &Term) -> Result<Inferable, ElabError> {
        self.synth(term)
    }

    fn inferable(&self, term: Checkable) -> Result<Inferable, ElabError> {
        match term {
            Checkable::Inf(term) => Ok(term),
            Checkable::Lam(span, ..) => Err(ElabError::LamNotInferable { span }),
            Checkable::Former(span, former) => Err(ElabError::FormerNotInferable {
                span,
                name: former.name(),
            }),
        }
    }

    fn synth(&mut self, term: &Term) -> Result<Inferable, ElabError> {
        let term = self.check(term)?;
        self.inferable(term)
    }

    fn check(&mut self, term: &Term) -> Result<Checkable, ElabError> {
        match term {
            Term::Ann(range, expr, r#type) => {
                let expr = self.check(expr)?;
                let r#type = self.check(r#type)?;
                Ok(Inferable::Ann(self.span(*range), Rc::new(expr), Rc::new(r#type)).into())
            }
            Term::Star(range) => Ok(Inferable::Star(self.span(*range)).into()),
            Term::Pi(range, name, domain, codomain) => {
                let name = name.as_ref().map(|(_, name)| *name);
                let domain = self.check(domain)?;
                self.names.push(name);
                let codomain = self.check(codomain);
                self.names.pop();

                Ok(Inferable::Pi(self.span(*range), name, Rc::new(domain), Rc::new(codomain?)).into())
            }
            Term::Lam(range, (_, name), body) => {
                self.names.push(Some(*name));
                let body = self.check(body);
                self.names.pop();

                Ok(Checkable::Lam(self.span(*range), Some(*name), Rc::new(body?)))
            }
            Term::Var(..) | Term::App(..) => self.app(term),
            Term::Number(range, number) => self.number(*range, *number),
        }
    }

    /// Elaborate an application spine, or a lone variable.
    fn app(&mut self, term: &Term) -> Result<Checkable, ElabError> {
        let mut spine = Vec::new();
        let mut head = term;
        while let Term::App(range, fun, arg) = head {
            spine.push((*range, arg.as_ref()));
            head = fun;
        }
        spine.reverse();

        let (mut term, rest) = match self.former_spec(head) {
            Some(spec) => {
                if spine.len() < spec.arity() {
                    return Err(ElabError::FormerArity {
                        span: self.span(term.range()),
                        name: spec.name,
                        expected: spec.arity(),
                        found: spine.len(),
                    });
                }

                let (args, rest) = spine.split_at(spec.arity());
                let range = args.last().map_or(head.range(), |(range, _)| *range);
                let mut operands = Vec::with_capacity(args.len());
                for (kind, (_, arg)) in spec.args.iter().zip(args) {
                    operands.push(match kind {
                        ArgKind::Inferable => Operand::Inferable(self.synth(arg)?),
                        ArgKind::Checkable => Operand::Checkable(self.check(arg)?),
                    });
                }

                (self.build(range, &spec, operands), rest)
            }
            None => {
                let head = match head {
                    Term::Var(range, name) => self.var(*range, *name),
                    head => self.synth(head)?,
                };
                (Checkable::Inf(head), &spine[..])
            }
        };

        for (range, arg) in rest {
            let head = self.inferable(term)?;
            let arg = self.check(arg)?;
            term = Inferable::App(self.span(*range), Rc::new(head), Rc::new(arg)).into();
        }

        Ok(term)
    }

    fn var(&self, range: ByteRange, name: Symbol) -> Inferable {
        match self.names.position(|bound| *bound == Some(name)) {
            Some(index) => Inferable::Bound(self.span(range), index),
            None => Inferable::Free(self.span(range), Name::Global(name)),
        }
    }

    /// The term-former that `head` refers to, unless a binder shadows it.
    fn former_spec(&self, head: &Term) -> Option<FormerSpec> {
        match head {
            Term::Var(_, name) if self.names.position(|bound| *bound == Some(*name)).is_none() => {
                self.registry.get(*name).copied()
            }
            _ => None,
        }
    }

    fn build(&self, range: ByteRange, spec: &FormerSpec, operands: Vec<Operand>) -> Checkable {
        let span = self.span(range);
        match (spec.build)(operands) {
            Former::Inferable(former) => Inferable::Former(span, former).into(),
            Former::Checkable(former) => Checkable::Former(span, former),
        }
    }

    /// Number literals are sugar for `Succ` chains ending in `Zero`.
    fn number(&self, range: ByteRange, number: u64) -> Result<Checkable, ElabError> {
        let (zero, succ) = match (
            self.registry.get(Symbol::intern_static("Zero")),
            self.registry.get(Symbol::intern_static("Succ")),
        ) {
            (Some(zero), Some(succ)) if zero.arity() == 0 && succ.arity() == 1 => (*zero, *succ),
            _ => return Err(ElabError::NumberNotSupported { span: self.span(range) }),
        };

        let mut term = self.build(range, &zero, Vec::new());
        for _ in 0..number {
            let operand = match succ.args[0] {
                ArgKind::Inferable => Operand::Inferable(self.inferable(term)?),
                ArgKind::Checkable => Operand::Checkable(term),
            };
            term = self.build(range, &succ, vec![operand]);
        }
        Ok(term)
    }
}
