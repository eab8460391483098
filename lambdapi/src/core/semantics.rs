//! The operational semantics of the core language, implemented using
//! [normalisation by evaluation](https://en.wikipedia.org/wiki/Normalisation_by_evaluation).
//!
//! Values are never compared directly. Two values are equal when they read
//! back to the same term at the same binder depth.

use std::fmt;
use std::panic::panic_any;
use std::rc::Rc;

use crate::core::formers::{FormerValue, NeutralFormer};
use crate::core::globals::GlobalValues;
use crate::core::{Checkable, Inferable, Name};
use crate::env::{EnvLen, Level, SharedEnv};
use crate::source::Span;
use crate::symbol::Symbol;

/// Reference counted values. We use reference counting to increase the
/// amount of sharing we can achieve during evaluation.
pub type RcValue = Rc<Value>;

/// Values in weak-head-normal form, with bindings converted to closures.
#[derive(Debug, Clone)]
pub enum Value {
    /// A free variable along with a spine of eliminations that are blocked on
    /// it. Subsequent eliminations applied to this value are accumulated in
    /// the spine.
    Stuck(Name, Vec<Elim>),
    /// The type of types.
    Star,
    /// Dependent function types.
    Pi(Option<Symbol>, RcValue, Closure),
    /// Function literals.
    Lam(Option<Symbol>, Closure),
    /// Values introduced by term-formers.
    Former(Rc<dyn FormerValue>),
}

impl Value {
    pub fn free(name: Name) -> Value {
        Value::Stuck(name, Vec::new())
    }

    pub fn local(level: Level) -> Value {
        Value::free(Name::Local(level))
    }

    pub fn global(name: Symbol) -> Value {
        Value::free(Name::Global(name))
    }

    pub fn former(value: impl FormerValue) -> Value {
        Value::Former(Rc::new(value))
    }

    /// Downcast a value introduced by a term-former.
    pub fn as_former<T: FormerValue>(&self) -> Option<&T> {
        match self {
            Value::Former(value) => (**value).as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Add an elimination to the spine of a stuck value, returning `None` if
    /// the value is not stuck.
    pub fn push_elim(&self, elim: Elim) -> Option<RcValue> {
        match self {
            Value::Stuck(head, spine) => {
                let mut spine = spine.clone();
                spine.push(elim);
                Some(Rc::new(Value::Stuck(*head, spine)))
            }
            _ => None,
        }
    }
}

/// A pending elimination to be reduced if the head of a [stuck
/// value][Value::Stuck] becomes known.
#[derive(Debug, Clone)]
pub enum Elim {
    /// Function eliminations.
    Fun(RcValue),
    /// Term-former eliminators.
    Former(Rc<dyn NeutralFormer>),
}

/// A closure is a term that can later be instantiated with a value.
#[derive(Clone)]
pub struct Closure {
    /// Local environment where the closed [body][Self::body] is bound. A new
    /// entry will need to be pushed to this environment before evaluating the
    /// body.
    locals: SharedEnv<RcValue>,
    /// The global definitions at the time the closure was created.
    globals: GlobalValues,
    /// The term that is closed over.
    body: Rc<Checkable>,
}

impl Closure {
    pub fn new(locals: SharedEnv<RcValue>, globals: GlobalValues, body: Rc<Checkable>) -> Closure {
        Closure {
            locals,
            globals,
            body,
        }
    }

    /// Instantiate the closure with an argument.
    pub fn apply(&self, arg: RcValue) -> RcValue {
        let mut locals = self.locals.clone();
        locals.push(arg);
        EvalContext::new(&mut locals, &self.globals).eval_checkable(&self.body)
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("locals", &self.locals)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// A value that denotes a type.
#[derive(Debug, Clone)]
pub struct Type(RcValue);

impl Type {
    pub fn new(value: RcValue) -> Type {
        Type(value)
    }

    pub fn star() -> Type {
        Type(Rc::new(Value::Star))
    }

    pub fn value(&self) -> &RcValue {
        &self.0
    }
}

/// Errors encountered while evaluating terms. These are never expected for
/// terms that have passed type checking.
#[derive(Clone, Debug)]
pub enum Error {
    UnboundVariable,
    UnboundGlobal,
    UnboundQuote,
    UnexpectedBound,
    InvalidFunctionApp,
    InvalidFormerArgs,
}

impl Error {
    pub fn description(&self) -> &str {
        match &self {
            Error::UnboundVariable => "unbound variable",
            Error::UnboundGlobal => "unbound global",
            Error::UnboundQuote => "unbound quote variable",
            Error::UnexpectedBound => "unexpected bound variable",
            Error::InvalidFunctionApp => "invalid function application",
            Error::InvalidFormerArgs => "invalid term-former arguments",
        }
    }
}

/// Evaluation context.
pub struct EvalContext<'env> {
    locals: &'env mut SharedEnv<RcValue>,
    globals: &'env GlobalValues,
}

impl<'env> EvalContext<'env> {
    pub fn new(locals: &'env mut SharedEnv<RcValue>, globals: &'env GlobalValues) -> EvalContext<'env> {
        EvalContext { locals, globals }
    }

    /// Fully normalise a term by first [evaluating][EvalContext::eval] it into
    /// a [value][Value], then [quoting it back][QuoteContext::quote] into a
    /// term.
    pub fn normalise(&mut self, term: &Checkable) -> Checkable {
        let value = self.eval_checkable(term);
        QuoteContext::new(self.locals.len()).quote(&value)
    }

    /// Evaluate an inferable term into a value.
    pub fn eval(&mut self, term: &Inferable) -> RcValue {
        match term {
            Inferable::Ann(_, expr, _) => self.eval_checkable(expr),
            Inferable::Star(_) => Rc::new(Value::Star),
            Inferable::Pi(_, name, domain, codomain) => {
                let domain = self.eval_checkable(domain);
                Rc::new(Value::Pi(*name, domain, self.closure(codomain)))
            }
            Inferable::Bound(_, var) => match self.locals.get_index(*var) {
                Some(value) => value.clone(),
                None => panic_any(Error::UnboundVariable),
            },
            Inferable::Free(_, Name::Global(name)) => match self.globals.get(name) {
                Some(value) => value.clone(),
                None => panic_any(Error::UnboundGlobal),
            },
            Inferable::Free(_, name) => Rc::new(Value::free(*name)),
            Inferable::App(_, head, arg) => {
                let head = self.eval(head);
                let arg = self.eval_checkable(arg);
                apply(head, arg)
            }
            Inferable::Former(_, former) => former.eval(self),
        }
    }

    /// Evaluate a checkable term into a value.
    pub fn eval_checkable(&mut self, term: &Checkable) -> RcValue {
        match term {
            Checkable::Inf(term) => self.eval(term),
            Checkable::Lam(_, name, body) => Rc::new(Value::Lam(*name, self.closure(body))),
            Checkable::Former(_, former) => former.eval(self),
        }
    }

    fn closure(&self, body: &Rc<Checkable>) -> Closure {
        Closure::new(self.locals.clone(), self.globals.clone(), body.clone())
    }
}

/// Apply a function to an argument, performing [beta-reduction] if possible.
///
/// [beta-reduction]: https://ncatlab.org/nlab/show/beta-reduction
pub fn apply(mut head: RcValue, arg: RcValue) -> RcValue {
    match Rc::make_mut(&mut head) {
        // Beta-reduction
        Value::Lam(_, body) => body.apply(arg),
        // The computation is stuck, preventing further reduction
        Value::Stuck(_, spine) => {
            spine.push(Elim::Fun(arg));
            head
        }
        Value::Former(value) => value.apply(arg),
        Value::Star | Value::Pi(..) => panic_any(Error::InvalidFunctionApp),
    }
}

/// Apply a function to a sequence of arguments.
pub fn apply_all(head: RcValue, args: impl IntoIterator<Item = RcValue>) -> RcValue {
    args.into_iter().fold(head, apply)
}

/// Quotation context, for reading values back into terms.
pub struct QuoteContext {
    len: EnvLen,
}

impl QuoteContext {
    /// Read back values under `len` binders.
    pub fn new(len: EnvLen) -> QuoteContext {
        QuoteContext { len }
    }

    /// The current binder depth.
    pub fn len(&self) -> EnvLen {
        self.len
    }

    /// Quote a [value][Value] back into a term.
    pub fn quote(&mut self, value: &Value) -> Checkable {
        match value {
            Value::Stuck(head, spine) => Checkable::Inf(self.quote_stuck(*head, spine)),
            Value::Star => Checkable::Inf(Inferable::Star(Span::Empty)),
            Value::Pi(name, domain, codomain) => {
                let domain = self.quote(domain);
                let codomain = self.quote_closure(codomain);
                Checkable::Inf(Inferable::Pi(
                    Span::Empty,
                    *name,
                    Rc::new(domain),
                    Rc::new(codomain),
                ))
            }
            Value::Lam(name, body) => {
                Checkable::Lam(Span::Empty, *name, Rc::new(self.quote_closure(body)))
            }
            Value::Former(value) => value.reify(self),
        }
    }

    fn quote_stuck(&mut self, head: Name, spine: &[Elim]) -> Inferable {
        let head = match head {
            Name::Quote(level) => match self.len.level_to_index(level) {
                Some(index) => Inferable::Bound(Span::Empty, index),
                None => panic_any(Error::UnboundQuote),
            },
            name => Inferable::Free(Span::Empty, name),
        };

        spine.iter().fold(head, |head, elim| match elim {
            Elim::Fun(arg) => {
                let arg = self.quote(arg);
                Inferable::App(Span::Empty, Rc::new(head), Rc::new(arg))
            }
            Elim::Former(frame) => frame.neutral_reify(self, head),
        })
    }

    /// Quote the body of a closure, instantiating it with a fresh variable.
    pub fn quote_closure(&mut self, closure: &Closure) -> Checkable {
        let var = Rc::new(Value::free(Name::Quote(self.len.next_level())));
        let value = closure.apply(var);

        self.len.push();
        let term = self.quote(&value);
        self.len.pop();

        term
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Index;

    fn bound(n: u32) -> Inferable {
        let mut var = Index::last();
        for _ in 0..n {
            var = var.prev();
        }
        Inferable::Bound(Span::Empty, var)
    }

    fn lam(body: impl Into<Checkable>) -> Checkable {
        Checkable::Lam(Span::Empty, None, Rc::new(body.into()))
    }

    fn normalise(term: &Checkable, globals: &GlobalValues) -> Checkable {
        EvalContext::new(&mut SharedEnv::new(), globals).normalise(term)
    }

    #[test]
    fn quote_nested_lambdas() {
        // λx. λy. x
        let term = lam(lam(bound(1)));
        assert_eq!(normalise(&term, &GlobalValues::new()), term);
    }

    #[test]
    fn beta_reduction() {
        // (λx. λy. x : ...) applied to a free `a` reduces to `λy. a`
        let a = Symbol::intern("a");
        let globals = GlobalValues::new().insert(a, Rc::new(Value::global(a)));
        let id = Inferable::Ann(
            Span::Empty,
            Rc::new(lam(lam(bound(1)))),
            Rc::new(Checkable::Inf(Inferable::Star(Span::Empty))),
        );
        let term = Checkable::Inf(Inferable::app(id, Inferable::global(a)));

        assert_eq!(normalise(&term, &globals), lam(Inferable::global(a)));
    }

    #[test]
    fn stuck_application_reads_back() {
        let f = Symbol::intern("f");
        let a = Symbol::intern("a");
        let value = apply(Rc::new(Value::global(f)), Rc::new(Value::global(a)));
        let term = QuoteContext::new(EnvLen::new()).quote(&value);

        assert_eq!(
            term,
            Checkable::Inf(Inferable::app(Inferable::global(f), Inferable::global(a))),
        );
    }

    #[test]
    fn closures_capture_globals() {
        let a = Symbol::intern("a");
        let b = Symbol::intern("b");
        let globals = GlobalValues::new().insert(a, Rc::new(Value::global(b)));
        let mut locals = SharedEnv::new();
        let value = EvalContext::new(&mut locals, &globals)
            .eval_checkable(&lam(Inferable::global(a)));

        // The closure still sees `a` even though it is evaluated later
        let body = match value.as_ref() {
            Value::Lam(_, body) => body.apply(Rc::new(Value::Star)),
            _ => panic!("expected a lambda"),
        };
        assert!(matches!(body.as_ref(), Value::Stuck(Name::Global(name), _) if *name == b));
    }

    #[test]
    #[should_panic]
    fn applying_star_is_an_invariant_violation() {
        apply(Rc::new(Value::Star), Rc::new(Value::Star));
    }

    #[test]
    #[should_panic]
    fn unbound_global_is_an_invariant_violation() {
        let term = Inferable::global(Symbol::intern("missing"));
        EvalContext::new(&mut SharedEnv::new(), &GlobalValues::new()).eval(&term);
    }
}
