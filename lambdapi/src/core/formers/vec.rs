//! Length-indexed vectors.
//!
//! ```text
//! Vec : * -> Nat -> *
//! Nil : (a : *) -> Vec a 0
//! Cons : (a : *) -> (n : Nat) -> a -> Vec a n -> Vec a (Succ n)
//! vecElim : (a : *) ->
//!           (m : forall (n : Nat) -> Vec a n -> *) ->
//!           m 0 (Nil a) ->
//!           (forall (n : Nat) (x : a) (xs : Vec a n) -> m n xs -> m (Succ n) (Cons a n x xs)) ->
//!           (n : Nat) -> (xs : Vec a n) -> m n xs
//! ```

use std::panic::panic_any;
use std::rc::Rc;

use crate::core::formers::nat::{self, nat_type, Nat, Succ};
use crate::core::formers::{
    apps, arrow, bound, checkable_operands, pi, Arg, ArgKind, Former, FormerSpec, FormerValue,
    InferableFormer, NeutralFormer, Registry,
};
use crate::core::semantics::{self, apply_all, Elim, EvalContext, QuoteContext, RcValue};
use crate::core::semantics::{Type, Value};
use crate::core::typing::{Context, TypeError};
use crate::core::{Checkable, Inferable};
use crate::env::Index;
use crate::source::Span;

pub fn register(registry: &mut Registry) {
    registry.register(FormerSpec {
        name: "Vec",
        args: &[ArgKind::Checkable; 2],
        build: |operands| {
            let [elem, len] = checkable_operands(operands);
            Former::inferable(VecType { elem, len })
        },
    });
    registry.register(FormerSpec {
        name: "Nil",
        args: &[ArgKind::Checkable],
        build: |operands| {
            let [elem] = checkable_operands(operands);
            Former::inferable(Nil { elem })
        },
    });
    registry.register(FormerSpec {
        name: "Cons",
        args: &[ArgKind::Checkable; 4],
        build: |operands| {
            let [elem, len, head, tail] = checkable_operands(operands);
            Former::inferable(Cons {
                elem,
                len,
                head,
                tail,
            })
        },
    });
    registry.register(FormerSpec {
        name: "vecElim",
        args: &[ArgKind::Checkable; 6],
        build: |operands| {
            let [elem, motive, base, step, len, scrut] = checkable_operands(operands);
            Former::inferable(VecElim {
                elem,
                motive,
                base,
                step,
                len,
                scrut,
            })
        },
    });
}

/// The type of vectors of `len` elements of type `elem`.
pub fn vec_type(elem: RcValue, len: RcValue) -> Type {
    Type::new(Rc::new(Value::former(VecValue { elem, len })))
}

fn rc(term: impl Into<Checkable>) -> Rc<Checkable> {
    Rc::new(term.into())
}

#[derive(Debug, PartialEq)]
pub struct VecType {
    elem: Rc<Checkable>,
    len: Rc<Checkable>,
}

impl InferableFormer for VecType {
    fn name(&self) -> &'static str {
        "Vec"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![Arg::Checkable(&self.elem), Arg::Checkable(&self.len)]
    }

    fn infer(&self, context: &Context<'_>) -> Result<Type, TypeError> {
        context.check_type(&self.elem)?;
        context.check(&self.len, &nat_type())?;
        Ok(Type::star())
    }

    fn eval(&self, context: &mut EvalContext<'_>) -> RcValue {
        let elem = context.eval_checkable(&self.elem);
        let len = context.eval_checkable(&self.len);
        vec_type(elem, len).value().clone()
    }

    fn subst(&self, index: Index, replacement: &Inferable) -> Rc<dyn InferableFormer> {
        Rc::new(VecType {
            elem: rc(self.elem.subst(index, replacement)),
            len: rc(self.len.subst(index, replacement)),
        })
    }
}

#[derive(Debug)]
pub struct VecValue {
    elem: RcValue,
    len: RcValue,
}

impl FormerValue for VecValue {
    fn reify(&self, context: &mut QuoteContext) -> Checkable {
        Checkable::Inf(Inferable::former(VecType {
            elem: rc(context.quote(&self.elem)),
            len: rc(context.quote(&self.len)),
        }))
    }
}

#[derive(Debug, PartialEq)]
pub struct Nil {
    elem: Rc<Checkable>,
}

impl InferableFormer for Nil {
    fn name(&self) -> &'static str {
        "Nil"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![Arg::Checkable(&self.elem)]
    }

    fn infer(&self, context: &Context<'_>) -> Result<Type, TypeError> {
        let elem = context.check_type(&self.elem)?;
        Ok(vec_type(elem.value().clone(), nat::zero()))
    }

    fn eval(&self, context: &mut EvalContext<'_>) -> RcValue {
        let elem = context.eval_checkable(&self.elem);
        Rc::new(Value::former(NilValue { elem }))
    }

    fn subst(&self, index: Index, replacement: &Inferable) -> Rc<dyn InferableFormer> {
        Rc::new(Nil {
            elem: rc(self.elem.subst(index, replacement)),
        })
    }
}

#[derive(Debug)]
pub struct NilValue {
    elem: RcValue,
}

impl FormerValue for NilValue {
    fn reify(&self, context: &mut QuoteContext) -> Checkable {
        Checkable::Inf(Inferable::former(Nil {
            elem: rc(context.quote(&self.elem)),
        }))
    }
}

#[derive(Debug, PartialEq)]
pub struct Cons {
    elem: Rc<Checkable>,
    len: Rc<Checkable>,
    head: Rc<Checkable>,
    tail: Rc<Checkable>,
}

impl InferableFormer for Cons {
    fn name(&self) -> &'static str {
        "Cons"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![
            Arg::Checkable(&self.elem),
            Arg::Checkable(&self.len),
            Arg::Checkable(&self.head),
            Arg::Checkable(&self.tail),
        ]
    }

    fn infer(&self, context: &Context<'_>) -> Result<Type, TypeError> {
        let elem = context.check_type(&self.elem)?;
        context.check(&self.len, &nat_type())?;
        let len = context.eval(&self.len);
        context.check(&self.head, &elem)?;
        context.check(&self.tail, &vec_type(elem.value().clone(), len.clone()))?;

        Ok(vec_type(elem.value().clone(), nat::succ(len)))
    }

    fn eval(&self, context: &mut EvalContext<'_>) -> RcValue {
        Rc::new(Value::former(ConsValue {
            elem: context.eval_checkable(&self.elem),
            len: context.eval_checkable(&self.len),
            head: context.eval_checkable(&self.head),
            tail: context.eval_checkable(&self.tail),
        }))
    }

    fn subst(&self, index: Index, replacement: &Inferable) -> Rc<dyn InferableFormer> {
        Rc::new(Cons {
            elem: rc(self.elem.subst(index, replacement)),
            len: rc(self.len.subst(index, replacement)),
            head: rc(self.head.subst(index, replacement)),
            tail: rc(self.tail.subst(index, replacement)),
        })
    }
}

#[derive(Debug)]
pub struct ConsValue {
    elem: RcValue,
    len: RcValue,
    head: RcValue,
    tail: RcValue,
}

impl FormerValue for ConsValue {
    fn reify(&self, context: &mut QuoteContext) -> Checkable {
        Checkable::Inf(Inferable::former(Cons {
            elem: rc(context.quote(&self.elem)),
            len: rc(context.quote(&self.len)),
            head: rc(context.quote(&self.head)),
            tail: rc(context.quote(&self.tail)),
        }))
    }
}

#[derive(Debug, PartialEq)]
pub struct VecElim {
    elem: Rc<Checkable>,
    motive: Rc<Checkable>,
    base: Rc<Checkable>,
    step: Rc<Checkable>,
    len: Rc<Checkable>,
    scrut: Rc<Checkable>,
}

impl InferableFormer for VecElim {
    fn name(&self) -> &'static str {
        "vecElim"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![
            Arg::Checkable(&self.elem),
            Arg::Checkable(&self.motive),
            Arg::Checkable(&self.base),
            Arg::Checkable(&self.step),
            Arg::Checkable(&self.len),
            Arg::Checkable(&self.scrut),
        ]
    }

    fn infer(&self, context: &Context<'_>) -> Result<Type, TypeError> {
        let elem = context.check_type(&self.elem)?;
        let elem = elem.value().clone();
        let nat = || Inferable::former(Nat);
        let vec = |elem: Inferable, len: Inferable| {
            Inferable::former(VecType {
                elem: rc(elem),
                len: rc(len),
            })
        };

        // forall (n : Nat) -> Vec a n -> *
        let motive_type = pi("n", nat(), arrow(vec(bound(1), bound(0)), Inferable::Star(Span::Empty)));
        let motive_type = context.eval_in([elem.clone()], &motive_type.into());
        context.check(&self.motive, &Type::new(motive_type))?;
        let motive = context.eval(&self.motive);

        // m 0 (Nil a)
        let nil = Rc::new(Value::former(NilValue { elem: elem.clone() }));
        let base_type = apply_all(motive.clone(), [nat::zero(), nil]);
        context.check(&self.base, &Type::new(base_type))?;

        // forall (n : Nat) (x : a) (xs : Vec a n) -> m n xs -> m (Succ n) (Cons a n x xs)
        let cons = Inferable::former(Cons {
            elem: rc(bound(5)),
            len: rc(bound(3)),
            head: rc(bound(2)),
            tail: rc(bound(1)),
        });
        let step_type = pi(
            "n",
            nat(),
            pi(
                "x",
                bound(2),
                pi(
                    "xs",
                    vec(bound(3), bound(1)),
                    arrow(
                        apps(bound(3), [bound(2), bound(0)]),
                        apps(bound(4), [Inferable::former(Succ::new(bound(3))), cons]),
                    ),
                ),
            ),
        );
        let step_type = context.eval_in([elem.clone(), motive.clone()], &step_type.into());
        context.check(&self.step, &Type::new(step_type))?;

        context.check(&self.len, &nat_type())?;
        let len = context.eval(&self.len);
        context.check(&self.scrut, &vec_type(elem, len.clone()))?;
        let scrut = context.eval(&self.scrut);

        Ok(Type::new(apply_all(motive, [len, scrut])))
    }

    fn eval(&self, context: &mut EvalContext<'_>) -> RcValue {
        let frame = VecElimFrame {
            elem: context.eval_checkable(&self.elem),
            motive: context.eval_checkable(&self.motive),
            base: context.eval_checkable(&self.base),
            step: context.eval_checkable(&self.step),
            len: context.eval_checkable(&self.len),
        };
        let scrut = context.eval_checkable(&self.scrut);
        vec_elim(frame, scrut)
    }

    fn subst(&self, index: Index, replacement: &Inferable) -> Rc<dyn InferableFormer> {
        Rc::new(VecElim {
            elem: rc(self.elem.subst(index, replacement)),
            motive: rc(self.motive.subst(index, replacement)),
            base: rc(self.base.subst(index, replacement)),
            step: rc(self.step.subst(index, replacement)),
            len: rc(self.len.subst(index, replacement)),
            scrut: rc(self.scrut.subst(index, replacement)),
        })
    }
}

/// Eliminate `scrut`, recursing on the tail of each `Cons`.
fn vec_elim(frame: VecElimFrame, scrut: RcValue) -> RcValue {
    if scrut.as_former::<NilValue>().is_some() {
        return frame.base;
    }
    if let Some(cons) = scrut.as_former::<ConsValue>() {
        let step = frame.step.clone();
        let frame = VecElimFrame {
            len: cons.len.clone(),
            ..frame
        };
        let rec = vec_elim(frame, cons.tail.clone());
        return apply_all(step, [cons.len.clone(), cons.head.clone(), cons.tail.clone(), rec]);
    }

    match scrut.push_elim(Elim::Former(Rc::new(frame))) {
        Some(value) => value,
        None => panic_any(semantics::Error::InvalidFormerArgs),
    }
}

/// `vecElim a m b s n` waiting on a neutral scrutinee.
#[derive(Debug)]
struct VecElimFrame {
    elem: RcValue,
    motive: RcValue,
    base: RcValue,
    step: RcValue,
    len: RcValue,
}

impl NeutralFormer for VecElimFrame {
    fn neutral_reify(&self, context: &mut QuoteContext, scrut: Inferable) -> Inferable {
        Inferable::former(VecElim {
            elem: rc(context.quote(&self.elem)),
            motive: rc(context.quote(&self.motive)),
            base: rc(context.quote(&self.base)),
            step: rc(context.quote(&self.step)),
            len: rc(context.quote(&self.len)),
            scrut: rc(scrut),
        })
    }
}
