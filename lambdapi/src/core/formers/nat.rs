//! Natural numbers.
//!
//! ```text
//! Nat : *
//! Zero : Nat
//! Succ : Nat -> Nat
//! natElim : (m : Nat -> *) -> m 0 -> (forall (n : Nat) -> m n -> m (Succ n)) ->
//!           (n : Nat) -> m n
//! ```

use std::panic::panic_any;
use std::rc::Rc;

use crate::core::formers::{
    arrow, bound, checkable_operands, pi, Arg, ArgKind, Former, FormerSpec, FormerValue,
    InferableFormer, NeutralFormer, Registry,
};
use crate::core::semantics::{self, apply, apply_all, Elim, EvalContext, QuoteContext, RcValue};
use crate::core::semantics::{Type, Value};
use crate::core::typing::{Context, TypeError};
use crate::core::{Checkable, Inferable};
use crate::env::Index;
use crate::source::Span;

pub fn register(registry: &mut Registry) {
    registry.register(FormerSpec {
        name: "Nat",
        args: &[],
        build: |_| Former::inferable(Nat),
    });
    registry.register(FormerSpec {
        name: "Zero",
        args: &[],
        build: |_| Former::inferable(Zero),
    });
    registry.register(FormerSpec {
        name: "Succ",
        args: &[ArgKind::Checkable],
        build: |operands| {
            let [pred] = checkable_operands(operands);
            Former::inferable(Succ { pred })
        },
    });
    registry.register(FormerSpec {
        name: "natElim",
        args: &[ArgKind::Checkable; 4],
        build: |operands| {
            let [motive, base, step, scrut] = checkable_operands(operands);
            Former::inferable(NatElim {
                motive,
                base,
                step,
                scrut,
            })
        },
    });
}

/// The type of natural numbers.
pub fn nat_type() -> Type {
    Type::new(Rc::new(Value::former(NatValue)))
}

pub fn zero() -> RcValue {
    Rc::new(Value::former(ZeroValue))
}

pub fn succ(pred: RcValue) -> RcValue {
    Rc::new(Value::former(SuccValue(pred)))
}

/// `Succ` applied `n` times to `Zero`.
pub fn numeral(n: u64) -> Inferable {
    (0..n).fold(Inferable::former(Zero), |pred, _| Inferable::former(Succ::new(pred)))
}

fn nat() -> Inferable {
    Inferable::former(Nat)
}

fn star() -> Inferable {
    Inferable::Star(Span::Empty)
}

#[derive(Debug, PartialEq)]
pub struct Nat;

impl InferableFormer for Nat {
    fn name(&self) -> &'static str {
        "Nat"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        Vec::new()
    }

    fn infer(&self, _: &Context<'_>) -> Result<Type, TypeError> {
        Ok(Type::star())
    }

    fn eval(&self, _: &mut EvalContext<'_>) -> RcValue {
        nat_type().value().clone()
    }

    fn subst(&self, _: Index, _: &Inferable) -> Rc<dyn InferableFormer> {
        Rc::new(Nat)
    }
}

#[derive(Debug)]
pub struct NatValue;

impl FormerValue for NatValue {
    fn reify(&self, _: &mut QuoteContext) -> Checkable {
        Checkable::Inf(nat())
    }
}

#[derive(Debug, PartialEq)]
pub struct Zero;

impl InferableFormer for Zero {
    fn name(&self) -> &'static str {
        "Zero"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        Vec::new()
    }

    fn infer(&self, _: &Context<'_>) -> Result<Type, TypeError> {
        Ok(nat_type())
    }

    fn eval(&self, _: &mut EvalContext<'_>) -> RcValue {
        zero()
    }

    fn subst(&self, _: Index, _: &Inferable) -> Rc<dyn InferableFormer> {
        Rc::new(Zero)
    }

    fn to_numeral(&self) -> Option<u64> {
        Some(0)
    }
}

#[derive(Debug)]
pub struct ZeroValue;

impl FormerValue for ZeroValue {
    fn reify(&self, _: &mut QuoteContext) -> Checkable {
        Checkable::Inf(Inferable::former(Zero))
    }
}

#[derive(Debug, PartialEq)]
pub struct Succ {
    pred: Rc<Checkable>,
}

impl Succ {
    pub fn new(pred: impl Into<Checkable>) -> Succ {
        Succ {
            pred: Rc::new(pred.into()),
        }
    }
}

impl InferableFormer for Succ {
    fn name(&self) -> &'static str {
        "Succ"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![Arg::Checkable(&self.pred)]
    }

    fn infer(&self, context: &Context<'_>) -> Result<Type, TypeError> {
        context.check(&self.pred, &nat_type())?;
        Ok(nat_type())
    }

    fn eval(&self, context: &mut EvalContext<'_>) -> RcValue {
        succ(context.eval_checkable(&self.pred))
    }

    fn subst(&self, index: Index, replacement: &Inferable) -> Rc<dyn InferableFormer> {
        Rc::new(Succ::new(self.pred.subst(index, replacement)))
    }

    fn to_numeral(&self) -> Option<u64> {
        match self.pred.as_ref() {
            Checkable::Inf(Inferable::Former(_, pred)) => Some(pred.to_numeral()? + 1),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct SuccValue(RcValue);

impl FormerValue for SuccValue {
    fn reify(&self, context: &mut QuoteContext) -> Checkable {
        Checkable::Inf(Inferable::former(Succ::new(context.quote(&self.0))))
    }
}

#[derive(Debug, PartialEq)]
pub struct NatElim {
    motive: Rc<Checkable>,
    base: Rc<Checkable>,
    step: Rc<Checkable>,
    scrut: Rc<Checkable>,
}

impl InferableFormer for NatElim {
    fn name(&self) -> &'static str {
        "natElim"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![
            Arg::Checkable(&self.motive),
            Arg::Checkable(&self.base),
            Arg::Checkable(&self.step),
            Arg::Checkable(&self.scrut),
        ]
    }

    fn infer(&self, context: &Context<'_>) -> Result<Type, TypeError> {
        // Nat -> *
        let motive_type = context.eval_in([], &arrow(nat(), star()).into());
        context.check(&self.motive, &Type::new(motive_type))?;
        let motive = context.eval(&self.motive);

        // m 0
        context.check(&self.base, &Type::new(apply(motive.clone(), zero())))?;

        // forall (n : Nat) -> m n -> m (Succ n)
        let step_type = pi(
            "n",
            nat(),
            arrow(
                Inferable::app(bound(1), bound(0)),
                Inferable::app(bound(2), Inferable::former(Succ::new(bound(1)))),
            ),
        );
        let step_type = context.eval_in([motive.clone()], &step_type.into());
        context.check(&self.step, &Type::new(step_type))?;

        context.check(&self.scrut, &nat_type())?;
        Ok(Type::new(apply(motive, context.eval(&self.scrut))))
    }

    fn eval(&self, context: &mut EvalContext<'_>) -> RcValue {
        let motive = context.eval_checkable(&self.motive);
        let base = context.eval_checkable(&self.base);
        let step = context.eval_checkable(&self.step);
        let scrut = context.eval_checkable(&self.scrut);
        nat_elim(motive, base, step, scrut)
    }

    fn subst(&self, index: Index, replacement: &Inferable) -> Rc<dyn InferableFormer> {
        Rc::new(NatElim {
            motive: Rc::new(self.motive.subst(index, replacement)),
            base: Rc::new(self.base.subst(index, replacement)),
            step: Rc::new(self.step.subst(index, replacement)),
            scrut: Rc::new(self.scrut.subst(index, replacement)),
        })
    }
}

fn nat_elim(motive: RcValue, base: RcValue, step: RcValue, scrut: RcValue) -> RcValue {
    if scrut.as_former::<ZeroValue>().is_some() {
        return base;
    }
    if let Some(SuccValue(pred)) = scrut.as_former::<SuccValue>() {
        let rec = nat_elim(motive, base, step.clone(), pred.clone());
        return apply_all(step, [pred.clone(), rec]);
    }

    let frame = NatElimFrame { motive, base, step };
    match scrut.push_elim(Elim::Former(Rc::new(frame))) {
        Some(value) => value,
        None => panic_any(semantics::Error::InvalidFormerArgs),
    }
}

/// `natElim m b s` waiting on a neutral scrutinee.
#[derive(Debug)]
struct NatElimFrame {
    motive: RcValue,
    base: RcValue,
    step: RcValue,
}

impl NeutralFormer for NatElimFrame {
    fn neutral_reify(&self, context: &mut QuoteContext, scrut: Inferable) -> Inferable {
        Inferable::former(NatElim {
            motive: Rc::new(context.quote(&self.motive)),
            base: Rc::new(context.quote(&self.base)),
            step: Rc::new(context.quote(&self.step)),
            scrut: Rc::new(Checkable::Inf(scrut)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::globals::Globals;
    use crate::core::testing::{elaborate, globals};
    use crate::symbol::Symbol;

    const ELIM_AXIOMS: &str = r"
        axiom m : Nat -> *
        axiom b : m 0
        axiom s : forall (n : Nat) -> m n -> m (Succ n)
    ";

    fn normalise(globals: &Globals, source: &str) -> Checkable {
        let context = Context::new(globals);
        context.quote(&context.eval_inferable(&elaborate(source)))
    }

    #[test]
    fn numerals_build_succ_chains() {
        assert_eq!(
            numeral(2),
            Inferable::former(Succ::new(Inferable::former(Succ::new(Inferable::former(Zero))))),
        );
        assert_eq!(Inferable::former(Succ::new(numeral(2))), numeral(3));

        let term = numeral(3);
        match &term {
            Inferable::Former(_, former) => assert_eq!(former.to_numeral(), Some(3)),
            _ => panic!("expected a former"),
        }
    }

    #[test]
    fn elim_on_zero_is_base() {
        let globals = globals(ELIM_AXIOMS);
        assert_eq!(normalise(&globals, "natElim m b s Zero"), normalise(&globals, "b"));
    }

    #[test]
    fn elim_on_succ_applies_step() {
        let globals = globals(ELIM_AXIOMS);
        assert_eq!(
            normalise(&globals, "natElim m b s (Succ (Succ Zero))"),
            normalise(&globals, "s (Succ Zero) (s Zero b)"),
        );
    }

    #[test]
    fn elim_on_neutral_is_stuck() {
        let globals = globals(&format!("{ELIM_AXIOMS} axiom n : Nat"));
        let normal = normalise(&globals, "natElim m b s n");

        assert_eq!(normal, Checkable::Inf(elaborate("natElim m b s n")));

        // Only the outer `Succ` can be eliminated
        assert_eq!(
            normalise(&globals, "natElim m b s (Succ n)"),
            Checkable::Inf(elaborate("s n (natElim m b s n)")),
        );
    }

    #[test]
    fn elim_result_type_follows_scrutinee() {
        let globals = globals(ELIM_AXIOMS);
        let context = Context::new(&globals);

        let r#type = context.infer(&elaborate("natElim m b s 2")).unwrap();
        assert_eq!(context.quote(r#type.value()), Checkable::Inf(elaborate("m 2")));
    }

    #[test]
    fn addition() {
        let globals = globals(
            r"
            defun plus = (\x y. natElim (\_. Nat) y (\p r. Succ r) x) : Nat -> Nat -> Nat
            ",
        );
        let context = Context::new(&globals);
        let term = elaborate("plus 2 3");

        let r#type = context.infer(&term).unwrap();
        assert_eq!(context.quote(r#type.value()), Checkable::Inf(nat()));
        assert_eq!(normalise(&globals, "plus 2 3"), Checkable::Inf(numeral(5)));
        assert!(globals.value(Symbol::intern("plus")).is_some());
    }

    #[test]
    fn ill_typed_step_is_rejected() {
        let globals = globals("axiom m : Nat -> * axiom b : m 0");
        let context = Context::new(&globals);

        // The step must produce a `m (Succ n)`, not another `m n`
        let term = elaborate(r"natElim m b (\n r. r) 2");
        assert!(matches!(context.infer(&term), Err(TypeError::Mismatch { .. })));
    }

    #[test]
    fn succ_of_non_nat_is_rejected() {
        let globals = Globals::new();
        let context = Context::new(&globals);

        assert!(matches!(
            context.infer(&elaborate("Succ *")),
            Err(TypeError::Mismatch { .. }),
        ));
    }
}
