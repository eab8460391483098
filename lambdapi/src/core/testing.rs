//! Helpers for building signatures and terms from source text in tests.

use crate::core::formers::Registry;
use crate::core::globals::Globals;
use crate::core::typing::Context;
use crate::core::{Checkable, Inferable};
use crate::files::{FileId, Files};
use crate::surface::{self, elaboration, Decl};

fn add_file(source: &str) -> FileId {
    Files::new().add("<test>".to_owned(), source.to_owned())
}

/// Parse and elaborate a single expression.
pub fn elaborate(source: &str) -> Inferable {
    let file_id = add_file(source);
    let term = surface::parse_term(file_id, source).unwrap();
    let registry = Registry::builtin();
    elaboration::Context::new(file_id, &registry)
        .elaborate(&term)
        .unwrap()
}

/// Build a signature from the `axiom` and `defun` declarations in `source`,
/// ignoring any other declarations.
pub fn globals(source: &str) -> Globals {
    let file_id = add_file(source);
    let registry = Registry::builtin();
    let mut globals = Globals::new();

    for decl in surface::parse_program(file_id, source).unwrap() {
        match decl {
            Decl::Axiom(_, names, r#type) => {
                let r#type = elaboration::Context::new(file_id, &registry)
                    .elaborate(&r#type)
                    .unwrap();
                let r#type = Context::new(&globals)
                    .check_type(&Checkable::Inf(r#type))
                    .unwrap();
                for (_, name) in names {
                    globals.postulate(name, r#type.clone());
                }
            }
            Decl::Defun(_, (_, name), expr) => {
                let expr = elaboration::Context::new(file_id, &registry)
                    .elaborate(&expr)
                    .unwrap();
                let context = Context::new(&globals);
                let r#type = context.infer(&expr).unwrap();
                let value = context.eval_inferable(&expr);
                globals.define(name, value, r#type);
            }
            Decl::Check(..) | Decl::Expr(..) => {}
        }
    }

    globals
}
