//! Surface language.

use crate::files::FileId;
use crate::source::ByteRange;
use crate::symbol::Symbol;

pub mod elaboration;
pub mod lexer;
pub mod parser;

pub use self::parser::ParseError;

/// Surface terms.
#[derive(Debug, Clone)]
pub enum Term {
    /// Annotated expressions.
    Ann(ByteRange, Box<Term>, Box<Term>),
    /// The type of types.
    Star(ByteRange),
    /// Function types. Arrow types have no parameter name.
    Pi(ByteRange, Option<(ByteRange, Symbol)>, Box<Term>, Box<Term>),
    /// Variable occurrences.
    Var(ByteRange, Symbol),
    /// Function applications.
    App(ByteRange, Box<Term>, Box<Term>),
    /// Function literals.
    Lam(ByteRange, (ByteRange, Symbol), Box<Term>),
    /// Natural number literals.
    Number(ByteRange, u64),
}

impl Term {
    pub fn range(&self) -> ByteRange {
        match self {
            Term::Ann(range, ..)
            | Term::Star(range)
            | Term::Pi(range, ..)
            | Term::Var(range, _)
            | Term::App(range, ..)
            | Term::Lam(range, ..)
            | Term::Number(range, _) => *range,
        }
    }
}

/// Top-level declarations.
#[derive(Debug, Clone)]
pub enum Decl {
    /// Postulate one or more names of the same type.
    Axiom(ByteRange, Vec<(ByteRange, Symbol)>, Term),
    /// Define a name.
    Defun(ByteRange, (ByteRange, Symbol), Term),
    /// Normalise an expression and show its type.
    Check(ByteRange, Term),
    /// A bare expression, treated like [`Decl::Check`].
    Expr(Term),
}

impl Decl {
    pub fn range(&self) -> ByteRange {
        match self {
            Decl::Axiom(range, ..) | Decl::Defun(range, ..) | Decl::Check(range, _) => *range,
            Decl::Expr(term) => term.range(),
        }
    }
}

/// Parse a single expression.
pub fn parse_term(file_id: FileId, source: &str) -> Result<Term, ParseError> {
    parser::Parser::new(file_id, source)?.term()
}

/// Parse a sequence of declarations.
pub fn parse_program(file_id: FileId, source: &str) -> Result<Vec<Decl>, ParseError> {
    parser::Parser::new(file_id, source)?.program()
}

/// Parse a line of interactive input: either a sequence of declarations, or
/// a single bare expression.
pub fn parse_input(file_id: FileId, source: &str) -> Result<Vec<Decl>, ParseError> {
    let mut parser = parser::Parser::new(file_id, source)?;
    match parser.at_decl() {
        true => parser.program(),
        false => Ok(vec![Decl::Expr(parser.term()?)]),
    }
}
