//! A recursive descent parser for the surface language.

use codespan_reporting::diagnostic::{Diagnostic, Label};
use itertools::Itertools;

use crate::files::FileId;
use crate::source::{BytePos, ByteRange, FileRange};
use crate::surface::lexer::{self, Spanned, Token};
use crate::surface::{Decl, Term};
use crate::symbol::Symbol;

#[derive(Clone, Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lexer(#[from] lexer::Error),
    #[error("unexpected token `{found}`")]
    UnexpectedToken {
        range: FileRange,
        found: String,
        expected: Vec<&'static str>,
    },
    #[error("unexpected end of file")]
    UnexpectedEof {
        range: FileRange,
        expected: Vec<&'static str>,
    },
    #[error("number literal is too large")]
    NumberTooLarge { range: FileRange },
}

impl ParseError {
    pub fn range(&self) -> FileRange {
        match self {
            ParseError::Lexer(error) => error.range(),
            ParseError::UnexpectedToken { range, .. }
            | ParseError::UnexpectedEof { range, .. }
            | ParseError::NumberTooLarge { range } => *range,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        let range = self.range();
        match self {
            ParseError::Lexer(error) => error.to_diagnostic(),
            ParseError::UnexpectedToken { expected, .. } => Diagnostic::error()
                .with_message(self.to_string())
                .with_labels(vec![
                    Label::primary(range.file_id(), range).with_message("unexpected token")
                ])
                .with_notes(vec![format_expected(expected)]),
            ParseError::UnexpectedEof { expected, .. } => Diagnostic::error()
                .with_message(self.to_string())
                .with_labels(vec![
                    Label::primary(range.file_id(), range).with_message("unexpected end of file")
                ])
                .with_notes(vec![format_expected(expected)]),
            ParseError::NumberTooLarge { .. } => Diagnostic::error()
                .with_message(self.to_string())
                .with_labels(vec![Label::primary(range.file_id(), range)])
                .with_notes(vec![format!("the largest number literal is {MAX_NUMBER_LITERAL}")]),
        }
    }
}

/// Number literals elaborate to `Succ` chains, which are checked and
/// evaluated recursively.
pub const MAX_NUMBER_LITERAL: u64 = 1000;

fn format_expected(expected: &[&str]) -> String {
    match expected {
        [] => "expected nothing".to_owned(),
        [item] => format!("expected `{item}`"),
        [items @ .., last] => format!(
            "expected one of {}, or `{last}`",
            items.iter().map(|item| format!("`{item}`")).format(", "),
        ),
    }
}

const ATOMIC_EXPR: &[&str] = &["(", "*", "name", "number literal"];
const DECL: &[&str] = &["axiom", "check", "defun"];

pub struct Parser<'source> {
    file_id: FileId,
    source: &'source str,
    tokens: Vec<Spanned<Token<'source>, BytePos>>,
    position: usize,
}

impl<'source> Parser<'source> {
    /// Lex the whole source up front, failing on the first unexpected
    /// character.
    pub fn new(file_id: FileId, source: &'source str) -> Result<Parser<'source>, ParseError> {
        let tokens = lexer::tokens(file_id, source).collect::<Result<Vec<_>, _>>()?;

        Ok(Parser {
            file_id,
            source,
            tokens,
            position: 0,
        })
    }

    /// Returns true if the next token starts a declaration.
    pub fn at_decl(&self) -> bool {
        self.peek().map_or(false, Token::is_decl_keyword)
    }

    /// Parse declarations until the end of the source.
    pub fn program(&mut self) -> Result<Vec<Decl>, ParseError> {
        let mut decls = Vec::new();
        while self.peek().is_some() {
            decls.push(self.decl()?);
        }
        Ok(decls)
    }

    /// Parse a single expression spanning the rest of the source.
    pub fn term(&mut self) -> Result<Term, ParseError> {
        let term = self.expr()?;
        match self.peek() {
            None => Ok(term),
            Some(_) => Err(self.unexpected(&[":", "->"])),
        }
    }

    fn decl(&mut self) -> Result<Decl, ParseError> {
        match self.peek() {
            Some(Token::KeywordAxiom) => {
                let start = self.advance_range();
                let mut names = vec![self.name()?];
                while self.eat(&Token::Comma).is_some() {
                    names.push(self.name()?);
                }
                self.expect(&Token::Colon)?;
                let r#type = self.expr()?;
                Ok(Decl::Axiom(start.merge(r#type.range()), names, r#type))
            }
            Some(Token::KeywordDefun) => {
                let start = self.advance_range();
                let name = self.name()?;
                self.expect(&Token::Equals)?;
                let expr = self.expr()?;
                Ok(Decl::Defun(start.merge(expr.range()), name, expr))
            }
            Some(Token::KeywordCheck) => {
                let start = self.advance_range();
                let expr = self.expr()?;
                Ok(Decl::Check(start.merge(expr.range()), expr))
            }
            _ => Err(self.unexpected(DECL)),
        }
    }

    fn expr(&mut self) -> Result<Term, ParseError> {
        let mut term = self.arrow_expr()?;
        while self.eat(&Token::Colon).is_some() {
            let r#type = self.arrow_expr()?;
            let range = term.range().merge(r#type.range());
            term = Term::Ann(range, Box::new(term), Box::new(r#type));
        }
        Ok(term)
    }

    fn arrow_expr(&mut self) -> Result<Term, ParseError> {
        match self.peek() {
            Some(Token::KeywordForall) => {
                let start = self.advance_range();
                let groups = match self.peek() {
                    Some(Token::OpenParen) => {
                        let mut groups = Vec::new();
                        while self.eat(&Token::OpenParen).is_some() {
                            let mut names = vec![self.name()?];
                            while self.eat(&Token::Comma).is_some() {
                                names.push(self.name()?);
                            }
                            self.expect(&Token::Colon)?;
                            let domain = self.expr()?;
                            self.expect(&Token::CloseParen)?;
                            groups.push((names, domain));
                        }
                        groups
                    }
                    _ => {
                        let name = self.name()?;
                        self.expect(&Token::Colon)?;
                        vec![(vec![name], self.app_expr()?)]
                    }
                };
                self.forall_arrow()?;
                let body = self.arrow_expr()?;

                let range = start.merge(body.range());
                let params = groups.into_iter().flat_map(|(names, domain)| {
                    names.into_iter().map(move |name| (name, domain.clone()))
                });
                Ok(params.rev().fold(body, |body, (name, domain)| {
                    Term::Pi(range, Some(name), Box::new(domain), Box::new(body))
                }))
            }
            Some(Token::KeywordLambda) => {
                let start = self.advance_range();
                let mut names = vec![self.name()?];
                while let Some(Token::Name(_)) = self.peek() {
                    names.push(self.name()?);
                }
                self.lambda_arrow()?;
                let body = self.arrow_expr()?;

                let range = start.merge(body.range());
                Ok(names.into_iter().rev().fold(body, |body, name| {
                    Term::Lam(range, name, Box::new(body))
                }))
            }
            _ => {
                let domain = self.app_expr()?;
                match self.eat(&Token::HyphenGreater) {
                    Some(_) => {
                        let codomain = self.arrow_expr()?;
                        let range = domain.range().merge(codomain.range());
                        Ok(Term::Pi(range, None, Box::new(domain), Box::new(codomain)))
                    }
                    None => Ok(domain),
                }
            }
        }
    }

    fn forall_arrow(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Some(Token::HyphenGreater | Token::FullStop | Token::Comma) => {
                self.advance_range();
                Ok(())
            }
            _ => Err(self.unexpected(&["->", ".", ","])),
        }
    }

    fn lambda_arrow(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Some(Token::HyphenGreater | Token::FullStop) => {
                self.advance_range();
                Ok(())
            }
            _ => Err(self.unexpected(&["->", ".", "name"])),
        }
    }

    fn app_expr(&mut self) -> Result<Term, ParseError> {
        let mut head = self.atomic_expr()?;
        while let Some(Token::OpenParen | Token::Name(_) | Token::Star | Token::NumberLiteral(_)) =
            self.peek()
        {
            let arg = self.atomic_expr()?;
            let range = head.range().merge(arg.range());
            head = Term::App(range, Box::new(head), Box::new(arg));
        }
        Ok(head)
    }

    fn atomic_expr(&mut self) -> Result<Term, ParseError> {
        match self.peek().cloned() {
            Some(Token::OpenParen) => {
                self.advance_range();
                let term = self.expr()?;
                self.expect(&Token::CloseParen)?;
                Ok(term)
            }
            Some(Token::Name(name)) => {
                let range = self.advance_range();
                Ok(Term::Var(range, Symbol::intern(name)))
            }
            Some(Token::Star) => Ok(Term::Star(self.advance_range())),
            Some(Token::NumberLiteral(number)) => {
                let range = self.advance_range();
                match number.parse() {
                    Ok(number) if number <= MAX_NUMBER_LITERAL => Ok(Term::Number(range, number)),
                    _ => Err(ParseError::NumberTooLarge {
                        range: self.file_range(range),
                    }),
                }
            }
            _ => Err(self.unexpected(ATOMIC_EXPR)),
        }
    }

    fn name(&mut self) -> Result<(ByteRange, Symbol), ParseError> {
        match self.peek() {
            Some(Token::Name(name)) => {
                let name = Symbol::intern(name);
                Ok((self.advance_range(), name))
            }
            _ => Err(self.unexpected(&["name"])),
        }
    }

    fn peek(&self) -> Option<&Token<'source>> {
        self.tokens.get(self.position).map(|(_, token, _)| token)
    }

    /// Move past the next token, returning its range.
    fn advance_range(&mut self) -> ByteRange {
        let range = self.peek_range();
        self.position = usize::min(self.position + 1, self.tokens.len());
        range
    }

    /// The range of the next token, or an empty range at the end of the
    /// source.
    fn peek_range(&self) -> ByteRange {
        match self.tokens.get(self.position) {
            Some((start, _, end)) => ByteRange::new(*start, *end),
            None => {
                let end = self.source.len() as BytePos;
                ByteRange::new(end, end)
            }
        }
    }

    fn eat(&mut self, token: &Token<'_>) -> Option<ByteRange> {
        match self.peek() {
            Some(next) if next == token => Some(self.advance_range()),
            _ => None,
        }
    }

    fn expect(&mut self, token: &Token<'_>) -> Result<ByteRange, ParseError> {
        match self.eat(token) {
            Some(range) => Ok(range),
            None => Err(self.unexpected(&[token.description()])),
        }
    }

    fn file_range(&self, range: ByteRange) -> FileRange {
        FileRange::new(self.file_id, range)
    }

    fn unexpected(&self, expected: &[&'static str]) -> ParseError {
        let range = self.peek_range();
        let expected = expected.to_vec();
        match self.peek() {
            Some(_) => ParseError::UnexpectedToken {
                range: self.file_range(range),
                found: self.source[std::ops::Range::<usize>::from(range)].to_owned(),
                expected,
            },
            None => ParseError::UnexpectedEof {
                range: self.file_range(range),
                expected,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{parse_input, parse_program, parse_term};

    fn file_id() -> FileId {
        FileId::try_from(1u32).unwrap()
    }

    /// Render a term with explicit structure.
    fn sexpr(term: &Term) -> String {
        match term {
            Term::Ann(_, expr, r#type) => format!("(ann {} {})", sexpr(expr), sexpr(r#type)),
            Term::Star(_) => "*".to_owned(),
            Term::Pi(_, Some((_, name)), domain, codomain) => {
                format!("(pi {name} {} {})", sexpr(domain), sexpr(codomain))
            }
            Term::Pi(_, None, domain, codomain) => {
                format!("(-> {} {})", sexpr(domain), sexpr(codomain))
            }
            Term::Var(_, name) => name.to_string(),
            Term::App(_, head, arg) => format!("({} {})", sexpr(head), sexpr(arg)),
            Term::Lam(_, (_, name), body) => format!("(lam {name} {})", sexpr(body)),
            Term::Number(_, number) => number.to_string(),
        }
    }

    fn parse(source: &str) -> String {
        sexpr(&parse_term(file_id(), source).unwrap())
    }

    #[test]
    fn applications_associate_left() {
        assert_eq!(parse("f x y"), "((f x) y)");
        assert_eq!(parse("f (g x)"), "(f (g x))");
    }

    #[test]
    fn arrows_associate_right() {
        assert_eq!(parse("A -> B -> C"), "(-> A (-> B C))");
        assert_eq!(parse("(A -> B) → C"), "(-> (-> A B) C)");
    }

    #[test]
    fn foralls() {
        assert_eq!(parse("forall x : A -> B"), "(pi x A B)");
        assert_eq!(parse("Π x : A . B"), "(pi x A B)");
        assert_eq!(parse("∀ x : A, B"), "(pi x A B)");
        assert_eq!(parse("forall (x, y : *) -> x"), "(pi x * (pi y * x))");
        assert_eq!(parse("forall (x : *) (y : x) -> y"), "(pi x * (pi y x y))");
    }

    #[test]
    fn lambdas() {
        assert_eq!(parse(r"\x. x"), "(lam x x)");
        assert_eq!(parse("λx y -> x y"), "(lam x (lam y (x y)))");
        assert_eq!(parse("lambda x. x : A -> A"), "(ann (lam x x) (-> A A))");
    }

    #[test]
    fn annotations_associate_left() {
        assert_eq!(parse("x : A : *"), "(ann (ann x A) *)");
    }

    #[test]
    fn numbers() {
        assert_eq!(parse("Succ 42"), "(Succ 42)");
        assert!(matches!(
            parse_term(file_id(), "99999999999999999999999"),
            Err(ParseError::NumberTooLarge { .. }),
        ));
        assert_eq!(parse("1000"), "1000");
        assert!(matches!(
            parse_term(file_id(), "1001"),
            Err(ParseError::NumberTooLarge { .. }),
        ));
    }

    #[test]
    fn declarations_are_self_delimiting() {
        let decls = parse_program(
            file_id(),
            "axiom A, B : * defun f = (\\x. x) : A -> A check f",
        )
        .unwrap();

        assert_eq!(decls.len(), 3);
        assert!(matches!(&decls[0], Decl::Axiom(_, names, Term::Star(_)) if names.len() == 2));
        assert!(matches!(&decls[1], Decl::Defun(_, _, Term::Ann(..))));
        assert!(matches!(&decls[2], Decl::Check(_, Term::Var(..))));
    }

    #[test]
    fn bare_expressions_are_whole_inputs() {
        let decls = parse_input(file_id(), "f x").unwrap();
        assert!(matches!(&decls[..], [Decl::Expr(Term::App(..))]));

        let decls = parse_input(file_id(), "check f x").unwrap();
        assert!(matches!(&decls[..], [Decl::Check(..)]));

        assert!(parse_program(file_id(), "f x").is_err());
    }

    #[test]
    fn unexpected_tokens() {
        match parse_term(file_id(), "f )") {
            Err(error @ ParseError::UnexpectedToken { .. }) => {
                assert_eq!(error.to_string(), "unexpected token `)`");
                assert_eq!(error.range().start(), 2);
            }
            result => panic!("unexpected result: {result:?}"),
        }

        match parse_term(file_id(), "(f x") {
            Err(ParseError::UnexpectedEof { range, expected }) => {
                assert_eq!(range.start(), 4);
                assert_eq!(expected, [")"]);
            }
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[test]
    fn expected_tokens_are_listed() {
        assert_eq!(format_expected(&[")"]), "expected `)`");
        assert_eq!(
            format_expected(ATOMIC_EXPR),
            "expected one of `(`, `*`, `name`, or `number literal`",
        );
    }
}
