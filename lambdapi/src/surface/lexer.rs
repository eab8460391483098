use codespan_reporting::diagnostic::{Diagnostic, Label};
use logos::Logos;

use crate::files::FileId;
use crate::source::{BytePos, ByteRange, FileRange};

#[derive(Clone, Debug, PartialEq, Eq, Logos)]
pub enum Token<'source> {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_']*")]
    Name(&'source str),
    #[regex(r"[0-9]+")]
    NumberLiteral(&'source str),

    #[token("axiom")]
    KeywordAxiom,
    #[token("check")]
    KeywordCheck,
    #[token("defun")]
    KeywordDefun,
    #[token("forall")]
    #[token("Π")]
    #[token("∀")]
    KeywordForall,
    #[token("lambda")]
    #[token("λ")]
    #[token("\\")]
    KeywordLambda,

    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token(".")]
    FullStop,
    #[token("->")]
    #[token("→")]
    HyphenGreater,
    #[token("*")]
    Star,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,

    #[error]
    #[regex(r"\p{Whitespace}", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    Error,
}

pub type Spanned<Tok, Loc> = (Loc, Tok, Loc);

#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected character")]
    UnexpectedCharacter { range: FileRange },
}

impl Error {
    pub fn range(&self) -> FileRange {
        match self {
            Error::UnexpectedCharacter { range } => *range,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        match self {
            Error::UnexpectedCharacter { range } => Diagnostic::error()
                .with_message(self.to_string())
                .with_labels(vec![Label::primary(range.file_id(), *range)]),
        }
    }
}

pub fn tokens(
    file_id: FileId,
    source: &str,
) -> impl Iterator<Item = Result<Spanned<Token<'_>, BytePos>, Error>> {
    assert!(
        source.len() <= u32::MAX as usize,
        "`source` must be less than 4GiB in length"
    );

    Token::lexer(source)
        .spanned()
        .map(move |(token, range)| {
            let start = range.start as BytePos;
            let end = range.end as BytePos;
            match token {
                Token::Error => Err(Error::UnexpectedCharacter {
                    range: FileRange::new(file_id, ByteRange::new(start, end)),
                }),
                token => Ok((start, token, end)),
            }
        })
}

impl<'source> Token<'source> {
    pub fn description(&self) -> &'static str {
        match self {
            Token::Name(_) => "name",
            Token::NumberLiteral(_) => "number literal",
            Token::KeywordAxiom => "axiom",
            Token::KeywordCheck => "check",
            Token::KeywordDefun => "defun",
            Token::KeywordForall => "forall",
            Token::KeywordLambda => "lambda",
            Token::Colon => ":",
            Token::Comma => ",",
            Token::Equals => "=",
            Token::FullStop => ".",
            Token::HyphenGreater => "->",
            Token::Star => "*",
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::Error => "error",
        }
    }

    pub fn is_decl_keyword(&self) -> bool {
        matches!(
            self,
            Token::KeywordAxiom | Token::KeywordCheck | Token::KeywordDefun
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token<'_>> {
        let file_id = FileId::try_from(1u32).unwrap();
        tokens(file_id, source)
            .map(|token| token.map(|(_, token, _)| token))
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn keywords_and_names() {
        assert_eq!(
            lex("axiom axioms x' _ lambda"),
            [
                Token::KeywordAxiom,
                Token::Name("axioms"),
                Token::Name("x'"),
                Token::Name("_"),
                Token::KeywordLambda,
            ],
        );
    }

    #[test]
    fn unicode_alternatives() {
        use Token::{HyphenGreater, KeywordForall, KeywordLambda};

        assert_eq!(lex(r"λ \ lambda"), [KeywordLambda, KeywordLambda, KeywordLambda]);
        assert_eq!(lex("Π ∀ forall"), [KeywordForall, KeywordForall, KeywordForall]);
        assert_eq!(lex("-> →"), [HyphenGreater, HyphenGreater]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("* // a comment\n 42 // at the end"),
            [Token::Star, Token::NumberLiteral("42")],
        );
    }

    #[test]
    fn unexpected_character() {
        let file_id = FileId::try_from(1u32).unwrap();
        let error = tokens(file_id, "x # y")
            .find_map(Result::err)
            .unwrap();
        assert_eq!(error.range().start(), 2);
        assert_eq!(error.range().end(), 3);
    }
}
