use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::token::{Span, TokenKind};

/// Everything that went wrong in one run, with the source attached so
/// the report can point at the offending spots.
#[derive(Clone, Debug, Error, Diagnostic)]
#[error("Errors while running conch code")]
#[diagnostic()]
pub struct ConchErrors {
    #[source_code]
    pub src: String,
    #[related]
    pub nested: Vec<ConchError>,
}

#[derive(Clone, Debug, Error, Diagnostic)]
pub enum ConchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    SyntaxError(#[from] SyntaxError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    RuntimeError(#[from] RuntimeError),
}

#[derive(Clone, Debug, Error, Diagnostic)]
pub enum SyntaxError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    IllegalToken(IllegalToken),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnexpectedToken(UnexpectedToken),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NoPrefixParseFn(NoPrefixParseFn),

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidNumber(InvalidNumber),

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidProperty(InvalidProperty),
}

#[derive(Clone, Debug, Error, Diagnostic)]
#[error("Illegal token '{}'", found)]
#[diagnostic()]
pub struct IllegalToken {
    found: String,
    #[label("{}", self)]
    span: SourceSpan,
}

#[derive(Clone, Debug, Error, Diagnostic)]
#[error("expected next token to be {}, got {} instead", want, got)]
#[diagnostic()]
pub struct UnexpectedToken {
    want: TokenKind,
    got: TokenKind,
    #[label("{}", self)]
    span: SourceSpan,
}

#[derive(Clone, Debug, Error, Diagnostic)]
#[error("no prefix parse function for '{}' found", found)]
#[diagnostic()]
pub struct NoPrefixParseFn {
    found: TokenKind,
    #[label("{}", self)]
    span: SourceSpan,
}

#[derive(Clone, Debug, Error, Diagnostic)]
#[error("could not parse \"{}\" as number", literal)]
#[diagnostic()]
pub struct InvalidNumber {
    literal: String,
    #[label("{}", self)]
    span: SourceSpan,
}

#[derive(Clone, Debug, Error, Diagnostic)]
#[error("property needs to be an identifier, got '{}'", found)]
#[diagnostic()]
pub struct InvalidProperty {
    found: String,
    #[label("{}", self)]
    span: SourceSpan,
}

impl SyntaxError {
    pub fn illegal_token(found: impl Into<String>, span: Span) -> Self {
        Self::from(IllegalToken {
            found: found.into(),
            span: span.into(),
        })
    }

    pub fn unexpected_token(want: TokenKind, got: TokenKind, span: Span) -> Self {
        Self::from(UnexpectedToken {
            want,
            got,
            span: span.into(),
        })
    }

    pub fn no_prefix_parse_fn(found: TokenKind, span: Span) -> Self {
        Self::from(NoPrefixParseFn {
            found,
            span: span.into(),
        })
    }

    pub fn invalid_number(literal: impl Into<String>, span: Span) -> Self {
        Self::from(InvalidNumber {
            literal: literal.into(),
            span: span.into(),
        })
    }

    pub fn invalid_property(found: impl Into<String>, span: Span) -> Self {
        Self::from(InvalidProperty {
            found: found.into(),
            span: span.into(),
        })
    }
}

impl From<IllegalToken> for SyntaxError {
    fn from(illegal: IllegalToken) -> Self {
        Self::IllegalToken(illegal)
    }
}

impl From<UnexpectedToken> for SyntaxError {
    fn from(unexpected: UnexpectedToken) -> Self {
        Self::UnexpectedToken(unexpected)
    }
}

impl From<NoPrefixParseFn> for SyntaxError {
    fn from(no_prefix: NoPrefixParseFn) -> Self {
        Self::NoPrefixParseFn(no_prefix)
    }
}

impl From<InvalidNumber> for SyntaxError {
    fn from(number: InvalidNumber) -> Self {
        Self::InvalidNumber(number)
    }
}

impl From<InvalidProperty> for SyntaxError {
    fn from(property: InvalidProperty) -> Self {
        Self::InvalidProperty(property)
    }
}

/// An evaluation failure that reached the top of the program.
#[derive(Clone, Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic()]
pub struct RuntimeError {
    message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
