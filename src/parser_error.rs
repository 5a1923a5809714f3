use thiserror::Error;

use crate::lexer::{LexerError, Location};

/// A lexical, syntactic or declaration error with source location.
///
/// The parser keeps going after recording one of these, so a single pass
/// reports every problem it can find before the pipeline stops.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{loc}: {message}")]
pub struct ParserError {
    pub message: String,
    pub loc: Location,
    pub hint: Option<String>,
}

impl ParserError {
    pub fn new(loc: Location, message: impl Into<String>) -> Self {
        ParserError {
            message: message.into(),
            loc,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<LexerError> for ParserError {
    fn from(err: LexerError) -> Self {
        ParserError::new(err.loc, err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_location_then_message() {
        let err = ParserError::new(Location::new("a.cin".into(), 3, 7), "expected ')'");
        assert_eq!(err.to_string(), "a.cin:3:7: expected ')'");
    }

    #[test]
    fn test_lexer_errors_convert() {
        let lex = LexerError {
            message: "empty character literal".to_string(),
            loc: Location::new("a.cin".into(), 1, 2),
        };
        let err = ParserError::from(lex);
        assert_eq!(err.loc.col, 2);
        assert!(err.hint.is_none());
    }
}
