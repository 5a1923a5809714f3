use thiserror::Error;

use crate::ir::Kind;
use crate::ir::kind::format_kinds;
use crate::lexer::Location;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A branch or loop left a different number of values than it found.
    #[error("{loc}: stack size changed {context}")]
    SizeChanged {
        loc: Location,
        context: String,
        expected: Vec<Kind>,
        found: Vec<Kind>,
    },

    /// Same depth, but at least one slot holds a different kind.
    #[error("{loc}: stack types changed {context}")]
    TypesChanged {
        loc: Location,
        context: String,
        expected: Vec<Kind>,
        found: Vec<Kind>,
    },

    #[error("{loc}: {message}")]
    Invalid {
        loc: Location,
        message: String,
        hint: Option<String>,
    },

    #[error("no 'main' function")]
    MissingMain,

    /// The IR broke an invariant an earlier stage should have upheld.
    #[error("{loc}: {message}")]
    Internal { loc: Location, message: String },
}

impl ValidationError {
    pub fn new(loc: Location, message: impl Into<String>) -> Self {
        ValidationError::Invalid {
            loc,
            message: message.into(),
            hint: None,
        }
    }

    /// Attaches a hint; only free-form errors carry one of their own.
    pub fn with_hint(self, text: impl Into<String>) -> Self {
        match self {
            ValidationError::Invalid { loc, message, .. } => ValidationError::Invalid {
                loc,
                message,
                hint: Some(text.into()),
            },
            other => other,
        }
    }

    pub fn internal(loc: Location, message: impl Into<String>) -> Self {
        ValidationError::Internal {
            loc,
            message: message.into(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, ValidationError::Internal { .. })
    }

    /// Compares two stack states, reporting size changes before kind changes.
    pub fn check_balanced(
        loc: &Location,
        context: &str,
        expected: &[Kind],
        found: &[Kind],
    ) -> Result<(), ValidationError> {
        if expected.len() != found.len() {
            return Err(ValidationError::SizeChanged {
                loc: loc.clone(),
                context: context.to_string(),
                expected: expected.to_vec(),
                found: found.to_vec(),
            });
        }
        if expected != found {
            return Err(ValidationError::TypesChanged {
                loc: loc.clone(),
                context: context.to_string(),
                expected: expected.to_vec(),
                found: found.to_vec(),
            });
        }
        Ok(())
    }

    pub fn loc(&self) -> Option<&Location> {
        match self {
            ValidationError::SizeChanged { loc, .. }
            | ValidationError::TypesChanged { loc, .. }
            | ValidationError::Invalid { loc, .. }
            | ValidationError::Internal { loc, .. } => Some(loc),
            ValidationError::MissingMain => None,
        }
    }

    /// The message without its location prefix.
    pub fn message(&self) -> String {
        match self {
            ValidationError::SizeChanged { context, .. } => {
                format!("stack size changed {}", context)
            }
            ValidationError::TypesChanged { context, .. } => {
                format!("stack types changed {}", context)
            }
            ValidationError::Invalid { message, .. }
            | ValidationError::Internal { message, .. } => message.clone(),
            ValidationError::MissingMain => "no 'main' function".to_string(),
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            ValidationError::SizeChanged {
                expected, found, ..
            }
            | ValidationError::TypesChanged {
                expected, found, ..
            } => Some(format!(
                "expected {}, found {}",
                format_kinds(expected),
                format_kinds(found)
            )),
            ValidationError::Invalid { hint, .. } => hint.clone(),
            ValidationError::Internal { .. } => None,
            ValidationError::MissingMain => {
                Some("every program needs 'fn main ( ... )' as its entry point".to_string())
            }
        }
    }
}
