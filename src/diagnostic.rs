use std::fmt;

use crate::lexer::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    /// A compiler bug rather than a problem in the program.
    Internal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Internal => write!(f, "internal compiler error"),
        }
    }
}

/// One message for the user, rendered as
///
/// ```text
/// file.cin:3:7: error: message
///   hint: something to try
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub loc: Option<Location>,
    pub message: String,
    pub hints: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, loc: Option<Location>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            loc,
            message: message.into(),
            hints: Vec::new(),
        }
    }

    pub fn error(loc: Option<Location>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, loc, message)
    }

    pub fn warning(loc: Location, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, Some(loc), message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Severity::Internal, None, message)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Adds the hint if there is one.
    pub fn with_hint_opt(self, hint: Option<String>) -> Self {
        match hint {
            Some(hint) => self.with_hint(hint),
            None => self,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity != Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.loc {
            Some(loc) => write!(f, "{}: {}: {}", loc, self.severity, self.message)?,
            None => write!(f, "cinder: {}: {}", self.severity, self.message)?,
        }
        for hint in &self.hints {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location::new("demo.cin".into(), 4, 12)
    }

    #[test]
    fn test_error_with_location() {
        let diag = Diagnostic::error(Some(loc()), "unknown word 'frob'");
        assert_eq!(diag.to_string(), "demo.cin:4:12: error: unknown word 'frob'");
        assert!(diag.is_error());
    }

    #[test]
    fn test_warning_with_hints() {
        let diag = Diagnostic::warning(loc(), "function 'helper' is never called")
            .with_hint("remove it")
            .with_hint_opt(None)
            .with_hint_opt(Some("or call it from 'main'".to_string()));
        assert_eq!(
            diag.to_string(),
            "demo.cin:4:12: warning: function 'helper' is never called\n  hint: remove it\n  hint: or call it from 'main'"
        );
        assert!(!diag.is_error());
    }

    #[test]
    fn test_internal_without_location() {
        let diag = Diagnostic::internal("unresolved word reached code generation");
        assert_eq!(
            diag.to_string(),
            "cinder: internal compiler error: unresolved word reached code generation"
        );
    }
}
