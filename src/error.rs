use thiserror::Error;

use crate::codegen::CodegenError;
use crate::diagnostic::{Diagnostic, Severity};
use crate::parser_error::ParserError;
use crate::source::SourceError;
use crate::validate::ValidationError;

/// Exit statuses of the `cinder` binary.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const USAGE: i32 = 2;
    pub const PARSE: i32 = 3;
    pub const VALIDATION: i32 = 4;
    pub const CODEGEN: i32 = 5;
    pub const INTERNAL: i32 = 6;
}

/// First stage failure of a compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Every lexical, syntactic and declaration error of the parse stage.
    #[error("{} error(s) while parsing", .0.len())]
    Parse(Vec<ParserError>),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<Vec<ParserError>> for CompileError {
    fn from(errors: Vec<ParserError>) -> Self {
        CompileError::Parse(errors)
    }
}

impl CompileError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Parse(_) | CompileError::Source(_) => exit::PARSE,
            CompileError::Validation(err) if err.is_internal() => exit::INTERNAL,
            CompileError::Validation(_) => exit::VALIDATION,
            CompileError::Codegen(err) if err.is_internal() => exit::INTERNAL,
            CompileError::Codegen(_) => exit::CODEGEN,
            CompileError::Internal(_) => exit::INTERNAL,
        }
    }

    /// One diagnostic per underlying problem, in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            CompileError::Parse(errors) => errors
                .iter()
                .map(|e| Diagnostic::error(Some(e.loc.clone()), e.message.clone()).with_hint_opt(e.hint.clone()))
                .collect(),
            CompileError::Validation(err) if err.is_internal() => {
                vec![Diagnostic::new(Severity::Internal, err.loc().cloned(), err.message())]
            }
            CompileError::Validation(err) => {
                vec![Diagnostic::error(err.loc().cloned(), err.message()).with_hint_opt(err.hint())]
            }
            CompileError::Codegen(err) if err.is_internal() => {
                vec![Diagnostic::internal(err.to_string())]
            }
            CompileError::Codegen(err) => {
                vec![Diagnostic::error(err.loc().cloned(), err.to_string()).with_hint_opt(err.hint())]
            }
            CompileError::Source(err) => vec![Diagnostic::error(None, err.to_string())],
            CompileError::Internal(msg) => vec![Diagnostic::internal(msg.clone())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::lexer::Location;

    fn loc() -> Location {
        Location::new("m.cin".into(), 3, 5)
    }

    #[test]
    fn test_exit_codes_by_stage() {
        assert_eq!(CompileError::Parse(vec![]).exit_code(), exit::PARSE);
        assert_eq!(
            CompileError::from(ValidationError::MissingMain).exit_code(),
            exit::VALIDATION
        );
        assert_eq!(
            CompileError::from(CodegenError::unsupported_platform("macos", "aarch64")).exit_code(),
            exit::CODEGEN
        );
        assert_eq!(
            CompileError::from(CodegenError::internal("bug")).exit_code(),
            exit::INTERNAL
        );
        assert_eq!(CompileError::Internal("bug".into()).exit_code(), exit::INTERNAL);
    }

    #[test]
    fn test_parse_errors_keep_their_hints() {
        let err = CompileError::from(vec![
            ParserError::new(loc(), "first"),
            ParserError::new(loc(), "second").with_hint("try this"),
        ]);
        let diags = err.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[1].to_string(), "m.cin:3:5: error: second\n  hint: try this");
    }

    #[test]
    fn test_validation_error_is_one_diagnostic() {
        let err = CompileError::from(ValidationError::new(loc(), "bad call"));
        let diags = err.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].to_string(), "m.cin:3:5: error: bad call");
    }

    #[test]
    fn test_internal_codegen_error_is_labelled() {
        let err = CompileError::from(CodegenError::unresolved_word(&loc(), "frob"));
        assert_eq!(err.diagnostics()[0].severity, Severity::Internal);
    }

    #[test]
    fn test_internal_validation_error_exits_as_internal() {
        let err = CompileError::from(ValidationError::internal(loc(), "call resolved twice"));
        assert_eq!(err.exit_code(), exit::INTERNAL);
        assert_eq!(
            err.diagnostics()[0].to_string(),
            "m.cin:3:5: internal compiler error: call resolved twice"
        );
    }
}
