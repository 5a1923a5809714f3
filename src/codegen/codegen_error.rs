use thiserror::Error;

use crate::lexer::Location;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// The host cannot run the only supported target.
    #[error("unsupported platform '{os}-{arch}'")]
    UnsupportedPlatform {
        os: String,
        arch: String,
        hint: Option<String>,
    },

    /// An instruction the validator should have removed or rewritten.
    #[error("{loc}: cannot lower '{op}': {reason}")]
    Unlowerable {
        loc: Location,
        op: String,
        reason: String,
    },

    /// Internal compiler error (shouldn't happen in normal use)
    #[error("internal error: {0}")]
    Internal(String),
}

impl CodegenError {
    pub fn unsupported_platform(os: &str, arch: &str) -> Self {
        CodegenError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
            hint: Some("code is generated for x86_64 Linux only".to_string()),
        }
    }

    /// A `Word` survived validation.
    pub fn unresolved_word(loc: &Location, name: &str) -> Self {
        CodegenError::Unlowerable {
            loc: loc.clone(),
            op: name.to_string(),
            reason: "word was never resolved to a function".to_string(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CodegenError::Internal(msg.into())
    }

    pub fn loc(&self) -> Option<&Location> {
        match self {
            CodegenError::Unlowerable { loc, .. } => Some(loc),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            CodegenError::UnsupportedPlatform { hint, .. } => hint.clone(),
            _ => None,
        }
    }

    /// True for compiler bugs as opposed to environment problems.
    pub fn is_internal(&self) -> bool {
        !matches!(self, CodegenError::UnsupportedPlatform { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_display() {
        let err = CodegenError::unsupported_platform("macos", "aarch64");
        assert_eq!(err.to_string(), "unsupported platform 'macos-aarch64'");
        assert!(err.hint().unwrap().contains("x86_64 Linux"));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_unresolved_word_has_location() {
        let loc = Location::new("m.cin".into(), 2, 3);
        let err = CodegenError::unresolved_word(&loc, "frob");
        assert_eq!(
            err.to_string(),
            "m.cin:2:3: cannot lower 'frob': word was never resolved to a function"
        );
        assert_eq!(err.loc(), Some(&loc));
        assert!(err.is_internal());
    }

    #[test]
    fn test_internal_error_display() {
        let err = CodegenError::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }
}
