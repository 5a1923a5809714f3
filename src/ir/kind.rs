use serde::{Deserialize, Serialize};

/// Static kind of one operand-stack cell.
///
/// Every value occupies a single 64-bit cell at runtime; kinds only exist
/// for the validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// Placeholder for a binding not yet typed by the validator.
    None,
    Any,
    Bool,
    Byte,
    Int,
    Ptr,
    Str,
    /// Parametric kind `$name`, fixed per call site.
    Infer(String),
    /// Only appears in published opcode signatures (`syscallN`).
    Variadic,
}

impl Kind {
    /// Returns true if a value of kind `actual` may fill a slot declared as `self`.
    pub fn accepts(&self, actual: &Kind) -> bool {
        if *actual == Kind::None {
            return false;
        }
        match self {
            Kind::None => false,
            Kind::Any | Kind::Infer(_) | Kind::Variadic => true,
            expected => *actual == Kind::Any || expected == actual,
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(
            self,
            Kind::Bool | Kind::Byte | Kind::Int | Kind::Ptr | Kind::Str
        )
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::None => write!(f, "none"),
            Kind::Any => write!(f, "any"),
            Kind::Bool => write!(f, "bool"),
            Kind::Byte => write!(f, "byte"),
            Kind::Int => write!(f, "int"),
            Kind::Ptr => write!(f, "ptr"),
            Kind::Str => write!(f, "str"),
            Kind::Infer(name) => write!(f, "${}", name),
            Kind::Variadic => write!(f, "..."),
        }
    }
}

/// Formats a kind sequence as `[int ptr]`, bottom first.
pub fn format_kinds(kinds: &[Kind]) -> String {
    let inner: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
    format!("[{}]", inner.join(" "))
}
