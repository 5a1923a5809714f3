use serde::{Deserialize, Serialize};

use crate::ir::Kind;
use crate::lexer::Location;

// =============================================================================
// OP - IR instructions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    // literals
    PushInt(i64),
    PushBool(bool),
    PushChar(u8),
    /// Index into `Program::strings`.
    PushStr(usize),
    /// Address of `Program::memories[i]`.
    PushPtr(usize),
    /// Read of the function's binding slot `i`.
    PushBind(usize),

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // logic
    And,
    Or,
    Not,

    // stack ops
    Dup,
    Drop,
    Swap,
    Over,
    Rot,

    // memory
    Load,
    Load8,
    Store,
    Store8,
    Cast(Kind),
    Syscall(u8),

    // ==========================================================================
    // Control flow. Jump targets are instruction indices in the same function.
    // ==========================================================================
    /// Start of a conditional; marker only.
    If,
    /// Loop test position; target of the loop's back jump.
    Loop,
    /// Pop a bool, jump if false.
    Do(usize),
    /// End of the then-branch: unconditional jump over the else-branch.
    Else(usize),
    /// Loop back edge.
    Jump(usize),
    EndIf,
    EndLoop,

    // bindings
    Bind(usize),
    Unbind(usize),

    // ==========================================================================
    // Calls
    // ==========================================================================
    /// Deferred name lookup, rewritten to `Call` by the validator.
    Word(String),
    /// Resolved call to `Program::functions[entry]`.
    Call(usize),
}

impl Op {
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Op::Do(target) | Op::Else(target) | Op::Jump(target) => Some(*target),
            _ => None,
        }
    }

    /// Surface spelling used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Op::PushInt(n) => n.to_string(),
            Op::PushBool(b) => b.to_string(),
            Op::PushChar(c) => format!("{:?}", *c as char),
            Op::PushStr(_) => "string literal".to_string(),
            Op::PushPtr(_) => "memory".to_string(),
            Op::PushBind(_) => "binding".to_string(),
            Op::Add => "+".to_string(),
            Op::Sub => "-".to_string(),
            Op::Mul => "*".to_string(),
            Op::Div => "/".to_string(),
            Op::Mod => "%".to_string(),
            Op::Eq => "=".to_string(),
            Op::Ne => "!=".to_string(),
            Op::Lt => "<".to_string(),
            Op::Gt => ">".to_string(),
            Op::Le => "<=".to_string(),
            Op::Ge => ">=".to_string(),
            Op::And => "and".to_string(),
            Op::Or => "or".to_string(),
            Op::Not => "not".to_string(),
            Op::Dup => "dup".to_string(),
            Op::Drop => "drop".to_string(),
            Op::Swap => "swap".to_string(),
            Op::Over => "over".to_string(),
            Op::Rot => "rot".to_string(),
            Op::Load => "load".to_string(),
            Op::Load8 => "load8".to_string(),
            Op::Store => "store".to_string(),
            Op::Store8 => "store8".to_string(),
            Op::Cast(kind) => format!("cast {}", kind),
            Op::Syscall(n) => format!("syscall{}", n),
            Op::If => "if".to_string(),
            Op::Loop => "loop".to_string(),
            Op::Do(_) => "(".to_string(),
            Op::Else(_) => "else".to_string(),
            Op::Jump(_) | Op::EndIf | Op::EndLoop => ")".to_string(),
            Op::Bind(_) => "let".to_string(),
            Op::Unbind(_) => "unbind".to_string(),
            Op::Word(name) => name.clone(),
            Op::Call(entry) => format!("call fn{}", entry),
        }
    }
}

/// One instruction with the location it was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub loc: Location,
    pub op: Op,
}

impl Code {
    pub fn new(loc: Location, op: Op) -> Self {
        Code { loc, op }
    }

    /// The single `Word -> Call` transition.
    ///
    /// Returns the resolved name, or `None` if the instruction is not an
    /// unresolved word (a resolved call is never re-resolved).
    pub fn resolve(&mut self, entry: usize) -> Option<String> {
        match std::mem::replace(&mut self.op, Op::Call(entry)) {
            Op::Word(name) => Some(name),
            other => {
                self.op = other;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location::new("t.cin".into(), 1, 1)
    }

    #[test]
    fn test_resolve_word_once() {
        let mut code = Code::new(loc(), Op::Word("square".to_string()));
        assert_eq!(code.resolve(3), Some("square".to_string()));
        assert_eq!(code.op, Op::Call(3));

        // a resolved call stays untouched
        assert_eq!(code.resolve(7), None);
        assert_eq!(code.op, Op::Call(3));
    }

    #[test]
    fn test_resolve_rejects_other_ops() {
        let mut code = Code::new(loc(), Op::Dup);
        assert_eq!(code.resolve(0), None);
        assert_eq!(code.op, Op::Dup);
    }

    #[test]
    fn test_jump_targets() {
        assert_eq!(Op::Do(4).jump_target(), Some(4));
        assert_eq!(Op::Jump(0).jump_target(), Some(0));
        assert_eq!(Op::EndLoop.jump_target(), None);
    }
}
