use std::collections::HashMap;

use crate::ir::{Kind, Op};

/// Declared stack effect: `args` are consumed (top of stack last) and
/// replaced by `rets`.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub args: Vec<Kind>,
    pub rets: Vec<Kind>,
}

impl Signature {
    pub fn new(args: Vec<Kind>, rets: Vec<Kind>) -> Self {
        Signature { args, rets }
    }

    /// Argument slots with `Variadic` spelled out as `count` values of any kind.
    pub fn expand(&self, count: usize) -> Vec<Kind> {
        let mut args = Vec::with_capacity(self.args.len() + count);
        for kind in &self.args {
            match kind {
                Kind::Variadic => args.extend(std::iter::repeat_n(Kind::Any, count)),
                other => args.push(other.clone()),
            }
        }
        args
    }
}

fn t(name: &str) -> Kind {
    Kind::Infer(name.to_string())
}

/// Published signature of a fixed-effect opcode, or None for literals,
/// control-flow markers and calls, which the validator handles itself.
///
/// Stack shuffles are written with type parameters so the same matching
/// code that checks calls also carries kinds through `dup` and friends.
pub fn signature(op: &Op) -> Option<Signature> {
    use Kind::{Any, Bool, Byte, Int, Ptr, Variadic};
    let (args, rets) = match op {
        // `+`/`-` produce a kind decided by `arithmetic_result`
        Op::Add | Op::Sub => (vec![Any, Int], vec![Int]),
        Op::Mul | Op::Div | Op::Mod => (vec![Int, Int], vec![Int]),

        Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => (vec![Any, Any], vec![Bool]),

        Op::And | Op::Or => (vec![Bool, Bool], vec![Bool]),
        Op::Not => (vec![Bool], vec![Bool]),

        Op::Dup => (vec![t("a")], vec![t("a"), t("a")]),
        Op::Drop => (vec![t("a")], vec![]),
        Op::Swap => (vec![t("a"), t("b")], vec![t("b"), t("a")]),
        Op::Over => (vec![t("a"), t("b")], vec![t("a"), t("b"), t("a")]),
        Op::Rot => (vec![t("a"), t("b"), t("c")], vec![t("b"), t("c"), t("a")]),

        Op::Load => (vec![Ptr], vec![Int]),
        Op::Load8 => (vec![Ptr, Int], vec![Byte]),
        Op::Store => (vec![Any, Ptr], vec![]),
        Op::Store8 => (vec![Any, Ptr, Int], vec![]),
        Op::Cast(kind) => (vec![Any], vec![kind.clone()]),

        // syscall number on top, first argument right below it
        Op::Syscall(_) => (vec![Variadic, Int], vec![Int]),

        Op::Do(_) => (vec![Bool], vec![]),
        Op::Bind(_) => (vec![Variadic], vec![]),

        _ => return None,
    };
    Some(Signature::new(args, rets))
}

/// Number of values a `Variadic` slot stands for in this opcode.
pub fn variadic_count(op: &Op) -> usize {
    match op {
        Op::Syscall(n) => *n as usize,
        Op::Bind(n) => *n,
        _ => 0,
    }
}

/// Result kind of `a b +` and `a b -`.
pub fn arithmetic_result(a: &Kind, b: &Kind) -> Kind {
    if *a == Kind::Int && *b == Kind::Int {
        Kind::Int
    } else if *a == Kind::Byte || *b == Kind::Byte {
        Kind::Byte
    } else {
        Kind::Ptr
    }
}

/// Matches `args` against the top of `stack` slot for slot.
///
/// Returns the type parameters fixed by the match, or None if some slot is
/// rejected, a parameter is bound to two different kinds, or the stack is
/// too shallow.
pub fn match_args(args: &[Kind], stack: &[Kind]) -> Option<HashMap<String, Kind>> {
    if stack.len() < args.len() {
        return None;
    }
    let actual = &stack[stack.len() - args.len()..];

    let mut bound: HashMap<String, Kind> = HashMap::new();
    for (expected, found) in args.iter().zip(actual) {
        if !expected.accepts(found) {
            return None;
        }
        if let Kind::Infer(name) = expected {
            match bound.get(name) {
                Some(previous) if previous != found => return None,
                Some(_) => {}
                None => {
                    bound.insert(name.clone(), found.clone());
                }
            }
        }
    }
    Some(bound)
}

/// Replaces type parameters in `rets` with what the call bound them to;
/// parameters left unbound become `any`.
pub fn substitute(rets: &[Kind], bound: &HashMap<String, Kind>) -> Vec<Kind> {
    rets.iter()
        .map(|kind| match kind {
            Kind::Infer(name) => bound.get(name).cloned().unwrap_or(Kind::Any),
            other => other.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_result() {
        assert_eq!(arithmetic_result(&Kind::Int, &Kind::Int), Kind::Int);
        assert_eq!(arithmetic_result(&Kind::Byte, &Kind::Int), Kind::Byte);
        assert_eq!(arithmetic_result(&Kind::Ptr, &Kind::Int), Kind::Ptr);
        assert_eq!(arithmetic_result(&Kind::Any, &Kind::Int), Kind::Ptr);
    }

    #[test]
    fn test_syscall_expands_variadic() {
        let sig = signature(&Op::Syscall(3)).unwrap();
        assert_eq!(sig.args, vec![Kind::Variadic, Kind::Int]);
        assert_eq!(
            sig.expand(variadic_count(&Op::Syscall(3))),
            vec![Kind::Any, Kind::Any, Kind::Any, Kind::Int]
        );
    }

    #[test]
    fn test_match_checks_trailing_slots() {
        let stack = vec![Kind::Str, Kind::Ptr, Kind::Int];
        assert!(match_args(&[Kind::Ptr, Kind::Int], &stack).is_some());
        assert!(match_args(&[Kind::Int, Kind::Int], &stack).is_none());
        assert!(match_args(&[Kind::Any, Kind::Any, Kind::Any, Kind::Any], &stack).is_none());
    }

    #[test]
    fn test_repeated_parameters_must_agree() {
        let args = vec![t("a"), t("a")];
        assert!(match_args(&args, &[Kind::Int, Kind::Int]).is_some());
        assert!(match_args(&args, &[Kind::Int, Kind::Ptr]).is_none());
    }

    #[test]
    fn test_shuffles_carry_kinds() {
        let sig = signature(&Op::Rot).unwrap();
        let stack = vec![Kind::Int, Kind::Bool, Kind::Ptr];
        let bound = match_args(&sig.args, &stack).unwrap();
        assert_eq!(
            substitute(&sig.rets, &bound),
            vec![Kind::Bool, Kind::Ptr, Kind::Int]
        );
    }

    #[test]
    fn test_unbound_parameter_becomes_any() {
        let rets = substitute(&[t("x"), Kind::Int], &HashMap::new());
        assert_eq!(rets, vec![Kind::Any, Kind::Int]);
    }

    #[test]
    fn test_control_markers_have_no_signature() {
        assert!(signature(&Op::If).is_none());
        assert!(signature(&Op::PushInt(1)).is_none());
        assert!(signature(&Op::Word("f".to_string())).is_none());
        assert!(signature(&Op::Call(0)).is_none());
    }

    #[test]
    fn test_cast_publishes_its_target() {
        let sig = signature(&Op::Cast(Kind::Ptr)).unwrap();
        assert_eq!(sig.args, vec![Kind::Any]);
        assert_eq!(sig.rets, vec![Kind::Ptr]);
    }
}
