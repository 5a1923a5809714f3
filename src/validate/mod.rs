//! # Validator
//!
//! An abstract interpreter that runs every function over a stack of kinds
//! instead of values. On the way it
//!
//! - checks each opcode and call against its declared signature,
//! - rewrites every `Word` into a `Call` by looking at the live stack,
//! - requires `if` branches and loop bodies to leave the stack as they found
//!   it,
//! - types `let` bindings,
//! - checks that each function ends with exactly its declared results,
//!
//! and finally marks the functions reachable from `main`.
//!
//! The first error stops validation.

pub mod signature;
pub mod validation_error;

use std::collections::HashMap;

use crate::diagnostic::Diagnostic;
use crate::ir::kind::format_kinds;
use crate::ir::{Function, Kind, Op, Program};
use crate::lexer::Location;

use signature::{Signature, arithmetic_result, match_args, signature, substitute, variadic_count};
pub use validation_error::ValidationError;

/// Deepest abstract stack a function may build.
pub const STACK_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScopeKind {
    Conditional,
    Loop,
}

/// Stack state an `if` or `loop` has to return to.
#[derive(Debug)]
struct Snapshot {
    kind: ScopeKind,
    stack: Vec<Kind>,
    /// The `(` has been passed.
    tested: bool,
    in_else: bool,
}

/// Name and declared effect of one function, indexed by entry.
#[derive(Debug, Clone)]
struct Declared {
    name: String,
    display: String,
    signature: Signature,
}

pub struct Validator {
    declared: Vec<Declared>,
    stack: Vec<Kind>,
    snapshots: Vec<Snapshot>,
    /// `let` slots live at the current point of the linear walk.
    bound: usize,
}

/// Validates `program` in place; returns the warnings on success.
pub fn validate(program: &mut Program) -> Result<Vec<Diagnostic>, ValidationError> {
    Validator::new(program).run(program)
}

impl Validator {
    pub fn new(program: &Program) -> Self {
        let declared = program
            .functions
            .iter()
            .map(|f| Declared {
                name: f.name.clone(),
                display: f.signature(),
                signature: Signature::new(f.args.clone(), f.rets.clone()),
            })
            .collect();

        Validator {
            declared,
            stack: Vec::new(),
            snapshots: Vec::new(),
            bound: 0,
        }
    }

    pub fn run(mut self, program: &mut Program) -> Result<Vec<Diagnostic>, ValidationError> {
        for function in program.functions.iter_mut() {
            self.check_function(function)?;
        }

        let main = program.main().ok_or(ValidationError::MissingMain)?.entry;
        mark_reachable(program, main);

        let warnings = program
            .functions
            .iter()
            .filter(|f| !f.called && !f.internal)
            .map(|f| {
                Diagnostic::warning(
                    f.loc.clone(),
                    format!("function '{}' is never called", f.signature()),
                )
                .with_hint("it is left out of the generated code")
            })
            .collect();

        Ok(warnings)
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn check_function(&mut self, function: &mut Function) -> Result<(), ValidationError> {
        if function.name == "main" && (!function.args.is_empty() || !function.rets.is_empty()) {
            return Err(
                ValidationError::new(function.loc.clone(), "'main' must not take or return values")
                    .with_hint(format!("found 'fn {}'", function.signature())),
            );
        }

        self.stack = function.args.clone();
        self.snapshots.clear();
        self.bound = 0;

        for ip in 0..function.code.len() {
            self.step(function, ip)?;
        }

        let end = function
            .code
            .last()
            .map(|c| c.loc.clone())
            .unwrap_or_else(|| function.loc.clone());

        if !self.snapshots.is_empty() {
            return Err(ValidationError::new(end, "unbalanced control flow at end of function"));
        }
        self.check_return(function, &end)
    }

    fn check_return(&self, function: &Function, end: &Location) -> Result<(), ValidationError> {
        let declared = &function.rets;
        let hint = format!(
            "declared {}, found {}",
            format_kinds(declared),
            format_kinds(&self.stack)
        );

        if self.stack.len() < declared.len() {
            return Err(ValidationError::new(
                end.clone(),
                format!(
                    "function '{}' is not explicitly returned: {} value(s) declared, {} left on the stack",
                    function.name,
                    declared.len(),
                    self.stack.len()
                ),
            )
            .with_hint(hint));
        }
        if self.stack.len() > declared.len() {
            return Err(ValidationError::new(
                end.clone(),
                format!(
                    "too many values left on the stack at the end of '{}': {} value(s) declared, {} left",
                    function.name,
                    declared.len(),
                    self.stack.len()
                ),
            )
            .with_hint(hint));
        }

        for (expected, found) in declared.iter().zip(&self.stack) {
            if expected.is_concrete() && found.is_concrete() && expected != found {
                return Err(ValidationError::new(
                    end.clone(),
                    format!(
                        "function '{}' returns {} where {} is declared",
                        function.name, found, expected
                    ),
                )
                .with_hint(hint));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Instructions
    // =========================================================================

    fn step(&mut self, function: &mut Function, ip: usize) -> Result<(), ValidationError> {
        let loc = function.code[ip].loc.clone();
        let op = function.code[ip].op.clone();

        match &op {
            // Literals
            Op::PushInt(_) => self.push(Kind::Int, &loc),
            Op::PushBool(_) => self.push(Kind::Bool, &loc),
            Op::PushChar(_) => self.push(Kind::Byte, &loc),
            Op::PushStr(_) => self.push(Kind::Str, &loc),
            Op::PushPtr(_) => self.push(Kind::Ptr, &loc),
            Op::PushBind(index) => {
                let binding = function.bindings.get(*index).ok_or_else(|| {
                    ValidationError::new(loc.clone(), format!("no binding slot {}", index))
                })?;
                if binding.kind == Kind::None {
                    return Err(ValidationError::new(
                        loc,
                        format!("binding '{}' is used before it is bound", binding.name),
                    ));
                }
                let kind = binding.kind.clone();
                self.push(kind, &loc)
            }

            // Bindings
            Op::Bind(count) => {
                // slots are reserved where `let` runs but released only at
                // function end, so a block could run it zero or many times
                if let Some(snapshot) = self.snapshots.last() {
                    let block = match snapshot.kind {
                        ScopeKind::Conditional => "if",
                        ScopeKind::Loop => "loop",
                    };
                    return Err(
                        ValidationError::new(loc, format!("'let' inside '{}' is not supported", block))
                            .with_hint(
                                "bindings live until the end of the function; move the 'let' before the block",
                            ),
                    );
                }
                let values = self.apply(&op, &loc)?;
                for (offset, kind) in values.into_iter().enumerate() {
                    let index = self.bound + offset;
                    let binding = function.bindings.get_mut(index).ok_or_else(|| {
                        ValidationError::new(loc.clone(), format!("no binding slot {}", index))
                    })?;
                    binding.kind = kind;
                }
                self.bound += count;
                Ok(())
            }
            Op::Unbind(count) => {
                self.bound = self.bound.saturating_sub(*count);
                Ok(())
            }

            // Control flow
            Op::If => {
                self.snapshots.push(Snapshot {
                    kind: ScopeKind::Conditional,
                    stack: Vec::new(),
                    tested: false,
                    in_else: false,
                });
                Ok(())
            }
            Op::Loop => {
                self.snapshots.push(Snapshot {
                    kind: ScopeKind::Loop,
                    stack: self.stack.clone(),
                    tested: false,
                    in_else: false,
                });
                Ok(())
            }
            Op::Do(_) => {
                self.apply(&op, &loc)?;
                let stack = &self.stack;
                let snapshot = self
                    .snapshots
                    .last_mut()
                    .ok_or_else(|| ValidationError::new(loc.clone(), "'(' outside 'if' or 'loop'"))?;
                match snapshot.kind {
                    ScopeKind::Conditional => snapshot.stack = stack.clone(),
                    ScopeKind::Loop => ValidationError::check_balanced(
                        &loc,
                        "by the loop condition",
                        &snapshot.stack,
                        stack,
                    )?,
                }
                snapshot.tested = true;
                Ok(())
            }
            Op::Else(_) => {
                let stack = &self.stack;
                let snapshot = match self.snapshots.last_mut() {
                    Some(s) if s.kind == ScopeKind::Conditional && s.tested => s,
                    _ => return Err(ValidationError::new(loc, "'else' outside 'if'")),
                };
                ValidationError::check_balanced(&loc, "in the 'if' branch", &snapshot.stack, stack)?;
                snapshot.in_else = true;
                self.stack = snapshot.stack.clone();
                Ok(())
            }
            Op::Jump(_) => Ok(()),
            Op::EndIf | Op::EndLoop => {
                let snapshot = self
                    .snapshots
                    .pop()
                    .ok_or_else(|| ValidationError::new(loc.clone(), "unmatched ')'"))?;
                let context = match (snapshot.kind, snapshot.in_else) {
                    (ScopeKind::Conditional, false) => "in the 'if' branch",
                    (ScopeKind::Conditional, true) => "in the 'else' branch",
                    (ScopeKind::Loop, _) => "by the loop body",
                };
                ValidationError::check_balanced(&loc, context, &snapshot.stack, &self.stack)
            }

            // Calls
            Op::Word(_) | Op::Call(_) => self.call(function, ip, &loc),

            // Everything else has a fixed signature
            _ => self.apply(&op, &loc).map(|_| ()),
        }
    }

    fn push(&mut self, kind: Kind, loc: &Location) -> Result<(), ValidationError> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(ValidationError::new(
                loc.clone(),
                format!("stack overflow: more than {} values", STACK_LIMIT),
            ));
        }
        self.stack.push(kind);
        Ok(())
    }

    fn require(&self, count: usize, what: &str, loc: &Location) -> Result<(), ValidationError> {
        if self.stack.len() < count {
            return Err(ValidationError::new(
                loc.clone(),
                format!(
                    "stack underflow: '{}' needs {} value(s), found {}",
                    what,
                    count,
                    self.stack.len()
                ),
            )
            .with_hint(format!("stack is {}", format_kinds(&self.stack))));
        }
        Ok(())
    }

    /// Top `count` kinds, bottom first.
    fn top(&self, count: usize) -> &[Kind] {
        &self.stack[self.stack.len().saturating_sub(count)..]
    }

    /// Applies a fixed-signature opcode; returns the consumed kinds.
    fn apply(&mut self, op: &Op, loc: &Location) -> Result<Vec<Kind>, ValidationError> {
        let sig = signature(op).ok_or_else(|| {
            ValidationError::new(loc.clone(), format!("'{}' has no stack signature", op.name()))
        })?;
        let args = sig.expand(variadic_count(op));
        let name = op.name();

        self.require(args.len(), &name, loc)?;
        let bound = match_args(&args, &self.stack).ok_or_else(|| {
            ValidationError::new(
                loc.clone(),
                format!(
                    "'{}' expects {}, found {}",
                    name,
                    format_kinds(&sig.args),
                    format_kinds(self.top(args.len()))
                ),
            )
        })?;

        let consumed = self.stack.split_off(self.stack.len() - args.len());
        let rets = match op {
            Op::Add | Op::Sub => vec![arithmetic_result(&consumed[0], &consumed[1])],
            _ => substitute(&sig.rets, &bound),
        };
        for kind in rets {
            self.push(kind, loc)?;
        }
        Ok(consumed)
    }

    // =========================================================================
    // Calls and overload resolution
    // =========================================================================

    fn candidates(&self, name: &str) -> Vec<usize> {
        self.declared
            .iter()
            .enumerate()
            .filter(|(_, d)| d.name == name)
            .map(|(entry, _)| entry)
            .collect()
    }

    fn call(&mut self, function: &mut Function, ip: usize, loc: &Location) -> Result<(), ValidationError> {
        let (name, candidates) = match &function.code[ip].op {
            Op::Word(name) => (name.clone(), self.candidates(name)),
            Op::Call(entry) => match self.declared.get(*entry) {
                Some(d) => (d.name.clone(), vec![*entry]),
                None => {
                    return Err(ValidationError::internal(
                        loc.clone(),
                        format!("call to missing function fn{}", entry),
                    ));
                }
            },
            other => {
                return Err(ValidationError::new(
                    loc.clone(),
                    format!("'{}' is not a call", other.name()),
                ));
            }
        };

        let (entry, bound) = match candidates.as_slice() {
            [] => return Err(ValidationError::new(loc.clone(), format!("unknown word '{}'", name))),
            [entry] => {
                let args = &self.declared[*entry].signature.args;
                self.require(args.len(), &name, loc)?;
                let bound = match_args(args, &self.stack).ok_or_else(|| {
                    ValidationError::new(
                        loc.clone(),
                        format!(
                            "argument mismatch calling '{}': expected {}, found {}",
                            name,
                            format_kinds(args),
                            format_kinds(self.top(args.len()))
                        ),
                    )
                })?;
                (*entry, bound)
            }
            several => self.resolve_overload(&name, several, loc)?,
        };

        let code = &mut function.code[ip];
        if code.resolve(entry).is_none() && code.op != Op::Call(entry) {
            return Err(ValidationError::internal(
                loc.clone(),
                format!("cannot resolve '{}' to fn{}: found '{}'", name, entry, code.op.name()),
            ));
        }

        let sig = &self.declared[entry].signature;
        let rets = substitute(&sig.rets, &bound);
        let remaining = self.stack.len() - sig.args.len();
        self.stack.truncate(remaining);
        for kind in rets {
            self.push(kind, loc)?;
        }
        Ok(())
    }

    /// First candidate, in declaration order, whose arguments match the top
    /// of the stack.
    fn resolve_overload(
        &self,
        name: &str,
        candidates: &[usize],
        loc: &Location,
    ) -> Result<(usize, HashMap<String, Kind>), ValidationError> {
        for &entry in candidates {
            if let Some(bound) = match_args(&self.declared[entry].signature.args, &self.stack) {
                return Ok((entry, bound));
            }
        }

        let widest = candidates
            .iter()
            .map(|&e| self.declared[e].signature.args.len())
            .max()
            .unwrap_or(0);
        let tried: Vec<&str> = candidates
            .iter()
            .map(|&e| self.declared[e].display.as_str())
            .collect();

        Err(ValidationError::new(
            loc.clone(),
            format!(
                "no overload of '{}' matches the stack {}",
                name,
                format_kinds(self.top(widest))
            ),
        )
        .with_hint(format!("candidates are: {}", tried.join("; "))))
    }
}

// =============================================================================
// Reachability
// =============================================================================

/// Marks every function reachable from `root` through resolved calls, and
/// clears the mark on all others.
pub fn mark_reachable(program: &mut Program, root: usize) {
    for function in program.functions.iter_mut() {
        function.called = false;
    }

    let mut worklist = vec![root];
    while let Some(entry) = worklist.pop() {
        let Some(function) = program.functions.get_mut(entry) else {
            continue;
        };
        if function.called {
            continue;
        }
        function.called = true;
        for code in &function.code {
            if let Op::Call(callee) = code.op {
                worklist.push(callee);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Code;
    use crate::parser::Parser;
    use crate::source::MemoryLoader;

    fn parse(source: &str) -> Program {
        let loader = MemoryLoader::new().with_file("main", source);
        Parser::new(&loader)
            .without_prelude()
            .parse("main")
            .unwrap_or_else(|errs| panic!("parse failed: {:?}", errs))
    }

    fn check(source: &str) -> Result<Program, ValidationError> {
        let mut program = parse(source);
        validate(&mut program)?;
        Ok(program)
    }

    fn check_err(source: &str) -> ValidationError {
        match check(source) {
            Ok(_) => panic!("expected a validation error for {:?}", source),
            Err(err) => err,
        }
    }

    fn function<'p>(program: &'p Program, name: &str) -> &'p Function {
        program.functions.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn test_straight_line_main() {
        let program = check("fn main ( 1 2 + drop )").unwrap();
        assert!(program.main().unwrap().called);
    }

    #[test]
    fn test_overload_chosen_by_stack_top() {
        let program =
            check("fn* f int ( drop ) fn* f ptr ( drop ) var m 8 fn main ( m f 1 f )").unwrap();
        let main = function(&program, "main");
        assert_eq!(main.code[1].op, Op::Call(1));
        assert_eq!(main.code[3].op, Op::Call(0));
    }

    #[test]
    fn test_first_matching_overload_wins() {
        let program = check("fn* g any ( drop ) fn* g int ( drop ) fn main ( 1 g )").unwrap();
        assert_eq!(function(&program, "main").code[1].op, Op::Call(0));
    }

    #[test]
    fn test_no_overload_lists_candidates() {
        let err = check_err("fn* f int ( drop ) fn* f ptr ( drop ) fn main ( true f )");
        assert_eq!(err.message(), "no overload of 'f' matches the stack [bool]");
        assert_eq!(err.hint().unwrap(), "candidates are: f int; f ptr");
    }

    #[test]
    fn test_single_candidate_is_checked() {
        let err = check_err("fn f int ( drop ) fn main ( true f )");
        assert!(err.message().contains("argument mismatch calling 'f'"));

        let err = check_err("fn f int int ( drop drop ) fn main ( 1 f )");
        assert!(err.message().contains("stack underflow: 'f' needs 2"));
    }

    #[test]
    fn test_words_are_resolved_once() {
        let mut program = parse("fn helper ( ) fn main ( helper )");
        validate(&mut program).unwrap();
        let first = program.functions[1].code.clone();
        validate(&mut program).unwrap();
        assert_eq!(program.functions[1].code, first);
        assert_eq!(first[0].op, Op::Call(0));
    }

    #[test]
    fn test_if_that_pushes_fails_on_size() {
        let err = check_err("fn main ( true if ( 1 ) )");
        assert!(matches!(err, ValidationError::SizeChanged { .. }));
        assert_eq!(err.message(), "stack size changed in the 'if' branch");
    }

    #[test]
    fn test_if_that_changes_a_kind_fails_on_types() {
        let err = check_err("fn main ( 1 true if ( drop 'a' ) drop )");
        assert!(matches!(err, ValidationError::TypesChanged { .. }));
        assert_eq!(err.hint().unwrap(), "expected [int], found [byte]");
    }

    #[test]
    fn test_else_branch_restarts_from_snapshot() {
        assert!(check("fn main ( 1 true if ( drop 2 else 3 + ) drop )").is_ok());

        let err = check_err("fn main ( 1 true if ( drop 2 else drop ) drop )");
        assert_eq!(err.message(), "stack size changed in the 'else' branch");
    }

    #[test]
    fn test_loops_must_balance() {
        assert!(check("fn main ( 0 loop dup 10 < ( 1 + ) drop )").is_ok());

        let err = check_err("fn main ( 0 loop dup 10 < ( dup ) drop )");
        assert_eq!(err.message(), "stack size changed by the loop body");

        let err = check_err("fn main ( loop 1 true ( ) drop )");
        assert_eq!(err.message(), "stack size changed by the loop condition");
    }

    #[test]
    fn test_mutating_a_balanced_body_fails() {
        let source = "fn main ( 1 true if ( drop 2 ) drop )";
        assert!(check(source).is_ok());

        // one extra value in the branch
        let mut program = parse(source);
        let main = &mut program.functions[0];
        let loc = main.code[5].loc.clone();
        main.code.insert(5, Code::new(loc, Op::PushInt(9)));
        for code in main.code.iter_mut() {
            if let Op::Do(target) = &mut code.op {
                *target += 1;
            }
        }
        assert!(matches!(
            validate(&mut program),
            Err(ValidationError::SizeChanged { .. })
        ));

        // same depth, different kind
        let mut program = parse(source);
        assert_eq!(program.functions[0].code[5].op, Op::PushInt(2));
        program.functions[0].code[5].op = Op::PushBool(false);
        assert!(matches!(
            validate(&mut program),
            Err(ValidationError::TypesChanged { .. })
        ));
    }

    #[test]
    fn test_not_explicitly_returned() {
        let err = check_err("fn f -> int ( ) fn main ( f drop )");
        assert!(err.message().contains("function 'f' is not explicitly returned"));
    }

    #[test]
    fn test_too_many_values() {
        let err = check_err("fn f ( 1 ) fn main ( f )");
        assert!(err.message().contains("too many values"));
    }

    #[test]
    fn test_return_kind_mismatch() {
        let err = check_err("fn f -> int ( true ) fn main ( f drop )");
        assert_eq!(err.message(), "function 'f' returns bool where int is declared");
    }

    #[test]
    fn test_main_takes_nothing() {
        let err = check_err("fn main int ( drop )");
        assert!(err.message().contains("'main' must not take or return values"));
    }

    #[test]
    fn test_missing_main() {
        let err = check_err("fn f ( )");
        assert_eq!(err, ValidationError::MissingMain);
    }

    #[test]
    fn test_underflow_and_overflow() {
        let err = check_err("fn main ( drop )");
        assert!(err.message().starts_with("stack underflow: 'drop' needs 1"));

        let pushes = "1 ".repeat(STACK_LIMIT + 1);
        let err = check_err(&format!("fn main ( {} )", pushes));
        assert!(err.message().contains("stack overflow"));
    }

    #[test]
    fn test_type_parameters_flow_through_calls() {
        let generic = "fn 2dup $a $b -> $a $b $a $b ( over over )";
        assert!(check(&format!("{} fn main ( 1 true 2dup not drop drop not drop drop )", generic)).is_ok());

        let err = check_err(&format!("{} fn main ( 1 true 2dup + drop drop drop )", generic));
        assert_eq!(err.message(), "'+' expects [any int], found [int bool]");
    }

    #[test]
    fn test_repeated_parameter_must_agree() {
        let err = check_err("fn same $a $a ( drop drop ) fn main ( 1 true same )");
        assert!(err.message().contains("argument mismatch calling 'same'"));
    }

    #[test]
    fn test_bindings_are_typed() {
        let program = check("fn main ( 1 true let n b in b not drop n 1 + drop )").unwrap();
        let kinds: Vec<Kind> = program.functions[0]
            .bindings
            .iter()
            .map(|b| b.kind.clone())
            .collect();
        assert_eq!(kinds, vec![Kind::Int, Kind::Bool]);
    }

    #[test]
    fn test_let_inside_a_block_is_rejected() {
        let err = check_err("fn main ( 0 loop dup 3 < ( dup let x in 1 + ) drop )");
        assert_eq!(err.message(), "'let' inside 'loop' is not supported");
        assert_eq!(err.loc().map(|l| l.col), Some(32));

        let err = check_err("fn main ( 1 true if ( dup let x in ) drop )");
        assert_eq!(err.message(), "'let' inside 'if' is not supported");
        assert!(err.hint().unwrap().contains("move the 'let' before the block"));
    }

    #[test]
    fn test_binding_read_inside_a_block() {
        let source = "fn main ( 3 let n in 0 loop dup n < ( 1 + ) drop n true if ( 1 + ) drop )";
        assert!(check(source).is_ok());
    }

    #[test]
    fn test_call_to_missing_entry_is_internal() {
        let mut program = parse("fn helper ( ) fn main ( helper )");
        program.functions[1].code[0].op = Op::Call(7);
        let err = validate(&mut program).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.message(), "call to missing function fn7");
    }

    #[test]
    fn test_memory_opcodes() {
        assert!(check("var cell 8 fn main ( 5 cell store cell load drop )").is_ok());
        assert!(check("var buf 4 fn main ( 'x' buf 0 store8 buf 0 load8 drop )").is_ok());
        assert!(check("fn main ( 65 cast byte drop )").is_ok());

        let err = check_err("fn main ( 1 load drop )");
        assert_eq!(err.message(), "'load' expects [ptr], found [int]");
    }

    #[test]
    fn test_syscall_takes_number_on_top() {
        assert!(check("fn main ( 0 60 syscall1 drop )").is_ok());

        let err = check_err("fn main ( 0 true syscall1 drop )");
        assert_eq!(err.message(), "'syscall1' expects [... int], found [int bool]");
    }

    #[test]
    fn test_unused_user_function_warns() {
        let mut program = parse("fn helper ( ) fn main ( )");
        let warnings = validate(&mut program).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "function 'helper' is never called");
        assert_eq!(warnings[0].loc.as_ref().map(|l| l.line), Some(1));
        assert!(!program.functions[0].called);
    }

    #[test]
    fn test_unused_library_functions_are_silent() {
        let loader = MemoryLoader::new().with_file("main", "fn main ( )");
        let mut program = Parser::new(&loader).parse("main").unwrap();
        let warnings = validate(&mut program).unwrap();
        assert!(warnings.is_empty());
        assert!(program.functions.iter().filter(|f| f.internal).all(|f| !f.called));
    }

    #[test]
    fn test_prelude_print_resolves_by_kind() {
        let loader = MemoryLoader::new().with_file("main", "fn main ( 42 print \"hi\" print newline )");
        let mut program = Parser::new(&loader).parse("main").unwrap();
        validate(&mut program).unwrap();

        let main = program.main().unwrap();
        let callees: Vec<String> = main
            .code
            .iter()
            .filter_map(|c| match c.op {
                Op::Call(e) => Some(program.functions[e].signature()),
                _ => None,
            })
            .collect();
        assert_eq!(callees, vec!["print int", "print str", "newline"]);
    }

    #[test]
    fn test_reachability_is_a_fixed_point() {
        let mut program = check("fn a ( b ) fn b ( ) fn c ( a ) fn main ( a )").unwrap();
        let first: Vec<bool> = program.functions.iter().map(|f| f.called).collect();
        assert_eq!(first, vec![true, true, false, true]);

        mark_reachable(&mut program, 3);
        let second: Vec<bool> = program.functions.iter().map(|f| f.called).collect();
        assert_eq!(first, second);
    }
}
