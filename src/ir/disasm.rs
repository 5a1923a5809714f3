use std::fmt::Write;

use crate::ir::{Function, Op, Program};

/// Render a textual listing of every function in the program.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    out.push_str("=== IR PROGRAM ===\n\n");

    for (i, memory) in program.memories.iter().enumerate() {
        let _ = writeln!(out, "mem_{:<4} {:<16} {} bytes", i, memory.name, memory.size);
    }
    for (i, s) in program.strings.iter().enumerate() {
        let _ = writeln!(out, "str_{:<4} {:?}", i, s);
    }
    if !program.memories.is_empty() || !program.strings.is_empty() {
        out.push('\n');
    }

    for function in &program.functions {
        disassemble_function(function, program, &mut out);
    }
    out
}

fn disassemble_function(function: &Function, program: &Program, out: &mut String) {
    let mut flags = Vec::new();
    if function.polymorphic {
        flags.push("poly");
    }
    if function.internal {
        flags.push("internal");
    }
    if !function.called {
        flags.push("dead");
    }

    out.push_str("════════════════════════════════════════\n");
    let _ = writeln!(out, " fn{} {}", function.entry, function.signature());
    let _ = writeln!(
        out,
        " {} instructions{}",
        function.code.len(),
        if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        }
    );
    out.push_str("════════════════════════════════════════\n");

    let jump_targets = collect_jump_targets(function);
    for (ip, code) in function.code.iter().enumerate() {
        let marker = if jump_targets.contains(&ip) { "► " } else { "  " };
        let _ = writeln!(out, "{:04} {}{}", ip, marker, format_op(&code.op, ip, function, program));
    }
    out.push('\n');
}

fn collect_jump_targets(function: &Function) -> Vec<usize> {
    let mut targets = Vec::new();
    for code in &function.code {
        if let Some(target) = code.op.jump_target()
            && !targets.contains(&target)
        {
            targets.push(target);
        }
    }
    targets
}

fn format_op(op: &Op, ip: usize, function: &Function, program: &Program) -> String {
    match op {
        // Literals
        Op::PushInt(n) => format!("PUSH_INT    {}", n),
        Op::PushBool(b) => format!("PUSH_BOOL   {}", b),
        Op::PushChar(c) => format!("PUSH_CHAR   {:?}", *c as char),
        Op::PushStr(i) => match program.strings.get(*i) {
            Some(s) => format!("PUSH_STR    str_{} ; {:?}", i, s),
            None => format!("PUSH_STR    str_{}", i),
        },
        Op::PushPtr(i) => match program.memories.get(*i) {
            Some(m) => format!("PUSH_PTR    mem_{} ; {}", i, m.name),
            None => format!("PUSH_PTR    mem_{}", i),
        },
        Op::PushBind(i) => match function.bindings.get(*i) {
            Some(b) => format!("PUSH_BIND   {} ; {} : {}", i, b.name, b.kind),
            None => format!("PUSH_BIND   {}", i),
        },

        // Arithmetic
        Op::Add => "ADD".to_string(),
        Op::Sub => "SUB".to_string(),
        Op::Mul => "MUL".to_string(),
        Op::Div => "DIV".to_string(),
        Op::Mod => "MOD".to_string(),

        // Comparison
        Op::Eq => "EQ".to_string(),
        Op::Ne => "NE".to_string(),
        Op::Lt => "LT".to_string(),
        Op::Gt => "GT".to_string(),
        Op::Le => "LE".to_string(),
        Op::Ge => "GE".to_string(),

        // Logic
        Op::And => "AND".to_string(),
        Op::Or => "OR".to_string(),
        Op::Not => "NOT".to_string(),

        // Stack operations
        Op::Dup => "DUP".to_string(),
        Op::Drop => "DROP".to_string(),
        Op::Swap => "SWAP".to_string(),
        Op::Over => "OVER".to_string(),
        Op::Rot => "ROT".to_string(),

        // Memory
        Op::Load => "LOAD        ; ( ptr -- int )".to_string(),
        Op::Load8 => "LOAD8       ; ( ptr int -- byte )".to_string(),
        Op::Store => "STORE       ; ( any ptr -- )".to_string(),
        Op::Store8 => "STORE8      ; ( any ptr int -- )".to_string(),
        Op::Cast(kind) => format!("CAST        {}", kind),
        Op::Syscall(n) => format!("SYSCALL     {}", n),

        // Control flow
        Op::If => "IF".to_string(),
        Op::Loop => "LOOP".to_string(),
        Op::Do(target) => format!("DO          {}", describe_jump(ip, *target)),
        Op::Else(target) => format!("ELSE        {}", describe_jump(ip, *target)),
        Op::Jump(target) => format!("JUMP        {}", describe_jump(ip, *target)),
        Op::EndIf => "END_IF".to_string(),
        Op::EndLoop => "END_LOOP".to_string(),

        // Bindings
        Op::Bind(n) => format!("BIND        {}", n),
        Op::Unbind(n) => format!("UNBIND      {}", n),

        // Calls
        Op::Word(name) => format!("WORD        \"{}\"", name),
        Op::Call(entry) => match program.functions.get(*entry) {
            Some(f) => format!("CALL        fn{} ; {}", entry, f.signature()),
            None => format!("CALL        fn{}", entry),
        },
    }
}

fn describe_jump(ip: usize, target: usize) -> String {
    let direction = if target <= ip { "↑" } else { "↓" };
    format!("{} (→ {:04})", direction, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Code;
    use crate::lexer::Location;

    fn sample() -> Program {
        let loc = Location::new("t.cin".into(), 1, 1);
        let mut main = Function::new("main".to_string(), 0, loc.clone());
        main.called = true;
        for op in [
            Op::Loop,
            Op::PushBool(true),
            Op::Do(4),
            Op::Jump(0),
            Op::EndLoop,
        ] {
            main.code.push(Code::new(loc.clone(), op));
        }
        let mut program = Program::new();
        program.functions.push(main);
        program
    }

    #[test]
    fn test_listing_marks_jump_targets() {
        let text = disassemble(&sample());
        assert!(text.contains(" fn0 main"));
        assert!(text.contains("0000 ► LOOP"));
        assert!(text.contains("0004 ► END_LOOP"));
        assert!(text.contains("DO          ↓ (→ 0004)"));
        assert!(text.contains("JUMP        ↑ (→ 0000)"));
    }

    #[test]
    fn test_listing_flags_dead_functions() {
        let mut program = sample();
        program.functions[0].called = false;
        let text = disassemble(&program);
        assert!(text.contains("[dead]"));
    }
}
