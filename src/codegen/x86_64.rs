//! x86-64 Linux lowering.
//!
//! Two stacks are live at all times:
//!
//! - `rsp` is the operand stack the program computes on,
//! - `rbp` points into `ret_stack`, which holds return addresses and the
//!   slots of `let` bindings.
//!
//! Around a call the two are swapped so `call`/`ret` work on the return
//! stack, and the caller's operand stack pointer travels in `rax`:
//!
//! ```text
//! caller                     callee
//!   mov rax, rsp               mov rbp, rsp    ; [rbp] = return address
//!   mov rsp, rbp               mov rsp, rax
//!   call fnN                   ...
//!   mov rbp, rsp               mov rax, rsp
//!   mov rsp, rax               mov rsp, rbp
//!                              ret
//! ```

use crate::codegen::{Assembly, CodegenError};
use crate::ir::{Code, Function, Op, Program};

/// Size of the return/binding stack in bytes.
pub const RET_STACK_SIZE: usize = 64 * 1024;

/// Argument registers of the Linux syscall ABI, in order.
const SYSCALL_ARGS: [&str; 6] = ["rdi", "rsi", "rdx", "r10", "r8", "r9"];

pub struct Generator<'p> {
    program: &'p Program,
    asm: Assembly,
    /// `let` slots live at the current point of the function being lowered.
    bound: usize,
}

impl<'p> Generator<'p> {
    pub fn new(program: &'p Program) -> Self {
        Generator {
            program,
            asm: Assembly::default(),
            bound: 0,
        }
    }

    pub fn lower(mut self) -> Result<Assembly, CodegenError> {
        let program = self.program;
        let main = program
            .main()
            .ok_or_else(|| CodegenError::internal("program has no 'main'"))?;
        if !main.called {
            return Err(CodegenError::internal("'main' is not marked as called"));
        }

        self.entry_point(main.entry);
        for function in &program.functions {
            if function.called {
                self.function(function)?;
            }
        }
        self.data();
        self.bss();

        Ok(self.asm)
    }

    fn line(&mut self, text: &str) {
        self.asm.text.push_str(text);
        self.asm.text.push('\n');
    }

    fn ins(&mut self, text: &str) {
        self.asm.text.push_str("    ");
        self.line(text);
    }

    // =========================================================================
    // Program structure
    // =========================================================================

    fn entry_point(&mut self, main: usize) {
        self.line("global _start");
        self.line("_start:");
        self.ins("mov rbp, ret_stack_end");
        self.ins("mov rax, rsp");
        self.ins("mov rsp, rbp");
        self.ins(&format!("call fn{}", main));
        self.ins("mov rax, 60");
        self.ins("xor rdi, rdi");
        self.ins("syscall");
    }

    fn function(&mut self, function: &Function) -> Result<(), CodegenError> {
        self.bound = 0;

        self.line("");
        self.line(&format!("; {}", function.signature()));
        self.line(&format!("fn{}:", function.entry));
        self.ins("mov rbp, rsp");
        self.ins("mov rsp, rax");

        for (ip, code) in function.code.iter().enumerate() {
            self.line(&format!(".ip{}: ; {}", ip, code.op.name()));
            self.instruction(code)?;
        }

        self.ins("mov rax, rsp");
        self.ins("mov rsp, rbp");
        self.ins("ret");
        Ok(())
    }

    fn data(&mut self) {
        for (i, s) in self.program.strings.iter().enumerate() {
            self.asm.data.push_str(&format!("str_{}: dq {}\n", i, s.len()));
            if !s.is_empty() {
                let bytes: Vec<String> = s.bytes().map(|b| b.to_string()).collect();
                self.asm.data.push_str(&format!("    db {}\n", bytes.join(", ")));
            }
        }
    }

    fn bss(&mut self) {
        for (i, memory) in self.program.memories.iter().enumerate() {
            self.asm
                .bss
                .push_str(&format!("mem_{}: resb {} ; {}\n", i, memory.size, memory.name));
        }
        self.asm
            .bss
            .push_str(&format!("ret_stack: resb {}\nret_stack_end:\n", RET_STACK_SIZE));
    }

    // =========================================================================
    // Instructions
    // =========================================================================

    fn instruction(&mut self, code: &Code) -> Result<(), CodegenError> {
        match &code.op {
            // Literals
            Op::PushInt(n) => {
                self.ins(&format!("mov rax, {}", n));
                self.ins("push rax");
            }
            Op::PushBool(b) => self.ins(&format!("push {}", *b as u8)),
            Op::PushChar(c) => self.ins(&format!("push {}", c)),
            Op::PushStr(i) => {
                self.ins(&format!("mov rax, str_{}", i));
                self.ins("push rax");
            }
            Op::PushPtr(i) => {
                self.ins(&format!("mov rax, mem_{}", i));
                self.ins("push rax");
            }
            Op::PushBind(k) => {
                let offset = self.slot_offset(*k)?;
                self.ins(&format!("push qword [rbp + {}]", offset));
            }

            // Arithmetic
            Op::Add => self.binary(&["add rax, rbx"], "rax"),
            Op::Sub => self.binary(&["sub rax, rbx"], "rax"),
            Op::Mul => self.binary(&["imul rax, rbx"], "rax"),
            Op::Div => self.binary(&["cqo", "idiv rbx"], "rax"),
            Op::Mod => self.binary(&["cqo", "idiv rbx"], "rdx"),

            // Comparison
            Op::Eq => self.compare("cmove"),
            Op::Ne => self.compare("cmovne"),
            Op::Lt => self.compare("cmovl"),
            Op::Gt => self.compare("cmovg"),
            Op::Le => self.compare("cmovle"),
            Op::Ge => self.compare("cmovge"),

            // Logic
            Op::And => self.binary(&["and rax, rbx"], "rax"),
            Op::Or => self.binary(&["or rax, rbx"], "rax"),
            Op::Not => {
                self.ins("pop rax");
                self.ins("xor rax, 1");
                self.ins("push rax");
            }

            // Stack operations
            Op::Dup => self.ins("push qword [rsp]"),
            Op::Drop => self.ins("add rsp, 8"),
            Op::Swap => {
                self.ins("pop rbx");
                self.ins("pop rax");
                self.ins("push rbx");
                self.ins("push rax");
            }
            Op::Over => self.ins("push qword [rsp + 8]"),
            Op::Rot => {
                // a b c -> b c a
                self.ins("pop rcx");
                self.ins("pop rbx");
                self.ins("pop rax");
                self.ins("push rbx");
                self.ins("push rcx");
                self.ins("push rax");
            }

            // Memory
            Op::Load => {
                self.ins("pop rax");
                self.ins("mov rax, [rax]");
                self.ins("push rax");
            }
            Op::Load8 => {
                self.ins("pop rcx");
                self.ins("pop rax");
                self.ins("movzx rbx, byte [rax + rcx]");
                self.ins("push rbx");
            }
            Op::Store => {
                self.ins("pop rax");
                self.ins("pop rbx");
                self.ins("mov [rax], rbx");
            }
            Op::Store8 => {
                self.ins("pop rcx");
                self.ins("pop rax");
                self.ins("pop rbx");
                self.ins("mov [rax + rcx], bl");
            }
            Op::Cast(_) => {}
            Op::Syscall(n) => {
                let count = *n as usize;
                if count > SYSCALL_ARGS.len() {
                    return Err(CodegenError::internal(format!("syscall{} has too many arguments", n)));
                }
                self.ins("pop rax");
                for reg in &SYSCALL_ARGS[..count] {
                    self.ins(&format!("pop {}", reg));
                }
                self.ins("syscall");
                self.ins("push rax");
            }

            // Control flow
            Op::If | Op::Loop | Op::EndIf | Op::EndLoop => {}
            Op::Do(target) => {
                self.ins("pop rax");
                self.ins("test rax, rax");
                self.ins(&format!("jz .ip{}", target));
            }
            Op::Else(target) | Op::Jump(target) => self.ins(&format!("jmp .ip{}", target)),

            // Bindings
            Op::Bind(n) => {
                self.ins(&format!("sub rbp, {}", 8 * n));
                for slot in 0..*n {
                    self.ins("pop rax");
                    self.ins(&format!("mov [rbp + {}], rax", 8 * slot));
                }
                self.bound += n;
            }
            Op::Unbind(n) => {
                self.ins(&format!("add rbp, {}", 8 * n));
                self.bound = self.bound.saturating_sub(*n);
            }

            // Calls
            Op::Call(entry) => {
                let program = self.program;
                let callee = program.functions.get(*entry).ok_or_else(|| {
                    CodegenError::internal(format!("call to missing function fn{}", entry))
                })?;
                if !callee.called {
                    return Err(CodegenError::internal(format!(
                        "call to '{}' which is not marked as called",
                        callee.name
                    )));
                }
                self.ins("mov rax, rsp");
                self.ins("mov rsp, rbp");
                self.ins(&format!("call fn{}", entry));
                self.ins("mov rbp, rsp");
                self.ins("mov rsp, rax");
            }
            Op::Word(name) => return Err(CodegenError::unresolved_word(&code.loc, name)),
        }
        Ok(())
    }

    /// Pops `rbx` (top) and `rax`, runs `body`, pushes `result`.
    fn binary(&mut self, body: &[&str], result: &str) {
        self.ins("pop rbx");
        self.ins("pop rax");
        for text in body {
            self.ins(text);
        }
        self.ins(&format!("push {}", result));
    }

    fn compare(&mut self, cmov: &str) {
        self.ins("pop rbx");
        self.ins("pop rax");
        self.ins("xor rcx, rcx");
        self.ins("mov rdx, 1");
        self.ins("cmp rax, rbx");
        self.ins(&format!("{} rcx, rdx", cmov));
        self.ins("push rcx");
    }

    /// Byte offset of binding `k` from `rbp`; the newest slot is at `[rbp]`.
    fn slot_offset(&self, k: usize) -> Result<usize, CodegenError> {
        if k >= self.bound {
            return Err(CodegenError::internal(format!(
                "binding {} read with only {} slot(s) live",
                k, self.bound
            )));
        }
        Ok(8 * (self.bound - k - 1))
    }
}
