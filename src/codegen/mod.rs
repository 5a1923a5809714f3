//! # Code generation
//!
//! Lowers a validated program to NASM assembly. Output is split into the
//! three sections the assembler expects; `Assembly::render` joins them into
//! one file.
//!
//! Only functions marked `called` are emitted, and every `Word` must have
//! been rewritten to a `Call` by the validator.

pub mod codegen_error;
pub mod x86_64;

use crate::ir::Program;

pub use codegen_error::CodegenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    X86_64Linux,
}

impl Target {
    /// The target matching the machine running the compiler.
    pub fn host() -> Result<Target, CodegenError> {
        if cfg!(all(target_arch = "x86_64", target_os = "linux")) {
            Ok(Target::X86_64Linux)
        } else {
            Err(CodegenError::unsupported_platform(
                std::env::consts::OS,
                std::env::consts::ARCH,
            ))
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::X86_64Linux => write!(f, "x86_64-linux"),
        }
    }
}

/// Generated assembly, one string per section (without section headers).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    pub text: String,
    pub data: String,
    pub bss: String,
}

impl Assembly {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("; generated by cinder\n");
        out.push_str("bits 64\n\n");
        out.push_str("section .text\n");
        out.push_str(&self.text);
        out.push_str("\nsection .data\n");
        out.push_str(&self.data);
        out.push_str("\nsection .bss\n");
        out.push_str(&self.bss);
        out
    }
}

pub fn generate(program: &Program, target: Target) -> Result<Assembly, CodegenError> {
    match target {
        Target::X86_64Linux => x86_64::Generator::new(program).lower(),
    }
}
