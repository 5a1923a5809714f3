//! # Cinder
//!
//! An ahead-of-time compiler for a small stack language, producing NASM
//! assembly for x86-64 Linux.
//!
//! ```text
//! source ──► lexer ──► parser ──► validator ──► codegen ──► .asm
//!                         │            │
//!                   `using` queue   Word → Call, kinds checked,
//!                                   dead functions marked
//! ```
//!
//! Every stage finishes before the next starts. Parse errors are collected
//! and reported together; validation and code generation stop at the first
//! error.

pub mod codegen;
pub mod diagnostic;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod source;
pub mod token;
pub mod token_dumper;
pub mod validate;

use codegen::{Assembly, Target};
use diagnostic::Diagnostic;
use error::CompileError;
use ir::Program;
use source::{MemoryLoader, SourceLoader};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone)]
pub struct Options {
    /// Compile the embedded library ahead of the program.
    pub prelude: bool,
    /// `None` selects the host.
    pub target: Option<Target>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            prelude: true,
            target: None,
        }
    }
}

/// Result of a successful compilation.
#[derive(Debug)]
pub struct Output {
    pub assembly: Assembly,
    /// The validated program the assembly was generated from.
    pub program: Program,
    pub warnings: Vec<Diagnostic>,
}

/// Parses `entry` and every file it pulls in.
pub fn parse(loader: &dyn SourceLoader, entry: &str, options: &Options) -> Result<Program, CompileError> {
    let mut parser = parser::Parser::new(loader);
    if !options.prelude {
        parser = parser.without_prelude();
    }
    Ok(parser.parse(entry)?)
}

/// Parses and validates; returns the program ready for code generation.
pub fn check(
    loader: &dyn SourceLoader,
    entry: &str,
    options: &Options,
) -> Result<(Program, Vec<Diagnostic>), CompileError> {
    let mut program = parse(loader, entry, options)?;
    let warnings = validate::validate(&mut program)?;
    Ok((program, warnings))
}

/// Runs the whole pipeline.
pub fn compile(loader: &dyn SourceLoader, entry: &str, options: &Options) -> Result<Output, CompileError> {
    let target = match options.target {
        Some(target) => target,
        None => Target::host()?,
    };
    let (program, warnings) = check(loader, entry, options)?;
    let assembly = codegen::generate(&program, target)?;
    Ok(Output {
        assembly,
        program,
        warnings,
    })
}

/// Compiles a single in-memory file named `main`.
pub fn compile_source(source: &str, options: &Options) -> Result<Output, CompileError> {
    let loader = MemoryLoader::new().with_file("main", source);
    compile(&loader, "main", options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Options {
        Options {
            prelude: true,
            target: Some(Target::X86_64Linux),
        }
    }

    #[test]
    fn test_compile_source_with_prelude() {
        let output = compile_source("fn main ( \"hello\\n\" print )", &options()).unwrap();
        assert!(output.warnings.is_empty());
        assert!(output.assembly.render().contains("; print str"));
        assert!(output.program.main().unwrap().called);
    }

    #[test]
    fn test_stage_of_first_failure() {
        let err = compile_source("fn main ( ", &options()).unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));

        let err = compile_source("fn main ( 1 )", &options()).unwrap_err();
        assert!(matches!(err, CompileError::Validation(_)));
    }
}
