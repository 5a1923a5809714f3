//! The `cinder` command line.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use cinder::codegen::{self, Target};
use cinder::error::{CompileError, exit};
use cinder::ir::disasm::disassemble;
use cinder::lexer::Lexer;
use cinder::parser_error::ParserError;
use cinder::source::{EXTENSION, FsLoader, SourceLoader};
use cinder::token_dumper::TokenDumper;
use cinder::{Options, validate};

#[derive(Parser)]
#[command(name = "cinder")]
#[command(version = cinder::VERSION)]
#[command(about = "Compiles Cinder programs to x86-64 Linux assembly (NASM)", long_about = None)]
struct Cli {
    /// Program to compile
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Assembly output (defaults to FILE with an .asm extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Stop after validation
    #[arg(long)]
    check: bool,

    /// Print the token stream of FILE and exit
    #[arg(long)]
    tokens: bool,

    /// With --tokens: print tokens as spelled instead of their debug form
    #[arg(long)]
    pretty: bool,

    /// With --tokens: no ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Print the validated IR
    #[arg(long)]
    dump_ir: bool,

    /// Write the validated IR (postcard) to FILE
    #[arg(long, value_name = "FILE")]
    emit_ir: Option<PathBuf>,

    /// Do not compile the built-in library
    #[arg(long)]
    no_prelude: bool,

    /// Extra directory searched by `using`
    #[arg(long, value_name = "DIR", env = "CINDER_LIB")]
    lib_dir: Option<PathBuf>,

    /// Report progress of each stage on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    if cli.input.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
        eprintln!(
            "cinder: error: expected a .{} file, got {}",
            EXTENSION,
            cli.input.display()
        );
        return exit::USAGE;
    }

    let result = if cli.tokens { dump_tokens(cli) } else { build(cli) };

    match result {
        Ok(()) => exit::SUCCESS,
        Err(err) => {
            for diagnostic in err.diagnostics() {
                eprintln!("{}", diagnostic);
            }
            err.exit_code()
        }
    }
}

fn note(cli: &Cli, message: impl AsRef<str>) {
    if cli.verbose {
        eprintln!("cinder: {}", message.as_ref());
    }
}

fn dump_tokens(cli: &Cli) -> Result<(), CompileError> {
    let loader = FsLoader::new(cli.lib_dir.clone());
    let id = loader.resolve(&cli.input.to_string_lossy(), None)?;
    let text = loader.load(&id)?;

    let mut lexer = Lexer::new(id.0.as_str(), &text);
    let tokens = lexer
        .tokenize()
        .map_err(|errors| CompileError::Parse(errors.into_iter().map(ParserError::from).collect()))?;

    let mut dumper = TokenDumper::new();
    if cli.no_color {
        dumper = dumper.no_color();
    }
    if cli.pretty {
        dumper = dumper.pretty();
    }
    dumper.dump(&tokens);
    Ok(())
}

fn build(cli: &Cli) -> Result<(), CompileError> {
    // fail before doing any work on an unsupported host
    let target = if cli.check { None } else { Some(Target::host()?) };

    let loader = FsLoader::new(cli.lib_dir.clone());
    let options = Options {
        prelude: !cli.no_prelude,
        target,
    };
    let entry = cli.input.to_string_lossy();

    note(cli, format!("parsing {}", entry));
    let mut program = cinder::parse(&loader, &entry, &options)?;
    note(
        cli,
        format!(
            "parsed {} function(s), {} memory region(s), {} string(s)",
            program.functions.len(),
            program.memories.len(),
            program.strings.len()
        ),
    );

    let warnings = validate::validate(&mut program)?;
    for warning in &warnings {
        eprintln!("{}", warning);
    }
    note(
        cli,
        format!(
            "validated; {} of {} function(s) reachable from main",
            program.functions.iter().filter(|f| f.called).count(),
            program.functions.len()
        ),
    );

    if cli.dump_ir {
        print!("{}", disassemble(&program));
    }
    if let Some(path) = &cli.emit_ir {
        let bytes = program
            .to_bytes()
            .map_err(|e| CompileError::Internal(format!("cannot encode IR: {}", e)))?;
        write_file(path, &bytes)?;
        note(cli, format!("wrote IR to {}", path.display()));
    }

    let Some(target) = target else {
        return Ok(());
    };

    let assembly = codegen::generate(&program, target)?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("asm"));
    write_file(&output, assembly.render().as_bytes())?;
    note(cli, format!("wrote {} for {}", output.display(), target));

    let object = output.with_extension("o");
    let executable = output.with_extension("");
    println!("nasm -f elf64 -o {} {}", object.display(), output.display());
    println!("ld -o {} {}", executable.display(), object.display());
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CompileError> {
    fs::write(path, bytes)
        .map_err(|e| CompileError::Internal(format!("cannot write '{}': {}", path.display(), e)))
}
