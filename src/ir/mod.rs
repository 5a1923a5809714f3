//! # Cinder intermediate representation
//!
//! One representation flows through every stage: the parser builds it, the
//! validator types and resolves it in place, and the code generator lowers it.
//!
//! ## Lifecycle of an instruction
//!
//! - Jump targets (`Do`, `Else`, `Jump`) are patched once by the parser when
//!   the enclosing `)` or `else` is seen.
//! - `Word(name)` is rewritten to `Call(entry)` once by the validator.
//! - The code generator only reads.

pub mod disasm;
pub mod kind;
pub mod op;
pub mod program;

pub use kind::Kind;
pub use op::{Code, Op};
pub use program::{Binding, Constant, Function, Memory, Program};
