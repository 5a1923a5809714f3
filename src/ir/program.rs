use serde::{Deserialize, Serialize};

use crate::ir::{Code, Kind};
use crate::lexer::Location;

/// The whole compilation unit: every function from every included file,
/// plus the program-scope memories, constants and string literals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    /// Convention: `functions[i].entry == i`.
    pub functions: Vec<Function>,
    pub memories: Vec<Memory>,
    pub constants: Vec<Constant>,
    pub strings: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main(&self) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == "main")
    }

    /// Entries of every function declared under `name`, in declaration order.
    pub fn candidates(&self, name: &str) -> Vec<usize> {
        self.functions
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.entry)
            .collect()
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }

    pub fn memory(&self, name: &str) -> Option<usize> {
        self.memories.iter().position(|m| m.name == name)
    }

    /// Returns the index of `s` in the string table, adding it if needed.
    pub fn intern_string(&mut self, s: &str) -> usize {
        if let Some(index) = self.strings.iter().position(|existing| existing == s) {
            return index;
        }
        self.strings.push(s.to_string());
        self.strings.len() - 1
    }

    /// Encodes the program with postcard (used by `--emit-ir`).
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// One compiled function ("chunk").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub entry: usize,
    pub loc: Location,
    pub args: Vec<Kind>,
    pub rets: Vec<Kind>,
    /// Declared with `fn*`.
    pub polymorphic: bool,
    /// Comes from the embedded library rather than user code.
    pub internal: bool,
    /// Set by the reachability pass.
    pub called: bool,
    pub code: Vec<Code>,
    pub bindings: Vec<Binding>,
}

impl Function {
    pub fn new(name: String, entry: usize, loc: Location) -> Self {
        Function {
            name,
            entry,
            loc,
            args: Vec::new(),
            rets: Vec::new(),
            polymorphic: false,
            internal: false,
            called: false,
            code: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// `name int ptr -> bool`, as written in a declaration.
    pub fn signature(&self) -> String {
        let mut out = self.name.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string());
        }
        if !self.rets.is_empty() {
            out.push_str(" ->");
            for ret in &self.rets {
                out.push(' ');
                out.push_str(&ret.to_string());
            }
        }
        out
    }
}

/// A `let` slot. `kind` stays `Kind::None` until the validator types it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub index: usize,
    pub kind: Kind,
}

/// A zero-initialized region reserved with `var`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub name: String,
    pub size: usize,
    pub loc: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: i64,
    pub loc: Location,
}
