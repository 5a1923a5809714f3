#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Str(std::string::String),
    Char(u8),
    Bool(bool),

    /// Parametric type name: `$a`
    Param(std::string::String),

    // Stack operations
    Dup,
    Drop,
    Swap,
    Over,
    Rot,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Logic
    And,
    Or,
    Not,

    // Memory
    Load,
    Load8,
    Store,
    Store8,
    Cast,
    Syscall(u8),

    // Control flow
    If,
    Else,
    Loop,
    Let,
    In,

    // Declarations
    Fn,
    FnPoly,
    Const,
    Var,
    Using,

    // Type names
    TyInt,
    TyBool,
    TyByte,
    TyPtr,
    TyStr,
    TyAny,

    // Delimiters
    LParen, // (
    RParen, // )
    Arrow,  // ->

    // Identifier (user-defined word, binding, constant or memory)
    Ident(std::string::String),

    Eof,
}

impl Token {
    /// Maps a run of non-space characters onto a reserved word, if it is one.
    pub fn reserved(word: &str) -> Option<Token> {
        let token = match word {
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),

            "dup" => Token::Dup,
            "drop" => Token::Drop,
            "swap" => Token::Swap,
            "over" => Token::Over,
            "rot" => Token::Rot,

            "+" => Token::Plus,
            "-" => Token::Minus,
            "*" => Token::Star,
            "/" => Token::Slash,
            "%" => Token::Percent,

            "=" => Token::Eq,
            "!=" => Token::NotEq,
            "<" => Token::Lt,
            ">" => Token::Gt,
            "<=" => Token::LtEq,
            ">=" => Token::GtEq,

            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,

            "load" => Token::Load,
            "load8" => Token::Load8,
            "store" => Token::Store,
            "store8" => Token::Store8,
            "cast" => Token::Cast,
            "syscall0" => Token::Syscall(0),
            "syscall1" => Token::Syscall(1),
            "syscall2" => Token::Syscall(2),
            "syscall3" => Token::Syscall(3),
            "syscall4" => Token::Syscall(4),
            "syscall5" => Token::Syscall(5),
            "syscall6" => Token::Syscall(6),

            "if" => Token::If,
            "else" => Token::Else,
            "loop" => Token::Loop,
            "let" => Token::Let,
            "in" => Token::In,

            "fn" => Token::Fn,
            "fn*" => Token::FnPoly,
            "const" => Token::Const,
            "var" => Token::Var,
            "using" => Token::Using,

            "int" => Token::TyInt,
            "bool" => Token::TyBool,
            "byte" => Token::TyByte,
            "ptr" => Token::TyPtr,
            "str" => Token::TyStr,
            "any" => Token::TyAny,

            "->" => Token::Arrow,

            _ => return None,
        };
        Some(token)
    }

    /// Returns true if this token starts a top-level declaration.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Token::Fn | Token::FnPoly | Token::Const | Token::Var | Token::Using
        )
    }

    /// Returns true if this token names a type in a signature or `cast`.
    pub fn is_type_name(&self) -> bool {
        matches!(
            self,
            Token::TyInt
                | Token::TyBool
                | Token::TyByte
                | Token::TyPtr
                | Token::TyStr
                | Token::TyAny
                | Token::Param(_)
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "{:?}", s),
            Token::Char(c) => write!(f, "{:?}", *c as char),
            Token::Bool(b) => write!(f, "{}", b),
            Token::Param(name) => write!(f, "${}", name),
            Token::Dup => write!(f, "dup"),
            Token::Drop => write!(f, "drop"),
            Token::Swap => write!(f, "swap"),
            Token::Over => write!(f, "over"),
            Token::Rot => write!(f, "rot"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Eq => write!(f, "="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::Load => write!(f, "load"),
            Token::Load8 => write!(f, "load8"),
            Token::Store => write!(f, "store"),
            Token::Store8 => write!(f, "store8"),
            Token::Cast => write!(f, "cast"),
            Token::Syscall(n) => write!(f, "syscall{}", n),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::Loop => write!(f, "loop"),
            Token::Let => write!(f, "let"),
            Token::In => write!(f, "in"),
            Token::Fn => write!(f, "fn"),
            Token::FnPoly => write!(f, "fn*"),
            Token::Const => write!(f, "const"),
            Token::Var => write!(f, "var"),
            Token::Using => write!(f, "using"),
            Token::TyInt => write!(f, "int"),
            Token::TyBool => write!(f, "bool"),
            Token::TyByte => write!(f, "byte"),
            Token::TyPtr => write!(f, "ptr"),
            Token::TyStr => write!(f, "str"),
            Token::TyAny => write!(f, "any"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Arrow => write!(f, "->"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Eof => write!(f, "EOF"),
        }
    }
}
