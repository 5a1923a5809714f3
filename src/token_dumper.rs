use std::fmt::Write;

use crate::lexer::Spanned;
use crate::token::Token;

const RESET: &str = "\x1b[0m";

/// Broad token classes shown in the dump, each with its label and color.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Class {
    Declaration,
    Type,
    Param,
    Paren,
    Arrow,
    Arithmetic,
    Comparison,
    Int,
    Str,
    Char,
    Bool,
    Ident,
    Keyword,
    Eof,
}

impl Class {
    fn of(token: &Token) -> Class {
        match token {
            Token::Fn | Token::FnPoly | Token::Const | Token::Var | Token::Using => Class::Declaration,
            Token::TyInt | Token::TyBool | Token::TyByte | Token::TyPtr | Token::TyStr | Token::TyAny => {
                Class::Type
            }
            Token::Param(_) => Class::Param,
            Token::LParen | Token::RParen => Class::Paren,
            Token::Arrow => Class::Arrow,
            Token::Plus | Token::Minus | Token::Star | Token::Slash | Token::Percent => Class::Arithmetic,
            Token::Eq | Token::NotEq | Token::Lt | Token::LtEq | Token::Gt | Token::GtEq => {
                Class::Comparison
            }
            Token::Int(_) => Class::Int,
            Token::Str(_) => Class::Str,
            Token::Char(_) => Class::Char,
            Token::Bool(_) => Class::Bool,
            Token::Ident(_) => Class::Ident,
            Token::Eof => Class::Eof,
            _ => Class::Keyword,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Class::Declaration => "DECL",
            Class::Type => "TYPE",
            Class::Param => "PARAM",
            Class::Paren => "PAREN",
            Class::Arrow => "ARROW",
            Class::Arithmetic => "OP",
            Class::Comparison => "CMP",
            Class::Int => "INT",
            Class::Str => "STRING",
            Class::Char => "CHAR",
            Class::Bool => "BOOL",
            Class::Ident => "IDENT",
            Class::Keyword => "KEYWORD",
            Class::Eof => "EOF",
        }
    }

    /// ANSI escape, or "" for classes printed plain.
    fn color(self) -> &'static str {
        match self {
            Class::Declaration => "\x1b[34m",
            Class::Type | Class::Param | Class::Ident => "\x1b[33m",
            Class::Arithmetic | Class::Comparison => "\x1b[35m",
            Class::Int | Class::Bool => "\x1b[36m",
            Class::Str | Class::Char => "\x1b[32m",
            Class::Eof => "\x1b[2m",
            Class::Paren | Class::Arrow | Class::Keyword => "",
        }
    }
}

/// Prints a token stream for `--tokens`.
#[derive(Debug, Clone)]
pub struct TokenDumper {
    pub color: bool,
    /// `false` prints tokens as spelled in source.
    pub show_debug_repr: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        TokenDumper {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Spanned]) -> String {
        let mut out = String::new();
        for spanned in tokens {
            let class = Class::of(&spanned.token);
            let (open, close) = match class.color() {
                color if self.color && !color.is_empty() => (color, RESET),
                _ => ("", ""),
            };
            let _ = writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} {}{}",
                spanned.loc.line,
                spanned.loc.col,
                open,
                class.label(),
                self.spelling(&spanned.token),
                close
            );
        }
        out
    }

    fn spelling(&self, token: &Token) -> String {
        if self.show_debug_repr {
            return format!("{:?}", token);
        }
        match token {
            Token::Str(text) => format!("{:?}", text),
            Token::Eof => "<eof>".to_string(),
            other => other.to_string(),
        }
    }
}
