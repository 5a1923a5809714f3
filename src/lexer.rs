use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::Token;

/// A 1-based source position inside a named file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: Rc<str>,
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn new(file: Rc<str>, line: usize, col: usize) -> Self {
        Location { file, line, col }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{loc}: {message}")]
pub struct LexerError {
    pub message: String,
    pub loc: Location,
}

pub struct Lexer {
    file: Rc<str>,
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    errors: Vec<LexerError>,
}

/// Characters that end a run even without surrounding whitespace.
fn is_reserved_punctuation(ch: char) -> bool {
    matches!(ch, '(' | ')' | '"' | '\'')
}

fn is_run_char(ch: char) -> bool {
    !ch.is_whitespace() && !is_reserved_punctuation(ch)
}

impl Lexer {
    pub fn new(file: impl Into<Rc<str>>, source: &str) -> Self {
        Lexer {
            file: file.into(),
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            errors: Vec::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn loc(&self) -> Location {
        Location::new(self.file.clone(), self.line, self.col)
    }

    fn error(&mut self, message: impl Into<String>, loc: Location) {
        self.errors.push(LexerError {
            message: message.into(),
            loc,
        });
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek() == Some('/') {
                while let Some(ch) = self.current() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_run(&mut self) -> String {
        let mut run = String::new();
        while let Some(ch) = self.current() {
            if !is_run_char(ch) {
                break;
            }
            run.push(ch);
            self.advance();
        }
        run
    }

    /// Decodes the character following a backslash.
    fn read_escape(&mut self, out: &mut String) {
        match self.current() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('e') => out.push('\x1b'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('0') => out.push('\0'),
            Some(ch) => {
                out.push('\\');
                out.push(ch);
            }
            None => {
                out.push('\\');
                return;
            }
        }
        self.advance();
    }

    fn read_string(&mut self, start: Location) -> Option<Token> {
        self.advance(); // opening quote

        let mut string = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Some(Token::Str(string));
                }
                Some('\\') => {
                    self.advance();
                    self.read_escape(&mut string);
                }
                Some('\n') => {
                    self.error("unterminated string (newline before closing quote)", start);
                    return None;
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => {
                    self.error("unterminated string literal", start);
                    return None;
                }
            }
        }
    }

    fn read_char(&mut self, start: Location) -> Option<Token> {
        self.advance(); // opening quote

        let mut content = String::new();
        loop {
            match self.current() {
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    self.read_escape(&mut content);
                }
                Some('\n') | None => {
                    self.error("unterminated character literal", start);
                    return None;
                }
                Some(ch) => {
                    content.push(ch);
                    self.advance();
                }
            }
        }

        match content.as_bytes() {
            [byte] => Some(Token::Char(*byte)),
            [] => {
                self.error("empty character literal", start);
                None
            }
            _ => {
                self.error(
                    format!("character literal '{}' must be exactly one byte", content),
                    start,
                );
                None
            }
        }
    }

    fn read_param(&mut self, start: Location) -> Option<Token> {
        self.advance(); // '$'

        let mut name = String::new();
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                break;
            }
            name.push(ch);
            self.advance();
        }

        if name.is_empty() {
            self.error("expected a type parameter name after '$'", start);
            return None;
        }
        Some(Token::Param(name))
    }

    fn read_number(&mut self, start: Location) -> Option<Token> {
        let mut digits = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // `2dup` and friends: digits glued to more run characters form a word
        if self.current().map(is_run_char).unwrap_or(false) {
            let rest = self.read_run();
            let word = format!("{}{}", digits, rest);
            return Some(Token::reserved(&word).unwrap_or(Token::Ident(word)));
        }

        match digits.parse::<i64>() {
            Ok(value) => Some(Token::Int(value)),
            Err(_) => {
                self.error(format!("integer literal {} is out of range", digits), start);
                None
            }
        }
    }

    fn read_word(&mut self) -> Token {
        let run = self.read_run();
        if let Some(token) = Token::reserved(&run) {
            return token;
        }
        // only `-` signs a literal; `+5` stays a word
        if run.starts_with('+') {
            return Token::Ident(run);
        }
        match run.parse::<i64>() {
            Ok(value) => Token::Int(value),
            Err(_) => Token::Ident(run),
        }
    }

    /// Tokenizes the whole source. Every lexical error is collected; the
    /// offending lexeme is skipped so later errors surface in the same pass.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, Vec<LexerError>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            let loc = self.loc();

            let token = match self.current() {
                None => {
                    tokens.push(Spanned {
                        token: Token::Eof,
                        loc,
                    });
                    break;
                }
                Some('(') => {
                    self.advance();
                    Some(Token::LParen)
                }
                Some(')') => {
                    self.advance();
                    Some(Token::RParen)
                }
                Some('"') => self.read_string(loc.clone()),
                Some('\'') => self.read_char(loc.clone()),
                Some('$') => self.read_param(loc.clone()),
                Some(ch) if ch.is_ascii_digit() => self.read_number(loc.clone()),
                Some(_) => Some(self.read_word()),
            };

            if let Some(token) = token {
                tokens.push(Spanned { token, loc });
            }
        }

        if self.errors.is_empty() {
            Ok(tokens)
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new("test.cin", source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .filter(|t| !matches!(t, Token::Eof))
            .collect()
    }

    fn errors(source: &str) -> Vec<LexerError> {
        let mut lexer = Lexer::new("test.cin", source);
        lexer.tokenize().unwrap_err()
    }

    #[test]
    fn test_arithmetic() {
        let t = tokens("10 20 + 5 *");
        assert_eq!(
            t,
            vec![
                Token::Int(10),
                Token::Int(20),
                Token::Plus,
                Token::Int(5),
                Token::Star
            ]
        );
    }

    #[test]
    fn test_function_declaration() {
        let t = tokens("fn square int -> int ( dup * )");
        assert_eq!(
            t,
            vec![
                Token::Fn,
                Token::Ident("square".to_string()),
                Token::TyInt,
                Token::Arrow,
                Token::TyInt,
                Token::LParen,
                Token::Dup,
                Token::Star,
                Token::RParen
            ]
        );
    }

    #[test]
    fn test_parens_split_runs() {
        let t = tokens("fn main(dup)");
        assert_eq!(
            t,
            vec![
                Token::Fn,
                Token::Ident("main".to_string()),
                Token::LParen,
                Token::Dup,
                Token::RParen
            ]
        );
    }

    #[test]
    fn test_polymorphic_marker() {
        let t = tokens("fn* show");
        assert_eq!(t, vec![Token::FnPoly, Token::Ident("show".to_string())]);
    }

    #[test]
    fn test_digit_led_word_is_identifier() {
        let t = tokens("2dup 12 3rd");
        assert_eq!(
            t,
            vec![
                Token::Ident("2dup".to_string()),
                Token::Int(12),
                Token::Ident("3rd".to_string())
            ]
        );
    }

    #[test]
    fn test_number_followed_by_paren_stays_number() {
        let t = tokens("(1)");
        assert_eq!(t, vec![Token::LParen, Token::Int(1), Token::RParen]);
    }

    #[test]
    fn test_negative_numbers() {
        let t = tokens("-123 - -x");
        assert_eq!(
            t,
            vec![
                Token::Int(-123),
                Token::Minus,
                Token::Ident("-x".to_string())
            ]
        );
    }

    #[test]
    fn test_param_type_names() {
        let t = tokens("$a $elem");
        assert_eq!(
            t,
            vec![
                Token::Param("a".to_string()),
                Token::Param("elem".to_string())
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let t = tokens(r#""a\nb\tc\e\"\q""#);
        assert_eq!(t, vec![Token::Str("a\nb\tc\x1b\"\\q".to_string())]);
    }

    #[test]
    fn test_char_literals() {
        let t = tokens(r"'a' '\n' ' '");
        assert_eq!(
            t,
            vec![Token::Char(b'a'), Token::Char(b'\n'), Token::Char(b' ')]
        );
    }

    #[test]
    fn test_empty_char_literal_error() {
        let errs = errors("''");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("empty character literal"));
        assert_eq!((errs[0].loc.line, errs[0].loc.col), (1, 1));
    }

    #[test]
    fn test_multi_char_literal_error() {
        let errs = errors("1 'ab'");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("exactly one byte"));
        assert_eq!(errs[0].loc.col, 3);
    }

    #[test]
    fn test_errors_accumulate() {
        let errs = errors("'' \"open\n 'xy'");
        assert_eq!(errs.len(), 3);
        assert!(errs[1].message.contains("unterminated string"));
    }

    #[test]
    fn test_comments_are_skipped() {
        let t = tokens("1 // one\n2 // two");
        assert_eq!(t, vec![Token::Int(1), Token::Int(2)]);
    }

    #[test]
    fn test_plus_does_not_sign_a_literal() {
        let t = tokens("+5 + 5");
        assert_eq!(
            t,
            vec![Token::Ident("+5".to_string()), Token::Plus, Token::Int(5)]
        );
    }

    #[test]
    fn test_integer_overflow_error() {
        let errs = errors("99999999999999999999");
        assert!(errs[0].message.contains("out of range"));
    }

    #[test]
    fn test_keyword_vs_ident() {
        let t = tokens("dup dupx if iff loop looped");
        assert_eq!(
            t,
            vec![
                Token::Dup,
                Token::Ident("dupx".to_string()),
                Token::If,
                Token::Ident("iff".to_string()),
                Token::Loop,
                Token::Ident("looped".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokens_and_locations() {
        let src = "fn main (\n  \"hi\" drop\n)\n";

        let mut lexer = Lexer::new("main.cin", src);
        let sp = lexer.tokenize().unwrap();

        macro_rules! at {
            ($i:expr, $tok:expr, $line:expr, $col:expr) => {{
                assert_eq!(sp[$i].token, $tok, "token mismatch at index {}", $i);
                assert_eq!(sp[$i].loc.line, $line, "line mismatch at index {}", $i);
                assert_eq!(sp[$i].loc.col, $col, "col mismatch at index {}", $i);
            }};
        }

        assert_eq!(sp.len(), 7, "unexpected token count: {:?}", sp);

        at!(0, Token::Fn, 1, 1);
        at!(1, Token::Ident("main".to_string()), 1, 4);
        at!(2, Token::LParen, 1, 9);
        at!(3, Token::Str("hi".to_string()), 2, 3);
        at!(4, Token::Drop, 2, 8);
        at!(5, Token::RParen, 3, 1);
        at!(6, Token::Eof, 4, 1);

        assert_eq!(sp[3].loc.to_string(), "main.cin:2:3");
    }
}
