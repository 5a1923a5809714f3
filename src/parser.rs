use std::collections::HashSet;
use std::rc::Rc;

use crate::ir::{Binding, Code, Constant, Function, Kind, Memory, Op, Program};
use crate::lexer::{Lexer, Location, Spanned};
use crate::parser_error::ParserError;
use crate::source::{SourceId, SourceLoader, SourceUnit};
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScopeKind {
    If,
    Loop,
}

/// Parse-time bookkeeping for one open `if` or `loop`.
#[derive(Debug)]
struct ControlScope {
    kind: ScopeKind,
    /// Index of the `If`/`Loop` marker.
    start: usize,
    /// Jump waiting for its target (`Do`, or `Else` once seen).
    pending: Option<usize>,
    has_else: bool,
    loc: Location,
}

/// Parser and IR builder for Cinder.
///
/// Source units are consumed from a queue in increasing index order. The
/// embedded prelude is queued first, then the entry file, then every file
/// named by a `using` declaration, each at most once.
///
/// Errors never stop the pass: they are recorded, the parser resynchronizes
/// (at the next declaration on top level, at the next token inside a body),
/// and all of them are returned together.
pub struct Parser<'a> {
    loader: &'a dyn SourceLoader,
    program: Program,
    errors: Vec<ParserError>,

    queue: Vec<SourceUnit>,
    visited: HashSet<SourceId>,
    prelude: bool,

    // state of the unit being parsed
    tokens: Vec<Spanned>,
    pos: usize,
    unit: Option<SourceId>,
    internal: bool,

    scopes: Vec<ControlScope>,
}

impl<'a> Parser<'a> {
    pub fn new(loader: &'a dyn SourceLoader) -> Self {
        Parser {
            loader,
            program: Program::new(),
            errors: Vec::new(),
            queue: Vec::new(),
            visited: HashSet::new(),
            prelude: true,
            tokens: Vec::new(),
            pos: 0,
            unit: None,
            internal: false,
            scopes: Vec::new(),
        }
    }

    /// Skips the embedded library (its words are then unavailable).
    pub fn without_prelude(mut self) -> Self {
        self.prelude = false;
        self
    }

    /// Parses `entry` and everything it pulls in with `using`.
    pub fn parse(mut self, entry: &str) -> Result<Program, Vec<ParserError>> {
        if self.prelude {
            let prelude = SourceUnit::prelude();
            self.visited.insert(prelude.id.clone());
            self.queue.push(prelude);
        }

        match self.load_unit(entry, None) {
            Ok(unit) => {
                self.visited.insert(unit.id.clone());
                self.queue.push(unit);
            }
            Err(message) => {
                let loc = Location::new(entry.into(), 1, 1);
                self.errors.push(ParserError::new(loc, message));
                return Err(self.errors);
            }
        }

        let mut next = 0;
        while next < self.queue.len() {
            let unit = self.queue[next].clone();
            next += 1;
            self.parse_unit(unit);
        }

        self.check_words();

        if self.errors.is_empty() {
            Ok(self.program)
        } else {
            Err(self.errors)
        }
    }

    fn load_unit(&self, name: &str, from: Option<&SourceId>) -> Result<SourceUnit, String> {
        let id = self.loader.resolve(name, from).map_err(|e| e.to_string())?;
        let text = self.loader.load(&id).map_err(|e| e.to_string())?;
        Ok(SourceUnit {
            name: Rc::from(id.0.as_str()),
            id,
            text,
            internal: false,
        })
    }

    fn parse_unit(&mut self, unit: SourceUnit) {
        let mut lexer = Lexer::new(unit.name.clone(), &unit.text);
        let tokens = match lexer.tokenize() {
            Ok(tokens) => tokens,
            Err(errors) => {
                self.errors.extend(errors.into_iter().map(ParserError::from));
                return;
            }
        };

        self.tokens = tokens;
        self.pos = 0;
        self.unit = Some(unit.id);
        self.internal = unit.internal;

        while !matches!(self.peek(), Token::Eof) {
            self.parse_declaration();
        }
    }

    // =========================================================================
    // Token stream
    // =========================================================================

    /// Returns the current token. The stream always ends with `Eof`, which
    /// is returned forever once reached.
    fn current(&self) -> &Spanned {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn loc(&self) -> Location {
        self.current().loc.clone()
    }

    fn advance(&mut self) -> Spanned {
        let spanned = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        spanned
    }

    fn error(&mut self, loc: Location, message: impl Into<String>) {
        self.errors.push(ParserError::new(loc, message));
    }

    /// Skips to the next top-level declaration.
    fn synchronize(&mut self) {
        while !self.peek().is_declaration() && !matches!(self.peek(), Token::Eof) {
            self.advance();
        }
    }

    fn expect_name(&mut self, after: &str) -> Option<(String, Location)> {
        let spanned = self.current().clone();
        match spanned.token {
            Token::Ident(name) => {
                self.advance();
                Some((name, spanned.loc))
            }
            other => {
                self.error(
                    spanned.loc,
                    format!("expected a name after '{}', found '{}'", after, other),
                );
                None
            }
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_declaration(&mut self) {
        let spanned = self.current().clone();
        match spanned.token {
            Token::Fn => self.parse_function(false),
            Token::FnPoly => self.parse_function(true),
            Token::Const => self.parse_const(),
            Token::Var => self.parse_var(),
            Token::Using => self.parse_using(),
            other => {
                self.error(
                    spanned.loc,
                    format!(
                        "expected a declaration ('fn', 'const', 'var' or 'using'), found '{}'",
                        other
                    ),
                );
                self.advance();
                self.synchronize();
            }
        }
    }

    /// Records an error if `name` is already taken by a constant or memory.
    fn check_global_name(&mut self, name: &str, loc: &Location) -> bool {
        let previous = self
            .program
            .constant(name)
            .map(|c| ("constant", c.loc.clone()))
            .or_else(|| {
                self.program
                    .memory(name)
                    .map(|i| ("memory", self.program.memories[i].loc.clone()))
            });

        match previous {
            Some((what, at)) => {
                self.errors.push(
                    ParserError::new(
                        loc.clone(),
                        format!("'{}' is already defined as a {}", name, what),
                    )
                    .with_hint(format!("previous definition at {}", at)),
                );
                false
            }
            None => true,
        }
    }

    /// ```text
    /// const NAME value
    /// const NAME a b +
    /// const NAME a b *
    /// ```
    fn parse_const(&mut self) {
        self.advance(); // consume 'const'

        let Some((name, loc)) = self.expect_name("const") else {
            self.synchronize();
            return;
        };

        let Some(first) = self.parse_const_operand() else {
            self.synchronize();
            return;
        };

        let value = if self.at_declaration_end() {
            first
        } else {
            let Some(second) = self.parse_const_operand() else {
                self.synchronize();
                return;
            };

            let op = self.advance();
            let result = match op.token {
                Token::Plus => first.checked_add(second),
                Token::Star => first.checked_mul(second),
                other => {
                    self.errors.push(
                        ParserError::new(
                            op.loc,
                            format!("unsupported operator '{}' in constant expression", other),
                        )
                        .with_hint("constant expressions are 'a b +' or 'a b *'"),
                    );
                    self.synchronize();
                    return;
                }
            };

            match result {
                Some(value) => value,
                None => {
                    self.error(op.loc, format!("constant '{}' overflows", name));
                    self.synchronize();
                    return;
                }
            }
        };

        if !self.at_declaration_end() {
            let loc = self.loc();
            self.errors.push(
                ParserError::new(loc, format!("constant expression for '{}' is too complex", name))
                    .with_hint("constant expressions are 'a b +' or 'a b *'"),
            );
            self.synchronize();
            return;
        }

        if self.program.functions.iter().any(|f| f.name == name) {
            self.error(loc, format!("'{}' is already defined as a function", name));
            return;
        }
        if self.check_global_name(&name, &loc) {
            self.program.constants.push(Constant { name, value, loc });
        }
    }

    fn at_declaration_end(&self) -> bool {
        self.peek().is_declaration() || matches!(self.peek(), Token::Eof)
    }

    /// An integer literal or the name of an earlier constant.
    fn parse_const_operand(&mut self) -> Option<i64> {
        let spanned = self.current().clone();
        if !self.at_declaration_end() {
            self.advance();
        }
        match spanned.token {
            Token::Int(value) => Some(value),
            Token::Ident(name) => match self.program.constant(&name) {
                Some(constant) => Some(constant.value),
                None => {
                    self.error(spanned.loc, format!("unknown constant '{}'", name));
                    None
                }
            },
            other => {
                self.error(
                    spanned.loc,
                    format!("expected an integer or constant, found '{}'", other),
                );
                None
            }
        }
    }

    /// ```text
    /// var NAME size
    /// ```
    fn parse_var(&mut self) {
        self.advance(); // consume 'var'

        let Some((name, loc)) = self.expect_name("var") else {
            self.synchronize();
            return;
        };

        let size_tok = self.advance();
        let size = match size_tok.token {
            Token::Int(n) => n,
            Token::Ident(ref constant) => match self.program.constant(constant) {
                Some(c) => c.value,
                None => {
                    self.error(size_tok.loc, format!("unknown constant '{}'", constant));
                    self.synchronize();
                    return;
                }
            },
            other => {
                self.error(
                    size_tok.loc,
                    format!("expected a size for '{}', found '{}'", name, other),
                );
                self.synchronize();
                return;
            }
        };

        if size <= 0 {
            self.error(size_tok.loc, format!("size of '{}' must be positive", name));
            return;
        }

        if self.program.functions.iter().any(|f| f.name == name) {
            self.error(loc, format!("'{}' is already defined as a function", name));
            return;
        }
        if self.check_global_name(&name, &loc) {
            self.program.memories.push(Memory {
                name,
                size: size as usize,
                loc,
            });
        }
    }

    /// ```text
    /// using NAME
    /// using "path/to/file"
    /// ```
    fn parse_using(&mut self) {
        self.advance(); // consume 'using'

        let spanned = self.advance();
        let name = match spanned.token {
            Token::Ident(name) | Token::Str(name) => name,
            other => {
                self.error(
                    spanned.loc,
                    format!("expected a file name after 'using', found '{}'", other),
                );
                self.synchronize();
                return;
            }
        };

        let from = self.unit.clone();
        match self.load_unit(&name, from.as_ref()) {
            Ok(unit) => {
                // already queued or parsed: nothing to do
                if self.visited.insert(unit.id.clone()) {
                    self.queue.push(unit);
                }
            }
            Err(message) => self.error(spanned.loc, message),
        }
    }

    /// ```text
    /// fn NAME [arg-types] [-> ret-types] ( body )
    /// fn* NAME ...
    /// ```
    fn parse_function(&mut self, polymorphic: bool) {
        let keyword = self.advance();

        let Some((name, loc)) = self.expect_name(&keyword.token.to_string()) else {
            self.synchronize();
            return;
        };

        self.check_function_name(&name, &loc, polymorphic);

        let entry = self.program.functions.len();
        let mut function = Function::new(name, entry, loc);
        function.polymorphic = polymorphic;
        function.internal = self.internal;

        function.args = self.parse_kinds();
        if matches!(self.peek(), Token::Arrow) {
            self.advance();
            function.rets = self.parse_kinds();
        }

        if matches!(self.peek(), Token::LParen) {
            self.advance();
            self.parse_body(&mut function);
        } else {
            let loc = self.loc();
            let found = self.peek().to_string();
            self.error(
                loc,
                format!("expected '(' to open the body of '{}', found '{}'", function.name, found),
            );
            self.synchronize();
        }

        self.program.functions.push(function);
    }

    fn check_function_name(&mut self, name: &str, loc: &Location, polymorphic: bool) {
        if !self.check_global_name(name, loc) {
            return;
        }

        let previous: Vec<(bool, Location)> = self
            .program
            .functions
            .iter()
            .filter(|f| f.name == name)
            .map(|f| (f.polymorphic, f.loc.clone()))
            .collect();
        let Some((_, first_loc)) = previous.first() else {
            return;
        };

        if name == "main" {
            self.errors.push(
                ParserError::new(loc.clone(), "duplicate definition of 'main'")
                    .with_hint(format!("'main' is first defined at {}", first_loc)),
            );
            return;
        }

        let all_polymorphic = polymorphic && previous.iter().all(|(poly, _)| *poly);
        if !all_polymorphic {
            let conflict = previous
                .iter()
                .find(|(poly, _)| !*poly)
                .map(|(_, l)| l.clone())
                .unwrap_or_else(|| first_loc.clone());
            self.errors.push(
                ParserError::new(loc.clone(), format!("'{}' is already defined", name))
                    .with_hint(format!(
                        "conflicting definition at {}; declare every overload with 'fn*'",
                        conflict
                    )),
            );
        }
    }

    fn parse_kinds(&mut self) -> Vec<Kind> {
        let mut kinds = Vec::new();
        loop {
            let spanned = self.current().clone();
            match spanned.token {
                Token::LParen | Token::Arrow | Token::Eof => break,
                token if token.is_declaration() => break,
                token => {
                    self.advance();
                    match kind_of(&token) {
                        Some(kind) => kinds.push(kind),
                        None => self.error(spanned.loc, format!("unknown type name '{}'", token)),
                    }
                }
            }
        }
        kinds
    }

    // =========================================================================
    // Function bodies
    // =========================================================================

    fn emit(function: &mut Function, loc: Location, op: Op) -> usize {
        function.code.push(Code::new(loc, op));
        function.code.len() - 1
    }

    /// Points the jump at `at` to `target`.
    fn patch(function: &mut Function, at: usize, target: usize) {
        if let Op::Do(t) | Op::Else(t) = &mut function.code[at].op {
            *t = target;
        }
    }

    fn parse_body(&mut self, function: &mut Function) {
        let depth = self.scopes.len();

        loop {
            let spanned = self.current().clone();
            let loc = spanned.loc.clone();

            let op = match spanned.token {
                Token::Eof => {
                    self.error(
                        loc,
                        format!("unexpected end of input, expected ')' to close '{}'", function.name),
                    );
                    break;
                }
                token if token.is_declaration() => {
                    self.errors.push(
                        ParserError::new(loc, format!("unexpected '{}' inside '{}'", token, function.name))
                            .with_hint("a ')' is probably missing above"),
                    );
                    break;
                }

                Token::RParen => {
                    self.advance();
                    if self.scopes.len() > depth {
                        if let Some(scope) = self.scopes.pop() {
                            self.close_scope(function, scope, loc);
                        }
                        continue;
                    }
                    if !function.bindings.is_empty() {
                        Self::emit(function, loc, Op::Unbind(function.bindings.len()));
                    }
                    break;
                }

                Token::If | Token::Loop => {
                    self.advance();
                    let (kind, op) = if spanned.token == Token::If {
                        (ScopeKind::If, Op::If)
                    } else {
                        (ScopeKind::Loop, Op::Loop)
                    };
                    let start = Self::emit(function, loc.clone(), op);
                    self.scopes.push(ControlScope {
                        kind,
                        start,
                        pending: None,
                        has_else: false,
                        loc,
                    });
                    continue;
                }

                Token::LParen => {
                    self.advance();
                    let open = self.scopes.len() > depth;
                    match self.scopes.last_mut() {
                        Some(scope) if open && scope.pending.is_none() => {
                            let at = function.code.len();
                            function.code.push(Code::new(loc, Op::Do(usize::MAX)));
                            scope.pending = Some(at);
                        }
                        _ => self.error(loc, "unexpected '(' (only 'if' and 'loop' open a block)"),
                    }
                    continue;
                }

                Token::Else => {
                    self.advance();
                    self.parse_else(function, loc);
                    continue;
                }

                Token::Let => {
                    self.advance();
                    self.parse_let(function, loc);
                    continue;
                }

                Token::In => {
                    self.advance();
                    self.error(loc, "'in' without 'let'");
                    continue;
                }

                Token::Cast => {
                    self.advance();
                    // the type token is consumed by the emit below
                    let target = self.current().clone();
                    match kind_of(&target.token) {
                        Some(Kind::Infer(_)) => {
                            self.advance();
                            self.error(target.loc, "cannot cast to a type parameter");
                            continue;
                        }
                        Some(kind) => Op::Cast(kind),
                        None => {
                            if !matches!(target.token, Token::RParen | Token::Eof)
                                && !target.token.is_declaration()
                            {
                                self.advance();
                            }
                            self.error(
                                target.loc,
                                format!("expected a type after 'cast', found '{}'", target.token),
                            );
                            continue;
                        }
                    }
                }

                Token::Ident(ref name) => self.resolve_identifier(function, name),

                ref token => match simple_op(token, &mut self.program) {
                    Some(op) => op,
                    None => {
                        self.advance();
                        self.error(
                            loc,
                            format!("unexpected '{}' in the body of '{}'", token, function.name),
                        );
                        continue;
                    }
                },
            };

            self.advance();
            Self::emit(function, loc, op);
        }

        // Anything still open was never closed
        while self.scopes.len() > depth {
            if let Some(scope) = self.scopes.pop() {
                let what = match scope.kind {
                    ScopeKind::If => "if",
                    ScopeKind::Loop => "loop",
                };
                self.error(scope.loc, format!("unclosed '{}'", what));
            }
        }
    }

    fn parse_else(&mut self, function: &mut Function, loc: Location) {
        let Some(scope) = self.scopes.last_mut() else {
            self.error(loc, "'else' without 'if'");
            return;
        };
        let pending = match (scope.kind, scope.pending, scope.has_else) {
            (ScopeKind::If, Some(pending), false) => pending,
            (ScopeKind::If, _, true) => {
                self.error(loc, "'if' already has an 'else'");
                return;
            }
            _ => {
                self.error(loc, "'else' without 'if'");
                return;
            }
        };

        let at = function.code.len();
        function.code.push(Code::new(loc, Op::Else(usize::MAX)));
        Self::patch(function, pending, at + 1);
        scope.pending = Some(at);
        scope.has_else = true;
    }

    fn close_scope(&mut self, function: &mut Function, scope: ControlScope, loc: Location) {
        let Some(pending) = scope.pending else {
            let what = match scope.kind {
                ScopeKind::If => "if",
                ScopeKind::Loop => "loop",
            };
            self.error(scope.loc, format!("expected '(' after '{}'", what));
            return;
        };

        match scope.kind {
            ScopeKind::If => {
                let end = Self::emit(function, loc, Op::EndIf);
                Self::patch(function, pending, end);
            }
            ScopeKind::Loop => {
                Self::emit(function, loc.clone(), Op::Jump(scope.start));
                let end = Self::emit(function, loc, Op::EndLoop);
                Self::patch(function, pending, end);
            }
        }
    }

    /// ```text
    /// let a b c in
    /// ```
    ///
    /// `c` binds the top of the stack. Names stay visible until the end of
    /// the function, even when introduced inside an `if` or `loop`.
    fn parse_let(&mut self, function: &mut Function, loc: Location) {
        let mut names = Vec::new();
        loop {
            let spanned = self.current().clone();
            match spanned.token {
                Token::In => {
                    self.advance();
                    break;
                }
                Token::Ident(name) => {
                    self.advance();
                    names.push(name);
                }
                other => {
                    self.error(
                        spanned.loc,
                        format!("expected a binding name or 'in', found '{}'", other),
                    );
                    return;
                }
            }
        }

        if names.is_empty() {
            self.error(loc, "'let' needs at least one name");
            return;
        }

        let count = names.len();
        for name in names {
            let index = function.bindings.len();
            function.bindings.push(Binding {
                name,
                index,
                kind: Kind::None,
            });
        }
        Self::emit(function, loc, Op::Bind(count));
    }

    /// Binding, then constant, then memory; anything else is a word that the
    /// validator resolves against the live stack.
    fn resolve_identifier(&self, function: &Function, name: &str) -> Op {
        if let Some(binding) = function.bindings.iter().rev().find(|b| b.name == name) {
            return Op::PushBind(binding.index);
        }
        if let Some(constant) = self.program.constant(name) {
            return Op::PushInt(constant.value);
        }
        if let Some(memory) = self.program.memory(name) {
            return Op::PushPtr(memory);
        }
        Op::Word(name.to_string())
    }

    /// Every deferred word must name at least one function.
    fn check_words(&mut self) {
        let mut unknown = Vec::new();
        for function in &self.program.functions {
            for code in &function.code {
                if let Op::Word(name) = &code.op
                    && self.program.candidates(name).is_empty()
                {
                    unknown.push(ParserError::new(
                        code.loc.clone(),
                        format!("unknown word '{}'", name),
                    ));
                }
            }
        }
        self.errors.extend(unknown);
    }
}

/// Kind named by a type token, if it is one.
fn kind_of(token: &Token) -> Option<Kind> {
    Some(match token {
        Token::TyInt => Kind::Int,
        Token::TyBool => Kind::Bool,
        Token::TyByte => Kind::Byte,
        Token::TyPtr => Kind::Ptr,
        Token::TyStr => Kind::Str,
        Token::TyAny => Kind::Any,
        Token::Param(name) => Kind::Infer(name.clone()),
        _ => return None,
    })
}

/// One token, one instruction, no control-flow impact.
fn simple_op(token: &Token, program: &mut Program) -> Option<Op> {
    Some(match token {
        // Literals
        Token::Int(n) => Op::PushInt(*n),
        Token::Bool(b) => Op::PushBool(*b),
        Token::Char(c) => Op::PushChar(*c),
        Token::Str(s) => Op::PushStr(program.intern_string(s)),

        // Arithmetic
        Token::Plus => Op::Add,
        Token::Minus => Op::Sub,
        Token::Star => Op::Mul,
        Token::Slash => Op::Div,
        Token::Percent => Op::Mod,

        // Comparison
        Token::Eq => Op::Eq,
        Token::NotEq => Op::Ne,
        Token::Lt => Op::Lt,
        Token::Gt => Op::Gt,
        Token::LtEq => Op::Le,
        Token::GtEq => Op::Ge,

        // Logic
        Token::And => Op::And,
        Token::Or => Op::Or,
        Token::Not => Op::Not,

        // Stack operations
        Token::Dup => Op::Dup,
        Token::Drop => Op::Drop,
        Token::Swap => Op::Swap,
        Token::Over => Op::Over,
        Token::Rot => Op::Rot,

        // Memory
        Token::Load => Op::Load,
        Token::Load8 => Op::Load8,
        Token::Store => Op::Store,
        Token::Store8 => Op::Store8,
        Token::Syscall(n) => Op::Syscall(*n),

        _ => return None,
    })
}
