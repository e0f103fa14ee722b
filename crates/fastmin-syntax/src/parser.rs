//! Recursive descent parser with precedence climbing for binary expressions.
//!
//! A parse appends one source unit to a program: when `toplevel` carries a
//! tree built from earlier units, the new unit's statements are pushed onto
//! its body and the unit is registered at the next free base offset.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::span::{LineIndex, Span};
use crate::token::{keyword_to_str, Token, TokenKind};

/// Parser configuration options.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Unit identifier recorded in the program and in error messages.
    pub filename: String,
    /// Previously parsed program to append this unit to.
    pub toplevel: Option<Program>,
    /// Allow `return` outside of any function.
    pub bare_returns: bool,
}

impl ParseOptions {
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_toplevel(mut self, toplevel: Program) -> Self {
        self.toplevel = Some(toplevel);
        self
    }

    #[must_use]
    pub fn with_bare_returns(mut self, bare_returns: bool) -> Self {
        self.bare_returns = bare_returns;
        self
    }
}

/// Parse error with the original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub filename: String,
    /// 1-based line.
    pub line: u32,
    /// 0-based byte column.
    pub col: u32,
    /// Span in the program-wide position space.
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}:{}:{})",
            self.message, self.filename, self.line, self.col
        )
    }
}

impl std::error::Error for ParseError {}

/// Parse one unit of source text, appending it to `options.toplevel` if given.
pub fn parse(source: &str, options: ParseOptions) -> Result<Program, ParseError> {
    let ParseOptions {
        filename,
        toplevel,
        bare_returns,
    } = options;
    let mut program = toplevel.unwrap_or_default();
    let base = program.next_base();
    let len = u32::try_from(source.len()).unwrap_or(u32::MAX);

    let mut parser = Parser::new(source, &filename, base, bare_returns);
    let stmts = parser.parse_program()?;

    program.body.extend(stmts);
    program.units.push(SourceUnit {
        name: filename,
        base,
        len,
    });
    Ok(program)
}

/// The parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    /// End offset of the last consumed token.
    prev_end: u32,
    source: &'a str,
    filename: &'a str,
    base: u32,
    bare_returns: bool,
    /// When false, `in` is not parsed as a binary operator (for-in init).
    allow_in: bool,
    /// Nesting depth of function bodies.
    function_depth: u32,
}

impl<'a> Parser<'a> {
    /// Create a new parser for one unit placed at `base`.
    pub fn new(source: &'a str, filename: &'a str, base: u32, bare_returns: bool) -> Self {
        let mut lexer = Lexer::with_base(source, base);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            prev_end: base,
            source,
            filename,
            base,
            bare_returns,
            allow_in: true,
            function_depth: 0,
        }
    }

    // =========================================================================
    // Token Handling
    // =========================================================================

    fn peek(&self) -> &TokenKind {
        &self.current.kind
    }

    fn advance(&mut self) -> Token {
        self.prev_end = self.current.span.end;
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected())
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end)
    }

    fn error(&self, message: impl Into<String>, span: Span) -> ParseError {
        let index = LineIndex::new(self.source);
        let (line, col) = index.line_col(span.start.saturating_sub(self.base));
        ParseError {
            message: message.into(),
            filename: self.filename.to_string(),
            line: line + 1,
            col,
            span,
        }
    }

    fn unexpected(&self) -> ParseError {
        let message = match self.peek() {
            TokenKind::Invalid(reason) => format!("Invalid token: {reason}"),
            TokenKind::Eof => "Unexpected end of input".to_string(),
            other => format!("Unexpected token {}", describe(other)),
        };
        self.error(message, self.current.span)
    }

    /// Consume a semicolon, applying automatic semicolon insertion.
    fn expect_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat(&TokenKind::Semicolon) {
            return Ok(());
        }
        if self.check(&TokenKind::RBrace) || self.is_eof() || self.current.had_newline_before {
            return Ok(());
        }
        Err(self.unexpected())
    }

    /// Whether the statement ends here for a restricted production.
    fn at_statement_end(&self) -> bool {
        self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.is_eof()
            || self.current.had_newline_before
    }

    // =========================================================================
    // Program Parsing
    // =========================================================================

    /// Parse all statements of the unit.
    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while !self.is_eof() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    // =========================================================================
    // Statement Parsing
    // =========================================================================

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;

        match self.peek() {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => self.parse_var_decl(),
            TokenKind::Function => self.parse_function_decl(),

            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Throw => self.parse_throw_stmt(),
            TokenKind::Try => self.parse_try_stmt(),
            TokenKind::With => self.parse_with_stmt(),
            TokenKind::Debugger => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Stmt::new(StmtKind::Debugger, self.span_from(start)))
            }

            TokenKind::LBrace => {
                let body = self.parse_block_body()?;
                Ok(Stmt::new(StmtKind::Block(body), self.span_from(start)))
            }

            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::new(StmtKind::Empty, self.span_from(start)))
            }

            TokenKind::Class | TokenKind::Import | TokenKind::Export | TokenKind::Enum => {
                Err(self.unexpected())
            }

            TokenKind::Identifier(name) => {
                if matches!(self.lexer.peek().kind, TokenKind::Colon) {
                    let label = name.clone();
                    self.advance();
                    self.advance();
                    let body = self.parse_stmt()?;
                    return Ok(Stmt::new(
                        StmtKind::Labeled {
                            label,
                            body: Box::new(body),
                        },
                        self.span_from(start),
                    ));
                }
                self.parse_expr_stmt()
            }

            _ => self.parse_expr_stmt(),
        }
    }

    /// Parse `{ stmts }` and return the statements.
    fn parse_block_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_var_kind(&mut self) -> Result<VarKind, ParseError> {
        let kind = match self.peek() {
            TokenKind::Var => VarKind::Var,
            TokenKind::Let => VarKind::Let,
            TokenKind::Const => VarKind::Const,
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(kind)
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        let kind = self.parse_var_kind()?;
        let decls = self.parse_var_declarators()?;
        self.expect_semicolon()?;
        Ok(Stmt::new(StmtKind::Var { kind, decls }, self.span_from(start)))
    }

    fn parse_var_declarators(&mut self) -> Result<Vec<VarDeclarator>, ParseError> {
        let mut decls = vec![self.parse_var_declarator()?];
        while self.eat(&TokenKind::Comma) {
            decls.push(self.parse_var_declarator()?);
        }
        Ok(decls)
    }

    fn parse_var_declarator(&mut self) -> Result<VarDeclarator, ParseError> {
        let start = self.current.span.start;
        let binding = self.parse_binding()?;
        let init = if self.eat(&TokenKind::Eq) {
            Some(self.parse_assign_expr()?)
        } else {
            None
        };
        Ok(VarDeclarator {
            binding,
            init,
            span: self.span_from(start),
        })
    }

    fn parse_binding_ident(&mut self) -> Result<Ident, ParseError> {
        match self.peek() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let span = self.current.span;
                self.advance();
                Ok(Ident::new(name, span))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse a binding pattern.
    fn parse_binding(&mut self) -> Result<Binding, ParseError> {
        let start = self.current.span.start;
        match self.peek() {
            TokenKind::Identifier(_) => {
                let ident = self.parse_binding_ident()?;
                let span = ident.span;
                Ok(Binding::new(BindingKind::Ident(ident), span))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(&TokenKind::RBracket) && !self.is_eof() {
                    if self.eat(&TokenKind::Comma) {
                        elements.push(None);
                        continue;
                    }
                    let rest = self.eat(&TokenKind::Spread);
                    let binding = self.parse_binding()?;
                    let default = if !rest && self.eat(&TokenKind::Eq) {
                        Some(self.parse_assign_expr()?)
                    } else {
                        None
                    };
                    elements.push(Some(ArrayPatternElement {
                        binding,
                        default,
                        rest,
                    }));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(Binding::new(BindingKind::Array(elements), self.span_from(start)))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut properties = Vec::new();
                while !self.check(&TokenKind::RBrace) && !self.is_eof() {
                    if self.eat(&TokenKind::Spread) {
                        let value = self.parse_binding()?;
                        properties.push(ObjectPatternProperty {
                            key: PropertyKey::Ident(String::new()),
                            value,
                            default: None,
                            shorthand: false,
                            rest: true,
                        });
                    } else {
                        let key_span = self.current.span;
                        let shorthand_ok = matches!(self.peek(), TokenKind::Identifier(_));
                        let key = self.parse_property_key()?;
                        let (value, shorthand) = if self.eat(&TokenKind::Colon) {
                            (self.parse_binding()?, false)
                        } else if shorthand_ok {
                            let PropertyKey::Ident(name) = &key else {
                                return Err(self.unexpected());
                            };
                            let ident = Ident::new(name.clone(), key_span);
                            (Binding::new(BindingKind::Ident(ident), key_span), true)
                        } else {
                            return Err(self.unexpected());
                        };
                        let default = if self.eat(&TokenKind::Eq) {
                            Some(self.parse_assign_expr()?)
                        } else {
                            None
                        };
                        properties.push(ObjectPatternProperty {
                            key,
                            value,
                            default,
                            shorthand,
                            rest: false,
                        });
                    }
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace)?;
                Ok(Binding::new(BindingKind::Object(properties), self.span_from(start)))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_property_key(&mut self) -> Result<PropertyKey, ParseError> {
        match self.peek() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(PropertyKey::Ident(name))
            }
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(PropertyKey::String(s))
            }
            TokenKind::Number(n) => {
                let n = *n;
                self.advance();
                Ok(PropertyKey::Number(n))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.parse_assign_expr()?;
                self.expect(&TokenKind::RBracket)?;
                Ok(PropertyKey::Computed(Box::new(expr)))
            }
            kind if kind.is_keyword() => {
                let name = keyword_to_str(kind).to_string();
                self.advance();
                Ok(PropertyKey::Ident(name))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_function_decl(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        let func = self.parse_function(true)?;
        Ok(Stmt::new(StmtKind::Function(Box::new(func)), self.span_from(start)))
    }

    /// Parse `function name?(params) { body }`.
    fn parse_function(&mut self, require_name: bool) -> Result<Function, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Function)?;

        let name = if matches!(self.peek(), TokenKind::Identifier(_)) {
            Some(self.parse_binding_ident()?)
        } else if require_name {
            return Err(self.unexpected());
        } else {
            None
        };

        let params = self.parse_params()?;
        let body = self.parse_function_body()?;

        Ok(Function {
            name,
            params,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_function_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let saved_in = std::mem::replace(&mut self.allow_in, true);
        self.function_depth += 1;
        let body = self.parse_block_body();
        self.function_depth -= 1;
        self.allow_in = saved_in;
        body
    }

    /// Parse `(params)`.
    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_eof() {
            let start = self.current.span.start;
            let rest = self.eat(&TokenKind::Spread);
            let binding = self.parse_binding()?;
            let default = if !rest && self.eat(&TokenKind::Eq) {
                Some(self.parse_assign_expr()?)
            } else {
                None
            };
            params.push(Param {
                binding,
                default,
                rest,
                span: self.span_from(start),
            });
            if rest || !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::If)?;
        let test = self.parse_paren_test()?;
        let consequent = Box::new(self.parse_stmt()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If {
                test,
                consequent,
                alternate,
            },
            self.span_from(start),
        ))
    }

    /// Parse `( expr )`.
    fn parse_paren_test(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        Ok(test)
    }

    fn parse_switch_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Switch)?;
        let discriminant = self.parse_paren_test()?;
        self.expect(&TokenKind::LBrace)?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            let case_start = self.current.span.start;
            let test = if self.eat(&TokenKind::Case) {
                Some(self.parse_expr()?)
            } else if self.eat(&TokenKind::Default) {
                None
            } else {
                return Err(self.unexpected());
            };
            self.expect(&TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !self.check(&TokenKind::Case)
                && !self.check(&TokenKind::Default)
                && !self.check(&TokenKind::RBrace)
                && !self.is_eof()
            {
                consequent.push(self.parse_stmt()?);
            }
            cases.push(SwitchCase {
                test,
                consequent,
                span: self.span_from(case_start),
            });
        }

        self.expect(&TokenKind::RBrace)?;
        Ok(Stmt::new(
            StmtKind::Switch {
                discriminant,
                cases,
            },
            self.span_from(start),
        ))
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::For)?;
        self.expect(&TokenKind::LParen)?;

        let saved_in = std::mem::replace(&mut self.allow_in, false);
        let init = self.parse_for_init();
        self.allow_in = saved_in;
        let init = init?;

        if self.eat(&TokenKind::In) {
            let left = init.ok_or_else(|| self.unexpected())?;
            let right = self.parse_expr()?;
            self.expect(&TokenKind::RParen)?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::new(
                StmtKind::ForIn { left, right, body },
                self.span_from(start),
            ));
        }

        if matches!(self.peek(), TokenKind::Identifier(id) if id == "of") {
            self.advance();
            let left = init.ok_or_else(|| self.unexpected())?;
            let right = self.parse_assign_expr()?;
            self.expect(&TokenKind::RParen)?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::new(
                StmtKind::ForOf { left, right, body },
                self.span_from(start),
            ));
        }

        self.expect(&TokenKind::Semicolon)?;
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_stmt()?);

        Ok(Stmt::new(
            StmtKind::For {
                init,
                test,
                update,
                body,
            },
            self.span_from(start),
        ))
    }

    fn parse_for_init(&mut self) -> Result<Option<ForInit>, ParseError> {
        if self.check(&TokenKind::Semicolon) {
            return Ok(None);
        }
        if matches!(self.peek(), TokenKind::Var | TokenKind::Let | TokenKind::Const) {
            let kind = self.parse_var_kind()?;
            let decls = self.parse_var_declarators()?;
            return Ok(Some(ForInit::Var { kind, decls }));
        }
        Ok(Some(ForInit::Expr(self.parse_expr()?)))
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::While)?;
        let test = self.parse_paren_test()?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::new(StmtKind::While { test, body }, self.span_from(start)))
    }

    fn parse_do_while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Do)?;
        let body = Box::new(self.parse_stmt()?);
        self.expect(&TokenKind::While)?;
        let test = self.parse_paren_test()?;
        // A semicolon after `do ... while (x)` is always optional.
        self.eat(&TokenKind::Semicolon);
        Ok(Stmt::new(StmtKind::DoWhile { body, test }, self.span_from(start)))
    }

    /// Parse `break` or `continue` with an optional label on the same line.
    fn parse_jump_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        let is_break = self.check(&TokenKind::Break);
        self.advance();
        let label = match self.peek() {
            TokenKind::Identifier(name) if !self.current.had_newline_before => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        self.expect_semicolon()?;
        let kind = if is_break {
            StmtKind::Break { label }
        } else {
            StmtKind::Continue { label }
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        if self.function_depth == 0 && !self.bare_returns {
            return Err(self.error("'return' outside of function", self.current.span));
        }
        self.expect(&TokenKind::Return)?;
        let arg = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_semicolon()?;
        Ok(Stmt::new(StmtKind::Return { arg }, self.span_from(start)))
    }

    fn parse_throw_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Throw)?;
        if self.current.had_newline_before {
            return Err(self.error("Illegal newline after throw", self.current.span));
        }
        let arg = self.parse_expr()?;
        self.expect_semicolon()?;
        Ok(Stmt::new(StmtKind::Throw { arg }, self.span_from(start)))
    }

    fn parse_try_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Try)?;
        let block = self.parse_block_body()?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.current.span.start;
            self.advance();
            let param = if self.eat(&TokenKind::LParen) {
                let binding = self.parse_binding()?;
                self.expect(&TokenKind::RParen)?;
                Some(binding)
            } else {
                None
            };
            let body = self.parse_block_body()?;
            Some(CatchClause {
                param,
                body,
                span: self.span_from(catch_start),
            })
        } else {
            None
        };

        let finalizer = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block_body()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try", self.current.span));
        }

        Ok(Stmt::new(
            StmtKind::Try {
                block,
                handler,
                finalizer,
            },
            self.span_from(start),
        ))
    }

    fn parse_with_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::With)?;
        let object = self.parse_paren_test()?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::new(StmtKind::With { object, body }, self.span_from(start)))
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        let expr = self.parse_expr()?;
        self.expect_semicolon()?;
        Ok(Stmt::new(StmtKind::Expr(expr), self.span_from(start)))
    }

    // =========================================================================
    // Expression Parsing
    // =========================================================================

    /// Parse an expression (with comma operator).
    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let first = self.parse_assign_expr()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.parse_assign_expr()?);
        }
        Ok(Expr::new(ExprKind::Sequence(exprs), self.span_from(start)))
    }

    /// Parse an assignment expression (including arrow functions).
    fn parse_assign_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;

        if matches!(self.peek(), TokenKind::Identifier(_))
            && matches!(self.lexer.peek().kind, TokenKind::Arrow)
        {
            let binding = self.parse_binding()?;
            let param = Param {
                span: binding.span,
                binding,
                default: None,
                rest: false,
            };
            return self.parse_arrow_rest(vec![param], start);
        }

        if self.check(&TokenKind::LParen) && self.is_arrow_ahead() {
            let params = self.parse_params()?;
            return self.parse_arrow_rest(params, start);
        }

        let left = self.parse_conditional_expr()?;

        if let Some(op) = self.get_assign_op() {
            if !is_assign_target(&left, op) {
                return Err(self.error("Invalid assignment target", left.span));
            }
            self.advance();
            let right = self.parse_assign_expr()?;
            return Ok(Expr::new(
                ExprKind::Assign {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                self.span_from(start),
            ));
        }

        Ok(left)
    }

    /// With the current token on `(`, decide whether the matching `)` is
    /// followed by `=>`.
    fn is_arrow_ahead(&self) -> bool {
        let mut lexer = self.lexer.clone();
        let mut depth = 1u32;
        loop {
            let token = lexer.next_token();
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        let next = lexer.next_token();
                        return matches!(next.kind, TokenKind::Arrow) && !next.had_newline_before;
                    }
                }
                TokenKind::Eof | TokenKind::Invalid(_) => return false,
                _ => {}
            }
        }
    }

    /// Parse `=> body` once the parameters are known.
    fn parse_arrow_rest(&mut self, params: Vec<Param>, start: u32) -> Result<Expr, ParseError> {
        if self.current.had_newline_before {
            return Err(self.unexpected());
        }
        self.expect(&TokenKind::Arrow)?;
        let body = if self.check(&TokenKind::LBrace) {
            ArrowBody::Block(self.parse_function_body()?)
        } else {
            self.function_depth += 1;
            let body = self.parse_assign_expr();
            self.function_depth -= 1;
            ArrowBody::Expr(Box::new(body?))
        };
        let span = self.span_from(start);
        Ok(Expr::new(
            ExprKind::Arrow(Box::new(ArrowFunction { params, body, span })),
            span,
        ))
    }

    fn get_assign_op(&self) -> Option<AssignOp> {
        match self.peek() {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::AddAssign),
            TokenKind::MinusEq => Some(AssignOp::SubAssign),
            TokenKind::StarEq => Some(AssignOp::MulAssign),
            TokenKind::SlashEq => Some(AssignOp::DivAssign),
            TokenKind::PercentEq => Some(AssignOp::ModAssign),
            TokenKind::StarStarEq => Some(AssignOp::PowAssign),
            TokenKind::LtLtEq => Some(AssignOp::ShlAssign),
            TokenKind::GtGtEq => Some(AssignOp::ShrAssign),
            TokenKind::GtGtGtEq => Some(AssignOp::UShrAssign),
            TokenKind::PipeEq => Some(AssignOp::BitOrAssign),
            TokenKind::CaretEq => Some(AssignOp::BitXorAssign),
            TokenKind::AmpEq => Some(AssignOp::BitAndAssign),
            TokenKind::AmpAmpEq => Some(AssignOp::AndAssign),
            TokenKind::PipePipeEq => Some(AssignOp::OrAssign),
            TokenKind::QuestionQuestionEq => Some(AssignOp::NullishAssign),
            _ => None,
        }
    }

    /// Parse conditional expression (ternary).
    fn parse_conditional_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let test = self.parse_binary_expr(0)?;

        if self.eat(&TokenKind::Question) {
            let saved_in = std::mem::replace(&mut self.allow_in, true);
            let consequent = self.parse_assign_expr();
            self.allow_in = saved_in;
            let consequent = consequent?;
            self.expect(&TokenKind::Colon)?;
            let alternate = self.parse_assign_expr()?;
            return Ok(Expr::new(
                ExprKind::Conditional {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                },
                self.span_from(start),
            ));
        }

        Ok(test)
    }

    /// Parse binary expression using precedence climbing.
    fn parse_binary_expr(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let mut left = self.parse_unary_expr()?;

        loop {
            let Some(prec) = self.peek().binary_precedence() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let Some(op) = self.get_binary_op() else {
                break;
            };
            let is_right_assoc = self.peek().is_right_associative();
            self.advance();

            let next_prec = if is_right_assoc { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next_prec)?;

            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                self.span_from(start),
            );
        }

        Ok(left)
    }

    fn get_binary_op(&self) -> Option<BinaryOp> {
        match self.peek() {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Mod),
            TokenKind::StarStar => Some(BinaryOp::Pow),
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::BangEq => Some(BinaryOp::NotEq),
            TokenKind::EqEqEq => Some(BinaryOp::StrictEq),
            TokenKind::BangEqEq => Some(BinaryOp::StrictNotEq),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::LtEq),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::GtEq),
            TokenKind::Pipe => Some(BinaryOp::BitOr),
            TokenKind::Caret => Some(BinaryOp::BitXor),
            TokenKind::Amp => Some(BinaryOp::BitAnd),
            TokenKind::LtLt => Some(BinaryOp::Shl),
            TokenKind::GtGt => Some(BinaryOp::Shr),
            TokenKind::GtGtGt => Some(BinaryOp::UShr),
            TokenKind::AmpAmp => Some(BinaryOp::And),
            TokenKind::PipePipe => Some(BinaryOp::Or),
            TokenKind::QuestionQuestion => Some(BinaryOp::NullishCoalesce),
            TokenKind::In if self.allow_in => Some(BinaryOp::In),
            TokenKind::Instanceof => Some(BinaryOp::Instanceof),
            _ => None,
        }
    }

    /// Parse unary expression.
    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;

        let op = match self.peek() {
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let arg = self.parse_unary_expr()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    arg: Box::new(arg),
                },
                self.span_from(start),
            ));
        }

        if matches!(self.peek(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op = if self.check(&TokenKind::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            let arg = self.parse_unary_expr()?;
            if !is_simple_target(&arg) {
                return Err(self.error("Invalid update target", arg.span));
            }
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: true,
                    arg: Box::new(arg),
                },
                self.span_from(start),
            ));
        }

        self.parse_postfix_expr()
    }

    /// Parse postfix expression.
    fn parse_postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let expr = self.parse_left_hand_side_expr()?;

        if matches!(self.peek(), TokenKind::PlusPlus | TokenKind::MinusMinus)
            && !self.current.had_newline_before
        {
            if !is_simple_target(&expr) {
                return Err(self.error("Invalid update target", expr.span));
            }
            let op = if self.check(&TokenKind::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: false,
                    arg: Box::new(expr),
                },
                self.span_from(start),
            ));
        }

        Ok(expr)
    }

    /// Parse left-hand-side expression (new, call, member access).
    fn parse_left_hand_side_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expr()?
        } else {
            self.parse_primary_expr()?
        };

        loop {
            match self.peek() {
                TokenKind::Dot | TokenKind::LBracket => {
                    expr = self.parse_member_suffix(expr, start)?;
                }
                TokenKind::LParen => {
                    let args = self.parse_arguments()?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        self.span_from(start),
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parse `new Callee(args)`; the callee takes member accesses but no calls.
    fn parse_new_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::New)?;
        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new_expr()?
        } else {
            self.parse_primary_expr()?
        };
        while matches!(self.peek(), TokenKind::Dot | TokenKind::LBracket) {
            callee = self.parse_member_suffix(callee, start)?;
        }
        let args = if self.check(&TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            self.span_from(start),
        ))
    }

    /// Parse one `.name` or `[expr]` suffix.
    fn parse_member_suffix(&mut self, object: Expr, start: u32) -> Result<Expr, ParseError> {
        let property = if self.eat(&TokenKind::Dot) {
            let name = match self.peek() {
                TokenKind::Identifier(name) => name.clone(),
                kind if kind.is_keyword() => keyword_to_str(kind).to_string(),
                _ => return Err(self.unexpected()),
            };
            self.advance();
            MemberProp::Name(name)
        } else {
            self.expect(&TokenKind::LBracket)?;
            let saved_in = std::mem::replace(&mut self.allow_in, true);
            let property = self.parse_expr();
            self.allow_in = saved_in;
            let property = property?;
            self.expect(&TokenKind::RBracket)?;
            MemberProp::Computed(Box::new(property))
        };
        Ok(Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                property,
            },
            self.span_from(start),
        ))
    }

    /// Parse call arguments.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let saved_in = std::mem::replace(&mut self.allow_in, true);
        let args = self.parse_arguments_inner();
        self.allow_in = saved_in;
        let args = args?;
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_arguments_inner(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_eof() {
            args.push(self.parse_spread_or_assign()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_spread_or_assign(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        if self.eat(&TokenKind::Spread) {
            let arg = self.parse_assign_expr()?;
            return Ok(Expr::new(ExprKind::Spread(Box::new(arg)), self.span_from(start)));
        }
        self.parse_assign_expr()
    }

    /// Parse primary expression.
    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;

        let kind = match self.peek() {
            TokenKind::Null => ExprKind::Null,
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::This => ExprKind::This,
            TokenKind::Number(n) => ExprKind::Number(*n),
            TokenKind::String(s) => ExprKind::String(s.clone()),
            TokenKind::Regex { pattern, flags } => ExprKind::Regex {
                pattern: pattern.clone(),
                flags: flags.clone(),
            },
            TokenKind::Identifier(name) => {
                ExprKind::Ident(Ident::new(name.clone(), self.current.span))
            }
            TokenKind::Function => {
                let func = self.parse_function(false)?;
                return Ok(Expr::new(ExprKind::Function(Box::new(func)), self.span_from(start)));
            }
            TokenKind::LParen => {
                self.advance();
                let saved_in = std::mem::replace(&mut self.allow_in, true);
                let expr = self.parse_expr();
                self.allow_in = saved_in;
                let mut expr = expr?;
                self.expect(&TokenKind::RParen)?;
                expr.span = self.span_from(start);
                return Ok(expr);
            }
            TokenKind::LBracket => return self.parse_array_literal(),
            TokenKind::LBrace => return self.parse_object_literal(),
            TokenKind::TemplateNoSub(_) | TokenKind::TemplateHead(_) => {
                return self.parse_template_literal();
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LBracket)?;
        let saved_in = std::mem::replace(&mut self.allow_in, true);

        let mut elements = Vec::new();
        let result = loop {
            if self.check(&TokenKind::RBracket) || self.is_eof() {
                break Ok(());
            }
            if self.eat(&TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            match self.parse_spread_or_assign() {
                Ok(expr) => elements.push(Some(expr)),
                Err(err) => break Err(err),
            }
            if !self.eat(&TokenKind::Comma) {
                break Ok(());
            }
        };
        self.allow_in = saved_in;
        result?;

        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::new(ExprKind::Array(elements), self.span_from(start)))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LBrace)?;
        let saved_in = std::mem::replace(&mut self.allow_in, true);

        let mut properties = Vec::new();
        let result = loop {
            if self.check(&TokenKind::RBrace) || self.is_eof() {
                break Ok(());
            }
            match self.parse_object_property() {
                Ok(prop) => properties.push(prop),
                Err(err) => break Err(err),
            }
            if !self.eat(&TokenKind::Comma) {
                break Ok(());
            }
        };
        self.allow_in = saved_in;
        result?;

        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::Object(properties), self.span_from(start)))
    }

    fn parse_object_property(&mut self) -> Result<Property, ParseError> {
        let start = self.current.span.start;

        if self.eat(&TokenKind::Spread) {
            let arg = self.parse_assign_expr()?;
            return Ok(Property {
                key: PropertyKey::Ident(String::new()),
                value: arg,
                kind: PropertyKind::Spread,
                shorthand: false,
                span: self.span_from(start),
            });
        }

        // `get name() {}` / `set name(v) {}`; `get: 1` and `get() {}` are plain keys.
        let mut kind = PropertyKind::Init;
        if let TokenKind::Identifier(word) = self.peek() {
            if (word == "get" || word == "set")
                && !matches!(
                    self.lexer.peek().kind,
                    TokenKind::LParen | TokenKind::Colon | TokenKind::Comma | TokenKind::RBrace | TokenKind::Eq
                )
            {
                kind = if word == "get" {
                    PropertyKind::Get
                } else {
                    PropertyKind::Set
                };
                self.advance();
            }
        }

        let key_span = self.current.span;
        let shorthand_ok = matches!(self.peek(), TokenKind::Identifier(_));
        let key = self.parse_property_key()?;

        if self.check(&TokenKind::LParen) {
            let params = self.parse_params()?;
            let body = self.parse_function_body()?;
            let span = self.span_from(start);
            let func = Function {
                name: None,
                params,
                body,
                span,
            };
            return Ok(Property {
                key,
                value: Expr::new(ExprKind::Function(Box::new(func)), span),
                kind: if kind == PropertyKind::Init {
                    PropertyKind::Method
                } else {
                    kind
                },
                shorthand: false,
                span,
            });
        }
        if kind != PropertyKind::Init {
            return Err(self.unexpected());
        }

        if self.eat(&TokenKind::Colon) {
            let value = self.parse_assign_expr()?;
            return Ok(Property {
                key,
                value,
                kind,
                shorthand: false,
                span: self.span_from(start),
            });
        }

        let PropertyKey::Ident(name) = &key else {
            return Err(self.unexpected());
        };
        if !shorthand_ok {
            return Err(self.unexpected());
        }
        let ident = Expr::new(ExprKind::Ident(Ident::new(name.clone(), key_span)), key_span);

        // `{ key = value }` only appears in destructuring assignment targets.
        let value = if self.eat(&TokenKind::Eq) {
            let default = self.parse_assign_expr()?;
            Expr::new(
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    left: Box::new(ident),
                    right: Box::new(default),
                },
                self.span_from(start),
            )
        } else {
            ident
        };

        Ok(Property {
            key,
            value,
            kind,
            shorthand: true,
            span: self.span_from(start),
        })
    }

    fn parse_template_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let head = self.advance();
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();

        match head.kind {
            TokenKind::TemplateNoSub(s) => quasis.push(s),
            TokenKind::TemplateHead(s) => {
                quasis.push(s);
                loop {
                    let saved_in = std::mem::replace(&mut self.allow_in, true);
                    let expr = self.parse_expr();
                    self.allow_in = saved_in;
                    exprs.push(expr?);
                    if !self.check(&TokenKind::RBrace) {
                        return Err(self.unexpected());
                    }
                    self.current = self.lexer.scan_template_continuation();
                    match self.advance().kind {
                        TokenKind::TemplateMiddle(s) => quasis.push(s),
                        TokenKind::TemplateTail(s) => {
                            quasis.push(s);
                            break;
                        }
                        _ => {
                            return Err(self.error(
                                "Unterminated template literal",
                                self.span_from(start),
                            ))
                        }
                    }
                }
            }
            _ => return Err(self.unexpected()),
        }

        Ok(Expr::new(ExprKind::Template { quasis, exprs }, self.span_from(start)))
    }
}

/// Whether `expr` may appear on the left of `op`.
fn is_assign_target(expr: &Expr, op: AssignOp) -> bool {
    match &expr.kind {
        ExprKind::Array(_) | ExprKind::Object(_) => op == AssignOp::Assign,
        _ => is_simple_target(expr),
    }
}

fn is_simple_target(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Ident(_) | ExprKind::Member { .. })
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Identifier(name) => format!("identifier '{name}'"),
        TokenKind::String(_) => "string literal".to_string(),
        TokenKind::Number(_) => "number literal".to_string(),
        TokenKind::Regex { .. } => "regular expression".to_string(),
        TokenKind::TemplateNoSub(_)
        | TokenKind::TemplateHead(_)
        | TokenKind::TemplateMiddle(_)
        | TokenKind::TemplateTail(_) => "template literal".to_string(),
        other if other.is_keyword() => format!("keyword '{}'", keyword_to_str(other)),
        other => format!("{other:?}"),
    }
}
