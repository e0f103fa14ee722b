//! JavaScript code generator.
//!
//! Converts a program back to JavaScript source, either as compact output
//! or beautified with indentation. When source maps are enabled, every
//! emitted token that came from a unit records a [`RawMapping`] pointing at
//! its program-wide offset; resolving offsets to unit/line/column is left to
//! the caller, which owns the unit texts.

use crate::ast::*;
use crate::span::Span;

/// Code generation options.
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Emit readable output instead of compact output.
    pub beautify: bool,
    /// Indent string used when beautifying.
    pub indent: String,
    /// Record mappings while generating.
    pub source_map: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            beautify: false,
            indent: "  ".to_string(),
            source_map: false,
        }
    }
}

/// A mapping from a generated position to an original program offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMapping {
    /// Generated line (0-indexed).
    pub gen_line: u32,
    /// Generated column in UTF-16 code units (0-indexed).
    pub gen_col: u32,
    /// Offset in the program-wide position space.
    pub orig_offset: u32,
    /// Original identifier name, for renamed symbols.
    pub name: Option<String>,
}

/// The code generator.
pub struct Codegen<'a> {
    program: &'a Program,
    options: CodegenOptions,
    output: String,
    indent_level: usize,
    /// Statement terminator waiting for the next token (compact mode).
    needs_semicolon: bool,
    /// Inside a `for(;;)` head, where a bare `in` must be parenthesized.
    no_in: bool,
    line: u32,
    col: u32,
    mappings: Vec<RawMapping>,
}

impl<'a> Codegen<'a> {
    /// Create a new code generator.
    pub fn new(program: &'a Program, options: CodegenOptions) -> Self {
        Self {
            program,
            options,
            output: String::new(),
            indent_level: 0,
            needs_semicolon: false,
            no_in: false,
            line: 0,
            col: 0,
            mappings: Vec::new(),
        }
    }

    /// Generate JavaScript source code.
    pub fn generate(self) -> String {
        self.generate_with_mappings().0
    }

    /// Generate JavaScript source code and the recorded mappings.
    pub fn generate_with_mappings(mut self) -> (String, Vec<RawMapping>) {
        let program = self.program;
        for (i, stmt) in program.body.iter().enumerate() {
            if i > 0 && self.options.beautify {
                self.emit_newline();
            }
            self.emit_stmt(stmt);
        }
        if self.options.beautify && !self.output.is_empty() {
            self.push("\n");
        }
        (self.output, self.mappings)
    }

    // =========================================================================
    // Output Helpers
    // =========================================================================

    /// Append raw text, tracking the generated line and UTF-16 column.
    fn push(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += c.len_utf16() as u32;
            }
        }
        self.output.push_str(s);
    }

    /// Flush a pending semicolon and separate tokens that would otherwise merge.
    fn prepare(&mut self, s: &str) {
        let Some(first) = s.chars().next() else {
            return;
        };
        if self.needs_semicolon {
            self.needs_semicolon = false;
            if first != '}' {
                self.push(";");
            }
        }
        if let Some(last) = self.output.chars().next_back() {
            let merges = (is_word_char(last) && is_word_char(first))
                || (last == '+' && first == '+')
                || (last == '-' && first == '-')
                || (last == '/' && first == '/');
            if merges {
                self.push(" ");
            }
        }
    }

    fn emit(&mut self, s: &str) {
        self.prepare(s);
        self.push(s);
    }

    fn emit_mapped(&mut self, s: &str, span: Span, name: Option<&str>) {
        self.prepare(s);
        if self.options.source_map && !span.is_synthetic() {
            self.mappings.push(RawMapping {
                gen_line: self.line,
                gen_col: self.col,
                orig_offset: span.start,
                name: name.map(str::to_string),
            });
        }
        self.push(s);
    }

    fn emit_space(&mut self) {
        if self.options.beautify {
            self.push(" ");
        }
    }

    fn emit_newline(&mut self) {
        if self.options.beautify {
            self.push("\n");
            for _ in 0..self.indent_level {
                let indent = self.options.indent.clone();
                self.push(&indent);
            }
        }
    }

    fn emit_semicolon(&mut self) {
        if self.options.beautify {
            self.push(";");
        } else {
            self.needs_semicolon = true;
        }
    }

    fn emit_comma(&mut self) {
        self.emit(",");
        self.emit_space();
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    // =========================================================================
    // Statement Emission
    // =========================================================================

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Var { kind, decls } => {
                self.emit_mapped(kind.as_str(), stmt.span, None);
                self.emit(" ");
                self.emit_var_decls(decls);
                self.emit_semicolon();
            }
            StmtKind::Function(func) => self.emit_function(func),
            StmtKind::Block(stmts) => self.emit_block(stmts),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.emit_mapped("if", stmt.span, None);
                self.emit_paren_expr(test);
                self.emit_body(consequent);
                if let Some(alt) = alternate {
                    self.emit_space();
                    self.emit("else");
                    self.emit_space();
                    self.emit_stmt(alt);
                }
            }
            StmtKind::Switch {
                discriminant,
                cases,
            } => {
                self.emit_mapped("switch", stmt.span, None);
                self.emit_paren_expr(discriminant);
                self.emit_space();
                self.emit("{");
                self.indent();
                for case in cases {
                    self.emit_newline();
                    if let Some(test) = &case.test {
                        self.emit_mapped("case", case.span, None);
                        self.emit(" ");
                        self.emit_expr(test);
                    } else {
                        self.emit_mapped("default", case.span, None);
                    }
                    self.emit(":");
                    self.indent();
                    for stmt in &case.consequent {
                        self.emit_newline();
                        self.emit_stmt(stmt);
                    }
                    self.dedent();
                }
                self.dedent();
                self.emit_newline();
                self.emit("}");
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.emit_mapped("for", stmt.span, None);
                self.emit_space();
                self.emit("(");
                if let Some(init) = init {
                    let saved = std::mem::replace(&mut self.no_in, true);
                    self.emit_for_init(init);
                    self.no_in = saved;
                }
                self.emit(";");
                if let Some(test) = test {
                    self.emit_space();
                    self.emit_expr(test);
                }
                self.emit(";");
                if let Some(update) = update {
                    self.emit_space();
                    self.emit_expr(update);
                }
                self.emit(")");
                self.emit_body(body);
            }
            StmtKind::ForIn { left, right, body } | StmtKind::ForOf { left, right, body } => {
                let keyword = if matches!(stmt.kind, StmtKind::ForIn { .. }) {
                    "in"
                } else {
                    "of"
                };
                self.emit_mapped("for", stmt.span, None);
                self.emit_space();
                self.emit("(");
                let saved = std::mem::replace(&mut self.no_in, true);
                self.emit_for_init(left);
                self.no_in = saved;
                self.emit(" ");
                self.emit(keyword);
                self.emit(" ");
                self.emit_expr(right);
                self.emit(")");
                self.emit_body(body);
            }
            StmtKind::While { test, body } => {
                self.emit_mapped("while", stmt.span, None);
                self.emit_paren_expr(test);
                self.emit_body(body);
            }
            StmtKind::DoWhile { body, test } => {
                self.emit_mapped("do", stmt.span, None);
                self.emit_body(body);
                self.emit_space();
                self.emit("while");
                self.emit_paren_expr(test);
                self.emit_semicolon();
            }
            StmtKind::Break { label } | StmtKind::Continue { label } => {
                let keyword = if matches!(stmt.kind, StmtKind::Break { .. }) {
                    "break"
                } else {
                    "continue"
                };
                self.emit_mapped(keyword, stmt.span, None);
                if let Some(label) = label {
                    self.emit(" ");
                    self.emit(label);
                }
                self.emit_semicolon();
            }
            StmtKind::Return { arg } => {
                self.emit_mapped("return", stmt.span, None);
                if let Some(arg) = arg {
                    self.emit_space();
                    self.emit_expr(arg);
                }
                self.emit_semicolon();
            }
            StmtKind::Throw { arg } => {
                self.emit_mapped("throw", stmt.span, None);
                self.emit_space();
                self.emit_expr(arg);
                self.emit_semicolon();
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.emit_mapped("try", stmt.span, None);
                self.emit_space();
                self.emit_block(block);
                if let Some(catch) = handler {
                    self.emit_space();
                    self.emit_mapped("catch", catch.span, None);
                    if let Some(param) = &catch.param {
                        self.emit_space();
                        self.emit("(");
                        self.emit_binding(param);
                        self.emit(")");
                    }
                    self.emit_space();
                    self.emit_block(&catch.body);
                }
                if let Some(finally) = finalizer {
                    self.emit_space();
                    self.emit("finally");
                    self.emit_space();
                    self.emit_block(finally);
                }
            }
            StmtKind::Labeled { label, body } => {
                self.emit_mapped(label, stmt.span, None);
                self.emit(":");
                self.emit_space();
                self.emit_stmt(body);
            }
            StmtKind::With { object, body } => {
                self.emit_mapped("with", stmt.span, None);
                self.emit_paren_expr(object);
                self.emit_body(body);
            }
            StmtKind::Expr(expr) => {
                if starts_with_brace_or_function(expr) {
                    self.emit("(");
                    self.emit_expr(expr);
                    self.emit(")");
                } else {
                    self.emit_expr(expr);
                }
                self.emit_semicolon();
            }
            StmtKind::Empty => self.emit(";"),
            StmtKind::Debugger => {
                self.emit_mapped("debugger", stmt.span, None);
                self.emit_semicolon();
            }
        }
    }

    /// Body of a control statement: `;` for an empty body.
    fn emit_body(&mut self, body: &Stmt) {
        if matches!(body.kind, StmtKind::Empty) {
            self.emit(";");
        } else {
            self.emit_space();
            self.emit_stmt(body);
        }
    }

    fn emit_paren_expr(&mut self, expr: &Expr) {
        self.emit_space();
        self.emit("(");
        self.emit_expr(expr);
        self.emit(")");
    }

    fn emit_block(&mut self, stmts: &[Stmt]) {
        self.emit("{");
        if !stmts.is_empty() {
            self.indent();
            for stmt in stmts {
                self.emit_newline();
                self.emit_stmt(stmt);
            }
            self.dedent();
            self.emit_newline();
        }
        self.emit("}");
    }

    fn emit_var_decls(&mut self, decls: &[VarDeclarator]) {
        for (i, decl) in decls.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            self.emit_binding(&decl.binding);
            if let Some(init) = &decl.init {
                self.emit_space();
                self.emit("=");
                self.emit_space();
                self.emit_expr_with_prec(init, 2);
            }
        }
    }

    fn emit_for_init(&mut self, init: &ForInit) {
        match init {
            ForInit::Var { kind, decls } => {
                self.emit(kind.as_str());
                self.emit(" ");
                self.emit_var_decls(decls);
            }
            ForInit::Expr(expr) => self.emit_expr(expr),
        }
    }

    fn emit_ident(&mut self, ident: &Ident) {
        self.emit_mapped(ident.output_name(), ident.span, Some(&ident.name));
    }

    fn emit_binding(&mut self, binding: &Binding) {
        match &binding.kind {
            BindingKind::Ident(ident) => self.emit_ident(ident),
            BindingKind::Array(elements) => {
                self.emit("[");
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        self.emit(",");
                    }
                    if let Some(elem) = elem {
                        if elem.rest {
                            self.emit("...");
                        }
                        self.emit_binding(&elem.binding);
                        self.emit_default(elem.default.as_ref());
                    }
                }
                // A trailing hole needs its own comma.
                if matches!(elements.last(), Some(None)) {
                    self.emit(",");
                }
                self.emit("]");
            }
            BindingKind::Object(properties) => {
                self.emit("{");
                for (i, prop) in properties.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    if prop.rest {
                        self.emit("...");
                        self.emit_binding(&prop.value);
                        continue;
                    }
                    let shorthand = prop.shorthand
                        && matches!(
                            (&prop.key, &prop.value.kind),
                            (PropertyKey::Ident(key), BindingKind::Ident(value)) if key == value.output_name()
                        );
                    if !shorthand {
                        self.emit_property_key(&prop.key);
                        self.emit(":");
                        self.emit_space();
                    }
                    self.emit_binding(&prop.value);
                    self.emit_default(prop.default.as_ref());
                }
                self.emit("}");
            }
        }
    }

    fn emit_default(&mut self, default: Option<&Expr>) {
        if let Some(default) = default {
            self.emit_space();
            self.emit("=");
            self.emit_space();
            self.emit_expr_with_prec(default, 2);
        }
    }

    fn emit_params(&mut self, params: &[Param]) {
        self.emit("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            if param.rest {
                self.emit("...");
            }
            self.emit_binding(&param.binding);
            self.emit_default(param.default.as_ref());
        }
        self.emit(")");
    }

    fn emit_function(&mut self, func: &Function) {
        self.emit_mapped("function", func.span, None);
        if let Some(name) = &func.name {
            self.emit(" ");
            self.emit_ident(name);
        }
        self.emit_params(&func.params);
        self.emit_space();
        self.emit_function_body(&func.body);
    }

    fn emit_function_body(&mut self, body: &[Stmt]) {
        let saved = std::mem::replace(&mut self.no_in, false);
        self.emit_block(body);
        self.no_in = saved;
    }

    fn emit_arrow(&mut self, arrow: &ArrowFunction) {
        let simple = matches!(
            arrow.params.as_slice(),
            [Param { binding: Binding { kind: BindingKind::Ident(_), .. }, default: None, rest: false, .. }]
        );
        if simple {
            if let BindingKind::Ident(ident) = &arrow.params[0].binding.kind {
                self.emit_ident(ident);
            }
        } else {
            self.emit_params(&arrow.params);
        }
        self.emit_space();
        self.emit("=>");
        self.emit_space();
        match &arrow.body {
            ArrowBody::Block(body) => self.emit_function_body(body),
            ArrowBody::Expr(body) => {
                if starts_with_brace_or_function(body) {
                    self.emit("(");
                    self.emit_expr(body);
                    self.emit(")");
                } else {
                    let saved = std::mem::replace(&mut self.no_in, false);
                    self.emit_expr_with_prec(body, 2);
                    self.no_in = saved;
                }
            }
        }
    }

    fn emit_property_key(&mut self, key: &PropertyKey) {
        match key {
            PropertyKey::Ident(name) => self.emit(name),
            PropertyKey::String(s) => self.emit(&quote_string(s)),
            PropertyKey::Number(n) => self.emit(&format_number(*n)),
            PropertyKey::Computed(expr) => {
                self.emit("[");
                self.emit_expr_with_prec(expr, 2);
                self.emit("]");
            }
        }
    }

    fn emit_object_property(&mut self, prop: &Property) {
        match prop.kind {
            PropertyKind::Spread => {
                self.emit("...");
                self.emit_expr_with_prec(&prop.value, 2);
            }
            PropertyKind::Get | PropertyKind::Set | PropertyKind::Method => {
                if prop.kind == PropertyKind::Get {
                    self.emit("get ");
                } else if prop.kind == PropertyKind::Set {
                    self.emit("set ");
                }
                self.emit_property_key(&prop.key);
                if let ExprKind::Function(func) = &prop.value.kind {
                    self.emit_params(&func.params);
                    self.emit_space();
                    self.emit_function_body(&func.body);
                }
            }
            PropertyKind::Init => {
                if prop.shorthand {
                    if let PropertyKey::Ident(key) = &prop.key {
                        match &prop.value.kind {
                            ExprKind::Ident(ident) if ident.output_name() == key => {
                                self.emit_ident(ident);
                                return;
                            }
                            ExprKind::Assign { left, right, .. } => {
                                if let ExprKind::Ident(ident) = &left.kind {
                                    if ident.output_name() == key {
                                        self.emit_ident(ident);
                                        self.emit_default(Some(right));
                                        return;
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
                self.emit_property_key(&prop.key);
                self.emit(":");
                self.emit_space();
                self.emit_expr_with_prec(&prop.value, 2);
            }
        }
    }

    // =========================================================================
    // Expression Emission
    // =========================================================================

    fn emit_expr(&mut self, expr: &Expr) {
        self.emit_expr_with_prec(expr, 0);
    }

    fn emit_args(&mut self, args: &[Expr]) {
        self.emit("(");
        let saved = std::mem::replace(&mut self.no_in, false);
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            self.emit_expr_with_prec(arg, 2);
        }
        self.no_in = saved;
        self.emit(")");
    }

    fn emit_expr_with_prec(&mut self, expr: &Expr, min_prec: u8) {
        match &expr.kind {
            ExprKind::Null => self.emit_mapped("null", expr.span, None),
            ExprKind::Bool(b) => self.emit_mapped(if *b { "true" } else { "false" }, expr.span, None),
            ExprKind::Number(n) => {
                let n = *n;
                if n.is_nan() {
                    self.emit_mapped("NaN", expr.span, None);
                } else if n.is_infinite() {
                    // `Infinity` can be shadowed
                    let wrap = min_prec > 13;
                    if wrap {
                        self.emit("(");
                    }
                    self.emit_mapped(if n < 0.0 { "-1/0" } else { "1/0" }, expr.span, None);
                    if wrap {
                        self.emit(")");
                    }
                } else if n < 0.0 || (n == 0.0 && n.is_sign_negative()) {
                    let wrap = min_prec > 15;
                    if wrap {
                        self.emit("(");
                    }
                    self.emit_mapped("-", expr.span, None);
                    self.emit(&format_number(-n));
                    if wrap {
                        self.emit(")");
                    }
                } else {
                    self.emit_mapped(&format_number(n), expr.span, None);
                }
            }
            ExprKind::String(s) => self.emit_mapped(&quote_string(s), expr.span, None),
            ExprKind::Regex { pattern, flags } => {
                self.emit_mapped("/", expr.span, None);
                self.push(pattern);
                self.push("/");
                self.push(flags);
            }
            ExprKind::Template { quasis, exprs } => {
                self.emit_mapped("`", expr.span, None);
                for (i, quasi) in quasis.iter().enumerate() {
                    self.push(&escape_template(quasi));
                    if let Some(e) = exprs.get(i) {
                        self.push("${");
                        let saved = std::mem::replace(&mut self.no_in, false);
                        self.emit_expr(e);
                        self.no_in = saved;
                        self.push("}");
                    }
                }
                self.push("`");
            }
            ExprKind::Ident(ident) => self.emit_ident(ident),
            ExprKind::This => self.emit_mapped("this", expr.span, None),
            ExprKind::Array(elements) => {
                self.emit_mapped("[", expr.span, None);
                let saved = std::mem::replace(&mut self.no_in, false);
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    if let Some(elem) = elem {
                        self.emit_expr_with_prec(elem, 2);
                    }
                }
                if matches!(elements.last(), Some(None)) {
                    self.emit(",");
                }
                self.no_in = saved;
                self.emit("]");
            }
            ExprKind::Object(properties) => {
                self.emit_mapped("{", expr.span, None);
                let saved = std::mem::replace(&mut self.no_in, false);
                for (i, prop) in properties.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    self.emit_object_property(prop);
                }
                self.no_in = saved;
                self.emit("}");
            }
            ExprKind::Function(func) => self.emit_function(func),
            ExprKind::Arrow(arrow) => {
                let wrap = min_prec > 2;
                if wrap {
                    self.emit("(");
                }
                self.emit_arrow(arrow);
                if wrap {
                    self.emit(")");
                }
            }
            ExprKind::Unary {
                op: UnaryOp::Minus,
                arg,
            } if matches!(arg.kind, ExprKind::Number(n) if n.is_infinite() && n > 0.0) => {
                let wrap = min_prec > 13;
                if wrap {
                    self.emit("(");
                }
                self.emit_mapped("-", expr.span, None);
                self.emit("1/0");
                if wrap {
                    self.emit(")");
                }
            }
            ExprKind::Unary { op, arg } => {
                let wrap = min_prec > 15;
                if wrap {
                    self.emit("(");
                }
                let op_str = match op {
                    UnaryOp::Minus => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::Not => "!",
                    UnaryOp::BitNot => "~",
                    UnaryOp::Typeof => "typeof",
                    UnaryOp::Void => "void",
                    UnaryOp::Delete => "delete",
                };
                self.emit_mapped(op_str, expr.span, None);
                self.emit_expr_with_prec(arg, 15);
                if wrap {
                    self.emit(")");
                }
            }
            ExprKind::Binary { op, left, right } => {
                let (prec, op_str) = binary_op_info(*op);
                let wrap = prec < min_prec || (self.no_in && *op == BinaryOp::In);
                if wrap {
                    self.emit("(");
                }
                let saved = if wrap {
                    std::mem::replace(&mut self.no_in, false)
                } else {
                    self.no_in
                };
                let left_prec = if *op == BinaryOp::Pow { prec + 2 } else { prec };
                self.emit_operand(left, left_prec, *op);
                self.emit_space();
                self.emit(op_str);
                self.emit_space();
                let right_prec = if *op == BinaryOp::Pow { prec } else { prec + 1 };
                self.emit_operand(right, right_prec, *op);
                self.no_in = saved;
                if wrap {
                    self.emit(")");
                }
            }
            ExprKind::Assign { op, left, right } => {
                let wrap = min_prec > 2;
                if wrap {
                    self.emit("(");
                }
                // A leading `{a} = b` is parenthesized as a whole by the statement
                self.emit_expr_with_prec(left, 3);
                self.emit_space();
                self.emit(assign_op_str(*op));
                self.emit_space();
                self.emit_expr_with_prec(right, 2);
                if wrap {
                    self.emit(")");
                }
            }
            ExprKind::Update { op, prefix, arg } => {
                let op_str = match op {
                    UpdateOp::Increment => "++",
                    UpdateOp::Decrement => "--",
                };
                if *prefix {
                    self.emit_mapped(op_str, expr.span, None);
                    self.emit_expr_with_prec(arg, 15);
                } else {
                    self.emit_expr_with_prec(arg, 16);
                    self.emit(op_str);
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let wrap = min_prec > 3;
                if wrap {
                    self.emit("(");
                }
                self.emit_expr_with_prec(test, 4);
                self.emit_space();
                self.emit("?");
                self.emit_space();
                let saved = std::mem::replace(&mut self.no_in, false);
                self.emit_expr_with_prec(consequent, 2);
                self.no_in = saved;
                self.emit_space();
                self.emit(":");
                self.emit_space();
                self.emit_expr_with_prec(alternate, 2);
                if wrap {
                    self.emit(")");
                }
            }
            ExprKind::Sequence(exprs) => {
                let wrap = min_prec > 1;
                if wrap {
                    self.emit("(");
                }
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    self.emit_expr_with_prec(e, 2);
                }
                if wrap {
                    self.emit(")");
                }
            }
            ExprKind::Member { object, property } => {
                let wrap = min_prec > 18;
                if wrap {
                    self.emit("(");
                }
                self.emit_expr_with_prec(object, 18);
                match property {
                    MemberProp::Name(name) => {
                        if let ExprKind::Number(n) = object.kind {
                            if format_number(n).bytes().all(|b| b.is_ascii_digit()) {
                                self.emit(".");
                            }
                        }
                        self.emit(".");
                        self.emit(name);
                    }
                    MemberProp::Computed(prop) => {
                        self.emit("[");
                        let saved = std::mem::replace(&mut self.no_in, false);
                        self.emit_expr(prop);
                        self.no_in = saved;
                        self.emit("]");
                    }
                }
                if wrap {
                    self.emit(")");
                }
            }
            ExprKind::Call { callee, args } => {
                self.emit_expr_with_prec(callee, 18);
                self.emit_args(args);
            }
            ExprKind::New { callee, args } => {
                let wrap = min_prec > 18;
                if wrap {
                    self.emit("(");
                }
                self.emit_mapped("new", expr.span, None);
                if has_call_in_chain(callee) {
                    self.emit("(");
                    self.emit_expr(callee);
                    self.emit(")");
                } else {
                    self.emit_expr_with_prec(callee, 18);
                }
                self.emit_args(args);
                if wrap {
                    self.emit(")");
                }
            }
            ExprKind::Spread(arg) => {
                self.emit("...");
                self.emit_expr_with_prec(arg, 2);
            }
        }
    }

    /// Emit a binary operand; `??` never mixes with `||`/`&&` unparenthesized.
    fn emit_operand(&mut self, operand: &Expr, min_prec: u8, parent: BinaryOp) {
        if let ExprKind::Binary { op, .. } = &operand.kind {
            if is_logical(parent) && is_logical(*op) && (parent == BinaryOp::NullishCoalesce) != (*op == BinaryOp::NullishCoalesce) {
                self.emit("(");
                self.emit_expr(operand);
                self.emit(")");
                return;
            }
        }
        self.emit_expr_with_prec(operand, min_prec);
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\\' || (!c.is_ascii() && !c.is_whitespace())
}

fn is_logical(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::And | BinaryOp::Or | BinaryOp::NullishCoalesce)
}

/// Whether printing `expr` at statement start would begin with `{` or `function`.
fn starts_with_brace_or_function(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Object(_) | ExprKind::Function(_) => true,
        ExprKind::Binary { left, .. } | ExprKind::Assign { left, .. } => {
            starts_with_brace_or_function(left)
        }
        ExprKind::Conditional { test, .. } => starts_with_brace_or_function(test),
        ExprKind::Sequence(exprs) => exprs.first().is_some_and(starts_with_brace_or_function),
        ExprKind::Member { object, .. } => starts_with_brace_or_function(object),
        ExprKind::Call { callee, .. } => starts_with_brace_or_function(callee),
        ExprKind::Update { prefix: false, arg, .. } => starts_with_brace_or_function(arg),
        _ => false,
    }
}

/// Whether a `new` callee contains a call, which would otherwise bind the arguments.
fn has_call_in_chain(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Call { .. } => true,
        ExprKind::Member { object, .. } => has_call_in_chain(object),
        _ => false,
    }
}

fn binary_op_info(op: BinaryOp) -> (u8, &'static str) {
    match op {
        BinaryOp::NullishCoalesce => (4, "??"),
        BinaryOp::Or => (4, "||"),
        BinaryOp::And => (5, "&&"),
        BinaryOp::BitOr => (6, "|"),
        BinaryOp::BitXor => (7, "^"),
        BinaryOp::BitAnd => (8, "&"),
        BinaryOp::Eq => (9, "=="),
        BinaryOp::NotEq => (9, "!="),
        BinaryOp::StrictEq => (9, "==="),
        BinaryOp::StrictNotEq => (9, "!=="),
        BinaryOp::Lt => (10, "<"),
        BinaryOp::LtEq => (10, "<="),
        BinaryOp::Gt => (10, ">"),
        BinaryOp::GtEq => (10, ">="),
        BinaryOp::In => (10, "in"),
        BinaryOp::Instanceof => (10, "instanceof"),
        BinaryOp::Shl => (11, "<<"),
        BinaryOp::Shr => (11, ">>"),
        BinaryOp::UShr => (11, ">>>"),
        BinaryOp::Add => (12, "+"),
        BinaryOp::Sub => (12, "-"),
        BinaryOp::Mul => (13, "*"),
        BinaryOp::Div => (13, "/"),
        BinaryOp::Mod => (13, "%"),
        BinaryOp::Pow => (14, "**"),
    }
}

fn assign_op_str(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::AddAssign => "+=",
        AssignOp::SubAssign => "-=",
        AssignOp::MulAssign => "*=",
        AssignOp::DivAssign => "/=",
        AssignOp::ModAssign => "%=",
        AssignOp::PowAssign => "**=",
        AssignOp::ShlAssign => "<<=",
        AssignOp::ShrAssign => ">>=",
        AssignOp::UShrAssign => ">>>=",
        AssignOp::BitOrAssign => "|=",
        AssignOp::BitXorAssign => "^=",
        AssignOp::BitAndAssign => "&=",
        AssignOp::AndAssign => "&&=",
        AssignOp::OrAssign => "||=",
        AssignOp::NullishAssign => "??=",
    }
}

/// Shortest source text for a non-negative finite number.
pub fn format_number(n: f64) -> String {
    if n.is_infinite() {
        return "Infinity".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let decimal = format!("{n}");
    let mut candidates = vec![decimal.strip_prefix("0.").map_or_else(
        || decimal.clone(),
        |frac| format!(".{frac}"),
    )];

    candidates.push(format!("{n:e}").replace("e0", ""));

    if n.fract() == 0.0 && n < 9_007_199_254_740_992.0 {
        let int = n as u64;
        candidates.push(format!("0x{int:x}"));
        let digits = int.to_string();
        let trimmed = digits.trim_end_matches('0');
        let zeros = digits.len() - trimmed.len();
        if zeros >= 3 {
            candidates.push(format!("{trimmed}e{zeros}"));
        }
    }

    candidates
        .into_iter()
        .min_by_key(String::len)
        .unwrap_or(decimal)
}

/// Quote a string with whichever quote needs fewer escapes.
pub fn quote_string(s: &str) -> String {
    let doubles = s.matches('"').count();
    let singles = s.matches('\'').count();
    let quote = if doubles > singles { '\'' } else { '"' };

    let mut result = String::with_capacity(s.len() + 2);
    result.push(quote);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\u{8}' => result.push_str("\\b"),
            '\u{c}' => result.push_str("\\f"),
            '\u{b}' => result.push_str("\\v"),
            '\0' => {
                if chars.peek().is_some_and(char::is_ascii_digit) {
                    result.push_str("\\x00");
                } else {
                    result.push_str("\\0");
                }
            }
            '\u{2028}' => result.push_str("\\u2028"),
            '\u{2029}' => result.push_str("\\u2029"),
            '\u{feff}' => result.push_str("\\ufeff"),
            c if c == quote => {
                result.push('\\');
                result.push(c);
            }
            c if c.is_control() => result.push_str(&format!("\\x{:02x}", c as u32)),
            c => result.push(c),
        }
    }
    result.push(quote);
    result
}

fn escape_template(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => result.push_str("\\\\"),
            '`' => result.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => result.push_str("\\$"),
            '\r' => result.push_str("\\r"),
            c => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParseOptions};

    fn roundtrip(source: &str) -> String {
        let program = parse(source, ParseOptions::new("t.js")).unwrap();
        Codegen::new(&program, CodegenOptions::default()).generate()
    }

    fn beautified(source: &str) -> String {
        let program = parse(source, ParseOptions::new("t.js")).unwrap();
        let options = CodegenOptions {
            beautify: true,
            ..Default::default()
        };
        Codegen::new(&program, options).generate()
    }

    #[test]
    fn test_compact_statements() {
        assert_eq!(roundtrip("var a = 1, b = 2;"), "var a=1,b=2");
        assert_eq!(
            roundtrip("function foo(a, b) { return a + b; }"),
            "function foo(a,b){return a+b}"
        );
        assert_eq!(roundtrip("if (a) b(); else c();"), "if(a)b();else c()");
        assert_eq!(roundtrip("do x(); while (y)"), "do x();while(y)");
    }

    #[test]
    fn test_precedence_parens() {
        assert_eq!(roundtrip("(a + b) * c;"), "(a+b)*c");
        assert_eq!(roundtrip("a + (b + c);"), "a+(b+c)");
        assert_eq!(roundtrip("a = (b, c);"), "a=(b,c)");
        assert_eq!(roundtrip("(a || b) ?? c;"), "(a||b)??c");
        assert_eq!(roundtrip("(-a) ** b;"), "(-a)**b");
        assert_eq!(roundtrip("new (a())();"), "new(a())()");
    }

    #[test]
    fn test_operator_spacing() {
        assert_eq!(roundtrip("a + +b;"), "a+ +b");
        assert_eq!(roundtrip("a - -b;"), "a- -b");
        assert_eq!(roundtrip("a + ++b;"), "a+ ++b");
        assert_eq!(roundtrip("typeof a;"), "typeof a");
        assert_eq!(roundtrip("x = a in b;"), "x=a in b");
    }

    #[test]
    fn test_statement_leading_function_and_object() {
        assert_eq!(roundtrip("(function () {})();"), "(function(){}())");
        assert_eq!(roundtrip("({}).x;"), "({}.x)");
        assert_eq!(roundtrip("x = () => ({});"), "x=()=>({})");
    }

    #[test]
    fn test_destructuring_assignment_parens() {
        assert_eq!(roundtrip("({a, b} = o);"), "({a,b}=o)");
        assert_eq!(roundtrip("({a, b = 1} = o);"), "({a,b=1}=o)");
        assert_eq!(roundtrip("[a, b] = o;"), "[a,b]=o");
        assert_eq!(roundtrip("x = {a} = o;"), "x={a}=o");
        assert_eq!(roundtrip("f = () => ({a} = o);"), "f=()=>({a}=o)");
    }

    #[test]
    fn test_for_in_head_parenthesizes_in() {
        assert_eq!(roundtrip("for (var a = (b in c); ;) ;"), "for(var a=(b in c);;);");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.5), ".5");
        assert_eq!(format_number(1000.0), "1e3");
        assert_eq!(format_number(255.0), "255");
        assert_eq!(format_number(1e21), "1e21");
        assert_eq!(format_number(0.0001), "1e-4");
        assert_eq!(roundtrip("1..toString();"), "1..toString()");
    }

    #[test]
    fn test_infinite_numbers_print_as_division() {
        assert_eq!(roundtrip("x = 1e400;"), "x=1/0");
        assert_eq!(roundtrip("x = -1e400;"), "x=-1/0");
        assert_eq!(roundtrip("x = 1e400 .toString();"), "x=(1/0).toString()");
        assert_eq!(roundtrip("x = a / 1e400;"), "x=a/(1/0)");
        assert_eq!(roundtrip("x = 1e400 / a;"), "x=1/0/a");
    }

    #[test]
    fn test_strings() {
        assert_eq!(quote_string("a"), "\"a\"");
        assert_eq!(quote_string("say \"hi\""), "'say \"hi\"'");
        assert_eq!(quote_string("a\nb"), "\"a\\nb\"");
        assert_eq!(quote_string("\u{0}1"), "\"\\x001\"");
    }

    #[test]
    fn test_shorthand_property_after_rename() {
        let mut program = parse("x = { a };", ParseOptions::new("t.js")).unwrap();
        let StmtKind::Expr(expr) = &mut program.body[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Assign { right, .. } = &mut expr.kind else {
            panic!("expected assignment");
        };
        let ExprKind::Object(props) = &mut right.kind else {
            panic!("expected object");
        };
        let ExprKind::Ident(ident) = &mut props[0].value.kind else {
            panic!("expected ident");
        };
        ident.mangled = Some("b".to_string());
        assert_eq!(Codegen::new(&program, CodegenOptions::default()).generate(), "x={a:b}");
    }

    #[test]
    fn test_beautify() {
        assert_eq!(
            beautified("function f(a){if(a){return 1}}"),
            "function f(a) {\n  if (a) {\n    return 1;\n  }\n}\n"
        );
    }

    #[test]
    fn test_mappings_record_identifier_names() {
        let mut program = parse("var foo = 1;\nfoo;", ParseOptions::new("t.js")).unwrap();
        let StmtKind::Expr(expr) = &mut program.body[1].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Ident(ident) = &mut expr.kind else {
            panic!("expected ident");
        };
        ident.mangled = Some("a".to_string());

        let options = CodegenOptions {
            source_map: true,
            ..Default::default()
        };
        let (code, mappings) = Codegen::new(&program, options).generate_with_mappings();
        assert_eq!(code, "var foo=1;a");

        let last = mappings.last().unwrap();
        assert_eq!((last.gen_line, last.gen_col), (0, 10));
        assert_eq!(last.orig_offset, 13);
        assert_eq!(last.name.as_deref(), Some("foo"));
    }

    #[test]
    fn test_utf16_generated_columns() {
        let program = parse("x = \"é😀\"; y;", ParseOptions::new("t.js")).unwrap();
        let options = CodegenOptions {
            source_map: true,
            ..Default::default()
        };
        let (code, mappings) = Codegen::new(&program, options).generate_with_mappings();
        assert_eq!(code, "x=\"é😀\";y");
        // `"é😀"` is 5 UTF-16 units, so `y` starts at column 8.
        let last = mappings.last().unwrap();
        assert_eq!(last.gen_col, 8);
    }
}
