//! The rewrite engine.
//!
//! A single post-order pass that removes unreachable code, folds constant
//! expressions and substitutes configured global definitions. It runs after
//! scope analysis, which tells it which identifiers are undeclared globals.

use crate::scope::ScopeTree;
use fastmin_syntax::visit::{walk_expr, walk_program, walk_stmt};
use fastmin_syntax::{
    format_number, quote_string, ArrowBody, AssignOp, BinaryOp, Binding, BindingKind, Expr,
    ExprKind, ForInit, Ident, Program, PropertyKind, Span, Stmt, StmtKind, UnaryOp, VarDeclarator,
    VarKind, VisitMut,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An AST-to-AST rewrite run between scope analysis and mangling.
pub trait Rewrite {
    fn rewrite(&self, program: &mut Program, scopes: &ScopeTree);
}

/// Literal value substituted for an undeclared global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GlobalDef {
    Bool(bool),
    Number(f64),
    String(String),
    Null,
}

impl GlobalDef {
    fn to_expr(&self, span: Span) -> Expr {
        let kind = match self {
            GlobalDef::Bool(b) => ExprKind::Bool(*b),
            GlobalDef::Number(n) => ExprKind::Number(*n),
            GlobalDef::String(s) => ExprKind::String(s.clone()),
            GlobalDef::Null => ExprKind::Null,
        };
        Expr::new(kind, span)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressOptions {
    /// Remove `debugger` statements.
    pub drop_debugger: bool,
    /// Remove empty and unreachable statements and constant `if` branches.
    pub dead_code: bool,
    /// Fold constant expressions when the result is not longer.
    pub evaluate: bool,
    /// Print `true`/`false` as `!0`/`!1`.
    pub booleans: bool,
    /// Undeclared globals replaced by literals.
    pub global_defs: BTreeMap<String, GlobalDef>,
    /// Log every dropped construct.
    pub warnings: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            drop_debugger: true,
            dead_code: true,
            evaluate: true,
            booleans: true,
            global_defs: BTreeMap::new(),
            warnings: true,
        }
    }
}

/// The built-in rewrite engine.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    options: CompressOptions,
}

impl Compressor {
    pub fn new(options: CompressOptions) -> Self {
        Self { options }
    }
}

impl Rewrite for Compressor {
    fn rewrite(&self, program: &mut Program, scopes: &ScopeTree) {
        let mut pass = CompressPass {
            options: &self.options,
            scopes,
            dropped: 0,
            folded: 0,
        };
        pass.visit_program(program);
        tracing::debug!(
            dropped = pass.dropped,
            folded = pass.folded,
            "compressed program"
        );
    }
}

struct CompressPass<'a> {
    options: &'a CompressOptions,
    scopes: &'a ScopeTree,
    dropped: usize,
    folded: usize,
}

impl CompressPass<'_> {
    fn warn(&self, what: &str, span: Span) {
        if self.options.warnings {
            if span.is_synthetic() {
                tracing::warn!("Dropping {what}");
            } else {
                tracing::warn!(offset = span.start, "Dropping {what}");
            }
        }
    }

    /// Tidy one statement list.
    fn clean(&mut self, stmts: &mut Vec<Stmt>) {
        let before = stmts.len();
        if self.options.drop_debugger {
            for stmt in stmts.iter().filter(|s| matches!(s.kind, StmtKind::Debugger)) {
                self.warn("debugger statement", stmt.span);
            }
            stmts.retain(|s| !matches!(s.kind, StmtKind::Debugger));
        }
        if !self.options.dead_code {
            self.dropped += before - stmts.len();
            return;
        }
        stmts.retain(|s| !matches!(s.kind, StmtKind::Empty));

        if let Some(jump) = stmts.iter().position(is_jump) {
            if jump + 1 < stmts.len() {
                let tail: Vec<Stmt> = stmts.drain(jump + 1..).collect();
                if let Some(first) = tail.first() {
                    self.warn("unreachable code", first.span);
                }
                stmts.extend(hoisted_declarations(&tail));
            }
        }
        self.dropped += before.saturating_sub(stmts.len());
    }

    /// Replace an `if` with a constant test by the branch it takes.
    fn fold_if(&mut self, stmt: &mut Stmt) {
        let StmtKind::If { test, .. } = &stmt.kind else {
            return;
        };
        let Some(truthy) = constant(test).map(|c| c.truthy()) else {
            return;
        };
        let kind = std::mem::replace(&mut stmt.kind, StmtKind::Empty);
        let (taken, dropped) = match kind {
            StmtKind::If {
                consequent,
                alternate,
                ..
            } => {
                if truthy {
                    (Some(*consequent), alternate.map(|b| *b))
                } else {
                    (alternate.map(|b| *b), Some(*consequent))
                }
            }
            other => {
                stmt.kind = other;
                return;
            }
        };

        let mut hoisted = Vec::new();
        if let Some(dropped) = &dropped {
            self.warn("unreachable branch", dropped.span);
            hoisted = hoisted_declarations(std::slice::from_ref(dropped));
            self.dropped += 1;
        }
        stmt.kind = match (taken, hoisted.is_empty()) {
            (Some(taken), true) => taken.kind,
            (None, true) => StmtKind::Empty,
            (taken, false) => {
                let mut stmts: Vec<Stmt> = taken.into_iter().collect();
                stmts.append(&mut hoisted);
                StmtKind::Block(stmts)
            }
        };
    }

    fn global_def(&self, ident: &Ident) -> Option<&GlobalDef> {
        let symbol = ident.symbol?;
        if self.scopes.symbol(symbol).is_declared() {
            return None;
        }
        self.options.global_defs.get(&ident.name)
    }

    /// Length of a folded candidate as it would be printed.
    fn printed_len(&self, expr: &Expr) -> Option<usize> {
        Some(match &expr.kind {
            ExprKind::Number(n) => format_number(n.abs()).len() + usize::from(*n < 0.0),
            ExprKind::String(s) => quote_string(s).len(),
            ExprKind::Bool(b) => {
                if self.options.booleans {
                    2
                } else if *b {
                    4
                } else {
                    5
                }
            }
            ExprKind::Null => 4,
            ExprKind::Unary { op, arg } => unary_op_len(*op) + self.printed_len(arg)?,
            ExprKind::Binary { op, left, right } => {
                binary_op_len(*op) + self.printed_len(left)? + self.printed_len(right)?
            }
            _ => return None,
        })
    }

    fn evaluate(&mut self, expr: &mut Expr) {
        let value = match &expr.kind {
            ExprKind::Binary { op, left, right } => {
                let (Some(l), Some(r)) = (constant(left), constant(right)) else {
                    return;
                };
                fold_binary(*op, l, r)
            }
            ExprKind::Unary { op, arg } => match (op, constant(arg)) {
                (UnaryOp::Not, Some(c)) => Some(Const::Bool(!c.truthy())),
                (UnaryOp::Typeof, Some(c)) => Some(Const::Str(c.type_of().to_string())),
                (UnaryOp::Plus, Some(Const::Num(n))) => Some(Const::Num(n)),
                (UnaryOp::BitNot, Some(Const::Num(n))) => Some(Const::Num(f64::from(!to_int32(n)))),
                _ => None,
            },
            _ => return,
        };
        let Some(folded) = value.and_then(|v| v.into_expr(expr.span)) else {
            return;
        };
        let (Some(old), Some(new)) = (self.printed_len(expr), self.printed_len(&folded)) else {
            return;
        };
        if new <= old {
            *expr = folded;
            self.folded += 1;
        }
    }

    /// Visit an assignment target. Identifiers written to are left alone;
    /// defaults and computed keys inside a pattern are ordinary expressions.
    fn visit_target(&mut self, target: &mut Expr) {
        match &mut target.kind {
            ExprKind::Ident(_) => {}
            ExprKind::Array(elements) => {
                for element in elements.iter_mut().flatten() {
                    self.visit_target(element);
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    if prop.kind != PropertyKind::Spread {
                        self.visit_property_key(&mut prop.key);
                    }
                    self.visit_target(&mut prop.value);
                }
            }
            ExprKind::Assign {
                op: AssignOp::Assign,
                left,
                right,
            } => {
                self.visit_target(left);
                self.visit_expr(right);
            }
            ExprKind::Spread(arg) => self.visit_target(arg),
            _ => self.visit_expr(target),
        }
    }
}

impl VisitMut for CompressPass<'_> {
    fn visit_program(&mut self, program: &mut Program) {
        walk_program(self, program);
        self.clean(&mut program.body);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::ForIn {
                left: ForInit::Expr(target),
                right,
                body,
            }
            | StmtKind::ForOf {
                left: ForInit::Expr(target),
                right,
                body,
            } => {
                self.visit_target(target);
                self.visit_expr(right);
                self.visit_stmt(body);
            }
            _ => walk_stmt(self, stmt),
        }
        match &mut stmt.kind {
            StmtKind::Block(stmts) => self.clean(stmts),
            StmtKind::Function(func) => self.clean(&mut func.body),
            StmtKind::Switch { cases, .. } => {
                for case in cases {
                    self.clean(&mut case.consequent);
                }
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.clean(block);
                if let Some(handler) = handler {
                    self.clean(&mut handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.clean(finalizer);
                }
            }
            StmtKind::Debugger if self.options.drop_debugger => {
                self.warn("debugger statement", stmt.span);
                stmt.kind = StmtKind::Empty;
            }
            StmtKind::If { .. } if self.options.dead_code => self.fold_if(stmt),
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Assign { left, right, .. } => {
                self.visit_target(left);
                self.visit_expr(right);
            }
            ExprKind::Update { arg, .. } => self.visit_target(arg),
            _ => walk_expr(self, expr),
        }

        match &mut expr.kind {
            ExprKind::Function(func) => self.clean(&mut func.body),
            ExprKind::Arrow(arrow) => {
                if let ArrowBody::Block(body) = &mut arrow.body {
                    self.clean(body);
                }
            }
            ExprKind::Ident(ident) => {
                if let Some(def) = self.global_def(ident) {
                    *expr = def.to_expr(expr.span);
                    self.folded += 1;
                }
            }
            _ => {}
        }

        if self.options.evaluate {
            self.evaluate(expr);
        }
        if self.options.booleans {
            if let ExprKind::Bool(b) = expr.kind {
                expr.kind = ExprKind::Unary {
                    op: UnaryOp::Not,
                    arg: Box::new(Expr::new(
                        ExprKind::Number(if b { 0.0 } else { 1.0 }),
                        expr.span,
                    )),
                };
            }
        }
    }
}

fn is_jump(stmt: &Stmt) -> bool {
    matches!(
        stmt.kind,
        StmtKind::Return { .. }
            | StmtKind::Throw { .. }
            | StmtKind::Break { .. }
            | StmtKind::Continue { .. }
    )
}

/// Declarations in dropped code that must survive: function declarations
/// and `var` names (without their initializers).
fn hoisted_declarations(stmts: &[Stmt]) -> Vec<Stmt> {
    let mut names = Vec::new();
    let mut functions = Vec::new();
    for stmt in stmts {
        collect_hoisted(stmt, &mut names, &mut functions);
    }
    let mut out = Vec::new();
    if !names.is_empty() {
        let decls = names
            .into_iter()
            .map(|ident: Ident| VarDeclarator {
                span: ident.span,
                binding: Binding::new(BindingKind::Ident(ident), Span::SYNTHETIC),
                init: None,
            })
            .collect();
        out.push(Stmt::new(
            StmtKind::Var {
                kind: VarKind::Var,
                decls,
            },
            Span::SYNTHETIC,
        ));
    }
    out.extend(functions);
    out
}

fn collect_hoisted(stmt: &Stmt, names: &mut Vec<Ident>, functions: &mut Vec<Stmt>) {
    match &stmt.kind {
        StmtKind::Var {
            kind: VarKind::Var,
            decls,
        } => {
            for decl in decls {
                binding_idents(&decl.binding, names);
            }
        }
        StmtKind::Function(_) => functions.push(stmt.clone()),
        StmtKind::Block(stmts) => {
            for s in stmts {
                collect_hoisted(s, names, functions);
            }
        }
        StmtKind::If {
            consequent,
            alternate,
            ..
        } => {
            collect_hoisted(consequent, names, functions);
            if let Some(alt) = alternate {
                collect_hoisted(alt, names, functions);
            }
        }
        StmtKind::For { init, body, .. } => {
            if let Some(ForInit::Var {
                kind: VarKind::Var,
                decls,
            }) = init
            {
                for decl in decls {
                    binding_idents(&decl.binding, names);
                }
            }
            collect_hoisted(body, names, functions);
        }
        StmtKind::ForIn { left, body, .. } | StmtKind::ForOf { left, body, .. } => {
            if let ForInit::Var {
                kind: VarKind::Var,
                decls,
            } = left
            {
                for decl in decls {
                    binding_idents(&decl.binding, names);
                }
            }
            collect_hoisted(body, names, functions);
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Labeled { body, .. }
        | StmtKind::With { body, .. } => collect_hoisted(body, names, functions),
        StmtKind::Switch { cases, .. } => {
            for s in cases.iter().flat_map(|c| &c.consequent) {
                collect_hoisted(s, names, functions);
            }
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            let handler = handler.iter().flat_map(|h| &h.body);
            let finalizer = finalizer.iter().flatten();
            for s in block.iter().chain(handler).chain(finalizer) {
                collect_hoisted(s, names, functions);
            }
        }
        _ => {}
    }
}

fn binding_idents(binding: &Binding, out: &mut Vec<Ident>) {
    match &binding.kind {
        BindingKind::Ident(ident) => out.push(ident.clone()),
        BindingKind::Array(elements) => {
            for element in elements.iter().flatten() {
                binding_idents(&element.binding, out);
            }
        }
        BindingKind::Object(props) => {
            for prop in props {
                binding_idents(&prop.value, out);
            }
        }
    }
}

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq)]
enum Const {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Const {
    fn truthy(&self) -> bool {
        match self {
            Const::Num(n) => *n != 0.0 && !n.is_nan(),
            Const::Str(s) => !s.is_empty(),
            Const::Bool(b) => *b,
            Const::Null => false,
        }
    }

    fn type_of(&self) -> &'static str {
        match self {
            Const::Num(_) => "number",
            Const::Str(_) => "string",
            Const::Bool(_) => "boolean",
            Const::Null => "object",
        }
    }

    fn into_expr(self, span: Span) -> Option<Expr> {
        let kind = match self {
            Const::Num(n) if !n.is_finite() || (n == 0.0 && n.is_sign_negative()) => return None,
            Const::Num(n) => ExprKind::Number(n),
            Const::Str(s) => ExprKind::String(s),
            Const::Bool(b) => ExprKind::Bool(b),
            Const::Null => ExprKind::Null,
        };
        Some(Expr::new(kind, span))
    }
}

fn constant(expr: &Expr) -> Option<Const> {
    match &expr.kind {
        ExprKind::Number(n) => Some(Const::Num(*n)),
        ExprKind::String(s) => Some(Const::Str(s.clone())),
        ExprKind::Bool(b) => Some(Const::Bool(*b)),
        ExprKind::Null => Some(Const::Null),
        ExprKind::Unary {
            op: UnaryOp::Not,
            arg,
        } => constant(arg).map(|c| Const::Bool(!c.truthy())),
        ExprKind::Unary {
            op: UnaryOp::Minus,
            arg,
        } => match constant(arg)? {
            Const::Num(n) => Some(Const::Num(-n)),
            _ => None,
        },
        _ => None,
    }
}

fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
    #[allow(clippy::cast_possible_truncation)]
    let bits = wrapped as u32;
    bits as i32
}

fn fold_binary(op: BinaryOp, left: Const, right: Const) -> Option<Const> {
    use Const::{Bool, Num, Str};
    Some(match (op, left, right) {
        (BinaryOp::Add, Num(a), Num(b)) => Num(a + b),
        (BinaryOp::Add, Str(a), Str(b)) => Str(a + &b),
        (BinaryOp::Sub, Num(a), Num(b)) => Num(a - b),
        (BinaryOp::Mul, Num(a), Num(b)) => Num(a * b),
        (BinaryOp::Div, Num(a), Num(b)) => Num(a / b),
        (BinaryOp::Mod, Num(a), Num(b)) => Num(a % b),
        (BinaryOp::Pow, Num(a), Num(b)) => Num(a.powf(b)),
        (BinaryOp::BitAnd, Num(a), Num(b)) => Num(f64::from(to_int32(a) & to_int32(b))),
        (BinaryOp::BitOr, Num(a), Num(b)) => Num(f64::from(to_int32(a) | to_int32(b))),
        (BinaryOp::BitXor, Num(a), Num(b)) => Num(f64::from(to_int32(a) ^ to_int32(b))),
        (BinaryOp::Shl, Num(a), Num(b)) => {
            Num(f64::from(to_int32(a).wrapping_shl(to_int32(b) as u32 & 31)))
        }
        (BinaryOp::Shr, Num(a), Num(b)) => {
            Num(f64::from(to_int32(a).wrapping_shr(to_int32(b) as u32 & 31)))
        }
        (BinaryOp::UShr, Num(a), Num(b)) => {
            Num(f64::from((to_int32(a) as u32).wrapping_shr(to_int32(b) as u32 & 31)))
        }
        (BinaryOp::Lt, Num(a), Num(b)) => Bool(a < b),
        (BinaryOp::LtEq, Num(a), Num(b)) => Bool(a <= b),
        (BinaryOp::Gt, Num(a), Num(b)) => Bool(a > b),
        (BinaryOp::GtEq, Num(a), Num(b)) => Bool(a >= b),
        (BinaryOp::StrictEq | BinaryOp::Eq, a, b) if same_type(&a, &b) => Bool(a == b && !is_nan(&a)),
        (BinaryOp::StrictNotEq | BinaryOp::NotEq, a, b) if same_type(&a, &b) => {
            Bool(a != b || is_nan(&a))
        }
        (BinaryOp::StrictEq, _, _) => Bool(false),
        (BinaryOp::StrictNotEq, _, _) => Bool(true),
        (BinaryOp::And, a, b) => {
            if a.truthy() {
                b
            } else {
                a
            }
        }
        (BinaryOp::Or, a, b) => {
            if a.truthy() {
                a
            } else {
                b
            }
        }
        (BinaryOp::NullishCoalesce, a, b) => {
            if a == Const::Null {
                b
            } else {
                a
            }
        }
        _ => return None,
    })
}

fn same_type(a: &Const, b: &Const) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn is_nan(c: &Const) -> bool {
    matches!(c, Const::Num(n) if n.is_nan())
}

fn unary_op_len(op: UnaryOp) -> usize {
    match op {
        UnaryOp::Minus | UnaryOp::Plus | UnaryOp::Not | UnaryOp::BitNot => 1,
        UnaryOp::Void => 5,
        UnaryOp::Typeof | UnaryOp::Delete => 7,
    }
}

fn binary_op_len(op: BinaryOp) -> usize {
    match op {
        BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Mod
        | BinaryOp::Lt
        | BinaryOp::Gt
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::BitAnd => 1,
        BinaryOp::Pow
        | BinaryOp::Eq
        | BinaryOp::LtEq
        | BinaryOp::GtEq
        | BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::And
        | BinaryOp::Or
        | BinaryOp::NullishCoalesce
        | BinaryOp::NotEq
        | BinaryOp::In => 2,
        BinaryOp::StrictEq | BinaryOp::StrictNotEq | BinaryOp::UShr => 3,
        BinaryOp::Instanceof => 12,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastmin_syntax::{parse, Codegen, CodegenOptions, ParseOptions};

    fn compress(source: &str, options: CompressOptions) -> String {
        let mut program = parse(source, ParseOptions::new("t.js")).unwrap();
        let scopes = ScopeTree::analyze(&mut program);
        Compressor::new(options).rewrite(&mut program, &scopes);
        Codegen::new(&program, CodegenOptions::default()).generate()
    }

    fn defaults() -> CompressOptions {
        CompressOptions::default()
    }

    #[test]
    fn test_drops_debugger_and_empty_statements() {
        assert_eq!(compress("a(); debugger; ; b();", defaults()), "a();b()");
        let keep = CompressOptions {
            drop_debugger: false,
            ..defaults()
        };
        assert_eq!(compress("a(); debugger;", keep), "a();debugger");
    }

    #[test]
    fn test_drops_code_after_return_but_keeps_hoisted() {
        let out = compress(
            "function f() { return g(); h(); var x = 1; function g() {} }",
            defaults(),
        );
        assert_eq!(out, "function f(){return g();var x;function g(){}}");
    }

    #[test]
    fn test_constant_if_takes_one_branch() {
        assert_eq!(compress("if (1) a(); else b();", defaults()), "a()");
        assert_eq!(compress("if (!1) { a(); } c();", defaults()), "c()");
        assert_eq!(
            compress("if (0) { var v = 2; } x();", defaults()),
            "{var v}x()"
        );
    }

    #[test]
    fn test_evaluate_folds_shorter_results() {
        assert_eq!(compress("x = 1 + 2;", defaults()), "x=3");
        assert_eq!(compress("x = 'a' + 'b';", defaults()), "x=\"ab\"");
        assert_eq!(compress("x = 1 / 3;", defaults()), "x=1/3");
        assert_eq!(compress("x = 1 / 0;", defaults()), "x=1/0");
        assert_eq!(compress("x = 5 - 8;", defaults()), "x=-3");
    }

    #[test]
    fn test_booleans() {
        assert_eq!(compress("x = true; y = false;", defaults()), "x=!0;y=!1");
        let plain = CompressOptions {
            booleans: false,
            ..defaults()
        };
        assert_eq!(compress("x = true;", plain), "x=true");
    }

    #[test]
    fn test_global_defs_replace_undeclared_only() {
        let mut options = defaults();
        options
            .global_defs
            .insert("DEBUG".to_string(), GlobalDef::Bool(false));
        options
            .global_defs
            .insert("VERSION".to_string(), GlobalDef::String("1.0".to_string()));
        let out = compress(
            "if (DEBUG) log(); v = VERSION; function f(VERSION) { return VERSION; } DEBUG = 1;",
            options,
        );
        assert_eq!(out, "v=\"1.0\";function f(VERSION){return VERSION}DEBUG=1");
    }

    #[test]
    fn test_global_defs_skip_assignment_targets() {
        let mut options = defaults();
        options
            .global_defs
            .insert("DEBUG".to_string(), GlobalDef::Bool(false));
        let out = compress(
            "for (DEBUG in o) f(DEBUG); [DEBUG, o[DEBUG]] = a; ({DEBUG, k: [DEBUG] = DEBUG} = b); DEBUG++; x = DEBUG;",
            options,
        );
        assert_eq!(
            out,
            "for(DEBUG in o)f(!1);[DEBUG,o[!1]]=a;({DEBUG,k:[DEBUG]=!1}=b);DEBUG++;x=!1"
        );
        assert!(parse(&out, ParseOptions::new("out.js")).is_ok());
    }

    #[test]
    fn test_global_def_json_shapes() {
        let options: CompressOptions =
            serde_json::from_str(r#"{"global_defs": {"A": true, "B": 2, "C": "s", "D": null}}"#)
                .unwrap();
        assert_eq!(options.global_defs["A"], GlobalDef::Bool(true));
        assert_eq!(options.global_defs["B"], GlobalDef::Number(2.0));
        assert_eq!(options.global_defs["C"], GlobalDef::String("s".to_string()));
        assert_eq!(options.global_defs["D"], GlobalDef::Null);
    }

    #[test]
    fn test_dead_code_disabled() {
        let options = CompressOptions {
            dead_code: false,
            ..defaults()
        };
        assert_eq!(
            compress("function f() { return 1; g(); }", options),
            "function f(){return 1;g()}"
        );
    }
}
