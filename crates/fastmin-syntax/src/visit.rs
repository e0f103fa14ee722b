//! Mutable AST traversal with lexical scope hooks.
//!
//! Every pass over the tree (scope analysis, renaming, member mangling,
//! frequency counting) implements [`VisitMut`] and overrides only the hooks
//! it cares about. The `walk_*` functions hold the default traversal order,
//! which is also the order in which scopes are entered: two walks over the
//! same tree always see the same sequence of `enter_scope` calls.

use crate::ast::*;

/// Kind of lexical scope being entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The whole program.
    Program,
    /// Function, function expression, method or arrow.
    Function,
    /// Block statement, loop head or switch body.
    Block,
    /// Catch clause (holds the catch parameter).
    Catch,
}

impl ScopeKind {
    /// Whether `var` and function declarations hoist to this scope.
    pub fn is_hoist_target(self) -> bool {
        matches!(self, ScopeKind::Program | ScopeKind::Function)
    }
}

/// How a binding identifier is introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
    /// Function declaration name (bound in the enclosing scope).
    Function,
    /// Function expression name (bound in the function's own scope).
    FunctionName,
    Param,
    CatchParam,
}

impl DeclKind {
    /// Whether the declaration hoists out of blocks.
    pub fn hoists(self) -> bool {
        matches!(self, DeclKind::Var | DeclKind::Function)
    }
}

impl From<VarKind> for DeclKind {
    fn from(kind: VarKind) -> Self {
        match kind {
            VarKind::Var => DeclKind::Var,
            VarKind::Let => DeclKind::Let,
            VarKind::Const => DeclKind::Const,
        }
    }
}

/// A mutable visitor over the AST.
pub trait VisitMut {
    fn enter_scope(&mut self, _kind: ScopeKind) {}

    fn leave_scope(&mut self) {}

    /// An identifier that introduces a binding.
    fn visit_binding_ident(&mut self, _ident: &mut Ident, _kind: DeclKind) {}

    /// An identifier read or written as a lexical reference.
    fn visit_ident_ref(&mut self, _ident: &mut Ident) {}

    /// The name in `object.name`.
    fn visit_member_name(&mut self, _name: &mut String) {}

    fn visit_property_key(&mut self, key: &mut PropertyKey) {
        walk_property_key(self, key);
    }

    fn visit_program(&mut self, program: &mut Program) {
        walk_program(self, program);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_program<V: VisitMut + ?Sized>(v: &mut V, program: &mut Program) {
    v.enter_scope(ScopeKind::Program);
    for stmt in &mut program.body {
        v.visit_stmt(stmt);
    }
    v.leave_scope();
}

fn walk_block<V: VisitMut + ?Sized>(v: &mut V, stmts: &mut [Stmt]) {
    v.enter_scope(ScopeKind::Block);
    for stmt in stmts {
        v.visit_stmt(stmt);
    }
    v.leave_scope();
}

fn walk_for_init<V: VisitMut + ?Sized>(v: &mut V, init: &mut ForInit) {
    match init {
        ForInit::Var { kind, decls } => walk_var_decls(v, *kind, decls),
        ForInit::Expr(expr) => v.visit_expr(expr),
    }
}

fn walk_var_decls<V: VisitMut + ?Sized>(v: &mut V, kind: VarKind, decls: &mut [VarDeclarator]) {
    for decl in decls {
        walk_binding(v, &mut decl.binding, kind.into());
        if let Some(init) = &mut decl.init {
            v.visit_expr(init);
        }
    }
}

pub fn walk_stmt<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Var { kind, decls } => walk_var_decls(v, *kind, decls),
        StmtKind::Function(func) => {
            if let Some(name) = &mut func.name {
                v.visit_binding_ident(name, DeclKind::Function);
            }
            walk_function_inner(v, func);
        }
        StmtKind::Block(stmts) => walk_block(v, stmts),
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_stmt(consequent);
            if let Some(alt) = alternate {
                v.visit_stmt(alt);
            }
        }
        StmtKind::Switch {
            discriminant,
            cases,
        } => {
            v.visit_expr(discriminant);
            v.enter_scope(ScopeKind::Block);
            for case in cases {
                if let Some(test) = &mut case.test {
                    v.visit_expr(test);
                }
                for stmt in &mut case.consequent {
                    v.visit_stmt(stmt);
                }
            }
            v.leave_scope();
        }
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            v.enter_scope(ScopeKind::Block);
            if let Some(init) = init {
                walk_for_init(v, init);
            }
            if let Some(test) = test {
                v.visit_expr(test);
            }
            if let Some(update) = update {
                v.visit_expr(update);
            }
            v.visit_stmt(body);
            v.leave_scope();
        }
        StmtKind::ForIn { left, right, body } | StmtKind::ForOf { left, right, body } => {
            v.enter_scope(ScopeKind::Block);
            walk_for_init(v, left);
            v.visit_expr(right);
            v.visit_stmt(body);
            v.leave_scope();
        }
        StmtKind::While { test, body } => {
            v.visit_expr(test);
            v.visit_stmt(body);
        }
        StmtKind::DoWhile { body, test } => {
            v.visit_stmt(body);
            v.visit_expr(test);
        }
        StmtKind::Return { arg } => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
        StmtKind::Throw { arg } | StmtKind::Expr(arg) => v.visit_expr(arg),
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            walk_block(v, block);
            if let Some(handler) = handler {
                v.enter_scope(ScopeKind::Catch);
                if let Some(param) = &mut handler.param {
                    walk_binding(v, param, DeclKind::CatchParam);
                }
                for stmt in &mut handler.body {
                    v.visit_stmt(stmt);
                }
                v.leave_scope();
            }
            if let Some(finalizer) = finalizer {
                walk_block(v, finalizer);
            }
        }
        StmtKind::Labeled { body, .. } => v.visit_stmt(body),
        StmtKind::With { object, body } => {
            v.visit_expr(object);
            v.visit_stmt(body);
        }
        StmtKind::Break { .. } | StmtKind::Continue { .. } | StmtKind::Empty | StmtKind::Debugger => {}
    }
}

/// Walk a binding pattern, reporting every bound identifier as `kind`.
pub fn walk_binding<V: VisitMut + ?Sized>(v: &mut V, binding: &mut Binding, kind: DeclKind) {
    match &mut binding.kind {
        BindingKind::Ident(ident) => v.visit_binding_ident(ident, kind),
        BindingKind::Array(elements) => {
            for element in elements.iter_mut().flatten() {
                walk_binding(v, &mut element.binding, kind);
                if let Some(default) = &mut element.default {
                    v.visit_expr(default);
                }
            }
        }
        BindingKind::Object(properties) => {
            for prop in properties {
                if !prop.rest {
                    v.visit_property_key(&mut prop.key);
                }
                walk_binding(v, &mut prop.value, kind);
                if let Some(default) = &mut prop.default {
                    v.visit_expr(default);
                }
            }
        }
    }
}

pub fn walk_property_key<V: VisitMut + ?Sized>(v: &mut V, key: &mut PropertyKey) {
    if let PropertyKey::Computed(expr) = key {
        v.visit_expr(expr);
    }
}

fn walk_params<V: VisitMut + ?Sized>(v: &mut V, params: &mut [Param]) {
    for param in params {
        walk_binding(v, &mut param.binding, DeclKind::Param);
        if let Some(default) = &mut param.default {
            v.visit_expr(default);
        }
    }
}

/// Walk a function's own scope: parameters and body.
fn walk_function_inner<V: VisitMut + ?Sized>(v: &mut V, func: &mut Function) {
    v.enter_scope(ScopeKind::Function);
    walk_params(v, &mut func.params);
    for stmt in &mut func.body {
        v.visit_stmt(stmt);
    }
    v.leave_scope();
}

pub fn walk_expr<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Null
        | ExprKind::Bool(_)
        | ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Regex { .. }
        | ExprKind::This => {}
        ExprKind::Template { exprs, .. } => {
            for e in exprs {
                v.visit_expr(e);
            }
        }
        ExprKind::Ident(ident) => v.visit_ident_ref(ident),
        ExprKind::Array(elements) => {
            for e in elements.iter_mut().flatten() {
                v.visit_expr(e);
            }
        }
        ExprKind::Object(props) => {
            for prop in props {
                if prop.kind != PropertyKind::Spread {
                    v.visit_property_key(&mut prop.key);
                }
                v.visit_expr(&mut prop.value);
            }
        }
        ExprKind::Function(func) => {
            v.enter_scope(ScopeKind::Function);
            if let Some(name) = &mut func.name {
                v.visit_binding_ident(name, DeclKind::FunctionName);
            }
            walk_params(v, &mut func.params);
            for stmt in &mut func.body {
                v.visit_stmt(stmt);
            }
            v.leave_scope();
        }
        ExprKind::Arrow(arrow) => {
            v.enter_scope(ScopeKind::Function);
            walk_params(v, &mut arrow.params);
            match &mut arrow.body {
                ArrowBody::Expr(body) => v.visit_expr(body),
                ArrowBody::Block(stmts) => {
                    for stmt in stmts {
                        v.visit_stmt(stmt);
                    }
                }
            }
            v.leave_scope();
        }
        ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } | ExprKind::Spread(arg) => {
            v.visit_expr(arg);
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Assign { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_expr(consequent);
            v.visit_expr(alternate);
        }
        ExprKind::Sequence(exprs) => {
            for e in exprs {
                v.visit_expr(e);
            }
        }
        ExprKind::Member { object, property } => {
            v.visit_expr(object);
            match property {
                MemberProp::Name(name) => v.visit_member_name(name),
                MemberProp::Computed(prop) => v.visit_expr(prop),
            }
        }
        ExprKind::Call { callee, args } | ExprKind::New { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(arg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParseOptions};

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl VisitMut for Recorder {
        fn enter_scope(&mut self, kind: ScopeKind) {
            self.events.push(format!("enter {kind:?}"));
        }

        fn leave_scope(&mut self) {
            self.events.push("leave".to_string());
        }

        fn visit_binding_ident(&mut self, ident: &mut Ident, kind: DeclKind) {
            self.events.push(format!("bind {} {kind:?}", ident.name));
        }

        fn visit_ident_ref(&mut self, ident: &mut Ident) {
            self.events.push(format!("ref {}", ident.name));
        }

        fn visit_member_name(&mut self, name: &mut String) {
            self.events.push(format!("member {name}"));
        }
    }

    fn record(source: &str) -> Vec<String> {
        let mut program = parse(source, ParseOptions::new("t.js")).unwrap();
        let mut recorder = Recorder::default();
        recorder.visit_program(&mut program);
        recorder.events
    }

    #[test]
    fn test_function_declaration_name_binds_outside() {
        let events = record("function f(a) { return a.b; }");
        assert_eq!(
            events,
            vec![
                "enter Program",
                "bind f Function",
                "enter Function",
                "bind a Param",
                "ref a",
                "member b",
                "leave",
                "leave",
            ]
        );
    }

    #[test]
    fn test_function_expression_name_binds_inside() {
        let events = record("x = function g() {};");
        assert_eq!(
            events,
            vec![
                "enter Program",
                "ref x",
                "enter Function",
                "bind g FunctionName",
                "leave",
                "leave",
            ]
        );
    }

    #[test]
    fn test_catch_scope() {
        let events = record("try { a } catch (e) { e }");
        assert_eq!(
            events,
            vec![
                "enter Program",
                "enter Block",
                "ref a",
                "leave",
                "enter Catch",
                "bind e CatchParam",
                "ref e",
                "leave",
                "leave",
            ]
        );
    }

    #[test]
    fn test_destructuring_bindings() {
        let events = record("let { a, b: [c, d = e] } = o;");
        assert_eq!(
            events,
            vec![
                "enter Program",
                "bind a Let",
                "bind c Let",
                "bind d Let",
                "ref e",
                "ref o",
                "leave",
            ]
        );
    }

    #[test]
    fn test_rename_through_visitor() {
        struct Upper;
        impl VisitMut for Upper {
            fn visit_ident_ref(&mut self, ident: &mut Ident) {
                ident.name = ident.name.to_uppercase();
            }
        }

        let mut program = parse("a + b.c;", ParseOptions::new("t.js")).unwrap();
        Upper.visit_program(&mut program);
        let StmtKind::Expr(expr) = &program.body[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary { left, right, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert!(matches!(&left.kind, ExprKind::Ident(i) if i.name == "A"));
        assert!(matches!(
            &right.kind,
            ExprKind::Member { property: MemberProp::Name(n), .. } if n == "c"
        ));
    }
}
