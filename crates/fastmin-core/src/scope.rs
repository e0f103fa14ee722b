//! Scope analysis.
//!
//! Two walks over the program build an arena of scopes and symbols. The
//! first walk creates scopes in pre-order and declares every binding in its
//! owning scope (hoisting `var` and function declarations). The second walk
//! replays the same scope sequence, resolves each identifier to a symbol and
//! records on every scope which outer symbols are used inside it.

use fastmin_syntax::visit::{walk_expr, walk_stmt};
use fastmin_syntax::{
    DeclKind, Expr, ExprKind, Ident, Program, ScopeKind, Stmt, StmtKind, SymbolId, VisitMut,
};
use rustc_hash::{FxHashMap, FxHashSet};

/// Handle into the scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The program scope.
    pub const ROOT: ScopeId = ScopeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a symbol came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Declared(DeclKind),
    /// A global referenced without any declaration in the program.
    Undeclared,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub scope: ScopeId,
    pub kind: SymbolKind,
    /// Reference sites (binding sites are not counted).
    pub references: u32,
    /// Assigned short name, once local mangling ran.
    pub mangled: Option<String>,
    /// For a catch parameter redeclared by `var` inside its clause: the
    /// hoisted symbol that shares its output name.
    pub redefined: Option<SymbolId>,
}

impl Symbol {
    pub fn is_declared(&self) -> bool {
        matches!(self.kind, SymbolKind::Declared(_))
    }

    /// The name this symbol has in the output.
    pub fn final_name(&self) -> &str {
        self.mangled.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Symbols declared here, in declaration order.
    pub symbols: Vec<SymbolId>,
    names: FxHashMap<String, SymbolId>,
    /// Symbols used in this scope or below that live here or further out.
    pub enclosed: Vec<SymbolId>,
    enclosed_set: FxHashSet<SymbolId>,
    /// Contains (or encloses a scope containing) a direct `eval` call.
    pub uses_eval: bool,
    /// Contains (or encloses a scope containing) a `with` statement.
    pub uses_with: bool,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            symbols: Vec::new(),
            names: FxHashMap::default(),
            enclosed: Vec::new(),
            enclosed_set: FxHashSet::default(),
            uses_eval: false,
            uses_with: false,
        }
    }

    /// Symbol declared here under `name`.
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    /// Whether names in this scope can be observed dynamically.
    pub fn is_dynamic(&self) -> bool {
        self.uses_eval || self.uses_with
    }
}

/// Scopes and symbols of one program.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl ScopeTree {
    /// Analyze `program`, filling the `symbol` slot of every identifier.
    pub fn analyze(program: &mut Program) -> Self {
        let mut declarer = Declarer {
            tree: ScopeTree::default(),
            stack: Vec::new(),
        };
        declarer.visit_program(program);

        let mut resolver = Resolver {
            tree: declarer.tree,
            stack: Vec::new(),
            entered: 0,
        };
        resolver.visit_program(program);

        let tree = resolver.tree;
        tracing::trace!(
            scopes = tree.scopes.len(),
            symbols = tree.symbols.len(),
            "scope analysis done"
        );
        tree
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Scopes in creation (pre-) order; parents come before children.
    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, s)| (ScopeId(i as u32), s))
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    /// Resolve `name` starting at `scope` and walking outward.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            if let Some(symbol) = s.get(name) {
                return Some(symbol);
            }
            current = s.parent;
        }
        None
    }

    /// Names declared in the program scope, in declaration order.
    pub fn top_level_names(&self) -> Vec<String> {
        let Some(root) = self.scopes.first() else {
            return Vec::new();
        };
        root.symbols
            .iter()
            .map(|id| self.symbol(*id))
            .filter(|s| s.is_declared())
            .map(|s| s.name.clone())
            .collect()
    }

    fn add_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, parent));
        id
    }

    fn add_symbol(&mut self, scope: ScopeId, name: &str, kind: SymbolKind) -> SymbolId {
        if let Some(existing) = self.scope(scope).get(name) {
            return existing;
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.to_string(),
            scope,
            kind,
            references: 0,
            mangled: None,
            redefined: None,
        });
        let s = &mut self.scopes[scope.index()];
        s.symbols.push(id);
        s.names.insert(name.to_string(), id);
        id
    }

    /// Record `symbol` as used in every scope from `from` out to its own.
    fn mark_enclosed(&mut self, from: ScopeId, symbol: SymbolId) {
        let owner = self.symbol(symbol).scope;
        let mut current = Some(from);
        while let Some(id) = current {
            let s = &mut self.scopes[id.index()];
            if s.enclosed_set.insert(symbol) {
                s.enclosed.push(symbol);
            }
            if id == owner {
                break;
            }
            current = s.parent;
        }
    }

    /// Nearest function or program scope on `stack`.
    fn hoist_target(&self, stack: &[ScopeId]) -> ScopeId {
        stack
            .iter()
            .rev()
            .copied()
            .find(|id| self.scope(*id).kind.is_hoist_target())
            .unwrap_or(ScopeId::ROOT)
    }

    fn mark_ancestors(&mut self, from: ScopeId, mut mark: impl FnMut(&mut Scope)) {
        let mut current = Some(from);
        while let Some(id) = current {
            let s = &mut self.scopes[id.index()];
            mark(s);
            current = s.parent;
        }
    }
}

/// First walk: create scopes and declare bindings.
struct Declarer {
    tree: ScopeTree,
    stack: Vec<ScopeId>,
}

impl Declarer {
    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeId::ROOT)
    }

    fn hoist_target(&self) -> ScopeId {
        self.tree.hoist_target(&self.stack)
    }
}

impl VisitMut for Declarer {
    fn enter_scope(&mut self, kind: ScopeKind) {
        let parent = self.stack.last().copied();
        let id = self.tree.add_scope(kind, parent);
        self.stack.push(id);
    }

    fn leave_scope(&mut self) {
        self.stack.pop();
    }

    fn visit_binding_ident(&mut self, ident: &mut Ident, kind: DeclKind) {
        let scope = if kind.hoists() {
            self.hoist_target()
        } else {
            self.current()
        };
        self.tree
            .add_symbol(scope, &ident.name, SymbolKind::Declared(kind));
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        if matches!(stmt.kind, StmtKind::With { .. }) {
            let current = self.current();
            self.tree.mark_ancestors(current, |s| s.uses_with = true);
        }
        walk_stmt(self, stmt);
    }
}

/// Second walk: resolve identifiers against the declared scopes.
struct Resolver {
    tree: ScopeTree,
    stack: Vec<ScopeId>,
    entered: u32,
}

impl Resolver {
    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeId::ROOT)
    }

    fn resolve(&mut self, name: &str) -> SymbolId {
        let current = self.current();
        match self.tree.lookup(current, name) {
            Some(symbol) => symbol,
            None => self
                .tree
                .add_symbol(ScopeId::ROOT, name, SymbolKind::Undeclared),
        }
    }

    fn is_direct_eval(&self, expr: &Expr) -> bool {
        let ExprKind::Call { callee, .. } = &expr.kind else {
            return false;
        };
        let ExprKind::Ident(ident) = &callee.kind else {
            return false;
        };
        ident.name == "eval"
            && self
                .tree
                .lookup(self.current(), "eval")
                .map_or(true, |s| !self.tree.symbol(s).is_declared())
    }
}

impl VisitMut for Resolver {
    fn enter_scope(&mut self, _kind: ScopeKind) {
        self.stack.push(ScopeId(self.entered));
        self.entered += 1;
    }

    fn leave_scope(&mut self) {
        self.stack.pop();
    }

    fn visit_binding_ident(&mut self, ident: &mut Ident, kind: DeclKind) {
        let symbol = self.resolve(&ident.name);
        ident.symbol = Some(symbol);
        let current = self.current();
        self.tree.mark_enclosed(current, symbol);

        // `catch (e) { var e = 1; }` writes the catch parameter but declares
        // `e` in the enclosing function as well.
        let owner = self.tree.symbol(symbol).scope;
        if kind.hoists() && self.tree.scope(owner).kind == ScopeKind::Catch {
            let target = self.tree.hoist_target(&self.stack);
            if let Some(hoisted) = self.tree.scope(target).get(&ident.name) {
                if hoisted != symbol {
                    self.tree.symbol_mut(symbol).redefined = Some(hoisted);
                    self.tree.mark_enclosed(current, hoisted);
                }
            }
        }
    }

    fn visit_ident_ref(&mut self, ident: &mut Ident) {
        let symbol = self.resolve(&ident.name);
        ident.symbol = Some(symbol);
        self.tree.symbol_mut(symbol).references += 1;
        let current = self.current();
        self.tree.mark_enclosed(current, symbol);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        if self.is_direct_eval(expr) {
            let current = self.current();
            self.tree.mark_ancestors(current, |s| s.uses_eval = true);
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastmin_syntax::{parse, ParseOptions};

    fn analyze(source: &str) -> (Program, ScopeTree) {
        let mut program = parse(source, ParseOptions::new("t.js")).unwrap();
        let tree = ScopeTree::analyze(&mut program);
        (program, tree)
    }

    fn names_in(tree: &ScopeTree, scope: ScopeId) -> Vec<String> {
        tree.scope(scope)
            .symbols
            .iter()
            .map(|id| tree.symbol(*id).name.clone())
            .collect()
    }

    #[test]
    fn test_var_hoists_out_of_blocks() {
        let (_, tree) = analyze("function f() { if (x) { var a; let b; } }");
        // program, f, block
        assert_eq!(tree.scope_count(), 3);
        assert_eq!(names_in(&tree, ScopeId(1)), vec!["a"]);
        assert_eq!(names_in(&tree, ScopeId(2)), vec!["b"]);
        assert_eq!(names_in(&tree, ScopeId::ROOT), vec!["f", "x"]);
    }

    #[test]
    fn test_undeclared_globals_live_in_root() {
        let (_, tree) = analyze("var a = b; function g() { return c + a; }");
        let root = tree.scope(ScopeId::ROOT);
        let b = tree.symbol(root.get("b").unwrap());
        assert_eq!(b.kind, SymbolKind::Undeclared);
        assert_eq!(tree.top_level_names(), vec!["a", "g"]);
        let a = tree.symbol(root.get("a").unwrap());
        assert_eq!(a.references, 1);
    }

    #[test]
    fn test_shadowing_resolves_to_inner_binding() {
        let (program, tree) = analyze("var x = 1; function f(x) { return x; }");
        let inner = tree.scope(ScopeId(1)).get("x").unwrap();
        let outer = tree.scope(ScopeId::ROOT).get("x").unwrap();
        assert_ne!(inner, outer);
        assert_eq!(tree.symbol(inner).references, 1);
        assert_eq!(tree.symbol(outer).references, 0);

        let StmtKind::Function(func) = &program.body[1].kind else {
            panic!("expected function");
        };
        let StmtKind::Return { arg: Some(arg) } = &func.body[0].kind else {
            panic!("expected return");
        };
        let ExprKind::Ident(ident) = &arg.kind else {
            panic!("expected identifier");
        };
        assert_eq!(ident.symbol, Some(inner));
    }

    #[test]
    fn test_enclosed_tracks_outer_references() {
        let (_, tree) = analyze("var a; function f() { function g() { return a; } }");
        let a = tree.scope(ScopeId::ROOT).get("a").unwrap();
        // f is scope 1, g is scope 2
        assert!(tree.scope(ScopeId(1)).enclosed.contains(&a));
        assert!(tree.scope(ScopeId(2)).enclosed.contains(&a));
        assert!(tree.scope(ScopeId::ROOT).enclosed.contains(&a));
    }

    #[test]
    fn test_function_expression_name_is_local() {
        let (_, tree) = analyze("var h = function g() { return g; };");
        assert_eq!(names_in(&tree, ScopeId::ROOT), vec!["h"]);
        assert_eq!(names_in(&tree, ScopeId(1)), vec!["g"]);
    }

    #[test]
    fn test_catch_parameter_scope() {
        let (_, tree) = analyze("try {} catch (e) { var v = e; }");
        // program, try block, catch
        assert_eq!(tree.scope(ScopeId(2)).kind, ScopeKind::Catch);
        assert_eq!(names_in(&tree, ScopeId(2)), vec!["e"]);
        assert_eq!(names_in(&tree, ScopeId::ROOT), vec!["v"]);
    }

    #[test]
    fn test_var_redeclaring_catch_parameter() {
        let (_, tree) = analyze("function f() { try {} catch (e) { var e = 1; } return e; }");
        // program, f, try block, catch
        let hoisted = tree.scope(ScopeId(1)).get("e").unwrap();
        let param = tree.scope(ScopeId(3)).get("e").unwrap();
        assert_ne!(hoisted, param);
        assert_eq!(tree.symbol(param).redefined, Some(hoisted));
        assert_eq!(tree.symbol(hoisted).redefined, None);
        assert!(tree.scope(ScopeId(3)).enclosed.contains(&hoisted));
    }

    #[test]
    fn test_direct_eval_marks_ancestors() {
        let (_, tree) =
            analyze("function f() { function g() { eval('x'); } } function h() {}");
        assert!(tree.scope(ScopeId(2)).uses_eval);
        assert!(tree.scope(ScopeId(1)).uses_eval);
        assert!(tree.scope(ScopeId::ROOT).uses_eval);
        assert!(!tree.scope(ScopeId(3)).uses_eval);
    }

    #[test]
    fn test_shadowed_eval_is_not_direct() {
        let (_, tree) = analyze("function f(eval) { eval('x'); }");
        assert!(!tree.scope(ScopeId(1)).uses_eval);
    }

    #[test]
    fn test_with_marks_ancestors() {
        let (_, tree) = analyze("function f(o) { with (o) { x; } }");
        assert!(tree.scope(ScopeId(1)).uses_with);
        assert!(tree.scope(ScopeId::ROOT).uses_with);
        assert!(tree.scope(ScopeId(1)).is_dynamic());
    }

    #[test]
    fn test_redeclaration_reuses_symbol() {
        let (_, tree) = analyze("var a = 1; var a = 2; a;");
        assert_eq!(tree.symbol_count(), 1);
        assert_eq!(tree.symbol(SymbolId(0)).references, 1);
    }
}
