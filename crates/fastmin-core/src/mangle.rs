//! Local name mangling.
//!
//! Bindings get the shortest names available from a frequency-sorted
//! alphabet. Scopes are handled parents first, each with its own cursor; a
//! candidate is rejected when it equals the final name of a symbol declared
//! in the scope or of any outer symbol used inside it.

use crate::error::{Error, Result};
use crate::names::{Alphabet, CharFrequency, Cursor};
use crate::options::MangleOptions;
use crate::scope::{ScopeId, ScopeTree};
use fastmin_syntax::visit::{walk_expr, walk_property_key, walk_stmt};
use fastmin_syntax::{
    format_number, BinaryOp, DeclKind, Expr, ExprKind, Ident, Program, PropertyKey, Stmt,
    StmtKind, SymbolId, UnaryOp, VisitMut,
};
use rustc_hash::FxHashSet;

/// Whether `symbol` may be renamed under `options`.
pub fn is_mangleable(scopes: &ScopeTree, symbol: SymbolId, options: &MangleOptions) -> bool {
    let sym = scopes.symbol(symbol);
    if !sym.is_declared() {
        return false;
    }
    if sym.scope == ScopeId::ROOT && !options.top_level {
        return false;
    }
    if scopes.scope(sym.scope).is_dynamic() {
        return false;
    }
    !options.reserved.iter().any(|r| *r == sym.name)
}

/// Count the characters that will survive mangling.
pub fn compute_frequency(
    program: &mut Program,
    scopes: &ScopeTree,
    options: &MangleOptions,
) -> CharFrequency {
    let mut counter = FrequencyCounter {
        scopes,
        options,
        freq: CharFrequency::new(),
    };
    counter.visit_program(program);
    counter.freq
}

/// Assign short names to every mangleable binding and rewrite the tree.
///
/// Returns the number of renamed symbols.
pub fn mangle_locals(
    program: &mut Program,
    scopes: &mut ScopeTree,
    options: &MangleOptions,
    alphabet: &Alphabet,
) -> Result<usize> {
    let reserved: FxHashSet<&str> = options.reserved.iter().map(String::as_str).collect();
    let mut renamed = 0;

    for index in 0..scopes.scope_count() {
        let scope_id = ScopeId(index as u32);
        let scope = scopes.scope(scope_id);

        let candidates: Vec<SymbolId> = scope
            .symbols
            .iter()
            .copied()
            .filter(|id| is_mangleable(scopes, *id, options))
            .collect();
        if candidates.is_empty() {
            continue;
        }
        // A catch parameter redeclared by `var` follows the hoisted symbol,
        // which an outer scope has already named.
        let (redefined, mut pending): (Vec<SymbolId>, Vec<SymbolId>) = candidates
            .iter()
            .copied()
            .partition(|id| scopes.symbol(*id).redefined.is_some());
        if options.sort_by_references {
            pending.sort_by(|a, b| {
                scopes
                    .symbol(*b)
                    .references
                    .cmp(&scopes.symbol(*a).references)
            });
        }

        // Names already fixed: outer symbols used here and this scope's
        // own symbols that keep their name.
        let mut taken: FxHashSet<String> = scope
            .enclosed
            .iter()
            .chain(scope.symbols.iter())
            .filter(|id| !candidates.contains(id))
            .map(|id| scopes.symbol(*id).final_name().to_string())
            .collect();

        for symbol in redefined {
            let hoisted = scopes.symbol(symbol).redefined.map(|h| scopes.symbol(h));
            if let Some(name) = hoisted.and_then(|h| h.mangled.clone()) {
                taken.insert(name.clone());
                scopes.symbol_mut(symbol).mangled = Some(name);
                renamed += 1;
            }
        }

        let mut cursor = Cursor::new();
        for symbol in pending {
            let name = cursor
                .next(alphabet, |candidate| {
                    reserved.contains(candidate) || taken.contains(candidate)
                })
                .ok_or_else(|| Error::NameSpaceExhausted {
                    scope: format!("scope {index}"),
                })?;
            taken.insert(name.clone());
            scopes.symbol_mut(symbol).mangled = Some(name);
            renamed += 1;
        }
    }

    Renamer { scopes }.visit_program(program);
    Ok(renamed)
}

/// Copies assigned names onto identifier occurrences.
struct Renamer<'a> {
    scopes: &'a ScopeTree,
}

impl Renamer<'_> {
    fn rename(&self, ident: &mut Ident) {
        if let Some(symbol) = ident.symbol {
            if let Some(mangled) = &self.scopes.symbol(symbol).mangled {
                ident.mangled = Some(mangled.clone());
            }
        }
    }
}

impl VisitMut for Renamer<'_> {
    fn visit_binding_ident(&mut self, ident: &mut Ident, _kind: DeclKind) {
        self.rename(ident);
    }

    fn visit_ident_ref(&mut self, ident: &mut Ident) {
        self.rename(ident);
    }
}

struct FrequencyCounter<'a> {
    scopes: &'a ScopeTree,
    options: &'a MangleOptions,
    freq: CharFrequency,
}

impl FrequencyCounter<'_> {
    fn ident(&mut self, ident: &Ident) {
        let keeps_name = ident
            .symbol
            .map_or(true, |s| !is_mangleable(self.scopes, s, self.options));
        if keeps_name {
            self.freq.consider(&ident.name);
        }
    }
}

impl VisitMut for FrequencyCounter<'_> {
    fn visit_binding_ident(&mut self, ident: &mut Ident, _kind: DeclKind) {
        self.ident(ident);
    }

    fn visit_ident_ref(&mut self, ident: &mut Ident) {
        self.ident(ident);
    }

    fn visit_member_name(&mut self, name: &mut String) {
        self.freq.consider(name);
    }

    fn visit_property_key(&mut self, key: &mut PropertyKey) {
        match key {
            PropertyKey::Ident(name) | PropertyKey::String(name) => self.freq.consider(name),
            PropertyKey::Number(n) => self.freq.consider(&format_number(n.abs())),
            PropertyKey::Computed(_) => {}
        }
        walk_property_key(self, key);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        let keyword = match &stmt.kind {
            StmtKind::Var { kind, .. } => Some(kind.as_str()),
            StmtKind::Function(_) => Some("function"),
            StmtKind::If { alternate, .. } => Some(if alternate.is_some() { "ifelse" } else { "if" }),
            StmtKind::Switch { .. } => Some("switchcase"),
            StmtKind::For { .. } => Some("for"),
            StmtKind::ForIn { .. } => Some("forin"),
            StmtKind::ForOf { .. } => Some("forof"),
            StmtKind::While { .. } => Some("while"),
            StmtKind::DoWhile { .. } => Some("dowhile"),
            StmtKind::Break { .. } => Some("break"),
            StmtKind::Continue { .. } => Some("continue"),
            StmtKind::Return { .. } => Some("return"),
            StmtKind::Throw { .. } => Some("throw"),
            StmtKind::Try {
                handler, finalizer, ..
            } => Some(match (handler.is_some(), finalizer.is_some()) {
                (true, true) => "trycatchfinally",
                (true, false) => "trycatch",
                _ => "tryfinally",
            }),
            StmtKind::With { .. } => Some("with"),
            StmtKind::Debugger => Some("debugger"),
            StmtKind::Block(_) | StmtKind::Expr(_) | StmtKind::Empty | StmtKind::Labeled { .. } => None,
        };
        if let Some(keyword) = keyword {
            self.freq.consider(keyword);
        }
        match &stmt.kind {
            StmtKind::Labeled { label, .. } => self.freq.consider(label),
            StmtKind::Break { label: Some(label) } | StmtKind::Continue { label: Some(label) } => {
                self.freq.consider(label);
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        match &expr.kind {
            ExprKind::Null => self.freq.consider("null"),
            ExprKind::Bool(b) => self.freq.consider(if *b { "true" } else { "false" }),
            ExprKind::Number(n) => self.freq.consider(&format_number(n.abs())),
            ExprKind::String(s) => self.freq.consider(s),
            ExprKind::Regex { pattern, flags } => {
                self.freq.consider(pattern);
                self.freq.consider(flags);
            }
            ExprKind::Template { quasis, .. } => {
                for quasi in quasis {
                    self.freq.consider(quasi);
                }
            }
            ExprKind::This => self.freq.consider("this"),
            ExprKind::Function(_) => self.freq.consider("function"),
            ExprKind::New { .. } => self.freq.consider("new"),
            ExprKind::Unary { op, .. } => match op {
                UnaryOp::Typeof => self.freq.consider("typeof"),
                UnaryOp::Void => self.freq.consider("void"),
                UnaryOp::Delete => self.freq.consider("delete"),
                _ => {}
            },
            ExprKind::Binary { op, .. } => match op {
                BinaryOp::In => self.freq.consider("in"),
                BinaryOp::Instanceof => self.freq.consider("instanceof"),
                _ => {}
            },
            _ => {}
        }
        walk_expr(self, expr);
    }
}
