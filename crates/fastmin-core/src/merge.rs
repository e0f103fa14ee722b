//! Source merging.
//!
//! Every input unit is parsed into the same [`Program`], in input order, and
//! its text is kept under its unit id for the source map. Path inputs with
//! `*` or `?` in the file name are expanded against a directory listing.

use crate::error::{Error, Result};
use crate::scope::ScopeTree;
use fastmin_syntax::{
    parse, Binding, BindingKind, Expr, ExprKind, Function, Ident, Param, ParseOptions, Program,
    Span, Stmt, StmtKind,
};
use fastmin_util::FileSystem;
use indexmap::IndexMap;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One or more source designators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    /// A file path or a glob pattern.
    Path(PathBuf),
    /// Inline code; its unit id is its position in the flattened input.
    Code(String),
    /// Inline code keyed by unit id, in insertion order.
    Named(IndexMap<String, String>),
    /// Nested inputs, flattened depth first.
    List(Vec<SourceInput>),
}

impl SourceInput {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        SourceInput::Path(path.into())
    }

    pub fn code(code: impl Into<String>) -> Self {
        SourceInput::Code(code.into())
    }

    /// Inline units with explicit ids.
    pub fn named<K, V>(units: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        SourceInput::Named(
            units
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Vec<SourceInput>> for SourceInput {
    fn from(inputs: Vec<SourceInput>) -> Self {
        SourceInput::List(inputs)
    }
}

/// The merged program and the text of every unit.
#[derive(Debug, Clone)]
pub struct MergedSource {
    pub program: Program,
    /// Unit id to original text, in unit order.
    pub sources: IndexMap<String, String>,
}

enum UnitId {
    Given(String),
    Index(usize),
}

enum Designator<'a> {
    Path(&'a Path),
    Code(usize, &'a str),
    Named(&'a str, &'a str),
}

fn flatten<'a>(input: &'a SourceInput, out: &mut Vec<Designator<'a>>) {
    match input {
        SourceInput::Path(path) => out.push(Designator::Path(path)),
        SourceInput::Code(code) => out.push(Designator::Code(out.len(), code)),
        SourceInput::Named(units) => {
            for (id, code) in units {
                out.push(Designator::Named(id, code));
            }
        }
        SourceInput::List(inputs) => {
            for input in inputs {
                flatten(input, out);
            }
        }
    }
}

/// Read, parse and concatenate every unit of `input`.
pub fn merge_sources(
    input: &SourceInput,
    fs: &dyn FileSystem,
    bare_returns: bool,
) -> Result<MergedSource> {
    let mut designators = Vec::new();
    flatten(input, &mut designators);

    let mut units: Vec<(UnitId, String)> = Vec::new();
    for designator in designators {
        match designator {
            Designator::Path(pattern) => {
                for path in expand_glob(fs, pattern)? {
                    let text = fs
                        .read_to_string(&path)
                        .map_err(|source| Error::ReadSource {
                            path: path.clone(),
                            source,
                        })?;
                    units.push((UnitId::Given(path.to_string_lossy().into_owned()), text));
                }
            }
            Designator::Code(index, code) => units.push((UnitId::Index(index), code.to_string())),
            Designator::Named(id, code) => {
                units.push((UnitId::Given(id.to_string()), code.to_string()));
            }
        }
    }

    let mut taken = BTreeSet::new();
    for (id, _) in &units {
        if let UnitId::Given(id) = id {
            if !taken.insert(id.clone()) {
                return Err(Error::options(format!("duplicate source unit id `{id}`")));
            }
        }
    }

    let mut program = Program::default();
    let mut sources = IndexMap::new();
    for (id, text) in units {
        let id = match id {
            UnitId::Given(id) => id,
            // Inline code takes its index, or the next number no other unit uses
            UnitId::Index(mut index) => {
                while taken.contains(&index.to_string()) {
                    index += 1;
                }
                let id = index.to_string();
                taken.insert(id.clone());
                id
            }
        };
        let options = ParseOptions::new(id.as_str())
            .with_toplevel(program)
            .with_bare_returns(bare_returns);
        program = parse(&text, options)?;
        tracing::debug!(unit = %id, bytes = text.len(), "parsed unit");
        sources.insert(id, text);
    }
    Ok(MergedSource { program, sources })
}

/// Expand `*` and `?` in the file-name part of `pattern`.
///
/// Without wildcards, or when nothing matches, the pattern itself is
/// returned so that reading it reports the missing file.
pub fn expand_glob(fs: &dyn FileSystem, pattern: &Path) -> Result<Vec<PathBuf>> {
    let Some(file_name) = pattern.file_name().and_then(|n| n.to_str()) else {
        return Ok(vec![pattern.to_path_buf()]);
    };
    if !file_name.contains(['*', '?']) {
        return Ok(vec![pattern.to_path_buf()]);
    }

    let dir = match pattern.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let regex = glob_regex(file_name)?;
    let entries = match fs.list_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "glob directory not listable");
            return Ok(vec![pattern.to_path_buf()]);
        }
    };

    let mut matches: Vec<String> = entries.into_iter().filter(|e| regex.is_match(e)).collect();
    if matches.is_empty() {
        return Ok(vec![pattern.to_path_buf()]);
    }
    matches.sort();
    let dir = dir.to_string_lossy();
    Ok(matches
        .into_iter()
        .map(|entry| PathBuf::from(format!("{dir}/{entry}")))
        .collect())
}

/// Anchored regex for a file-name wildcard.
fn glob_regex(glob: &str) -> Result<Regex> {
    let mut pattern = String::from(if cfg!(windows) { "(?i)^" } else { "^" });
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(r"[^/\\]*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex_lite::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| Error::InvalidRegex {
        pattern: glob.to_string(),
        message: e.to_string(),
    })
}

/// Which top-level bindings a module wrap exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportSpec {
    #[default]
    None,
    All,
    Names(Vec<String>),
}

/// Wrap the program in a function that publishes `exports` as a global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleWrap {
    /// Global name that receives the exports object.
    pub name: String,
    #[serde(default)]
    pub exports: ExportSpec,
}

impl ModuleWrap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: ExportSpec::None,
        }
    }

    #[must_use]
    pub fn with_exports(mut self, exports: ExportSpec) -> Self {
        self.exports = exports;
        self
    }
}

fn synthetic_param(name: &str) -> Param {
    Param {
        binding: Binding::new(
            BindingKind::Ident(Ident::new(name, Span::SYNTHETIC)),
            Span::SYNTHETIC,
        ),
        default: None,
        rest: false,
        span: Span::SYNTHETIC,
    }
}

fn function_expr(params: Vec<Param>, body: Vec<Stmt>) -> Expr {
    Expr::new(
        ExprKind::Function(Box::new(Function {
            name: None,
            params,
            body,
            span: Span::SYNTHETIC,
        })),
        Span::SYNTHETIC,
    )
}

fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: Box::new(callee),
            args,
        },
        Span::SYNTHETIC,
    )
}

/// Wrap the merged program as
/// `(function(exports, global){ ...; exports["x"] = x; global["name"] = exports; }({}, function(){ return this }()))`.
pub fn wrap_module(mut program: Program, wrap: &ModuleWrap) -> Program {
    let exported = match &wrap.exports {
        ExportSpec::None => Vec::new(),
        ExportSpec::All => ScopeTree::analyze(&mut program).top_level_names(),
        ExportSpec::Names(names) => names.clone(),
    };

    let mut body = std::mem::take(&mut program.body);
    for name in &exported {
        body.push(Stmt::expr(Expr::assign(
            Expr::index(Expr::ident("exports"), Expr::string(name.as_str())),
            Expr::ident(name.as_str()),
        )));
    }
    body.push(Stmt::expr(Expr::assign(
        Expr::index(Expr::ident("global"), Expr::string(wrap.name.as_str())),
        Expr::ident("exports"),
    )));

    let global_this = call(
        function_expr(
            Vec::new(),
            vec![Stmt::new(
                StmtKind::Return {
                    arg: Some(Expr::new(ExprKind::This, Span::SYNTHETIC)),
                },
                Span::SYNTHETIC,
            )],
        ),
        Vec::new(),
    );
    let wrapper = call(
        function_expr(vec![synthetic_param("exports"), synthetic_param("global")], body),
        vec![Expr::new(ExprKind::Object(Vec::new()), Span::SYNTHETIC), global_this],
    );

    tracing::debug!(name = %wrap.name, exports = exported.len(), "wrapped program");
    program.body = vec![Stmt::expr(wrapper)];
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastmin_syntax::{Codegen, CodegenOptions};
    use fastmin_util::MemoryFs;

    fn render(program: &Program) -> String {
        Codegen::new(program, CodegenOptions::default()).generate()
    }

    #[test]
    fn test_inline_units_share_one_program() {
        let fs = MemoryFs::new();
        let input = SourceInput::named([("A", "var a = 1;"), ("B", "var b = a + 1;")]);
        let merged = merge_sources(&input, &fs, false).unwrap();
        assert_eq!(render(&merged.program), "var a=1;var b=a+1");
        assert_eq!(merged.sources.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(merged.program.units.len(), 2);
        assert_eq!(merged.program.units[1].base, 11);
    }

    #[test]
    fn test_nested_lists_flatten_in_order() {
        let fs = MemoryFs::new().with_file("lib.js", "lib();");
        let input = SourceInput::List(vec![
            SourceInput::code("first();"),
            SourceInput::List(vec![SourceInput::path("lib.js"), SourceInput::code("last();")]),
        ]);
        let merged = merge_sources(&input, &fs, false).unwrap();
        assert_eq!(render(&merged.program), "first();lib();last()");
        assert_eq!(
            merged.sources.keys().collect::<Vec<_>>(),
            vec!["0", "lib.js", "2"]
        );
    }

    #[test]
    fn test_inline_code_ids_skip_given_ids() {
        let fs = MemoryFs::new();
        let input = SourceInput::List(vec![
            SourceInput::named([("1", "first();")]),
            SourceInput::code("second();"),
            SourceInput::code("third();"),
        ]);
        let merged = merge_sources(&input, &fs, false).unwrap();
        assert_eq!(
            merged.sources.into_iter().collect::<Vec<_>>(),
            vec![
                ("1".to_string(), "first();".to_string()),
                ("2".to_string(), "second();".to_string()),
                ("3".to_string(), "third();".to_string()),
            ]
        );
        assert_eq!(merged.program.units.len(), 3);
    }

    #[test]
    fn test_duplicate_unit_ids_are_rejected() {
        let fs = MemoryFs::new().with_file("a.js", "a();");
        let input = SourceInput::List(vec![SourceInput::path("a.js"), SourceInput::path("a.js")]);
        let err = merge_sources(&input, &fs, false).unwrap_err();
        assert!(matches!(err, Error::Options(_)));
    }

    #[test]
    fn test_missing_file_is_an_input_error() {
        let fs = MemoryFs::new();
        let err = merge_sources(&SourceInput::path("nope.js"), &fs, false).unwrap_err();
        assert!(matches!(err, Error::ReadSource { .. }));
    }

    #[test]
    fn test_parse_errors_carry_the_unit() {
        let fs = MemoryFs::new();
        let input = SourceInput::named([("ok.js", "a;"), ("bad.js", "var = 1;")]);
        let err = merge_sources(&input, &fs, false).unwrap_err();
        let Error::Parse(parse) = err else {
            panic!("expected parse error");
        };
        assert_eq!(parse.filename, "bad.js");
        assert_eq!(parse.line, 1);
    }

    #[test]
    fn test_bare_returns() {
        let fs = MemoryFs::new();
        let input = SourceInput::code("return 1;");
        assert!(merge_sources(&input, &fs, false).is_err());
        assert!(merge_sources(&input, &fs, true).is_ok());
    }

    #[test]
    fn test_glob_expansion_is_sorted_and_anchored() {
        let fs = MemoryFs::new()
            .with_file("src/b.js", "")
            .with_file("src/a.js", "")
            .with_file("src/a.jsx", "")
            .with_file("src/notes.txt", "");
        let paths = expand_glob(&fs, Path::new("src/*.js")).unwrap();
        assert_eq!(paths, vec![PathBuf::from("src/a.js"), PathBuf::from("src/b.js")]);

        let paths = expand_glob(&fs, Path::new("src/?.js")).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_glob_escapes_metacharacters() {
        let fs = MemoryFs::new()
            .with_file("d/a+b.js", "")
            .with_file("d/aab.js", "")
            .with_file("d/x|y.js", "");
        assert_eq!(
            expand_glob(&fs, Path::new("d/a+b*")).unwrap(),
            vec![PathBuf::from("d/a+b.js")]
        );
        assert_eq!(
            expand_glob(&fs, Path::new("d/x|y.*")).unwrap(),
            vec![PathBuf::from("d/x|y.js")]
        );
    }

    #[test]
    fn test_glob_without_matches_is_verbatim() {
        let fs = MemoryFs::new().with_file("src/a.js", "");
        assert_eq!(
            expand_glob(&fs, Path::new("src/*.ts")).unwrap(),
            vec![PathBuf::from("src/*.ts")]
        );
        assert_eq!(
            expand_glob(&fs, Path::new("missing/*.js")).unwrap(),
            vec![PathBuf::from("missing/*.js")]
        );
        assert_eq!(
            expand_glob(&fs, Path::new("plain.js")).unwrap(),
            vec![PathBuf::from("plain.js")]
        );
    }

    #[test]
    fn test_glob_in_current_directory() {
        let fs = MemoryFs::new().with_file("one.js", "");
        assert_eq!(
            expand_glob(&fs, Path::new("*.js")).unwrap(),
            vec![PathBuf::from("./one.js")]
        );
    }

    #[test]
    fn test_wrap_exports_all_top_level_bindings() {
        let fs = MemoryFs::new();
        let input = SourceInput::code("var a = 1; function f() {}");
        let merged = merge_sources(&input, &fs, false).unwrap();
        let wrapped = wrap_module(
            merged.program,
            &ModuleWrap::new("lib").with_exports(ExportSpec::All),
        );
        assert_eq!(
            render(&wrapped),
            "(function(exports,global){var a=1;function f(){}exports[\"a\"]=a;exports[\"f\"]=f;global[\"lib\"]=exports}({},function(){return this}()))"
        );
    }

    #[test]
    fn test_wrap_without_exports() {
        let fs = MemoryFs::new();
        let merged = merge_sources(&SourceInput::code("x();"), &fs, false).unwrap();
        let wrapped = wrap_module(merged.program, &ModuleWrap::new("m"));
        assert_eq!(
            render(&wrapped),
            "(function(exports,global){x();global[\"m\"]=exports}({},function(){return this}()))"
        );
        assert_eq!(wrapped.units.len(), 1);
    }
}
