//! End-to-end pipeline scenarios.

use fastmin_core::name_cache::{NameCache, PROPS_KEY};
use fastmin_core::sourcemap::{MapTarget, MapUrl, Original, SourceMap};
use fastmin_core::{
    minify, Alphabet, CompressOptions, Error, ExportSpec, GlobalDef, InputMap, MangleOptions,
    MinifyOptions, ModuleWrap, PropsOptions, ScopeTree, SourceInput,
};
use fastmin_syntax::{parse, DeclKind, Ident, ParseOptions, SymbolId, VisitMut};
use fastmin_util::{MemoryFs, OsFs};
use serial_test::serial;

fn top_level() -> MangleOptions {
    MangleOptions {
        top_level: true,
        ..Default::default()
    }
}

fn external_map() -> MapTarget {
    MapTarget::External {
        file: "out.js.map".to_string(),
        url: MapUrl::Omit,
    }
}

/// Symbol of every identifier occurrence, in tree order.
#[derive(Default)]
struct Resolutions(Vec<(Option<SymbolId>, bool)>);

impl VisitMut for Resolutions {
    fn visit_binding_ident(&mut self, ident: &mut Ident, _kind: DeclKind) {
        self.0.push((ident.symbol, true));
    }

    fn visit_ident_ref(&mut self, ident: &mut Ident) {
        self.0.push((ident.symbol, false));
    }
}

fn resolutions(source: &str) -> Vec<(Option<SymbolId>, bool)> {
    let mut program = parse(source, ParseOptions::new("t.js")).unwrap();
    let _scopes = ScopeTree::analyze(&mut program);
    let mut collector = Resolutions::default();
    collector.visit_program(&mut program);
    collector.0
}

/// Names that resolve to no declaration.
fn undeclared(source: &str) -> Vec<String> {
    let mut program = parse(source, ParseOptions::new("t.js")).unwrap();
    let scopes = ScopeTree::analyze(&mut program);
    scopes
        .symbols()
        .filter(|(_, symbol)| !symbol.is_declared())
        .map(|(_, symbol)| symbol.name.clone())
        .collect()
}

#[test]
fn test_two_units_share_top_level() {
    let fs = MemoryFs::new();
    let input = SourceInput::named([("A", "var a = 1;"), ("B", "var b = a + 1;")]);

    let plain = minify(&input, &MinifyOptions::default(), &fs).unwrap();
    assert_eq!(plain.code, "var a=1;var b=a+1");

    let options = MinifyOptions::new().with_mangle_options(top_level());
    let mangled = minify(&input, &options, &fs).unwrap();
    // `var` makes `a`, `r` and `v` the most frequent leading characters
    assert_eq!(mangled.code, "var a=1;var r=a+1");
}

#[test]
fn test_output_is_deterministic() {
    let fs = MemoryFs::new();
    let input = SourceInput::List(vec![
        SourceInput::code("function greet(name) { var message = 'hi ' + name; return message; }"),
        SourceInput::code("var people = ['ann', 'bob']; people.forEach(greet);"),
    ]);
    let options = MinifyOptions::new()
        .with_mangle_options(top_level())
        .with_source_map(external_map())
        .with_include_sources(true);

    let first = minify(&input, &options, &fs).unwrap();
    let second = minify(&input, &options, &fs).unwrap();
    assert_eq!(first, second);
    assert!(first.map.is_some());
}

#[test]
fn test_mangling_preserves_every_resolution() {
    let source = "var counter = 0;
        function outer(alpha, beta) {
            var gamma = alpha + counter;
            function inner(delta) {
                let epsilon = delta * gamma;
                try { risky(epsilon); } catch (err) { return err + beta; }
                return function (zeta) { return zeta + alpha + epsilon + a + b; };
            }
            return inner(beta);
        }";
    let fs = MemoryFs::new();
    let options = MinifyOptions::new()
        .with_compress(false)
        .with_mangle_options(top_level());
    let out = minify(&SourceInput::code(source), &options, &fs).unwrap();

    for name in ["counter", "alpha", "gamma", "epsilon", "zeta"] {
        assert!(!out.code.contains(name), "{name} survived in {}", out.code);
    }
    assert!(out.code.contains("risky("));
    assert_eq!(resolutions(source), resolutions(&out.code));
}

#[test]
fn test_repeated_invocations_are_independent() {
    let fs = MemoryFs::new();
    let options = MinifyOptions::default();
    let small = SourceInput::code("function f(x) { return x; }");
    let large = SourceInput::code(
        "function g(one, two, three, four) { return one + two + three + four; }",
    );

    let fresh = minify(&small, &options, &fs).unwrap();
    minify(&large, &options, &fs).unwrap();
    let again = minify(&small, &options, &fs).unwrap();
    assert_eq!(fresh, again);
}

#[test]
#[serial]
fn test_member_names_stay_stable_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("names.json");
    let fs = OsFs;
    let options = MinifyOptions::new()
        .with_mangle_options(MangleOptions {
            props: Some(PropsOptions::default()),
            ..Default::default()
        })
        .with_name_cache(&cache_path);

    minify(
        &SourceInput::code("o.alphaValue = 1; o.betaValue = 2;"),
        &options,
        &fs,
    )
    .unwrap();
    let cache = NameCache::load(&fs, &cache_path, PROPS_KEY);
    let beta = cache.get("betaValue").unwrap().to_string();
    assert!(cache.contains("alphaValue"));

    let second = minify(&SourceInput::code("p.betaValue();"), &options, &fs).unwrap();
    assert_eq!(second.code, format!("p.{beta}()"));
}

#[test]
#[serial]
fn test_cache_without_props_options_only_reuses() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("names.json");
    std::fs::write(
        &cache_path,
        r#"{"props": {"cname": 0, "props": {"known": "a"}}}"#,
    )
    .unwrap();
    let options = MinifyOptions::new().with_name_cache(&cache_path);

    let out = minify(&SourceInput::code("o.known = o.unknown;"), &options, &OsFs).unwrap();
    assert_eq!(out.code, "o.a=o.unknown");
}

#[test]
fn test_reserved_name_is_never_assigned() {
    let mut cache = NameCache::new();
    for i in 0..30 {
        let name = cache
            .lookup_or_assign(&format!("member{i}"), |candidate| candidate == "e")
            .unwrap();
        assert_ne!(name, "e");
    }
    assert_eq!(cache.get("member4"), Some("f"));
}

#[test]
fn test_allocator_is_shortest_first() {
    let alphabet = Alphabet::canonical();
    for n in 0..=25 {
        assert_eq!(alphabet.nth(n).len(), 1);
    }
    assert_eq!(alphabet.nth(53).len(), 1);
    assert_eq!(alphabet.nth(54).len(), 2);
    assert_eq!(alphabet.nth(55).len(), 2);
}

#[test]
fn test_map_round_trips_through_a_second_pass() {
    let fs = MemoryFs::new();
    let identity = MinifyOptions::new()
        .with_compress(false)
        .with_mangle(false)
        .with_source_map(external_map());

    let first = minify(
        &SourceInput::code("var answer = 42;\nconsole.log(answer);"),
        &identity,
        &fs,
    )
    .unwrap();
    assert_eq!(first.code, "var answer=42;console.log(answer)");
    let input_map = SourceMap::from_json(&first.map.unwrap()).unwrap();

    let options = identity.with_input_map(InputMap::Object(input_map));
    let second = minify(
        &SourceInput::named([("stage1.js", first.code.as_str())]),
        &options,
        &fs,
    )
    .unwrap();
    assert_eq!(second.code, "var answer=42;console.log(answer)");

    let map = SourceMap::from_json(&second.map.unwrap()).unwrap();
    assert_eq!(map.sources, vec!["0"]);
    let console = map
        .decode()
        .unwrap()
        .into_iter()
        .find(|m| m.gen_line == 0 && m.gen_col == 14)
        .unwrap();
    let original = console.original.unwrap();
    assert_eq!((original.source, original.line, original.col), (0, 1, 0));
    assert_eq!(map.names[original.name.unwrap() as usize], "console");
}

#[test]
fn test_external_map_comment_uses_map_file_name() {
    let fs = MemoryFs::new();
    let options = MinifyOptions::new().with_source_map(MapTarget::External {
        file: "dist/app.min.js.map".to_string(),
        url: MapUrl::Default,
    });
    let out = minify(&SourceInput::code("x = 1;"), &options, &fs).unwrap();
    assert_eq!(out.code, "x=1\n//# sourceMappingURL=app.min.js.map");
    let map = SourceMap::from_json(&out.map.unwrap()).unwrap();
    assert_eq!(map.file.as_deref(), Some("app.min.js"));
    assert_eq!(
        map.decode().unwrap()[0].original,
        Some(Original {
            source: 0,
            line: 0,
            col: 0,
            name: Some(0),
        })
    );
}

#[test]
#[serial]
fn test_glob_inputs_are_read_in_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.js"), "second();").unwrap();
    std::fs::write(dir.path().join("a.js"), "first();").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not js").unwrap();

    let out = minify(
        &SourceInput::path(dir.path().join("*.js")),
        &MinifyOptions::default(),
        &OsFs,
    )
    .unwrap();
    assert_eq!(out.code, "first();second()");
}

#[test]
fn test_missing_source_is_an_input_error() {
    let fs = MemoryFs::new();
    let err = minify(
        &SourceInput::path("src/missing.js"),
        &MinifyOptions::default(),
        &fs,
    )
    .unwrap_err();
    assert!(matches!(err, Error::ReadSource { .. }));
}

#[test]
fn test_module_wrap_exports_all() {
    let fs = MemoryFs::new().with_file("lib.js", "var version = 2; function run() { return version; }");
    let options = MinifyOptions::new()
        .with_compress(false)
        .with_wrap(ModuleWrap::new("lib").with_exports(ExportSpec::All));
    let out = minify(&SourceInput::path("lib.js"), &options, &fs).unwrap();
    assert!(out.code.starts_with("(function(exports,global){"));
    assert!(out.code.contains("exports[\"version\"]="));
    assert!(out.code.contains("exports[\"run\"]="));
    assert!(out.code.ends_with("({},function(){return this}()))"));
}

#[test]
fn test_var_redeclaring_catch_parameter_keeps_resolution() {
    let source = "function f() {
            var x = 1;
            try { throw 0; } catch (e) { var e = 2; }
            return [x, e];
        }";
    let fs = MemoryFs::new();
    let options = MinifyOptions::new().with_compress(false);
    let out = minify(&SourceInput::code(source), &options, &fs).unwrap();

    assert!(undeclared(&out.code).is_empty(), "{}", out.code);
    assert_eq!(resolutions(source), resolutions(&out.code));
}

#[test]
fn test_destructuring_assignment_survives_mangling() {
    let source = "function swap(pair, other) {
            var first, second;
            ({first, second} = pair);
            [first, second] = [second, first];
            ({first = 1, second} = other);
            return first + second;
        }";
    let fs = MemoryFs::new();
    let options = MinifyOptions::new().with_compress(false);
    let out = minify(&SourceInput::code(source), &options, &fs).unwrap();

    assert!(!out.code.contains("(({"), "{}", out.code);
    assert_eq!(resolutions(source), resolutions(&out.code));
}

#[test]
fn test_defines_leave_assignment_targets_alone() {
    let mut compress = CompressOptions::default();
    compress
        .global_defs
        .insert("DEBUG".to_string(), GlobalDef::Bool(false));
    let options = MinifyOptions::new().with_compress_options(compress);
    let fs = MemoryFs::new();
    let source = "for (DEBUG in o) {} [DEBUG] = a; ({DEBUG} = b); DEBUG++;";
    let out = minify(&SourceInput::code(source), &options, &fs).unwrap();

    assert!(parse(&out.code, ParseOptions::new("out.js")).is_ok(), "{}", out.code);
    assert_eq!(resolutions(source), resolutions(&out.code));
}

#[test]
fn test_inline_units_never_share_an_id() {
    let fs = MemoryFs::new();
    let input = SourceInput::List(vec![
        SourceInput::named([("1", "first();")]),
        SourceInput::code("second();"),
    ]);
    let options = MinifyOptions::new()
        .with_source_map(external_map())
        .with_include_sources(true);
    let out = minify(&input, &options, &fs).unwrap();
    assert_eq!(out.code, "first();second()");

    let map = SourceMap::from_json(&out.map.unwrap()).unwrap();
    assert_eq!(map.sources, vec!["1", "2"]);
    assert_eq!(
        map.sources_content,
        Some(vec![Some("first();".to_string()), Some("second();".to_string())])
    );
    let second = map
        .decode()
        .unwrap()
        .into_iter()
        .find(|m| m.gen_line == 0 && m.gen_col == 8)
        .unwrap();
    let original = second.original.unwrap();
    assert_eq!((original.source, original.line, original.col), (1, 0, 0));
}

#[test]
fn test_duplicate_unit_ids_are_rejected() {
    let fs = MemoryFs::new().with_file("lib.js", "lib();");
    let input = SourceInput::List(vec![SourceInput::path("lib.js"), SourceInput::path("lib.js")]);
    let err = minify(&input, &MinifyOptions::default(), &fs).unwrap_err();
    assert!(matches!(err, Error::Options(_)));
}
