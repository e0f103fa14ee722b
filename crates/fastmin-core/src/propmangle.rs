//! Member name mangling.
//!
//! Member names form one flat naming space with no scoping. A first walk
//! collects every candidate (dot accesses, object keys, string subscripts)
//! and decides which names must survive unchanged; a second walk renames
//! the rest through the [`NameCache`], so separately minified files sharing
//! a cache file agree on every name.

use crate::error::{Error, Result};
use crate::name_cache::NameCache;
use crate::options::PropsOptions;
use fastmin_syntax::visit::{walk_expr, walk_property_key};
use fastmin_syntax::{Expr, ExprKind, MemberProp, Program, PropertyKey, VisitMut};
use regex_lite::Regex;
use rustc_hash::FxHashSet;

/// Member names of the standard library, reserved when `builtins` is on.
const BUILTIN_PROPS: &[&str] = &[
    // Object
    "prototype", "constructor", "length", "name", "arguments", "caller", "__proto__",
    "hasOwnProperty", "isPrototypeOf", "propertyIsEnumerable", "toLocaleString",
    "toString", "valueOf", "assign", "create", "defineProperty", "defineProperties",
    "entries", "freeze", "fromEntries", "getOwnPropertyDescriptor",
    "getOwnPropertyDescriptors", "getOwnPropertyNames", "getOwnPropertySymbols",
    "getPrototypeOf", "is", "isExtensible", "isFrozen", "isSealed", "keys",
    "preventExtensions", "seal", "setPrototypeOf", "values",
    // Function
    "apply", "bind", "call",
    // Array
    "concat", "copyWithin", "every", "fill", "filter", "find", "findIndex", "flat",
    "flatMap", "forEach", "from", "includes", "indexOf", "isArray", "join",
    "lastIndexOf", "map", "of", "pop", "push", "reduce", "reduceRight", "reverse",
    "shift", "slice", "some", "sort", "splice", "unshift",
    // String
    "anchor", "charAt", "charCodeAt", "codePointAt", "endsWith", "fromCharCode",
    "fromCodePoint", "localeCompare", "match", "matchAll", "normalize", "padEnd",
    "padStart", "raw", "repeat", "replace", "search", "split", "startsWith", "substr",
    "substring", "toLowerCase", "toUpperCase", "toLocaleLowerCase",
    "toLocaleUpperCase", "trim", "trimEnd", "trimStart",
    // Number and Math
    "EPSILON", "MAX_SAFE_INTEGER", "MAX_VALUE", "MIN_SAFE_INTEGER", "MIN_VALUE",
    "NEGATIVE_INFINITY", "POSITIVE_INFINITY", "isFinite", "isInteger", "isNaN",
    "isSafeInteger", "parseFloat", "parseInt", "toExponential", "toFixed",
    "toPrecision", "E", "LN10", "LN2", "LOG10E", "LOG2E", "PI", "SQRT1_2", "SQRT2",
    "abs", "acos", "asin", "atan", "atan2", "cbrt", "ceil", "cos", "exp", "floor",
    "hypot", "log", "max", "min", "pow", "random", "round", "sign", "sin", "sqrt",
    "tan", "trunc",
    // Date
    "now", "parse", "UTC", "getDate", "getDay", "getFullYear", "getHours",
    "getMilliseconds", "getMinutes", "getMonth", "getSeconds", "getTime",
    "getTimezoneOffset", "setDate", "setFullYear", "setHours", "setMilliseconds",
    "setMinutes", "setMonth", "setSeconds", "setTime", "toDateString", "toISOString",
    "toJSON", "toTimeString", "toUTCString",
    // RegExp and Error
    "exec", "test", "source", "flags", "global", "ignoreCase", "multiline",
    "lastIndex", "message", "stack",
    // JSON, Promise, iteration
    "stringify", "then", "catch", "finally", "resolve", "reject", "all", "race",
    "next", "done", "value", "return", "throw", "get", "set", "has", "delete",
    "add", "clear", "size",
];

/// Rename member names in `program`.
///
/// With `options` absent only names already present in `cache` are renamed.
/// Returns the number of distinct names renamed.
pub fn mangle_properties(
    program: &mut Program,
    options: Option<&PropsOptions>,
    cache: &mut NameCache,
) -> Result<usize> {
    let only_cache = options.is_none();
    let defaults = PropsOptions::default();
    let mut policy = Policy::new(options.unwrap_or(&defaults), only_cache)?;

    let mut collector = Collector {
        policy: &mut policy,
        cache: &*cache,
    };
    collector.visit_program(program);

    let mut renamer = Renamer {
        policy: &policy,
        cache,
        renamed: FxHashSet::default(),
        error: None,
    };
    renamer.visit_program(program);
    if let Some(err) = renamer.error {
        return Err(err);
    }
    tracing::debug!(
        renamed = renamer.renamed.len(),
        kept = policy.unmangleable.len(),
        cached = renamer.cache.len(),
        "mangled member names"
    );
    Ok(renamer.renamed.len())
}

/// Which names may be renamed, and which must stay.
struct Policy {
    reserved: FxHashSet<String>,
    regex: Option<Regex>,
    keep_quoted: bool,
    debug: Option<String>,
    only_cache: bool,
    /// Names seen quoted while `keep_quoted` is on.
    ignored: FxHashSet<String>,
    names_to_mangle: FxHashSet<String>,
    /// Names that keep their spelling; new names must avoid them.
    unmangleable: FxHashSet<String>,
}

impl Policy {
    fn new(options: &PropsOptions, only_cache: bool) -> Result<Self> {
        let mut reserved: FxHashSet<String> = options.reserved.iter().cloned().collect();
        if options.builtins {
            reserved.extend(BUILTIN_PROPS.iter().map(|s| (*s).to_string()));
        }
        let regex = options
            .regex
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| Error::InvalidRegex {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;
        Ok(Self {
            reserved,
            regex,
            keep_quoted: options.keep_quoted,
            debug: options.debug.clone(),
            only_cache,
            ignored: FxHashSet::default(),
            names_to_mangle: FxHashSet::default(),
            unmangleable: FxHashSet::default(),
        })
    }

    fn can_mangle(&self, name: &str, cache: &NameCache) -> bool {
        if self.unmangleable.contains(name) || self.reserved.contains(name) {
            return false;
        }
        if self.only_cache {
            return cache.contains(name);
        }
        !is_numeric(name)
    }

    fn should_mangle(&self, name: &str, cache: &NameCache) -> bool {
        if self.keep_quoted && self.ignored.contains(name) {
            return false;
        }
        if let Some(regex) = &self.regex {
            if !regex.is_match(name) {
                return false;
            }
        }
        if self.reserved.contains(name) {
            return false;
        }
        cache.contains(name) || self.names_to_mangle.contains(name)
    }

    fn add(&mut self, name: &str, quoted: bool, cache: &NameCache) {
        if quoted && self.keep_quoted {
            self.ignored.insert(name.to_string());
        }
        if self.can_mangle(name, cache) {
            self.names_to_mangle.insert(name.to_string());
        }
        if !self.should_mangle(name, cache) {
            self.unmangleable.insert(name.to_string());
        }
    }

    /// Whether a freshly allocated name would clash with a surviving one.
    fn blocks(&self, candidate: &str) -> bool {
        self.unmangleable.contains(candidate)
            || self.reserved.contains(candidate)
            || self.ignored.contains(candidate)
    }

    fn mangle(&self, name: &str, cache: &mut NameCache) -> Result<String> {
        if let Some(assigned) = cache.get(name) {
            return Ok(assigned.to_string());
        }
        if let Some(suffix) = &self.debug {
            let debug_name = format!("_${name}${suffix}_");
            if self.can_mangle(&debug_name, cache) && !self.ignored.contains(&debug_name) {
                cache.insert(name, debug_name.clone());
                return Ok(debug_name);
            }
        }
        cache.lookup_or_assign(name, |candidate| self.blocks(candidate))
    }
}

fn is_numeric(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Apply `f` to every string that a computed subscript may evaluate to.
fn subscript_strings(expr: &mut Expr, f: &mut impl FnMut(&mut String)) {
    match &mut expr.kind {
        ExprKind::String(s) => f(s),
        ExprKind::Sequence(exprs) => {
            if let Some(last) = exprs.last_mut() {
                subscript_strings(last, f);
            }
        }
        ExprKind::Conditional {
            consequent,
            alternate,
            ..
        } => {
            subscript_strings(consequent, f);
            subscript_strings(alternate, f);
        }
        _ => {}
    }
}

struct Collector<'a> {
    policy: &'a mut Policy,
    cache: &'a NameCache,
}

impl VisitMut for Collector<'_> {
    fn visit_member_name(&mut self, name: &mut String) {
        self.policy.add(name, false, self.cache);
    }

    fn visit_property_key(&mut self, key: &mut PropertyKey) {
        match key {
            PropertyKey::Ident(name) => self.policy.add(name, false, self.cache),
            PropertyKey::String(name) => self.policy.add(name, true, self.cache),
            PropertyKey::Number(_) | PropertyKey::Computed(_) => {}
        }
        walk_property_key(self, key);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        if let ExprKind::Member {
            property: MemberProp::Computed(prop),
            ..
        } = &mut expr.kind
        {
            let policy = &mut *self.policy;
            let cache = self.cache;
            subscript_strings(prop, &mut |s| policy.add(s, true, cache));
        }
        walk_expr(self, expr);
    }
}

struct Renamer<'a> {
    policy: &'a Policy,
    cache: &'a mut NameCache,
    renamed: FxHashSet<String>,
    error: Option<Error>,
}

impl Renamer<'_> {
    fn rename(&mut self, name: &mut String) {
        if self.error.is_some() || !self.policy.should_mangle(name, self.cache) {
            return;
        }
        match self.policy.mangle(name, self.cache) {
            Ok(assigned) => {
                self.renamed.insert(std::mem::replace(name, assigned));
            }
            Err(e) => self.error = Some(e),
        }
    }
}

impl VisitMut for Renamer<'_> {
    fn visit_member_name(&mut self, name: &mut String) {
        self.rename(name);
    }

    fn visit_property_key(&mut self, key: &mut PropertyKey) {
        match key {
            PropertyKey::Ident(name) => self.rename(name),
            PropertyKey::String(name) if !self.policy.keep_quoted => self.rename(name),
            _ => {}
        }
        walk_property_key(self, key);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        if !self.policy.keep_quoted {
            if let ExprKind::Member {
                property: MemberProp::Computed(prop),
                ..
            } = &mut expr.kind
            {
                subscript_strings(prop, &mut |s| self.rename(s));
            }
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastmin_syntax::{parse, Codegen, CodegenOptions, ParseOptions};

    fn run(source: &str, options: Option<&PropsOptions>, cache: &mut NameCache) -> String {
        let mut program = parse(source, ParseOptions::new("t.js")).unwrap();
        mangle_properties(&mut program, options, cache).unwrap();
        Codegen::new(&program, CodegenOptions::default()).generate()
    }

    fn props() -> PropsOptions {
        PropsOptions::default()
    }

    #[test]
    fn test_dot_access_and_keys_share_names() {
        let mut cache = NameCache::new();
        let out = run("var o = {width: 1, height: 2}; o.width = o.height;", Some(&props()), &mut cache);
        assert_eq!(out, "var o={a:1,b:2};o.a=o.b");
        assert_eq!(cache.get("width"), Some("a"));
        assert_eq!(cache.cname, 1);
    }

    #[test]
    fn test_builtins_are_reserved() {
        let mut cache = NameCache::new();
        let out = run("a.push(a.length, a.custom);", Some(&props()), &mut cache);
        assert_eq!(out, "a.push(a.length,a.a)");
    }

    #[test]
    fn test_surviving_names_are_avoided() {
        let options = PropsOptions {
            reserved: vec!["a".to_string()],
            ..props()
        };
        let mut cache = NameCache::new();
        let out = run("x.a = x.field;", Some(&options), &mut cache);
        assert_eq!(out, "x.a=x.b");
    }

    #[test]
    fn test_regex_filters_candidates() {
        let options = PropsOptions {
            regex: Some("^_".to_string()),
            ..props()
        };
        let mut cache = NameCache::new();
        let out = run("o._private = o.visible;", Some(&options), &mut cache);
        assert_eq!(out, "o.a=o.visible");
    }

    #[test]
    fn test_string_subscripts_follow_conditionals_and_sequences() {
        let mut cache = NameCache::new();
        let out = run("o.foo; o[c ? 'foo' : 'bar']; o[(x, 'bar')];", Some(&props()), &mut cache);
        assert_eq!(out, "o.a;o[c?\"a\":\"b\"];o[x,\"b\"]");
    }

    #[test]
    fn test_keep_quoted_protects_name_everywhere() {
        let options = PropsOptions {
            keep_quoted: true,
            ..props()
        };
        let mut cache = NameCache::new();
        let out = run("o['kept']; o.kept; o.other;", Some(&options), &mut cache);
        assert_eq!(out, "o[\"kept\"];o.kept;o.a");
    }

    #[test]
    fn test_numeric_names_are_never_mangled() {
        let mut cache = NameCache::new();
        let out = run("o['1.5']; o['0'];", Some(&props()), &mut cache);
        assert_eq!(out, "o[\"1.5\"];o[\"0\"]");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_debug_names() {
        let options = PropsOptions {
            debug: Some("x".to_string()),
            ..props()
        };
        let mut cache = NameCache::new();
        let out = run("o.field;", Some(&options), &mut cache);
        assert_eq!(out, "o._$field$x_");
    }

    #[test]
    fn test_only_cache_mode() {
        let mut cache = NameCache::new();
        cache.insert("known", "q");
        let out = run("o.known = o.unknown;", None, &mut cache);
        assert_eq!(out, "o.q=o.unknown");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_carries_between_runs() {
        let mut cache = NameCache::new();
        run("o.alpha;", Some(&props()), &mut cache);
        let out = run("o.beta; o.alpha;", Some(&props()), &mut cache);
        assert_eq!(out, "o.b;o.a");
    }

    #[test]
    fn test_reserved_e_is_never_assigned() {
        let options = PropsOptions {
            reserved: vec!["e".to_string()],
            ..props()
        };
        let mut cache = NameCache::new();
        run("o.p1; o.p2; o.p3; o.p4; o.p5; o.p6;", Some(&options), &mut cache);
        assert_eq!(cache.len(), 6);
        assert!(cache.iter().all(|(_, v)| v != "e"));
        assert_eq!(cache.get("p5"), Some("f"));
    }
}
