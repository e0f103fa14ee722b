//! The minify pipeline.
//!
//! Stages run strictly in order and each consumes the previous stage's
//! output: merge, wrap, analyze, compress, member mangling, local mangling,
//! serialize, compose the map. All file access goes through the
//! [`FileSystem`] handed in by the caller.

use crate::compress::{Compressor, Rewrite};
use crate::error::{Error, Result};
use crate::mangle::{compute_frequency, mangle_locals};
use crate::merge::{merge_sources, wrap_module, MergedSource, SourceInput};
use crate::name_cache::{NameCache, PROPS_KEY};
use crate::options::{InputMap, MinifyOptions, PropsOptions};
use crate::propmangle::mangle_properties;
use crate::scope::ScopeTree;
use crate::sourcemap::{compose, ComposeOptions, SourceMap};
use fastmin_syntax::{Codegen, CodegenOptions, Program};
use fastmin_util::FileSystem;
use std::path::Path;
use tracing::{debug, info_span};

/// Result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub code: String,
    /// The composed source map as JSON, when a map target is set.
    pub map: Option<String>,
}

/// Minify `input` into a single program.
pub fn minify(input: &SourceInput, options: &MinifyOptions, fs: &dyn FileSystem) -> Result<Output> {
    let _span = info_span!("minify").entered();
    options.validate()?;

    let input_map = load_input_map(&options.input_map, fs)?;

    let MergedSource {
        mut program,
        sources,
    } = merge_sources(input, fs, options.bare_returns)?;
    debug!(units = program.units.len(), "merged sources");

    if let Some(wrap) = &options.wrap {
        program = wrap_module(program, wrap);
        debug!(name = %wrap.name, "wrapped module");
    }

    let scopes = ScopeTree::analyze(&mut program);
    debug!(
        scopes = scopes.scope_count(),
        symbols = scopes.symbol_count(),
        "analyzed scopes"
    );

    if let Some(compress) = options.compress.resolve() {
        Compressor::new(compress).rewrite(&mut program, &scopes);
    }

    if let Some(mangle) = options.mangle.resolve() {
        if mangle.props.is_some() || options.name_cache.is_some() {
            mangle_members(
                &mut program,
                mangle.props.as_ref(),
                options.name_cache.as_deref(),
                fs,
            )?;
        }

        // Compression may have removed or introduced bindings
        let mut scopes = ScopeTree::analyze(&mut program);
        let alphabet = compute_frequency(&mut program, &scopes, &mangle).sorted();
        let renamed = mangle_locals(&mut program, &mut scopes, &mangle, &alphabet)?;
        debug!(renamed, alphabet = %alphabet.as_string(), "mangled local names");
    }

    let target = &options.source_map;
    let codegen_options = CodegenOptions {
        beautify: options.beautify,
        source_map: target.is_enabled(),
        ..CodegenOptions::default()
    };
    let (mut code, raw) = Codegen::new(&program, codegen_options).generate_with_mappings();
    debug!(bytes = code.len(), mappings = raw.len(), "generated code");

    let map = if target.is_enabled() {
        let compose_options = ComposeOptions {
            file: target.generated_file(),
            source_root: options.source_root.clone(),
            include_sources: options.include_sources,
        };
        let map = compose(&program, &sources, &raw, input_map.as_ref(), &compose_options)?;
        let json = map.to_json()?;
        if let Some(comment) = target.comment(&json) {
            code.push_str(&comment);
        }
        Some(json)
    } else {
        None
    };

    Ok(Output { code, map })
}

fn load_input_map(input: &InputMap, fs: &dyn FileSystem) -> Result<Option<SourceMap>> {
    match input {
        InputMap::None => Ok(None),
        InputMap::Object(map) => Ok(Some(map.clone())),
        InputMap::Path(path) => {
            let text = fs
                .read_to_string(path)
                .map_err(|source| Error::InputMapRead {
                    path: path.clone(),
                    source,
                })?;
            SourceMap::from_json(&text).map(Some)
        }
    }
}

/// Load the member cache, rename, and persist the cache.
fn mangle_members(
    program: &mut Program,
    props: Option<&PropsOptions>,
    cache_path: Option<&Path>,
    fs: &dyn FileSystem,
) -> Result<()> {
    let mut cache = cache_path.map_or_else(NameCache::new, |path| {
        NameCache::load(fs, path, PROPS_KEY)
    });
    let renamed = mangle_properties(program, props, &mut cache)?;
    debug!(renamed, cached = cache.len(), "mangled member names");

    if let Some(path) = cache_path {
        cache.save(fs, path, PROPS_KEY)?;
    }
    Ok(())
}
