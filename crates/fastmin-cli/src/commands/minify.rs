//! `fastmin minify` command implementation.
//!
//! Builds [`MinifyOptions`] from an optional config file plus flags, runs the
//! pipeline against the real filesystem and writes the code and map.

use fastmin_core::version::SCHEMA_VERSION;
use fastmin_core::{
    minify, Error, ExportSpec, GlobalDef, InputMap, MapTarget, MapUrl, MinifyOptions, ModuleWrap,
    PropsOptions, SourceInput,
};
use fastmin_util::fs::{atomic_write, collect_files};
use fastmin_util::hash::short_digest;
use fastmin_util::OsFs;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Minify command action.
#[derive(Debug, Clone, Default)]
pub struct MinifyAction {
    /// Base for relative paths; the process directory when absent.
    pub cwd: Option<PathBuf>,
    pub inputs: Vec<PathBuf>,
    /// Output file (if None, prints to stdout).
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Explicit compressor toggle; keeps the config value when None.
    pub compress: Option<bool>,
    /// `NAME=value` global replacements.
    pub define: Vec<String>,
    /// Explicit mangler toggle; keeps the config value when None.
    pub mangle: Option<bool>,
    pub toplevel: bool,
    pub reserved: Vec<String>,
    pub mangle_props: bool,
    pub mangle_regex: Option<String>,
    pub keep_quoted: bool,
    pub name_cache: Option<PathBuf>,
    pub source_map: Option<PathBuf>,
    pub source_map_url: Option<String>,
    pub no_source_map_url: bool,
    pub source_map_inline: bool,
    pub in_source_map: Option<PathBuf>,
    pub source_root: Option<String>,
    pub include_sources: bool,
    pub wrap: Option<String>,
    pub export_all: bool,
    pub bare_returns: bool,
    pub beautify: bool,
}

/// JSON output for minify command.
#[derive(Serialize)]
struct MinifyResultJson {
    ok: bool,
    schema_version: u32,
    code_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    map_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_digest: Option<String>,
    output: Option<String>,
    map_output: Option<String>,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<MinifyErrorJson>,
}

#[derive(Serialize)]
struct MinifyErrorJson {
    code: &'static str,
    message: String,
}

/// Run the minify command.
pub fn run(action: MinifyAction, json: bool) -> Result<()> {
    let start = Instant::now();

    let result = build_options(&action).and_then(|options| {
        let input = collect_inputs(&action)?;
        let out = minify(&input, &options, &OsFs)?;
        Ok((options, out))
    });

    let (options, out) = match result {
        Ok(done) => done,
        Err(e) => {
            if json {
                let report = MinifyResultJson {
                    ok: false,
                    schema_version: SCHEMA_VERSION,
                    code_bytes: 0,
                    map_bytes: None,
                    code_digest: None,
                    output: None,
                    map_output: None,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: Some(MinifyErrorJson {
                        code: error_code(&e),
                        message: e.to_string(),
                    }),
                };
                println!("{}", serde_json::to_string(&report).into_diagnostic()?);
                std::process::exit(1);
            }
            return Err(e).into_diagnostic().wrap_err("minify failed");
        }
    };

    let output = action.output.as_ref().map(|p| resolve(&action, p));
    if let Some(path) = &output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
        atomic_write(path, out.code.as_bytes())
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    }

    let mut map_output = None;
    if let (MapTarget::External { file, .. }, Some(map)) = (&options.source_map, &out.map) {
        let path = resolve(&action, Path::new(file));
        atomic_write(&path, map.as_bytes())
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
        map_output = Some(path);
    }

    tracing::debug!(
        bytes = out.code.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "minify finished"
    );

    if json {
        let report = MinifyResultJson {
            ok: true,
            schema_version: SCHEMA_VERSION,
            code_bytes: out.code.len(),
            map_bytes: out.map.as_ref().map(String::len),
            code_digest: Some(short_digest(out.code.as_bytes())),
            output: output.as_ref().map(|p| p.display().to_string()),
            map_output: map_output.as_ref().map(|p| p.display().to_string()),
            duration_ms: start.elapsed().as_millis() as u64,
            error: None,
        };
        println!("{}", serde_json::to_string(&report).into_diagnostic()?);
    } else if output.is_none() {
        println!("{}", out.code);
    }
    Ok(())
}

fn resolve(action: &MinifyAction, path: &Path) -> PathBuf {
    match &action.cwd {
        Some(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    }
}

/// Directories contribute every `.js` file below them, sorted by path.
fn collect_inputs(action: &MinifyAction) -> Result<SourceInput, Error> {
    let mut inputs = Vec::new();
    for path in &action.inputs {
        let path = resolve(action, path);
        if path.is_dir() {
            for file in collect_files(&path, "js")? {
                inputs.push(SourceInput::path(file));
            }
        } else {
            inputs.push(SourceInput::path(path));
        }
    }
    Ok(SourceInput::List(inputs))
}

fn build_options(action: &MinifyAction) -> Result<MinifyOptions, Error> {
    let mut options = match &action.config {
        Some(path) => MinifyOptions::from_file(&resolve(action, path))?,
        None => MinifyOptions::default(),
    };

    if let Some(enabled) = action.compress {
        if enabled != options.compress.is_enabled() {
            options = options.with_compress(enabled);
        }
    }
    let mut defines = Vec::with_capacity(action.define.len());
    for define in &action.define {
        let (name, value) = define.split_once('=').ok_or_else(|| {
            Error::options(format!("--define expects NAME=value, got `{define}`"))
        })?;
        defines.push((name.trim().to_string(), parse_global_def(value.trim())));
    }
    // Defines only matter while the compressor runs
    if let (false, Some(mut compress)) = (defines.is_empty(), options.compress.resolve()) {
        compress.global_defs.extend(defines);
        options = options.with_compress_options(compress);
    }

    if action.mangle == Some(false) {
        options = options.with_mangle(false);
    } else if action.mangle == Some(true)
        || action.toplevel
        || !action.reserved.is_empty()
        || action.mangle_props
        || action.keep_quoted
    {
        let mut mangle = options.mangle.resolve().unwrap_or_default();
        mangle.top_level |= action.toplevel;
        mangle.reserved.extend(action.reserved.iter().cloned());
        if action.mangle_props {
            mangle.props.get_or_insert_with(PropsOptions::default);
        }
        if let Some(props) = &mut mangle.props {
            if action.mangle_regex.is_some() {
                props.regex.clone_from(&action.mangle_regex);
            }
            props.keep_quoted |= action.keep_quoted;
        }
        options = options.with_mangle_options(mangle);
    }

    if let Some(path) = &action.name_cache {
        options = options.with_name_cache(resolve(action, path));
    }

    if action.source_map_inline {
        options = options.with_source_map(MapTarget::Inline);
    } else if let Some(file) = &action.source_map {
        let url = if action.no_source_map_url {
            MapUrl::Omit
        } else if let Some(url) = &action.source_map_url {
            MapUrl::Custom(url.clone())
        } else {
            MapUrl::Default
        };
        options = options.with_source_map(MapTarget::External {
            file: file.display().to_string(),
            url,
        });
    }
    if let Some(path) = &action.in_source_map {
        options = options.with_input_map(InputMap::Path(resolve(action, path)));
    }
    if let Some(root) = &action.source_root {
        options = options.with_source_root(root.clone());
    }
    if action.include_sources {
        options = options.with_include_sources(true);
    }

    if let Some(name) = &action.wrap {
        let exports = if action.export_all {
            ExportSpec::All
        } else {
            ExportSpec::None
        };
        options = options.with_wrap(ModuleWrap::new(name.clone()).with_exports(exports));
    }
    if action.bare_returns {
        options = options.with_bare_returns(true);
    }
    if action.beautify {
        options = options.with_beautify(true);
    }

    options.validate()?;
    Ok(options)
}

fn parse_global_def(value: &str) -> GlobalDef {
    match value {
        "true" => GlobalDef::Bool(true),
        "false" => GlobalDef::Bool(false),
        "null" => GlobalDef::Null,
        _ => value.parse::<f64>().map_or_else(
            |_| GlobalDef::String(value.trim_matches(|c| c == '"' || c == '\'').to_string()),
            GlobalDef::Number,
        ),
    }
}

fn error_code(error: &Error) -> &'static str {
    match error {
        Error::Io(_) => "MINIFY_IO",
        Error::ReadSource { .. } => "MINIFY_READ_SOURCE",
        Error::InputMap { .. } | Error::InputMapRead { .. } | Error::Mappings(_) => {
            "MINIFY_INPUT_MAP"
        }
        Error::Parse(_) => "MINIFY_PARSE",
        Error::Options(_) | Error::InvalidRegex { .. } => "MINIFY_OPTIONS",
        Error::NameSpaceExhausted { .. } => "MINIFY_NAME_SPACE",
        Error::Other(_) => "MINIFY_ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> MinifyAction {
        MinifyAction {
            inputs: vec![PathBuf::from("in.js")],
            ..Default::default()
        }
    }

    #[test]
    fn test_flags_map_to_options() {
        let options = build_options(&MinifyAction {
            toplevel: true,
            reserved: vec!["$".to_string()],
            mangle_props: true,
            mangle_regex: Some("^_".to_string()),
            source_map: Some(PathBuf::from("out.js.map")),
            no_source_map_url: true,
            wrap: Some("lib".to_string()),
            export_all: true,
            ..action()
        })
        .unwrap();
        let mangle = options.mangle.resolve().unwrap();
        assert!(mangle.top_level);
        assert_eq!(mangle.reserved, vec!["$"]);
        assert_eq!(mangle.props.unwrap().regex.as_deref(), Some("^_"));
        assert_eq!(
            options.source_map,
            MapTarget::External {
                file: "out.js.map".to_string(),
                url: MapUrl::Omit,
            }
        );
        assert_eq!(options.wrap.unwrap().exports, ExportSpec::All);
    }

    #[test]
    fn test_disabling_wins() {
        let options = build_options(&MinifyAction {
            compress: Some(false),
            mangle: Some(false),
            toplevel: true,
            ..action()
        })
        .unwrap();
        assert!(!options.compress.is_enabled());
        assert!(!options.mangle.is_enabled());
    }

    #[test]
    fn test_defines() {
        let options = build_options(&MinifyAction {
            define: vec![
                "DEBUG=false".to_string(),
                "LEVEL=3".to_string(),
                "NAME='app'".to_string(),
            ],
            ..action()
        })
        .unwrap();
        let defs = options.compress.resolve().unwrap().global_defs;
        assert_eq!(defs["DEBUG"], GlobalDef::Bool(false));
        assert_eq!(defs["LEVEL"], GlobalDef::Number(3.0));
        assert_eq!(defs["NAME"], GlobalDef::String("app".to_string()));

        let err = build_options(&MinifyAction {
            define: vec!["DEBUG".to_string()],
            ..action()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Options(_)));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(error_code(&Error::options("x")), "MINIFY_OPTIONS");
        assert_eq!(error_code(&Error::other("x")), "MINIFY_ERROR");
    }
}
