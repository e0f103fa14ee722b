//! Pipeline configuration.
//!
//! Every field has a default, unknown keys are rejected, and `compress` /
//! `mangle` accept either a boolean or an options object.

use crate::compress::CompressOptions;
use crate::error::{Error, Result};
use crate::merge::ModuleWrap;
use crate::sourcemap::{MapTarget, SourceMap};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `false`, `true` (default options) or explicit options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Toggle<T> {
    Enabled(bool),
    Options(T),
}

impl<T> Default for Toggle<T> {
    fn default() -> Self {
        Toggle::Enabled(true)
    }
}

impl<T: Clone + Default> Toggle<T> {
    /// The effective options, or `None` when disabled.
    pub fn resolve(&self) -> Option<T> {
        match self {
            Toggle::Enabled(true) => Some(T::default()),
            Toggle::Enabled(false) => None,
            Toggle::Options(options) => Some(options.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Toggle::Enabled(false))
    }
}

/// Local and member name mangling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MangleOptions {
    /// Binding names that keep their original name.
    pub reserved: Vec<String>,
    /// Also rename bindings of the program scope.
    #[serde(alias = "toplevel")]
    pub top_level: bool,
    /// Give the most referenced bindings of each scope the shortest names.
    pub sort_by_references: bool,
    /// Member name mangling; off when absent.
    #[serde(alias = "properties")]
    pub props: Option<PropsOptions>,
}

/// Member name mangling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropsOptions {
    /// Only rename names matching this regular expression.
    pub regex: Option<String>,
    /// Member names that are never renamed.
    pub reserved: Vec<String>,
    /// Leave alone every name that appears quoted anywhere.
    pub keep_quoted: bool,
    /// Reserve the standard library's member names.
    pub builtins: bool,
    /// Rename to `_$name$<suffix>_` instead of short names.
    pub debug: Option<String>,
}

impl Default for PropsOptions {
    fn default() -> Self {
        Self {
            regex: None,
            reserved: Vec::new(),
            keep_quoted: false,
            builtins: true,
            debug: None,
        }
    }
}

/// Where the input source map comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMap {
    #[default]
    None,
    Object(SourceMap),
    Path(PathBuf),
}

/// Options for one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinifyOptions {
    pub compress: Toggle<CompressOptions>,
    pub mangle: Toggle<MangleOptions>,
    /// Cache file that keeps member names stable across runs.
    #[serde(alias = "name_cache_path")]
    pub name_cache: Option<PathBuf>,
    #[serde(alias = "output_map_target")]
    pub source_map: MapTarget,
    pub input_map: InputMap,
    pub source_root: Option<String>,
    /// Embed the original unit texts in the map.
    #[serde(alias = "include_source_content")]
    pub include_sources: bool,
    #[serde(alias = "module_wrap")]
    pub wrap: Option<ModuleWrap>,
    /// Allow `return` at the top level of every unit.
    pub bare_returns: bool,
    pub beautify: bool,
}

impl MinifyOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON, rejecting unknown keys.
    pub fn from_json(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text).map_err(|e| Error::options(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fastmin_util::fs::read_to_string_lossy(path).map_err(|source| {
            Error::ReadSource {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_json(&text)
    }

    /// Check the values serde cannot check.
    pub fn validate(&self) -> Result<()> {
        if let Some(mangle) = self.mangle.resolve() {
            if let Some(pattern) = mangle.props.and_then(|p| p.regex) {
                regex_lite::Regex::new(&pattern).map_err(|e| Error::InvalidRegex {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
            }
        }
        if let Some(wrap) = &self.wrap {
            if wrap.name.is_empty() {
                return Err(Error::options("wrap name must not be empty"));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_compress(mut self, enabled: bool) -> Self {
        self.compress = Toggle::Enabled(enabled);
        self
    }

    #[must_use]
    pub fn with_compress_options(mut self, options: CompressOptions) -> Self {
        self.compress = Toggle::Options(options);
        self
    }

    #[must_use]
    pub fn with_mangle(mut self, enabled: bool) -> Self {
        self.mangle = Toggle::Enabled(enabled);
        self
    }

    #[must_use]
    pub fn with_mangle_options(mut self, options: MangleOptions) -> Self {
        self.mangle = Toggle::Options(options);
        self
    }

    #[must_use]
    pub fn with_name_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.name_cache = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_source_map(mut self, target: MapTarget) -> Self {
        self.source_map = target;
        self
    }

    #[must_use]
    pub fn with_input_map(mut self, input: InputMap) -> Self {
        self.input_map = input;
        self
    }

    #[must_use]
    pub fn with_source_root(mut self, root: impl Into<String>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_include_sources(mut self, include: bool) -> Self {
        self.include_sources = include;
        self
    }

    #[must_use]
    pub fn with_wrap(mut self, wrap: ModuleWrap) -> Self {
        self.wrap = Some(wrap);
        self
    }

    #[must_use]
    pub fn with_bare_returns(mut self, bare_returns: bool) -> Self {
        self.bare_returns = bare_returns;
        self
    }

    #[must_use]
    pub fn with_beautify(mut self, beautify: bool) -> Self {
        self.beautify = beautify;
        self
    }
}
