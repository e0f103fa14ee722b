#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! fastmin-core: the minify pipeline.
//!
//! Merges sources into one program, rewrites it, renames bindings and
//! member names, and emits code plus an optional source map.
//!
//! ```
//! use fastmin_core::{minify, MinifyOptions, SourceInput};
//! use fastmin_util::MemoryFs;
//!
//! let out = minify(
//!     &SourceInput::code("function f(value) { return value * 2; }"),
//!     &MinifyOptions::default(),
//!     &MemoryFs::new(),
//! )
//! .unwrap();
//! assert!(out.code.starts_with("function f("));
//! ```

pub mod compress;
pub mod error;
pub mod mangle;
pub mod merge;
pub mod minify;
pub mod name_cache;
pub mod names;
pub mod options;
pub mod propmangle;
pub mod scope;
pub mod sourcemap;
pub mod version;

pub use compress::{CompressOptions, Compressor, GlobalDef, Rewrite};
pub use error::{Error, Result};
pub use merge::{merge_sources, wrap_module, ExportSpec, MergedSource, ModuleWrap, SourceInput};
pub use minify::{minify, Output};
pub use name_cache::NameCache;
pub use names::{Alphabet, CharFrequency, Cursor};
pub use options::{InputMap, MangleOptions, MinifyOptions, PropsOptions, Toggle};
pub use scope::ScopeTree;
pub use sourcemap::{MapTarget, MapUrl, SourceMap};
pub use version::VERSION;
