//! Version numbers stamped into what fastmin writes.
//!
//! `SCHEMA_VERSION` covers the `--json` reports (`ok`, `code_digest`,
//! `error.code` and friends) and the name cache file, whose top-level
//! `vars`/`props` entries each hold `{"cname", "props"}`. Readers of either
//! should check it before trusting field names.

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Layout of the JSON reports and the name cache file.
pub const SCHEMA_VERSION: u32 = 1;

/// Revision of the source map format emitted.
pub const SOURCE_MAP_VERSION: u32 = 3;

/// One-line description for `fastmin version`.
#[must_use]
pub fn version_string() -> String {
    format!("fastmin {VERSION} (report schema {SCHEMA_VERSION}, source map v{SOURCE_MAP_VERSION})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_names_every_format() {
        let vs = version_string();
        assert!(vs.starts_with(&format!("fastmin {VERSION} ")));
        assert!(vs.contains("report schema 1"));
        assert!(vs.ends_with("source map v3)"));
    }

    #[test]
    fn test_source_maps_are_version_three() {
        let map = crate::sourcemap::SourceMapBuilder::new(None, None).build();
        assert_eq!(map.version, SOURCE_MAP_VERSION);
    }
}
