//! Source map composition.
//!
//! Resolves the serializer's raw position pairs to unit/line/column, chains
//! them through an optional input map and encodes the result as a version 3
//! source map.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fastmin_syntax::{LineIndex, Program, RawMapping};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

const B64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const INLINE_PREFIX: &str = "\n//# sourceMappingURL=data:application/json;charset=utf-8;base64,";

/// A version 3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

/// One decoded segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub gen_line: u32,
    pub gen_col: u32,
    pub original: Option<Original>,
}

/// The original position a segment points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Original {
    pub source: u32,
    pub line: u32,
    pub col: u32,
    pub name: Option<u32>,
}

impl SourceMap {
    /// Parse a map from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| Error::InputMap { source })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::other(format!("serialize source map: {e}")))
    }

    /// Decode `mappings` into absolute segments, ordered by generated position.
    pub fn decode(&self) -> Result<Vec<Mapping>> {
        let mut out = Vec::new();
        let mut source = 0i64;
        let mut line = 0i64;
        let mut col = 0i64;
        let mut name = 0i64;

        for (gen_line, text) in self.mappings.split(';').enumerate() {
            let mut gen_col = 0i64;
            for segment in text.split(',').filter(|s| !s.is_empty()) {
                let fields = vlq_decode_segment(segment)?;
                gen_col += fields[0];
                let original = match fields.len() {
                    1 => None,
                    4 | 5 => {
                        source += fields[1];
                        line += fields[2];
                        col += fields[3];
                        let name = fields.get(4).map(|delta| {
                            name += delta;
                            name
                        });
                        Some(Original {
                            source: to_u32(source)?,
                            line: to_u32(line)?,
                            col: to_u32(col)?,
                            name: name.map(to_u32).transpose()?,
                        })
                    }
                    n => {
                        return Err(Error::Mappings(format!(
                            "segment `{segment}` has {n} fields"
                        )))
                    }
                };
                out.push(Mapping {
                    gen_line: to_u32(gen_line as i64)?,
                    gen_col: to_u32(gen_col)?,
                    original,
                });
            }
        }
        Ok(out)
    }
}

fn to_u32(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Mappings(format!("position {value} out of range")))
}

/// VLQ-encode a signed integer and append to output string.
fn vlq_encode(value: i64, out: &mut String) {
    #[allow(clippy::cast_sign_loss)]
    let mut v = (if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    }) as u64;
    loop {
        let mut digit = (v & 0x1f) as u8;
        v >>= 5;
        if v > 0 {
            digit |= 0x20; // continuation bit
        }
        out.push(B64[digit as usize] as char);
        if v == 0 {
            break;
        }
    }
}

fn vlq_decode_segment(segment: &str) -> Result<Vec<i64>> {
    let mut values = Vec::with_capacity(5);
    let mut value = 0i64;
    let mut shift = 0u32;
    for byte in segment.bytes() {
        let digit = B64
            .iter()
            .position(|b| *b == byte)
            .ok_or_else(|| Error::Mappings(format!("invalid base64 digit `{}`", byte as char)))?
            as i64;
        if shift > 55 {
            return Err(Error::Mappings(format!("value too large in `{segment}`")));
        }
        value |= (digit & 0x1f) << shift;
        if digit & 0x20 == 0 {
            let magnitude = value >> 1;
            values.push(if value & 1 == 1 { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
        } else {
            shift += 5;
        }
    }
    if shift != 0 {
        return Err(Error::Mappings(format!("truncated segment `{segment}`")));
    }
    Ok(values)
}

/// Collects segments and encodes them as a map.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    file: Option<String>,
    source_root: Option<String>,
    /// Source name to its content, in first-use order.
    sources: IndexMap<String, Option<String>>,
    names: IndexSet<String>,
    mappings: Vec<Mapping>,
}

impl SourceMapBuilder {
    pub fn new(file: Option<String>, source_root: Option<String>) -> Self {
        Self {
            file,
            source_root,
            ..Self::default()
        }
    }

    /// Register a source and return its index. Content given later for an
    /// already known source fills in a missing one.
    pub fn add_source(&mut self, name: &str, content: Option<String>) -> u32 {
        let entry = self.sources.entry(name.to_string());
        let index = entry.index();
        let slot = entry.or_insert(None);
        if slot.is_none() {
            *slot = content;
        }
        index as u32
    }

    pub fn add_name(&mut self, name: &str) -> u32 {
        self.names.insert_full(name.to_string()).0 as u32
    }

    pub fn add_mapping(&mut self, gen_line: u32, gen_col: u32, original: Option<Original>) {
        self.mappings.push(Mapping {
            gen_line,
            gen_col,
            original,
        });
    }

    pub fn build(mut self) -> SourceMap {
        self.mappings.sort_by_key(|m| (m.gen_line, m.gen_col));

        let mut mappings = String::new();
        let mut line = 0u32;
        let mut prev_col = 0i64;
        let mut prev_source = 0i64;
        let mut prev_line = 0i64;
        let mut prev_orig_col = 0i64;
        let mut prev_name = 0i64;
        let mut first_on_line = true;

        for m in &self.mappings {
            while line < m.gen_line {
                mappings.push(';');
                line += 1;
                prev_col = 0;
                first_on_line = true;
            }
            if !first_on_line {
                mappings.push(',');
            }
            first_on_line = false;

            vlq_encode(i64::from(m.gen_col) - prev_col, &mut mappings);
            prev_col = i64::from(m.gen_col);
            if let Some(orig) = m.original {
                vlq_encode(i64::from(orig.source) - prev_source, &mut mappings);
                vlq_encode(i64::from(orig.line) - prev_line, &mut mappings);
                vlq_encode(i64::from(orig.col) - prev_orig_col, &mut mappings);
                prev_source = i64::from(orig.source);
                prev_line = i64::from(orig.line);
                prev_orig_col = i64::from(orig.col);
                if let Some(name) = orig.name {
                    vlq_encode(i64::from(name) - prev_name, &mut mappings);
                    prev_name = i64::from(name);
                }
            }
        }

        let has_content = self.sources.values().any(Option::is_some);
        let (sources, contents): (Vec<String>, Vec<Option<String>>) =
            self.sources.into_iter().unzip();
        SourceMap {
            version: crate::version::SOURCE_MAP_VERSION,
            file: self.file,
            source_root: self.source_root,
            sources,
            sources_content: has_content.then_some(contents),
            names: self.names.into_iter().collect(),
            mappings,
        }
    }
}

/// Settings for [`compose`].
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Generated file the map describes.
    pub file: Option<String>,
    pub source_root: Option<String>,
    /// Embed unit texts as `sourcesContent`.
    pub include_sources: bool,
}

/// Build the output map from the serializer's raw pairs.
///
/// `sources` holds the text of every unit of `program`, keyed by unit name.
/// With an input map, every pair is looked up in it and pairs that have no
/// original there are dropped.
pub fn compose(
    program: &Program,
    sources: &IndexMap<String, String>,
    raw: &[RawMapping],
    input: Option<&SourceMap>,
    options: &ComposeOptions,
) -> Result<SourceMap> {
    let mut builder = SourceMapBuilder::new(options.file.clone(), options.source_root.clone());
    let indexes: Vec<LineIndex> = program
        .units
        .iter()
        .map(|unit| LineIndex::new(sources.get(&unit.name).map_or("", String::as_str)))
        .collect();
    let decoded = input.map(SourceMap::decode).transpose()?;

    for pair in raw {
        let Some(unit) = program.unit_at(pair.orig_offset) else {
            continue;
        };
        let Ok(unit_index) = program.units.binary_search_by_key(&unit.base, |u| u.base) else {
            continue;
        };
        let text = sources.get(&unit.name).map_or("", String::as_str);
        let (line, col) = indexes[unit_index].line_utf16_col(text, pair.orig_offset - unit.base);

        match (input, decoded.as_deref()) {
            (Some(input), Some(segments)) => {
                let Some(found) = lookup(segments, line, col) else {
                    continue;
                };
                let Some(source) = input.sources.get(found.source as usize) else {
                    continue;
                };
                let content = input
                    .sources_content
                    .as_ref()
                    .and_then(|c| c.get(found.source as usize).cloned().flatten());
                let source = builder.add_source(source, content);
                let name = found
                    .name
                    .and_then(|n| input.names.get(n as usize))
                    .or(pair.name.as_ref())
                    .map(|n| builder.add_name(n));
                builder.add_mapping(
                    pair.gen_line,
                    pair.gen_col,
                    Some(Original {
                        source,
                        line: found.line,
                        col: found.col,
                        name,
                    }),
                );
            }
            _ => {
                let content = options.include_sources.then(|| text.to_string());
                let source = builder.add_source(&unit.name, content);
                let name = pair.name.as_deref().map(|n| builder.add_name(n));
                builder.add_mapping(
                    pair.gen_line,
                    pair.gen_col,
                    Some(Original {
                        source,
                        line,
                        col,
                        name,
                    }),
                );
            }
        }
    }

    let map = builder.build();
    tracing::debug!(
        sources = map.sources.len(),
        names = map.names.len(),
        "composed source map"
    );
    Ok(map)
}

/// Greatest segment at or before `(line, col)` on the same generated line.
fn lookup(segments: &[Mapping], line: u32, col: u32) -> Option<Original> {
    let idx = segments.partition_point(|m| (m.gen_line, m.gen_col) <= (line, col));
    let found = segments.get(idx.checked_sub(1)?)?;
    if found.gen_line != line {
        return None;
    }
    found.original
}

/// Where the composed map goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapTarget {
    #[default]
    None,
    /// A separate map file.
    External {
        file: String,
        #[serde(default)]
        url: MapUrl,
    },
    /// Embedded in the code as a data URL.
    Inline,
}

/// The URL written for an external map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapUrl {
    /// The map file's name.
    #[default]
    Default,
    Custom(String),
    /// No comment at all.
    Omit,
}

impl MapTarget {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, MapTarget::None)
    }

    /// Name of the generated file, derived from the map file name.
    pub fn generated_file(&self) -> Option<String> {
        match self {
            MapTarget::External { file, .. } => {
                let name = basename(file);
                Some(name.strip_suffix(".map").unwrap_or(name).to_string())
            }
            _ => None,
        }
    }

    /// The trailing comment linking the code to its map, if any.
    pub fn comment(&self, map_json: &str) -> Option<String> {
        match self {
            MapTarget::None => None,
            MapTarget::Inline => Some(format!("{INLINE_PREFIX}{}", STANDARD.encode(map_json))),
            MapTarget::External { file, url } => match url {
                MapUrl::Omit => None,
                MapUrl::Custom(url) => Some(format!("\n//# sourceMappingURL={url}")),
                MapUrl::Default => Some(format!("\n//# sourceMappingURL={}", basename(file))),
            },
        }
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastmin_syntax::{parse, ParseOptions};

    fn encode(value: i64) -> String {
        let mut out = String::new();
        vlq_encode(value, &mut out);
        out
    }

    fn original(source: u32, line: u32, col: u32) -> Option<Original> {
        Some(Original {
            source,
            line,
            col,
            name: None,
        })
    }

    #[test]
    fn test_vlq_values() {
        assert_eq!(encode(0), "A");
        assert_eq!(encode(1), "C");
        assert_eq!(encode(-1), "D");
        assert_eq!(encode(16), "gB");
        assert_eq!(encode(123), "2H");
        assert_eq!(vlq_decode_segment("2HDgB").unwrap(), vec![123, -1, 16]);
    }

    #[test]
    fn test_vlq_errors() {
        assert!(matches!(vlq_decode_segment("A!"), Err(Error::Mappings(_))));
        assert!(matches!(vlq_decode_segment("g"), Err(Error::Mappings(_))));
    }

    #[test]
    fn test_builder_encodes_relative_fields() {
        let mut builder = SourceMapBuilder::new(None, None);
        let src = builder.add_source("a.js", None);
        builder.add_mapping(1, 0, original(src, 1, 0));
        builder.add_mapping(0, 4, original(src, 0, 4));
        builder.add_mapping(0, 0, original(src, 0, 0));
        let map = builder.build();
        assert_eq!(map.mappings, "AAAA,IAAI;AACJ");
        assert_eq!(map.sources, vec!["a.js"]);
        assert!(map.sources_content.is_none());

        let decoded = map.decode().unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[1].gen_col, 4);
        assert_eq!(decoded[2].original, original(0, 1, 0));
    }

    #[test]
    fn test_decode_rejects_bad_segments() {
        let map = SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: vec![],
            sources_content: None,
            names: vec![],
            mappings: "AA".to_string(),
        };
        assert!(matches!(map.decode(), Err(Error::Mappings(_))));
    }

    #[test]
    fn test_json_shape() {
        let map = SourceMap::from_json(
            r#"{"version":3,"sources":["a.js"],"sourcesContent":["x"],"names":[],"mappings":"AAAA","sourceRoot":"/src"}"#,
        )
        .unwrap();
        assert_eq!(map.source_root.as_deref(), Some("/src"));
        assert_eq!(map.sources_content, Some(vec![Some("x".to_string())]));
        let json = map.to_json().unwrap();
        assert!(json.contains("\"sourcesContent\":[\"x\"]"));
        assert!(!json.contains("\"file\""));

        assert!(matches!(
            SourceMap::from_json("{not json"),
            Err(Error::InputMap { .. })
        ));
    }

    #[test]
    fn test_compose_resolves_units() {
        let program = parse("x;\ny;", ParseOptions::new("a.js")).unwrap();
        let mut sources = IndexMap::new();
        sources.insert("a.js".to_string(), "x;\ny;".to_string());
        let raw = vec![
            RawMapping {
                gen_line: 0,
                gen_col: 0,
                orig_offset: 0,
                name: None,
            },
            RawMapping {
                gen_line: 0,
                gen_col: 2,
                orig_offset: 3,
                name: Some("y".to_string()),
            },
        ];
        let options = ComposeOptions {
            include_sources: true,
            ..Default::default()
        };
        let map = compose(&program, &sources, &raw, None, &options).unwrap();
        assert_eq!(map.sources, vec!["a.js"]);
        assert_eq!(map.names, vec!["y"]);
        assert_eq!(map.sources_content, Some(vec![Some("x;\ny;".to_string())]));
        let decoded = map.decode().unwrap();
        assert_eq!(
            decoded[1].original,
            Some(Original {
                source: 0,
                line: 1,
                col: 0,
                name: Some(0),
            })
        );
    }

    #[test]
    fn test_compose_through_input_map() {
        let program = parse("x;\ny;", ParseOptions::new("mid.js")).unwrap();
        let mut sources = IndexMap::new();
        sources.insert("mid.js".to_string(), "x;\ny;".to_string());
        // line 0 col 0 -> orig.ts 5:2 named "foo"; line 1 unmapped
        let input = SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: vec!["orig.ts".to_string()],
            sources_content: Some(vec![Some("original".to_string())]),
            names: vec!["foo".to_string()],
            mappings: "AAKEA".to_string(),
        };
        let raw = vec![
            RawMapping {
                gen_line: 0,
                gen_col: 0,
                orig_offset: 1,
                name: Some("x".to_string()),
            },
            RawMapping {
                gen_line: 0,
                gen_col: 2,
                orig_offset: 3,
                name: None,
            },
        ];
        let map = compose(&program, &sources, &raw, Some(&input), &ComposeOptions::default())
            .unwrap();
        assert_eq!(map.sources, vec!["orig.ts"]);
        assert_eq!(map.names, vec!["foo"]);
        assert_eq!(map.sources_content, Some(vec![Some("original".to_string())]));
        let decoded = map.decode().unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(
            decoded[0].original,
            Some(Original {
                source: 0,
                line: 5,
                col: 2,
                name: Some(0),
            })
        );
    }

    #[test]
    fn test_comments() {
        let external = MapTarget::External {
            file: "dist/out.js.map".to_string(),
            url: MapUrl::Default,
        };
        assert_eq!(
            external.comment("{}").as_deref(),
            Some("\n//# sourceMappingURL=out.js.map")
        );
        assert_eq!(external.generated_file().as_deref(), Some("out.js"));

        let custom = MapTarget::External {
            file: "out.js.map".to_string(),
            url: MapUrl::Custom("https://cdn/out.js.map".to_string()),
        };
        assert_eq!(
            custom.comment("{}").as_deref(),
            Some("\n//# sourceMappingURL=https://cdn/out.js.map")
        );

        let omit = MapTarget::External {
            file: "out.js.map".to_string(),
            url: MapUrl::Omit,
        };
        assert!(omit.comment("{}").is_none());
        assert!(MapTarget::None.comment("{}").is_none());

        let inline = MapTarget::Inline.comment("{}").unwrap();
        assert_eq!(inline, format!("{INLINE_PREFIX}e30="));
    }
}
