//! Persistent member-name cache.
//!
//! The cache file is a JSON object keyed by naming space. Each space holds
//! `{ "cname": <last index>, "props": { original: assigned } }`. Loading never
//! fails: anything unreadable yields an empty cache. Saving rewrites only the
//! requested key and keeps every sibling key as it was.

use crate::error::{Error, Result};
use crate::names::{Alphabet, Cursor};
use fastmin_util::FileSystem;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Key of the member-name space inside the cache file.
pub const PROPS_KEY: &str = "props";

/// Assignments for one naming space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CacheEntry")]
pub struct NameCache {
    /// Last allocator index handed out, -1 when nothing was assigned yet.
    pub cname: i64,
    /// Original name to assigned name.
    props: BTreeMap<String, String>,
    /// Every assigned name, for collision checks.
    #[serde(skip)]
    assigned: BTreeSet<String>,
}

/// On-disk shape of one naming space.
#[derive(Deserialize)]
struct CacheEntry {
    cname: i64,
    props: BTreeMap<String, String>,
}

impl From<CacheEntry> for NameCache {
    fn from(entry: CacheEntry) -> Self {
        let assigned = entry.props.values().cloned().collect();
        Self {
            cname: entry.cname,
            props: entry.props,
            assigned,
        }
    }
}

impl Default for NameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NameCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cname: -1,
            props: BTreeMap::new(),
            assigned: BTreeSet::new(),
        }
    }

    /// Load the space `key` from `path`, or an empty cache.
    pub fn load(fs: &dyn FileSystem, path: &Path, key: &str) -> Self {
        let text = match fs.read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "name cache not readable, starting empty");
                return Self::new();
            }
        };
        let mut document: serde_json::Map<String, serde_json::Value> =
            match serde_json::from_str(&text) {
                Ok(document) => document,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "name cache is not a JSON object, starting empty");
                    return Self::new();
                }
            };
        let Some(value) = document.remove(key) else {
            tracing::debug!(path = %path.display(), key, "name cache has no entry for key");
            return Self::new();
        };
        match serde_json::from_value::<Self>(value) {
            Ok(cache) => {
                tracing::debug!(path = %path.display(), key, names = cache.props.len(), cname = cache.cname, "loaded name cache");
                cache
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), key, error = %e, "name cache entry has the wrong shape, starting empty");
                Self::new()
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.props.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.props.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Original and assigned names, ordered by original name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether some name was assigned `assigned`.
    #[must_use]
    pub fn is_assigned(&self, assigned: &str) -> bool {
        self.assigned.contains(assigned)
    }

    /// Record an assignment made outside the allocator (debug names).
    pub fn insert(&mut self, name: impl Into<String>, assigned: impl Into<String>) {
        let assigned = assigned.into();
        self.assigned.insert(assigned.clone());
        if let Some(old) = self.props.insert(name.into(), assigned.clone()) {
            if old != assigned && !self.props.values().any(|v| *v == old) {
                self.assigned.remove(&old);
            }
        }
    }

    /// The assigned name for `name`, allocating one if needed.
    ///
    /// New names come from the canonical alphabet, continuing after `cname`,
    /// and never repeat a name already used as a value or rejected by `blocked`.
    pub fn lookup_or_assign(
        &mut self,
        name: &str,
        mut blocked: impl FnMut(&str) -> bool,
    ) -> Result<String> {
        if let Some(assigned) = self.props.get(name) {
            return Ok(assigned.clone());
        }
        let mut cursor = Cursor::resume(self.cname);
        let assigned = cursor
            .next(&Alphabet::canonical(), |candidate| {
                self.assigned.contains(candidate) || blocked(candidate)
            })
            .ok_or_else(|| Error::NameSpaceExhausted {
                scope: "member names".to_string(),
            })?;
        self.cname = cursor.last();
        self.assigned.insert(assigned.clone());
        self.props.insert(name.to_string(), assigned.clone());
        Ok(assigned)
    }

    /// Write this cache under `key`, keeping the other keys in the file.
    pub fn save(&self, fs: &dyn FileSystem, path: &Path, key: &str) -> Result<()> {
        let mut document: serde_json::Map<String, serde_json::Value> = fs
            .read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        let value = serde_json::to_value(self).map_err(|e| Error::other(e.to_string()))?;
        document.insert(key.to_string(), value);
        let mut text = serde_json::to_string_pretty(&document).map_err(|e| Error::other(e.to_string()))?;
        text.push('\n');
        fs.write(path, text.as_bytes())?;
        tracing::debug!(path = %path.display(), key, names = self.props.len(), "saved name cache");
        Ok(())
    }
}
