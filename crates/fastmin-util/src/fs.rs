use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// Filesystem access used by the minify pipeline.
///
/// Sources, input source maps, glob directory listings and the name cache
/// all go through this trait so the pipeline can run against an in-memory
/// tree in tests.
pub trait FileSystem {
    /// Read a whole file as text.
    ///
    /// # Errors
    /// Returns an error if the file does not exist or cannot be read.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the contents of a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Names of the entries directly inside `dir`, in no particular order.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be listed.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        read_to_string_lossy(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        atomic_write(path, contents)
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

/// An in-memory filesystem keyed by normalized path.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, builder style.
    #[must_use]
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let mut files = self.files.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        files.insert(normalize(path.as_ref()), contents.as_ref().to_vec());
    }

    /// Current contents of a file, if present.
    #[must_use]
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        let files = self.files.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        files
            .get(&normalize(path.as_ref()))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.insert(path, contents);
        Ok(())
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        let dir = normalize(dir);
        let files = self.files.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut names: Vec<String> = Vec::new();
        for path in files.keys() {
            let Ok(rest) = path.strip_prefix(&dir) else {
                continue;
            };
            if let Some(Component::Normal(first)) = rest.components().next() {
                let name = first.to_string_lossy().into_owned();
                if names.last() != Some(&name) {
                    names.push(name);
                }
            }
        }
        if names.is_empty() && !files.keys().any(|p| p.starts_with(&dir)) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            ));
        }
        Ok(names)
    }
}

/// Drop `.` components so `./a.js` and `a.js` name the same file.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// Readers see either the old contents or the new contents, never a partial write.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // Same directory, so the rename stays on one filesystem
    let mut temp_path = parent.to_path_buf();
    temp_path.push(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
        std::process::id()
    ));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // On Windows, rename can fail if target exists.
            if cfg!(windows) {
                fs::copy(&temp_path, path)?;
                let _ = fs::remove_file(&temp_path);
                Ok(())
            } else {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

/// All files under `root` with the given extension, sorted by path.
///
/// # Errors
/// Returns an error if any directory under `root` cannot be read.
pub fn collect_files(root: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some(extension)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_read_to_string_lossy_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x80, 0x81])
            .unwrap();
        file.flush().unwrap();

        let content = read_to_string_lossy(file.path()).unwrap();
        assert!(content.starts_with("Hello"));
        assert!(content.contains('\u{FFFD}'));
    }

    #[test]
    fn test_atomic_write_replaces_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        atomic_write(&path, b"{}").unwrap();
        atomic_write(&path, b"{\"props\":{}}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"props\":{}}");

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_os_fs_list_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "a").unwrap();
        fs::write(dir.path().join("b.js"), "b").unwrap();

        let mut names = OsFs.list_dir(dir.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["a.js", "b.js"]);
        assert!(OsFs.list_dir(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_memory_fs() {
        let fs = MemoryFs::new()
            .with_file("src/a.js", "var a;")
            .with_file("./src/b.js", "var b;")
            .with_file("src/lib/c.js", "var c;")
            .with_file("top.js", "");

        assert_eq!(fs.read_to_string(Path::new("./src/a.js")).unwrap(), "var a;");
        assert_eq!(
            fs.list_dir(Path::new("src")).unwrap(),
            vec!["a.js", "b.js", "lib"]
        );
        assert_eq!(fs.list_dir(Path::new(".")).unwrap(), vec!["src", "top.js"]);
        assert!(fs.list_dir(Path::new("nope")).is_err());
        assert_eq!(
            fs.read_to_string(Path::new("missing.js")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );

        fs.write(Path::new("out.js"), b"x").unwrap();
        assert_eq!(fs.get("out.js").as_deref(), Some("x"));
    }

    #[test]
    fn test_collect_files_sorted() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.js"), "").unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(dir.path().join("nested/c.js"), "").unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();

        let files = collect_files(dir.path(), "js").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.js", "b.js", "nested/c.js"]);
    }
}
