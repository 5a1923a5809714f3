//! Source lookup for the `using` queue.
//!
//! The parser never touches the filesystem itself; it asks a `SourceLoader`
//! to turn a `using` name into a stable identity and to read its text. The
//! identity is what the visited set is keyed on, so two spellings of the same
//! file are only compiled once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

/// File extension of Cinder sources.
pub const EXTENSION: &str = "cin";

/// Display name of the embedded library unit.
pub const PRELUDE_NAME: &str = "<prelude>";

/// Library compiled ahead of every program; its functions are internal.
pub const PRELUDE: &str = include_str!("../lib/prelude.cin");

/// Resolved identity of one source unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(pub String);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One file queued for parsing.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub id: SourceId,
    /// Name used in locations and diagnostics.
    pub name: Rc<str>,
    pub text: String,
    pub internal: bool,
}

impl SourceUnit {
    pub fn prelude() -> Self {
        SourceUnit {
            id: SourceId(PRELUDE_NAME.to_string()),
            name: PRELUDE_NAME.into(),
            text: PRELUDE.to_string(),
            internal: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot find source '{name}'")]
    NotFound { name: String },

    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait SourceLoader {
    /// Resolves `name` as written after `using`, relative to the including
    /// unit (`None` for the entry file).
    fn resolve(&self, name: &str, from: Option<&SourceId>) -> Result<SourceId, SourceError>;

    /// Reads the text of a resolved unit.
    fn load(&self, id: &SourceId) -> Result<String, SourceError>;
}

fn with_extension(name: &str) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{}.{}", name, EXTENSION)
    }
}

// =============================================================================
// Filesystem loader
// =============================================================================

/// Looks next to the including file first, then in the library directory.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    pub lib_dir: Option<PathBuf>,
}

impl FsLoader {
    pub fn new(lib_dir: Option<PathBuf>) -> Self {
        FsLoader { lib_dir }
    }
}

impl SourceLoader for FsLoader {
    fn resolve(&self, name: &str, from: Option<&SourceId>) -> Result<SourceId, SourceError> {
        let file = with_extension(name);

        let mut candidates = Vec::new();
        match from.and_then(|id| Path::new(&id.0).parent()) {
            Some(dir) => candidates.push(dir.join(&file)),
            None => candidates.push(PathBuf::from(&file)),
        }
        if let Some(lib) = &self.lib_dir {
            candidates.push(lib.join(&file));
        }

        candidates
            .into_iter()
            .find_map(|path| path.canonicalize().ok())
            .map(|path| SourceId(path.to_string_lossy().into_owned()))
            .ok_or_else(|| SourceError::NotFound {
                name: name.to_string(),
            })
    }

    fn load(&self, id: &SourceId) -> Result<String, SourceError> {
        std::fs::read_to_string(&id.0).map_err(|source| SourceError::Io {
            path: id.0.clone(),
            source,
        })
    }
}

// =============================================================================
// In-memory loader
// =============================================================================

/// Serves sources from a map; identities are the map keys.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, text: &str) -> Self {
        self.files.insert(with_extension(name), text.to_string());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn resolve(&self, name: &str, _from: Option<&SourceId>) -> Result<SourceId, SourceError> {
        let key = with_extension(name);
        if self.files.contains_key(&key) {
            Ok(SourceId(key))
        } else {
            Err(SourceError::NotFound {
                name: name.to_string(),
            })
        }
    }

    fn load(&self, id: &SourceId) -> Result<String, SourceError> {
        self.files
            .get(&id.0)
            .cloned()
            .ok_or_else(|| SourceError::NotFound { name: id.0.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_loader_adds_extension() {
        let loader = MemoryLoader::new().with_file("io", "fn hello ( )");
        let id = loader.resolve("io", None).unwrap();
        assert_eq!(id, SourceId("io.cin".to_string()));
        assert_eq!(loader.resolve("io.cin", None).unwrap(), id);
        assert_eq!(loader.load(&id).unwrap(), "fn hello ( )");
    }

    #[test]
    fn test_memory_loader_missing_file() {
        let loader = MemoryLoader::new();
        let err = loader.resolve("nope", None).unwrap_err();
        assert_eq!(err.to_string(), "cannot find source 'nope'");
    }

    #[test]
    fn test_fs_loader_resolves_next_to_includer() {
        let dir = std::env::temp_dir().join(format!("cinder-src-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("main.cin"), "using util").unwrap();
        std::fs::write(dir.join("util.cin"), "fn util ( )").unwrap();

        let loader = FsLoader::new(None);
        let main = loader
            .resolve(dir.join("main.cin").to_str().unwrap(), None)
            .unwrap();
        let util = loader.resolve("util", Some(&main)).unwrap();
        assert!(util.0.ends_with("util.cin"));
        assert_eq!(loader.load(&util).unwrap(), "fn util ( )");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_prelude_is_internal() {
        let unit = SourceUnit::prelude();
        assert!(unit.internal);
        assert!(unit.text.contains("fn* print"));
    }
}
