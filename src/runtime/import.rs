use crate::runtime::value::MapRef;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no readable file for `{0}` in the search path")]
    NotFound(String),
    #[error("absolute import paths are not allowed")]
    Absolute,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Source of imported program text.
pub trait Fetch {
    fn fetch(&self, address: &str) -> Result<String, FetchError>;
}

/// Resolves addresses as paths relative to a list of search directories.
#[derive(Clone, Debug)]
pub struct FileFetcher {
    search_paths: Vec<PathBuf>,
    allow_absolute: bool,
}

impl FileFetcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            search_paths: vec![base.into()],
            allow_absolute: true,
        }
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn allow_absolute(mut self, allow: bool) -> Self {
        self.allow_absolute = allow;
        self
    }

    fn resolve(&self, address: &str) -> Result<PathBuf, FetchError> {
        let path = Path::new(address);
        if path.is_absolute() {
            if !self.allow_absolute {
                return Err(FetchError::Absolute);
            }
            return if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(FetchError::NotFound(address.to_string()))
            };
        }
        self.search_paths
            .iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| FetchError::NotFound(address.to_string()))
    }
}

impl Fetch for FileFetcher {
    fn fetch(&self, address: &str) -> Result<String, FetchError> {
        let path = self.resolve(address)?;
        debug!(address, path = %path.display(), "reading import");
        fs::read_to_string(&path).map_err(|source| FetchError::Io { path, source })
    }
}

/// Serves imports from an in-memory table, for embedders and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryFetcher {
    sources: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.insert(address.into(), source.into());
        self
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, address: &str) -> Result<String, FetchError> {
        self.sources
            .get(address)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(address.to_string()))
    }
}

/// Bindings of every import resolved so far, keyed by address.
#[derive(Debug, Default)]
pub struct ImportCache {
    resolved: HashMap<String, MapRef>,
    in_progress: HashSet<String>,
}

impl ImportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Option<MapRef> {
        self.resolved.get(address).cloned()
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Marks `address` as being resolved; false when it already is.
    pub fn begin(&mut self, address: &str) -> bool {
        self.in_progress.insert(address.to_string())
    }

    pub fn abort(&mut self, address: &str) {
        self.in_progress.remove(address);
    }

    pub fn complete(&mut self, address: &str, bindings: MapRef) {
        self.in_progress.remove(address);
        self.resolved.insert(address.to_string(), bindings);
    }
}
