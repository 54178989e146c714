//! Persistence backends for the team registry.
//!
//! A store holds the whole [`TeamMap`] as one document: `load` once at
//! startup, `save` the full map after every mutation. There is no
//! incremental write path because the registry is small and append-only.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use teamchat_protocol::TeamMap;

use crate::RegistryError;

/// Where the registry keeps its durable copy.
///
/// `save` is called from the service's event loop and blocks it for the
/// duration of the write.
pub trait TeamStore: Send + 'static {
    /// Reads the entire map. A store that has never been written loads
    /// as an empty map.
    fn load(&self) -> Result<TeamMap, RegistryError>;

    /// Replaces the stored map with `teams`.
    fn save(&self, teams: &TeamMap) -> Result<(), RegistryError>;
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Stores the registry as a JSON object keyed by team code.
///
/// Writes go to `<path>.tmp` first and are renamed over `path`, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by the file at `path`. Nothing is touched
    /// until the first `load` or `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl TeamStore for JsonFileStore {
    fn load(&self) -> Result<TeamMap, RegistryError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.path.display(),
                    "no team file yet, starting empty"
                );
                return Ok(TeamMap::new());
            }
            Err(e) => return Err(RegistryError::PersistenceFailure(e)),
        };
        serde_json::from_slice(&bytes).map_err(RegistryError::Corrupt)
    }

    fn save(&self, teams: &TeamMap) -> Result<(), RegistryError> {
        let json = serde_json::to_vec_pretty(teams)
            .map_err(|e| RegistryError::PersistenceFailure(io::Error::other(e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(RegistryError::PersistenceFailure)?;
            }
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(RegistryError::PersistenceFailure)?;
        fs::rename(&tmp, &self.path).map_err(RegistryError::PersistenceFailure)?;

        tracing::debug!(
            path = %self.path.display(),
            teams = teams.len(),
            "team file written"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    teams: TeamMap,
    writes: usize,
    fail_writes: bool,
}

/// An in-process [`TeamStore`].
///
/// Clones share the same storage, so a test can keep one handle, move
/// another into a registry, and inspect what was "persisted".
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that loads as `teams`.
    pub fn with_teams(teams: TeamMap) -> Self {
        let store = Self::default();
        store.lock().teams = teams;
        store
    }

    /// Makes every subsequent `save` fail with a persistence error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Returns a copy of what was last saved.
    pub fn snapshot(&self) -> TeamMap {
        self.lock().teams.clone()
    }

    /// Number of successful saves so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TeamStore for MemoryStore {
    fn load(&self) -> Result<TeamMap, RegistryError> {
        Ok(self.lock().teams.clone())
    }

    fn save(&self, teams: &TeamMap) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(RegistryError::PersistenceFailure(io::Error::other(
                "memory store configured to fail",
            )));
        }
        inner.teams = teams.clone();
        inner.writes += 1;
        Ok(())
    }
}
