//! Small key-value store for persisted JSON blobs.
//!
//! Every blob is wrapped in an envelope carrying a schema version. Readers ask
//! for the version they understand; anything else (missing file, bad JSON,
//! other version) reads as "absent". Writes are best-effort: failures are
//! logged and dropped.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage key for the article cache map (slug → record).
pub const NEWS_CACHE_KEY: &str = "atlasiq.news_cache";
/// Storage key for the saved user location + preferences.
pub const USER_PREFS_KEY: &str = "atlasiq.user_prefs";

pub const NEWS_CACHE_SCHEMA: u32 = 1;
pub const USER_PREFS_SCHEMA: u32 = 1;

/// Raw string storage underneath `VersionedStore`.
pub trait KvBackend: Send + Sync {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One `<key>.json` file per key inside `dir`.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let _ = fs::create_dir_all(&dir); // best-effort
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KvBackend for FileBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(value.as_bytes())?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Process-local backend, handy for tests.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put raw text under `key`, bypassing the envelope.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.inner
            .lock()
            .expect("memory backend mutex poisoned")
            .insert(key.to_string(), value.to_string());
    }
}

impl KvBackend for MemoryBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        let g = self.inner.lock().expect("memory backend mutex poisoned");
        Ok(g.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.inner
            .lock()
            .expect("memory backend mutex poisoned")
            .remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    schema_version: u32,
    data: T,
}

#[derive(Clone)]
pub struct VersionedStore {
    backend: Arc<dyn KvBackend>,
}

impl VersionedStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    pub fn file(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(dir)))
    }

    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Read the blob at `key` if it was written with `version`.
    pub fn load<T: DeserializeOwned>(&self, key: &str, version: u32) -> Option<T> {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = ?e, key, "store read failed; treating as empty");
                return None;
            }
        };

        // Peek at the version first so a schema change never reaches the typed decode.
        #[derive(Deserialize)]
        struct Header {
            schema_version: u32,
        }
        match serde_json::from_str::<Header>(&raw) {
            Ok(h) if h.schema_version == version => {}
            Ok(h) => {
                debug!(key, found = h.schema_version, want = version, "schema mismatch");
                return None;
            }
            Err(e) => {
                warn!(error = %e, key, "store blob unreadable; treating as empty");
                return None;
            }
        }

        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(env) => Some(env.data),
            Err(e) => {
                warn!(error = %e, key, "store payload malformed; treating as empty");
                None
            }
        }
    }

    /// Write `data` under `key`. Never fails from the caller's point of view.
    pub fn save<T: Serialize>(&self, key: &str, version: u32, data: &T) {
        let env = Envelope {
            schema_version: version,
            data,
        };
        let json = match serde_json::to_string(&env) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, key, "store encode failed; dropping write");
                return;
            }
        };
        if let Err(e) = self.backend.write(key, &json) {
            warn!(error = ?e, key, "store write failed; dropping write");
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            warn!(error = ?e, key, "store remove failed");
        }
    }
}
